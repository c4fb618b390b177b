//! Fragment sizing derived from the transport's message size limit.

use std::num::NonZeroUsize;

use super::envelope_overhead;

/// Largest message the default transport accepts in one piece.
pub const DEFAULT_FRAME_BUDGET: usize = 16 * 1024;

/// Settings bounding fragment sizes.
///
/// A payload cap plus the envelope overhead never exceeds the frame budget,
/// so every encoded frame fits the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentationConfig {
    fragment_payload_cap: NonZeroUsize,
    frame_budget: NonZeroUsize,
}

impl FragmentationConfig {
    /// Derive a configuration from the transport's maximum message size.
    ///
    /// The payload cap leaves room for the worst-case envelope overhead, so an
    /// encoded frame never exceeds `frame_budget`. Returns `None` when the
    /// budget cannot even hold the overhead.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkwire::fragment::{FragmentationConfig, envelope_overhead};
    /// let cfg = FragmentationConfig::for_frame_budget(1024).expect("budget fits overhead");
    /// assert_eq!(
    ///     cfg.fragment_payload_cap().get() + envelope_overhead().get(),
    ///     1024
    /// );
    /// assert!(FragmentationConfig::for_frame_budget(4).is_none());
    /// ```
    #[must_use]
    pub fn for_frame_budget(frame_budget: usize) -> Option<Self> {
        let overhead = envelope_overhead().get();
        let available = frame_budget.checked_sub(overhead)?;
        Some(Self {
            fragment_payload_cap: NonZeroUsize::new(available)?,
            frame_budget: NonZeroUsize::new(frame_budget)?,
        })
    }

    /// Use a payload cap below the largest `frame_budget` allows.
    ///
    /// Returns `None` when `fragment_payload_cap` plus the envelope overhead
    /// exceeds `frame_budget`.
    #[must_use]
    pub fn with_payload_cap(frame_budget: usize, fragment_payload_cap: usize) -> Option<Self> {
        let widest = Self::for_frame_budget(frame_budget)?;
        if fragment_payload_cap > widest.fragment_payload_cap.get() {
            return None;
        }
        Some(Self {
            fragment_payload_cap: NonZeroUsize::new(fragment_payload_cap)?,
            ..widest
        })
    }

    /// Maximum number of payload bytes carried by a single frame. Payloads at
    /// or below this size travel as one frame; larger payloads are chunked
    /// into pieces of exactly this size (the last may be shorter).
    #[must_use]
    pub const fn fragment_payload_cap(&self) -> NonZeroUsize { self.fragment_payload_cap }

    /// Largest encoded envelope the transport accepts.
    #[must_use]
    pub const fn frame_budget(&self) -> NonZeroUsize { self.frame_budget }

    /// Largest encoded frame this configuration can produce.
    #[must_use]
    pub fn encoded_frame_ceiling(&self) -> usize {
        self.fragment_payload_cap.get() + envelope_overhead().get()
    }
}

impl Default for FragmentationConfig {
    fn default() -> Self {
        Self::for_frame_budget(DEFAULT_FRAME_BUDGET)
            .unwrap_or_else(|| panic!("default frame budget must exceed envelope overhead"))
    }
}
