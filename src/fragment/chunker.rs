//! Outbound helper that splits payloads into tagged frames.
//!
//! [`Chunker`] cuts a payload into contiguous byte ranges of at most
//! `fragment_payload_cap` bytes, in original order, and tags each with a
//! fresh [`MessageId`], its index and the fragment total. Payloads that fit
//! in one fragment, including empty ones, still produce a frame with
//! `total = 1`.

use std::num::NonZeroUsize;

use super::{FragmentationError, Frame, FrameHeader, MessageId};

/// Splits payloads into frames, allocating identifiers monotonically.
#[derive(Debug)]
pub struct Chunker {
    fragment_payload_cap: NonZeroUsize,
    next_message_id: Option<MessageId>,
}

impl Chunker {
    /// Create a chunker whose frames carry at most `fragment_payload_cap`
    /// payload bytes. Identifiers start at zero.
    #[must_use]
    pub const fn new(fragment_payload_cap: NonZeroUsize) -> Self {
        Self::with_starting_id(fragment_payload_cap, MessageId::new(0))
    }

    /// Create a chunker whose first message uses `start_at`.
    #[must_use]
    pub const fn with_starting_id(fragment_payload_cap: NonZeroUsize, start_at: MessageId) -> Self {
        Self {
            fragment_payload_cap,
            next_message_id: Some(start_at),
        }
    }

    /// Maximum payload bytes per frame.
    #[must_use]
    pub const fn fragment_payload_cap(&self) -> NonZeroUsize { self.fragment_payload_cap }

    /// Identifier the next chunked message will receive, if any remain.
    #[must_use]
    pub const fn next_message_id(&self) -> Option<MessageId> { self.next_message_id }

    /// Number of frames a payload of `len` bytes needs.
    #[must_use]
    pub fn fragment_count(&self, len: usize) -> usize {
        len.div_ceil(self.fragment_payload_cap.get()).max(1)
    }

    /// Split `payload` into frames under a freshly allocated identifier.
    ///
    /// No identifier is consumed when chunking fails.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::TooManyFragments`] if the fragment count
    /// does not fit a `u32`, or [`FragmentationError::IdsExhausted`] once
    /// every identifier has been handed out.
    pub fn chunk(&mut self, payload: &[u8]) -> Result<FragmentBatch, FragmentationError> {
        let required = self.fragment_count(payload.len());
        let total = u32::try_from(required)
            .map_err(|_| FragmentationError::TooManyFragments { required })?;
        let message_id = self.allocate_id()?;

        let frames = if payload.is_empty() {
            vec![Frame::new(FrameHeader::single(message_id), Vec::new())]
        } else {
            payload
                .chunks(self.fragment_payload_cap.get())
                .zip(0..total)
                .map(|(data, n)| {
                    Frame::new(FrameHeader::chunked(message_id, n, total), data.to_vec())
                })
                .collect()
        };

        Ok(FragmentBatch::new(message_id, frames))
    }

    fn allocate_id(&mut self) -> Result<MessageId, FragmentationError> {
        let current = self
            .next_message_id
            .ok_or(FragmentationError::IdsExhausted)?;
        self.next_message_id = current.checked_next();
        Ok(current)
    }
}

/// Frames produced for a single logical message, in index order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentBatch {
    message_id: MessageId,
    frames: Vec<Frame>,
}

impl FragmentBatch {
    fn new(message_id: MessageId, frames: Vec<Frame>) -> Self {
        debug_assert!(!frames.is_empty(), "fragment batches must not be empty");
        Self { message_id, frames }
    }

    /// Identifier shared by all frames.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Borrow the frames.
    #[must_use]
    pub fn frames(&self) -> &[Frame] { self.frames.as_slice() }

    /// Number of frames in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.frames.len() }

    /// Whether the message needed more than one frame.
    #[must_use]
    pub fn is_fragmented(&self) -> bool { self.len() > 1 }
}

impl IntoIterator for FragmentBatch {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter { self.frames.into_iter() }
}
