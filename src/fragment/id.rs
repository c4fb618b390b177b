use bincode::{Decode, Encode};
use derive_more::{Display, From, Into};

/// Identifier shared by every fragment of one logical message.
///
/// Identifiers are allocated monotonically by a single [`Chunker`] and are
/// only meaningful within the connection that owns it.
///
/// [`Chunker`]: crate::fragment::Chunker
///
/// # Examples
///
/// ```
/// use chunkwire::fragment::MessageId;
/// let id = MessageId::new(42);
/// assert_eq!(id.get(), 42);
/// assert_eq!(id.checked_next(), Some(MessageId::new(43)));
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode, Display, From, Into,
)]
#[display("{_0}")]
pub struct MessageId(u64);

impl MessageId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }

    /// Return the identifier that follows this one, or `None` once the
    /// counter space is exhausted.
    #[must_use]
    pub fn checked_next(self) -> Option<Self> { self.0.checked_add(1).map(Self) }
}
