use bincode::{Decode, Encode};

use super::{FragmentError, FragmentIndex, MessageId};

/// Addressing fields carried by every frame.
///
/// A message that fits into one fragment still carries `total = 1` and
/// `n = 0`, so the receiving side never needs a second code path.
///
/// # Examples
///
/// ```
/// use chunkwire::fragment::{FragmentIndex, FrameHeader, MessageId};
/// let header = FrameHeader::new(MessageId::new(7), FragmentIndex::new(1), 3).expect("valid header");
/// assert_eq!(header.id().get(), 7);
/// assert_eq!(header.n().get(), 1);
/// assert_eq!(header.total(), 3);
/// assert!(!header.is_single());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode)]
pub struct FrameHeader {
    id: MessageId,
    n: FragmentIndex,
    total: u32,
}

impl FrameHeader {
    /// Create a header, checking `total >= 1` and `n < total`.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::ZeroTotal`] or
    /// [`FragmentError::IndexOutOfRange`] when the invariants do not hold.
    pub fn new(id: MessageId, n: FragmentIndex, total: u32) -> Result<Self, FragmentError> {
        let header = Self { id, n, total };
        header.validate()?;
        Ok(header)
    }

    /// Header for a message carried in a single frame.
    #[must_use]
    pub const fn single(id: MessageId) -> Self {
        Self {
            id,
            n: FragmentIndex::zero(),
            total: 1,
        }
    }

    /// Header built by the chunker, which only produces indices below
    /// `total`.
    pub(super) fn chunked(id: MessageId, n: u32, total: u32) -> Self {
        debug_assert!(n < total, "chunk index {n} must stay below {total}");
        Self {
            id,
            n: FragmentIndex::new(n),
            total,
        }
    }

    /// Check the header invariants. Headers decoded from the wire bypass
    /// [`FrameHeader::new`], so callers validate them explicitly.
    ///
    /// # Errors
    ///
    /// See [`FrameHeader::new`].
    pub fn validate(&self) -> Result<(), FragmentError> {
        if self.total == 0 {
            return Err(FragmentError::ZeroTotal { id: self.id });
        }
        if !self.n.is_within(self.total) {
            return Err(FragmentError::IndexOutOfRange {
                id: self.id,
                index: self.n,
                total: self.total,
            });
        }
        Ok(())
    }

    /// Identifier of the logical message.
    #[must_use]
    pub const fn id(&self) -> MessageId { self.id }

    /// Position of this fragment.
    #[must_use]
    pub const fn n(&self) -> FragmentIndex { self.n }

    /// Number of fragments making up the message.
    #[must_use]
    pub const fn total(&self) -> u32 { self.total }

    /// Whether the message travels in exactly one frame.
    #[must_use]
    pub const fn is_single(&self) -> bool { self.total == 1 }
}

/// One fragment of a logical message: header plus a contiguous byte range.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Frame {
    header: FrameHeader,
    data: Vec<u8>,
}

impl Frame {
    /// Construct a frame from a validated header and its data.
    #[must_use]
    pub fn new(header: FrameHeader, data: Vec<u8>) -> Self { Self { header, data } }

    /// Borrow the frame header.
    #[must_use]
    pub const fn header(&self) -> &FrameHeader { &self.header }

    /// Borrow the fragment bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] { self.data.as_slice() }

    /// Consume the frame, returning its components.
    #[must_use]
    pub fn into_parts(self) -> (FrameHeader, Vec<u8>) { (self.header, self.data) }
}
