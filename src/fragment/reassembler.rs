//! Inbound helper that stitches frames back into complete payloads.
//!
//! [`Reassembler`] keeps one entry per [`MessageId`] holding the fragments
//! received so far, indexed by their position rather than by arrival order.
//! The fragment total recorded from the first frame of a message is
//! authoritative. Delivering the same fragment twice overwrites the stored
//! bytes without counting it again. An entry is removed the moment it
//! completes, before its payload is handed back.
//!
//! Entries for messages whose remaining fragments never arrive are kept for
//! the lifetime of the reassembler; callers release them with
//! [`Reassembler::clear`].

use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use log::debug;

use super::{Frame, MessageId, ReassemblyError};

#[derive(Debug)]
struct ReassemblyEntry {
    total: u32,
    fragments: BTreeMap<u32, Vec<u8>>,
}

impl ReassemblyEntry {
    fn new(total: u32) -> Self {
        Self {
            total,
            fragments: BTreeMap::new(),
        }
    }

    fn received(&self) -> usize { self.fragments.len() }

    fn is_complete(&self) -> bool { self.received() == self.total as usize }

    fn into_payload(self) -> Vec<u8> {
        let len = self.fragments.values().map(Vec::len).sum();
        let mut payload = Vec::with_capacity(len);
        for data in self.fragments.into_values() {
            payload.extend_from_slice(&data);
        }
        payload
    }
}

/// Container for a fully re-assembled payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReassembledMessage {
    message_id: MessageId,
    payload: Vec<u8>,
}

impl ReassembledMessage {
    /// Construct a new [`ReassembledMessage`].
    #[must_use]
    pub fn new(message_id: MessageId, payload: Vec<u8>) -> Self {
        Self {
            message_id,
            payload,
        }
    }

    /// Identifier shared by the frames that formed this message.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Borrow the re-assembled payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] { self.payload.as_slice() }

    /// Consume the message, returning the owned payload bytes.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> { self.payload }
}

/// Order-insensitive fragment re-assembler.
#[derive(Debug, Default)]
pub struct Reassembler {
    entries: HashMap<MessageId, ReassemblyEntry>,
}

impl Reassembler {
    /// Create an empty re-assembler.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Record a frame.
    ///
    /// Returns `Ok(Some(_))` when the frame completes its message and
    /// `Ok(None)` while fragments are still missing.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::IndexOutOfRange`] when the frame's index
    /// does not fit the total recorded for its message. The frame is dropped
    /// and the entry is left untouched.
    pub fn push(&mut self, frame: Frame) -> Result<Option<ReassembledMessage>, ReassemblyError> {
        let (header, data) = frame.into_parts();
        let id = header.id();
        let index = header.n();

        if header.is_single() && !self.entries.contains_key(&id) {
            return Ok(Some(ReassembledMessage::new(id, data)));
        }

        let total = self
            .entries
            .get(&id)
            .map_or(header.total(), |entry| entry.total);
        if !index.is_within(total) {
            return Err(ReassemblyError::IndexOutOfRange { id, index, total });
        }

        let mut occupied = match self.entries.entry(id) {
            Entry::Occupied(occupied) => occupied,
            Entry::Vacant(vacant) => {
                debug!("reassembly started: message_id={id}, total={total}");
                vacant.insert_entry(ReassemblyEntry::new(total))
            }
        };

        occupied.get_mut().fragments.insert(index.get(), data);
        if !occupied.get().is_complete() {
            return Ok(None);
        }

        let entry = occupied.remove();
        Ok(Some(ReassembledMessage::new(id, entry.into_payload())))
    }

    /// Number of messages with fragments still outstanding.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.entries.len() }

    /// Received and expected fragment counts for an incomplete message.
    #[must_use]
    pub fn progress(&self, id: MessageId) -> Option<(usize, u32)> {
        self.entries
            .get(&id)
            .map(|entry| (entry.received(), entry.total))
    }

    /// Discard every incomplete message.
    pub fn clear(&mut self) { self.entries.clear(); }
}
