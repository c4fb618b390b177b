//! Error types emitted by the fragmentation layer.

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

use super::{FragmentIndex, MessageId};

/// Violations of the frame header invariants.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentError {
    /// A frame declared zero fragments.
    #[error("frame for message {id} declares zero fragments")]
    ZeroTotal { id: MessageId },
    /// A frame index lies outside the declared fragment count.
    #[error("fragment index {index} out of range for message {id} with {total} fragments")]
    IndexOutOfRange {
        id: MessageId,
        index: FragmentIndex,
        total: u32,
    },
}

/// Errors produced while splitting outbound payloads.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentationError {
    /// The payload needs more fragments than a `u32` count can describe.
    #[error("payload requires {required} fragments, more than the frame format allows")]
    TooManyFragments { required: usize },
    /// The per-connection identifier counter has been used up.
    #[error("message identifier space exhausted")]
    IdsExhausted,
}

/// Errors produced while re-assembling inbound fragments.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// The fragment index does not fit the total recorded from the first
    /// fragment seen for this message.
    #[error("fragment {index} exceeds the {total} fragments recorded for message {id}")]
    IndexOutOfRange {
        id: MessageId,
        index: FragmentIndex,
        total: u32,
    },
}

/// Errors raised while moving envelopes to and from wire bytes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope could not be encoded.
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] EncodeError),
    /// The bytes are not a valid envelope.
    #[error("failed to decode envelope: {0}")]
    Decode(#[from] DecodeError),
    /// Bytes remained after a complete envelope was decoded.
    #[error("envelope decoded from {consumed} of {len} bytes")]
    TrailingBytes { consumed: usize, len: usize },
    /// The decoded frame header violates the frame invariants.
    #[error("invalid frame header: {0}")]
    InvalidHeader(#[from] FragmentError),
    /// A binary string held a character that does not stand for one byte.
    #[error("character {ch:?} at position {position} is not a byte")]
    NonByteCharacter { ch: char, position: usize },
}
