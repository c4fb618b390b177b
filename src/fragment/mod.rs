//! Fragment primitives for splitting oversized payloads across a transport
//! that caps individual message sizes.
//!
//! Every outbound payload, large or small, travels as one or more [`Frame`]s
//! tagged with a [`MessageId`], a zero-based [`FragmentIndex`] and the total
//! fragment count. The [`Chunker`] produces frames on the sending side and the
//! [`Reassembler`] stitches them back together on the receiving side, in any
//! arrival order. Frames are carried on the wire inside an [`Envelope`],
//! which also transports control signals.

pub mod chunker;
pub mod config;
pub mod envelope;
pub mod error;
pub mod header;
pub mod id;
pub mod index;
pub mod reassembler;

pub use chunker::{Chunker, FragmentBatch};
pub use config::FragmentationConfig;
pub use envelope::{
    ControlMessage,
    ControlSignal,
    Envelope,
    decode_binary_string,
    decode_envelope,
    encode_envelope,
    envelope_overhead,
};
pub use error::{EnvelopeError, FragmentError, FragmentationError, ReassemblyError};
pub use header::{Frame, FrameHeader};
pub use id::MessageId;
pub use index::FragmentIndex;
pub use reassembler::{ReassembledMessage, Reassembler};

#[cfg(test)]
mod tests;
