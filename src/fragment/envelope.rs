//! Wire envelope carrying frames and control signals.
//!
//! The envelope is the only thing placed on the transport. It is a tagged
//! union encoded with `bincode`'s standard configuration, decoded once at the
//! connection boundary and then matched exhaustively.

use std::num::NonZeroUsize;

use bincode::{Decode, Encode, config, decode_from_slice, encode_to_vec};

use super::{EnvelopeError, Frame, FrameHeader, FragmentIndex, MessageId};

/// Upper bound on the bytes a single envelope may claim while decoding.
const ENVELOPE_DECODE_LIMIT: usize = 256 * 1024 * 1024;

/// Longest varint `bincode` emits for a `u64` length prefix.
const MAX_VARINT_LEN: usize = 9;

const CLOSE_KIND: &str = "close";

fn wire_config() -> impl config::Config {
    config::standard().with_limit::<ENVELOPE_DECODE_LIMIT>()
}

/// Unit placed on the transport.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Envelope {
    /// A fragment of an application message.
    Frame(Frame),
    /// A connection-level signal exchanged between the two endpoints.
    Control(ControlMessage),
}

/// Control payload as it travels on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct ControlMessage {
    kind: String,
}

impl ControlMessage {
    /// Remote-initiated close notification.
    #[must_use]
    pub fn close() -> Self {
        Self {
            kind: CLOSE_KIND.to_owned(),
        }
    }

    /// Build a control message with an arbitrary kind.
    #[must_use]
    pub fn with_kind(kind: impl Into<String>) -> Self { Self { kind: kind.into() } }

    /// Interpret the message.
    #[must_use]
    pub fn signal(&self) -> ControlSignal {
        match self.kind.as_str() {
            CLOSE_KIND => ControlSignal::Close,
            other => ControlSignal::Unrecognized(other.to_owned()),
        }
    }
}

/// Control signals understood by a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlSignal {
    /// The remote asked for the connection to be closed.
    Close,
    /// A control kind this endpoint does not know.
    Unrecognized(String),
}

/// Encode an envelope to wire bytes.
///
/// # Errors
///
/// Returns [`EnvelopeError::Encode`] if `bincode` rejects the value.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, EnvelopeError> {
    Ok(encode_to_vec(envelope, wire_config())?)
}

/// Decode and validate an envelope from wire bytes.
///
/// The whole buffer must be consumed and frame headers must satisfy
/// `total >= 1` and `n < total`.
///
/// # Errors
///
/// Returns [`EnvelopeError`] when decoding fails, bytes trail the envelope or
/// the frame header is invalid.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
    let (envelope, consumed): (Envelope, usize) = decode_from_slice(bytes, wire_config())?;
    if consumed != bytes.len() {
        return Err(EnvelopeError::TrailingBytes {
            consumed,
            len: bytes.len(),
        });
    }
    if let Envelope::Frame(frame) = &envelope {
        frame.header().validate()?;
    }
    Ok(envelope)
}

/// Decode an envelope carried as a binary string.
///
/// Each character stands for one byte, so only `U+0000..=U+00FF` may appear.
///
/// # Errors
///
/// Returns [`EnvelopeError::NonByteCharacter`] for any wider character, and
/// otherwise the errors of [`decode_envelope`].
pub fn decode_binary_string(text: &str) -> Result<Envelope, EnvelopeError> {
    let bytes = text
        .chars()
        .enumerate()
        .map(|(position, ch)| {
            u8::try_from(ch).map_err(|_| EnvelopeError::NonByteCharacter { ch, position })
        })
        .collect::<Result<Vec<u8>, _>>()?;
    decode_envelope(&bytes)
}

/// Worst-case bytes an envelope adds around a fragment's data.
///
/// # Panics
///
/// Panics if encoding the constant probe frame fails, which would indicate a
/// programmer error in the envelope definition.
#[must_use]
pub fn envelope_overhead() -> NonZeroUsize {
    let probe = Envelope::Frame(Frame::new(widest_header(), Vec::new()));
    let probe_len = encode_envelope(&probe)
        .unwrap_or_else(|err| panic!("probe envelope must encode: {err}"))
        .len();
    // The empty probe spends one byte on its length prefix.
    let overhead = probe_len + MAX_VARINT_LEN - 1;
    NonZeroUsize::new(overhead)
        .unwrap_or_else(|| panic!("envelope overhead must be non-zero (computed {overhead})"))
}

fn widest_header() -> FrameHeader {
    FrameHeader::new(
        MessageId::new(u64::MAX),
        FragmentIndex::new(u32::MAX - 1),
        u32::MAX,
    )
    .unwrap_or_else(|err| panic!("widest header must be valid: {err}"))
}
