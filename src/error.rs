//! Canonical error types for connections.
//!
//! [`ConnectionError`] is the single cause carried by
//! [`ConnectionEvent::Error`](crate::connection::ConnectionEvent::Error).
//! [`ConnectionError::is_fatal`] records which faults end the connection.

use std::io;

use thiserror::Error;

use crate::{
    channel::TransportError,
    fragment::{EnvelopeError, FragmentationError, ReassemblyError},
    negotiator::NegotiationError,
    serializer::{SerializationScheme, SerializerError},
};

/// Failures of the asynchronous conversion pipeline.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Reading the source failed.
    #[error("payload conversion failed: {0}")]
    Io(#[from] io::Error),
    /// The pipeline was stopped before the conversion completed.
    #[error("conversion pipeline stopped")]
    Stopped,
}

/// Faults surfaced by a connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The transport raised a fault.
    #[error("transport fault: {0}")]
    Transport(#[from] TransportError),
    /// A deferred payload could not be converted.
    #[error("conversion fault: {0}")]
    Conversion(#[from] ConversionError),
    /// A reassembled payload could not be decoded.
    #[error("failed to decode payload: {0}")]
    Decode(#[source] SerializerError),
    /// An inbound transport message was not a valid envelope.
    #[error("invalid envelope: {0}")]
    Envelope(#[from] EnvelopeError),
    /// A control signal of an unknown kind arrived.
    #[error("unrecognized control message: {kind}")]
    UnrecognizedControl { kind: String },
    /// `send` was called while the connection was not open.
    #[error("connection is not open")]
    NotOpen,
    /// An outbound value could not be encoded.
    #[error("failed to encode payload: {0}")]
    Encode(#[source] SerializerError),
    /// An outbound payload could not be split into frames.
    #[error("fragmentation failed: {0}")]
    Fragmentation(#[from] FragmentationError),
    /// An inbound frame did not fit its message.
    #[error("reassembly failed: {0}")]
    Reassembly(#[from] ReassemblyError),
    /// Establishing the transport failed.
    #[error("negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),
    /// The serializer does not implement the configured scheme.
    #[error("serializer implements {actual}, configuration requires {configured}")]
    SchemeMismatch {
        configured: SerializationScheme,
        actual: SerializationScheme,
    },
}

impl ConnectionError {
    /// Whether this fault closes the connection.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Conversion(_)
                | Self::Envelope(_)
                | Self::Negotiation(_)
                | Self::SchemeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::fragment::MessageId;

    #[rstest]
    #[case(ConnectionError::Transport(TransportError::Closed), true)]
    #[case(ConnectionError::Conversion(ConversionError::Stopped), true)]
    #[case(ConnectionError::Negotiation(NegotiationError::Abandoned), true)]
    #[case(ConnectionError::NotOpen, false)]
    #[case(ConnectionError::UnrecognizedControl { kind: "ping".into() }, false)]
    #[case(ConnectionError::Decode("bad".into()), false)]
    #[case(ConnectionError::Fragmentation(FragmentationError::IdsExhausted), false)]
    fn fatality_follows_fault_kind(#[case] error: ConnectionError, #[case] fatal: bool) {
        assert_eq!(error.is_fatal(), fatal);
    }

    #[rstest]
    fn messages_carry_context() {
        let err = ConnectionError::Reassembly(ReassemblyError::IndexOutOfRange {
            id: MessageId::new(7),
            index: crate::fragment::FragmentIndex::new(3),
            total: 2,
        });
        assert!(err.to_string().starts_with("reassembly failed:"));
        assert_eq!(ConnectionError::NotOpen.to_string(), "connection is not open");
    }
}
