//! Connection establishment collaborator.
//!
//! A [`Negotiator`] performs whatever signaling the transport needs
//! (description and candidate exchange) and eventually yields a
//! [`ChannelHandle`] or fails. It is only consulted while a connection is
//! connecting.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::channel::ChannelHandle;

/// Receiver resolved once negotiation has produced a transport or failed.
pub type PendingChannel = oneshot::Receiver<Result<ChannelHandle, NegotiationError>>;

/// Errors raised while establishing a transport.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The remote description could not be applied.
    #[error("invalid remote description: {0}")]
    Description(String),
    /// A remote candidate could not be applied.
    #[error("invalid remote candidate: {0}")]
    Candidate(String),
    /// Negotiation failed for another reason.
    #[error("negotiation failed: {0}")]
    Failed(String),
    /// The negotiator went away without producing a result.
    #[error("negotiator dropped before producing a channel")]
    Abandoned,
}

/// Signaling messages relayed from the remote peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalMessage {
    /// Remote session description.
    Answer(Bytes),
    /// Remote connectivity candidate.
    Candidate(Bytes),
    /// Any other signaling message kind.
    Other { kind: String, payload: Bytes },
}

/// Establishes transports on behalf of a connection.
pub trait Negotiator: Send {
    /// Begin establishing a transport.
    ///
    /// `offer` carries the remote offer when this side answers.
    ///
    /// # Errors
    ///
    /// Returns a [`NegotiationError`] if negotiation cannot start.
    fn start_connection(
        &mut self,
        initiator: bool,
        offer: Option<Bytes>,
    ) -> Result<PendingChannel, NegotiationError>;

    /// Apply the remote session description.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::Description`] if it cannot be applied.
    fn handle_remote_description(&mut self, description: Bytes) -> Result<(), NegotiationError>;

    /// Apply a remote connectivity candidate.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::Candidate`] if it cannot be applied.
    fn handle_remote_candidate(&mut self, candidate: Bytes) -> Result<(), NegotiationError>;

    /// Release negotiation resources.
    fn cleanup(&mut self);
}
