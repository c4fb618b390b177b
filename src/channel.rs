//! Transport collaborator consumed by a connection.
//!
//! A [`DataChannel`] is a point-to-point, message-oriented transport that
//! rejects oversized messages and reports a single flow-control signal: the
//! number of bytes queued but not yet flushed. Lifecycle notifications and
//! inbound messages arrive separately as [`ChannelEvent`]s.

use std::io;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

/// Payload exchanged with the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WirePayload {
    /// Binary message.
    Binary(Bytes),
    /// Text message.
    Text(String),
}

impl WirePayload {
    /// Number of bytes the payload occupies on the transport.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(bytes) => bytes.len(),
            Self::Text(text) => text.len(),
        }
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Consume the payload, returning its bytes. Text is returned as UTF-8.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Binary(bytes) => bytes,
            Self::Text(text) => Bytes::from(text),
        }
    }
}

/// Notifications raised by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The transport is ready to carry messages.
    Open,
    /// A message arrived.
    Message(WirePayload),
    /// The transport closed.
    Closed,
}

/// Faults raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport has already closed.
    #[error("channel is closed")]
    Closed,
    /// The transport refused the message.
    #[error("channel rejected message of {len} bytes: {reason}")]
    Rejected { len: usize, reason: String },
    /// An I/O failure occurred underneath the transport.
    #[error("transport i/o failure: {0}")]
    Io(#[from] io::Error),
}

/// Sending half of a transport.
pub trait DataChannel: Send {
    /// Hand a message to the transport.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the transport cannot accept the
    /// message. Connections treat any error as fatal.
    fn send(&mut self, payload: WirePayload) -> Result<(), TransportError>;

    /// Bytes queued by the transport but not yet flushed.
    fn buffered_amount(&self) -> usize;

    /// Close the transport. Closing twice must be harmless.
    fn close(&mut self);
}

/// A transport together with the stream of its events.
pub struct ChannelHandle {
    channel: Box<dyn DataChannel>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl ChannelHandle {
    /// Bundle a transport with its event receiver.
    #[must_use]
    pub fn new(
        channel: Box<dyn DataChannel>,
        events: mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> Self {
        Self { channel, events }
    }

    /// Split the handle into the transport and its events.
    #[must_use]
    pub fn into_parts(self) -> (Box<dyn DataChannel>, mpsc::UnboundedReceiver<ChannelEvent>) {
        (self.channel, self.events)
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("buffered_amount", &self.channel.buffered_amount())
            .finish_non_exhaustive()
    }
}
