//! Application-facing handle to a running connection.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::SharedStatus;
use crate::{config::ConnectionId, error::ConnectionError, negotiator::SignalMessage};

/// Requests forwarded from a [`ConnectionHandle`] to its actor.
#[derive(Debug)]
pub(super) enum Command<T> {
    Send(T),
    Close,
    CloseFlush,
    Signal(SignalMessage),
}

/// Cloneable handle used by the application to drive a connection.
///
/// Dropping every handle closes the connection.
#[derive(Debug)]
pub struct ConnectionHandle<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    status: Arc<SharedStatus>,
    id: ConnectionId,
}

impl<T> Clone for ConnectionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            status: Arc::clone(&self.status),
            id: self.id.clone(),
        }
    }
}

impl<T> ConnectionHandle<T> {
    pub(super) fn new(
        commands: mpsc::UnboundedSender<Command<T>>,
        status: Arc<SharedStatus>,
        id: ConnectionId,
    ) -> Self {
        Self {
            commands,
            status,
            id,
        }
    }

    fn submit(&self, command: Command<T>) -> Result<(), ConnectionError> {
        self.commands
            .send(command)
            .map_err(|_| ConnectionError::NotOpen)
    }

    /// Queue `value` for transmission.
    ///
    /// Sending while the connection is connecting is reported as an error
    /// event rather than through the return value.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotOpen`] once the connection has shut down.
    pub fn send(&self, value: T) -> Result<(), ConnectionError> { self.submit(Command::Send(value)) }

    /// Close immediately, discarding buffered frames.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotOpen`] once the connection has shut down.
    pub fn close(&self) -> Result<(), ConnectionError> { self.submit(Command::Close) }

    /// Close after every frame queued so far has been transmitted.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotOpen`] once the connection has shut down.
    pub fn close_flush(&self) -> Result<(), ConnectionError> { self.submit(Command::CloseFlush) }

    /// Relay a signaling message to the negotiator.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotOpen`] once the connection has shut down.
    pub fn signal(&self, message: SignalMessage) -> Result<(), ConnectionError> {
        self.submit(Command::Signal(message))
    }

    /// Frames waiting for the transport.
    #[must_use]
    pub fn buffer_size(&self) -> usize { self.status.buffer_size() }

    /// Whether the connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool { self.status.is_open() }

    /// Identifier of the connection.
    #[must_use]
    pub fn id(&self) -> &ConnectionId { &self.id }
}
