//! Events delivered to the application and to the connection actor.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};

use super::handle::Command;
use crate::{
    channel::{ChannelEvent, ChannelHandle},
    encoding_queue::Completion,
    error::ConnectionError,
    fragment::FrameHeader,
    negotiator::NegotiationError,
};

/// Notification emitted by a connection.
#[derive(Debug)]
pub enum ConnectionEvent<T> {
    /// The transport opened; `send` is now accepted.
    Open,
    /// A complete message arrived and was decoded.
    Data(T),
    /// The connection closed after having been open. Emitted at most once.
    Close,
    /// A fault occurred. See [`ConnectionError::is_fatal`].
    Error(ConnectionError),
    /// The transport accepted one fragment of an outbound message.
    ChunkSent(FrameHeader),
}

/// Receiving side of a connection's events.
///
/// The stream ends after the connection has closed and its actor stopped.
#[derive(Debug)]
pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<ConnectionEvent<T>>,
}

impl<T> EventStream<T> {
    pub(super) fn new(rx: mpsc::UnboundedReceiver<ConnectionEvent<T>>) -> Self { Self { rx } }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<ConnectionEvent<T>> { self.rx.recv().await }

    /// Take the next event if one is ready.
    pub fn try_recv(&mut self) -> Option<ConnectionEvent<T>> { self.rx.try_recv().ok() }

    /// Drain every event that is ready now.
    pub fn drain(&mut self) -> Vec<ConnectionEvent<T>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl<T> Stream for EventStream<T> {
    type Item = ConnectionEvent<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Events returned by [`ConnectionActor::next_event`][super::ConnectionActor].
pub(super) enum Event<T> {
    Command(Option<Command<T>>),
    Negotiated(Result<Result<ChannelHandle, NegotiationError>, oneshot::error::RecvError>),
    Channel(Option<ChannelEvent>),
    Retry,
    Converted(Completion),
}
