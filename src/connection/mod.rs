//! Connection orchestration and lifecycle.
//!
//! A [`Connection`] owns one transport, one serializer, one chunker, one
//! re-assembler and one send buffer. It turns application values into
//! frames and inbound frames back into values, and it owns the
//! `Connecting → Open → Closed` lifecycle.
//!
//! The connection itself is a synchronous state machine. [`connect`] spawns
//! a [`ConnectionActor`] that owns it and feeds it commands, negotiation
//! results, transport events, backpressure retries and conversion results
//! one at a time using a `tokio::select!` loop. Applications talk to the
//! actor through a [`ConnectionHandle`] and observe it through an
//! [`EventStream`].

mod actor;
mod counter;
mod dispatch;
mod event;
mod handle;
mod inbound;
mod outbound;
mod polling;
mod shutdown;
mod signal;
mod state;

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

pub use actor::{ConnectionActor, connect};
use counter::ActiveConnection;
pub use counter::active_connection_count;
pub use event::{ConnectionEvent, EventStream};
pub use handle::ConnectionHandle;
use log::{debug, info, warn};
use state::Lifecycle;
pub use state::ConnectionState;
use tokio::{sync::mpsc, time::Instant};

use crate::{
    channel::{ChannelEvent, ChannelHandle, DataChannel},
    config::{ConnectionConfig, ConnectionId},
    encoding_queue::EncodingQueue,
    error::ConnectionError,
    fragment::{Chunker, MessageId, Reassembler},
    negotiator::{NegotiationError, Negotiator, PendingChannel},
    send_buffer::SendBuffer,
    serializer::Serializer,
};

/// State mirrored for [`ConnectionHandle`] readers.
#[derive(Debug, Default)]
pub(crate) struct SharedStatus {
    open: AtomicBool,
    buffered: AtomicUsize,
}

impl SharedStatus {
    pub(crate) fn is_open(&self) -> bool { self.open.load(Ordering::Acquire) }

    pub(crate) fn buffer_size(&self) -> usize { self.buffered.load(Ordering::Acquire) }

    fn publish(&self, open: bool, buffered: usize) {
        self.buffered.store(buffered, Ordering::Release);
        self.open.store(open, Ordering::Release);
    }
}

/// Chunked message transport over one [`DataChannel`].
pub struct Connection<T, S> {
    config: ConnectionConfig,
    serializer: S,
    chunker: Chunker,
    reassembler: Reassembler,
    send_buffer: SendBuffer,
    encoding: EncodingQueue,
    channel: Option<Box<dyn DataChannel>>,
    negotiator: Option<Box<dyn Negotiator>>,
    lifecycle: Lifecycle,
    retry_at: Option<Instant>,
    flush_requested: bool,
    events: mpsc::UnboundedSender<ConnectionEvent<T>>,
    status: Arc<SharedStatus>,
    counter: Option<ActiveConnection>,
}

impl<T, S> Connection<T, S>
where
    S: Serializer<T>,
{
    /// Create a connection in the `Connecting` state.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::SchemeMismatch`] if `serializer` does not
    /// implement the scheme named by `config`.
    pub fn new(
        config: ConnectionConfig,
        serializer: S,
    ) -> Result<(Self, EventStream<T>), ConnectionError> {
        let actual = serializer.scheme();
        if actual != config.scheme() {
            return Err(ConnectionError::SchemeMismatch {
                configured: config.scheme(),
                actual,
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Self {
            chunker: Chunker::new(config.fragmentation_config().fragment_payload_cap()),
            reassembler: Reassembler::new(),
            send_buffer: SendBuffer::new(config.backpressure_policy()),
            encoding: EncodingQueue::new(),
            channel: None,
            negotiator: None,
            lifecycle: Lifecycle::new(),
            retry_at: None,
            flush_requested: false,
            events: tx,
            status: Arc::new(SharedStatus::default()),
            counter: None,
            serializer,
            config,
        };
        debug!(
            "connection created: connection_id={}, label={}, serialization={}, reliable={}",
            connection.config.id(),
            connection.config.label_or_id(),
            connection.config.scheme(),
            connection.config.is_reliable(),
        );
        Ok((connection, EventStream::new(rx)))
    }

    /// Hand negotiation to `negotiator`.
    ///
    /// Returns the receiver that resolves once a transport is available, or
    /// `None` if negotiation could not start, in which case an error event
    /// has been emitted and the connection closed.
    pub fn start(&mut self, negotiator: Box<dyn Negotiator>) -> Option<PendingChannel> {
        if self.lifecycle.is_closed() {
            return None;
        }
        let negotiator = self.negotiator.insert(negotiator);
        let offer = self.config.remote_offer().cloned();
        match negotiator.start_connection(self.config.is_initiator(), offer) {
            Ok(pending) => Some(pending),
            Err(err) => {
                self.fail(err.into());
                None
            }
        }
    }

    /// Accept the outcome of negotiation.
    ///
    /// On success the negotiator is released and the transport attached; the
    /// returned receiver carries the transport's events.
    pub fn on_negotiated(
        &mut self,
        result: Result<ChannelHandle, NegotiationError>,
    ) -> Option<mpsc::UnboundedReceiver<ChannelEvent>> {
        match result {
            Ok(handle) => {
                let (mut channel, events) = handle.into_parts();
                if self.lifecycle.is_closed() {
                    channel.close();
                    return None;
                }
                self.negotiator = None;
                self.channel = Some(channel);
                debug!(
                    "transport attached: connection_id={}, label={}",
                    self.config.id(),
                    self.config.label_or_id()
                );
                Some(events)
            }
            Err(err) => {
                if !self.lifecycle.is_closed() {
                    self.fail(err.into());
                }
                None
            }
        }
    }

    /// Identifier of this connection.
    #[must_use]
    pub fn id(&self) -> &ConnectionId { self.config.id() }

    /// Label of this connection, falling back to its identifier.
    #[must_use]
    pub fn label(&self) -> &str { self.config.label_or_id() }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { self.lifecycle.state() }

    /// Whether `send` is currently accepted.
    #[must_use]
    pub fn is_open(&self) -> bool { self.lifecycle.is_open() }

    /// Number of frames waiting in the send buffer.
    #[must_use]
    pub fn buffer_size(&self) -> usize { self.send_buffer.len() }

    /// Identifier the next outbound message will carry.
    #[must_use]
    pub fn next_message_id(&self) -> Option<MessageId> { self.chunker.next_message_id() }

    /// Deadline of the scheduled backpressure retry, if any.
    #[must_use]
    pub fn retry_deadline(&self) -> Option<Instant> { self.retry_at }

    /// Whether deferred payloads are queued or converting.
    #[must_use]
    pub fn is_converting(&self) -> bool { !self.encoding.is_idle() }

    pub(crate) fn status(&self) -> Arc<SharedStatus> { Arc::clone(&self.status) }

    pub(super) fn encoding_mut(&mut self) -> &mut EncodingQueue { &mut self.encoding }

    fn publish_status(&self) {
        self.status
            .publish(self.lifecycle.is_open(), self.send_buffer.len());
    }

    fn emit(&self, event: ConnectionEvent<T>) {
        if self.events.send(event).is_err() {
            debug!(
                "event dropped, receiver gone: connection_id={}",
                self.config.id()
            );
        }
    }

    fn emit_error(&self, error: ConnectionError) {
        crate::metrics::inc_errors();
        self.emit(ConnectionEvent::Error(error));
    }

    /// Report a fatal fault and close.
    fn fail(&mut self, error: ConnectionError) {
        warn!(
            "connection fault: connection_id={}, label={}, error={error}",
            self.config.id(),
            self.config.label_or_id()
        );
        self.emit_error(error);
        self.close();
    }

    fn log_open(&self) {
        info!(
            "connection open: connection_id={}, label={}, chunkwire_active_connections={}",
            self.config.id(),
            self.config.label_or_id(),
            active_connection_count()
        );
    }
}

impl<T, S> std::fmt::Debug for Connection<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", self.config.id())
            .field("state", &self.lifecycle.state())
            .field("buffered", &self.send_buffer.len())
            .field("reassembling", &self.reassembler.buffered_len())
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
