//! Task driving a [`Connection`].

use log::info;
use tokio::sync::mpsc;

use super::{
    Connection,
    ConnectionHandle,
    EventStream,
    event::Event,
    handle::Command,
};
use crate::{
    channel::ChannelEvent,
    config::ConnectionConfig,
    error::ConnectionError,
    negotiator::{Negotiator, PendingChannel},
    serializer::Serializer,
};

/// Actor owning a connection and serialising everything that touches it.
///
/// Sources are polled with a biased `tokio::select!`: application commands
/// first, then the negotiation outcome, transport events, the backpressure
/// retry deadline and finally conversion results. The actor stops once the
/// connection has closed.
pub struct ConnectionActor<T, S> {
    pub(super) connection: Connection<T, S>,
    pub(super) commands: mpsc::UnboundedReceiver<Command<T>>,
    pub(super) pending: Option<PendingChannel>,
    pub(super) channel_events: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
}

/// Start negotiating a connection and spawn its actor.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`ConnectionError::SchemeMismatch`] if `serializer` does not
/// implement the scheme named by `config`. Negotiation failures are reported
/// on the returned [`EventStream`].
///
/// # Examples
///
/// ```no_run
/// use chunkwire::{
///     config::ConnectionConfig,
///     connection::{ConnectionEvent, connect},
///     negotiator::Negotiator,
///     serializer::{JsonSerializer, SerializationScheme},
/// };
///
/// # async fn example(negotiator: impl Negotiator + 'static) -> Result<(), chunkwire::ConnectionError> {
/// let config = ConnectionConfig::new().serialization(SerializationScheme::Json);
/// let (handle, mut events) = connect(config, negotiator, JsonSerializer::<String>::default())?;
/// while let Some(event) = events.recv().await {
///     match event {
///         ConnectionEvent::Open => handle.send("ping".to_owned())?,
///         ConnectionEvent::Data(reply) => println!("{reply}"),
///         _ => {}
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn connect<T, S>(
    config: ConnectionConfig,
    negotiator: impl Negotiator + 'static,
    serializer: S,
) -> Result<(ConnectionHandle<T>, EventStream<T>), ConnectionError>
where
    T: Send + 'static,
    S: Serializer<T> + 'static,
{
    let (mut connection, events) = Connection::new(config, serializer)?;
    let pending = connection.start(Box::new(negotiator));
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(tx, connection.status(), connection.id().clone());
    let actor = ConnectionActor::new(connection, rx, pending);
    tokio::spawn(actor.run());
    Ok((handle, events))
}

impl<T, S> ConnectionActor<T, S>
where
    T: Send,
    S: Serializer<T>,
{
    pub(super) fn new(
        connection: Connection<T, S>,
        commands: mpsc::UnboundedReceiver<Command<T>>,
        pending: Option<PendingChannel>,
    ) -> Self {
        Self {
            connection,
            commands,
            pending,
            channel_events: None,
        }
    }

    /// Drive the connection until it closes.
    pub async fn run(mut self) {
        while !self.connection.lifecycle.is_closed() {
            let event = self.next_event().await;
            self.dispatch_event(event);
        }
        info!(
            "connection actor stopped: connection_id={}",
            self.connection.id()
        );
    }

    /// Await the next ready event using biased priority ordering.
    async fn next_event(&mut self) -> Event<T> {
        let retry_at = self.connection.retry_deadline();
        let converting = self.connection.is_converting();
        let negotiating = self.pending.is_some();
        let attached = self.channel_events.is_some();

        tokio::select! {
            biased;

            command = self.commands.recv() => Event::Command(command),
            outcome = Self::poll_pending(self.pending.as_mut()), if negotiating => {
                Event::Negotiated(outcome)
            }
            event = Self::poll_channel(self.channel_events.as_mut()), if attached => {
                Event::Channel(event)
            }
            () = Self::wait_retry(retry_at), if retry_at.is_some() => Event::Retry,
            done = self.connection.encoding_mut().next_completion(), if converting => {
                Event::Converted(done)
            }
        }
    }
}
