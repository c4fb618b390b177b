//! Event dispatching for the connection actor.

use log::debug;

use super::{ConnectionActor, event::Event, handle::Command};
use crate::{
    channel::ChannelEvent,
    negotiator::NegotiationError,
    serializer::Serializer,
};

impl<T, S> ConnectionActor<T, S>
where
    T: Send,
    S: Serializer<T>,
{
    /// Dispatch the given event to the connection.
    pub(super) fn dispatch_event(&mut self, event: Event<T>) {
        match event {
            Event::Command(Some(command)) => self.process_command(command),
            Event::Command(None) => {
                debug!(
                    "all handles dropped: connection_id={}",
                    self.connection.id()
                );
                self.connection.close();
            }
            Event::Negotiated(outcome) => {
                self.pending = None;
                let result = outcome.unwrap_or(Err(NegotiationError::Abandoned));
                self.channel_events = self.connection.on_negotiated(result);
            }
            Event::Channel(Some(event)) => self.connection.handle_channel_event(event),
            Event::Channel(None) => {
                self.channel_events = None;
                self.connection.handle_channel_event(ChannelEvent::Closed);
            }
            Event::Retry => self.connection.on_retry(),
            Event::Converted(completion) => self.connection.on_conversion(completion),
        }
    }

    fn process_command(&mut self, command: Command<T>) {
        match command {
            Command::Send(value) => self.connection.send(value),
            Command::Close => self.connection.close(),
            Command::CloseFlush => self.connection.close_flush(),
            Command::Signal(message) => self.connection.handle_signal(message),
        }
    }
}
