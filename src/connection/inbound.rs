//! Transport events and inbound frames.

use log::{debug, info, warn};

use super::{Connection, ConnectionEvent, counter::ActiveConnection};
use crate::{
    channel::{ChannelEvent, WirePayload},
    error::ConnectionError,
    fragment::{
        ControlMessage,
        ControlSignal,
        Envelope,
        Frame,
        decode_binary_string,
        decode_envelope,
    },
    metrics::{self, Direction},
    serializer::Serializer,
};

impl<T, S> Connection<T, S>
where
    S: Serializer<T>,
{
    /// React to a notification from the transport.
    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Open => self.on_open(),
            ChannelEvent::Message(payload) => self.on_message(payload),
            ChannelEvent::Closed => {
                debug!(
                    "transport closed: connection_id={}, label={}",
                    self.config.id(),
                    self.config.label_or_id()
                );
                self.close();
            }
        }
    }

    fn on_open(&mut self) {
        if !self.lifecycle.open() {
            return;
        }
        self.counter = Some(ActiveConnection::new());
        self.log_open();
        self.publish_status();
        self.emit(ConnectionEvent::Open);
    }

    fn on_message(&mut self, payload: WirePayload) {
        if self.lifecycle.is_closed() {
            return;
        }
        metrics::inc_frames(Direction::Inbound);

        let decoded = match payload {
            WirePayload::Binary(bytes) => decode_envelope(&bytes),
            WirePayload::Text(text) => decode_binary_string(&text),
        };
        match decoded {
            Ok(Envelope::Frame(frame)) => self.on_frame(frame),
            Ok(Envelope::Control(control)) => self.on_control(&control),
            Err(err) => self.fail(err.into()),
        }
    }

    fn on_control(&mut self, control: &ControlMessage) {
        match control.signal() {
            ControlSignal::Close => {
                info!(
                    "remote requested close: connection_id={}, label={}",
                    self.config.id(),
                    self.config.label_or_id()
                );
                self.close();
            }
            ControlSignal::Unrecognized(kind) => {
                metrics::inc_errors();
                warn!(
                    "ignoring control message: connection_id={}, error={}",
                    self.config.id(),
                    ConnectionError::UnrecognizedControl { kind }
                );
            }
        }
    }

    fn on_frame(&mut self, frame: Frame) {
        let header = *frame.header();
        match self.reassembler.push(frame) {
            Ok(None) => {
                if let Some((received, total)) = self.reassembler.progress(header.id()) {
                    debug!(
                        "fragment buffered: connection_id={}, message_id={}, received={received}, \
                         total={total}",
                        self.config.id(),
                        header.id()
                    );
                }
            }
            Ok(Some(message)) => self.deliver(message.into_payload()),
            Err(err) => {
                warn!(
                    "dropping fragment: connection_id={}, error={err}",
                    self.config.id()
                );
                self.emit_error(err.into());
            }
        }
    }

    fn deliver(&self, payload: Vec<u8>) {
        match self.serializer.decode(payload) {
            Ok(value) => self.emit(ConnectionEvent::Data(value)),
            Err(err) => {
                warn!(
                    "dropping undecodable message: connection_id={}, serialization={}, error={err}",
                    self.config.id(),
                    self.config.scheme()
                );
                self.emit_error(ConnectionError::Decode(err));
            }
        }
    }
}
