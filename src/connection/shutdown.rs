//! Closing a connection.

use log::info;

use super::{Connection, ConnectionEvent};
use crate::serializer::Serializer;

impl<T, S> Connection<T, S>
where
    S: Serializer<T>,
{
    /// Close the connection.
    ///
    /// Discards buffered frames and partial messages, releases the negotiator
    /// and the transport, and stops the conversion pipeline. A close event is
    /// emitted only if the connection had been open. Closing again is a
    /// no-op.
    pub fn close(&mut self) {
        let Some(was_open) = self.lifecycle.close() else {
            return;
        };

        let discarded = self.send_buffer.len();
        self.send_buffer.clear();
        self.reassembler.clear();
        self.encoding.destroy();
        self.retry_at = None;
        self.flush_requested = false;
        if let Some(mut negotiator) = self.negotiator.take() {
            negotiator.cleanup();
        }
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.counter = None;
        self.publish_status();

        info!(
            "connection closed: connection_id={}, label={}, discarded_frames={discarded}",
            self.config.id(),
            self.config.label_or_id()
        );
        if was_open {
            self.emit(ConnectionEvent::Close);
        }
    }
}
