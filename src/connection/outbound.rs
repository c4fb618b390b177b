//! Outbound path: serialization, chunking and the send buffer.

use log::{debug, info};
use tokio::{sync::mpsc, time::Instant};

use super::{Connection, ConnectionEvent};
use crate::{
    encoding_queue::Completion,
    error::ConnectionError,
    fragment::{ControlMessage, Envelope, encode_envelope},
    send_buffer::{DrainStatus, OutboundFrame, OutboundKind},
    serializer::{Encoded, Serializer},
};

impl<T, S> Connection<T, S>
where
    S: Serializer<T>,
{
    /// Serialize, chunk and transmit `value`.
    ///
    /// Emits [`ConnectionError::NotOpen`] unless the connection is open, and
    /// [`ConnectionError::Encode`] if the serializer rejects the value. Both
    /// leave the connection open.
    pub fn send(&mut self, value: T) {
        if !self.lifecycle.is_open() {
            self.emit_error(ConnectionError::NotOpen);
            return;
        }

        let queued = match self.serializer.encode(value) {
            Err(err) => {
                self.emit_error(ConnectionError::Encode(err));
                return;
            }
            Ok(Encoded::Ready(payload)) if self.encoding.is_idle() => {
                self.transmit(&payload);
                return;
            }
            // Keep application order behind conversions already in flight.
            Ok(Encoded::Ready(payload)) => self.encoding.enqueue_ready(payload),
            Ok(Encoded::Deferred(pending)) => self.encoding.enqueue(pending),
        };
        if let Err(err) = queued {
            self.fail(err.into());
        }
    }

    /// Close once every frame queued so far has reached the transport.
    ///
    /// A close notification is queued behind pending frames; the remote
    /// closes on receipt and this side closes when the transport reports
    /// it closed. Closes immediately when the connection is not open.
    pub fn close_flush(&mut self) {
        if !self.lifecycle.is_open() {
            self.close();
            return;
        }
        if self.encoding.is_idle() {
            self.send_close_notification();
        } else {
            self.flush_requested = true;
        }
    }

    /// Run the scheduled backpressure retry.
    pub fn on_retry(&mut self) {
        self.retry_at = None;
        if !self.lifecycle.is_open() {
            return;
        }
        let Some(channel) = self.channel.as_deref_mut() else {
            return;
        };
        let events = &self.events;
        let status = self
            .send_buffer
            .retry(channel, |frame| notify_sent(events, frame));
        self.after_drain(status);
    }

    /// Accept the result of a deferred conversion.
    pub fn on_conversion(&mut self, completion: Completion) {
        match completion {
            Ok(payload) if self.lifecycle.is_open() => self.transmit(&payload),
            Ok(_) => {}
            Err(err) => self.fail(err.into()),
        }
        if self.flush_requested && self.encoding.is_idle() && self.lifecycle.is_open() {
            self.flush_requested = false;
            self.send_close_notification();
        }
    }

    fn transmit(&mut self, payload: &[u8]) {
        let batch = match self.chunker.chunk(payload) {
            Ok(batch) => batch,
            Err(err) => {
                self.emit_error(err.into());
                return;
            }
        };
        if batch.is_fragmented() {
            debug!(
                "chunking payload: connection_id={}, message_id={}, len={}, fragments={}",
                self.config.id(),
                batch.message_id(),
                payload.len(),
                batch.len()
            );
        }

        for frame in batch {
            let header = *frame.header();
            match encode_envelope(&Envelope::Frame(frame)) {
                Ok(bytes) => {
                    self.enqueue(OutboundFrame::new(OutboundKind::Fragment(header), bytes));
                }
                Err(err) => {
                    self.fail(err.into());
                    return;
                }
            }
            if !self.lifecycle.is_open() {
                return;
            }
        }
    }

    fn send_close_notification(&mut self) {
        info!(
            "flushing before close: connection_id={}, pending_frames={}",
            self.config.id(),
            self.send_buffer.len()
        );
        match encode_envelope(&Envelope::Control(ControlMessage::close())) {
            Ok(bytes) => self.enqueue(OutboundFrame::new(OutboundKind::Control, bytes)),
            Err(err) => self.fail(err.into()),
        }
    }

    fn enqueue(&mut self, frame: OutboundFrame) {
        let Some(channel) = self.channel.as_deref_mut() else {
            return;
        };
        let events = &self.events;
        let status = self
            .send_buffer
            .enqueue(frame, channel, |sent| notify_sent(events, sent));
        self.after_drain(status);
    }

    fn after_drain(&mut self, status: DrainStatus) {
        match status {
            DrainStatus::Idle | DrainStatus::Waiting => {}
            DrainStatus::Backpressured { retry_after } => {
                if self.retry_at.is_none() {
                    debug!(
                        "buffering: connection_id={}, pending_frames={}, retry_in_ms={}",
                        self.config.id(),
                        self.send_buffer.len(),
                        retry_after.as_millis()
                    );
                    self.retry_at = Some(Instant::now() + retry_after);
                }
            }
            DrainStatus::Faulted(err) => {
                self.fail(err.into());
                return;
            }
        }
        self.publish_status();
    }
}

fn notify_sent<T>(events: &mpsc::UnboundedSender<ConnectionEvent<T>>, frame: &OutboundFrame) {
    if let OutboundKind::Fragment(header) = frame.kind() {
        let _ = events.send(ConnectionEvent::ChunkSent(header));
    }
}
