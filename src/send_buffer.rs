//! Strict FIFO of outbound frames drained against transport backpressure.
//!
//! A frame is queued whenever the buffer is already holding frames back or
//! an immediate attempt fails. An attempt is declined while the transport's
//! buffered byte count exceeds the high-water mark; the buffer then stays in
//! buffering mode until [`SendBuffer::retry`] runs after the policy's delay.
//! Frames leave the head of the queue only after the transport accepted
//! them, and nothing is ever inserted ahead of a queued frame.

use std::{collections::VecDeque, time::Duration};

use bytes::Bytes;
use log::{debug, warn};

use crate::{
    channel::{DataChannel, TransportError, WirePayload},
    fragment::FrameHeader,
};

/// Default transport buffered-byte count above which sending pauses.
pub const DEFAULT_HIGH_WATER_MARK: usize = 8 * 1024 * 1024;
/// Default delay before buffered frames are retried.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Static backpressure thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackpressurePolicy {
    /// Transport buffered-byte count above which no attempt is made.
    pub high_water_mark: usize,
    /// Delay between backpressure detection and the next drain.
    pub retry_delay: Duration,
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// What an outbound frame carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutboundKind {
    /// A fragment of an application message.
    Fragment(FrameHeader),
    /// A control signal.
    Control,
}

/// Encoded envelope waiting for the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundFrame {
    kind: OutboundKind,
    bytes: Bytes,
}

impl OutboundFrame {
    /// Wrap an encoded envelope.
    #[must_use]
    pub fn new(kind: OutboundKind, bytes: impl Into<Bytes>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    /// What the frame carries.
    #[must_use]
    pub const fn kind(&self) -> OutboundKind { self.kind }

    /// Encoded envelope bytes.
    #[must_use]
    pub fn bytes(&self) -> &Bytes { &self.bytes }
}

/// Result of enqueueing or draining.
#[derive(Debug)]
pub enum DrainStatus {
    /// Every frame has been handed to the transport.
    Idle,
    /// Frames are held back behind an already scheduled retry.
    Waiting,
    /// Backpressure was detected; the caller must schedule a retry.
    Backpressured { retry_after: Duration },
    /// The transport raised a fault. The buffer stays in buffering mode.
    Faulted(TransportError),
}

enum Attempt {
    Sent,
    Backpressured,
    Faulted(TransportError),
}

/// Outbound FIFO owned by one connection.
#[derive(Debug, Default)]
pub struct SendBuffer {
    pending: VecDeque<OutboundFrame>,
    buffering: bool,
    policy: BackpressurePolicy,
}

impl SendBuffer {
    /// Create an empty buffer using `policy`.
    #[must_use]
    pub fn new(policy: BackpressurePolicy) -> Self {
        Self {
            pending: VecDeque::new(),
            buffering: false,
            policy,
        }
    }

    /// Number of frames waiting for the transport.
    #[must_use]
    pub fn len(&self) -> usize { self.pending.len() }

    /// Whether no frames are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.pending.is_empty() }

    /// Whether attempts are suspended until the next retry.
    #[must_use]
    pub fn is_buffering(&self) -> bool { self.buffering }

    /// Backpressure thresholds in force.
    #[must_use]
    pub fn policy(&self) -> BackpressurePolicy { self.policy }

    /// Iterate over waiting frames from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &OutboundFrame> { self.pending.iter() }

    /// Send `frame` now if possible, otherwise append it to the tail.
    ///
    /// `on_sent` observes every frame the transport accepts.
    pub fn enqueue(
        &mut self,
        frame: OutboundFrame,
        channel: &mut dyn DataChannel,
        mut on_sent: impl FnMut(&OutboundFrame),
    ) -> DrainStatus {
        if self.buffering || !self.pending.is_empty() {
            self.pending.push_back(frame);
            return DrainStatus::Waiting;
        }

        match self.attempt(&frame, channel) {
            Attempt::Sent => {
                on_sent(&frame);
                DrainStatus::Idle
            }
            Attempt::Backpressured => {
                self.pending.push_back(frame);
                self.backpressured()
            }
            Attempt::Faulted(err) => {
                self.pending.push_back(frame);
                DrainStatus::Faulted(err)
            }
        }
    }

    /// Leave buffering mode and drain as far as the transport allows.
    pub fn retry(
        &mut self,
        channel: &mut dyn DataChannel,
        mut on_sent: impl FnMut(&OutboundFrame),
    ) -> DrainStatus {
        self.buffering = false;
        loop {
            let attempt = match self.pending.front() {
                None => return DrainStatus::Idle,
                Some(frame) => Self::try_send(self.policy, frame, channel),
            };
            match attempt {
                Attempt::Sent => {
                    if let Some(frame) = self.pending.pop_front() {
                        on_sent(&frame);
                    }
                }
                Attempt::Backpressured => {
                    self.buffering = true;
                    return self.backpressured();
                }
                Attempt::Faulted(err) => {
                    self.buffering = true;
                    return DrainStatus::Faulted(err);
                }
            }
        }
    }

    /// Drop every waiting frame and leave buffering mode.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.buffering = false;
    }

    fn attempt(&mut self, frame: &OutboundFrame, channel: &mut dyn DataChannel) -> Attempt {
        let attempt = Self::try_send(self.policy, frame, channel);
        if !matches!(attempt, Attempt::Sent) {
            self.buffering = true;
        }
        attempt
    }

    fn try_send(
        policy: BackpressurePolicy,
        frame: &OutboundFrame,
        channel: &mut dyn DataChannel,
    ) -> Attempt {
        let buffered = channel.buffered_amount();
        if buffered > policy.high_water_mark {
            debug!(
                "transport backpressure: buffered_amount={buffered}, high_water_mark={}",
                policy.high_water_mark
            );
            return Attempt::Backpressured;
        }

        match channel.send(WirePayload::Binary(frame.bytes.clone())) {
            Ok(()) => {
                crate::metrics::inc_frames(crate::metrics::Direction::Outbound);
                Attempt::Sent
            }
            Err(err) => {
                warn!("transport rejected frame: kind={:?}, error={err}", frame.kind);
                Attempt::Faulted(err)
            }
        }
    }

    fn backpressured(&self) -> DrainStatus {
        DrainStatus::Backpressured {
            retry_after: self.policy.retry_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_support::RecordingChannel;

    const HWM: usize = 100;

    #[fixture]
    fn buffer() -> SendBuffer {
        SendBuffer::new(BackpressurePolicy {
            high_water_mark: HWM,
            retry_delay: Duration::from_millis(10),
        })
    }

    fn control(tag: u8) -> OutboundFrame { OutboundFrame::new(OutboundKind::Control, vec![tag]) }

    fn sent_tags(channel: &RecordingChannel) -> Vec<u8> {
        channel
            .sent()
            .into_iter()
            .map(|payload| payload.into_bytes()[0])
            .collect()
    }

    #[rstest]
    fn sends_immediately_without_pressure(mut buffer: SendBuffer) {
        let mut channel = RecordingChannel::default();
        let count = Rc::new(Cell::new(0));
        let observed = Rc::clone(&count);

        let status = buffer.enqueue(control(1), &mut channel, |_| observed.set(observed.get() + 1));

        assert!(matches!(status, DrainStatus::Idle));
        assert_eq!(sent_tags(&channel), vec![1]);
        assert_eq!(count.get(), 1);
        assert!(buffer.is_empty());
    }

    #[rstest]
    fn queues_when_high_water_mark_is_exceeded(mut buffer: SendBuffer) {
        let mut channel = RecordingChannel::default();
        channel.set_buffered_amount(HWM + 1);

        let status = buffer.enqueue(control(1), &mut channel, |_| {});
        assert!(matches!(
            status,
            DrainStatus::Backpressured { retry_after } if retry_after == Duration::from_millis(10)
        ));
        assert!(buffer.is_buffering());

        channel.set_buffered_amount(0);
        let status = buffer.enqueue(control(2), &mut channel, |_| {});
        assert!(matches!(status, DrainStatus::Waiting));
        assert!(channel.sent().is_empty(), "no attempt before the retry runs");
        assert_eq!(buffer.len(), 2);
    }

    #[rstest]
    fn buffered_amount_at_the_mark_is_not_backpressure(mut buffer: SendBuffer) {
        let mut channel = RecordingChannel::default();
        channel.set_buffered_amount(HWM);

        assert!(matches!(buffer.enqueue(control(1), &mut channel, |_| {}), DrainStatus::Idle));
    }

    #[rstest]
    fn retry_drains_in_original_order(mut buffer: SendBuffer) {
        let mut channel = RecordingChannel::default();
        channel.set_buffered_amount(HWM + 1);
        for tag in 1..=4 {
            let _ = buffer.enqueue(control(tag), &mut channel, |_| {});
        }

        channel.set_buffered_amount(0);
        let status = buffer.retry(&mut channel, |_| {});

        assert!(matches!(status, DrainStatus::Idle));
        assert_eq!(sent_tags(&channel), vec![1, 2, 3, 4]);
        assert!(!buffer.is_buffering());
    }

    #[rstest]
    fn retry_stops_when_pressure_reasserts(mut buffer: SendBuffer) {
        let mut channel = RecordingChannel::default();
        channel.set_buffered_amount(HWM + 1);
        for tag in 1..=3 {
            let _ = buffer.enqueue(control(tag), &mut channel, |_| {});
        }

        channel.set_buffered_amount(0);
        channel.raise_pressure_after(1, HWM + 1);
        let status = buffer.retry(&mut channel, |_| {});

        assert!(matches!(status, DrainStatus::Backpressured { .. }));
        assert_eq!(sent_tags(&channel), vec![1]);
        let waiting: Vec<u8> = buffer.iter().map(|frame| frame.bytes()[0]).collect();
        assert_eq!(waiting, vec![2, 3]);
        assert!(buffer.is_buffering());
    }

    #[rstest]
    fn transport_fault_keeps_frame_and_suspends_attempts(mut buffer: SendBuffer) {
        let mut channel = RecordingChannel::default();
        channel.fail_sends(true);

        let status = buffer.enqueue(control(1), &mut channel, |_| {});

        assert!(matches!(status, DrainStatus::Faulted(TransportError::Closed)));
        assert!(buffer.is_buffering());
        assert_eq!(buffer.len(), 1);
    }

    #[rstest]
    fn clear_discards_everything(mut buffer: SendBuffer) {
        let mut channel = RecordingChannel::default();
        channel.set_buffered_amount(HWM + 1);
        let _ = buffer.enqueue(control(1), &mut channel, |_| {});

        buffer.clear();

        assert!(buffer.is_empty());
        assert!(!buffer.is_buffering());
    }
}
