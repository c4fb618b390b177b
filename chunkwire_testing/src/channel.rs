//! In-memory loopback transport.
//!
//! [`loopback_pair`] returns two connected ends. A payload sent on one end
//! is recorded and delivered to the other as [`ChannelEvent::Message`].
//! Closing either end notifies both. Each end exposes a [`ChannelControl`]
//! for scripting lifecycle events, the buffered-byte count and send faults.

use std::sync::{Arc, Mutex, MutexGuard};

use chunkwire::{ChannelEvent, ChannelHandle, DataChannel, TransportError, WirePayload};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct EndState {
    sent: Vec<WirePayload>,
    buffered_amount: usize,
    fail_sends: bool,
    closed: bool,
    max_message_size: Option<usize>,
}

type Shared = Arc<Mutex<EndState>>;

fn lock(state: &Shared) -> MutexGuard<'_, EndState> {
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Sending half of one loopback end.
struct MockChannel {
    state: Shared,
    own_events: mpsc::UnboundedSender<ChannelEvent>,
    peer_events: mpsc::UnboundedSender<ChannelEvent>,
}

impl DataChannel for MockChannel {
    fn send(&mut self, payload: WirePayload) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(TransportError::Closed);
        }
        if state.fail_sends {
            return Err(TransportError::Rejected {
                len: payload.len(),
                reason: "send fault injected".into(),
            });
        }
        if let Some(max) = state.max_message_size {
            if payload.len() > max {
                return Err(TransportError::Rejected {
                    len: payload.len(),
                    reason: format!("exceeds {max} byte message limit"),
                });
            }
        }
        state.sent.push(payload.clone());
        let _ = self.peer_events.send(ChannelEvent::Message(payload));
        Ok(())
    }

    fn buffered_amount(&self) -> usize { lock(&self.state).buffered_amount }

    fn close(&mut self) {
        let mut state = lock(&self.state);
        if state.closed {
            return;
        }
        state.closed = true;
        let _ = self.own_events.send(ChannelEvent::Closed);
        let _ = self.peer_events.send(ChannelEvent::Closed);
    }
}

/// Test-side controls for one loopback end.
#[derive(Clone)]
pub struct ChannelControl {
    state: Shared,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

impl ChannelControl {
    /// Report the transport as open.
    pub fn open(&self) { let _ = self.events.send(ChannelEvent::Open); }

    /// Set the buffered-byte count reported to the connection.
    pub fn set_buffered_amount(&self, amount: usize) { lock(&self.state).buffered_amount = amount; }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self, fail: bool) { lock(&self.state).fail_sends = fail; }

    /// Reject sends larger than `max` bytes, as a real transport would.
    pub fn set_max_message_size(&self, max: usize) {
        lock(&self.state).max_message_size = Some(max);
    }

    /// Payloads this end has accepted, in order.
    pub fn sent(&self) -> Vec<WirePayload> { lock(&self.state).sent.clone() }

    /// Inject an inbound payload as if the peer had sent it.
    pub fn deliver(&self, payload: WirePayload) {
        let _ = self.events.send(ChannelEvent::Message(payload));
    }

    /// Report the transport as closed by the remote side.
    pub fn close_remotely(&self) {
        lock(&self.state).closed = true;
        let _ = self.events.send(ChannelEvent::Closed);
    }

    /// Whether the transport was closed.
    pub fn is_closed(&self) -> bool { lock(&self.state).closed }
}

/// One end of a loopback pair.
pub struct MockEnd {
    /// Transport handed to a connection.
    pub handle: ChannelHandle,
    /// Controls for scripting this end.
    pub control: ChannelControl,
}

/// Create two connected loopback ends.
#[must_use]
pub fn loopback_pair() -> (MockEnd, MockEnd) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let a_state = Shared::default();
    let b_state = Shared::default();

    let a = MockEnd {
        handle: ChannelHandle::new(
            Box::new(MockChannel {
                state: Arc::clone(&a_state),
                own_events: a_tx.clone(),
                peer_events: b_tx.clone(),
            }),
            a_rx,
        ),
        control: ChannelControl {
            state: a_state,
            events: a_tx.clone(),
        },
    };
    let b = MockEnd {
        handle: ChannelHandle::new(
            Box::new(MockChannel {
                state: Arc::clone(&b_state),
                own_events: b_tx.clone(),
                peer_events: a_tx,
            }),
            b_rx,
        ),
        control: ChannelControl {
            state: b_state,
            events: b_tx,
        },
    };
    (a, b)
}
