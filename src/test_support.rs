//! In-crate doubles for the transport and negotiator seams.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::{
    channel::{ChannelEvent, ChannelHandle, DataChannel, TransportError, WirePayload},
    negotiator::{NegotiationError, Negotiator, PendingChannel},
};

#[derive(Debug, Default)]
struct ChannelState {
    sent: Vec<WirePayload>,
    buffered_amount: usize,
    pressure_after: Option<(usize, usize)>,
    fail_sends: bool,
    closes: usize,
}

/// Transport that records every payload it accepts.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordingChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl RecordingChannel {
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().expect("recording channel poisoned")
    }

    pub(crate) fn sent(&self) -> Vec<WirePayload> { self.lock().sent.clone() }

    pub(crate) fn set_buffered_amount(&self, amount: usize) { self.lock().buffered_amount = amount; }

    /// Report `amount` buffered bytes once `sends` more payloads were accepted.
    pub(crate) fn raise_pressure_after(&self, sends: usize, amount: usize) {
        let mut state = self.lock();
        let target = state.sent.len() + sends;
        state.pressure_after = Some((target, amount));
    }

    pub(crate) fn fail_sends(&self, fail: bool) { self.lock().fail_sends = fail; }

    pub(crate) fn closes(&self) -> usize { self.lock().closes }

    /// Wrap a clone of this channel into a handle with a fresh event feed.
    pub(crate) fn handle(&self) -> (ChannelHandle, mpsc::UnboundedSender<ChannelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelHandle::new(Box::new(self.clone()), rx), tx)
    }
}

impl DataChannel for RecordingChannel {
    fn send(&mut self, payload: WirePayload) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.fail_sends {
            return Err(TransportError::Closed);
        }
        state.sent.push(payload);
        if let Some((target, amount)) = state.pressure_after {
            if state.sent.len() >= target {
                state.buffered_amount = amount;
                state.pressure_after = None;
            }
        }
        Ok(())
    }

    fn buffered_amount(&self) -> usize { self.lock().buffered_amount }

    fn close(&mut self) { self.lock().closes += 1; }
}

#[derive(Debug, Default)]
struct NegotiatorState {
    started: Option<(bool, Option<Bytes>)>,
    descriptions: Vec<Bytes>,
    candidates: Vec<Bytes>,
    cleanups: usize,
    fail_start: bool,
}

/// Negotiator whose outcome is resolved by the test.
#[derive(Clone, Debug, Default)]
pub(crate) struct StubNegotiator {
    state: Arc<Mutex<NegotiatorState>>,
    outcome: Arc<Mutex<Option<oneshot::Sender<Result<ChannelHandle, NegotiationError>>>>>,
}

impl StubNegotiator {
    fn lock(&self) -> MutexGuard<'_, NegotiatorState> {
        self.state.lock().expect("stub negotiator poisoned")
    }

    pub(crate) fn failing_start() -> Self {
        let stub = Self::default();
        stub.lock().fail_start = true;
        stub
    }

    pub(crate) fn started(&self) -> Option<(bool, Option<Bytes>)> { self.lock().started.clone() }

    pub(crate) fn descriptions(&self) -> Vec<Bytes> { self.lock().descriptions.clone() }

    pub(crate) fn candidates(&self) -> Vec<Bytes> { self.lock().candidates.clone() }

    pub(crate) fn cleanups(&self) -> usize { self.lock().cleanups }

    /// Resolve the pending negotiation.
    pub(crate) fn resolve(&self, result: Result<ChannelHandle, NegotiationError>) {
        let sender = self.outcome.lock().expect("stub negotiator poisoned").take();
        if let Some(sender) = sender {
            let _ = sender.send(result);
        }
    }
}

impl Negotiator for StubNegotiator {
    fn start_connection(
        &mut self,
        initiator: bool,
        offer: Option<Bytes>,
    ) -> Result<PendingChannel, NegotiationError> {
        let mut state = self.lock();
        if state.fail_start {
            return Err(NegotiationError::Failed("no route to peer".into()));
        }
        state.started = Some((initiator, offer));
        let (tx, rx) = oneshot::channel();
        *self.outcome.lock().expect("stub negotiator poisoned") = Some(tx);
        Ok(rx)
    }

    fn handle_remote_description(&mut self, description: Bytes) -> Result<(), NegotiationError> {
        if description.is_empty() {
            return Err(NegotiationError::Description("empty description".into()));
        }
        self.lock().descriptions.push(description);
        Ok(())
    }

    fn handle_remote_candidate(&mut self, candidate: Bytes) -> Result<(), NegotiationError> {
        self.lock().candidates.push(candidate);
        Ok(())
    }

    fn cleanup(&mut self) { self.lock().cleanups += 1; }
}
