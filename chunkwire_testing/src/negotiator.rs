//! Scripted negotiator.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use chunkwire::{ChannelHandle, NegotiationError, Negotiator, PendingChannel};
use tokio::sync::oneshot;

type Outcome = Result<ChannelHandle, NegotiationError>;

#[derive(Debug, Default)]
struct Record {
    starts: Vec<(bool, Option<Bytes>)>,
    descriptions: Vec<Bytes>,
    candidates: Vec<Bytes>,
    cleanups: usize,
}

/// Observes what a [`MockNegotiator`] was asked to do.
#[derive(Clone, Debug, Default)]
pub struct NegotiatorProbe {
    record: Arc<Mutex<Record>>,
}

impl NegotiatorProbe {
    fn lock(&self) -> MutexGuard<'_, Record> {
        self.record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Arguments of every `start_connection` call.
    pub fn starts(&self) -> Vec<(bool, Option<Bytes>)> { self.lock().starts.clone() }

    /// Remote descriptions applied.
    pub fn descriptions(&self) -> Vec<Bytes> { self.lock().descriptions.clone() }

    /// Remote candidates applied.
    pub fn candidates(&self) -> Vec<Bytes> { self.lock().candidates.clone() }

    /// Number of `cleanup` calls.
    pub fn cleanups(&self) -> usize { self.lock().cleanups }
}

enum Script {
    Ready(Outcome),
    Manual(oneshot::Receiver<Outcome>),
    Refuse(String),
}

/// Negotiator whose outcome is fixed up front or resolved by the test.
pub struct MockNegotiator {
    script: Option<Script>,
    probe: NegotiatorProbe,
}

/// Resolves a manually scripted negotiation.
pub struct NegotiationControl {
    outcome: oneshot::Sender<Outcome>,
}

impl NegotiationControl {
    /// Complete negotiation with `handle`.
    pub fn succeed(self, handle: ChannelHandle) { let _ = self.outcome.send(Ok(handle)); }

    /// Fail negotiation with `error`.
    pub fn fail(self, error: NegotiationError) { let _ = self.outcome.send(Err(error)); }
}

impl MockNegotiator {
    fn scripted(script: Script) -> (Self, NegotiatorProbe) {
        let probe = NegotiatorProbe::default();
        let negotiator = Self {
            script: Some(script),
            probe: probe.clone(),
        };
        (negotiator, probe)
    }

    /// Hand `handle` over as soon as negotiation starts.
    #[must_use]
    pub fn ready(handle: ChannelHandle) -> (Self, NegotiatorProbe) {
        Self::scripted(Script::Ready(Ok(handle)))
    }

    /// Fail asynchronously once negotiation starts.
    #[must_use]
    pub fn failing(error: NegotiationError) -> (Self, NegotiatorProbe) {
        Self::scripted(Script::Ready(Err(error)))
    }

    /// Refuse to start at all.
    #[must_use]
    pub fn refusing(reason: impl Into<String>) -> (Self, NegotiatorProbe) {
        Self::scripted(Script::Refuse(reason.into()))
    }

    /// Let the test decide when and how negotiation ends.
    #[must_use]
    pub fn manual() -> (Self, NegotiatorProbe, NegotiationControl) {
        let (tx, rx) = oneshot::channel();
        let (negotiator, probe) = Self::scripted(Script::Manual(rx));
        (negotiator, probe, NegotiationControl { outcome: tx })
    }
}

impl Negotiator for MockNegotiator {
    fn start_connection(
        &mut self,
        initiator: bool,
        offer: Option<Bytes>,
    ) -> Result<PendingChannel, NegotiationError> {
        self.probe.lock().starts.push((initiator, offer));
        match self.script.take() {
            Some(Script::Ready(outcome)) => {
                let (tx, rx) = oneshot::channel();
                let _ = tx.send(outcome);
                Ok(rx)
            }
            Some(Script::Manual(rx)) => Ok(rx),
            Some(Script::Refuse(reason)) => Err(NegotiationError::Failed(reason)),
            None => Err(NegotiationError::Failed("negotiation already started".into())),
        }
    }

    fn handle_remote_description(&mut self, description: Bytes) -> Result<(), NegotiationError> {
        if description.is_empty() {
            return Err(NegotiationError::Description("empty description".into()));
        }
        self.probe.lock().descriptions.push(description);
        Ok(())
    }

    fn handle_remote_candidate(&mut self, candidate: Bytes) -> Result<(), NegotiationError> {
        self.probe.lock().candidates.push(candidate);
        Ok(())
    }

    fn cleanup(&mut self) { self.probe.lock().cleanups += 1; }
}
