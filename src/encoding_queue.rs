//! Single-worker pipeline converting deferred payloads to bytes.
//!
//! Payloads that cannot be chunked straight away (for example a [`Blob`]
//! backed by a reader) are queued here. One background task converts them
//! one at a time, strictly in arrival order, and reports each result on a
//! completion channel polled by the owning connection. The first failure
//! stops the worker; the connection is expected to close in response.
//!
//! The worker is spawned on first use, so a connection that never sends a
//! deferred payload never owns a task.
//!
//! [`Blob`]: crate::serializer::Blob

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{error::ConversionError, serializer::DeferredPayload};

/// Outcome of one conversion.
pub type Completion = Result<Vec<u8>, ConversionError>;

struct Worker {
    jobs: mpsc::UnboundedSender<DeferredPayload>,
    completions: mpsc::UnboundedReceiver<Completion>,
    handle: JoinHandle<()>,
}

/// FIFO conversion queue owned by one connection.
pub struct EncodingQueue {
    worker: Option<Worker>,
    shutdown: CancellationToken,
    pending: usize,
}

impl Default for EncodingQueue {
    fn default() -> Self { Self::new() }
}

impl EncodingQueue {
    /// Create an idle queue. No task is spawned yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            worker: None,
            shutdown: CancellationToken::new(),
            pending: 0,
        }
    }

    /// Queue a conversion behind every earlier one.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Stopped`] once the queue has been destroyed
    /// or its worker has exited after a failure.
    pub fn enqueue(&mut self, payload: DeferredPayload) -> Result<(), ConversionError> {
        if self.shutdown.is_cancelled() {
            return Err(ConversionError::Stopped);
        }
        let shutdown = self.shutdown.clone();
        let worker = self.worker.get_or_insert_with(|| Worker::spawn(shutdown));
        worker
            .jobs
            .send(payload)
            .map_err(|_| ConversionError::Stopped)?;
        self.pending += 1;
        debug!(pending = self.pending, "conversion queued");
        Ok(())
    }

    /// Queue bytes that are already available behind pending conversions.
    ///
    /// # Errors
    ///
    /// See [`EncodingQueue::enqueue`].
    pub fn enqueue_ready(&mut self, bytes: Vec<u8>) -> Result<(), ConversionError> {
        self.enqueue(futures::future::ready(Ok(bytes)).boxed())
    }

    /// Number of conversions queued or in flight.
    #[must_use]
    pub fn size(&self) -> usize { self.pending }

    /// Whether nothing is queued or in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool { self.pending == 0 }

    /// Wait for the next conversion to finish.
    ///
    /// Pends forever while the queue is idle; callers guard on
    /// [`EncodingQueue::is_idle`].
    pub async fn next_completion(&mut self) -> Completion {
        if self.pending == 0 {
            return std::future::pending().await;
        }
        let Some(worker) = self.worker.as_mut() else {
            return std::future::pending().await;
        };
        let completion = worker
            .completions
            .recv()
            .await
            .unwrap_or(Err(ConversionError::Stopped));
        self.pending = self.pending.saturating_sub(1);
        completion
    }

    /// Stop the worker and discard everything queued.
    pub fn destroy(&mut self) {
        self.shutdown.cancel();
        if let Some(worker) = self.worker.take() {
            worker.handle.abort();
        }
        if self.pending > 0 {
            debug!(discarded = self.pending, "conversion queue destroyed");
        }
        self.pending = 0;
    }
}

impl Drop for EncodingQueue {
    fn drop(&mut self) { self.destroy(); }
}

impl std::fmt::Debug for EncodingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodingQueue")
            .field("pending", &self.pending)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Worker {
    fn spawn(shutdown: CancellationToken) -> Self {
        let (jobs, job_rx) = mpsc::unbounded_channel();
        let (done_tx, completions) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(job_rx, done_tx, shutdown));
        Self {
            jobs,
            completions,
            handle,
        }
    }
}

async fn run(
    mut jobs: mpsc::UnboundedReceiver<DeferredPayload>,
    completions: mpsc::UnboundedSender<Completion>,
    shutdown: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let completion = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            result = job => result.map_err(ConversionError::from),
        };

        let failed = completion.is_err();
        if let Err(err) = &completion {
            warn!(error = %err, "conversion failed; stopping pipeline");
        }
        if completions.send(completion).is_err() || failed {
            break;
        }
    }
    debug!("conversion worker stopped");
}
