//! Async polling utilities for the connection actor select loop.

use std::future::Future;

use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};

use super::ConnectionActor;
use crate::{
    channel::{ChannelEvent, ChannelHandle},
    negotiator::{NegotiationError, PendingChannel},
};

impl<T, S> ConnectionActor<T, S> {
    /// Poll `f` if `opt` is `Some`, pending forever otherwise.
    #[expect(
        clippy::manual_async_fn,
        reason = "Generic lifetime requires explicit async move"
    )]
    pub(super) fn poll_optional<'a, V, Fut, R>(
        opt: Option<&'a mut V>,
        f: impl FnOnce(&'a mut V) -> Fut + Send + 'a,
    ) -> impl Future<Output = R> + Send + 'a
    where
        V: Send + 'a,
        Fut: Future<Output = R> + Send + 'a,
    {
        async move {
            match opt {
                Some(value) => f(value).await,
                None => std::future::pending().await,
            }
        }
    }

    /// Await the negotiation outcome.
    pub(super) async fn poll_pending(
        pending: Option<&mut PendingChannel>,
    ) -> Result<Result<ChannelHandle, NegotiationError>, oneshot::error::RecvError> {
        Self::poll_optional(pending, |rx| rx).await
    }

    /// Receive the next transport event.
    pub(super) async fn poll_channel(
        events: Option<&mut mpsc::UnboundedReceiver<ChannelEvent>>,
    ) -> Option<ChannelEvent> {
        Self::poll_optional(events, mpsc::UnboundedReceiver::recv).await
    }

    /// Sleep until the retry deadline, pending forever without one.
    pub(super) async fn wait_retry(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
