//! Shared utilities for integration tests.
//!
//! Builds pairs of live connections joined by the in-memory loopback
//! transport so tests can drive both ends through their public handles.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use chunkwire::{
    ConnectionConfig,
    ConnectionEvent,
    ConnectionHandle,
    EventStream,
    SerializationScheme,
    Serializer,
    connect,
};
use chunkwire_testing::{ChannelControl, MockNegotiator, NegotiatorProbe, loopback_pair, next_event};

/// One live end of a connected pair.
pub struct Peer<T> {
    pub handle: ConnectionHandle<T>,
    pub events: EventStream<T>,
    pub control: ChannelControl,
    pub probe: NegotiatorProbe,
}

/// Configuration with a fixed id and the given scheme.
pub fn config(id: &str, scheme: SerializationScheme) -> ConnectionConfig {
    ConnectionConfig::new()
        .connection_id(id)
        .serialization(scheme)
}

/// Spawn two connections over a loopback transport and wait until both
/// report [`ConnectionEvent::Open`].
#[expect(
    clippy::expect_used,
    reason = "a pair that cannot connect must abort the test immediately"
)]
pub async fn connected_pair<T, S>(
    left: ConnectionConfig,
    right: ConnectionConfig,
    serializer: S,
) -> (Peer<T>, Peer<T>)
where
    T: Send + 'static,
    S: Serializer<T> + Clone + Send + 'static,
{
    let (left_end, right_end) = loopback_pair();
    left_end.control.open();
    right_end.control.open();

    let (left_negotiator, left_probe) = MockNegotiator::ready(left_end.handle);
    let (right_negotiator, right_probe) = MockNegotiator::ready(right_end.handle);
    let (left_handle, mut left_events) =
        connect(left, left_negotiator, serializer.clone()).expect("left connection starts");
    let (right_handle, mut right_events) =
        connect(right, right_negotiator, serializer).expect("right connection starts");

    assert!(matches!(next_event!(left_events), ConnectionEvent::Open));
    assert!(matches!(next_event!(right_events), ConnectionEvent::Open));

    (
        Peer {
            handle: left_handle,
            events: left_events,
            control: left_end.control,
            probe: left_probe,
        },
        Peer {
            handle: right_handle,
            events: right_events,
            control: right_end.control,
            probe: right_probe,
        },
    )
}

/// Collect events until the stream ends.
pub async fn drain_until_end<T>(events: &mut EventStream<T>) -> Vec<ConnectionEvent<T>> {
    let mut seen = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(std::time::Duration::from_secs(1), events.recv()).await
    {
        seen.push(event);
    }
    seen
}
