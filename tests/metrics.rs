#![cfg(feature = "metrics")]
//! Tests for `chunkwire` metrics.
//!
//! These drive connections synchronously inside a thread-local
//! `metrics_util::debugging::DebuggingRecorder` so parallel tests cannot
//! pollute the counts.

use bytes::Bytes;
use chunkwire::{
    CONNECTIONS_ACTIVE,
    ChannelEvent,
    Connection,
    ConnectionConfig,
    ERRORS_TOTAL,
    EventStream,
    FRAMES_PROCESSED,
    JsonSerializer,
    SerializationScheme,
    WirePayload,
    fragment::{ControlMessage, Envelope, encode_envelope},
    metrics::{self as wire_metrics, Direction},
};
use chunkwire_testing::{MockEnd, counter_value, gauge_value, loopback_pair, snapshot};
use metrics_util::debugging::{DebuggingRecorder, Snapshotter};
use rstest::rstest;

type JsonConnection = Connection<String, JsonSerializer<String>>;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn open_connection(id: &str, end: MockEnd) -> (JsonConnection, EventStream<String>) {
    let config = ConnectionConfig::new()
        .connection_id(id)
        .serialization(SerializationScheme::Json);
    let (mut connection, events) =
        Connection::new(config, JsonSerializer::default()).expect("json scheme matches");
    assert!(connection.on_negotiated(Ok(end.handle)).is_some());
    connection.handle_channel_event(ChannelEvent::Open);
    (connection, events)
}

#[rstest]
#[case::inbound(Direction::Inbound, "inbound")]
#[case::outbound(Direction::Outbound, "outbound")]
fn frame_metric_is_labelled_by_direction(#[case] direction: Direction, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || wire_metrics::inc_frames(direction));

    let entries = snapshot(&snapshotter);
    assert_eq!(
        counter_value(&entries, FRAMES_PROCESSED, Some(("direction", label))),
        1
    );
}

#[test]
fn connection_traffic_is_recorded() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let (left_end, right_end) = loopback_pair();
        let left_control = left_end.control.clone();
        let (mut left, _left_events) = open_connection("dc_left", left_end);
        let (mut right, mut right_events) = open_connection("dc_right", right_end);

        left.send("ping".to_owned());
        for payload in left_control.sent() {
            right.handle_channel_event(ChannelEvent::Message(payload));
        }
        let unknown = encode_envelope(&Envelope::Control(ControlMessage::with_kind("pause")))
            .expect("control envelope encodes");
        right.handle_channel_event(ChannelEvent::Message(WirePayload::Binary(unknown.into())));
        assert!(right.is_open());

        right.handle_channel_event(ChannelEvent::Message(WirePayload::Binary(
            Bytes::from_static(&[0xFF, 0xFF, 0xFF]),
        )));
        assert!(!right.is_open());
        left.close();
        assert!(right_events.drain().len() >= 3);
    });

    let entries = snapshot(&snapshotter);
    assert_eq!(
        counter_value(&entries, FRAMES_PROCESSED, Some(("direction", "outbound"))),
        1
    );
    assert_eq!(
        counter_value(&entries, FRAMES_PROCESSED, Some(("direction", "inbound"))),
        3
    );
    assert_eq!(counter_value(&entries, ERRORS_TOTAL, None), 2);
    assert_eq!(gauge_value(&entries, CONNECTIONS_ACTIVE), Some(0.0));
}

#[test]
fn rejected_sends_count_as_errors() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let config = ConnectionConfig::new().serialization(SerializationScheme::Json);
        let (mut connection, _events): (JsonConnection, _) =
            Connection::new(config, JsonSerializer::default()).expect("json scheme matches");
        connection.send("too early".to_owned());
        connection.send("still early".to_owned());
    });

    let entries = snapshot(&snapshotter);
    assert_eq!(counter_value(&entries, ERRORS_TOTAL, None), 2);
    assert_eq!(
        counter_value(&entries, FRAMES_PROCESSED, Some(("direction", "outbound"))),
        0
    );
    assert_eq!(gauge_value(&entries, CONNECTIONS_ACTIVE), None);
}
