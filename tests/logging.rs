//! Log records emitted over a connection's lifetime.

use bytes::Bytes;
use chunkwire::{
    BackpressurePolicy,
    ChannelEvent,
    Connection,
    ConnectionConfig,
    EventStream,
    JsonSerializer,
    SerializationScheme,
    SignalMessage,
    WirePayload,
    fragment::{ControlMessage, Envelope, encode_envelope},
};
use chunkwire_testing::{ChannelControl, LoggerHandle, logger, loopback_pair};
use log::Level;
use rstest::rstest;
use serial_test::serial;

type JsonConnection = Connection<String, JsonSerializer<String>>;

fn opened(config: ConnectionConfig) -> (JsonConnection, EventStream<String>, ChannelControl) {
    let (end, _peer) = loopback_pair();
    let (mut connection, events) = Connection::new(
        config.serialization(SerializationScheme::Json),
        JsonSerializer::default(),
    )
    .expect("json scheme matches");
    assert!(connection.on_negotiated(Ok(end.handle)).is_some());
    connection.handle_channel_event(ChannelEvent::Open);
    (connection, events, end.control)
}

#[rstest]
#[serial]
fn open_and_close_are_logged_with_identity(mut logger: LoggerHandle) {
    let (mut connection, _events, _control) = opened(
        ConnectionConfig::new()
            .connection_id("dc_logged")
            .label("chat"),
    );
    connection.close();

    let infos = logger.take_messages(Level::Info);
    assert!(
        infos
            .iter()
            .any(|m| m.contains("connection open") && m.contains("connection_id=dc_logged")),
        "missing open record: {infos:?}"
    );
    assert!(
        infos
            .iter()
            .any(|m| m.contains("connection closed") && m.contains("label=chat")),
        "missing close record: {infos:?}"
    );
}

#[rstest]
#[serial]
fn fatal_fault_is_logged_as_warning(mut logger: LoggerHandle) {
    let (mut connection, _events, control) =
        opened(ConnectionConfig::new().connection_id("dc_faulty"));
    control.fail_sends(true);

    connection.send("doomed".to_owned());

    assert!(logger.contains(Level::Warn, &["connection fault", "connection_id=dc_faulty"]));
}

#[rstest]
#[serial]
fn unknown_control_is_logged_and_ignored(mut logger: LoggerHandle) {
    let (mut connection, _events, _control) =
        opened(ConnectionConfig::new().connection_id("dc_control"));
    let bytes = encode_envelope(&Envelope::Control(ControlMessage::with_kind("pause")))
        .expect("control envelope encodes");

    connection.handle_channel_event(ChannelEvent::Message(WirePayload::Binary(bytes.into())));

    assert!(connection.is_open());
    assert!(logger.contains(Level::Warn, &["ignoring control message", "pause"]));
}

#[rstest]
#[serial]
fn backpressure_is_logged_once_per_episode(mut logger: LoggerHandle) {
    let (mut connection, _events, control) = opened(
        ConnectionConfig::new()
            .connection_id("dc_pressure")
            .backpressure(BackpressurePolicy {
                high_water_mark: 16,
                ..BackpressurePolicy::default()
            }),
    );
    control.set_buffered_amount(17);

    connection.send("one".to_owned());
    connection.send("two".to_owned());

    let buffering = logger
        .take_messages(Level::Debug)
        .into_iter()
        .filter(|m| m.starts_with("buffering") && m.contains("connection_id=dc_pressure"))
        .count();
    assert_eq!(buffering, 1);
    assert_eq!(connection.buffer_size(), 2);
}

#[rstest]
#[serial]
fn signals_after_hand_off_are_logged(mut logger: LoggerHandle) {
    let (mut connection, _events, _control) =
        opened(ConnectionConfig::new().connection_id("dc_late_signal"));

    connection.handle_signal(SignalMessage::Candidate(Bytes::from_static(b"late")));

    assert!(logger.contains(
        Level::Debug,
        &["signal ignored", "connection_id=dc_late_signal"]
    ));
}
