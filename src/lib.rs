#![doc(html_root_url = "https://docs.rs/chunkwire/latest")]
//! Public API for the `chunkwire` library.
//!
//! `chunkwire` carries arbitrarily large application messages over a
//! message-oriented transport that rejects oversized messages and reports
//! only a buffered-byte count for flow control. Messages are serialized,
//! split into indexed frames, queued behind transport backpressure and
//! re-assembled in any arrival order on the far side.

pub mod channel;
pub mod config;
pub mod connection;
pub mod encoding_queue;
pub mod error;
pub mod fragment;
pub mod metrics;
pub mod negotiator;
pub mod send_buffer;
pub mod serializer;

#[cfg(test)]
mod test_support;

pub use channel::{ChannelEvent, ChannelHandle, DataChannel, TransportError, WirePayload};
pub use config::{ConnectionConfig, ConnectionId};
pub use connection::{
    Connection,
    ConnectionActor,
    ConnectionEvent,
    ConnectionHandle,
    ConnectionState,
    EventStream,
    active_connection_count,
    connect,
};
pub use error::{ConnectionError, ConversionError};
pub use fragment::{
    Chunker,
    FragmentBatch,
    FragmentIndex,
    FragmentationConfig,
    Frame,
    FrameHeader,
    MessageId,
    ReassembledMessage,
    Reassembler,
};
pub use self::metrics::{CONNECTIONS_ACTIVE, Direction, ERRORS_TOTAL, FRAMES_PROCESSED};
pub use negotiator::{NegotiationError, Negotiator, PendingChannel, SignalMessage};
pub use send_buffer::{BackpressurePolicy, SendBuffer};
pub use serializer::{
    Blob,
    BincodeSerializer,
    JsonSerializer,
    RawSerializer,
    SerializationScheme,
    Serializer,
};
