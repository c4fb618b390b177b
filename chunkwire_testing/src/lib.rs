//! Test doubles and fixtures for exercising `chunkwire` connections.
//!
//! The loopback transport and scripted negotiator let two real connections
//! talk to each other in memory:
//!
//! ```rust
//! use chunkwire::{ConnectionConfig, JsonSerializer, SerializationScheme, connect};
//! use chunkwire_testing::{MockNegotiator, loopback_pair};
//!
//! # async fn example() -> Result<(), chunkwire::ConnectionError> {
//! let (left, right) = loopback_pair();
//! left.control.open();
//! right.control.open();
//! let (negotiator, _probe) = MockNegotiator::ready(left.handle);
//! let config = ConnectionConfig::new().serialization(SerializationScheme::Json);
//! let (handle, _events) = connect(config, negotiator, JsonSerializer::<String>::default())?;
//! handle.send("ping".to_owned())?;
//! # drop(right);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod logging;
pub mod macros;
pub mod metrics;
pub mod negotiator;

pub use channel::{ChannelControl, MockEnd, loopback_pair};
pub use logging::{LoggerHandle, logger};
pub use self::metrics::{counter_value, gauge_value, snapshot};
pub use negotiator::{MockNegotiator, NegotiationControl, NegotiatorProbe};
