//! Connection configuration.
//!
//! [`ConnectionConfig`] gathers everything a connection needs before its
//! transport exists: identity, the expected serialization scheme, fragment
//! sizing, backpressure thresholds and the arguments forwarded to the
//! negotiator.

use bytes::Bytes;
use derive_more::{Display, From};
use rand::{Rng, distr::Alphanumeric};

use crate::{
    fragment::FragmentationConfig,
    send_buffer::BackpressurePolicy,
    serializer::SerializationScheme,
};

/// Prefix of generated connection identifiers.
pub const CONNECTION_ID_PREFIX: &str = "dc_";
const TOKEN_LEN: usize = 16;

/// Identifier naming one connection in logs and to the application.
///
/// # Examples
///
/// ```
/// use chunkwire::config::ConnectionId;
/// let id = ConnectionId::random();
/// assert!(id.as_str().starts_with("dc_"));
/// assert_ne!(id, ConnectionId::random());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display, From)]
#[display("{_0}")]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn random() -> Self {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        Self(format!("{CONNECTION_ID_PREFIX}{token}"))
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self { Self(value.to_owned()) }
}

/// Settings for one connection.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    connection_id: ConnectionId,
    label: Option<String>,
    serialization: SerializationScheme,
    reliable: bool,
    fragmentation: FragmentationConfig,
    backpressure: BackpressurePolicy,
    initiator: bool,
    offer: Option<Bytes>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_id: ConnectionId::random(),
            label: None,
            serialization: SerializationScheme::default(),
            reliable: false,
            fragmentation: FragmentationConfig::default(),
            backpressure: BackpressurePolicy::default(),
            initiator: true,
            offer: None,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration with defaults and a random identifier.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Use a caller-chosen identifier.
    #[must_use]
    pub fn connection_id(mut self, id: impl Into<ConnectionId>) -> Self {
        self.connection_id = id.into();
        self
    }

    /// Attach a human-readable label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Declare the scheme the connection's serializer must implement.
    #[must_use]
    pub fn serialization(mut self, scheme: SerializationScheme) -> Self {
        self.serialization = scheme;
        self
    }

    /// Request a reliable transport from the negotiator.
    #[must_use]
    pub fn reliable(mut self, reliable: bool) -> Self {
        self.reliable = reliable;
        self
    }

    /// Replace fragment sizing.
    #[must_use]
    pub fn fragmentation(mut self, config: FragmentationConfig) -> Self {
        self.fragmentation = config;
        self
    }

    /// Replace backpressure thresholds.
    #[must_use]
    pub fn backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.backpressure = policy;
        self
    }

    /// Choose whether this side initiates negotiation.
    #[must_use]
    pub fn initiator(mut self, initiator: bool) -> Self {
        self.initiator = initiator;
        self
    }

    /// Answer a remote offer instead of initiating.
    #[must_use]
    pub fn offer(mut self, offer: impl Into<Bytes>) -> Self {
        self.offer = Some(offer.into());
        self.initiator = false;
        self
    }

    /// Connection identifier.
    #[must_use]
    pub fn id(&self) -> &ConnectionId { &self.connection_id }

    /// Label, falling back to the identifier.
    #[must_use]
    pub fn label_or_id(&self) -> &str {
        self.label.as_deref().unwrap_or(self.connection_id.as_str())
    }

    /// Scheme the serializer must implement.
    #[must_use]
    pub fn scheme(&self) -> SerializationScheme { self.serialization }

    /// Whether a reliable transport was requested.
    #[must_use]
    pub fn is_reliable(&self) -> bool { self.reliable }

    /// Fragment sizing.
    #[must_use]
    pub fn fragmentation_config(&self) -> FragmentationConfig { self.fragmentation }

    /// Backpressure thresholds.
    #[must_use]
    pub fn backpressure_policy(&self) -> BackpressurePolicy { self.backpressure }

    /// Whether this side initiates negotiation.
    #[must_use]
    pub fn is_initiator(&self) -> bool { self.initiator }

    /// Remote offer to answer, if any.
    #[must_use]
    pub fn remote_offer(&self) -> Option<&Bytes> { self.offer.as_ref() }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::send_buffer::{DEFAULT_HIGH_WATER_MARK, DEFAULT_RETRY_DELAY};

    #[rstest]
    fn defaults_match_transport_limits() {
        let config = ConnectionConfig::default();
        assert!(config.id().as_str().starts_with(CONNECTION_ID_PREFIX));
        assert_eq!(config.id().as_str().len(), CONNECTION_ID_PREFIX.len() + TOKEN_LEN);
        assert_eq!(config.backpressure_policy().high_water_mark, DEFAULT_HIGH_WATER_MARK);
        assert_eq!(config.backpressure_policy().retry_delay, DEFAULT_RETRY_DELAY);
        assert_eq!(config.scheme(), SerializationScheme::Binary);
        assert!(config.is_initiator());
        assert_eq!(config.label_or_id(), config.id().as_str());
    }

    #[rstest]
    fn offer_implies_answering_side() {
        let config = ConnectionConfig::new().offer(Bytes::from_static(b"sdp"));
        assert!(!config.is_initiator());
        assert_eq!(config.remote_offer().map(Bytes::as_ref), Some(&b"sdp"[..]));
    }

    #[rstest]
    fn setters_replace_defaults() {
        let policy = BackpressurePolicy {
            high_water_mark: 10,
            retry_delay: Duration::from_millis(1),
        };
        let config = ConnectionConfig::new()
            .connection_id("dc_fixed")
            .label("files")
            .serialization(SerializationScheme::Raw)
            .reliable(true)
            .backpressure(policy);
        assert_eq!(config.id().as_str(), "dc_fixed");
        assert_eq!(config.label_or_id(), "files");
        assert_eq!(config.scheme(), SerializationScheme::Raw);
        assert!(config.is_reliable());
        assert_eq!(config.backpressure_policy(), policy);
    }
}
