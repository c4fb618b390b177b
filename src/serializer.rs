//! Application value serialization.
//!
//! A connection converts every outbound value to bytes with a [`Serializer`]
//! chosen once at construction, and converts every re-assembled payload back
//! with the same serializer. Three schemes are provided:
//!
//! - [`BincodeSerializer`] packs `serde` values into a compact binary form.
//! - [`JsonSerializer`] uses a textual encode/decode pair, `serde_json` by
//!   default, which callers may replace.
//! - [`RawSerializer`] passes [`Blob`]s through untouched. Blobs backed by an
//!   [`AsyncRead`] cannot be handed to the transport directly; they are
//!   returned as [`Encoded::Deferred`] and materialised by the connection's
//!   encoding queue.

use std::{error::Error, fmt, io, pin::Pin};

use bincode::{config, serde::decode_from_slice, serde::encode_to_vec};
use bytes::Bytes;
use futures::{FutureExt, future::BoxFuture};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Boxed error returned by serializers.
pub type SerializerError = Box<dyn Error + Send + Sync>;

/// Conversion that yields payload bytes once awaited.
pub type DeferredPayload = BoxFuture<'static, io::Result<Vec<u8>>>;

/// Encoding schemes a connection can be configured with.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializationScheme {
    /// Structured binary packing.
    #[default]
    Binary,
    /// Structured text encoding.
    Json,
    /// Byte passthrough.
    Raw,
}

impl fmt::Display for SerializationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Binary => "binary",
            Self::Json => "json",
            Self::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// Output of [`Serializer::encode`].
pub enum Encoded {
    /// Bytes ready for chunking.
    Ready(Vec<u8>),
    /// Bytes that must be produced asynchronously before chunking.
    Deferred(DeferredPayload),
}

impl fmt::Debug for Encoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(bytes) => f.debug_tuple("Ready").field(&bytes.len()).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Converts application values of type `T` to and from payload bytes.
pub trait Serializer<T>: Send {
    /// Scheme implemented by this serializer.
    fn scheme(&self) -> SerializationScheme;

    /// Encode an outbound value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded.
    fn encode(&self, value: T) -> Result<Encoded, SerializerError>;

    /// Decode a re-assembled payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not form a valid value.
    fn decode(&self, bytes: Vec<u8>) -> Result<T, SerializerError>;
}

/// Binary scheme backed by `bincode`'s standard configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeSerializer;

impl<T> Serializer<T> for BincodeSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn scheme(&self) -> SerializationScheme { SerializationScheme::Binary }

    fn encode(&self, value: T) -> Result<Encoded, SerializerError> {
        Ok(Encoded::Ready(encode_to_vec(&value, config::standard())?))
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<T, SerializerError> {
        let (value, _) = decode_from_slice(&bytes, config::standard())?;
        Ok(value)
    }
}

/// Function turning a value into text.
pub type Stringify<T> = fn(&T) -> Result<String, SerializerError>;
/// Function parsing text back into a value.
pub type Parse<T> = fn(&str) -> Result<T, SerializerError>;

/// Textual scheme with a replaceable stringify/parse pair.
///
/// # Examples
///
/// ```
/// use chunkwire::serializer::{Encoded, JsonSerializer, Serializer};
///
/// let serializer = JsonSerializer::<String>::default();
/// let Ok(Encoded::Ready(bytes)) = serializer.encode("ping".to_owned()) else {
///     panic!("json encoding is synchronous");
/// };
/// assert_eq!(bytes, br#""ping""#);
/// assert_eq!(serializer.decode(bytes).expect("decode"), "ping");
/// ```
pub struct JsonSerializer<T> {
    stringify: Stringify<T>,
    parse: Parse<T>,
}

impl<T> JsonSerializer<T> {
    /// Use a caller-provided text codec instead of `serde_json`.
    #[must_use]
    pub fn with_codec(stringify: Stringify<T>, parse: Parse<T>) -> Self { Self { stringify, parse } }
}

impl<T: Serialize + DeserializeOwned> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self {
            stringify: |value| Ok(serde_json::to_string(value)?),
            parse: |text| Ok(serde_json::from_str(text)?),
        }
    }
}

impl<T> Clone for JsonSerializer<T> {
    fn clone(&self) -> Self { *self }
}

impl<T> Copy for JsonSerializer<T> {}

impl<T> fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSerializer").finish_non_exhaustive()
    }
}

impl<T> Serializer<T> for JsonSerializer<T> {
    fn scheme(&self) -> SerializationScheme { SerializationScheme::Json }

    fn encode(&self, value: T) -> Result<Encoded, SerializerError> {
        Ok(Encoded::Ready((self.stringify)(&value)?.into_bytes()))
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<T, SerializerError> {
        let text = String::from_utf8(bytes)?;
        (self.parse)(&text)
    }
}

/// Opaque bytes sent with the raw scheme.
///
/// A blob is either already in memory or backed by a reader that is drained
/// asynchronously before transmission. Inbound blobs are always in memory.
pub enum Blob {
    /// In-memory bytes.
    Bytes(Bytes),
    /// Bytes still to be read from a source.
    Reader(Pin<Box<dyn AsyncRead + Send>>),
}

impl Blob {
    /// Wrap an asynchronous byte source.
    #[must_use]
    pub fn from_reader(reader: impl AsyncRead + Send + 'static) -> Self {
        Self::Reader(Box::pin(reader))
    }

    /// Return the bytes of an in-memory blob.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Reader(_) => None,
        }
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Self::Reader(_) => f.write_str("Reader"),
        }
    }
}

impl From<Bytes> for Blob {
    fn from(bytes: Bytes) -> Self { Self::Bytes(bytes) }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self { Self::Bytes(bytes.into()) }
}

impl From<&'static [u8]> for Blob {
    fn from(bytes: &'static [u8]) -> Self { Self::Bytes(Bytes::from_static(bytes)) }
}

/// Raw scheme: blobs travel unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawSerializer;

impl Serializer<Blob> for RawSerializer {
    fn scheme(&self) -> SerializationScheme { SerializationScheme::Raw }

    fn encode(&self, value: Blob) -> Result<Encoded, SerializerError> {
        match value {
            Blob::Bytes(bytes) => Ok(Encoded::Ready(bytes.into())),
            Blob::Reader(mut reader) => Ok(Encoded::Deferred(
                async move {
                    let mut buf = Vec::new();
                    reader.read_to_end(&mut buf).await?;
                    Ok(buf)
                }
                .boxed(),
            )),
        }
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<Blob, SerializerError> { Ok(Blob::from(bytes)) }
}
