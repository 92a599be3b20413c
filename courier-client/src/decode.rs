//! Typed decoding of classified outcomes.
//!
//! A single pipeline handles every `(T, E)` pair: `T` is the success type,
//! `E` the error-body type. [`RawBytes`] in either position skips structured
//! decoding and hands back the payload as-is.

use bytes::Bytes;
use serde::de::{self, DeserializeOwned, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use tracing::trace;

use crate::{DecodeError, Failure, FetchError, FetchResult, Outcome};

/// Response payload returned verbatim, without structured decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawBytes(pub Bytes);

impl RawBytes {
    /// Consume and return the payload.
    pub fn into_inner(self) -> Bytes {
        self.0
    }
}

impl Deref for RawBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for RawBytes {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<RawBytes> for Bytes {
    fn from(raw: RawBytes) -> Self {
        raw.0
    }
}

struct RawBytesVisitor;

impl<'de> Visitor<'de> for RawBytesVisitor {
    type Value = RawBytes;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a byte buffer or string")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<RawBytes, E> {
        Ok(RawBytes(Bytes::copy_from_slice(v)))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<RawBytes, E> {
        Ok(RawBytes(Bytes::from(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawBytes, E> {
        Ok(RawBytes(Bytes::copy_from_slice(v.as_bytes())))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawBytes, A::Error> {
        let mut buf = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            buf.push(byte);
        }
        Ok(RawBytes(Bytes::from(buf)))
    }
}

// Lets `RawBytes` satisfy `DeserializeOwned` bounds; the pipeline itself never
// routes it through a decoder.
impl<'de> Deserialize<'de> for RawBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_byte_buf(RawBytesVisitor)
    }
}

/// Structured decoder for response payloads.
pub trait BodyDecoder: Send + Sync {
    /// Decode `bytes` into `T`.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeError>;
}

/// JSON decoder backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl BodyDecoder for JsonDecoder {
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Check whether `T` is the raw-bytes passthrough type.
pub fn is_passthrough<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<RawBytes>()
}

/// Hand `body` back as `T` when `T` is [`RawBytes`].
fn passthrough<T: 'static>(body: Bytes) -> Option<T> {
    let boxed: Box<dyn Any> = Box::new(RawBytes(body));
    boxed.downcast::<T>().ok().map(|value| *value)
}

/// Decode a classified outcome into the caller's success or error type.
pub fn decode_outcome<T, E, D>(decoder: &D, outcome: Outcome) -> FetchResult<T, E>
where
    T: DeserializeOwned + 'static,
    E: DeserializeOwned + 'static,
    D: BodyDecoder + ?Sized,
{
    match outcome {
        Outcome::TransportError { error, body } => Err(Failure::with_body(
            FetchError::Transport(error),
            decode_error_body(decoder, body),
        )),
        Outcome::NoResponse => Err(Failure::new(FetchError::NoNetworkResponse)),
        Outcome::StatusError { status, body } => Err(Failure::with_body(
            FetchError::ResponseError(status),
            decode_error_body(decoder, body),
        )),
        Outcome::Success(body) => decode_success(decoder, body).map_err(Failure::new),
    }
}

fn decode_success<T, D>(decoder: &D, body: Option<Bytes>) -> Result<T, FetchError>
where
    T: DeserializeOwned + 'static,
    D: BodyDecoder + ?Sized,
{
    if is_passthrough::<T>() {
        return passthrough(body.unwrap_or_default()).ok_or(FetchError::NoDataReturned);
    }

    let body = body.ok_or(FetchError::NoDataReturned)?;
    Ok(decoder.decode(&body)?)
}

/// Best-effort decode of an error payload; failures degrade to `None`.
fn decode_error_body<E, D>(decoder: &D, body: Option<Bytes>) -> Option<E>
where
    E: DeserializeOwned + 'static,
    D: BodyDecoder + ?Sized,
{
    let body = body?;

    if is_passthrough::<E>() {
        return passthrough(body);
    }

    match decoder.decode(&body) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            trace!(error = %e, "Error body did not match the requested type");
            None
        }
    }
}
