//! Error taxonomy for typed fetches.

use std::fmt;
use thiserror::Error;

/// Result type for fallible construction steps (URL building, request setup).
pub type Result<T> = std::result::Result<T, FetchError>;

/// Final result of a typed fetch: the decoded success value, or a [`Failure`]
/// carrying the error kind and an optionally decoded error body.
pub type FetchResult<T, E> = std::result::Result<T, Failure<E>>;

/// Classified failure kinds for a single call.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Base string or components could not form a valid URL. No network call was made.
    #[error("Failed to construct URL: {0}")]
    ConstructingUrlFailed(String),

    /// Transport-level failure (DNS, TLS, timeout, connection reset, cancellation).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportFailure),

    /// The response could not be interpreted as HTTP.
    #[error("No network response")]
    NoNetworkResponse,

    /// A 2xx response carried no body while a structured type was expected.
    #[error("No data returned")]
    NoDataReturned,

    /// The success body could not be decoded into the requested type.
    #[error("Decoding failed: {0}")]
    DecodingFailed(#[from] DecodeError),

    /// Non-2xx HTTP status.
    #[error("Response error: status {0}")]
    ResponseError(u16),
}

impl FetchError {
    /// Get the HTTP status code if this is a response error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ResponseError(status) => Some(*status),
            _ => None,
        }
    }

    /// Check if this is a transport-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a transport timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(f) if f.code == TransportErrorCode::Timeout)
    }

    /// Check if the call was cancelled through its handle.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(f) if f.code == TransportErrorCode::Cancelled)
    }
}

/// Native error codes reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorCode {
    /// The request or connection timed out.
    Timeout,
    /// Connecting to the remote host failed (refused, DNS, TLS handshake).
    Connect,
    /// The request could not be sent.
    Request,
    /// Reading the response body failed.
    Body,
    /// Redirect policy was violated.
    Redirect,
    /// The transport could not decode the response stream (e.g. compression).
    Decode,
    /// The call was cancelled by its caller.
    Cancelled,
    /// Anything else.
    Other,
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Redirect => "redirect",
            Self::Decode => "decode",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A transport failure with its native code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct TransportFailure {
    /// Native error code.
    pub code: TransportErrorCode,
    /// Human readable detail from the transport.
    pub message: String,
}

impl TransportFailure {
    /// Create a new transport failure.
    pub fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Failure reported for a call cancelled through its handle.
    pub fn cancelled() -> Self {
        Self::new(TransportErrorCode::Cancelled, "request cancelled")
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            TransportErrorCode::Timeout
        } else if err.is_connect() {
            TransportErrorCode::Connect
        } else if err.is_redirect() {
            TransportErrorCode::Redirect
        } else if err.is_body() {
            TransportErrorCode::Body
        } else if err.is_decode() {
            TransportErrorCode::Decode
        } else if err.is_request() {
            TransportErrorCode::Request
        } else {
            TransportErrorCode::Other
        };
        Self::new(code, err.to_string())
    }
}

/// Structured decode failure.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by a custom [`BodyDecoder`](crate::BodyDecoder).
    #[error("{0}")]
    Custom(String),
}

/// A failed fetch: the error kind plus the best-effort decoded error body.
#[derive(Debug)]
pub struct Failure<E> {
    /// What went wrong.
    pub kind: FetchError,
    /// Error body decoded into the caller's error type, when one was available.
    pub body: Option<E>,
}

impl<E> Failure<E> {
    /// Failure with no decoded error body.
    pub fn new(kind: FetchError) -> Self {
        Self { kind, body: None }
    }

    /// Failure carrying a decoded error body (or none).
    pub fn with_body(kind: FetchError, body: Option<E>) -> Self {
        Self { kind, body }
    }

    /// HTTP status of a [`FetchError::ResponseError`].
    pub fn status_code(&self) -> Option<u16> {
        self.kind.status_code()
    }
}

impl<E> From<FetchError> for Failure<E> {
    fn from(kind: FetchError) -> Self {
        Self::new(kind)
    }
}

impl<E> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl<E: fmt::Debug> std::error::Error for Failure<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
