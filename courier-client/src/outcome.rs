//! Outcome classification.

use bytes::Bytes;

use crate::{RawExchange, TransportFailure};

/// Classified result of one dispatched request, before structured decoding.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The transport failed. Any payload it still returned is kept for
    /// error-body decoding.
    TransportError {
        /// What the transport reported.
        error: TransportFailure,
        /// Payload received before the failure, if any.
        body: Option<Bytes>,
    },
    /// No response that could be interpreted as HTTP.
    NoResponse,
    /// Non-2xx status.
    StatusError {
        /// Response status code.
        status: u16,
        /// Response payload, if any.
        body: Option<Bytes>,
    },
    /// 2xx status. The body may be absent.
    Success(Option<Bytes>),
}

impl Outcome {
    /// Classify a raw exchange.
    ///
    /// Priority: transport error, then missing/uninterpretable response,
    /// then 2xx, then everything else.
    pub fn classify(exchange: RawExchange) -> Self {
        let RawExchange {
            body,
            response,
            error,
        } = exchange;

        if let Some(error) = error {
            return Self::TransportError { error, body };
        }

        let Some(status) = response
            .as_ref()
            .and_then(|head| head.status_code())
            .map(|status| status.as_u16())
        else {
            return Self::NoResponse;
        };

        if (200..300).contains(&status) {
            Self::Success(body)
        } else {
            Self::StatusError { status, body }
        }
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TransportError { .. } => "transport_error",
            Self::NoResponse => "no_response",
            Self::StatusError { .. } => "status_error",
            Self::Success(_) => "success",
        }
    }

    /// Check if this outcome is a 2xx success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
