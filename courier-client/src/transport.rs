//! Transport seam and the reqwest-backed implementation.

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;

use crate::{RequestDescriptor, TransportConfig, TransportFailure};

/// Status line and headers of a response, as reported by the transport.
///
/// The status is kept raw; values outside `100..=999` are not HTTP.
#[derive(Debug, Clone, Default)]
pub struct ResponseHead {
    /// Raw status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Create a response head with no headers.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }

    /// The status as an [`http::StatusCode`], if it is a valid one.
    pub fn status_code(&self) -> Option<http::StatusCode> {
        http::StatusCode::from_u16(self.status).ok()
    }
}

/// Everything a transport hands back for one request, unclassified.
///
/// Any combination of fields may be present; the dispatcher decides what it
/// means.
#[derive(Debug, Clone, Default)]
pub struct RawExchange {
    /// Raw response payload.
    pub body: Option<Bytes>,
    /// Response head, if one was received.
    pub response: Option<ResponseHead>,
    /// Transport-level error, if one occurred.
    pub error: Option<TransportFailure>,
}

impl RawExchange {
    /// A completed exchange with a status and payload.
    pub fn response(status: u16, body: impl Into<Option<Bytes>>) -> Self {
        Self {
            body: body.into(),
            response: Some(ResponseHead::new(status)),
            error: None,
        }
    }

    /// An exchange that failed at the transport level.
    pub fn failed(error: TransportFailure) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Executes request descriptors.
///
/// Implementations own timeouts, pooling and default headers. They never
/// retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request and report what happened.
    async fn execute(&self, request: RequestDescriptor) -> RawExchange;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: RequestDescriptor) -> RawExchange {
        (**self).execute(request).await
    }
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport from configuration.
    pub fn new(config: TransportConfig) -> Result<Self, TransportFailure> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .default_headers(config.default_header_map())
            .gzip(config.gzip)
            .brotli(config.brotli);

        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        let inner = builder.build().map_err(TransportFailure::from)?;
        Ok(Self { inner })
    }

    /// Wrap an existing [`reqwest::Client`].
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { inner: client }
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: RequestDescriptor) -> RawExchange {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = self.inner.request(method.as_http(), url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let head = e.status().map(|status| ResponseHead::new(status.as_u16()));
                return RawExchange {
                    body: None,
                    response: head,
                    error: Some(TransportFailure::from(e)),
                };
            }
        };

        let head = ResponseHead {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
        };

        match response.bytes().await {
            // An empty payload is reported as no payload.
            Ok(bytes) => RawExchange {
                body: (!bytes.is_empty()).then_some(bytes),
                response: Some(head),
                error: None,
            },
            Err(e) => RawExchange {
                body: None,
                response: Some(head),
                error: Some(TransportFailure::from(e)),
            },
        }
    }
}
