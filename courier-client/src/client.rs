//! Typed fetch client.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::debug;

use crate::{
    BodyDecoder, CompletionContext, Endpoint, Failure, FetchResult, JsonDecoder, Method, Outcome,
    RequestDescriptor, ReqwestTransport, Transport, TransportConfig, TransportFailure,
    construct_request, construct_url, decode_outcome,
};

/// Typed HTTP client over a shared [`Transport`].
///
/// Every call produces exactly one result. Continuation-style calls deliver
/// that result through the client's [`CompletionContext`].
pub struct FetchClient<Tr = ReqwestTransport, D = JsonDecoder> {
    transport: Arc<Tr>,
    decoder: Arc<D>,
    completion: CompletionContext,
}

impl<Tr, D> Clone for FetchClient<Tr, D> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            decoder: Arc::clone(&self.decoder),
            completion: self.completion.clone(),
        }
    }
}

impl FetchClient {
    /// Create a client backed by reqwest.
    pub fn new(
        config: TransportConfig,
        completion: CompletionContext,
    ) -> Result<Self, TransportFailure> {
        Ok(Self::with_transport(ReqwestTransport::new(config)?, completion))
    }
}

impl<Tr: Transport + 'static> FetchClient<Tr> {
    /// Create a client over a custom transport, decoding JSON.
    pub fn with_transport(transport: Tr, completion: CompletionContext) -> Self {
        Self {
            transport: Arc::new(transport),
            decoder: Arc::new(JsonDecoder),
            completion,
        }
    }
}

impl<Tr, D> FetchClient<Tr, D>
where
    Tr: Transport + 'static,
    D: BodyDecoder + 'static,
{
    /// Replace the structured decoder.
    pub fn with_decoder<D2: BodyDecoder + 'static>(self, decoder: D2) -> FetchClient<Tr, D2> {
        FetchClient {
            transport: self.transport,
            decoder: Arc::new(decoder),
            completion: self.completion,
        }
    }

    /// Get the transport.
    pub fn transport(&self) -> &Tr {
        &self.transport
    }

    /// Get the completion context results are delivered on.
    pub fn completion(&self) -> &CompletionContext {
        &self.completion
    }

    /// Dispatch a request and classify what came back.
    pub async fn send(&self, request: RequestDescriptor) -> Outcome {
        dispatch(self.transport.as_ref(), request).await
    }

    /// Dispatch a request and decode the outcome.
    pub async fn fetch<T, E>(&self, request: RequestDescriptor) -> FetchResult<T, E>
    where
        T: DeserializeOwned + 'static,
        E: DeserializeOwned + 'static,
    {
        let outcome = self.send(request).await;
        decode_outcome(self.decoder.as_ref(), outcome)
    }

    /// Build the URL and request for `endpoint`, then fetch.
    pub async fn fetch_endpoint<T, E, H, K, V>(
        &self,
        endpoint: &Endpoint,
        method: Method,
        headers: H,
        body: Option<Bytes>,
    ) -> FetchResult<T, E>
    where
        T: DeserializeOwned + 'static,
        E: DeserializeOwned + 'static,
        H: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = endpoint.url().map_err(Failure::new)?;
        self.fetch(construct_request(method, url, headers, body)).await
    }

    /// Dispatch a request on a background task, then decode the outcome and
    /// hand the result to `completion` on the completion context.
    ///
    /// Only the transport call runs on the background task. Decoding happens
    /// in the job posted to the completion context, right before `completion`
    /// runs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn make_request<T, E, F>(&self, request: RequestDescriptor, completion: F) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
        F: FnOnce(FetchResult<T, E>) + Send + 'static,
    {
        let handle = RequestHandle::new();
        let state = Arc::clone(&handle.state);
        let transport = Arc::clone(&self.transport);
        let decoder = Arc::clone(&self.decoder);
        let context = self.completion.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                outcome = dispatch(transport.as_ref(), request) => outcome,
                () = state.cancelled() => {
                    debug!("Request cancelled before completion");
                    Outcome::TransportError {
                        error: TransportFailure::cancelled(),
                        body: None,
                    }
                }
            };

            context.deliver(move || {
                completion(decode_outcome::<T, E, D>(decoder.as_ref(), outcome));
            });
            state.finished.store(true, Ordering::Release);
        });

        handle
    }

    /// Build the URL and request from parts, then [`make_request`](Self::make_request).
    ///
    /// Query pairs and headers are plain slices, so `&[]` works for either
    /// and `T`/`E` can be inferred from the continuation's argument type.
    /// For owned or map-shaped inputs, build the request with
    /// [`construct_url`] and [`construct_request`] instead.
    ///
    /// If the URL cannot be built, `completion` receives
    /// [`FetchError::ConstructingUrlFailed`](crate::FetchError::ConstructingUrlFailed)
    /// on the completion context and the transport is never called.
    #[allow(clippy::too_many_arguments)]
    pub fn make_request_to<T, E, F, I, S>(
        &self,
        base: &str,
        segments: I,
        queries: &[(&str, &str)],
        method: Method,
        headers: &[(&str, &str)],
        body: Option<Bytes>,
        completion: F,
    ) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
        F: FnOnce(FetchResult<T, E>) + Send + 'static,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match construct_url(base, segments, queries.iter().copied()) {
            Ok(url) => {
                let request = construct_request(method, url, headers.iter().copied(), body);
                self.make_request(request, completion)
            }
            Err(e) => {
                debug!(base = %base, error = %e, "Not dispatching, URL construction failed");
                let handle = RequestHandle::new();
                self.completion
                    .deliver(move || completion(Err(Failure::new(e))));
                handle.state.finished.store(true, Ordering::Release);
                handle
            }
        }
    }
}

async fn dispatch<Tr: Transport + ?Sized>(transport: &Tr, request: RequestDescriptor) -> Outcome {
    let method = request.method();
    let url = request.url().clone();
    debug!(%method, %url, "Dispatching request");

    let outcome = Outcome::classify(transport.execute(request).await);

    match &outcome {
        Outcome::TransportError { error, .. } => {
            debug!(%method, %url, code = %error.code, error = %error.message, "Transport error");
        }
        Outcome::StatusError { status, .. } => {
            debug!(%method, %url, status, "Non-success status");
        }
        other => debug!(%method, %url, outcome = other.label(), "Request completed"),
    }

    outcome
}

#[derive(Debug, Default)]
struct CallState {
    cancel: Notify,
    cancelled: AtomicBool,
    finished: AtomicBool,
}

impl CallState {
    async fn cancelled(&self) {
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }
        self.cancel.notified().await;
    }
}

/// Cancellation handle for a call started with
/// [`FetchClient::make_request`].
///
/// A cancelled call still delivers exactly one result: a transport failure
/// with code [`Cancelled`](crate::TransportErrorCode::Cancelled). Treat it as
/// terminal. Cancelling a call that has already completed has no effect.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    state: Arc<CallState>,
}

impl RequestHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(CallState::default()),
        }
    }

    /// Stop waiting on the transport.
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::AcqRel) {
            self.state.cancel.notify_one();
        }
    }

    /// Check if [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Check if the result has been posted to the completion context.
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecodeError, FetchError, RawExchange, completion_channel};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Fixed(u16, &'static str);

    #[async_trait]
    impl Transport for Fixed {
        async fn execute(&self, _request: RequestDescriptor) -> RawExchange {
            RawExchange::response(self.0, Bytes::from_static(self.1.as_bytes()))
        }
    }

    struct Hang;

    #[async_trait]
    impl Transport for Hang {
        async fn execute(&self, _request: RequestDescriptor) -> RawExchange {
            std::future::pending().await
        }
    }

    /// JSON decoder that counts how often it runs.
    #[derive(Default)]
    struct CountingDecoder(AtomicUsize);

    impl BodyDecoder for CountingDecoder {
        fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            JsonDecoder.decode(bytes)
        }
    }

    fn get(url: &str) -> RequestDescriptor {
        construct_request(
            Method::Get,
            url::Url::parse(url).unwrap(),
            Vec::<(String, String)>::new(),
            None,
        )
    }

    #[test]
    fn test_client_creation() {
        let (context, _queue) = completion_channel();
        let client = FetchClient::new(TransportConfig::default(), context);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_decodes_body() {
        let (context, _queue) = completion_channel();
        let client = FetchClient::with_transport(Fixed(200, "[1,2,3]"), context);

        let numbers: Vec<u32> = client
            .fetch::<Vec<u32>, ()>(get("https://api.example.com/n"))
            .await
            .unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_send_returns_outcome() {
        let (context, _queue) = completion_channel();
        let client = FetchClient::with_transport(Fixed(503, "busy"), context);

        let outcome = client.send(get("https://api.example.com")).await;
        assert!(matches!(outcome, Outcome::StatusError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_cancel_delivers_single_cancelled_result() {
        let (context, mut queue) = completion_channel();
        let client = FetchClient::with_transport(Hang, context);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = client.make_request::<(), (), _>(
            get("https://api.example.com/slow"),
            move |result| {
                let _ = tx.send(result);
            },
        );
        handle.cancel();
        assert!(handle.is_cancelled());

        assert!(queue.run_next().await);
        let failure = rx.recv().await.unwrap().unwrap_err();
        assert!(failure.kind.is_cancelled());
        assert!(failure.body.is_none());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_finished());
        assert_eq!(queue.run_pending(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_decode_runs_on_completion_context() {
        let (context, mut queue) = completion_channel();
        let client = FetchClient::with_transport(Fixed(200, "[7]"), context)
            .with_decoder(CountingDecoder::default());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = client.make_request(
            get("https://api.example.com/n"),
            move |result: FetchResult<Vec<u32>, ()>| {
                let _ = tx.send(result);
            },
        );
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }

        // Posted but not yet drained: nothing has been decoded.
        assert_eq!(client.decoder.0.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());

        assert!(queue.run_next().await);
        assert_eq!(client.decoder.0.load(Ordering::SeqCst), 1);
        assert_eq!(rx.recv().await.unwrap().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_make_request_to_infers_from_continuation() {
        let (context, mut queue) = completion_channel();
        let client = FetchClient::with_transport(Fixed(200, "[1]"), context);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        client.make_request_to(
            "https://api.example.com",
            ["n"],
            &[],
            Method::Get,
            &[],
            None,
            move |result: FetchResult<Vec<u32>, ()>| {
                let _ = tx.send(result);
            },
        );

        assert!(queue.run_next().await);
        assert_eq!(rx.recv().await.unwrap().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_fetch_endpoint_invalid_base() {
        let (context, _queue) = completion_channel();
        let client = FetchClient::with_transport(Fixed(200, "{}"), context);

        let failure = client
            .fetch_endpoint::<(), (), _, &str, &str>(
                &Endpoint::new("not a url"),
                Method::Get,
                [],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(failure.kind, FetchError::ConstructingUrlFailed(_)));
    }
}
