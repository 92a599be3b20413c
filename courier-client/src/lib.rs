//! # Courier Client
//!
//! A typed HTTP client facade. A call goes through four stages:
//!
//! 1. Build a URL from a base, path segments and query parameters.
//! 2. Assemble a request descriptor.
//! 3. Dispatch it and classify the outcome.
//! 4. Decode the body into a success type `T`, or on failure try to decode
//!    an error type `E` from the same body.
//!
//! ## Features
//!
//! - **One pipeline, two types**: success and error bodies decode through the
//!   same flow; [`RawBytes`] in either position skips structured decoding
//! - **Closed classification**: [`Outcome`] and [`FetchError`] are exhaustive enums
//! - **Completion context**: continuation-style calls deliver on one
//!   [`CompletionContext`], whichever task started them
//! - **Pluggable transport**: [`Transport`] seam, with a reqwest backend
//! - **No retries**: every failure is reported once, as-is
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_client::{CompletionContext, FetchClient, FetchResult, Method, TransportConfig};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct ApiError {
//!     message: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FetchClient::new(TransportConfig::default(), CompletionContext::spawn())?;
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!
//!     client.make_request_to(
//!         "https://api.example.com",
//!         ["users", "42"],
//!         &[],
//!         Method::Get,
//!         &[("Accept", "application/json")],
//!         None,
//!         move |result: FetchResult<User, ApiError>| {
//!             let _ = tx.send(result);
//!         },
//!     );
//!
//!     match rx.await? {
//!         Ok(user) => println!("{} is {}", user.id, user.name),
//!         Err(failure) => {
//!             let message = failure.body.as_ref().map(|body| body.message.as_str());
//!             eprintln!("{failure} ({message:?})");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Awaiting Instead of Continuations
//!
//! ```rust,no_run
//! use courier_client::{CompletionContext, Endpoint, FetchClient, Method, RawBytes, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FetchClient::new(TransportConfig::default(), CompletionContext::spawn())?;
//!
//!     let endpoint = Endpoint::new("https://api.example.com")
//!         .segment("health")
//!         .query("verbose", "1");
//!
//!     let body = client
//!         .fetch_endpoint::<RawBytes, RawBytes, _, &str, &str>(&endpoint, Method::Get, [], None)
//!         .await?;
//!     println!("{} bytes", body.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod client;
mod completion;
mod config;
mod decode;
mod endpoint;
mod error;
mod form;
mod outcome;
mod request;
mod transport;

pub use client::{FetchClient, RequestHandle};
pub use completion::{CompletionContext, CompletionQueue, completion_channel};
pub use config::{TransportConfig, TransportConfigBuilder};
pub use decode::{BodyDecoder, JsonDecoder, RawBytes, decode_outcome, is_passthrough};
pub use endpoint::{Endpoint, construct_url};
pub use error::{
    DecodeError, Failure, FetchError, FetchResult, Result, TransportErrorCode, TransportFailure,
};
pub use form::encode_form;
pub use outcome::Outcome;
pub use request::{
    Method, RequestDescriptor, basic_auth, bearer_auth, construct_request, json_body,
};
pub use transport::{RawExchange, ReqwestTransport, ResponseHead, Transport};

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, StatusCode, header};
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use courier_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{FetchClient, RequestHandle};
    pub use crate::completion::{CompletionContext, CompletionQueue, completion_channel};
    pub use crate::config::{TransportConfig, TransportConfigBuilder};
    pub use crate::decode::{BodyDecoder, JsonDecoder, RawBytes};
    pub use crate::endpoint::{Endpoint, construct_url};
    pub use crate::error::{Failure, FetchError, FetchResult, TransportErrorCode};
    pub use crate::form::encode_form;
    pub use crate::outcome::Outcome;
    pub use crate::request::{Method, RequestDescriptor, construct_request};
    pub use crate::transport::{RawExchange, Transport};
}
