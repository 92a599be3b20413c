//! Request descriptors.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::fmt;
use url::Url;

/// HTTP methods supported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`: fetch a resource.
    Get,
    /// `PUT`: replace a resource.
    Put,
    /// `POST`: create a resource or submit data.
    Post,
    /// `DELETE`: remove a resource.
    Delete,
}

impl Method {
    /// The equivalent [`http::Method`].
    pub fn as_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Put => http::Method::PUT,
            Self::Post => http::Method::POST,
            Self::Delete => http::Method::DELETE,
        }
    }

    /// Method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        method.as_http()
    }
}

/// A fully assembled request, handed to a [`Transport`](crate::Transport).
///
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl RequestDescriptor {
    /// Target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Request body, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Split into owned parts.
    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<Bytes>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Assemble a request descriptor.
///
/// Headers are applied in iteration order with insert-or-overwrite semantics,
/// so the last value for a name wins. Names or values that are not valid HTTP
/// header text are skipped.
pub fn construct_request<H, K, V>(
    method: Method,
    url: Url,
    headers: H,
    body: Option<Bytes>,
) -> RequestDescriptor
where
    H: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    RequestDescriptor {
        url,
        method,
        headers: header_map(headers),
        body,
    }
}

/// Collect name/value pairs into a [`HeaderMap`], last value per name winning.
/// Pairs that are not valid HTTP header text are skipped with a warning.
pub(crate) fn header_map<H, K, V>(headers: H) -> HeaderMap
where
    H: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let (name, value) = (name.as_ref(), value.as_ref());
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => {
                tracing::warn!(header = %name, "Skipping header that is not valid HTTP");
            }
        }
    }
    map
}

/// Serialize a value as a JSON request body.
///
/// Returns `None` (no body) if serialization fails.
pub fn json_body<T: Serialize + ?Sized>(value: &T) -> Option<Bytes> {
    match serde_json::to_vec(value) {
        Ok(bytes) => Some(Bytes::from(bytes)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize JSON body");
            None
        }
    }
}

/// `Authorization` header for bearer authentication.
pub fn bearer_auth(token: impl fmt::Display) -> (String, String) {
    (
        http::header::AUTHORIZATION.to_string(),
        format!("Bearer {token}"),
    )
}

/// `Authorization` header for basic authentication.
pub fn basic_auth(
    username: impl fmt::Display,
    password: Option<impl fmt::Display>,
) -> (String, String) {
    use base64::Engine;
    let credentials = match password {
        Some(p) => format!("{username}:{p}"),
        None => format!("{username}:"),
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
    (
        http::header::AUTHORIZATION.to_string(),
        format!("Basic {encoded}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn url() -> Url {
        Url::parse("https://api.example.com/users").unwrap()
    }

    #[test]
    fn test_method_and_body_set_verbatim() {
        let body = Bytes::from_static(b"payload");
        let request = construct_request(
            Method::Post,
            url(),
            BTreeMap::<String, String>::new(),
            Some(body.clone()),
        );

        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.url().as_str(), "https://api.example.com/users");
        assert_eq!(request.body(), Some(&body));
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_duplicate_header_last_write_wins() {
        let request = construct_request(
            Method::Get,
            url(),
            [("Accept", "text/plain"), ("accept", "application/json")],
            None,
        );

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("Accept"), Some("application/json"));
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let request = construct_request(
            Method::Get,
            url(),
            [("bad header", "x"), ("X-Ok", "yes"), ("X-Newline", "a\nb")],
            None,
        );

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("x-ok"), Some("yes"));
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(http::Method::from(Method::Delete), http::Method::DELETE);
        assert_eq!(Method::Put.to_string(), "PUT");
    }

    #[test]
    fn test_json_body() {
        let body = json_body(&serde_json::json!({"title": "Buy milk"})).unwrap();
        assert_eq!(&body[..], br#"{"title":"Buy milk"}"#);
    }

    #[test]
    fn test_auth_helpers() {
        assert_eq!(
            bearer_auth("abc"),
            ("authorization".to_string(), "Bearer abc".to_string())
        );
        assert_eq!(basic_auth("ada", Some("pw")).1, "Basic YWRhOnB3");
        assert_eq!(basic_auth("ada", None::<&str>).1, "Basic YWRhOg==");
    }
}
