//! URL construction from a base, path segments and query parameters.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::BTreeMap;
use url::Url;

use crate::{FetchError, Result};

/// Bytes escaped in query keys and values: everything except RFC 3986
/// unreserved characters.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Build a URL from a base string, ordered path segments and query parameters.
///
/// Segments are appended in order, each percent-encoded on its own, so a `/`
/// inside a segment never introduces a new path level. Query pairs are
/// emitted sorted by key; for duplicate keys the last value wins. Keys and
/// values are percent-encoded (a space becomes `%20`). An empty query set
/// leaves the URL without a query component.
pub fn construct_url<I, S, Q, K, V>(base: &str, segments: I, queries: Q) -> Result<Url>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    Q: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut url =
        Url::parse(base).map_err(|e| FetchError::ConstructingUrlFailed(format!("{base}: {e}")))?;

    {
        let mut path = url.path_segments_mut().map_err(|_| {
            FetchError::ConstructingUrlFailed(format!("{base}: cannot be a base URL"))
        })?;
        let mut segments = segments.into_iter().peekable();
        if segments.peek().is_some() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment.as_ref());
            }
        }
    }

    let queries: BTreeMap<String, String> = queries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    if queries.is_empty() {
        url.set_query(None);
    } else {
        let query = queries
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, QUERY_COMPONENT),
                    utf8_percent_encode(value, QUERY_COMPONENT)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }

    Ok(url)
}

/// Base URL, ordered path segments and query parameters for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
    segments: Vec<String>,
    queries: BTreeMap<String, String>,
}

impl Endpoint {
    /// Create an endpoint rooted at `base`.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Default::default()
        }
    }

    /// Append a path segment.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append multiple path segments, in order.
    pub fn segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments.extend(segments.into_iter().map(Into::into));
        self
    }

    /// Set a query parameter, replacing any earlier value for `key`.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.queries.insert(key.into(), value.into());
        self
    }

    /// Base URL string.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve into a URL.
    pub fn url(&self) -> Result<Url> {
        construct_url(
            &self.base,
            &self.segments,
            self.queries.iter().map(|(k, v)| (k.clone(), v.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_QUERY: [(&str, &str); 0] = [];

    #[test]
    fn test_segments_appended_in_order() {
        let url = construct_url("https://api.example.com", ["users", "42"], NO_QUERY).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/users/42");
        assert!(url.query().is_none());
    }

    #[test]
    fn test_base_path_is_kept() {
        let url = construct_url("https://api.example.com/v1", ["users"], NO_QUERY).unwrap();
        assert_eq!(url.path(), "/v1/users");

        let url = construct_url("https://api.example.com/v1/", ["users"], NO_QUERY).unwrap();
        assert_eq!(url.path(), "/v1/users");
    }

    #[test]
    fn test_segments_are_escaped_independently() {
        let url =
            construct_url("https://api.example.com", ["a/b", "c d", "e?f"], NO_QUERY).unwrap();
        assert_eq!(url.path(), "/a%2Fb/c%20d/e%3Ff");
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[test]
    fn test_no_segments_leaves_path_untouched() {
        let url = construct_url("https://api.example.com/root", Vec::<String>::new(), NO_QUERY)
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/root");
    }

    #[test]
    fn test_queries_are_sorted_and_encoded() {
        let url = construct_url(
            "https://api.example.com",
            ["search"],
            [("q", "rust & tokio"), ("page", "2")],
        )
        .unwrap();
        assert_eq!(url.query(), Some("page=2&q=rust%20%26%20tokio"));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "rust & tokio".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_space_is_percent_encoded() {
        let url = construct_url("https://api.example.com", ["s"], [("q", "a b")]).unwrap();
        assert_eq!(url.query(), Some("q=a%20b"));
    }

    #[test]
    fn test_query_delimiters_are_escaped() {
        let url = construct_url(
            "https://api.example.com",
            ["s"],
            [("a+b", "x=1&y#2"), ("t", "c++ ~v1.0_beta-2")],
        )
        .unwrap();
        assert_eq!(
            url.query(),
            Some("a%2Bb=x%3D1%26y%232&t=c%2B%2B%20~v1.0_beta-2")
        );
        assert!(url.fragment().is_none());

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("a+b".to_string(), "x=1&y#2".to_string()));
    }

    #[test]
    fn test_duplicate_query_key_last_wins() {
        let url = construct_url("https://api.example.com", ["x"], [("k", "1"), ("k", "2")])
            .unwrap();
        assert_eq!(url.query(), Some("k=2"));
    }

    #[test]
    fn test_base_query_is_replaced() {
        let url = construct_url("https://api.example.com/?stale=1", ["x"], NO_QUERY).unwrap();
        assert!(url.query().is_none());
    }

    #[test]
    fn test_invalid_base() {
        let err = construct_url("not a url", ["users"], NO_QUERY).unwrap_err();
        assert!(matches!(err, FetchError::ConstructingUrlFailed(_)));

        let err = construct_url("mailto:someone@example.com", ["x"], NO_QUERY).unwrap_err();
        assert!(matches!(err, FetchError::ConstructingUrlFailed(_)));
    }

    #[test]
    fn test_endpoint_builder() {
        let endpoint = Endpoint::new("https://api.example.com")
            .segments(["users", "42"])
            .segment("posts")
            .query("limit", "10");

        assert_eq!(endpoint.base(), "https://api.example.com");
        assert_eq!(
            endpoint.url().unwrap().as_str(),
            "https://api.example.com/users/42/posts?limit=10"
        );
    }
}
