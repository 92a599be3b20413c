//! `application/x-www-form-urlencoded` body encoding.

use bytes::Bytes;
use std::collections::BTreeMap;
use url::form_urlencoded::byte_serialize;

/// Encode parameters as a form body.
///
/// Values are escaped with the classic form rules: alphanumerics and `-._*`
/// pass through, a space becomes `+`, everything else is percent-encoded.
/// Keys are written as given. Pairs are joined with `&` in key order.
///
/// Returns `None` for an empty parameter set; callers treat that as "no body".
pub fn encode_form<I, K, V>(parameters: I) -> Option<Bytes>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    let parameters: BTreeMap<String, String> = parameters
        .into_iter()
        .map(|(k, v)| (k.into(), byte_serialize(v.as_ref().as_bytes()).collect()))
        .collect();

    if parameters.is_empty() {
        return None;
    }

    let encoded = parameters
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    Some(Bytes::from(encoded))
}
