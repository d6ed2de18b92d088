//! Header helpers shared by the interceptors

use http::header::{CONTENT_TYPE, VARY};
use http::{HeaderMap, HeaderValue};

const ACCEPT_ENCODING_TOKEN: &str = "Accept-Encoding";

/// Declared content type, if it is valid text
pub(crate) fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// Add `Accept-Encoding` to `Vary` unless it is already listed.
///
/// Multiple `Vary` entries are folded into a single comma-separated value.
pub(crate) fn append_vary(headers: &mut HeaderMap) {
    let existing: Vec<String> = headers
        .get_all(VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect();

    if existing
        .iter()
        .any(|token| token == "*" || token.eq_ignore_ascii_case(ACCEPT_ENCODING_TOKEN))
    {
        return;
    }

    let value = if existing.is_empty() {
        HeaderValue::from_static(ACCEPT_ENCODING_TOKEN)
    } else {
        match HeaderValue::from_str(&format!("{}, {ACCEPT_ENCODING_TOKEN}", existing.join(", "))) {
            Ok(value) => value,
            Err(_) => return,
        }
    };
    headers.insert(VARY, value);
}
