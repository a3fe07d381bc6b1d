//! Strict query-string parsing for reference URLs.
//!
//! `url` decodes `application/x-www-form-urlencoded` leniently; selectors are
//! user input in a manifest, so malformed escapes and `;` separators are
//! rejected instead of silently decoded.

use indexmap::IndexMap;
use url::form_urlencoded;

/// Query key → values in the order they appear.
pub(crate) type QueryMap = IndexMap<String, Vec<String>>;

/// Parse `raw` (without the leading `?`) into a multimap.
///
/// Returns the reason on failure; the caller attaches reference context.
pub(crate) fn parse_query(raw: &str) -> Result<QueryMap, String> {
    let mut map = QueryMap::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        if pair.contains(';') {
            return Err("invalid semicolon separator in query".to_owned());
        }
        validate_escapes(pair)?;
        if let Some((key, value)) = form_urlencoded::parse(pair.as_bytes()).next() {
            map.entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }
    Ok(map)
}

/// Every `%` must start a two-digit hex escape.
pub(crate) fn validate_escapes(pair: &str) -> Result<(), String> {
    let bytes = pair.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            match escape {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => {
                    let end = (i + 3).min(bytes.len());
                    return Err(format!(
                        "invalid URL escape {:?}",
                        String::from_utf8_lossy(&bytes[i..end])
                    ));
                }
            }
        } else {
            i += 1;
        }
    }
    Ok(())
}
