//! Cache key derivation.

use std::fmt;

use serde_json::{Map, Value};

use crate::http::{Headers, Method};

/// Identifies a logical request for deduplication.
///
/// The key is the compact JSON encoding of
/// `[method, url, [[name, value], ...], body]`. JSON string escaping makes the
/// encoding injective, so two requests that differ in any part can never share
/// a key.
///
/// Header names are lowercased and sorted before encoding, so the same header
/// set written in a different order or case yields the same key. Object keys
/// inside the body are sorted as well.
///
/// # Examples
///
/// ```
/// use reqcache::cache::CacheKey;
/// use reqcache::http::{Headers, Method};
/// use serde_json::json;
///
/// let a: Headers = [("Accept", "json"), ("X-Id", "7")].into_iter().collect();
/// let b: Headers = [("x-id", "7"), ("accept", "json")].into_iter().collect();
/// let body = json!({ "b": 1, "a": 2 });
///
/// assert_eq!(
///     CacheKey::derive("/items", &Method::Post, &a, Some(&body)),
///     CacheKey::derive("/items", &Method::Post, &b, Some(&body)),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a request. Never fails and has no side effects.
    ///
    /// `body` is the logical body, before any wire encoding. An absent body
    /// and a JSON `null` body produce different keys.
    pub fn derive(url: &str, method: &Method, headers: &Headers, body: Option<&Value>) -> Self {
        let headers = headers
            .canonical()
            .into_iter()
            .map(|(name, value)| {
                Value::Array(vec![Value::String(name), Value::String(value.to_owned())])
            })
            .collect();

        let body = match body {
            Some(body) => Value::String(canonical(body).to_string()),
            None => Value::Null,
        };

        let encoded = Value::Array(vec![
            Value::String(method.as_str().to_owned()),
            Value::String(url.to_owned()),
            Value::Array(headers),
            body,
        ]);

        Self(encoded.to_string())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Rebuilds objects with their keys inserted in sorted order, so the encoding
// does not depend on whether serde_json preserves insertion order.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key.clone(), canonical(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn key(url: &str, method: Method, headers: &[(&str, &str)], body: Option<Value>) -> CacheKey {
        let headers: Headers = headers.iter().copied().collect();
        CacheKey::derive(url, &method, &headers, body.as_ref())
    }

    #[test]
    fn identical_requests_share_a_key() {
        let a = key("/x", Method::Get, &[("Accept", "json")], None);
        let b = key("/x", Method::Get, &[("Accept", "json")], None);
        assert_eq!(a, b);
    }

    #[test]
    fn method_url_and_body_are_distinguished() {
        let base = key("/x", Method::Get, &[], None);
        assert_ne!(base, key("/x", Method::Delete, &[], None));
        assert_ne!(base, key("/y", Method::Get, &[], None));
        assert_ne!(base, key("/x", Method::Get, &[], Some(json!({ "v": 1 }))));
        assert_ne!(
            key("/x", Method::Post, &[], Some(json!({ "v": 1 }))),
            key("/x", Method::Post, &[], Some(json!({ "v": 2 }))),
        );
    }

    #[test]
    fn header_values_are_distinguished() {
        assert_ne!(
            key("/x", Method::Get, &[("Authorization", "a")], None),
            key("/x", Method::Get, &[("Authorization", "b")], None),
        );
        assert_ne!(
            key("/x", Method::Get, &[], None),
            key("/x", Method::Get, &[("Accept", "json")], None),
        );
    }

    #[test]
    fn header_order_and_case_are_normalized() {
        assert_eq!(
            key("/x", Method::Get, &[("Accept", "json"), ("X-Id", "1")], None),
            key("/x", Method::Get, &[("x-id", "1"), ("ACCEPT", "json")], None),
        );
    }

    #[test]
    fn repeated_header_order_is_significant() {
        assert_ne!(
            key("/x", Method::Get, &[("Accept-Language", "en"), ("Accept-Language", "de")], None),
            key("/x", Method::Get, &[("Accept-Language", "de"), ("Accept-Language", "en")], None),
        );
    }

    #[test]
    fn body_object_key_order_is_normalized() {
        let a = serde_json::from_str::<Value>(r#"{"a":1,"b":{"d":2,"c":3}}"#).unwrap();
        let b = serde_json::from_str::<Value>(r#"{"b":{"c":3,"d":2},"a":1}"#).unwrap();
        assert_eq!(
            key("/x", Method::Post, &[], Some(a)),
            key("/x", Method::Post, &[], Some(b)),
        );
    }

    #[test]
    fn absent_body_differs_from_null_body() {
        assert_ne!(
            key("/x", Method::Post, &[], None),
            key("/x", Method::Post, &[], Some(Value::Null)),
        );
    }

    #[test]
    fn separators_inside_parts_cannot_collide() {
        // A naive "url|method" join would make these equal.
        assert_ne!(
            key("/x|GET", Method::Custom("A".into()), &[], None),
            key("/x", Method::Custom("GET|A".into()), &[], None),
        );
        assert_ne!(
            key("/x", Method::Get, &[("a", "b\",\"c")], None),
            key("/x", Method::Get, &[("a", "b"), ("c", "")], None),
        );
    }
}
