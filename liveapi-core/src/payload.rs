//! Inbound event payloads.
//!
//! A payload is an untyped blob. Only the connection event carries a
//! [`Handshake`], and only a handshake exposes headers.

use serde_json::Value;
use std::collections::HashMap;

/// The raw data delivered with an inbound event.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// No data.
    #[default]
    Empty,
    /// Text, possibly JSON-encoded.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// An already decoded value.
    Value(Value),
    /// The connection-establishment payload.
    Handshake(Handshake),
}

impl Payload {
    /// Decoded headers, present only for a handshake payload.
    pub fn headers(&self) -> Option<HeaderMap> {
        match self {
            Self::Handshake(handshake) => Some(handshake.header_map()),
            _ => None,
        }
    }

    /// The JSON text of this payload, if it is JSON-encoded text.
    pub fn json_text(&self) -> Option<&str> {
        let text = match self {
            Self::Text(text) => text.as_str(),
            Self::Binary(bytes) => std::str::from_utf8(bytes).ok()?,
            _ => return None,
        };
        serde_json::from_str::<serde::de::IgnoredAny>(text)
            .is_ok()
            .then_some(text)
    }

    /// The payload as a native value, without decoding text.
    ///
    /// A handshake yields its client `auth` object.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Text(text) => Value::String(text.clone()),
            Self::Binary(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            Self::Value(value) => value.clone(),
            Self::Handshake(handshake) => handshake.auth.clone().unwrap_or(Value::Null),
        }
    }

    /// Generic decode: JSON text is parsed, everything else is taken as is.
    pub fn decode_generic(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Text(text) => serde_json::from_str(text),
            Self::Binary(bytes) => serde_json::from_slice(bytes),
            other => Ok(other.to_value()),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<Handshake> for Payload {
    fn from(handshake: Handshake) -> Self {
        Self::Handshake(handshake)
    }
}

/// The connection-establishment payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Handshake {
    /// Raw header pairs as received on the wire.
    pub headers: Vec<(Vec<u8>, Vec<u8>)>,
    /// Client supplied `auth` data.
    pub auth: Option<Value>,
}

impl Handshake {
    /// Create an empty handshake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw header.
    pub fn with_header(mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.headers
            .push((name.as_ref().to_vec(), value.as_ref().to_vec()));
        self
    }

    /// Attach client `auth` data.
    pub fn with_auth(mut self, auth: Value) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Decode the raw headers.
    pub fn header_map(&self) -> HeaderMap {
        self.headers
            .iter()
            .map(|(name, value)| {
                (
                    String::from_utf8_lossy(name).into_owned(),
                    String::from_utf8_lossy(value).into_owned(),
                )
            })
            .collect()
    }
}

/// Decoded connection headers with case-insensitive lookup.
///
/// Names are stored lowercased; a repeated header keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: HashMap<String, String>,
}

impl HeaderMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(name.as_ref().to_lowercase(), value.into());
    }

    /// Look up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(lowercased name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}
