//! Deterministic idempotency keys for append-log operations.
//!
//! Identity material is a closed, priority-ordered field list. Only when an
//! item carries none of them does the whole item become identity material;
//! that fallback changes whenever any incidental field changes (timestamps,
//! float rounding) and is reported through [`IdentitySource::FullItem`].

use crate::result::Item;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub const IDEMPOTENCY_KEY_PREFIX: &str = "sha256:";

/// Stable identity fields, highest priority first.
pub const IDENTITY_FIELDS: [&str; 6] = [
    "idem_key",
    "stream_id",
    "event_id",
    "entity_id",
    "version",
    "id",
];

/// Where the identity material for a key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// One or more of [`IDENTITY_FIELDS`].
    Fields,
    /// No identity fields were present; the entire item was hashed.
    FullItem,
}

impl IdentitySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fields => "fields",
            Self::FullItem => "full_item",
        }
    }
}

/// A computed key plus the provenance of its identity material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyKey {
    pub key: String,
    pub source: IdentitySource,
}

/// Extract whichever identity fields are present on `item`. A `null`
/// value counts as absent.
pub fn identity_fields(item: &Item) -> Map<String, Value> {
    IDENTITY_FIELDS
        .iter()
        .filter_map(|field| match item.get(*field) {
            None | Some(Value::Null) => None,
            Some(value) => Some(((*field).to_string(), value.clone())),
        })
        .collect()
}

/// Compute the idempotency key for `item` under `method`.
pub fn idempotency_key(method: &str, item: &Item) -> IdempotencyKey {
    let fields = identity_fields(item);
    let (identity, source) = if fields.is_empty() {
        tracing::warn!(
            method,
            "no identity fields on item; idempotency key derived from the full item"
        );
        (Value::Object(item.clone()), IdentitySource::FullItem)
    } else {
        (Value::Object(fields), IdentitySource::Fields)
    };

    let mut material = Map::new();
    material.insert("identity".to_string(), identity);
    material.insert("method".to_string(), Value::String(method.to_string()));

    let hash = Sha256::digest(canonical_json_bytes(&Value::Object(material)));
    IdempotencyKey {
        key: format!("{IDEMPOTENCY_KEY_PREFIX}{}", hex_lower(&hash)),
        source,
    }
}

/// Sorted-key, whitespace-free JSON encoding.
pub fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_json_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push(b'{');
            for (idx, (key, item)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_json_string(key, out);
                out.push(b':');
                write_canonical(item, out);
            }
            out.push(b'}');
        }
    }
}

fn write_json_string(s: &str, out: &mut Vec<u8>) {
    // Display for a string Value is its JSON encoding and cannot fail.
    out.extend_from_slice(Value::String(s.to_string()).to_string().as_bytes());
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
