//! The normalized result contract every callable returns.
//!
//! Exactly one of `items` / `items_ref` is present. The check fires at
//! construction (including deserialization), so an invalid value cannot be
//! observed anywhere downstream.

use crate::error::LorchestraError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const RESULT_SCHEMA_VERSION: &str = "1.0";

/// One structured record carried by a result.
pub type Item = Map<String, Value>;

/// Free-form counters (input/output/skipped/errors, ...).
pub type Stats = Map<String, Value>;

fn default_schema_version() -> String {
    RESULT_SCHEMA_VERSION.to_string()
}

/// Normalized callable output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCallableResult")]
pub struct CallableResult {
    schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Vec<Item>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items_ref: Option<String>,
    stats: Stats,
}

#[derive(Deserialize)]
struct RawCallableResult {
    #[serde(default = "default_schema_version")]
    schema_version: String,
    #[serde(default)]
    items: Option<Vec<Item>>,
    #[serde(default)]
    items_ref: Option<String>,
    #[serde(default)]
    stats: Stats,
}

impl TryFrom<RawCallableResult> for CallableResult {
    type Error = LorchestraError;

    fn try_from(raw: RawCallableResult) -> Result<Self, Self::Error> {
        Self::new(raw.schema_version, raw.items, raw.items_ref, raw.stats)
    }
}

impl CallableResult {
    /// Validating constructor; fails unless exactly one of `items` /
    /// `items_ref` is set.
    pub fn new(
        schema_version: impl Into<String>,
        items: Option<Vec<Item>>,
        items_ref: Option<String>,
        stats: Stats,
    ) -> Result<Self, LorchestraError> {
        match (&items, &items_ref) {
            (Some(_), Some(_)) => {
                return Err(LorchestraError::InvalidResult(
                    "exactly one of items or items_ref must be set, got both".to_string(),
                ));
            }
            (None, None) => {
                return Err(LorchestraError::InvalidResult(
                    "exactly one of items or items_ref must be set, got neither".to_string(),
                ));
            }
            _ => {}
        }
        Ok(Self {
            schema_version: schema_version.into(),
            items,
            items_ref,
            stats,
        })
    }

    /// Inline items with default schema version.
    pub fn from_items(items: Vec<Item>, stats: Stats) -> Self {
        Self {
            schema_version: default_schema_version(),
            items: Some(items),
            items_ref: None,
            stats,
        }
    }

    /// Reference to externally stored items with default schema version.
    pub fn from_ref(items_ref: impl Into<String>, stats: Stats) -> Self {
        Self {
            schema_version: default_schema_version(),
            items: None,
            items_ref: Some(items_ref.into()),
            stats,
        }
    }

    /// Wrap the mapping a callable returned.
    ///
    /// Explicit `null` counts as absent. Field types are checked strictly;
    /// unknown keys are ignored.
    pub fn from_map(mut map: Map<String, Value>) -> Result<Self, LorchestraError> {
        let schema_version = match map.remove("schema_version") {
            None | Some(Value::Null) => default_schema_version(),
            Some(Value::String(version)) => version,
            Some(other) => {
                return Err(LorchestraError::InvalidResult(format!(
                    "schema_version must be a string, got {}",
                    json_kind(&other)
                )));
            }
        };

        let items = match map.remove("items") {
            None | Some(Value::Null) => None,
            Some(Value::Array(values)) => {
                let mut items = Vec::with_capacity(values.len());
                for (idx, value) in values.into_iter().enumerate() {
                    match value {
                        Value::Object(item) => items.push(item),
                        other => {
                            return Err(LorchestraError::InvalidResult(format!(
                                "items[{idx}] must be an object, got {}",
                                json_kind(&other)
                            )));
                        }
                    }
                }
                Some(items)
            }
            Some(other) => {
                return Err(LorchestraError::InvalidResult(format!(
                    "items must be an array, got {}",
                    json_kind(&other)
                )));
            }
        };

        let items_ref = match map.remove("items_ref") {
            None | Some(Value::Null) => None,
            Some(Value::String(reference)) => Some(reference),
            Some(other) => {
                return Err(LorchestraError::InvalidResult(format!(
                    "items_ref must be a string, got {}",
                    json_kind(&other)
                )));
            }
        };

        let stats = match map.remove("stats") {
            None | Some(Value::Null) => Stats::new(),
            Some(Value::Object(stats)) => stats,
            Some(other) => {
                return Err(LorchestraError::InvalidResult(format!(
                    "stats must be an object, got {}",
                    json_kind(&other)
                )));
            }
        };

        Self::new(schema_version, items, items_ref, stats)
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn items(&self) -> Option<&[Item]> {
        self.items.as_deref()
    }

    pub fn items_ref(&self) -> Option<&str> {
        self.items_ref.as_deref()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Consume the result, yielding inline items or the reference.
    pub fn into_parts(self) -> (Option<Vec<Item>>, Option<String>, Stats) {
        (self.items, self.items_ref, self.stats)
    }

    /// Wire form; the absent side of the XOR pair is omitted entirely.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert(
            "schema_version".to_string(),
            Value::String(self.schema_version.clone()),
        );
        if let Some(items) = &self.items {
            out.insert(
                "items".to_string(),
                Value::Array(items.iter().cloned().map(Value::Object).collect()),
            );
        }
        if let Some(items_ref) = &self.items_ref {
            out.insert("items_ref".to_string(), Value::String(items_ref.clone()));
        }
        out.insert("stats".to_string(), Value::Object(self.stats.clone()));
        Value::Object(out)
    }
}

/// JSON type name of `value`, for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
