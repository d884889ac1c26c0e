//! Callables bundled with lorchestra.
//!
//! These are pure: they shape records into results and never touch storage.

use crate::callable::{CallableOutput, Params, SharedCallable};
use lorchestra_core::LorchestraError;
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub const PASSTHROUGH: &str = "lorchestra.passthrough";
pub const EVENT_ENVELOPE: &str = "lorchestra.event_envelope";

const DEFAULT_ID_FIELD: &str = "id";

pub fn internal_callables() -> Vec<(&'static str, SharedCallable)> {
    vec![
        (PASSTHROUGH, Arc::new(passthrough) as SharedCallable),
        (EVENT_ENVELOPE, Arc::new(event_envelope) as SharedCallable),
    ]
}

/// Return caller-supplied `items` (or `items_ref`) as a result.
pub fn passthrough(params: &Params) -> Result<CallableOutput, LorchestraError> {
    let mut out = Map::new();
    match (params.get("items"), params.get("items_ref")) {
        (Some(Value::Array(items)), None) => {
            if let Some(idx) = items.iter().position(|item| !item.is_object()) {
                return Err(LorchestraError::permanent(format!(
                    "passthrough: items[{idx}] must be an object"
                )));
            }
            out.insert("items".to_string(), Value::Array(items.clone()));
            out.insert(
                "stats".to_string(),
                json!({"input": items.len(), "output": items.len()}),
            );
        }
        (None, Some(Value::String(items_ref))) => {
            out.insert("items_ref".to_string(), Value::String(items_ref.clone()));
            out.insert("stats".to_string(), json!({"input": 0, "output": 0}));
        }
        (Some(_), Some(_)) => {
            return Err(LorchestraError::permanent(
                "passthrough: pass either items or items_ref, not both",
            ));
        }
        _ => {
            return Err(LorchestraError::permanent(
                "passthrough: requires items (array of objects) or items_ref (string)",
            ));
        }
    }
    Ok(out)
}

/// Wrap raw records into append-log events keyed by `stream_id` + `event_id`.
pub fn event_envelope(params: &Params) -> Result<CallableOutput, LorchestraError> {
    let stream_id = match params.get("stream_id") {
        Some(Value::String(stream_id)) if !stream_id.trim().is_empty() => stream_id.trim(),
        _ => {
            return Err(LorchestraError::permanent(
                "event_envelope: stream_id must be a non-empty string",
            ));
        }
    };
    let records = match params.get("records") {
        Some(Value::Array(records)) => records,
        _ => {
            return Err(LorchestraError::permanent(
                "event_envelope: records must be an array of objects",
            ));
        }
    };
    let id_field = match params.get("id_field") {
        None | Some(Value::Null) => DEFAULT_ID_FIELD,
        Some(Value::String(field)) if !field.is_empty() => field.as_str(),
        Some(_) => {
            return Err(LorchestraError::permanent(
                "event_envelope: id_field must be a non-empty string",
            ));
        }
    };
    let event_type = match params.get("event_type") {
        None | Some(Value::Null) => None,
        Some(Value::String(event_type)) => Some(event_type.clone()),
        Some(_) => {
            return Err(LorchestraError::permanent(
                "event_envelope: event_type must be a string",
            ));
        }
    };

    let mut items = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for (idx, record) in records.iter().enumerate() {
        let Value::Object(record) = record else {
            return Err(LorchestraError::permanent(format!(
                "event_envelope: records[{idx}] must be an object"
            )));
        };
        let Some(event_id) = record.get(id_field).and_then(scalar_id) else {
            tracing::debug!(index = idx, id_field, "record has no usable id; skipping");
            skipped += 1;
            continue;
        };

        let mut item = Map::new();
        item.insert("stream_id".to_string(), Value::String(stream_id.to_string()));
        item.insert("event_id".to_string(), Value::String(event_id));
        if let Some(event_type) = &event_type {
            item.insert("event_type".to_string(), Value::String(event_type.clone()));
        }
        item.insert("payload".to_string(), Value::Object(record.clone()));
        items.push(Value::Object(item));
    }

    let mut out = Map::new();
    out.insert(
        "stats".to_string(),
        json!({"input": records.len(), "output": items.len(), "skipped": skipped}),
    );
    out.insert("items".to_string(), Value::Array(items));
    Ok(out)
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
