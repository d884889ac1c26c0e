//! Local write-ahead log: a development engine for the submission boundary.
//!
//! One JSON line per applied `wal.append` op. Replays are safe: an op whose
//! idempotency key already appears in the log is counted as deduplicated and
//! not written again.

use crate::boundary::PlanExecutor;
use lorchestra_core::{LorchestraError, WAL_APPEND};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A line in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    pub idempotency_key: String,
    pub correlation_id: String,
    pub op_id: String,
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WalError {
    #[error("{path}: I/O error: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} line {line}: parse error: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl WalError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read every record from the log at `path`. A missing file is an empty log.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<WalRecord>, WalError> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(WalError::io(path, err)),
    };

    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| WalError::io(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: WalRecord = serde_json::from_str(trimmed).map_err(|e| WalError::Parse {
            path: path.to_path_buf(),
            line: line_no + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

#[derive(Debug)]
pub struct LocalWalExecutor {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl LocalWalExecutor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, records: &[WalRecord]) -> Result<(), WalError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| WalError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| WalError::io(&self.path, e))?;
        let mut writer = BufWriter::new(file);
        for record in records {
            let line =
                serde_json::to_string(record).map_err(|e| WalError::Serialize(e.to_string()))?;
            writeln!(writer, "{line}").map_err(|e| WalError::io(&self.path, e))?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| WalError::io(&self.path, e.into_error()))?;
        file.sync_all().map_err(|e| WalError::io(&self.path, e))?;
        Ok(())
    }
}

struct PendingOp<'a> {
    key: &'a str,
    op_id: &'a str,
    params: &'a Map<String, Value>,
}

fn validate_ops(plan: &Value) -> Result<Vec<PendingOp<'_>>, LorchestraError> {
    let ops = plan
        .get("ops")
        .and_then(Value::as_array)
        .ok_or_else(|| LorchestraError::permanent("plan has no ops array"))?;

    let mut pending = Vec::with_capacity(ops.len());
    for (index, op) in ops.iter().enumerate() {
        let method = op.get("method").and_then(Value::as_str).unwrap_or_default();
        if method != WAL_APPEND {
            return Err(LorchestraError::permanent(format!(
                "local wal cannot apply ops[{index}] method `{method}`; only `{WAL_APPEND}` is supported"
            )));
        }
        let Some(key) = op.get("idempotency_key").and_then(Value::as_str) else {
            return Err(LorchestraError::permanent(format!(
                "ops[{index}] is missing an idempotency_key"
            )));
        };
        let Some(params) = op.get("params").and_then(Value::as_object) else {
            return Err(LorchestraError::permanent(format!(
                "ops[{index}] params must be an object"
            )));
        };
        let op_id = op.get("op_id").and_then(Value::as_str).unwrap_or_default();
        pending.push(PendingOp { key, op_id, params });
    }
    Ok(pending)
}

impl PlanExecutor for LocalWalExecutor {
    fn execute(&self, plan: &Value, meta: &Value) -> Result<Value, LorchestraError> {
        let pending = validate_ops(plan)?;
        let correlation_id = plan
            .get("correlation_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let submitted_at = meta
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string);

        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut seen: BTreeSet<String> = read_records(&self.path)
            .map_err(LorchestraError::unclassified)?
            .into_iter()
            .map(|record| record.idempotency_key)
            .collect();

        let mut fresh = Vec::new();
        for op in &pending {
            if !seen.insert(op.key.to_string()) {
                tracing::debug!(key = op.key, "wal op already applied; skipping");
                continue;
            }
            fresh.push(WalRecord {
                idempotency_key: op.key.to_string(),
                correlation_id: correlation_id.to_string(),
                op_id: op.op_id.to_string(),
                params: op.params.clone(),
                submitted_at: submitted_at.clone(),
            });
        }

        if !fresh.is_empty() {
            self.append(&fresh).map_err(LorchestraError::unclassified)?;
        }

        tracing::info!(
            path = %self.path.display(),
            correlation_id,
            applied = fresh.len(),
            deduplicated = pending.len() - fresh.len(),
            "wal append complete"
        );

        Ok(json!({
            "status": "ok",
            "correlation_id": correlation_id,
            "ops_total": pending.len(),
            "ops_applied": fresh.len(),
            "ops_deduplicated": pending.len() - fresh.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!(
                "lorchestra-wal-{prefix}-{}-{unique}",
                std::process::id()
            ))
            .join("wal.jsonl")
    }

    fn plan(keys: &[&str]) -> Value {
        let ops: Vec<Value> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                json!({
                    "op_id": format!("op-{i}"),
                    "method": WAL_APPEND,
                    "params": {"id": format!("item-{i}")},
                    "idempotency_key": key,
                })
            })
            .collect();
        json!({"plan_version": "storacle.plan/1.0.0", "correlation_id": "c1", "ops": ops})
    }

    #[test]
    fn missing_log_reads_as_empty() {
        let path = temp_path("missing");
        assert!(read_records(&path).expect("missing file is empty").is_empty());
    }

    #[test]
    fn replay_is_deduplicated() {
        let path = temp_path("replay");
        let wal = LocalWalExecutor::new(&path);
        let meta = json!({"timestamp": "2024-05-01T12:00:00.000Z"});

        let first = wal.execute(&plan(&["sha256:a", "sha256:b"]), &meta).expect("first");
        assert_eq!(first["ops_applied"], json!(2));
        assert_eq!(first["ops_deduplicated"], json!(0));

        let second = wal
            .execute(&plan(&["sha256:a", "sha256:b", "sha256:c"]), &meta)
            .expect("second");
        assert_eq!(second["ops_total"], json!(3));
        assert_eq!(second["ops_applied"], json!(1));
        assert_eq!(second["ops_deduplicated"], json!(2));

        let records = read_records(&path).expect("log readable");
        let keys: Vec<&str> = records.iter().map(|r| r.idempotency_key.as_str()).collect();
        assert_eq!(keys, ["sha256:a", "sha256:b", "sha256:c"]);
        assert_eq!(
            records[0].submitted_at.as_deref(),
            Some("2024-05-01T12:00:00.000Z")
        );

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn duplicate_keys_within_one_plan_apply_once() {
        let path = temp_path("same-plan");
        let wal = LocalWalExecutor::new(&path);
        let response = wal
            .execute(&plan(&["sha256:x", "sha256:x"]), &json!({}))
            .expect("applies");
        assert_eq!(response["ops_applied"], json!(1));
        assert_eq!(response["ops_deduplicated"], json!(1));
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn other_methods_are_rejected_before_writing() {
        let path = temp_path("reject");
        let wal = LocalWalExecutor::new(&path);
        let mut bad = plan(&["sha256:a"]);
        bad["ops"]
            .as_array_mut()
            .expect("ops array")
            .push(json!({"op_id": "op-9", "method": "kv.put", "params": {}, "idempotency_key": null}));

        let err = wal.execute(&bad, &json!({})).expect_err("kv.put unsupported");
        assert!(matches!(err, LorchestraError::Permanent { .. }));
        assert!(err.to_string().contains("kv.put"));
        assert!(!path.exists(), "nothing written on rejection");
    }

    #[test]
    fn corrupt_log_is_unclassified() {
        let path = temp_path("corrupt");
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).expect("dir");
        }
        fs::write(&path, "not json\n").expect("fixture");

        let err = LocalWalExecutor::new(&path)
            .execute(&plan(&["sha256:a"]), &json!({}))
            .expect_err("corrupt log");
        let LorchestraError::Unclassified(source) = &err else {
            panic!("expected unclassified, got {err:?}");
        };
        assert!(matches!(
            source.downcast_ref::<WalError>(),
            Some(WalError::Parse { line: 1, .. })
        ));

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}
