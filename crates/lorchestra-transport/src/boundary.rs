//! The submission boundary: where a plan leaves lorchestra.
//!
//! This is the last classification point. Classified errors pass through;
//! unclassified ones become `Transient` if they are a builtin timeout and
//! `Permanent` otherwise. Error messages are never inspected here.

use crate::meta::SubmissionMeta;
use lorchestra_core::{LorchestraError, Plan};
use serde_json::{Value, json};
use std::io;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;

/// The in-process execution engine seam.
pub trait PlanExecutor: Send + Sync {
    /// Execute a plan in its wire form; the response flows back untouched.
    fn execute(&self, plan: &Value, meta: &Value) -> Result<Value, LorchestraError>;
}

/// Stand-in used when no engine is installed. Never commits anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

pub const NOOP_STATUS: &str = "noop";

impl PlanExecutor for NoopExecutor {
    fn execute(&self, plan: &Value, _meta: &Value) -> Result<Value, LorchestraError> {
        let ops_total = plan
            .get("ops")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        Ok(json!({
            "status": NOOP_STATUS,
            "correlation_id": plan.get("correlation_id").cloned().unwrap_or(Value::Null),
            "plan_version": plan.get("plan_version").cloned().unwrap_or(Value::Null),
            "ops_total": ops_total,
            "ops_applied": 0,
        }))
    }
}

/// How plans reach the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Direct call into an engine linked into this process.
    InProcess,
    /// Remote procedure envelope. Declared, not implemented.
    Rpc { endpoint: String },
}

#[derive(Clone)]
pub struct SubmissionClient {
    transport: Transport,
    executor: Option<Arc<dyn PlanExecutor>>,
}

impl std::fmt::Debug for SubmissionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionClient")
            .field("transport", &self.transport)
            .field("executor_installed", &self.executor.is_some())
            .finish()
    }
}

impl SubmissionClient {
    /// In-process client; `None` means the engine is not installed and
    /// submissions go to [`NoopExecutor`].
    pub fn in_process(executor: Option<Arc<dyn PlanExecutor>>) -> Self {
        Self {
            transport: Transport::InProcess,
            executor,
        }
    }

    pub fn rpc(endpoint: impl Into<String>) -> Self {
        Self {
            transport: Transport::Rpc {
                endpoint: endpoint.into(),
            },
            executor: None,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn engine_installed(&self) -> bool {
        self.executor.is_some()
    }

    /// Hand `plan` to the engine. Every error returned is classified.
    pub fn submit(&self, plan: &Plan, meta: SubmissionMeta) -> Result<Value, LorchestraError> {
        let meta = meta.stamped();
        self.submit_inner(plan, &meta).map_err(classify_failure)
    }

    fn submit_inner(&self, plan: &Plan, meta: &SubmissionMeta) -> Result<Value, LorchestraError> {
        match &self.transport {
            Transport::Rpc { endpoint } => {
                tracing::error!(endpoint = %endpoint, "rpc submission requested");
                Err(LorchestraError::unsupported("rpc transport"))
            }
            Transport::InProcess => {
                let plan_value = plan.to_value();
                let meta_value = meta.to_value();
                match &self.executor {
                    Some(executor) => {
                        tracing::debug!(
                            correlation_id = plan.correlation_id(),
                            ops = plan.len(),
                            "submitting plan in-process"
                        );
                        executor.execute(&plan_value, &meta_value)
                    }
                    None => {
                        tracing::warn!(
                            correlation_id = plan.correlation_id(),
                            ops = plan.len(),
                            "execution engine not installed; plan acknowledged as noop"
                        );
                        NoopExecutor.execute(&plan_value, &meta_value)
                    }
                }
            }
        }
    }
}

impl Default for SubmissionClient {
    fn default() -> Self {
        Self::in_process(None)
    }
}

/// Submit through an in-process client with no engine installed.
pub fn submit(plan: &Plan, meta: SubmissionMeta) -> Result<Value, LorchestraError> {
    SubmissionClient::default().submit(plan, meta)
}

/// Final classification for anything leaving the boundary.
pub fn classify_failure(err: LorchestraError) -> LorchestraError {
    match err {
        LorchestraError::Unclassified(source) => {
            if is_builtin_timeout(source.as_ref()) {
                LorchestraError::transient(source.to_string())
            } else {
                LorchestraError::permanent(source.to_string())
            }
        }
        classified => classified,
    }
}

fn is_builtin_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(cause) = current {
        if let Some(io_err) = cause.downcast_ref::<io::Error>()
            && io_err.kind() == io::ErrorKind::TimedOut
        {
            return true;
        }
        if matches!(
            cause.downcast_ref::<RecvTimeoutError>(),
            Some(RecvTimeoutError::Timeout)
        ) {
            return true;
        }
        current = cause.source();
    }
    false
}
