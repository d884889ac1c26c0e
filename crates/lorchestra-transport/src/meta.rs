//! Tracing envelope sent alongside every submission.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUBMIT_META_SCHEMA: &str = "storacle.submit_meta/1.0.0";

fn default_meta_schema() -> String {
    SUBMIT_META_SCHEMA.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionMeta {
    #[serde(default = "default_meta_schema")]
    pub schema_version: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub step_id: Option<String>,
    pub correlation_id: String,
    #[serde(default)]
    pub caller: Option<String>,
    /// ISO-8601 UTC; filled in at submission when absent.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl SubmissionMeta {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            schema_version: default_meta_schema(),
            job_id: None,
            run_id: None,
            step_id: None,
            correlation_id: correlation_id.into(),
            caller: None,
            timestamp: None,
        }
    }

    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Populate `timestamp` with the current UTC time if it is missing.
    pub fn stamped(mut self) -> Self {
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        }
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "schema_version": self.schema_version,
            "job_id": self.job_id,
            "run_id": self.run_id,
            "step_id": self.step_id,
            "correlation_id": self.correlation_id,
            "caller": self.caller,
            "timestamp": self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn stamped_fills_missing_timestamp() {
        let meta = SubmissionMeta::new("c1").stamped();
        let ts = meta.timestamp.as_deref().expect("timestamp populated");
        DateTime::parse_from_rfc3339(ts).expect("timestamp is RFC 3339");
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn stamped_keeps_existing_timestamp() {
        let meta = SubmissionMeta::new("c1")
            .with_timestamp("2024-05-01T12:00:00Z")
            .stamped();
        assert_eq!(meta.timestamp.as_deref(), Some("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn wire_shape_snapshot() {
        let meta = SubmissionMeta::new("run-7/step-2")
            .with_job("gmail_ingest")
            .with_run("run-7")
            .with_step("step-2")
            .with_caller("lorchestra")
            .with_timestamp("2024-05-01T12:00:00.000Z");
        insta::assert_json_snapshot!(meta.to_value(), @r#"
        {
          "caller": "lorchestra",
          "correlation_id": "run-7/step-2",
          "job_id": "gmail_ingest",
          "run_id": "run-7",
          "schema_version": "storacle.submit_meta/1.0.0",
          "step_id": "step-2",
          "timestamp": "2024-05-01T12:00:00.000Z"
        }
        "#);
    }

    #[test]
    fn deserializes_with_defaults() {
        let meta: SubmissionMeta =
            serde_json::from_value(serde_json::json!({"correlation_id": "c"})).expect("valid");
        assert_eq!(meta.schema_version, SUBMIT_META_SCHEMA);
        assert!(meta.job_id.is_none());
    }
}
