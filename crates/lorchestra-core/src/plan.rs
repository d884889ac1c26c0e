//! Plan builder: callable result → ordered, idempotent operations.

use crate::error::LorchestraError;
use crate::identity::idempotency_key;
use crate::result::{CallableResult, Item};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Canonical append-to-log method; the only one that gets idempotency keys.
pub const WAL_APPEND: &str = "wal.append";

/// Plan schema tag understood by the execution engine.
pub const PLAN_VERSION: &str = "storacle.plan/1.0.0";

/// One unit of work for the execution engine. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    op_id: String,
    method: String,
    params: Item,
    idempotency_key: Option<String>,
}

impl Operation {
    fn new(method: &str, params: Item) -> Self {
        let idempotency_key =
            (method == WAL_APPEND).then(|| idempotency_key(method, &params).key);
        Self {
            op_id: Uuid::new_v4().to_string(),
            method: method.to_string(),
            params,
            idempotency_key,
        }
    }

    /// Tracing identifier; never used for correctness.
    pub fn op_id(&self) -> &str {
        &self.op_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &Item {
        &self.params
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }
}

/// Ordered operations plus the caller's correlation id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    plan_version: &'static str,
    correlation_id: String,
    ops: Vec<Operation>,
}

impl Plan {
    pub fn plan_version(&self) -> &str {
        self.plan_version
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Wire form handed to the submission boundary.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "plan_version": self.plan_version,
            "correlation_id": self.correlation_id,
            "ops": self
                .ops
                .iter()
                .map(|op| {
                    serde_json::json!({
                        "op_id": op.op_id,
                        "method": op.method,
                        "params": op.params,
                        "idempotency_key": op.idempotency_key,
                    })
                })
                .collect::<Vec<_>>(),
        })
    }
}

/// Convert a result into a plan, one operation per item in order.
///
/// `method` defaults to [`WAL_APPEND`]. Results carrying `items_ref` are
/// rejected: resolving externally stored batches is not implemented.
pub fn build_plan(
    result: CallableResult,
    correlation_id: impl Into<String>,
    method: Option<&str>,
) -> Result<Plan, LorchestraError> {
    let method = method.unwrap_or(WAL_APPEND);
    let (items, items_ref, _stats) = result.into_parts();

    if let Some(items_ref) = items_ref {
        return Err(LorchestraError::unsupported(format!(
            "items_ref results ({items_ref}); plan building requires inline items"
        )));
    }
    // The result contract guarantees items are present once items_ref is not.
    let items = items.unwrap_or_default();

    let ops: Vec<Operation> = items
        .into_iter()
        .map(|item| Operation::new(method, item))
        .collect();

    let correlation_id = correlation_id.into();
    tracing::debug!(
        correlation_id = %correlation_id,
        method,
        ops = ops.len(),
        "built plan"
    );

    Ok(Plan {
        plan_version: PLAN_VERSION,
        correlation_id,
        ops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IDEMPOTENCY_KEY_PREFIX;
    use crate::result::Stats;
    use serde_json::json;

    fn items(value: Value) -> Vec<Item> {
        serde_json::from_value(value).expect("array of objects")
    }

    #[test]
    fn one_op_per_item_in_order() {
        let input = items(json!([{"id": "a"}, {"id": "b"}, {"id": "c", "x": 1}]));
        let result = CallableResult::from_items(input.clone(), Stats::new());

        let plan = build_plan(result, "corr-1", None).expect("plan builds");
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.correlation_id(), "corr-1");
        assert_eq!(plan.plan_version(), PLAN_VERSION);
        for (op, item) in plan.ops().iter().zip(&input) {
            assert_eq!(op.params(), item);
            assert_eq!(op.method(), WAL_APPEND);
        }
    }

    #[test]
    fn items_ref_is_rejected() {
        let result = CallableResult::from_ref("gs://bucket/batch.jsonl", Stats::new());
        let err = build_plan(result, "corr-1", None).expect_err("items_ref must be rejected");
        assert!(matches!(err, LorchestraError::Unsupported { .. }));
        assert!(err.to_string().starts_with("not supported in this version"));
    }

    #[test]
    fn idempotency_key_only_for_wal_append() {
        let input = items(json!([{"id": "a"}, {"id": "b"}]));

        let appended = build_plan(
            CallableResult::from_items(input.clone(), Stats::new()),
            "c",
            Some(WAL_APPEND),
        )
        .expect("plan builds");
        for op in appended.ops() {
            let key = op.idempotency_key().expect("wal.append ops carry keys");
            assert!(key.starts_with(IDEMPOTENCY_KEY_PREFIX));
        }

        let upserted = build_plan(
            CallableResult::from_items(input, Stats::new()),
            "c",
            Some("bq.upsert"),
        )
        .expect("plan builds");
        assert!(upserted.ops().iter().all(|op| op.idempotency_key().is_none()));
        assert!(upserted.ops().iter().all(|op| op.method() == "bq.upsert"));
    }

    #[test]
    fn op_ids_are_unique() {
        let input = items(json!([{"id": "a"}, {"id": "a"}]));
        let plan = build_plan(CallableResult::from_items(input, Stats::new()), "c", None)
            .expect("plan builds");
        assert_ne!(plan.ops()[0].op_id(), plan.ops()[1].op_id());
        // Same identity, same key: the engine deduplicates the second append.
        assert_eq!(
            plan.ops()[0].idempotency_key(),
            plan.ops()[1].idempotency_key()
        );
    }

    #[test]
    fn null_ids_do_not_collapse_distinct_items() {
        let input = items(json!([
            {"id": null, "name": "Ada"},
            {"id": null, "name": "Grace"}
        ]));
        let plan = build_plan(CallableResult::from_items(input, Stats::new()), "c", None)
            .expect("plan builds");
        assert_ne!(
            plan.ops()[0].idempotency_key(),
            plan.ops()[1].idempotency_key()
        );
    }

    #[test]
    fn empty_items_give_empty_plan() {
        let plan = build_plan(CallableResult::from_items(vec![], Stats::new()), "c", None)
            .expect("plan builds");
        assert!(plan.is_empty());
    }

    #[test]
    fn wire_shape_has_null_key_for_other_methods() {
        let input = items(json!([{"entity_id": "p-1"}]));
        let plan = build_plan(
            CallableResult::from_items(input, Stats::new()),
            "c",
            Some("bq.upsert"),
        )
        .expect("plan builds");

        let wire = plan.to_value();
        assert_eq!(wire["plan_version"], json!(PLAN_VERSION));
        assert_eq!(wire["ops"][0]["idempotency_key"], Value::Null);
        assert!(
            wire["ops"][0]
                .as_object()
                .expect("op object")
                .contains_key("idempotency_key")
        );
        assert_eq!(serde_json::to_value(&plan).expect("plan serializes"), wire);
    }
}
