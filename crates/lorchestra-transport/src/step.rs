//! One pipeline step: dispatch a callable, plan its result, submit the plan.

use crate::boundary::SubmissionClient;
use crate::meta::SubmissionMeta;
use lorchestra_callable::{Dispatcher, Params};
use lorchestra_core::{LorchestraError, build_plan};
use serde_json::Value;

/// Run `name` end to end. The plan's correlation id comes from `meta`.
///
/// Dispatch and planning errors are returned as they arrive; only the
/// submission itself goes through boundary classification.
pub fn run_step(
    dispatcher: &Dispatcher,
    client: &SubmissionClient,
    name: &str,
    params: &Params,
    method: Option<&str>,
    meta: SubmissionMeta,
) -> Result<Value, LorchestraError> {
    let result = dispatcher.dispatch(name, params)?;
    let plan = build_plan(result, meta.correlation_id.clone(), method)?;
    tracing::debug!(
        callable = name,
        correlation_id = plan.correlation_id(),
        ops = plan.len(),
        "step planned"
    );
    client.submit(&plan, meta)
}
