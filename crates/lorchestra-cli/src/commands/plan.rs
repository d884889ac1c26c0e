use crate::support::{fail, load_config_or_exit, parse_params_or_exit, print_json_or_exit};
use lorchestra_callable::global;
use lorchestra_core::build_plan;

pub fn run(
    config: Option<String>,
    name: String,
    correlation_id: String,
    method: Option<String>,
    params: String,
) {
    let config = load_config_or_exit(config.as_deref());
    let params = parse_params_or_exit(&params);
    let method = method.or(config.plan.method);

    let result = global().dispatch(&name, &params).unwrap_or_else(|e| fail(e));
    let plan = build_plan(result, correlation_id, method.as_deref()).unwrap_or_else(|e| fail(e));

    print_json_or_exit("plan", &plan.to_value());
}
