use crate::support::{
    EXIT_USAGE, fail, load_config_or_exit, parse_params_or_exit, print_json_or_exit,
};
use lorchestra_callable::global;
use lorchestra_transport::{SubmissionMeta, run_step};
use serde_json::Value;
use std::path::PathBuf;

pub struct Args {
    pub config: Option<String>,
    pub name: String,
    pub correlation_id: String,
    pub job_id: Option<String>,
    pub run_id: Option<String>,
    pub step_id: Option<String>,
    pub method: Option<String>,
    pub params: String,
    pub wal: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let config = load_config_or_exit(args.config.as_deref());
    let params = parse_params_or_exit(&args.params);
    let method = args.method.or_else(|| config.plan.method.clone());

    let client = config
        .submission_client(args.wal.map(PathBuf::from))
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(EXIT_USAGE);
        });

    let mut meta = SubmissionMeta::new(args.correlation_id).with_caller(config.caller());
    if let Some(job_id) = args.job_id {
        meta = meta.with_job(job_id);
    }
    if let Some(run_id) = args.run_id {
        meta = meta.with_run(run_id);
    }
    if let Some(step_id) = args.step_id {
        meta = meta.with_step(step_id);
    }

    let response = run_step(
        global(),
        &client,
        &args.name,
        &params,
        method.as_deref(),
        meta,
    )
    .unwrap_or_else(|e| fail(e));

    if args.json {
        print_json_or_exit("run", &response);
        return;
    }

    let field = |name: &str| -> String {
        match response.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "<none>".to_string(),
            Some(other) => other.to_string(),
        }
    };
    println!("lorchestra run");
    println!("  Callable: {}", args.name);
    println!("  Correlation ID: {}", field("correlation_id"));
    println!("  Status: {}", field("status"));
    println!("  Ops: {}", field("ops_total"));
    println!("  Applied: {}", field("ops_applied"));
    if response.get("ops_deduplicated").is_some() {
        println!("  Deduplicated: {}", field("ops_deduplicated"));
    }
}
