use crate::config::{CONFIG_ENV, Config, ConfigSource};
use lorchestra_callable::Params;
use lorchestra_core::{ErrorClass, Item, LorchestraError, json_kind};
use serde::Serialize;
use serde_json::Value;

/// `EX_TEMPFAIL`: the failure is transient and the caller may retry.
pub const EXIT_TRANSIENT: i32 = 75;
pub const EXIT_PERMANENT: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Log to stderr so stdout stays machine-readable. `RUST_LOG` overrides `warn`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn load_config_or_exit(flag: Option<&str>) -> Config {
    let source = ConfigSource::resolve(flag, std::env::var(CONFIG_ENV).ok());
    Config::load(&source).unwrap_or_else(|e| {
        eprintln!("error: failed to load config: {e}");
        std::process::exit(EXIT_USAGE);
    })
}

pub fn parse_object_or_exit(flag: &str, raw: &str) -> Item {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            eprintln!(
                "error: --{flag} must be a JSON object, got {}",
                json_kind(&other)
            );
            std::process::exit(EXIT_USAGE);
        }
        Err(err) => {
            eprintln!("error: failed to parse --{flag} JSON: {err}");
            std::process::exit(EXIT_USAGE);
        }
    }
}

pub fn parse_params_or_exit(raw: &str) -> Params {
    parse_object_or_exit("params", raw)
}

pub fn exit_code_for(err: &LorchestraError) -> i32 {
    match err.class() {
        Some(ErrorClass::Transient) => EXIT_TRANSIENT,
        Some(ErrorClass::Permanent) | None => EXIT_PERMANENT,
    }
}

pub fn fail(err: LorchestraError) -> ! {
    let class = err.class().map_or("unclassified", ErrorClass::as_str);
    eprintln!("error: [{class}] {err}");
    std::process::exit(exit_code_for(&err));
}

pub fn print_json_or_exit(label: &str, value: &impl Serialize) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|err| {
        eprintln!("error: failed to render {label} payload: {err}");
        std::process::exit(EXIT_USAGE);
    });
    println!("{rendered}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(exit_code_for(&LorchestraError::transient("busy")), EXIT_TRANSIENT);
        assert_eq!(exit_code_for(&LorchestraError::permanent("bad")), EXIT_PERMANENT);
        assert_eq!(
            exit_code_for(&LorchestraError::UnknownCallable {
                name: "nope".to_string()
            }),
            EXIT_PERMANENT
        );
        assert_eq!(
            exit_code_for(&LorchestraError::unclassified(std::io::Error::other("boom"))),
            EXIT_PERMANENT
        );
    }
}
