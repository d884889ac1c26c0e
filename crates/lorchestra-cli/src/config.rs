//! `lorchestra.toml`: caller identity, default plan method, submission target.

use lorchestra_transport::{LocalWalExecutor, PlanExecutor, SubmissionClient};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_CONFIG_PATH: &str = "lorchestra.toml";
pub const CONFIG_ENV: &str = "LORCHESTRA_CONFIG";
pub const DEFAULT_CALLER: &str = "lorchestra-cli";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub caller: Option<String>,
    #[serde(default)]
    pub plan: PlanConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    InProcess,
    Rpc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmissionConfig {
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub wal_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: invalid config: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("submission.transport = \"rpc\" requires submission.endpoint")]
    MissingEndpoint,
}

/// Where to look for the config file and whether it must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub explicit: bool,
}

impl ConfigSource {
    /// `--config` wins, then `LORCHESTRA_CONFIG`, then `./lorchestra.toml`.
    pub fn resolve(flag: Option<&str>, env: Option<String>) -> Self {
        match flag.map(str::to_string).or(env).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self {
                path: PathBuf::from(path),
                explicit: true,
            },
            None => Self {
                path: PathBuf::from(DEFAULT_CONFIG_PATH),
                explicit: false,
            },
        }
    }
}

impl Config {
    pub fn load(source: &ConfigSource) -> Result<Self, ConfigError> {
        match fs::read_to_string(&source.path) {
            Ok(text) => Self::parse(&source.path, &text),
            Err(err) if err.kind() == io::ErrorKind::NotFound && !source.explicit => {
                tracing::debug!(path = %source.path.display(), "no config file; using defaults");
                Ok(Self::default())
            }
            Err(source_err) => Err(ConfigError::Read {
                path: source.path.clone(),
                source: source_err,
            }),
        }
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    pub fn caller(&self) -> &str {
        self.caller.as_deref().unwrap_or(DEFAULT_CALLER)
    }

    /// Build the submission client; `wal_override` replaces `submission.wal_path`.
    pub fn submission_client(
        &self,
        wal_override: Option<PathBuf>,
    ) -> Result<SubmissionClient, ConfigError> {
        match self.submission.transport {
            TransportKind::Rpc => match self.submission.endpoint.as_deref() {
                Some(endpoint) if !endpoint.trim().is_empty() => {
                    Ok(SubmissionClient::rpc(endpoint))
                }
                _ => Err(ConfigError::MissingEndpoint),
            },
            TransportKind::InProcess => {
                let executor = wal_override
                    .or_else(|| self.submission.wal_path.clone())
                    .map(|path| Arc::new(LocalWalExecutor::new(path)) as Arc<dyn PlanExecutor>);
                Ok(SubmissionClient::in_process(executor))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorchestra_transport::Transport;

    #[test]
    fn parses_full_file() {
        let config = Config::parse(
            Path::new("lorchestra.toml"),
            r#"
caller = "nightly"

[plan]
method = "wal.append"

[submission]
transport = "in_process"
wal_path = ".lorchestra/wal.jsonl"
"#,
        )
        .expect("valid config");
        assert_eq!(config.caller(), "nightly");
        assert_eq!(config.plan.method.as_deref(), Some("wal.append"));
        assert_eq!(
            config.submission.wal_path.as_deref(),
            Some(Path::new(".lorchestra/wal.jsonl"))
        );
        let client = config.submission_client(None).expect("client");
        assert!(client.engine_installed());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::parse(Path::new("x.toml"), "").expect("valid");
        assert_eq!(config, Config::default());
        assert_eq!(config.caller(), DEFAULT_CALLER);
        assert!(!config.submission_client(None).expect("client").engine_installed());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::parse(Path::new("x.toml"), "[submission]\nretries = 3\n")
            .expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("retries"));
    }

    #[test]
    fn rpc_requires_endpoint() {
        let config = Config::parse(Path::new("x.toml"), "[submission]\ntransport = \"rpc\"\n")
            .expect("valid");
        assert!(matches!(
            config.submission_client(None),
            Err(ConfigError::MissingEndpoint)
        ));

        let config = Config::parse(
            Path::new("x.toml"),
            "[submission]\ntransport = \"rpc\"\nendpoint = \"https://engine\"\n",
        )
        .expect("valid");
        let client = config.submission_client(None).expect("client");
        assert_eq!(
            client.transport(),
            &Transport::Rpc {
                endpoint: "https://engine".to_string()
            }
        );
    }

    #[test]
    fn source_resolution_order() {
        let flag = ConfigSource::resolve(Some("a.toml"), Some("b.toml".to_string()));
        assert_eq!(flag.path, PathBuf::from("a.toml"));
        assert!(flag.explicit);

        let env = ConfigSource::resolve(None, Some("b.toml".to_string()));
        assert_eq!(env.path, PathBuf::from("b.toml"));
        assert!(env.explicit);

        let default = ConfigSource::resolve(None, None);
        assert_eq!(default.path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!default.explicit);
    }

    #[test]
    fn missing_default_file_is_fine_but_explicit_is_not() {
        let missing = std::env::temp_dir().join("lorchestra-config-does-not-exist.toml");
        let implicit = ConfigSource {
            path: missing.clone(),
            explicit: false,
        };
        assert_eq!(Config::load(&implicit).expect("defaults"), Config::default());

        let explicit = ConfigSource {
            path: missing,
            explicit: true,
        };
        assert!(matches!(
            Config::load(&explicit),
            Err(ConfigError::Read { .. })
        ));
    }
}
