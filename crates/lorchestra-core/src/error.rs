//! Error taxonomy shared by every lorchestra layer.
//!
//! Failures are either classified (`Transient`, `Permanent`, or one of the
//! configuration-level variants, which are permanent) or explicitly
//! `Unclassified`. Classification happens only inside callables and at the
//! submission boundary; everything in between returns errors verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boxed source for failures nobody has classified yet.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Retry classification carried by a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Retrying the same request unchanged is safe.
    Transient,
    /// Do not retry without changing the input.
    Permanent,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors crossing any lorchestra boundary.
#[derive(Debug, thiserror::Error)]
pub enum LorchestraError {
    /// Rate limiting, timeouts, temporary unavailability.
    #[error("transient failure: {message}")]
    Transient { message: String },

    /// Invalid input, schema mismatch, missing resource, authorization.
    #[error("permanent failure: {message}")]
    Permanent { message: String },

    /// Dispatch was asked for a name the registry does not know.
    #[error("callable not registered: {name}")]
    UnknownCallable { name: String },

    /// The name is declared but its implementation is not installed.
    #[error("callable not installed: {name} ({hint})")]
    NotInstalled { name: String, hint: String },

    /// A feature that exists in the wire contract but not in this version.
    #[error("not supported in this version: {feature}")]
    Unsupported { feature: String },

    /// A callable returned a mapping that violates the result contract.
    #[error("invalid callable result: {0}")]
    InvalidResult(String),

    /// Registry names or aliases collide.
    #[error("registry conflict: {0}")]
    RegistryConflict(String),

    /// Anything not yet classified; resolved at the submission boundary.
    #[error(transparent)]
    Unclassified(BoxError),
}

impl LorchestraError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    /// Wrap any error without classifying it.
    pub fn unclassified(source: impl Into<BoxError>) -> Self {
        Self::Unclassified(source.into())
    }

    /// The retry class, or `None` while still unclassified.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Transient { .. } => Some(ErrorClass::Transient),
            Self::Permanent { .. }
            | Self::UnknownCallable { .. }
            | Self::NotInstalled { .. }
            | Self::Unsupported { .. }
            | Self::InvalidResult(_)
            | Self::RegistryConflict(_) => Some(ErrorClass::Permanent),
            Self::Unclassified(_) => None,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.class().is_some()
    }

    /// Only transient failures are retry-safe; unclassified ones are not yet.
    pub fn is_retryable(&self) -> bool {
        self.class() == Some(ErrorClass::Transient)
    }
}
