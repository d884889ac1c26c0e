//! The single capability every callable provides.

use lorchestra_core::LorchestraError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Parameters handed to a callable.
pub type Params = Map<String, Value>;

/// Raw mapping a callable returns; wrapped into `CallableResult` by dispatch.
pub type CallableOutput = Map<String, Value>;

/// An invocable unit: real implementation, not-installed stub, or test double.
pub trait Callable: Send + Sync {
    fn invoke(&self, params: &Params) -> Result<CallableOutput, LorchestraError>;
}

impl<F> Callable for F
where
    F: Fn(&Params) -> Result<CallableOutput, LorchestraError> + Send + Sync,
{
    fn invoke(&self, params: &Params) -> Result<CallableOutput, LorchestraError> {
        self(params)
    }
}

pub type SharedCallable = Arc<dyn Callable>;

/// Placeholder for a declared external callable whose implementation is absent.
#[derive(Debug, Clone)]
pub struct NotInstalled {
    name: String,
}

impl NotInstalled {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Callable for NotInstalled {
    fn invoke(&self, _params: &Params) -> Result<CallableOutput, LorchestraError> {
        Err(LorchestraError::NotInstalled {
            name: self.name.clone(),
            hint: format!(
                "provide an implementation for `{}` when building the registry",
                self.name
            ),
        })
    }
}

/// Where a registry entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Independently versioned module exposing one entrypoint.
    External,
    /// Bundled with lorchestra.
    Internal,
    /// Short name resolved to another entry at build time.
    Alias,
    /// Registered after the build, typically a test double.
    Override,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
            Self::Alias => "alias",
            Self::Override => "override",
        }
    }
}
