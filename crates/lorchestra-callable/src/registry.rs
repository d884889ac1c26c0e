//! Callable registry: one flat namespace over external and internal callables.
//!
//! Build order is fixed and independent of registration order:
//! 1. declared external names (installed implementation or not-installed stub)
//! 2. extra installed externals that were not declared
//! 3. internal callables
//! 4. aliases
//!
//! Any name collision across these steps is a build failure. Missing
//! optional implementations never are.

use crate::callable::{Callable, NotInstalled, Params, Provenance, SharedCallable};
use crate::internal;
use lorchestra_core::{CallableResult, LorchestraError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// External callables lorchestra knows how to route to.
pub const EXTERNAL_CALLABLES: [&str; 5] =
    ["injest", "canonizer", "finalform", "projectionist", "workman"];

/// Standard short aliases for internal callables.
pub const STANDARD_ALIASES: [(&str, &str); 2] = [
    ("passthrough", internal::PASSTHROUGH),
    ("event_envelope", internal::EVENT_ENVELOPE),
];

#[derive(Clone)]
pub struct RegistryEntry {
    callable: SharedCallable,
    provenance: Provenance,
    installed: bool,
    target: Option<String>,
}

impl RegistryEntry {
    pub fn callable(&self) -> &SharedCallable {
        &self.callable
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// False only for not-installed stubs (and aliases pointing at them).
    pub fn installed(&self) -> bool {
        self.installed
    }

    /// Alias target, if this entry is an alias.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("provenance", &self.provenance)
            .field("installed", &self.installed)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Serializable listing row.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryRow {
    pub name: String,
    pub provenance: Provenance,
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Declarative registry construction.
#[derive(Default)]
pub struct RegistryBuilder {
    declared_external: Vec<String>,
    installed: BTreeMap<String, SharedCallable>,
    internal: Vec<(String, SharedCallable)>,
    aliases: Vec<(String, String)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with the standard external names, internal
    /// callables, and aliases. No external implementation is installed.
    pub fn standard() -> Self {
        let mut builder = Self::new();
        for name in EXTERNAL_CALLABLES {
            builder = builder.declare_external(name);
        }
        for (name, callable) in internal::internal_callables() {
            builder = builder.internal_shared(name, callable);
        }
        for (alias, target) in STANDARD_ALIASES {
            builder = builder.alias(alias, target);
        }
        builder
    }

    /// Declare an external name; it resolves to a stub unless installed.
    pub fn declare_external(mut self, name: impl Into<String>) -> Self {
        self.declared_external.push(name.into());
        self
    }

    /// Provide the implementation for an external callable.
    pub fn install(mut self, name: impl Into<String>, callable: impl Callable + 'static) -> Self {
        self.installed.insert(name.into(), Arc::new(callable));
        self
    }

    pub fn internal(self, name: impl Into<String>, callable: impl Callable + 'static) -> Self {
        self.internal_shared(name, Arc::new(callable))
    }

    fn internal_shared(mut self, name: impl Into<String>, callable: SharedCallable) -> Self {
        self.internal.push((name.into(), callable));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), target.into()));
        self
    }

    pub fn build(self) -> Result<CallableRegistry, LorchestraError> {
        let RegistryBuilder {
            declared_external,
            mut installed,
            internal,
            aliases,
        } = self;
        let mut entries: BTreeMap<String, RegistryEntry> = BTreeMap::new();

        for name in declared_external {
            if entries.contains_key(&name) {
                return Err(LorchestraError::RegistryConflict(format!(
                    "external callable `{name}` declared twice"
                )));
            }
            let entry = match installed.remove(&name) {
                Some(callable) => RegistryEntry {
                    callable,
                    provenance: Provenance::External,
                    installed: true,
                    target: None,
                },
                None => {
                    tracing::warn!(callable = %name, "external callable not installed; registering stub");
                    RegistryEntry {
                        callable: Arc::new(NotInstalled::new(name.clone())),
                        provenance: Provenance::External,
                        installed: false,
                        target: None,
                    }
                }
            };
            entries.insert(name, entry);
        }

        // BTreeMap iteration keeps this deterministic.
        for (name, callable) in installed {
            entries.insert(
                name,
                RegistryEntry {
                    callable,
                    provenance: Provenance::External,
                    installed: true,
                    target: None,
                },
            );
        }

        for (name, callable) in internal {
            if let Some(existing) = entries.get(&name) {
                return Err(LorchestraError::RegistryConflict(format!(
                    "internal callable `{name}` collides with {} entry",
                    existing.provenance.as_str()
                )));
            }
            entries.insert(
                name,
                RegistryEntry {
                    callable,
                    provenance: Provenance::Internal,
                    installed: true,
                    target: None,
                },
            );
        }

        let mut resolved_aliases = Vec::with_capacity(aliases.len());
        for (alias, target) in aliases {
            if entries.contains_key(&alias) {
                return Err(LorchestraError::RegistryConflict(format!(
                    "alias `{alias}` shadows an existing callable"
                )));
            }
            let Some(target_entry) = entries.get(&target) else {
                return Err(LorchestraError::RegistryConflict(format!(
                    "alias `{alias}` points at unknown callable `{target}`"
                )));
            };
            resolved_aliases.push((
                alias,
                RegistryEntry {
                    callable: Arc::clone(&target_entry.callable),
                    provenance: Provenance::Alias,
                    installed: target_entry.installed,
                    target: Some(target),
                },
            ));
        }
        for (alias, entry) in resolved_aliases {
            if entries.insert(alias.clone(), entry).is_some() {
                return Err(LorchestraError::RegistryConflict(format!(
                    "alias `{alias}` declared twice"
                )));
            }
        }

        tracing::debug!(entries = entries.len(), "callable registry built");
        Ok(CallableRegistry { entries })
    }
}

/// Built name → callable mapping.
#[derive(Debug, Clone, Default)]
pub struct CallableRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl CallableRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn standard() -> Result<Self, LorchestraError> {
        RegistryBuilder::standard().build()
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Add or replace an entry; visible to the next dispatch.
    pub fn register(&mut self, name: impl Into<String>, callable: impl Callable + 'static) {
        self.register_shared(name.into(), Arc::new(callable));
    }

    pub(crate) fn register_shared(&mut self, name: String, callable: SharedCallable) {
        tracing::debug!(callable = %name, "registering callable override");
        self.entries.insert(
            name,
            RegistryEntry {
                callable,
                provenance: Provenance::Override,
                installed: true,
                target: None,
            },
        );
    }

    pub fn rows(&self) -> Vec<RegistryRow> {
        self.entries
            .iter()
            .map(|(name, entry)| RegistryRow {
                name: name.clone(),
                provenance: entry.provenance,
                installed: entry.installed,
                target: entry.target.clone(),
            })
            .collect()
    }

    /// Look up and invoke `name`, wrapping its mapping into a result.
    ///
    /// Errors raised by the callable are returned exactly as raised.
    pub fn dispatch(&self, name: &str, params: &Params) -> Result<CallableResult, LorchestraError> {
        let callable = self.resolve(name)?;
        invoke(name, &callable, params)
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<SharedCallable, LorchestraError> {
        self.entries
            .get(name)
            .map(|entry| Arc::clone(&entry.callable))
            .ok_or_else(|| LorchestraError::UnknownCallable {
                name: name.to_string(),
            })
    }
}

pub(crate) fn invoke(
    name: &str,
    callable: &SharedCallable,
    params: &Params,
) -> Result<CallableResult, LorchestraError> {
    tracing::debug!(callable = name, "dispatching");
    let output = callable.invoke(params)?;
    CallableResult::from_map(output)
}
