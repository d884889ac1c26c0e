//! # lorchestra-callable
//!
//! Routes a callable name to an invocable unit and wraps what it returns into
//! the result contract.
//!
//! - `Callable`: the single `invoke(params)` capability
//! - `RegistryBuilder` / `CallableRegistry`: capability probe for external
//!   callables (not-installed stubs when absent), internal callables, aliases
//! - `Dispatcher`: lazily built, resettable registry; `dispatch()` uses a
//!   process-wide instance
//! - `heuristics`: message-based classification for callable authors
//!
//! Dispatch performs no error translation: whatever a callable returns as an
//! error is what the caller receives.

pub mod callable;
pub mod dispatch;
pub mod heuristics;
pub mod internal;
pub mod registry;

pub use callable::{Callable, CallableOutput, NotInstalled, Params, Provenance, SharedCallable};
pub use dispatch::{Dispatcher, dispatch, global};
pub use heuristics::{classify_message, classify_source, is_transient_message};
pub use registry::{
    CallableRegistry, EXTERNAL_CALLABLES, RegistryBuilder, RegistryEntry, RegistryRow,
    STANDARD_ALIASES,
};
