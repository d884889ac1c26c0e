//! Lazily built registry plus the dispatch entry point.
//!
//! Lifecycle: `new(init)` → first use builds once → `registry()` / `dispatch()`
//! read → `register()` mutates → `reset()` forces a rebuild on next use.
//! The registry lock is released before a callable runs, so callables may
//! themselves dispatch or register.

use crate::callable::{Callable, Params};
use crate::registry::{self, CallableRegistry};
use lorchestra_core::{CallableResult, LorchestraError};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

type RegistryInit = dyn Fn() -> Result<CallableRegistry, LorchestraError> + Send + Sync;

pub struct Dispatcher {
    init: Box<RegistryInit>,
    registry: RwLock<Option<CallableRegistry>>,
}

impl Dispatcher {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Result<CallableRegistry, LorchestraError> + Send + Sync + 'static,
    {
        Self {
            init: Box::new(init),
            registry: RwLock::new(None),
        }
    }

    /// Dispatcher over the standard registry (stubbed externals, internals, aliases).
    pub fn standard() -> Self {
        Self::new(CallableRegistry::standard)
    }

    /// Dispatcher over an already-built registry; `reset` restores this copy.
    pub fn with_registry(registry: CallableRegistry) -> Self {
        Self::new(move || Ok(registry.clone()))
    }

    /// Build the registry now instead of on first dispatch.
    pub fn warm(&self) -> Result<(), LorchestraError> {
        self.with_built(|_| Ok(()))
    }

    /// Run `f` against the built registry.
    pub fn with_registry_ref<T>(
        &self,
        f: impl FnOnce(&CallableRegistry) -> T,
    ) -> Result<T, LorchestraError> {
        self.with_built(|registry| Ok(f(registry)))
    }

    /// Add or replace a callable; the next dispatch sees it.
    pub fn register(
        &self,
        name: impl Into<String>,
        callable: impl Callable + 'static,
    ) -> Result<(), LorchestraError> {
        let mut guard = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let registry = match guard.take() {
            Some(registry) => registry,
            None => (self.init)()?,
        };
        guard
            .insert(registry)
            .register_shared(name.into(), Arc::new(callable));
        Ok(())
    }

    /// Drop the cached registry; the next use rebuilds it from `init`.
    pub fn reset(&self) {
        let mut guard = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    /// Invoke `name` with `params`. Callable errors come back verbatim.
    pub fn dispatch(&self, name: &str, params: &Params) -> Result<CallableResult, LorchestraError> {
        let callable = self.with_built(|registry| registry.resolve(name))?;
        registry::invoke(name, &callable, params)
    }

    fn with_built<T>(
        &self,
        f: impl FnOnce(&CallableRegistry) -> Result<T, LorchestraError>,
    ) -> Result<T, LorchestraError> {
        {
            let guard = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(registry) = guard.as_ref() {
                return f(registry);
            }
        }

        // Re-checked under the write lock: concurrent first callers build once.
        let mut guard = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let registry = match guard.take() {
            Some(registry) => registry,
            None => (self.init)()?,
        };
        f(guard.insert(registry))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let built = self
            .registry
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("Dispatcher")
            .field("built", &built)
            .finish_non_exhaustive()
    }
}

static GLOBAL: OnceLock<Dispatcher> = OnceLock::new();

/// Process-wide dispatcher over the standard registry.
pub fn global() -> &'static Dispatcher {
    GLOBAL.get_or_init(Dispatcher::standard)
}

/// Dispatch through the process-wide registry.
pub fn dispatch(name: &str, params: &Params) -> Result<CallableResult, LorchestraError> {
    global().dispatch(name, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::CallableOutput;
    use serde_json::json;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn registry_is_built_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let dispatcher = Dispatcher::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            CallableRegistry::standard()
        });

        assert_eq!(builds.load(Ordering::SeqCst), 0);
        let params = serde_json::from_value(json!({"items": []})).expect("object");
        dispatcher.dispatch("passthrough", &params).expect("runs");
        dispatcher.dispatch("passthrough", &params).expect("runs");
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        dispatcher.reset();
        dispatcher.dispatch("passthrough", &params).expect("runs");
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_first_use_builds_once() {
        const THREADS: usize = 8;
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let dispatcher = Arc::new(Dispatcher::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            CallableRegistry::standard()
        }));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let params: Params =
                        serde_json::from_value(json!({"items": [{"id": "a"}]})).expect("object");
                    barrier.wait();
                    dispatcher
                        .dispatch("passthrough", &params)
                        .map(|result| result.items().map(|items| items.len()))
                })
            })
            .collect();

        for handle in handles {
            let items = handle
                .join()
                .expect("thread completes")
                .expect("dispatch succeeds");
            assert_eq!(items, Some(1));
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn register_on_unbuilt_dispatcher_is_kept() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let dispatcher = Dispatcher::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            CallableRegistry::standard()
        });
        dispatcher.warm().expect("builds");
        dispatcher.reset();

        dispatcher
            .register("late", |_: &Params| -> Result<CallableOutput, LorchestraError> {
                Ok(serde_json::from_value(json!({"items": []})).expect("object"))
            })
            .expect("register succeeds");
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert!(dispatcher.dispatch("late", &Params::new()).is_ok());
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reset_discards_overrides() {
        let dispatcher = Dispatcher::standard();
        dispatcher
            .register("only_in_test", |_: &Params| -> Result<CallableOutput, LorchestraError> {
                Ok(serde_json::from_value(json!({"items_ref": "x"})).expect("object"))
            })
            .expect("register succeeds");
        assert!(dispatcher.dispatch("only_in_test", &Params::new()).is_ok());

        dispatcher.reset();
        let err = dispatcher
            .dispatch("only_in_test", &Params::new())
            .expect_err("override gone after reset");
        assert!(matches!(err, LorchestraError::UnknownCallable { .. }));
    }

    #[test]
    fn build_failure_surfaces_on_dispatch() {
        let dispatcher = Dispatcher::new(|| {
            CallableRegistry::builder()
                .alias("dangling", "nowhere")
                .build()
        });
        let err = dispatcher
            .dispatch("dangling", &Params::new())
            .expect_err("build must fail");
        assert!(matches!(err, LorchestraError::RegistryConflict(_)));
    }

    #[test]
    fn callables_may_reenter_the_dispatcher() {
        let dispatcher = Arc::new(Dispatcher::standard());
        let inner = Arc::clone(&dispatcher);
        dispatcher
            .register("outer", move |params: &Params| -> Result<CallableOutput, LorchestraError> {
                let result = inner.dispatch("passthrough", params)?;
                match result.to_value() {
                    serde_json::Value::Object(map) => Ok(map),
                    _ => Err(LorchestraError::permanent("unexpected shape")),
                }
            })
            .expect("register succeeds");

        let params = serde_json::from_value(json!({"items": [{"id": "a"}]})).expect("object");
        let result = dispatcher.dispatch("outer", &params).expect("re-entrant dispatch");
        assert_eq!(result.items().map(<[_]>::len), Some(1));
    }
}
