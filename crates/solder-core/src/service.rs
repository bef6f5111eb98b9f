//! The host-service boundary.
//!
//! [`HostService`] is the surface the dispatcher consumes: three hook
//! registration points mirroring the host framework's `before`/`after`/`on`
//! phases, plus service-side event emission for handler code. Hooks are
//! type-erased `Arc` closures returning boxed futures so one registration
//! path serves every handler shape.
//!
//! [`Next`] is the continuation handed to `on` hooks: invoking it runs the
//! remainder of the registered chain and, at the end of the chain, the
//! host's default implementation. An `on` callback that never invokes its
//! continuation ends the chain with its own result.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::entity::EntityRef;
use crate::error::HookResult;
use crate::event::CrudEvent;
use crate::payload::ResultPayload;
use crate::request::RequestRef;

/// Shared handle to the live host service.
pub type ServiceHandle = Arc<dyn HostService>;

/// Erased before-phase hook: receives only the request.
pub type BeforeHook = Arc<dyn Fn(RequestRef) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Erased after-phase hook: receives the implementation's result payload
/// and the request.
pub type AfterHook =
    Arc<dyn Fn(ResultPayload, RequestRef) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Erased on-phase hook: receives the request and the continuation for the
/// rest of the chain.
pub type OnHook = Arc<dyn Fn(RequestRef, Next) -> BoxFuture<'static, HookResult> + Send + Sync>;

// ============================================================================
// On-Hook Targets
// ============================================================================

/// Registration key for an `on` hook.
///
/// CRUD and draft-transition hooks key on the event/entity pair; unbound
/// actions key on the action name alone; bound actions key on the name and
/// the owning entity.
#[derive(Debug, Clone)]
pub enum OnTarget {
    /// A CRUD or draft-transition event on an entity.
    Event {
        /// The subscribed event.
        event: CrudEvent,
        /// The targeted entity (the draft variant for draft hooks).
        entity: EntityRef,
    },
    /// A service-level action or function.
    Action {
        /// The action name.
        name: String,
    },
    /// An action or function bound to an entity.
    BoundAction {
        /// The action name.
        name: String,
        /// The owning entity.
        entity: EntityRef,
    },
}

// ============================================================================
// Host Service
// ============================================================================

/// Hook registration surface of the host framework.
///
/// Implementations must tolerate concurrent hook invocation after
/// registration has completed; registration itself happens once at
/// start-up from a single thread.
#[async_trait]
pub trait HostService: Send + Sync {
    /// Registers a hook to run before the implementation of `event` on
    /// `entity`.
    fn before(&self, event: CrudEvent, entity: &EntityRef, hook: BeforeHook);

    /// Registers a hook to run after the implementation of `event` on
    /// `entity`.
    fn after(&self, event: CrudEvent, entity: &EntityRef, hook: AfterHook);

    /// Registers a hook on the implementation chain for `target`.
    fn on(&self, target: OnTarget, hook: OnHook);

    /// Emits a service-level event with the given payload.
    async fn emit(&self, event: &str, payload: Value) -> HookResult;
}

// ============================================================================
// Continuation
// ============================================================================

/// Continuation for the remainder of an `on`-hook chain.
#[derive(Clone)]
pub struct Next {
    inner: Arc<dyn Fn() -> BoxFuture<'static, HookResult> + Send + Sync>,
}

impl Next {
    /// Wraps a closure producing the rest of the chain.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, HookResult> + Send + Sync + 'static,
    {
        Next { inner: Arc::new(f) }
    }

    /// Runs the remainder of the chain and returns its result.
    ///
    /// Cancellation and timeouts imposed by the host pass through
    /// unchanged; the dispatch layer adds no deadline of its own.
    pub async fn proceed(&self) -> HookResult {
        (self.inner)().await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_next_runs_wrapped_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let next = Next::new(move || {
            let calls = Arc::clone(&calls_clone);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(Value::from(42)))
            })
        });

        let first = next.proceed().await.unwrap();
        let second = next.proceed().await.unwrap();
        assert_eq!(first, Some(Value::from(42)));
        assert_eq!(second, Some(Value::from(42)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
