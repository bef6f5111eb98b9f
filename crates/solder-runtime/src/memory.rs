//! In-memory host service for tests and demos.
//!
//! [`MemoryService`] implements the host registration surface with plain
//! locked tables and can then drive a registered hook chain the way the
//! live host would: before hooks in registration order, the on chain with
//! a terminal continuation standing in for the host's default
//! implementation, after hooks last.
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_runtime::MemoryService;
//! use solder_core::{CrudEvent, Request, ResultPayload};
//!
//! let service = MemoryService::new();
//! dispatcher.register_all(&service.handle())?;
//!
//! let request = Request::builder(CrudEvent::Read, "CatalogService.Books").build();
//! let outcome = service
//!     .dispatch(CrudEvent::Read, &books, request, ResultPayload::Rows(rows))
//!     .await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use solder_core::{
    AfterHook, BeforeHook, CrudEvent, EntityRef, HookResult, HostService, Next, OnHook, OnTarget,
    RequestRef, ResultPayload, ServiceHandle,
};

/// Owned lookup key for `on` registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OnKey {
    Event(CrudEvent, String),
    Action(String),
    BoundAction(String, String),
}

impl From<&OnTarget> for OnKey {
    fn from(target: &OnTarget) -> Self {
        match target {
            OnTarget::Event { event, entity } => Self::Event(*event, entity.name().to_string()),
            OnTarget::Action { name } => Self::Action(name.clone()),
            OnTarget::BoundAction { name, entity } => {
                Self::BoundAction(name.clone(), entity.name().to_string())
            }
        }
    }
}

/// In-process implementation of the host registration surface.
///
/// Hooks are stored under the same keys the host uses: before and after
/// hooks under the event/entity pair, on hooks under their resolved
/// target. Dispatch replays them in host order.
pub struct MemoryService {
    befores: Mutex<HashMap<(CrudEvent, String), Vec<BeforeHook>>>,
    afters: Mutex<HashMap<(CrudEvent, String), Vec<AfterHook>>>,
    ons: Mutex<HashMap<OnKey, Vec<OnHook>>>,
    emitted: Mutex<Vec<(String, Value)>>,
    continuation_calls: Arc<AtomicUsize>,
}

impl MemoryService {
    /// Creates an empty service.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            befores: Mutex::new(HashMap::new()),
            afters: Mutex::new(HashMap::new()),
            ons: Mutex::new(HashMap::new()),
            emitted: Mutex::new(Vec::new()),
            continuation_calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Erased handle for registration.
    pub fn handle(self: &Arc<Self>) -> ServiceHandle {
        Arc::clone(self) as ServiceHandle
    }

    /// Total number of hooks registered across all phases.
    pub fn registration_count(&self) -> usize {
        let befores: usize = self.befores.lock().values().map(Vec::len).sum();
        let afters: usize = self.afters.lock().values().map(Vec::len).sum();
        let ons: usize = self.ons.lock().values().map(Vec::len).sum();
        befores + afters + ons
    }

    /// How many times an on chain ran to completion, reaching the stand-in
    /// default implementation.
    pub fn continuation_calls(&self) -> usize {
        self.continuation_calls.load(Ordering::SeqCst)
    }

    /// Events emitted by handler code, in emission order.
    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().clone()
    }

    /// Drives the full hook chain for one request.
    ///
    /// `default` stands in for the result of the host's own
    /// implementation: the terminal continuation of the on chain resolves
    /// to it rendered as a JSON value, and after hooks receive it as their
    /// result payload. The value produced by the on chain is returned but
    /// is not fed into the after hooks; the live host does that, the
    /// harness keeps the payload shape the caller chose.
    ///
    /// A before-hook error stops the request; neither the on chain nor
    /// the after hooks run.
    pub async fn dispatch(
        &self,
        event: CrudEvent,
        entity: &EntityRef,
        request: RequestRef,
        default: ResultPayload,
    ) -> HookResult {
        let key = (event, entity.name().to_string());

        let befores: Vec<BeforeHook> = self.befores.lock().get(&key).cloned().unwrap_or_default();
        for hook in befores {
            hook(Arc::clone(&request)).await?;
        }

        let ons: Vec<OnHook> = self
            .ons
            .lock()
            .get(&OnKey::Event(event, key.1.clone()))
            .cloned()
            .unwrap_or_default();
        let outcome = self
            .run_chain(ons, Arc::clone(&request), Some(payload_value(&default)))
            .await?;

        let afters: Vec<AfterHook> = self.afters.lock().get(&key).cloned().unwrap_or_default();
        for hook in afters {
            hook(default.clone(), Arc::clone(&request)).await?;
        }

        Ok(outcome)
    }

    /// Invokes the registered chain for an unbound action or function.
    ///
    /// The terminal continuation resolves to no value; an empty chain
    /// yields `Ok(None)`.
    pub async fn call_action(&self, name: &str, request: RequestRef) -> HookResult {
        let hooks: Vec<OnHook> = self
            .ons
            .lock()
            .get(&OnKey::Action(name.to_string()))
            .cloned()
            .unwrap_or_default();
        self.run_chain(hooks, request, None).await
    }

    /// Invokes the registered chain for an action bound to `entity`.
    pub async fn call_bound_action(
        &self,
        name: &str,
        entity: &EntityRef,
        request: RequestRef,
    ) -> HookResult {
        let hooks: Vec<OnHook> = self
            .ons
            .lock()
            .get(&OnKey::BoundAction(name.to_string(), entity.name().to_string()))
            .cloned()
            .unwrap_or_default();
        self.run_chain(hooks, request, None).await
    }

    /// Composes `hooks` right to left over the terminal continuation and
    /// runs the resulting chain.
    async fn run_chain(
        &self,
        hooks: Vec<OnHook>,
        request: RequestRef,
        terminal_value: Option<Value>,
    ) -> HookResult {
        let counter = Arc::clone(&self.continuation_calls);
        let mut next = Next::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let value = terminal_value.clone();
            Box::pin(async move { Ok(value) })
        });

        for hook in hooks.into_iter().rev() {
            let request = Arc::clone(&request);
            let inner = next.clone();
            next = Next::new(move || {
                let hook = Arc::clone(&hook);
                let request = Arc::clone(&request);
                let inner = inner.clone();
                Box::pin(async move { hook(request, inner).await })
            });
        }

        next.proceed().await
    }
}

#[async_trait]
impl HostService for MemoryService {
    fn before(&self, event: CrudEvent, entity: &EntityRef, hook: BeforeHook) {
        debug!(%event, entity = entity.name(), "before hook registered");
        self.befores
            .lock()
            .entry((event, entity.name().to_string()))
            .or_default()
            .push(hook);
    }

    fn after(&self, event: CrudEvent, entity: &EntityRef, hook: AfterHook) {
        debug!(%event, entity = entity.name(), "after hook registered");
        self.afters
            .lock()
            .entry((event, entity.name().to_string()))
            .or_default()
            .push(hook);
    }

    fn on(&self, target: OnTarget, hook: OnHook) {
        debug!(?target, "on hook registered");
        self.ons
            .lock()
            .entry(OnKey::from(&target))
            .or_default()
            .push(hook);
    }

    async fn emit(&self, event: &str, payload: Value) -> HookResult {
        debug!(event, "event emitted");
        self.emitted.lock().push((event.to_string(), payload));
        Ok(None)
    }
}

impl fmt::Debug for MemoryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryService")
            .field("hooks", &self.registration_count())
            .field("continuation_calls", &self.continuation_calls())
            .finish_non_exhaustive()
    }
}

/// Renders a result payload the way the host serializes implementation
/// results onto the wire.
fn payload_value(payload: &ResultPayload) -> Value {
    match payload {
        ResultPayload::Count(n) => Value::from(*n),
        ResultPayload::Rows(rows) => Value::Array(rows.clone()),
        ResultPayload::Single(value) => value.clone(),
    }
}

// =============================================================================
// Tests
// =============================================================================
