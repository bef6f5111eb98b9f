//! Handler classes and their erased invocation form.
//!
//! A handler class is a plain struct implementing [`HandlerSet`]: it
//! records its hooks in [`describe`] and wires its own dependencies in
//! [`build`]. [`HandlerClass::of`] produces the erased static reference the
//! dispatcher consumes, so registration never needs the concrete type.
//!
//! Callback return values are shaped through [`IntoOutcome`], mirroring
//! the host's hook result channel: units record nothing, values replace
//! the result, results propagate their error verbatim.
//!
//! [`describe`]: HandlerSet::describe
//! [`build`]: HandlerSet::build
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use solder_framework::{BeforeCx, ClassBuilder, HandlerSet, Injector};
//! use solder_core::{ConfigurationError, CrudEvent};
//!
//! struct ReviewHandler;
//!
//! impl HandlerSet for ReviewHandler {
//!     fn describe(builder: &mut ClassBuilder<Self>) {
//!         builder.entity(reviews());
//!         builder.before(CrudEvent::Create).handle(Self::before_create);
//!     }
//!
//!     fn build(_injector: &Injector) -> Result<Self, ConfigurationError> {
//!         Ok(ReviewHandler)
//!     }
//! }
//!
//! impl ReviewHandler {
//!     async fn before_create(self: Arc<Self>, cx: BeforeCx) {
//!         cx.request.notify("about to create");
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use solder_core::{ConfigurationError, HookError, HookResult};

use crate::builder::ClassBuilder;
use crate::context::Invocation;
use crate::error::DispatchError;
use crate::inject::Injector;
use crate::registry::HandlerRegistry;

/// Type-erased handler instance shared across invocations.
pub type InstanceRef = Arc<dyn Any + Send + Sync>;

/// Type-erased callback stored on a descriptor and composed into the
/// pipeline.
pub type ErasedCallback =
    Arc<dyn Fn(InstanceRef, Invocation) -> BoxFuture<'static, HookResult> + Send + Sync>;

// ============================================================================
// Handler Classes
// ============================================================================

/// A struct whose methods handle entity-service events.
pub trait HandlerSet: Send + Sync + Sized + 'static {
    /// Records the class's binding and hooks. Runs once per process, on
    /// first access of the class's metadata.
    fn describe(builder: &mut ClassBuilder<Self>);

    /// Builds an instance, pulling dependencies from the injector.
    fn build(injector: &Injector) -> Result<Self, ConfigurationError>;

    /// Short class name used in logs and errors.
    fn class_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Erased static reference to a handler class.
///
/// Copyable descriptor of how to record and instantiate one class; the
/// dispatcher works exclusively through these.
#[derive(Clone, Copy)]
pub struct HandlerClass {
    name: &'static str,
    key: fn() -> TypeId,
    record: fn(&HandlerRegistry),
    build: fn(&Injector) -> Result<InstanceRef, ConfigurationError>,
}

impl HandlerClass {
    /// The erased reference for `H`.
    pub fn of<H: HandlerSet>() -> Self {
        HandlerClass {
            name: H::class_name(),
            key: TypeId::of::<H>,
            record: record_class::<H>,
            build: build_instance::<H>,
        }
    }

    /// Short class name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registry key of the class.
    pub fn key(&self) -> TypeId {
        (self.key)()
    }

    pub(crate) fn record(&self, registry: &HandlerRegistry) {
        (self.record)(registry);
    }

    pub(crate) fn build(&self, injector: &Injector) -> Result<InstanceRef, ConfigurationError> {
        (self.build)(injector)
    }
}

impl fmt::Debug for HandlerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerClass")
            .field("name", &self.name)
            .finish()
    }
}

fn record_class<H: HandlerSet>(registry: &HandlerRegistry) {
    registry.record_class::<H>();
}

fn build_instance<H: HandlerSet>(injector: &Injector) -> Result<InstanceRef, ConfigurationError> {
    H::build(injector).map(|handler| Arc::new(handler) as InstanceRef)
}

/// Recovers the concrete handler type from an erased instance.
pub(crate) fn downcast_instance<H: HandlerSet>(instance: InstanceRef) -> Result<Arc<H>, HookError> {
    instance.downcast::<H>().map_err(|_| {
        DispatchError::InstanceMismatch {
            class: H::class_name().to_string(),
        }
        .into()
    })
}

// ============================================================================
// Callback Outcomes
// ============================================================================

/// Conversion of callback return values into the hook result channel.
pub trait IntoOutcome {
    /// Shapes the value into a [`HookResult`].
    fn into_outcome(self) -> HookResult;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> HookResult {
        Ok(None)
    }
}

impl IntoOutcome for Value {
    fn into_outcome(self) -> HookResult {
        Ok(Some(self))
    }
}

impl IntoOutcome for Option<Value> {
    fn into_outcome(self) -> HookResult {
        Ok(self)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<HookError>,
{
    fn into_outcome(self) -> HookResult {
        match self {
            Ok(value) => value.into_outcome(),
            Err(err) => Err(err.into()),
        }
    }
}
