//! # Solder Framework
//!
//! Declarative handler registration for entity-service hosts.
//!
//! This layer provides:
//! - `HandlerSet` trait and `ClassBuilder` for describing hook methods
//! - Metadata registry keeping per-class descriptors
//! - Dispatcher wiring descriptors into a live host service, atomically
//! - Parameter bindings resolved per invocation
//! - Validation predicates and middleware pipelines composed at
//!   registration time
//! - Constant-binding injector for handler dependencies
//!
//! The framework layer is built on top of the core types but adds the
//! authoring surface business code actually touches.

pub mod builder;
pub mod context;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod inject;
pub mod middleware;
pub mod params;
mod pipeline;
pub mod registry;
pub mod validate;

pub use builder::{ClassBuilder, MethodBuilder};
pub use context::{AfterCx, BeforeCx, FromInvocation, Invocation, OnCx};
pub use descriptor::HandlerDescriptor;
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use handler::{ErasedCallback, HandlerClass, HandlerSet, InstanceRef, IntoOutcome};
pub use inject::Injector;
pub use middleware::{Middleware, MiddlewareFn, PipelineNext, middleware_fn};
pub use params::{ParamBinding, ParamValue, Params};
pub use registry::{ClassBinding, HandlerRegistry};
pub use validate::{Predicate, ValidationRule};
