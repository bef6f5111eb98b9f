//! # Solder
//!
//! A declarative handler-registration layer for entity-oriented CRUD services.
//!
//! ## Overview
//!
//! Solder sits between plain business-logic structs and a host service
//! framework. Handler classes declare which entity they observe and which
//! events their methods handle; the dispatcher turns those declarations
//! into hook registrations on the host, wrapping each callback in its
//! validation and middleware pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌─────────────────────────────────┐
//! │ HandlerClass │────▶│ Dispatcher │────▶│ before / on / after hooks       │──▶ host service
//! │  (describe)  │     │            │     │ validation + middleware + shim  │
//! └──────────────┘     └────────────┘     └─────────────────────────────────┘
//! ```
//!
//! - **Handler classes**: Plain structs implementing `HandlerSet`; methods
//!   take typed contexts (`BeforeCx`, `OnCx`, `AfterCx`)
//! - **Dispatcher**: Resolves every declaration, then installs hooks on the
//!   host atomically
//! - **Pipeline**: Class and method middleware around field validations
//!   around the callback
//! - **Injector**: Start-up dependency wiring for handler construction
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use solder::prelude::*;
//!
//! fn books() -> EntityRef {
//!     EntityDef::builder("CatalogService.Books")
//!         .key("ID")
//!         .action("addRating")
//!         .build()
//! }
//!
//! struct BookHandler;
//!
//! impl HandlerSet for BookHandler {
//!     fn describe(builder: &mut ClassBuilder<Self>) {
//!         builder.entity(books());
//!         builder.before(CrudEvent::Create).handle(Self::check_stock);
//!         builder.bound_action("addRating").handle(Self::add_rating);
//!     }
//!
//!     fn build(_injector: &Injector) -> Result<Self, ConfigurationError> {
//!         Ok(BookHandler)
//!     }
//! }
//!
//! impl BookHandler {
//!     async fn check_stock(self: Arc<Self>, cx: BeforeCx) {
//!         cx.request.notify("stock checked");
//!     }
//!
//!     async fn add_rating(self: Arc<Self>, cx: OnCx) -> HookResult {
//!         cx.next.proceed().await
//!     }
//! }
//!
//! fn main() -> Result<(), ConfigurationError> {
//!     let service = MemoryService::new();
//!     let dispatcher = Dispatcher::new(vec![HandlerClass::of::<BookHandler>()]);
//!     dispatcher.register_all(&service.handle())
//! }
//! ```

pub use solder_core as core;
pub use solder_framework as framework;
pub use solder_runtime as runtime;

/// Prelude module for convenient imports.
///
/// This module provides all commonly used types for writing and
/// registering handler classes:
///
/// ```rust,ignore
/// use solder::prelude::*;
/// ```
pub mod prelude {
    // Registration - main entry point
    pub use solder_framework::{ClassBuilder, Dispatcher, HandlerClass, HandlerSet};

    // Handler contexts - for writing hook methods
    pub use solder_framework::{AfterCx, BeforeCx, Invocation, OnCx};

    // Dependency injection and middleware
    pub use solder_framework::{Injector, Middleware, PipelineNext, middleware_fn};

    // Field validation
    pub use solder_framework::{Predicate, ValidationRule};

    // Core model - events, entities, requests, results
    pub use solder_core::{
        AfterResult, ConfigurationError, CrudEvent, EntityDef, EntityRef, HookResult, Next,
        Request, RequestRef, ResultPayload,
    };

    // Host surface
    pub use solder_core::{HostService, ServiceHandle};

    // Runtime - configuration and the in-memory harness
    pub use solder_runtime::{MemoryService, load_config};
}
