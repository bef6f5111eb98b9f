//! # Solder Core
//!
//! Domain model and host-service boundary of the Solder dispatch layer.
//!
//! This crate defines the vocabulary shared between handler code, the
//! dispatch engine and the host framework:
//!
//! - **Events**: lifecycle event and hook-phase classification
//!   ([`CrudEvent`], [`HookKind`])
//! - **Entities**: entity descriptors with keys, bound actions and draft
//!   variants ([`EntityDef`], [`EntityRef`])
//! - **Requests**: the per-event view handed to handlers ([`Request`],
//!   [`QueryShape`], [`Principal`])
//! - **Results**: host result payloads and their normalized after-hook
//!   form ([`ResultPayload`], [`AfterResult`])
//! - **Host boundary**: the hook registration trait, erased hook aliases
//!   and the chain continuation ([`HostService`], [`Next`])
//! - **Errors**: registration-time and per-request failure families
//!   ([`ConfigurationError`], [`ValidationError`])
//!
//! ## Event Flow
//!
//! ```text
//! ┌──────────┐    ┌─────────────────┐    ┌──────────────────┐
//! │   Host   │───▶│  before hooks   │───▶│  on-hook chain   │
//! │ (service)│    └─────────────────┘    │  (Next-linked)   │
//! └──────────┘    ┌─────────────────┐    └──────────────────┘
//!       ▲─────────│   after hooks   │◀────────────┘
//!                 └─────────────────┘
//! ```

pub mod entity;
pub mod error;
pub mod event;
pub mod payload;
pub mod request;
pub mod service;

pub use entity::{EntityBuilder, EntityDef, EntityRef};
pub use error::{ConfigurationError, HookError, HookResult, ValidationError};
pub use event::{CrudEvent, HookKind};
pub use payload::{AfterResult, ResultPayload};
pub use request::{Notice, Principal, QueryClause, QueryShape, Request, RequestBuilder, RequestRef};
pub use service::{AfterHook, BeforeHook, HostService, Next, OnHook, OnTarget, ServiceHandle};
