//! Solder Runtime - Configuration, logging and harness support for Solder.
//!
//! This crate provides:
//! - Layered configuration loading (`SolderConfig`, `ConfigLoader`)
//! - Logging setup driven by configuration (`LoggingBuilder`)
//! - An in-memory host service for tests and demos (`MemoryService`)
//!
//! # Configuration-Driven Startup
//!
//! ```ignore
//! use solder_runtime::{load_config, logging};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     // build handler classes, register them against the host...
//!     Ok(())
//! }
//! ```
//!
//! # Driving Handlers Without a Host
//!
//! [`MemoryService`] implements the host registration surface in process,
//! so a registered dispatcher can be exercised end to end:
//!
//! ```ignore
//! use solder_framework::{Dispatcher, HandlerClass};
//! use solder_runtime::MemoryService;
//!
//! let service = MemoryService::new();
//! let dispatcher = Dispatcher::new(vec![HandlerClass::of::<BookHandler>()]);
//! dispatcher.register_all(&service.handle())?;
//!
//! let outcome = service.dispatch(event, &books, request, default).await?;
//! ```

pub mod config;
pub mod logging;
pub mod memory;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LogFormat, LogLevel, LogOutput, LoggingConfig,
    SolderConfig, load_config, load_config_from_file,
};
pub use logging::{LoggingBuilder, SpanEvents};
pub use memory::MemoryService;

// Dependents log through the same tracing the runtime configures.
pub use tracing;
pub use tracing_subscriber;

/// One-line import for the tracing macros handler code typically wants.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
