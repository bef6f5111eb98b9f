//! The dependency injector.
//!
//! A flat, type-keyed store of constant bindings. Handler classes pull
//! their collaborators out of it in `HandlerSet::build`; the application
//! binds values before registration, and `register_all` installs the live
//! service handle as a singleton when no binding for it exists yet.
//!
//! Values are cloned out on every `get`, so bindings are shared handles
//! (`Arc`-backed types) in practice.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use solder_core::{ConfigurationError, ServiceHandle};

/// Type-keyed constant-binding container.
pub struct Injector {
    values: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Injector {
    /// An empty injector.
    pub fn new() -> Self {
        Injector {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Binds a value under its type; replaces any previous binding of the
    /// same type.
    pub fn bind<T: Clone + Send + Sync + 'static>(&self, value: T) {
        debug!(binding = type_name::<T>(), "Injector binding installed");
        self.values.write().insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Whether a binding of type `T` exists.
    pub fn is_bound<T: 'static>(&self) -> bool {
        self.values.read().contains_key(&TypeId::of::<T>())
    }

    /// A clone of the binding of type `T`, if present.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.values
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// A clone of the binding of type `T`, or a configuration error naming
    /// the missing type.
    pub fn require<T: Clone + Send + Sync + 'static>(&self) -> Result<T, ConfigurationError> {
        self.get::<T>()
            .ok_or_else(|| ConfigurationError::MissingDependency {
                dependency: type_name::<T>().to_string(),
            })
    }

    /// The live host-service handle installed by registration.
    pub fn service(&self) -> Result<ServiceHandle, ConfigurationError> {
        self.require::<ServiceHandle>()
    }

    /// Installs the service handle unless the application bound one
    /// already.
    pub(crate) fn bind_service(&self, service: &ServiceHandle) {
        if !self.is_bound::<ServiceHandle>() {
            self.bind(service.clone());
        }
    }
}

impl Default for Injector {
    fn default() -> Self {
        Injector::new()
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("bindings", &self.values.read().len())
            .finish()
    }
}
