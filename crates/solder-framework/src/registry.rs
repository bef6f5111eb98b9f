//! The process-wide handler metadata registry.
//!
//! Classes record themselves on first access: [`record_class`] runs the
//! class's `describe` once and stores the resulting [`ClassRecord`] under
//! the class's `TypeId`. Records are written once and never mutated or
//! removed; lookups after the dispatcher has consumed them observe the
//! same data for the rest of the process lifetime. There is no cross-class
//! ordering guarantee, only per-class descriptor order.
//!
//! [`record_class`]: HandlerRegistry::record_class

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use solder_core::{ConfigurationError, EntityRef};

use crate::builder::ClassBuilder;
use crate::descriptor::HandlerDescriptor;
use crate::handler::HandlerSet;
use crate::middleware::Middleware;

/// How a handler class relates to entities.
#[derive(Debug, Clone)]
pub enum ClassBinding {
    /// The class handles events of one entity.
    Entity(EntityRef),
    /// The class handles unbound (service-level) actions only.
    Unbound,
}

/// Everything recorded for one handler class.
pub(crate) struct ClassRecord {
    pub name: &'static str,
    pub binding: Option<ClassBinding>,
    pub middlewares: Vec<Arc<dyn Middleware>>,
    pub descriptors: Vec<Arc<HandlerDescriptor>>,
    pub errors: Vec<ConfigurationError>,
}

/// Class-keyed store of handler metadata.
pub struct HandlerRegistry {
    classes: RwLock<HashMap<TypeId, ClassRecord>>,
}

impl HandlerRegistry {
    /// An empty registry. Production code uses [`HandlerRegistry::global`];
    /// fresh instances exist for tests.
    pub fn new() -> Self {
        HandlerRegistry {
            classes: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static HandlerRegistry {
        static GLOBAL: OnceLock<HandlerRegistry> = OnceLock::new();
        GLOBAL.get_or_init(HandlerRegistry::new)
    }

    /// Records `H`'s metadata if it has not been recorded yet.
    ///
    /// Runs `H::describe` outside the registry lock; when two threads race
    /// on the same class the first written record wins and the other
    /// result is dropped.
    pub fn record_class<H: HandlerSet>(&self) {
        let key = TypeId::of::<H>();
        if self.classes.read().contains_key(&key) {
            return;
        }
        let mut builder = ClassBuilder::<H>::new();
        H::describe(&mut builder);
        let record = builder.into_record();
        debug!(
            class = record.name,
            descriptors = record.descriptors.len(),
            "Recorded handler class metadata"
        );
        self.classes.write().entry(key).or_insert(record);
    }

    /// Whether the class has been recorded.
    pub fn is_recorded(&self, key: TypeId) -> bool {
        self.classes.read().contains_key(&key)
    }

    /// Number of recorded classes.
    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }

    /// The ordered descriptors of a class; empty if the class never
    /// recorded any (not an error).
    pub fn descriptors(&self, key: TypeId) -> Vec<Arc<HandlerDescriptor>> {
        self.classes
            .read()
            .get(&key)
            .map(|record| record.descriptors.clone())
            .unwrap_or_default()
    }

    /// The class's entity binding.
    ///
    /// Fails when the class never declared an owning entity or unbound
    /// actions; unbound-action classes are a recognized distinct kind, not
    /// an error.
    pub fn binding(&self, key: TypeId) -> Result<ClassBinding, ConfigurationError> {
        let classes = self.classes.read();
        let record = classes.get(&key);
        match record.and_then(|r| r.binding.clone()) {
            Some(binding) => Ok(binding),
            None => Err(ConfigurationError::MissingBinding {
                class: record.map(|r| r.name).unwrap_or("unrecorded class").to_string(),
            }),
        }
    }

    /// Class-level middlewares in declared order.
    pub(crate) fn middlewares(&self, key: TypeId) -> Vec<Arc<dyn Middleware>> {
        self.classes
            .read()
            .get(&key)
            .map(|record| record.middlewares.clone())
            .unwrap_or_default()
    }

    /// Configuration errors collected while the class recorded itself.
    pub(crate) fn class_errors(&self, key: TypeId) -> Vec<ConfigurationError> {
        self.classes
            .read()
            .get(&key)
            .map(|record| record.errors.clone())
            .unwrap_or_default()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        HandlerRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AfterCx, BeforeCx};
    use crate::inject::Injector;
    use solder_core::{CrudEvent, EntityDef, HookKind};
    use std::sync::Arc;

    fn books() -> EntityRef {
        EntityDef::builder("CatalogService.Books")
            .key("ID")
            .with_drafts()
            .build()
    }

    struct BookHandler;

    impl HandlerSet for BookHandler {
        fn describe(builder: &mut ClassBuilder<Self>) {
            builder.entity(books());
            builder.before(CrudEvent::Create).handle(Self::before_create);
            builder
                .after(CrudEvent::Read)
                .draft()
                .handle(Self::after_read_draft);
            builder.on(CrudEvent::Update).handle_with(vec![], Self::on_update);
        }

        fn build(_injector: &Injector) -> Result<Self, ConfigurationError> {
            Ok(BookHandler)
        }
    }

    impl BookHandler {
        async fn before_create(self: Arc<Self>, _cx: BeforeCx) {}
        async fn after_read_draft(self: Arc<Self>, _cx: AfterCx) {}
        async fn on_update(self: Arc<Self>, _params: crate::params::Params) {}
    }

    #[test]
    fn test_descriptors_preserve_declaration_order_and_fields() {
        let registry = HandlerRegistry::new();
        registry.record_class::<BookHandler>();

        let descriptors = registry.descriptors(TypeId::of::<BookHandler>());
        assert_eq!(descriptors.len(), 3);

        assert_eq!(descriptors[0].hook_kind(), HookKind::Before);
        assert_eq!(descriptors[0].event(), CrudEvent::Create);
        assert!(!descriptors[0].is_draft());

        assert_eq!(descriptors[1].hook_kind(), HookKind::After);
        assert_eq!(descriptors[1].event(), CrudEvent::Read);
        assert!(descriptors[1].is_draft());

        assert_eq!(descriptors[2].hook_kind(), HookKind::On);
        assert_eq!(descriptors[2].event(), CrudEvent::Update);
        assert!(!descriptors[2].is_draft());
    }

    #[test]
    fn test_draft_flag_is_per_descriptor() {
        let registry = HandlerRegistry::new();
        registry.record_class::<BookHandler>();

        let descriptors = registry.descriptors(TypeId::of::<BookHandler>());
        let draft_flags: Vec<bool> = descriptors.iter().map(|d| d.is_draft()).collect();
        assert_eq!(draft_flags, [false, true, false]);
    }

    #[test]
    fn test_record_class_is_idempotent() {
        let registry = HandlerRegistry::new();
        registry.record_class::<BookHandler>();
        registry.record_class::<BookHandler>();
        assert_eq!(registry.class_count(), 1);
        assert_eq!(registry.descriptors(TypeId::of::<BookHandler>()).len(), 3);
    }

    #[test]
    fn test_unrecorded_class_yields_empty_descriptors() {
        struct Unseen;
        let registry = HandlerRegistry::new();
        assert!(registry.descriptors(TypeId::of::<Unseen>()).is_empty());
        assert!(!registry.is_recorded(TypeId::of::<Unseen>()));
    }

    #[test]
    fn test_binding_lookup_fails_without_declaration() {
        struct Bindingless;
        impl HandlerSet for Bindingless {
            fn describe(_builder: &mut ClassBuilder<Self>) {}
            fn build(_injector: &Injector) -> Result<Self, ConfigurationError> {
                Ok(Bindingless)
            }
        }

        let registry = HandlerRegistry::new();
        registry.record_class::<Bindingless>();
        let err = registry.binding(TypeId::of::<Bindingless>()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingBinding { class } if class == "Bindingless"));

        let bound = registry.binding(TypeId::of::<BookHandler>());
        assert!(bound.is_err());
        registry.record_class::<BookHandler>();
        assert!(matches!(
            registry.binding(TypeId::of::<BookHandler>()),
            Ok(ClassBinding::Entity(_))
        ));
    }
}
