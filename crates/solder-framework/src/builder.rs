//! The class builder: the declarative recording surface.
//!
//! `HandlerSet::describe` receives a [`ClassBuilder`] and records the
//! class binding plus one method per hook. Each method-opening call
//! (`before`, `after`, `on`, the action variants and the draft-transition
//! presets) returns a [`MethodBuilder`] that is configured fluently and
//! finalized by [`handle`] or [`handle_with`]. Builder misuse is collected
//! as configuration errors on the class record and surfaces atomically
//! when the dispatcher registers the class.
//!
//! [`handle`]: MethodBuilder::handle
//! [`handle_with`]: MethodBuilder::handle_with
//!
//! # Example
//!
//! ```rust,ignore
//! fn describe(builder: &mut ClassBuilder<Self>) {
//!     builder.entity(books());
//!     builder.middleware(audit_log());
//!
//!     builder.before(CrudEvent::Create).handle(Self::before_create);
//!     builder
//!         .after(CrudEvent::Read)
//!         .single_instance()
//!         .handle(Self::after_read);
//!     builder
//!         .bound_action("addRating")
//!         .handle(Self::on_add_rating);
//!     builder.on_new_draft().handle(Self::on_new_draft);
//! }
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use solder_core::{ConfigurationError, CrudEvent, HookKind};

use crate::context::{AfterCx, BeforeCx, FromInvocation, OnCx};
use crate::descriptor::HandlerDescriptor;
use crate::handler::{ErasedCallback, HandlerSet, IntoOutcome, downcast_instance};
use crate::middleware::Middleware;
use crate::params::{ParamBinding, Params};
use crate::registry::{ClassBinding, ClassRecord};
use crate::validate::{Predicate, ValidationRule};

// ============================================================================
// Hook Shapes
// ============================================================================

/// Compile-time description of one hook kind's authoring surface.
///
/// Implemented by the three shape markers ([`BeforeShape`], [`AfterShape`],
/// [`OnShape`]); ties a [`MethodBuilder`] to its hook kind, its typed
/// context and its default parameter sequence.
pub trait HookShape {
    /// The hook kind descriptors of this shape record.
    const KIND: HookKind;
    /// Typed context handed to `handle` callbacks.
    type Cx: FromInvocation + Send + 'static;
    /// Parameter specs backing the typed context.
    fn default_params() -> Vec<ParamBinding>;
}

/// Shape marker for `before` hooks.
pub struct BeforeShape;

impl HookShape for BeforeShape {
    const KIND: HookKind = HookKind::Before;
    type Cx = BeforeCx;

    fn default_params() -> Vec<ParamBinding> {
        vec![ParamBinding::Request, ParamBinding::SingleInstance]
    }
}

/// Shape marker for `after` hooks.
pub struct AfterShape;

impl HookShape for AfterShape {
    const KIND: HookKind = HookKind::After;
    type Cx = AfterCx;

    fn default_params() -> Vec<ParamBinding> {
        vec![
            ParamBinding::Result,
            ParamBinding::Request,
            ParamBinding::SingleInstance,
        ]
    }
}

/// Shape marker for `on` hooks.
pub struct OnShape;

impl HookShape for OnShape {
    const KIND: HookKind = HookKind::On;
    type Cx = OnCx;

    fn default_params() -> Vec<ParamBinding> {
        vec![
            ParamBinding::Request,
            ParamBinding::Continuation,
            ParamBinding::SingleInstance,
        ]
    }
}

// ============================================================================
// Class Builder
// ============================================================================

/// Records one handler class's binding, middlewares and hooks.
pub struct ClassBuilder<H: HandlerSet> {
    name: &'static str,
    binding: Option<ClassBinding>,
    middlewares: Vec<Arc<dyn Middleware>>,
    descriptors: Vec<Arc<HandlerDescriptor>>,
    errors: Vec<ConfigurationError>,
    _marker: PhantomData<fn(H)>,
}

impl<H: HandlerSet> ClassBuilder<H> {
    pub(crate) fn new() -> Self {
        ClassBuilder {
            name: H::class_name(),
            binding: None,
            middlewares: Vec::new(),
            descriptors: Vec::new(),
            errors: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Declares the entity this class handles.
    pub fn entity(&mut self, entity: solder_core::EntityRef) -> &mut Self {
        self.set_binding(ClassBinding::Entity(entity));
        self
    }

    /// Declares the class as handling unbound (service-level) actions
    /// only.
    pub fn unbound(&mut self) -> &mut Self {
        self.set_binding(ClassBinding::Unbound);
        self
    }

    /// Adds a class-level middleware; wraps every hook of the class,
    /// outermost in declared order.
    pub fn middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Opens a `before` hook for a CRUD event.
    pub fn before(&mut self, event: CrudEvent) -> MethodBuilder<'_, H, BeforeShape> {
        MethodBuilder::new(self, event, None, false)
    }

    /// Opens an `after` hook for a CRUD event.
    pub fn after(&mut self, event: CrudEvent) -> MethodBuilder<'_, H, AfterShape> {
        MethodBuilder::new(self, event, None, false)
    }

    /// Opens an `on` hook for a CRUD or draft-transition event.
    pub fn on(&mut self, event: CrudEvent) -> MethodBuilder<'_, H, OnShape> {
        MethodBuilder::new(self, event, None, false)
    }

    /// Opens an `on` hook for an unbound action.
    pub fn on_action(&mut self, name: impl Into<String>) -> MethodBuilder<'_, H, OnShape> {
        MethodBuilder::new(self, CrudEvent::Action, Some(name.into()), false)
    }

    /// Opens an `on` hook for an unbound function.
    pub fn on_function(&mut self, name: impl Into<String>) -> MethodBuilder<'_, H, OnShape> {
        MethodBuilder::new(self, CrudEvent::Function, Some(name.into()), false)
    }

    /// Opens an `on` hook for an action bound to the class's entity.
    pub fn bound_action(&mut self, name: impl Into<String>) -> MethodBuilder<'_, H, OnShape> {
        MethodBuilder::new(self, CrudEvent::BoundAction, Some(name.into()), false)
    }

    /// Opens an `on` hook for a function bound to the class's entity.
    pub fn bound_function(&mut self, name: impl Into<String>) -> MethodBuilder<'_, H, OnShape> {
        MethodBuilder::new(self, CrudEvent::BoundFunction, Some(name.into()), false)
    }

    /// Opens an `on` hook for draft creation; targets the draft variant.
    pub fn on_new_draft(&mut self) -> MethodBuilder<'_, H, OnShape> {
        MethodBuilder::new(self, CrudEvent::New, None, true)
    }

    /// Opens an `on` hook for opening an active record as a draft; fires
    /// on the active entity.
    pub fn on_edit_draft(&mut self) -> MethodBuilder<'_, H, OnShape> {
        MethodBuilder::new(self, CrudEvent::Edit, None, false)
    }

    /// Opens an `on` hook for draft activation; fires on the active
    /// entity.
    pub fn on_save_draft(&mut self) -> MethodBuilder<'_, H, OnShape> {
        MethodBuilder::new(self, CrudEvent::Save, None, false)
    }

    /// Opens an `on` hook for draft discards; targets the draft variant.
    pub fn on_cancel_draft(&mut self) -> MethodBuilder<'_, H, OnShape> {
        MethodBuilder::new(self, CrudEvent::Cancel, None, true)
    }

    pub(crate) fn into_record(self) -> ClassRecord {
        ClassRecord {
            name: self.name,
            binding: self.binding,
            middlewares: self.middlewares,
            descriptors: self.descriptors,
            errors: self.errors,
        }
    }

    fn set_binding(&mut self, binding: ClassBinding) {
        if self.binding.is_some() {
            self.errors.push(ConfigurationError::InvalidDescriptor {
                class: self.name.to_string(),
                detail: "class binding declared more than once".to_string(),
            });
        } else {
            self.binding = Some(binding);
        }
    }

    fn push_descriptor(&mut self, descriptor: HandlerDescriptor) {
        self.descriptors.push(Arc::new(descriptor));
    }
}

// ============================================================================
// Method Builder
// ============================================================================

/// Fluent recorder for one hook method.
pub struct MethodBuilder<'c, H: HandlerSet, S: HookShape> {
    class: &'c mut ClassBuilder<H>,
    event: CrudEvent,
    action: Option<String>,
    draft: bool,
    single_instance: bool,
    validations: Vec<ValidationRule>,
    middlewares: Vec<Arc<dyn Middleware>>,
    _shape: PhantomData<S>,
}

impl<'c, H: HandlerSet, S: HookShape> MethodBuilder<'c, H, S> {
    fn new(
        class: &'c mut ClassBuilder<H>,
        event: CrudEvent,
        action: Option<String>,
        draft: bool,
    ) -> Self {
        MethodBuilder {
            class,
            event,
            action,
            draft,
            single_instance: false,
            validations: Vec::new(),
            middlewares: Vec::new(),
            _shape: PhantomData,
        }
    }

    /// Targets the entity's draft variant.
    pub fn draft(mut self) -> Self {
        self.draft = true;
        self
    }

    /// Declares single-instance capability: the flag a callback observes
    /// is true only when this is set and the request addresses all entity
    /// keys.
    pub fn single_instance(mut self) -> Self {
        self.single_instance = true;
        self
    }

    /// Attaches a field validation; rules run in declared order before
    /// the callback.
    pub fn validate(mut self, predicate: Predicate, field: impl Into<String>) -> Self {
        self.validations.push(ValidationRule::new(predicate, field));
        self
    }

    /// Attaches a method-level middleware; wraps inside the class-level
    /// ones, in declared order.
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Finalizes the hook with a typed-context callback.
    pub fn handle<F, Fut, R>(self, callback: F)
    where
        F: Fn(Arc<H>, S::Cx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoOutcome + 'static,
    {
        let label = std::any::type_name::<F>();
        let callback = Arc::new(callback);
        let erased: ErasedCallback = Arc::new(move |instance, invocation| {
            let callback = Arc::clone(&callback);
            Box::pin(async move {
                let handler = downcast_instance::<H>(instance)?;
                let cx = S::Cx::from_invocation(&invocation)?;
                callback(handler, cx).await.into_outcome()
            })
        });
        self.record(S::default_params(), erased, label);
    }

    /// Finalizes the hook with a custom parameter sequence; the callback
    /// receives the resolved [`Params`] in declared order.
    pub fn handle_with<F, Fut, R>(self, params: Vec<ParamBinding>, callback: F)
    where
        F: Fn(Arc<H>, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoOutcome + 'static,
    {
        let label = std::any::type_name::<F>();
        let callback = Arc::new(callback);
        let erased: ErasedCallback = Arc::new(move |instance, invocation| {
            let callback = Arc::clone(&callback);
            Box::pin(async move {
                let handler = downcast_instance::<H>(instance)?;
                callback(handler, invocation.params).await.into_outcome()
            })
        });
        self.record(params, erased, label);
    }

    fn record(self, params: Vec<ParamBinding>, callback: ErasedCallback, label: &'static str) {
        let descriptor = HandlerDescriptor {
            event: self.event,
            kind: S::KIND,
            draft: self.draft,
            action: self.action,
            single_instance: self.single_instance,
            params,
            validations: self.validations,
            middlewares: self.middlewares,
            callback,
            label,
        };
        self.class.push_descriptor(descriptor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::Injector;
    use solder_core::EntityDef;

    struct MixedHandler;

    impl HandlerSet for MixedHandler {
        fn describe(builder: &mut ClassBuilder<Self>) {
            builder.entity(
                EntityDef::builder("CatalogService.Books")
                    .key("ID")
                    .action("addRating")
                    .with_drafts()
                    .build(),
            );
            builder
                .before(CrudEvent::Update)
                .single_instance()
                .validate(Predicate::IsLowercase, "comment")
                .handle(Self::before_update);
            builder.bound_action("addRating").handle(Self::on_add_rating);
            builder.on_new_draft().handle(Self::on_new);
            builder.on_save_draft().handle(Self::on_save);
        }

        fn build(_injector: &Injector) -> Result<Self, ConfigurationError> {
            Ok(MixedHandler)
        }
    }

    impl MixedHandler {
        async fn before_update(self: Arc<Self>, _cx: BeforeCx) {}
        async fn on_add_rating(self: Arc<Self>, _cx: OnCx) {}
        async fn on_new(self: Arc<Self>, _cx: OnCx) {}
        async fn on_save(self: Arc<Self>, _cx: OnCx) {}
    }

    fn record_of<H: HandlerSet>() -> ClassRecord {
        let mut builder = ClassBuilder::<H>::new();
        H::describe(&mut builder);
        builder.into_record()
    }

    #[test]
    fn test_builder_records_descriptor_shape() {
        let record = record_of::<MixedHandler>();
        assert!(record.errors.is_empty());
        assert_eq!(record.descriptors.len(), 4);

        let before = &record.descriptors[0];
        assert_eq!(before.hook_kind(), HookKind::Before);
        assert!(before.is_single_instance_capable());
        assert_eq!(before.validations().len(), 1);
        assert_eq!(
            before.params(),
            [ParamBinding::Request, ParamBinding::SingleInstance]
        );

        let action = &record.descriptors[1];
        assert_eq!(action.event(), CrudEvent::BoundAction);
        assert_eq!(action.action_name(), Some("addRating"));

        let new_draft = &record.descriptors[2];
        assert_eq!(new_draft.event(), CrudEvent::New);
        assert!(new_draft.is_draft());

        let save = &record.descriptors[3];
        assert_eq!(save.event(), CrudEvent::Save);
        assert!(!save.is_draft());
    }

    #[test]
    fn test_double_binding_collects_error() {
        struct DoubleBound;
        impl HandlerSet for DoubleBound {
            fn describe(builder: &mut ClassBuilder<Self>) {
                builder.entity(EntityDef::builder("A").key("ID").build());
                builder.unbound();
            }
            fn build(_injector: &Injector) -> Result<Self, ConfigurationError> {
                Ok(DoubleBound)
            }
        }

        let record = record_of::<DoubleBound>();
        assert_eq!(record.errors.len(), 1);
        assert!(matches!(
            record.errors[0],
            ConfigurationError::InvalidDescriptor { .. }
        ));
    }

    #[test]
    fn test_handle_with_records_custom_params() {
        struct CustomParams;
        impl HandlerSet for CustomParams {
            fn describe(builder: &mut ClassBuilder<Self>) {
                builder.entity(EntityDef::builder("A").key("ID").build());
                builder.before(CrudEvent::Create).handle_with(
                    vec![
                        ParamBinding::Request,
                        ParamBinding::ColumnSupplied {
                            field: "price".to_string(),
                        },
                        ParamBinding::Locale,
                    ],
                    Self::before_create,
                );
            }
            fn build(_injector: &Injector) -> Result<Self, ConfigurationError> {
                Ok(CustomParams)
            }
        }
        impl CustomParams {
            async fn before_create(self: Arc<Self>, _params: Params) {}
        }

        let record = record_of::<CustomParams>();
        assert_eq!(record.descriptors[0].params().len(), 3);
        assert_eq!(
            record.descriptors[0].params()[1],
            ParamBinding::ColumnSupplied {
                field: "price".to_string()
            }
        );
    }
}
