//! Handler registration against the host service.
//!
//! The [`Dispatcher`] consumes a list of [`HandlerClass`] references and
//! wires their recorded hooks into a live [`HostService`] in two phases.
//! Phase one records and validates every class, resolves every instance
//! through the injector and composes every pipeline; phase two performs
//! the host registrations. A failure anywhere in phase one aborts before
//! phase two begins, so the host never observes a partial handler set.
//!
//! [`HostService`]: solder_core::HostService
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_framework::{Dispatcher, HandlerClass};
//!
//! let dispatcher = Dispatcher::new(vec![
//!     HandlerClass::of::<BookHandler>(),
//!     HandlerClass::of::<ReviewHandler>(),
//! ]);
//! dispatcher.injector().bind(book_repository);
//! dispatcher.register_all(&service)?;
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use solder_core::{
    AfterHook, AfterResult, BeforeHook, ConfigurationError, CrudEvent, EntityRef, HookKind, Next,
    OnHook, OnTarget, RequestRef, ResultPayload, ServiceHandle,
};

use crate::context::Invocation;
use crate::descriptor::HandlerDescriptor;
use crate::handler::{ErasedCallback, HandlerClass, InstanceRef};
use crate::inject::Injector;
use crate::middleware::Middleware;
use crate::params::{ResolveCx, resolve};
use crate::pipeline::compose;
use crate::registry::{ClassBinding, HandlerRegistry};

// ============================================================================
// Dispatcher
// ============================================================================

/// Registers handler classes against a host service, once.
pub struct Dispatcher {
    classes: Vec<HandlerClass>,
    injector: Injector,
    registry: &'static HandlerRegistry,
    registered: AtomicBool,
}

impl Dispatcher {
    /// Creates a dispatcher over the given classes.
    ///
    /// Input order is preserved; a class listed twice is kept at its first
    /// position only, so its hooks register once.
    pub fn new(classes: Vec<HandlerClass>) -> Self {
        let mut seen = HashSet::new();
        let classes: Vec<HandlerClass> = classes
            .into_iter()
            .filter(|class| seen.insert(class.key()))
            .collect();
        Dispatcher {
            classes,
            injector: Injector::new(),
            registry: HandlerRegistry::global(),
            registered: AtomicBool::new(false),
        }
    }

    /// The injector handler instances are built from. Bind dependencies
    /// here before calling [`register_all`](Dispatcher::register_all).
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Number of distinct classes this dispatcher manages.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Registers every hook of every class with the host service.
    ///
    /// Callable once per dispatcher; an empty class list and a repeated
    /// call both fail before any side effect on the host. When any class
    /// fails to validate or build, no hook of any class is registered and
    /// the first error is returned.
    pub fn register_all(&self, service: &ServiceHandle) -> Result<(), ConfigurationError> {
        if self.classes.is_empty() {
            return Err(ConfigurationError::NoHandlerClasses);
        }
        if self.registered.load(Ordering::SeqCst) {
            return Err(ConfigurationError::AlreadyRegistered);
        }
        self.injector.bind_service(service);

        let prepared = self.prepare()?;

        if self.registered.swap(true, Ordering::SeqCst) {
            return Err(ConfigurationError::AlreadyRegistered);
        }

        let mut classes = 0usize;
        let mut total = 0usize;
        for class in prepared {
            let count = class.hooks.len();
            for ready in class.hooks {
                match ready {
                    ReadyHook::Before { event, target, hook } => {
                        service.before(event, &target, hook)
                    }
                    ReadyHook::After { event, target, hook } => {
                        service.after(event, &target, hook)
                    }
                    ReadyHook::On { target, hook } => service.on(target, hook),
                }
            }
            info!(class = class.name, hooks = count, "Registered handler class");
            classes += 1;
            total += count;
        }
        info!(classes, hooks = total, "Handler registration complete");
        Ok(())
    }

    /// Phase one: validate, build and compose everything without touching
    /// the host.
    fn prepare(&self) -> Result<Vec<PreparedClass>, ConfigurationError> {
        let mut prepared = Vec::with_capacity(self.classes.len());
        for class in &self.classes {
            class.record(self.registry);
            let key = class.key();
            if let Some(err) = self.registry.class_errors(key).into_iter().next() {
                return Err(err);
            }
            let descriptors = self.registry.descriptors(key);
            if descriptors.is_empty() {
                debug!(class = class.name(), "Handler class records no hooks, skipping");
                continue;
            }
            let binding = self.registry.binding(key)?;
            for descriptor in &descriptors {
                descriptor.validate(class.name(), &binding)?;
            }
            let instance = class.build(&self.injector)?;
            let class_middlewares = self.registry.middlewares(key);
            let mut hooks = Vec::with_capacity(descriptors.len());
            for descriptor in &descriptors {
                hooks.push(ready_hook(
                    class.name(),
                    descriptor,
                    &binding,
                    &class_middlewares,
                    &instance,
                )?);
            }
            prepared.push(PreparedClass {
                name: class.name(),
                hooks,
            });
        }
        Ok(prepared)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("classes", &self.classes.len())
            .field("registered", &self.registered.load(Ordering::SeqCst))
            .finish()
    }
}

// ============================================================================
// Prepared Registrations
// ============================================================================

struct PreparedClass {
    name: &'static str,
    hooks: Vec<ReadyHook>,
}

/// One host registration, fully resolved and composed.
enum ReadyHook {
    Before {
        event: CrudEvent,
        target: EntityRef,
        hook: BeforeHook,
    },
    After {
        event: CrudEvent,
        target: EntityRef,
        hook: AfterHook,
    },
    On {
        target: OnTarget,
        hook: OnHook,
    },
}

fn ready_hook(
    class: &str,
    descriptor: &Arc<HandlerDescriptor>,
    binding: &ClassBinding,
    class_middlewares: &[Arc<dyn Middleware>],
    instance: &InstanceRef,
) -> Result<ReadyHook, ConfigurationError> {
    let callback = compose(class_middlewares, descriptor);
    let ready = match descriptor.hook_kind() {
        HookKind::Before => {
            let entity = bound_entity(class, descriptor, binding)?;
            let target = entity_target(class, descriptor, &entity)?;
            ReadyHook::Before {
                event: descriptor.event(),
                hook: before_shim(descriptor, &target, instance, callback),
                target,
            }
        }
        HookKind::After => {
            let entity = bound_entity(class, descriptor, binding)?;
            let target = entity_target(class, descriptor, &entity)?;
            ReadyHook::After {
                event: descriptor.event(),
                hook: after_shim(descriptor, &target, instance, callback),
                target,
            }
        }
        HookKind::On => {
            let target = on_target(class, descriptor, binding)?;
            let keys = match &target {
                OnTarget::Event { entity, .. } | OnTarget::BoundAction { entity, .. } => {
                    Some(Arc::clone(entity))
                }
                OnTarget::Action { .. } => None,
            };
            ReadyHook::On {
                hook: on_shim(descriptor, keys, instance, callback),
                target,
            }
        }
    };
    Ok(ready)
}

/// Resolves the registration key for an `on` hook.
fn on_target(
    class: &str,
    descriptor: &HandlerDescriptor,
    binding: &ClassBinding,
) -> Result<OnTarget, ConfigurationError> {
    match descriptor.event() {
        CrudEvent::Action | CrudEvent::Function => Ok(OnTarget::Action {
            name: action_name(class, descriptor)?,
        }),
        CrudEvent::BoundAction | CrudEvent::BoundFunction => Ok(OnTarget::BoundAction {
            name: action_name(class, descriptor)?,
            entity: bound_entity(class, descriptor, binding)?,
        }),
        _ => {
            let entity = bound_entity(class, descriptor, binding)?;
            Ok(OnTarget::Event {
                event: descriptor.event(),
                entity: entity_target(class, descriptor, &entity)?,
            })
        }
    }
}

fn action_name(class: &str, descriptor: &HandlerDescriptor) -> Result<String, ConfigurationError> {
    descriptor
        .action_name()
        .map(str::to_owned)
        .ok_or_else(|| ConfigurationError::MissingActionName {
            class: class.to_string(),
            event: descriptor.event(),
        })
}

fn bound_entity(
    class: &str,
    descriptor: &HandlerDescriptor,
    binding: &ClassBinding,
) -> Result<EntityRef, ConfigurationError> {
    match binding {
        ClassBinding::Entity(entity) => Ok(Arc::clone(entity)),
        ClassBinding::Unbound => Err(ConfigurationError::EntityRequired {
            class: class.to_string(),
            event: descriptor.event(),
        }),
    }
}

/// The entity the hook actually attaches to: the draft variant for
/// draft-flagged CRUD hooks and the `New`/`Cancel` transitions, the active
/// entity otherwise.
fn entity_target(
    class: &str,
    descriptor: &HandlerDescriptor,
    entity: &EntityRef,
) -> Result<EntityRef, ConfigurationError> {
    if descriptor.requires_draft_target() {
        entity
            .drafts()
            .cloned()
            .ok_or_else(|| ConfigurationError::NoDraftVariant {
                class: class.to_string(),
                entity: entity.name().to_string(),
            })
    } else {
        Ok(Arc::clone(entity))
    }
}

// ============================================================================
// Hook Shims
// ============================================================================

/// The flag a callback observes: declared capability and a request that
/// addresses every key of the targeted entity. Without an entity there are
/// no keys to address, so the flag stays false.
fn single_instance_flag(
    descriptor: &HandlerDescriptor,
    entity: Option<&EntityRef>,
    request: &RequestRef,
) -> bool {
    descriptor.is_single_instance_capable()
        && entity.is_some_and(|entity| request.addresses_all_keys(entity.keys()))
}

fn before_shim(
    descriptor: &Arc<HandlerDescriptor>,
    target: &EntityRef,
    instance: &InstanceRef,
    callback: ErasedCallback,
) -> BeforeHook {
    let descriptor = Arc::clone(descriptor);
    let target = Arc::clone(target);
    let instance = Arc::clone(instance);
    Arc::new(move |request: RequestRef| {
        let descriptor = Arc::clone(&descriptor);
        let target = Arc::clone(&target);
        let instance = Arc::clone(&instance);
        let callback = Arc::clone(&callback);
        Box::pin(async move {
            let single_instance = single_instance_flag(&descriptor, Some(&target), &request);
            let params = resolve(
                descriptor.params(),
                &ResolveCx {
                    request: &request,
                    result: None,
                    next: None,
                    single_instance,
                },
            )?;
            let invocation = Invocation {
                request,
                single_instance,
                params,
            };
            callback(instance, invocation).await
        })
    })
}

fn after_shim(
    descriptor: &Arc<HandlerDescriptor>,
    target: &EntityRef,
    instance: &InstanceRef,
    callback: ErasedCallback,
) -> AfterHook {
    let descriptor = Arc::clone(descriptor);
    let target = Arc::clone(target);
    let instance = Arc::clone(instance);
    Arc::new(move |payload: ResultPayload, request: RequestRef| {
        let descriptor = Arc::clone(&descriptor);
        let target = Arc::clone(&target);
        let instance = Arc::clone(&instance);
        let callback = Arc::clone(&callback);
        Box::pin(async move {
            let result = AfterResult::from(payload);
            let single_instance = single_instance_flag(&descriptor, Some(&target), &request);
            let params = resolve(
                descriptor.params(),
                &ResolveCx {
                    request: &request,
                    result: Some(&result),
                    next: None,
                    single_instance,
                },
            )?;
            let invocation = Invocation {
                request,
                single_instance,
                params,
            };
            callback(instance, invocation).await
        })
    })
}

fn on_shim(
    descriptor: &Arc<HandlerDescriptor>,
    keys: Option<EntityRef>,
    instance: &InstanceRef,
    callback: ErasedCallback,
) -> OnHook {
    let descriptor = Arc::clone(descriptor);
    let instance = Arc::clone(instance);
    Arc::new(move |request: RequestRef, next: Next| {
        let descriptor = Arc::clone(&descriptor);
        let keys = keys.clone();
        let instance = Arc::clone(&instance);
        let callback = Arc::clone(&callback);
        Box::pin(async move {
            let single_instance = single_instance_flag(&descriptor, keys.as_ref(), &request);
            let params = resolve(
                descriptor.params(),
                &ResolveCx {
                    request: &request,
                    result: None,
                    next: Some(&next),
                    single_instance,
                },
            )?;
            let invocation = Invocation {
                request,
                single_instance,
                params,
            };
            callback(instance, invocation).await
        })
    })
}
