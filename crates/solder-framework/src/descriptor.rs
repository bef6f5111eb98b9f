//! Handler descriptors.
//!
//! One [`HandlerDescriptor`] is recorded per registered method: the event
//! and hook kind, the draft flag, the action name for action kinds, the
//! single-instance capability marker, the ordered parameter specs, the
//! validations and method middlewares, and the erased callback. Descriptors
//! are immutable after recording; the dispatcher validates each one against
//! its class binding before any hook reaches the host.

use std::fmt;
use std::sync::Arc;

use solder_core::{ConfigurationError, CrudEvent, HookKind};

use crate::handler::ErasedCallback;
use crate::middleware::Middleware;
use crate::params::ParamBinding;
use crate::registry::ClassBinding;
use crate::validate::ValidationRule;

/// One recorded handler method.
pub struct HandlerDescriptor {
    pub(crate) event: CrudEvent,
    pub(crate) kind: HookKind,
    pub(crate) draft: bool,
    pub(crate) action: Option<String>,
    pub(crate) single_instance: bool,
    pub(crate) params: Vec<ParamBinding>,
    pub(crate) validations: Vec<ValidationRule>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) callback: ErasedCallback,
    pub(crate) label: &'static str,
}

impl HandlerDescriptor {
    /// The subscribed event.
    pub fn event(&self) -> CrudEvent {
        self.event
    }

    /// The hook phase.
    pub fn hook_kind(&self) -> HookKind {
        self.kind
    }

    /// Whether the descriptor targets the entity's draft variant.
    pub fn is_draft(&self) -> bool {
        self.draft
    }

    /// The action name, present exactly for action-kind events.
    pub fn action_name(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Whether the method declared single-instance capability.
    pub fn is_single_instance_capable(&self) -> bool {
        self.single_instance
    }

    /// Ordered parameter binding specs.
    pub fn params(&self) -> &[ParamBinding] {
        &self.params
    }

    /// Ordered validation rules.
    pub fn validations(&self) -> &[ValidationRule] {
        &self.validations
    }

    /// Label of the recorded callback, used in logs.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Whether the hook must target the draft variant.
    ///
    /// Draft-flagged CRUD hooks target the draft variant, as do the `New`
    /// and `Cancel` transitions, which only ever fire there. `Edit` and
    /// `Save` fire on the active entity.
    pub(crate) fn requires_draft_target(&self) -> bool {
        (self.event.is_crud() && self.draft)
            || matches!(self.event, CrudEvent::New | CrudEvent::Cancel)
    }

    /// Validates the descriptor against its class binding.
    pub(crate) fn validate(
        &self,
        class: &str,
        binding: &ClassBinding,
    ) -> Result<(), ConfigurationError> {
        if !self.kind.permits(self.event) {
            return Err(ConfigurationError::InvalidHookKind {
                class: class.to_string(),
                kind: self.kind,
                event: self.event,
            });
        }
        if self.event.is_action_like() && self.action.is_none() {
            return Err(ConfigurationError::MissingActionName {
                class: class.to_string(),
                event: self.event,
            });
        }
        if !self.event.is_action_like() && self.action.is_some() {
            return Err(ConfigurationError::UnexpectedActionName {
                class: class.to_string(),
                event: self.event,
            });
        }
        if self.draft
            && !(self.event.is_crud() || matches!(self.event, CrudEvent::New | CrudEvent::Cancel))
        {
            return Err(ConfigurationError::InvalidDraft {
                class: class.to_string(),
                event: self.event,
            });
        }
        for spec in &self.params {
            if !spec.available_in(self.kind) {
                return Err(ConfigurationError::InvalidParamBinding {
                    class: class.to_string(),
                    binding: spec.to_string(),
                    kind: self.kind,
                });
            }
        }
        match binding {
            ClassBinding::Unbound => {
                if self.event.is_entity_bound() {
                    return Err(ConfigurationError::EntityRequired {
                        class: class.to_string(),
                        event: self.event,
                    });
                }
            }
            ClassBinding::Entity(entity) => {
                if matches!(self.event, CrudEvent::BoundAction | CrudEvent::BoundFunction)
                    && let Some(action) = self.action.as_deref()
                    && !entity.has_action(action)
                {
                    return Err(ConfigurationError::UnknownAction {
                        action: action.to_string(),
                        entity: entity.name().to_string(),
                    });
                }
                if self.requires_draft_target() && entity.drafts().is_none() {
                    return Err(ConfigurationError::NoDraftVariant {
                        class: class.to_string(),
                        entity: entity.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("event", &self.event)
            .field("kind", &self.kind)
            .field("draft", &self.draft)
            .field("action", &self.action)
            .field("single_instance", &self.single_instance)
            .field("params", &self.params)
            .field("validations", &self.validations.len())
            .field("middlewares", &self.middlewares.len())
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use solder_core::EntityDef;

    fn descriptor(event: CrudEvent, kind: HookKind) -> HandlerDescriptor {
        HandlerDescriptor {
            event,
            kind,
            draft: false,
            action: None,
            single_instance: false,
            params: Vec::new(),
            validations: Vec::new(),
            middlewares: Vec::new(),
            callback: Arc::new(|_, _| Box::pin(async { Ok(None::<Value>) })),
            label: "test",
        }
    }

    fn books_binding() -> ClassBinding {
        ClassBinding::Entity(
            EntityDef::builder("CatalogService.Books")
                .key("ID")
                .action("addRating")
                .build(),
        )
    }

    #[test]
    fn test_before_hook_for_action_is_rejected() {
        let d = descriptor(CrudEvent::Action, HookKind::Before);
        let err = d.validate("Demo", &ClassBinding::Unbound).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidHookKind { .. }));
    }

    #[test]
    fn test_action_kind_requires_name() {
        let d = descriptor(CrudEvent::Action, HookKind::On);
        let err = d.validate("Demo", &ClassBinding::Unbound).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingActionName { .. }));
    }

    #[test]
    fn test_crud_descriptor_rejects_action_name() {
        let mut d = descriptor(CrudEvent::Create, HookKind::Before);
        d.action = Some("oops".to_string());
        let err = d.validate("Demo", &books_binding()).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnexpectedActionName { .. }
        ));
    }

    #[test]
    fn test_unbound_class_rejects_entity_events() {
        let d = descriptor(CrudEvent::Create, HookKind::Before);
        let err = d.validate("Demo", &ClassBinding::Unbound).unwrap_err();
        assert!(matches!(err, ConfigurationError::EntityRequired { .. }));
    }

    #[test]
    fn test_bound_action_must_be_declared() {
        let mut d = descriptor(CrudEvent::BoundAction, HookKind::On);
        d.action = Some("undeclared".to_string());
        let err = d.validate("Demo", &books_binding()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownAction { .. }));

        let mut ok = descriptor(CrudEvent::BoundAction, HookKind::On);
        ok.action = Some("addRating".to_string());
        assert!(ok.validate("Demo", &books_binding()).is_ok());
    }

    #[test]
    fn test_draft_needs_draft_variant() {
        let mut d = descriptor(CrudEvent::Update, HookKind::Before);
        d.draft = true;
        let err = d.validate("Demo", &books_binding()).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoDraftVariant { .. }));

        let drafted = ClassBinding::Entity(
            EntityDef::builder("AdminService.Books")
                .key("ID")
                .with_drafts()
                .build(),
        );
        let mut ok = descriptor(CrudEvent::Update, HookKind::Before);
        ok.draft = true;
        assert!(ok.validate("Demo", &drafted).is_ok());
    }

    #[test]
    fn test_draft_flag_invalid_for_action_kinds() {
        let mut d = descriptor(CrudEvent::BoundAction, HookKind::On);
        d.action = Some("addRating".to_string());
        d.draft = true;
        let err = d.validate("Demo", &books_binding()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDraft { .. }));
    }

    #[test]
    fn test_new_and_cancel_target_drafts() {
        let drafted = ClassBinding::Entity(
            EntityDef::builder("AdminService.Books")
                .key("ID")
                .with_drafts()
                .build(),
        );
        let new_hook = descriptor(CrudEvent::New, HookKind::On);
        assert!(new_hook.requires_draft_target());
        assert!(new_hook.validate("Demo", &drafted).is_ok());
        assert!(new_hook.validate("Demo", &books_binding()).is_err());

        let edit_hook = descriptor(CrudEvent::Edit, HookKind::On);
        assert!(!edit_hook.requires_draft_target());
        assert!(edit_hook.validate("Demo", &books_binding()).is_ok());
    }

    #[test]
    fn test_param_availability_is_checked() {
        let mut d = descriptor(CrudEvent::Create, HookKind::Before);
        d.params = vec![ParamBinding::Result];
        let err = d.validate("Demo", &books_binding()).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidParamBinding { .. }
        ));
    }
}
