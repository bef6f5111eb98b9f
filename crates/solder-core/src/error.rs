//! Error taxonomy of the dispatch layer.
//!
//! Two failure families exist, with disjoint lifecycles:
//!
//! - [`ConfigurationError`]: wiring mistakes. Raised while recording
//!   descriptors or during `register_all`, always before any hook has been
//!   registered with the host. Fatal and never partial: a failed
//!   registration leaves zero hooks behind.
//! - [`ValidationError`]: per-request rejection by a declared field
//!   predicate. Travels through the hook error channel ([`HookError`]) to
//!   the host; the callback never runs.
//!
//! Errors returned by handler callbacks or middleware are not modelled
//! here; they propagate verbatim as [`HookError`].

use serde_json::Value;
use thiserror::Error;

use crate::event::{CrudEvent, HookKind};

/// Boxed error flowing through the host's hook error channel.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one hook invocation: an optional replacement value or an
/// error for the host to surface.
pub type HookResult = Result<Option<Value>, HookError>;

/// Wiring mistake detected at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The dispatcher was given no handler classes at all.
    #[error("no handler classes were provided for registration")]
    NoHandlerClasses,

    /// `register_all` was invoked a second time on the same dispatcher.
    #[error("handler registration already ran for this dispatcher")]
    AlreadyRegistered,

    /// A dispatched class declared neither an owning entity nor unbound
    /// actions.
    #[error("handler class `{class}` declared neither an entity nor unbound actions")]
    MissingBinding {
        /// The offending handler class.
        class: String,
    },

    /// An entity event was recorded on an unbound-action class.
    #[error("handler class `{class}` needs an entity binding for {event} handlers")]
    EntityRequired {
        /// The offending handler class.
        class: String,
        /// The recorded event.
        event: CrudEvent,
    },

    /// A hook kind was recorded for an event family that does not accept
    /// it.
    #[error("`{kind}` hooks are not valid for {event} (class `{class}`)")]
    InvalidHookKind {
        /// The offending handler class.
        class: String,
        /// The recorded hook kind.
        kind: HookKind,
        /// The recorded event.
        event: CrudEvent,
    },

    /// An action-kind descriptor was recorded without an action name.
    #[error("{event} handlers require an action name (class `{class}`)")]
    MissingActionName {
        /// The offending handler class.
        class: String,
        /// The recorded event.
        event: CrudEvent,
    },

    /// A non-action descriptor carried an action name.
    #[error("{event} handlers must not carry an action name (class `{class}`)")]
    UnexpectedActionName {
        /// The offending handler class.
        class: String,
        /// The recorded event.
        event: CrudEvent,
    },

    /// A bound action name is not declared on the bound entity.
    #[error("action `{action}` is not declared on entity `{entity}`")]
    UnknownAction {
        /// The undeclared action name.
        action: String,
        /// The entity the class is bound to.
        entity: String,
    },

    /// A draft descriptor targets an entity without a draft variant.
    #[error("entity `{entity}` has no draft variant (class `{class}`)")]
    NoDraftVariant {
        /// The offending handler class.
        class: String,
        /// The entity the class is bound to.
        entity: String,
    },

    /// The draft flag was set for an event that never targets drafts.
    #[error("the draft flag is not valid for {event} (class `{class}`)")]
    InvalidDraft {
        /// The offending handler class.
        class: String,
        /// The recorded event.
        event: CrudEvent,
    },

    /// A parameter binding was declared for a hook kind that cannot
    /// resolve it.
    #[error("parameter binding {binding} is not available in `{kind}` hooks (class `{class}`)")]
    InvalidParamBinding {
        /// The offending handler class.
        class: String,
        /// Display name of the rejected binding.
        binding: String,
        /// The hook kind it was declared for.
        kind: HookKind,
    },

    /// A handler class asked the injector for an unbound dependency.
    #[error("unresolved dependency `{dependency}`")]
    MissingDependency {
        /// Type name of the missing binding.
        dependency: String,
    },

    /// A descriptor was recorded through conflicting builder calls.
    #[error("invalid handler descriptor in class `{class}`: {detail}")]
    InvalidDescriptor {
        /// The offending handler class.
        class: String,
        /// What the builder rejected.
        detail: String,
    },
}

/// Per-request rejection raised by a declared field predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation `{predicate}` rejected field `{field}`")]
pub struct ValidationError {
    /// The validated payload field.
    pub field: String,
    /// Name of the failing predicate.
    pub predicate: &'static str,
}

impl ValidationError {
    /// Builds a rejection for `field` failing `predicate`.
    pub fn new(field: impl Into<String>, predicate: &'static str) -> Self {
        ValidationError {
            field: field.into(),
            predicate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_messages_name_the_class() {
        let err = ConfigurationError::MissingBinding {
            class: "BookHandler".to_string(),
        };
        assert!(err.to_string().contains("BookHandler"));

        let err = ConfigurationError::InvalidHookKind {
            class: "BookHandler".to_string(),
            kind: HookKind::Before,
            event: CrudEvent::Action,
        };
        let message = err.to_string();
        assert!(message.contains("before"));
        assert!(message.contains("ACTION"));
    }

    #[test]
    fn test_validation_error_names_field_and_predicate() {
        let err = ValidationError::new("comment", "isLowercase");
        let message = err.to_string();
        assert!(message.contains("comment"));
        assert!(message.contains("isLowercase"));
    }

    #[test]
    fn test_validation_error_downcasts_from_hook_error() {
        let boxed: HookError = Box::new(ValidationError::new("title", "notEmpty"));
        let recovered = boxed.downcast_ref::<ValidationError>().unwrap();
        assert_eq!(recovered.field, "title");
    }
}
