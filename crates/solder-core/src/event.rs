//! Event and hook-kind classification.
//!
//! Every handler registration targets one [`CrudEvent`] with one [`HookKind`].
//! The event kinds split into three families with different wiring rules:
//!
//! - CRUD events (`Create`, `Read`, `Update`, `Delete`) accept all three
//!   hook kinds and may target the draft variant of an entity.
//! - Action kinds (`Action`, `Function`, `BoundAction`, `BoundFunction`)
//!   carry an action name and accept only `On` hooks.
//! - Draft transitions (`New`, `Edit`, `Save`, `Cancel`) mark lifecycle
//!   changes of a working copy and accept only `On` hooks.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Event Kinds
// ============================================================================

/// Lifecycle event of an entity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrudEvent {
    /// A new record is written.
    Create,
    /// Records are queried.
    Read,
    /// An existing record is modified.
    Update,
    /// Records are removed.
    Delete,
    /// An unbound (service-level) action is called.
    Action,
    /// An unbound (service-level) function is called.
    Function,
    /// An action bound to a specific entity is called.
    BoundAction,
    /// A function bound to a specific entity is called.
    BoundFunction,
    /// A draft working copy is created.
    New,
    /// An active record is opened for draft editing.
    Edit,
    /// A draft working copy is activated.
    Save,
    /// A draft working copy is discarded.
    Cancel,
}

impl CrudEvent {
    /// Whether this is one of the four CRUD events.
    ///
    /// Only CRUD events accept `Before` and `After` hooks and only they may
    /// carry an explicit draft flag.
    pub fn is_crud(self) -> bool {
        matches!(
            self,
            CrudEvent::Create | CrudEvent::Read | CrudEvent::Update | CrudEvent::Delete
        )
    }

    /// Whether this event kind names an action or function.
    ///
    /// Action kinds require an action name on the descriptor and register
    /// under that name instead of the event/entity pair.
    pub fn is_action_like(self) -> bool {
        matches!(
            self,
            CrudEvent::Action
                | CrudEvent::Function
                | CrudEvent::BoundAction
                | CrudEvent::BoundFunction
        )
    }

    /// Whether this event kind is bound to a specific entity.
    ///
    /// `Action` and `Function` are service-level and register under the
    /// action name alone.
    pub fn is_entity_bound(self) -> bool {
        !matches!(self, CrudEvent::Action | CrudEvent::Function)
    }

    /// Whether this is a draft lifecycle transition.
    pub fn is_draft_transition(self) -> bool {
        matches!(
            self,
            CrudEvent::New | CrudEvent::Edit | CrudEvent::Save | CrudEvent::Cancel
        )
    }

    /// Whether only `On` hooks are valid for this event kind.
    pub fn requires_on_hook(self) -> bool {
        self.is_action_like() || self.is_draft_transition()
    }
}

impl fmt::Display for CrudEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrudEvent::Create => "CREATE",
            CrudEvent::Read => "READ",
            CrudEvent::Update => "UPDATE",
            CrudEvent::Delete => "DELETE",
            CrudEvent::Action => "ACTION",
            CrudEvent::Function => "FUNC",
            CrudEvent::BoundAction => "BOUND_ACTION",
            CrudEvent::BoundFunction => "BOUND_FUNC",
            CrudEvent::New => "NEW",
            CrudEvent::Edit => "EDIT",
            CrudEvent::Save => "SAVE",
            CrudEvent::Cancel => "CANCEL",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Hook Kinds
// ============================================================================

/// Phase at which a handler participates in event processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Runs before the event's implementation; receives only the request.
    Before,
    /// Runs after the event's implementation; receives the (normalized)
    /// result and the request.
    After,
    /// Replaces or wraps the event's implementation; receives the request
    /// and a continuation for the rest of the chain.
    On,
}

impl HookKind {
    /// Whether this hook kind is valid for the given event.
    pub fn permits(self, event: CrudEvent) -> bool {
        match self {
            HookKind::Before | HookKind::After => event.is_crud(),
            HookKind::On => true,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::Before => "before",
            HookKind::After => "after",
            HookKind::On => "on",
        };
        f.write_str(name)
    }
}
