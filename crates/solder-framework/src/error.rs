//! Dispatch-time internal errors.
//!
//! Registration validates every descriptor before any hook reaches the
//! host, so these errors mark invariant breaches rather than expected
//! conditions. They travel the hook error channel, never a panic.

use thiserror::Error;

/// Invariant breach detected while servicing a hook invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A parameter binding had no value in the live invocation context.
    #[error("parameter binding {binding} has no value in this hook phase")]
    ParamUnavailable {
        /// Display name of the binding.
        binding: String,
    },

    /// The resolved instance was not of the expected handler type.
    #[error("handler instance is not `{class}`")]
    InstanceMismatch {
        /// Expected handler class name.
        class: String,
    },

    /// A typed context was built from an invocation missing a required
    /// part.
    #[error("invocation carries no {what}")]
    MissingContext {
        /// The absent part.
        what: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use solder_core::HookError;

    #[test]
    fn test_dispatch_error_boxes_into_hook_error() {
        let boxed: HookError = DispatchError::MissingContext { what: "result" }.into();
        assert!(boxed.downcast_ref::<DispatchError>().is_some());
        assert_eq!(boxed.to_string(), "invocation carries no result");
    }
}
