//! Pipeline composition.
//!
//! Turns one descriptor plus its class's middlewares into a single erased
//! invocable, composed once at registration time:
//!
//! ```text
//! class mw 1 → class mw 2 → method mw 1 → … → validations → callback
//! ```
//!
//! Middlewares wrap outermost-first in declared order; validations run
//! last, immediately before the callback, first failure wins.

use std::sync::Arc;

use tracing::warn;

use crate::descriptor::HandlerDescriptor;
use crate::handler::ErasedCallback;
use crate::middleware::{Middleware, PipelineNext};
use crate::validate::check_rules;

/// Composes the full pipeline for one descriptor.
pub(crate) fn compose(
    class_middlewares: &[Arc<dyn Middleware>],
    descriptor: &HandlerDescriptor,
) -> ErasedCallback {
    let mut composed = validated_callback(descriptor);

    let chain: Vec<Arc<dyn Middleware>> = class_middlewares
        .iter()
        .chain(descriptor.middlewares.iter())
        .cloned()
        .collect();
    for middleware in chain.into_iter().rev() {
        let inner = composed;
        composed = Arc::new(move |instance, invocation| {
            let middleware = Arc::clone(&middleware);
            let next = PipelineNext::new(Arc::clone(&inner), instance);
            Box::pin(async move { middleware.handle(invocation, next).await })
        });
    }
    composed
}

/// The innermost stage: declared validations, then the callback.
fn validated_callback(descriptor: &HandlerDescriptor) -> ErasedCallback {
    if descriptor.validations.is_empty() {
        return Arc::clone(&descriptor.callback);
    }
    let rules = descriptor.validations.clone();
    let callback = Arc::clone(&descriptor.callback);
    let label = descriptor.label;
    Arc::new(move |instance, invocation| {
        let rules = rules.clone();
        let callback = Arc::clone(&callback);
        Box::pin(async move {
            if let Err(err) = check_rules(&rules, &invocation.request) {
                warn!(
                    field = %err.field,
                    predicate = err.predicate,
                    handler = label,
                    "Validation rejected request"
                );
                return Err(err.into());
            }
            callback(instance, invocation).await
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Invocation;
    use crate::handler::InstanceRef;
    use crate::middleware::middleware_fn;
    use crate::params::{ParamBinding, Params};
    use crate::validate::{Predicate, ValidationRule};
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use solder_core::{CrudEvent, HookKind, Request, ValidationError};

    fn invocation(data: Value) -> Invocation {
        Invocation {
            request: Request::builder(CrudEvent::Update, "CatalogService.Books")
                .data(data)
                .build(),
            single_instance: false,
            params: Params::default(),
        }
    }

    fn instance() -> InstanceRef {
        Arc::new(())
    }

    fn descriptor_with(
        validations: Vec<ValidationRule>,
        middlewares: Vec<Arc<dyn Middleware>>,
        callback: ErasedCallback,
    ) -> HandlerDescriptor {
        HandlerDescriptor {
            event: CrudEvent::Update,
            kind: HookKind::Before,
            draft: false,
            action: None,
            single_instance: false,
            params: vec![ParamBinding::Request],
            validations,
            middlewares,
            callback,
            label: "test_callback",
        }
    }

    fn recording_middleware(log: Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Arc<dyn Middleware> {
        Arc::new(middleware_fn(tag, move |invocation, next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(tag);
                next.run(invocation).await
            }
        }))
    }

    #[tokio::test]
    async fn test_class_middlewares_wrap_method_middlewares() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let callback_log = Arc::clone(&log);
        let callback: ErasedCallback = Arc::new(move |_, _| {
            let log = Arc::clone(&callback_log);
            Box::pin(async move {
                log.lock().push("callback");
                Ok(None)
            })
        });

        let descriptor = descriptor_with(
            Vec::new(),
            vec![recording_middleware(Arc::clone(&log), "method")],
            callback,
        );
        let class_mw = vec![recording_middleware(Arc::clone(&log), "class")];

        let composed = compose(&class_mw, &descriptor);
        composed(instance(), invocation(json!({})))
            .await
            .unwrap();

        assert_eq!(*log.lock(), ["class", "method", "callback"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_validations_and_callback() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let callback_log = Arc::clone(&log);
        let callback: ErasedCallback = Arc::new(move |_, _| {
            let log = Arc::clone(&callback_log);
            Box::pin(async move {
                log.lock().push("callback");
                Ok(None)
            })
        });

        let gate: Arc<dyn Middleware> = Arc::new(middleware_fn("gate", |_invocation, _next| async move {
            Ok(Some(Value::from("blocked")))
        }));
        let descriptor = descriptor_with(
            vec![ValidationRule::new(Predicate::IsLowercase, "comment")],
            vec![gate],
            callback,
        );

        let composed = compose(&[], &descriptor);
        let outcome = composed(instance(), invocation(json!({"comment": "HELLO"})))
            .await
            .unwrap();

        assert_eq!(outcome, Some(Value::from("blocked")));
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_stops_before_callback() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let callback_log = Arc::clone(&log);
        let callback: ErasedCallback = Arc::new(move |_, _| {
            let log = Arc::clone(&callback_log);
            Box::pin(async move {
                log.lock().push("callback");
                Ok(None)
            })
        });

        let descriptor = descriptor_with(
            vec![ValidationRule::new(Predicate::IsLowercase, "comment")],
            Vec::new(),
            callback,
        );

        let composed = compose(&[], &descriptor);
        let err = composed(instance(), invocation(json!({"comment": "HELLO"})))
            .await
            .unwrap_err();

        let validation = err.downcast_ref::<ValidationError>().unwrap();
        assert_eq!(validation.field, "comment");
        assert_eq!(validation.predicate, "isLowercase");
        assert!(log.lock().is_empty());
    }
}
