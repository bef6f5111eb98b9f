//! Middleware around handler callbacks.
//!
//! A [`Middleware`] wraps the invocation of one descriptor's callback. It
//! receives the resolved [`Invocation`] and a [`PipelineNext`] handle for
//! the rest of the pipeline; not invoking the handle short-circuits the
//! remaining middlewares, the validations and the callback. Chains are
//! composed once at registration time, class-level wrappers outermost.
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_framework::middleware_fn;
//!
//! let timing = middleware_fn("timing", |invocation, next| async move {
//!     let started = std::time::Instant::now();
//!     let outcome = next.run(invocation).await;
//!     tracing::debug!(elapsed = ?started.elapsed(), "Handler finished");
//!     outcome
//! });
//! ```

use std::future::Future;

use async_trait::async_trait;

use solder_core::HookResult;

use crate::context::Invocation;
use crate::handler::{ErasedCallback, InstanceRef};

/// Wrapper around the invocation of a handler callback.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        "middleware"
    }

    /// Handles the invocation, deciding whether the rest of the pipeline
    /// runs.
    async fn handle(&self, invocation: Invocation, next: PipelineNext) -> HookResult;
}

/// Handle for the remainder of a middleware pipeline.
///
/// Consuming `run` keeps a middleware from driving the inner pipeline
/// twice.
pub struct PipelineNext {
    callback: ErasedCallback,
    instance: InstanceRef,
}

impl PipelineNext {
    pub(crate) fn new(callback: ErasedCallback, instance: InstanceRef) -> Self {
        PipelineNext { callback, instance }
    }

    /// Runs the rest of the pipeline with the given invocation.
    pub async fn run(self, invocation: Invocation) -> HookResult {
        (self.callback)(self.instance, invocation).await
    }
}

/// Adapts an async closure into a named [`Middleware`].
pub fn middleware_fn<F, Fut>(name: impl Into<String>, f: F) -> MiddlewareFn<F>
where
    F: Fn(Invocation, PipelineNext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    MiddlewareFn {
        name: name.into(),
        f,
    }
}

/// Closure-backed middleware returned by [`middleware_fn`].
pub struct MiddlewareFn<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for MiddlewareFn<F>
where
    F: Fn(Invocation, PipelineNext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, invocation: Invocation, next: PipelineNext) -> HookResult {
        (self.f)(invocation, next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;
    use serde_json::Value;
    use solder_core::{CrudEvent, Request};
    use std::sync::Arc;

    fn empty_invocation() -> Invocation {
        Invocation {
            request: Request::builder(CrudEvent::Read, "CatalogService.Books").build(),
            single_instance: false,
            params: Params::default(),
        }
    }

    #[tokio::test]
    async fn test_middleware_fn_forwards_to_pipeline() {
        let middleware = middleware_fn("noop", |invocation, next| async move {
            next.run(invocation).await
        });
        assert_eq!(middleware.name(), "noop");

        let callback: ErasedCallback =
            Arc::new(|_, _| Box::pin(async { Ok(Some(Value::from("inner"))) }));
        let next = PipelineNext::new(callback, Arc::new(()));
        let outcome = middleware.handle(empty_invocation(), next).await.unwrap();
        assert_eq!(outcome, Some(Value::from("inner")));
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        let middleware = middleware_fn("gate", |_invocation, _next| async move { Ok(None) });
        let callback: ErasedCallback =
            Arc::new(|_, _| Box::pin(async { Ok(Some(Value::from("unreachable"))) }));
        let next = PipelineNext::new(callback, Arc::new(()));
        let outcome = middleware.handle(empty_invocation(), next).await.unwrap();
        assert_eq!(outcome, None);
    }
}
