//! Invocation contexts handed to handler callbacks.
//!
//! Every hook invocation materializes one [`Invocation`] (request, computed
//! single-instance flag, resolved parameters). Callbacks registered through
//! the typed builder paths receive one of the per-kind views built from it:
//! [`BeforeCx`], [`AfterCx`] or [`OnCx`]; callbacks registered via
//! `handle_with` receive the raw [`Params`] instead.

use solder_core::{AfterResult, HookError, Next, RequestRef};

use crate::error::DispatchError;
use crate::params::Params;

/// One hook invocation as the pipeline sees it.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The dispatched request.
    pub request: RequestRef,
    /// Whether the request addresses a single instance and the descriptor
    /// declared the capability.
    pub single_instance: bool,
    /// Parameters resolved from the descriptor's binding specs.
    pub params: Params,
}

/// Construction of a typed context from an invocation.
pub trait FromInvocation: Sized {
    /// Builds the context, failing when a required part is absent.
    fn from_invocation(invocation: &Invocation) -> Result<Self, HookError>;
}

/// Context of a `before` hook.
#[derive(Debug, Clone)]
pub struct BeforeCx {
    /// The dispatched request.
    pub request: RequestRef,
    /// The computed single-instance flag.
    pub single_instance: bool,
}

impl FromInvocation for BeforeCx {
    fn from_invocation(invocation: &Invocation) -> Result<Self, HookError> {
        Ok(BeforeCx {
            request: invocation.request.clone(),
            single_instance: invocation.single_instance,
        })
    }
}

/// Context of an `after` hook.
#[derive(Debug, Clone)]
pub struct AfterCx {
    /// The normalized implementation result.
    pub result: AfterResult,
    /// The dispatched request.
    pub request: RequestRef,
    /// The computed single-instance flag.
    pub single_instance: bool,
}

impl FromInvocation for AfterCx {
    fn from_invocation(invocation: &Invocation) -> Result<Self, HookError> {
        let result = invocation
            .params
            .result()
            .cloned()
            .ok_or(DispatchError::MissingContext { what: "result" })?;
        Ok(AfterCx {
            result,
            request: invocation.request.clone(),
            single_instance: invocation.single_instance,
        })
    }
}

/// Context of an `on` hook.
#[derive(Debug, Clone)]
pub struct OnCx {
    /// The dispatched request.
    pub request: RequestRef,
    /// Continuation for the rest of the chain. Call [`Next::proceed`] (or
    /// return its future's result) to let remaining hooks and the host's
    /// default implementation run; dropping it ends the chain with this
    /// callback's result.
    pub next: Next,
    /// The computed single-instance flag.
    pub single_instance: bool,
}

impl FromInvocation for OnCx {
    fn from_invocation(invocation: &Invocation) -> Result<Self, HookError> {
        let next = invocation
            .params
            .continuation()
            .cloned()
            .ok_or(DispatchError::MissingContext {
                what: "continuation",
            })?;
        Ok(OnCx {
            request: invocation.request.clone(),
            next,
            single_instance: invocation.single_instance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamBinding, ResolveCx, resolve};
    use solder_core::{CrudEvent, Request};

    fn invocation_with(specs: &[ParamBinding], result: Option<AfterResult>) -> Invocation {
        let request = Request::builder(CrudEvent::Delete, "CatalogService.Books")
            .key("ID", 4)
            .build();
        let next = Next::new(|| Box::pin(async { Ok(None) }));
        let cx = ResolveCx {
            request: &request,
            result: result.as_ref(),
            next: Some(&next),
            single_instance: true,
        };
        Invocation {
            request: request.clone(),
            single_instance: true,
            params: resolve(specs, &cx).unwrap(),
        }
    }

    #[test]
    fn test_after_cx_needs_result_param() {
        let invocation = invocation_with(&[ParamBinding::Request], None);
        let err = AfterCx::from_invocation(&invocation).unwrap_err();
        assert!(err.to_string().contains("result"));
    }

    #[test]
    fn test_after_cx_carries_normalized_result() {
        let invocation = invocation_with(
            &[
                ParamBinding::Result,
                ParamBinding::Request,
                ParamBinding::SingleInstance,
            ],
            Some(AfterResult::Deleted(true)),
        );
        let cx = AfterCx::from_invocation(&invocation).unwrap();
        assert_eq!(cx.result, AfterResult::Deleted(true));
        assert!(cx.single_instance);
    }

    #[tokio::test]
    async fn test_on_cx_exposes_continuation() {
        let invocation = invocation_with(
            &[ParamBinding::Request, ParamBinding::Continuation],
            None,
        );
        let cx = OnCx::from_invocation(&invocation).unwrap();
        assert_eq!(cx.next.proceed().await.unwrap(), None);
    }
}
