//! Parameter bindings and their resolution.
//!
//! A descriptor carries an ordered sequence of [`ParamBinding`] specs; at
//! invocation time the resolver turns them into the ordered [`ParamValue`]
//! sequence ([`Params`]) the callback sees. Availability is checked at
//! registration: [`ParamBinding::Result`] only resolves in `after` hooks
//! and [`ParamBinding::Continuation`] only in `on` hooks, so a binding/kind
//! mismatch is a [`ConfigurationError`] long before traffic arrives.
//!
//! [`ConfigurationError`]: solder_core::ConfigurationError

use std::fmt;
use std::sync::Arc;

use solder_core::{AfterResult, HookError, HookKind, Next, QueryClause, RequestRef};

use crate::error::DispatchError;

// ============================================================================
// Binding Specs
// ============================================================================

/// Declarative description of one callback parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamBinding {
    /// The request itself.
    Request,
    /// The normalized after-hook result.
    Result,
    /// The continuation for the rest of the `on` chain.
    Continuation,
    /// The computed single-instance flag.
    SingleInstance,
    /// Whether the named field appears in the write payload or column
    /// projection.
    ColumnSupplied {
        /// Field name to probe for.
        field: String,
    },
    /// Whether the named clause appears in the parsed query.
    ClausePresent {
        /// Clause to probe for.
        clause: QueryClause,
    },
    /// Whether the principal holds any of the named roles.
    HasRole {
        /// Accepted role names.
        roles: Vec<String>,
    },
    /// The request's locale tag.
    Locale,
    /// The request's raw bearer token.
    AuthToken,
}

impl ParamBinding {
    /// Whether this binding can resolve in hooks of the given kind.
    pub fn available_in(&self, kind: HookKind) -> bool {
        match self {
            ParamBinding::Result => kind == HookKind::After,
            ParamBinding::Continuation => kind == HookKind::On,
            _ => true,
        }
    }
}

impl fmt::Display for ParamBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamBinding::Request => "Request",
            ParamBinding::Result => "Result",
            ParamBinding::Continuation => "Continuation",
            ParamBinding::SingleInstance => "SingleInstance",
            ParamBinding::ColumnSupplied { .. } => "ColumnSupplied",
            ParamBinding::ClausePresent { .. } => "ClausePresent",
            ParamBinding::HasRole { .. } => "HasRole",
            ParamBinding::Locale => "Locale",
            ParamBinding::AuthToken => "AuthToken",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Resolved Values
// ============================================================================

/// One resolved callback parameter.
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// The request.
    Request(RequestRef),
    /// The normalized after-hook result.
    Result(AfterResult),
    /// The chain continuation.
    Continuation(Next),
    /// A resolved boolean probe.
    Flag(bool),
    /// A resolved optional text value.
    Text(Option<String>),
}

/// Ordered resolved parameters of one invocation.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: Vec<ParamValue>,
}

impl Params {
    /// Number of resolved parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameters were resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The parameter at `index`.
    pub fn get(&self, index: usize) -> Option<&ParamValue> {
        self.values.get(index)
    }

    /// The first resolved request, if any.
    pub fn request(&self) -> Option<&RequestRef> {
        self.values.iter().find_map(|v| match v {
            ParamValue::Request(request) => Some(request),
            _ => None,
        })
    }

    /// The first resolved after-result, if any.
    pub fn result(&self) -> Option<&AfterResult> {
        self.values.iter().find_map(|v| match v {
            ParamValue::Result(result) => Some(result),
            _ => None,
        })
    }

    /// The first resolved continuation, if any.
    pub fn continuation(&self) -> Option<&Next> {
        self.values.iter().find_map(|v| match v {
            ParamValue::Continuation(next) => Some(next),
            _ => None,
        })
    }

    /// The flag at `index`, if that parameter resolved to a boolean.
    pub fn flag_at(&self, index: usize) -> Option<bool> {
        match self.values.get(index)? {
            ParamValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// The text at `index`, if that parameter resolved to a text value.
    pub fn text_at(&self, index: usize) -> Option<Option<&str>> {
        match self.values.get(index)? {
            ParamValue::Text(text) => Some(text.as_deref()),
            _ => None,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Live context a hook shim resolves parameters from.
pub(crate) struct ResolveCx<'a> {
    pub request: &'a RequestRef,
    pub result: Option<&'a AfterResult>,
    pub next: Option<&'a Next>,
    pub single_instance: bool,
}

/// Resolves an ordered spec sequence against the live context.
pub(crate) fn resolve(specs: &[ParamBinding], cx: &ResolveCx<'_>) -> Result<Params, HookError> {
    let mut values = Vec::with_capacity(specs.len());
    for spec in specs {
        let value = match spec {
            ParamBinding::Request => ParamValue::Request(Arc::clone(cx.request)),
            ParamBinding::Result => {
                ParamValue::Result(cx.result.cloned().ok_or_else(|| unavailable(spec))?)
            }
            ParamBinding::Continuation => {
                ParamValue::Continuation(cx.next.cloned().ok_or_else(|| unavailable(spec))?)
            }
            ParamBinding::SingleInstance => ParamValue::Flag(cx.single_instance),
            ParamBinding::ColumnSupplied { field } => {
                ParamValue::Flag(cx.request.column_supplied(field))
            }
            ParamBinding::ClausePresent { clause } => {
                ParamValue::Flag(cx.request.clause_present(*clause))
            }
            ParamBinding::HasRole { roles } => {
                ParamValue::Flag(cx.request.principal().has_any_role(roles))
            }
            ParamBinding::Locale => ParamValue::Text(cx.request.locale().map(str::to_owned)),
            ParamBinding::AuthToken => ParamValue::Text(cx.request.token().map(str::to_owned)),
        };
        values.push(value);
    }
    Ok(Params { values })
}

fn unavailable(spec: &ParamBinding) -> HookError {
    DispatchError::ParamUnavailable {
        binding: spec.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use solder_core::{CrudEvent, Principal, Request};

    fn sample_request() -> RequestRef {
        Request::builder(CrudEvent::Update, "CatalogService.Books")
            .data(json!({"title": "X", "price": 12}))
            .column("stock")
            .with_where()
            .principal(Principal::new("alice", ["reviewer"]))
            .locale("de")
            .token("bearer-token")
            .build()
    }

    #[test]
    fn test_resolves_probe_bindings() {
        let request = sample_request();
        let cx = ResolveCx {
            request: &request,
            result: None,
            next: None,
            single_instance: true,
        };
        let specs = vec![
            ParamBinding::Request,
            ParamBinding::SingleInstance,
            ParamBinding::ColumnSupplied {
                field: "price".to_string(),
            },
            ParamBinding::ColumnSupplied {
                field: "missing".to_string(),
            },
            ParamBinding::ClausePresent {
                clause: QueryClause::Where,
            },
            ParamBinding::HasRole {
                roles: vec!["admin".to_string(), "reviewer".to_string()],
            },
            ParamBinding::Locale,
            ParamBinding::AuthToken,
        ];
        let params = resolve(&specs, &cx).unwrap();
        assert_eq!(params.len(), 8);
        assert!(params.request().is_some());
        assert_eq!(params.flag_at(1), Some(true));
        assert_eq!(params.flag_at(2), Some(true));
        assert_eq!(params.flag_at(3), Some(false));
        assert_eq!(params.flag_at(4), Some(true));
        assert_eq!(params.flag_at(5), Some(true));
        assert_eq!(params.text_at(6), Some(Some("de")));
        assert_eq!(params.text_at(7), Some(Some("bearer-token")));
    }

    #[test]
    fn test_result_binding_needs_after_context() {
        let request = sample_request();
        let cx = ResolveCx {
            request: &request,
            result: None,
            next: None,
            single_instance: false,
        };
        let err = resolve(&[ParamBinding::Result], &cx).unwrap_err();
        assert!(err.to_string().contains("Result"));
    }

    #[test]
    fn test_result_and_continuation_resolve_when_present() {
        let request = sample_request();
        let result = AfterResult::Rows(vec![json!({"ID": 1})]);
        let next = Next::new(|| Box::pin(async { Ok(Some(Value::from("end"))) }));
        let cx = ResolveCx {
            request: &request,
            result: Some(&result),
            next: Some(&next),
            single_instance: false,
        };
        let params = resolve(
            &[ParamBinding::Result, ParamBinding::Continuation],
            &cx,
        )
        .unwrap();
        assert_eq!(params.result(), Some(&AfterResult::Rows(vec![json!({"ID": 1})])));
        assert!(params.continuation().is_some());
    }

    #[test]
    fn test_availability_table() {
        assert!(ParamBinding::Result.available_in(HookKind::After));
        assert!(!ParamBinding::Result.available_in(HookKind::Before));
        assert!(!ParamBinding::Result.available_in(HookKind::On));
        assert!(ParamBinding::Continuation.available_in(HookKind::On));
        assert!(!ParamBinding::Continuation.available_in(HookKind::After));
        assert!(ParamBinding::Locale.available_in(HookKind::Before));
        assert!(ParamBinding::SingleInstance.available_in(HookKind::On));
    }
}
