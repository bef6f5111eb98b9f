//! Field predicates and validation rules.
//!
//! A [`ValidationRule`] ties one [`Predicate`] to one field of the
//! request's write payload. Rules attached to a descriptor run in declared
//! order immediately before the callback; the first failing rule rejects
//! the invocation with a [`ValidationError`] and the callback never runs.
//!
//! Predicates operate on the canonical string form of scalar values
//! (numbers and booleans are stringified). Missing fields, nulls, arrays
//! and objects fail every predicate.
//!
//! [`ValidationError`]: solder_core::ValidationError

use serde_json::Value;

use solder_core::{RequestRef, ValidationError};

// ============================================================================
// Predicates
// ============================================================================

/// Value predicate of a validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The value equals its lowercase form.
    IsLowercase,
    /// The value equals its uppercase form.
    IsUppercase,
    /// Every character is alphanumeric; empty fails.
    IsAlphanumeric,
    /// The value parses as a number.
    IsNumeric,
    /// The trimmed value is non-empty.
    NotEmpty,
    /// The value starts with the given prefix.
    StartsWith {
        /// Required prefix.
        prefix: String,
    },
    /// The value ends with the given suffix.
    EndsWith {
        /// Required suffix.
        suffix: String,
    },
    /// The value contains the given substring.
    Contains {
        /// Required substring.
        needle: String,
    },
    /// The character count lies within the given bounds.
    IsLength {
        /// Minimum length, inclusive.
        min: Option<usize>,
        /// Maximum length, inclusive.
        max: Option<usize>,
    },
}

impl Predicate {
    /// Canonical predicate name used in rejection errors.
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::IsLowercase => "isLowercase",
            Predicate::IsUppercase => "isUppercase",
            Predicate::IsAlphanumeric => "isAlphanumeric",
            Predicate::IsNumeric => "isNumeric",
            Predicate::NotEmpty => "notEmpty",
            Predicate::StartsWith { .. } => "startsWith",
            Predicate::EndsWith { .. } => "endsWith",
            Predicate::Contains { .. } => "contains",
            Predicate::IsLength { .. } => "isLength",
        }
    }

    /// Evaluates the predicate against a payload value.
    pub fn check(&self, value: &Value) -> bool {
        let Some(text) = canonical_text(value) else {
            return false;
        };
        match self {
            Predicate::IsLowercase => text == text.to_lowercase(),
            Predicate::IsUppercase => text == text.to_uppercase(),
            Predicate::IsAlphanumeric => {
                !text.is_empty() && text.chars().all(char::is_alphanumeric)
            }
            Predicate::IsNumeric => text.parse::<f64>().is_ok(),
            Predicate::NotEmpty => !text.trim().is_empty(),
            Predicate::StartsWith { prefix } => text.starts_with(prefix.as_str()),
            Predicate::EndsWith { suffix } => text.ends_with(suffix.as_str()),
            Predicate::Contains { needle } => text.contains(needle.as_str()),
            Predicate::IsLength { min, max } => {
                let len = text.chars().count();
                min.is_none_or(|m| len >= m) && max.is_none_or(|m| len <= m)
            }
        }
    }
}

fn canonical_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ============================================================================
// Rules
// ============================================================================

/// One field validation attached to a descriptor.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    /// The validated payload field.
    pub field: String,
    /// The predicate to evaluate.
    pub predicate: Predicate,
}

impl ValidationRule {
    /// Builds a rule checking `predicate` against `field`.
    pub fn new(predicate: Predicate, field: impl Into<String>) -> Self {
        ValidationRule {
            field: field.into(),
            predicate,
        }
    }
}

/// Runs rules in declared order; the first failure wins.
pub(crate) fn check_rules(
    rules: &[ValidationRule],
    request: &RequestRef,
) -> Result<(), ValidationError> {
    for rule in rules {
        let value = request.field(&rule.field).unwrap_or(&Value::Null);
        if !rule.predicate.check(value) {
            return Err(ValidationError::new(
                rule.field.clone(),
                rule.predicate.name(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solder_core::{CrudEvent, Request};

    #[test]
    fn test_case_predicates() {
        assert!(Predicate::IsLowercase.check(&json!("hello 123")));
        assert!(!Predicate::IsLowercase.check(&json!("HELLO")));
        assert!(Predicate::IsUppercase.check(&json!("COMMENT: OK")));
        assert!(!Predicate::IsUppercase.check(&json!("Comment")));
    }

    #[test]
    fn test_shape_predicates() {
        assert!(Predicate::IsAlphanumeric.check(&json!("abc123")));
        assert!(!Predicate::IsAlphanumeric.check(&json!("abc 123")));
        assert!(!Predicate::IsAlphanumeric.check(&json!("")));
        assert!(Predicate::IsNumeric.check(&json!("12.5")));
        assert!(Predicate::IsNumeric.check(&json!(42)));
        assert!(!Predicate::IsNumeric.check(&json!("12 apples")));
        assert!(Predicate::NotEmpty.check(&json!("x")));
        assert!(!Predicate::NotEmpty.check(&json!("   ")));
    }

    #[test]
    fn test_affix_predicates() {
        let starts = Predicate::StartsWith {
            prefix: "COMMENT:".to_string(),
        };
        assert!(starts.check(&json!("COMMENT: fine")));
        assert!(!starts.check(&json!("fine")));

        let ends = Predicate::EndsWith {
            suffix: "N".to_string(),
        };
        assert!(ends.check(&json!("OPEN")));
        assert!(!ends.check(&json!("CLOSED")));

        let contains = Predicate::Contains {
            needle: "review".to_string(),
        };
        assert!(contains.check(&json!("in review today")));
    }

    #[test]
    fn test_length_bounds() {
        let rule = Predicate::IsLength {
            min: Some(5),
            max: None,
        };
        assert!(rule.check(&json!("12345")));
        assert!(!rule.check(&json!("1234")));

        let bounded = Predicate::IsLength {
            min: Some(2),
            max: Some(4),
        };
        assert!(bounded.check(&json!("abc")));
        assert!(!bounded.check(&json!("abcde")));
    }

    #[test]
    fn test_non_scalars_fail() {
        assert!(!Predicate::NotEmpty.check(&Value::Null));
        assert!(!Predicate::IsLowercase.check(&json!(["a"])));
        assert!(!Predicate::IsLowercase.check(&json!({"a": 1})));
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let request = Request::builder(CrudEvent::Create, "CatalogService.Reviews")
            .data(json!({"comment": "HELLO", "rating": "abc"}))
            .build();
        let rules = vec![
            ValidationRule::new(Predicate::IsLowercase, "comment"),
            ValidationRule::new(Predicate::IsNumeric, "rating"),
        ];
        let err = check_rules(&rules, &request).unwrap_err();
        assert_eq!(err.field, "comment");
        assert_eq!(err.predicate, "isLowercase");
    }

    #[test]
    fn test_missing_field_fails_its_rule() {
        let request = Request::builder(CrudEvent::Create, "CatalogService.Reviews")
            .data(json!({}))
            .build();
        let rules = vec![ValidationRule::new(Predicate::NotEmpty, "comment")];
        let err = check_rules(&rules, &request).unwrap_err();
        assert_eq!(err.field, "comment");
        assert_eq!(err.predicate, "notEmpty");
    }

    #[test]
    fn test_passing_rules() {
        let request = Request::builder(CrudEvent::Create, "CatalogService.Reviews")
            .data(json!({"comment": "ok", "stars": 5}))
            .build();
        let rules = vec![
            ValidationRule::new(Predicate::IsLowercase, "comment"),
            ValidationRule::new(Predicate::IsNumeric, "stars"),
        ];
        assert!(check_rules(&rules, &request).is_ok());
    }
}
