//! Result payload shapes for after hooks.
//!
//! Hosts report the outcome of an event's implementation in one of three
//! shapes ([`ResultPayload`]); the dispatcher normalizes that into the
//! [`AfterResult`] handed to after-hook callbacks. The normalization is a
//! fixed two-way branch: a bare row count (the host's DELETE convention)
//! becomes a deletion flag, everything else passes through unchanged. A
//! row sequence is never collapsed, even when it holds exactly one row or
//! none; the single-instance flag on the invocation distinguishes intent.

use serde_json::Value;

/// Outcome of an event's implementation as the host reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPayload {
    /// Number of affected rows, the host's convention for DELETE.
    Count(i64),
    /// The rows produced by the implementation.
    Rows(Vec<Value>),
    /// A single non-sequence result.
    Single(Value),
}

/// Normalized result handed to after-hook callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum AfterResult {
    /// Whether exactly one row was deleted.
    Deleted(bool),
    /// Row sequence, passed through unchanged.
    Rows(Vec<Value>),
    /// Single result, passed through unchanged.
    Single(Value),
}

impl AfterResult {
    /// The deletion flag, if this is a normalized count.
    pub fn deleted(&self) -> Option<bool> {
        match self {
            AfterResult::Deleted(flag) => Some(*flag),
            _ => None,
        }
    }

    /// The row sequence, if the implementation produced one.
    pub fn rows(&self) -> Option<&[Value]> {
        match self {
            AfterResult::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// The single result value, if the implementation produced one.
    pub fn single(&self) -> Option<&Value> {
        match self {
            AfterResult::Single(value) => Some(value),
            _ => None,
        }
    }
}

impl From<ResultPayload> for AfterResult {
    fn from(payload: ResultPayload) -> Self {
        match payload {
            ResultPayload::Count(n) => AfterResult::Deleted(n == 1),
            ResultPayload::Rows(rows) => AfterResult::Rows(rows),
            ResultPayload::Single(value) => AfterResult::Single(value),
        }
    }
}
