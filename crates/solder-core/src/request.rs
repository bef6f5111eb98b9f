//! The request object handed to hooks.
//!
//! A [`Request`] is the dispatch layer's view of one host-framework event:
//! the write payload, the addressed key values, the parsed query shape, the
//! authenticated principal, locale and bearer token. Hosts construct it via
//! [`Request::builder`] and hand out a shared [`RequestRef`]; handler code
//! only reads from it, except for [`Request::notify`], which records
//! notifications for the host to flush into its response.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::event::CrudEvent;

/// Shared handle to a request.
pub type RequestRef = Arc<Request>;

// ============================================================================
// Query Shape
// ============================================================================

/// Clauses of the parsed query a handler can probe for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryClause {
    /// An explicit column projection.
    Columns,
    /// A filter condition.
    Where,
    /// An ordering clause.
    OrderBy,
    /// A row limit.
    Limit,
    /// Duplicate elimination.
    Distinct,
}

/// Shape metadata of the parsed query behind a request.
///
/// Only presence information and the projected column names are modelled;
/// the dispatch layer never interprets filter expressions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryShape {
    /// Projected column names, empty when the query selects all fields.
    pub columns: Vec<String>,
    /// Whether the query carries a filter condition.
    pub where_present: bool,
    /// Whether the query carries an ordering clause.
    pub order_by_present: bool,
    /// Row limit, if one was requested.
    pub limit: Option<u64>,
    /// Whether duplicate elimination was requested.
    pub distinct: bool,
}

impl QueryShape {
    /// Whether the named clause appears in the query.
    pub fn has_clause(&self, clause: QueryClause) -> bool {
        match clause {
            QueryClause::Columns => !self.columns.is_empty(),
            QueryClause::Where => self.where_present,
            QueryClause::OrderBy => self.order_by_present,
            QueryClause::Limit => self.limit.is_some(),
            QueryClause::Distinct => self.distinct,
        }
    }
}

// ============================================================================
// Principal
// ============================================================================

/// The authenticated user behind a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// User identifier.
    pub id: String,
    /// Role names granted to the user.
    pub roles: Vec<String>,
}

impl Principal {
    /// A named principal with the given roles.
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Principal {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// The unauthenticated principal.
    pub fn anonymous() -> Self {
        Principal {
            id: "anonymous".to_string(),
            roles: Vec::new(),
        }
    }

    /// Whether the principal holds the named role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Whether the principal holds any of the named roles.
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.has_role(r.as_ref()))
    }
}

impl Default for Principal {
    fn default() -> Self {
        Principal::anonymous()
    }
}

// ============================================================================
// Notices
// ============================================================================

/// A notification recorded by handler code for the host response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Optional status code attached to the notification.
    pub code: Option<u16>,
    /// Human-readable message.
    pub message: String,
}

// ============================================================================
// Request
// ============================================================================

/// One host-framework event as seen by handler code.
#[derive(Debug)]
pub struct Request {
    event: CrudEvent,
    entity: String,
    data: Value,
    keys: BTreeMap<String, Value>,
    query: QueryShape,
    principal: Principal,
    locale: Option<String>,
    token: Option<String>,
    notices: Mutex<Vec<Notice>>,
}

impl Request {
    /// Starts building a request for the given event and target entity name.
    pub fn builder(event: CrudEvent, entity: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            event,
            entity: entity.into(),
            data: Value::Null,
            keys: BTreeMap::new(),
            query: QueryShape::default(),
            principal: Principal::anonymous(),
            locale: None,
            token: None,
        }
    }

    /// The event this request was dispatched for.
    pub fn event(&self) -> CrudEvent {
        self.event
    }

    /// Name of the addressed entity (the draft variant name for draft
    /// requests).
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The write payload. `Null` for requests without one, an array for
    /// bulk writes.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// A named field of the write payload, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Key values addressed by the request path.
    pub fn keys(&self) -> &BTreeMap<String, Value> {
        &self.keys
    }

    /// Shape metadata of the parsed query.
    pub fn query(&self) -> &QueryShape {
        &self.query
    }

    /// The authenticated principal.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Locale tag negotiated for the request, if any.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Raw bearer token of the request, if one was presented.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether the named field appears in the write payload or in the
    /// query's column projection.
    ///
    /// For bulk (array) payloads the field counts as supplied when any
    /// element carries it.
    pub fn column_supplied(&self, field: &str) -> bool {
        let in_payload = match &self.data {
            Value::Object(map) => map.contains_key(field),
            Value::Array(rows) => rows
                .iter()
                .any(|row| matches!(row, Value::Object(map) if map.contains_key(field))),
            _ => false,
        };
        in_payload || self.query.columns.iter().any(|c| c == field)
    }

    /// Whether the named clause appears in the parsed query.
    pub fn clause_present(&self, clause: QueryClause) -> bool {
        self.query.has_clause(clause)
    }

    /// Whether the addressed key values cover every field in `keys`.
    ///
    /// An empty key set never addresses a single instance.
    pub fn addresses_all_keys<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        !keys.is_empty()
            && keys
                .iter()
                .all(|field| self.keys.contains_key(field.as_ref()))
    }

    /// Records a notification message for the host response.
    pub fn notify(&self, message: impl Into<String>) {
        self.push_notice(None, message.into());
    }

    /// Records a notification with a status code.
    pub fn notify_status(&self, code: u16, message: impl Into<String>) {
        self.push_notice(Some(code), message.into());
    }

    /// All notifications recorded so far, in order.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    fn push_notice(&self, code: Option<u16>, message: String) {
        debug!(entity = %self.entity, ?code, %message, "Request notice recorded");
        self.notices.lock().push(Notice { code, message });
    }
}

/// Fluent builder for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    event: CrudEvent,
    entity: String,
    data: Value,
    keys: BTreeMap<String, Value>,
    query: QueryShape,
    principal: Principal,
    locale: Option<String>,
    token: Option<String>,
}

impl RequestBuilder {
    /// Sets the write payload.
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Adds an addressed key value.
    pub fn key(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keys.insert(field.into(), value.into());
        self
    }

    /// Adds a projected column to the query shape.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.query.columns.push(name.into());
        self
    }

    /// Marks the query as carrying a filter condition.
    pub fn with_where(mut self) -> Self {
        self.query.where_present = true;
        self
    }

    /// Marks the query as carrying an ordering clause.
    pub fn with_order_by(mut self) -> Self {
        self.query.order_by_present = true;
        self
    }

    /// Sets the query's row limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Marks the query as requesting duplicate elimination.
    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self
    }

    /// Sets the authenticated principal.
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = principal;
        self
    }

    /// Sets the locale tag.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Sets the bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Finalizes the request.
    pub fn build(self) -> RequestRef {
        Arc::new(Request {
            event: self.event,
            entity: self.entity,
            data: self.data,
            keys: self.keys,
            query: self.query,
            principal: self.principal,
            locale: self.locale,
            token: self.token,
            notices: Mutex::new(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_supplied_checks_payload_and_projection() {
        let request = Request::builder(CrudEvent::Update, "CatalogService.Books")
            .data(json!({"title": "X"}))
            .column("price")
            .build();
        assert!(request.column_supplied("title"));
        assert!(request.column_supplied("price"));
        assert!(!request.column_supplied("stock"));
    }

    #[test]
    fn test_column_supplied_scans_bulk_payloads() {
        let request = Request::builder(CrudEvent::Create, "CatalogService.Books")
            .data(json!([{"title": "A"}, {"stock": 3}]))
            .build();
        assert!(request.column_supplied("stock"));
        assert!(!request.column_supplied("price"));
    }

    #[test]
    fn test_addresses_all_keys() {
        let request = Request::builder(CrudEvent::Read, "AdminService.Books")
            .key("ID", 17)
            .build();
        assert!(request.addresses_all_keys(&["ID"]));
        assert!(!request.addresses_all_keys(&["ID", "Edition"]));
        let empty: [&str; 0] = [];
        assert!(!request.addresses_all_keys(&empty));
    }

    #[test]
    fn test_clause_presence() {
        let request = Request::builder(CrudEvent::Read, "CatalogService.Books")
            .column("title")
            .with_where()
            .limit(10)
            .build();
        assert!(request.clause_present(QueryClause::Columns));
        assert!(request.clause_present(QueryClause::Where));
        assert!(request.clause_present(QueryClause::Limit));
        assert!(!request.clause_present(QueryClause::OrderBy));
        assert!(!request.clause_present(QueryClause::Distinct));
    }

    #[test]
    fn test_notices_record_in_order() {
        let request = Request::builder(CrudEvent::Create, "CatalogService.Reviews").build();
        request.notify("created");
        request.notify_status(201, "with code");
        let notices = request.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].code, None);
        assert_eq!(notices[1].code, Some(201));
        assert_eq!(notices[1].message, "with code");
    }

    #[test]
    fn test_principal_roles() {
        let principal = Principal::new("alice", ["reviewer", "admin"]);
        assert!(principal.has_role("admin"));
        assert!(!principal.has_role("auditor"));
        assert!(principal.has_any_role(&["auditor", "reviewer"]));
        assert!(!Principal::anonymous().has_any_role(&["reviewer"]));
    }
}
