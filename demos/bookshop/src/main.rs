//! Bookshop Demo
//!
//! A self-contained walkthrough of Solder against the in-memory host.
//! Two handler classes observe a catalog and an admin service, covering
//! validation, middleware, the draft flow and bound/unbound actions.
//!
//! # Services
//!
//! ```text
//! CatalogService.Books   read-facing: discount notices, submitOrder, addRating
//! AdminService.Books     draft-enabled editing and stock bookkeeping
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package bookshop
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{info, warn};

use solder::prelude::*;
use solder::runtime::LoggingBuilder;

// ============================================================================
// Entities
// ============================================================================

fn catalog_books() -> EntityRef {
    EntityDef::builder("CatalogService.Books")
        .key("ID")
        .action("addRating")
        .build()
}

fn admin_books() -> EntityRef {
    EntityDef::builder("AdminService.Books")
        .key("ID")
        .with_drafts()
        .build()
}

// ============================================================================
// Shared Repository
// ============================================================================

#[derive(Debug, Clone)]
struct Book {
    title: String,
    stock: i64,
    ratings: Vec<i64>,
}

/// In-memory book store shared by both handler classes through the
/// injector.
#[derive(Clone, Default)]
struct BookRepository {
    books: Arc<Mutex<BTreeMap<i64, Book>>>,
}

impl BookRepository {
    fn insert(&self, id: i64, title: &str, stock: i64) {
        self.books.lock().insert(
            id,
            Book {
                title: title.to_string(),
                stock,
                ratings: Vec::new(),
            },
        );
    }

    fn has_title(&self, title: &str) -> bool {
        self.books.lock().values().any(|book| book.title == title)
    }

    fn rows(&self) -> Vec<Value> {
        self.books
            .lock()
            .iter()
            .map(|(id, book)| json!({"ID": id, "title": book.title, "stock": book.stock}))
            .collect()
    }

    /// Takes `quantity` units off the shelf, returning the remaining
    /// stock. `None` means the book is unknown or under-stocked.
    fn reduce_stock(&self, id: i64, quantity: i64) -> Option<i64> {
        let mut books = self.books.lock();
        let book = books.get_mut(&id)?;
        if book.stock < quantity {
            return None;
        }
        book.stock -= quantity;
        Some(book.stock)
    }

    /// Records a rating and returns the new average.
    fn add_rating(&self, id: i64, stars: i64) -> Option<f64> {
        let mut books = self.books.lock();
        let book = books.get_mut(&id)?;
        book.ratings.push(stars);
        let total: i64 = book.ratings.iter().sum();
        Some(total as f64 / book.ratings.len() as f64)
    }

    fn remove(&self, id: i64) -> bool {
        self.books.lock().remove(&id).is_some()
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Times every invocation crossing the catalog pipeline.
struct RequestTimer;

#[async_trait]
impl Middleware for RequestTimer {
    fn name(&self) -> &str {
        "request-timer"
    }

    async fn handle(&self, invocation: Invocation, next: PipelineNext) -> HookResult {
        let event = invocation.request.event();
        let entity = invocation.request.entity().to_string();
        let started = Instant::now();
        let outcome = next.run(invocation).await;
        info!(%event, entity, elapsed = ?started.elapsed(), "Pipeline completed");
        outcome
    }
}

// ============================================================================
// Catalog Handlers
// ============================================================================

/// Read-side handlers for the public catalog.
struct CatalogHandler {
    repository: BookRepository,
    service: ServiceHandle,
}

impl HandlerSet for CatalogHandler {
    fn describe(builder: &mut ClassBuilder<Self>) {
        builder.entity(catalog_books());
        builder.middleware(RequestTimer);
        builder.after(CrudEvent::Read).handle(Self::grant_discounts);
        builder
            .on_action("submitOrder")
            .validate(Predicate::IsNumeric, "quantity")
            .handle(Self::submit_order);
        builder
            .bound_action("addRating")
            .single_instance()
            .validate(Predicate::IsNumeric, "stars")
            .handle(Self::add_rating);
    }

    fn build(injector: &Injector) -> Result<Self, ConfigurationError> {
        Ok(CatalogHandler {
            repository: injector.require()?,
            service: injector.service()?,
        })
    }
}

impl CatalogHandler {
    /// Flags overstocked titles with a discount notice.
    async fn grant_discounts(self: Arc<Self>, cx: AfterCx) {
        if let Some(rows) = cx.result.rows() {
            for row in rows {
                let stock = row.get("stock").and_then(Value::as_i64).unwrap_or(0);
                if stock > 111 {
                    let title = row.get("title").and_then(Value::as_str).unwrap_or("?");
                    cx.request.notify(format!("{title} -- 11% discount!"));
                }
            }
        }
    }

    /// Fulfils an order, reducing stock and emitting `OrderedBook`.
    async fn submit_order(self: Arc<Self>, cx: OnCx) -> HookResult {
        let Some(id) = cx.request.field("book").and_then(Value::as_i64) else {
            return Err("order names no book".into());
        };
        let quantity = cx
            .request
            .field("quantity")
            .and_then(Value::as_i64)
            .unwrap_or(0);

        let left = self
            .repository
            .reduce_stock(id, quantity)
            .ok_or_else(|| format!("book {id} is sold out"))?;
        self.service
            .emit("OrderedBook", json!({"book": id, "quantity": quantity}))
            .await?;

        info!(book = id, quantity, stock = left, "Order accepted");
        Ok(Some(json!({"stock": left})))
    }

    /// Records a rating and answers with the new average.
    async fn add_rating(self: Arc<Self>, cx: OnCx) -> HookResult {
        if !cx.single_instance {
            return Err("addRating must address one book".into());
        }
        let id = cx
            .request
            .keys()
            .get("ID")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let stars = cx
            .request
            .field("stars")
            .and_then(Value::as_i64)
            .unwrap_or(0);

        match self.repository.add_rating(id, stars) {
            Some(average) => Ok(Some(json!({"average": average}))),
            None => Err(format!("no book with ID {id}").into()),
        }
    }
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// Write-side handlers for the admin service, including the draft flow.
struct AdminHandler {
    repository: BookRepository,
}

impl HandlerSet for AdminHandler {
    fn describe(builder: &mut ClassBuilder<Self>) {
        builder.entity(admin_books());
        builder
            .before(CrudEvent::Create)
            .validate(Predicate::NotEmpty, "title")
            .handle(Self::check_new_book);
        builder.on(CrudEvent::Create).handle(Self::create_book);
        builder
            .before(CrudEvent::Update)
            .draft()
            .handle(Self::check_draft_change);
        builder.on_new_draft().handle(Self::draft_opened);
        builder.on_save_draft().handle(Self::draft_saved);
        builder
            .after(CrudEvent::Delete)
            .single_instance()
            .handle(Self::confirm_removal);
    }

    fn build(injector: &Injector) -> Result<Self, ConfigurationError> {
        Ok(AdminHandler {
            repository: injector.require()?,
        })
    }
}

impl AdminHandler {
    /// Rejects duplicate titles before the create runs.
    async fn check_new_book(self: Arc<Self>, cx: BeforeCx) -> HookResult {
        let title = cx
            .request
            .field("title")
            .and_then(Value::as_str)
            .unwrap_or("");
        if self.repository.has_title(title) {
            return Err(format!("\"{title}\" already exists").into());
        }
        Ok(None)
    }

    /// Stores the new book, then lets the host default run.
    async fn create_book(self: Arc<Self>, cx: OnCx) -> HookResult {
        let id = cx
            .request
            .field("ID")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let title = cx
            .request
            .field("title")
            .and_then(Value::as_str)
            .unwrap_or("untitled");
        let stock = cx
            .request
            .field("stock")
            .and_then(Value::as_i64)
            .unwrap_or(0);

        self.repository.insert(id, title, stock);
        info!(id, title, "Book created");
        cx.next.proceed().await
    }

    async fn check_draft_change(self: Arc<Self>, cx: BeforeCx) {
        if cx.request.field("stock").is_some() {
            cx.request.notify("stock changes go live on save");
        }
    }

    async fn draft_opened(self: Arc<Self>, cx: OnCx) -> HookResult {
        info!(entity = cx.request.entity(), "Draft opened");
        cx.next.proceed().await
    }

    async fn draft_saved(self: Arc<Self>, cx: OnCx) -> HookResult {
        let id = cx
            .request
            .keys()
            .get("ID")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        info!(id, "Draft saved, changes are live");
        cx.next.proceed().await
    }

    async fn confirm_removal(self: Arc<Self>, cx: AfterCx) {
        match cx.result.deleted() {
            Some(true) => info!("Book removed"),
            _ => warn!("Delete did not remove exactly one book"),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    LoggingBuilder::new()
        .directive("bookshop=info")
        .directive("solder_framework=info")
        .init();

    let service = MemoryService::new();
    let dispatcher = Dispatcher::new(vec![
        HandlerClass::of::<CatalogHandler>(),
        HandlerClass::of::<AdminHandler>(),
    ]);

    let repository = BookRepository::default();
    repository.insert(201, "Wuthering Heights", 12);
    repository.insert(252, "Eleonora", 555);
    dispatcher.injector().bind(repository.clone());

    dispatcher.register_all(&service.handle())?;
    info!(hooks = service.registration_count(), "Handlers wired");

    // ------------------------------------------------------------------------
    // Catalog reads
    // ------------------------------------------------------------------------

    let read = Request::builder(CrudEvent::Read, "CatalogService.Books").build();
    service
        .dispatch(
            CrudEvent::Read,
            &catalog_books(),
            Arc::clone(&read),
            ResultPayload::Rows(repository.rows()),
        )
        .await
        .map_err(anyhow::Error::from_boxed)?;
    for notice in read.notices() {
        info!(notice = notice.message, "Catalog notice");
    }

    // ------------------------------------------------------------------------
    // Orders and ratings
    // ------------------------------------------------------------------------

    let order = Request::builder(CrudEvent::Action, "CatalogService")
        .data(json!({"book": 252, "quantity": 3}))
        .build();
    let outcome = service
        .call_action("submitOrder", order)
        .await
        .map_err(anyhow::Error::from_boxed)?;
    info!(?outcome, "submitOrder");

    let oversized = Request::builder(CrudEvent::Action, "CatalogService")
        .data(json!({"book": 201, "quantity": 999}))
        .build();
    if let Err(err) = service.call_action("submitOrder", oversized).await {
        warn!(%err, "Order rejected");
    }

    let junk = Request::builder(CrudEvent::Action, "CatalogService")
        .data(json!({"book": 252, "quantity": "many"}))
        .build();
    if let Err(err) = service.call_action("submitOrder", junk).await {
        warn!(%err, "Validation rejected the order");
    }

    let rating = Request::builder(CrudEvent::BoundAction, "CatalogService.Books")
        .key("ID", 252)
        .data(json!({"stars": 5}))
        .build();
    let average = service
        .call_bound_action("addRating", &catalog_books(), rating)
        .await
        .map_err(anyhow::Error::from_boxed)?;
    info!(?average, "addRating");

    // ------------------------------------------------------------------------
    // Admin writes and the draft flow
    // ------------------------------------------------------------------------

    let books = admin_books();

    let create = Request::builder(CrudEvent::Create, "AdminService.Books")
        .data(json!({"ID": 271, "title": "Catweazle", "stock": 20}))
        .build();
    service
        .dispatch(
            CrudEvent::Create,
            &books,
            create,
            ResultPayload::Single(json!({"ID": 271})),
        )
        .await
        .map_err(anyhow::Error::from_boxed)?;

    let nameless = Request::builder(CrudEvent::Create, "AdminService.Books")
        .data(json!({"title": ""}))
        .build();
    if let Err(err) = service
        .dispatch(
            CrudEvent::Create,
            &books,
            nameless,
            ResultPayload::Single(Value::Null),
        )
        .await
    {
        warn!(%err, "Create rejected");
    }

    let drafts = books
        .drafts()
        .cloned()
        .context("AdminService.Books has no draft variant")?;

    let open = Request::builder(CrudEvent::New, "AdminService.Books.drafts")
        .key("ID", 271)
        .build();
    service
        .dispatch(
            CrudEvent::New,
            &drafts,
            open,
            ResultPayload::Single(json!({"ID": 271, "IsActiveEntity": false})),
        )
        .await
        .map_err(anyhow::Error::from_boxed)?;

    let edit = Request::builder(CrudEvent::Update, "AdminService.Books.drafts")
        .key("ID", 271)
        .data(json!({"stock": 35}))
        .build();
    service
        .dispatch(
            CrudEvent::Update,
            &drafts,
            Arc::clone(&edit),
            ResultPayload::Single(json!({"ID": 271, "stock": 35})),
        )
        .await
        .map_err(anyhow::Error::from_boxed)?;
    for notice in edit.notices() {
        info!(notice = notice.message, "Draft notice");
    }

    let save = Request::builder(CrudEvent::Save, "AdminService.Books")
        .key("ID", 271)
        .build();
    service
        .dispatch(
            CrudEvent::Save,
            &books,
            save,
            ResultPayload::Single(json!({"ID": 271, "IsActiveEntity": true})),
        )
        .await
        .map_err(anyhow::Error::from_boxed)?;

    let delete = Request::builder(CrudEvent::Delete, "AdminService.Books")
        .key("ID", 201)
        .build();
    let deleted = repository.remove(201);
    service
        .dispatch(
            CrudEvent::Delete,
            &books,
            delete,
            ResultPayload::Count(if deleted { 1 } else { 0 }),
        )
        .await
        .map_err(anyhow::Error::from_boxed)?;

    for (event, payload) in service.emitted() {
        info!(event, %payload, "Emitted");
    }
    info!(
        defaults_reached = service.continuation_calls(),
        "Walkthrough finished"
    );

    Ok(())
}
