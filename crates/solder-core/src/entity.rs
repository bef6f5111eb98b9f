//! Entity descriptors.
//!
//! An [`EntityDef`] names one entity exposed by the host service together
//! with its key fields, its declared bound actions and (optionally) the
//! draft working-copy variant the host maintains for it. Handler classes
//! bind to an [`EntityRef`] and the dispatcher resolves hook targets
//! through it.
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_core::EntityDef;
//!
//! let books = EntityDef::builder("CatalogService.Books")
//!     .key("ID")
//!     .action("addRating")
//!     .with_drafts()
//!     .build();
//!
//! assert!(books.drafts().is_some());
//! ```

use std::sync::Arc;

/// Shared handle to an entity descriptor.
pub type EntityRef = Arc<EntityDef>;

/// Description of one entity exposed by the host service.
#[derive(Debug)]
pub struct EntityDef {
    name: String,
    keys: Vec<String>,
    actions: Vec<String>,
    drafts: Option<EntityRef>,
}

impl EntityDef {
    /// Starts building an entity descriptor with the given fully qualified
    /// name.
    pub fn builder(name: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            name: name.into(),
            keys: Vec::new(),
            actions: Vec::new(),
            with_drafts: false,
        }
    }

    /// Fully qualified entity name as the host knows it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key field names, in declaration order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Declared bound-action and bound-function names.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Whether `name` is a declared bound action of this entity.
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a == name)
    }

    /// The draft working-copy variant, if the entity is draft-enabled.
    ///
    /// The draft variant shares the key fields of the active entity and
    /// carries the `.drafts` name suffix.
    pub fn drafts(&self) -> Option<&EntityRef> {
        self.drafts.as_ref()
    }
}

/// Fluent builder for [`EntityDef`].
#[derive(Debug)]
pub struct EntityBuilder {
    name: String,
    keys: Vec<String>,
    actions: Vec<String>,
    with_drafts: bool,
}

impl EntityBuilder {
    /// Adds a key field.
    pub fn key(mut self, field: impl Into<String>) -> Self {
        self.keys.push(field.into());
        self
    }

    /// Declares a bound action or bound function on the entity.
    pub fn action(mut self, name: impl Into<String>) -> Self {
        self.actions.push(name.into());
        self
    }

    /// Marks the entity draft-enabled.
    pub fn with_drafts(mut self) -> Self {
        self.with_drafts = true;
        self
    }

    /// Finalizes the descriptor.
    pub fn build(self) -> EntityRef {
        let drafts = self.with_drafts.then(|| {
            Arc::new(EntityDef {
                name: format!("{}.drafts", self.name),
                keys: self.keys.clone(),
                actions: Vec::new(),
                drafts: None,
            })
        });
        Arc::new(EntityDef {
            name: self.name,
            keys: self.keys,
            actions: self.actions,
            drafts,
        })
    }
}
