//! Storage adapter for products.
//!
//! The service never talks to a concrete database. It opens a
//! [`StoreSession`] per call through an injected [`ProductStore`], stages work
//! on it, and applies everything with a single [`StoreSession::commit`]. A
//! session that is dropped without committing discards its staged work.
//!
//! ## Submodules
//!
//! - [`memory`] - In-process store with row versions for optimistic
//!   concurrency.

pub mod memory;

use catalog_tonic_core::Result;
use std::time::SystemTime;

pub use memory::MemoryStore;

/// Stock status as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductStatus {
    #[default]
    InStock,
    OutOfStock,
}

/// A product that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: f32,
    pub status: ProductStatus,
    pub created_time: SystemTime,
}

impl NewProduct {
    pub fn with_id(self, id: i32) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            status: self.status,
            created_time: self.created_time,
        }
    }
}

/// A persisted product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f32,
    pub status: ProductStatus,
    pub created_time: SystemTime,
}

/// Shared handle to a product collection.
pub trait ProductStore: Send + Sync + 'static {
    /// Opens a unit of work. Sessions are cheap and meant to live for one
    /// call.
    fn session(&self) -> Box<dyn StoreSession>;
}

/// A unit of work over the product collection.
///
/// Reads go straight to the collection. Writes are staged and only become
/// visible to other sessions after [`commit`](StoreSession::commit).
#[tonic::async_trait]
pub trait StoreSession: Send {
    /// Looks up a product by id and remembers the row version that was seen.
    async fn find(&mut self, id: i32) -> Result<Option<Product>>;

    /// Returns every product ordered by id.
    async fn scan(&mut self) -> Result<Vec<Product>>;

    /// Allocates an id and stages the insert.
    async fn insert(&mut self, product: NewProduct) -> Result<Product>;

    /// Stages a full-row replace. Existence is only checked at commit.
    fn mark_modified(&mut self, product: Product);

    /// Stages removal of the product.
    fn delete(&mut self, product: Product);

    /// Atomically applies all staged operations and returns the number of
    /// rows affected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`](catalog_tonic_core::Error::Conflict) if a
    /// staged update or delete targets a row that was removed, or that changed
    /// after this session read it. Nothing is applied in that case.
    async fn commit(&mut self) -> Result<usize>;
}
