//! In-process product store.
//!
//! Rows live in a `BTreeMap` keyed by id behind a single `RwLock`, so a scan
//! is ordered by id and a commit is atomic with respect to every other
//! session. Each row carries a version that is bumped on every write; a
//! session remembers the versions it read and a commit that would overwrite a
//! newer version is rejected as a conflict.
//!
//! Ids come from a sequence that never hands out the same value twice, even
//! when the session that reserved it is dropped without committing.

use super::{NewProduct, Product, ProductStore, StoreSession};
use catalog_tonic_core::{Error, Result};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicI32, Ordering},
    },
};

#[derive(Debug, Clone)]
struct Row {
    product: Product,
    version: u64,
}

#[derive(Debug, Default)]
struct Shared {
    table: RwLock<BTreeMap<i32, Row>>,
    last_id: AtomicI32,
}

/// Thread-safe in-memory implementation of [`ProductStore`].
///
/// Cloning is cheap and every clone refers to the same collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed rows.
    pub fn len(&self) -> usize {
        self.shared.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.table.read().is_empty()
    }

    fn open(&self) -> MemorySession {
        MemorySession {
            shared: Arc::clone(&self.shared),
            observed: HashMap::new(),
            staged: Vec::new(),
        }
    }
}

impl ProductStore for MemoryStore {
    fn session(&self) -> Box<dyn StoreSession> {
        Box::new(self.open())
    }
}

#[derive(Debug)]
enum Staged {
    Insert(Product),
    Modify(Product),
    Delete(i32),
}

/// Unit of work over a [`MemoryStore`].
pub struct MemorySession {
    shared: Arc<Shared>,
    observed: HashMap<i32, u64>,
    staged: Vec<Staged>,
}

impl MemorySession {
    fn next_id(&self) -> Result<i32> {
        self.shared
            .last_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |id| id.checked_add(1))
            .map(|prev| prev + 1)
            .map_err(|_| Error::Storage {
                context: "product id sequence exhausted".to_string(),
            })
    }

    /// Validates the staged operations against `table` and returns the rows
    /// they produce, keyed by id. `None` marks a removal.
    fn plan(&self, table: &BTreeMap<i32, Row>) -> Result<BTreeMap<i32, Option<Row>>> {
        let mut changes: BTreeMap<i32, Option<Row>> = BTreeMap::new();

        let current = |changes: &BTreeMap<i32, Option<Row>>, id: i32| match changes.get(&id) {
            Some(change) => change.clone(),
            None => table.get(&id).cloned(),
        };

        for op in &self.staged {
            match op {
                Staged::Insert(product) => {
                    if current(&changes, product.id).is_some() {
                        return Err(Error::Storage {
                            context: format!("duplicate product id {}", product.id),
                        });
                    }
                    changes.insert(
                        product.id,
                        Some(Row {
                            product: product.clone(),
                            version: 1,
                        }),
                    );
                }
                Staged::Modify(product) => {
                    let id = product.id;
                    let row = current(&changes, id).ok_or(Error::Conflict { id })?;
                    self.check_version(table, id)?;
                    changes.insert(
                        id,
                        Some(Row {
                            product: product.clone(),
                            version: row.version + 1,
                        }),
                    );
                }
                Staged::Delete(id) => {
                    let id = *id;
                    current(&changes, id).ok_or(Error::Conflict { id })?;
                    self.check_version(table, id)?;
                    changes.insert(id, None);
                }
            }
        }

        Ok(changes)
    }

    fn check_version(&self, table: &BTreeMap<i32, Row>, id: i32) -> Result<()> {
        match self.observed.get(&id) {
            Some(seen) if table.get(&id).map(|row| row.version) != Some(*seen) => {
                Err(Error::Conflict { id })
            }
            _ => Ok(()),
        }
    }
}

#[tonic::async_trait]
impl StoreSession for MemorySession {
    async fn find(&mut self, id: i32) -> Result<Option<Product>> {
        let table = self.shared.table.read();
        Ok(table.get(&id).map(|row| {
            self.observed.insert(id, row.version);
            row.product.clone()
        }))
    }

    async fn scan(&mut self) -> Result<Vec<Product>> {
        let table = self.shared.table.read();
        Ok(table.values().map(|row| row.product.clone()).collect())
    }

    async fn insert(&mut self, product: NewProduct) -> Result<Product> {
        let product = product.with_id(self.next_id()?);
        self.staged.push(Staged::Insert(product.clone()));
        Ok(product)
    }

    fn mark_modified(&mut self, product: Product) {
        self.staged.push(Staged::Modify(product));
    }

    fn delete(&mut self, product: Product) {
        self.staged.push(Staged::Delete(product.id));
    }

    async fn commit(&mut self) -> Result<usize> {
        if self.staged.is_empty() {
            return Ok(0);
        }

        let mut table = self.shared.table.write();
        let changes = self.plan(&table)?;
        // Rows, not operations: several staged writes to one id count once,
        // and removing a row that was never committed counts as nothing.
        let affected = changes
            .iter()
            .filter(|(id, change)| change.is_some() || table.contains_key(*id))
            .count();

        for (id, change) in changes {
            match change {
                Some(row) => {
                    self.observed.insert(id, row.version);
                    table.insert(id, row);
                }
                None => {
                    self.observed.remove(&id);
                    table.remove(&id);
                }
            }
        }
        self.staged.clear();

        Ok(affected)
    }
}
