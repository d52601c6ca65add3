//! In-memory product storage.
//!
//! # Design Decisions
//! - DashMap for lock-free reads from concurrent requests
//! - Insertion sequence kept per entry so listings are stable
//! - Nothing is persisted

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use uuid::Uuid;

use crate::products::model::{Product, ProductPayload};

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("product {0} not found")]
    NotFound(Uuid),
}

/// Storage operations the HTTP handlers rely on.
pub trait ProductStore: Send + Sync + 'static {
    fn list(&self) -> Vec<Product>;
    fn get(&self, id: Uuid) -> Result<Product, StoreError>;
    fn create(&self, payload: ProductPayload) -> Product;
    fn update(&self, id: Uuid, payload: ProductPayload) -> Result<Product, StoreError>;
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    product: Product,
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    products: DashMap<Uuid, Entry>,
    next_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the two sample products.
    pub fn seeded() -> Self {
        let store = Self::new();
        store.create(ProductPayload {
            name: "Latte".into(),
            description: "Frothy milky coffee".into(),
            price: 2.45,
            sku: "abc-def-ghi".into(),
        });
        store.create(ProductPayload {
            name: "Espresso".into(),
            description: "Short and strong coffee without milk".into(),
            price: 1.99,
            sku: "jkl-mno-pqr".into(),
        });
        store
    }

    fn insert(&self, product: Product) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.products.insert(product.id, Entry { seq, product });
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductStore for InMemoryStore {
    fn list(&self) -> Vec<Product> {
        let mut entries: Vec<(u64, Product)> = self
            .products
            .iter()
            .map(|e| (e.seq, e.product.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, product)| product).collect()
    }

    fn get(&self, id: Uuid) -> Result<Product, StoreError> {
        self.products
            .get(&id)
            .map(|e| e.product.clone())
            .ok_or(StoreError::NotFound(id))
    }

    fn create(&self, payload: ProductPayload) -> Product {
        let product = Product::new(payload);
        self.insert(product.clone());
        product
    }

    fn update(&self, id: Uuid, payload: ProductPayload) -> Result<Product, StoreError> {
        let mut entry = self.products.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        entry.product = Product::with_id(id, payload);
        Ok(entry.product.clone())
    }
}
