//! Product entity and its write payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub sku: String,
}

impl Product {
    /// Create a product with a fresh v4 id.
    pub fn new(payload: ProductPayload) -> Self {
        Self::with_id(Uuid::new_v4(), payload)
    }

    pub fn with_id(id: Uuid, payload: ProductPayload) -> Self {
        Self {
            id,
            name: payload.name,
            description: payload.description,
            price: payload.price,
            sku: payload.sku,
        }
    }
}

/// Body of create and update requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub sku: String,
}
