//! Product domain collaborators.
//!
//! The dispatch core only sees these through [`ProductStore`] and the
//! [`PayloadValidator`](crate::http::middleware::PayloadValidator) impl of
//! [`ProductValidator`].

pub mod model;
pub mod store;
pub mod validation;

pub use model::{Product, ProductPayload};
pub use store::{InMemoryStore, ProductStore, StoreError};
pub use validation::ProductValidator;
