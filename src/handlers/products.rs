//! Product endpoints.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use uuid::Uuid;

use crate::http::handler::{handler_fn, BoxHandler};
use crate::http::middleware::Validated;
use crate::http::response::json_error;
use crate::products::{ProductPayload, ProductStore, StoreError};
use crate::routing::PathParams;

/// Errors the product handlers answer with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("'{0}' is not a product id")]
    BadId(String),
    #[error("route is missing its payload validator")]
    MissingPayload,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Store(StoreError::NotFound(_)) => {
                json_error(StatusCode::NOT_FOUND, "product not found", Vec::new())
            }
            ApiError::BadId(_) => json_error(StatusCode::BAD_REQUEST, self.to_string(), Vec::new()),
            ApiError::MissingPayload => {
                tracing::error!("Product write reached its handler without a validated payload");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error", Vec::new())
            }
        }
    }
}

fn product_id(req: &Request<Body>) -> Result<Uuid, ApiError> {
    let raw = req
        .extensions()
        .get::<PathParams>()
        .and_then(|p| p.get("id"))
        .unwrap_or_default();
    Uuid::parse_str(raw).map_err(|_| ApiError::BadId(raw.to_string()))
}

fn payload(req: &Request<Body>) -> Result<ProductPayload, ApiError> {
    req.extensions()
        .get::<Validated<ProductPayload>>()
        .map(|Validated(p)| p.clone())
        .ok_or(ApiError::MissingPayload)
}

/// Terminal handlers over a shared product store.
#[derive(Clone)]
pub struct ProductHandlers {
    store: Arc<dyn ProductStore>,
}

impl ProductHandlers {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    /// `GET /`
    pub fn list(&self) -> BoxHandler {
        let store = Arc::clone(&self.store);
        handler_fn(move |_req| {
            let store = Arc::clone(&store);
            async move {
                tracing::info!("Handle GET products");
                Json(store.list())
            }
        })
    }

    /// `GET /{id}`
    pub fn get(&self) -> BoxHandler {
        let store = Arc::clone(&self.store);
        handler_fn(move |req| {
            let store = Arc::clone(&store);
            async move {
                let id = product_id(&req)?;
                tracing::info!(product_id = %id, "Handle GET product");
                Ok::<_, ApiError>(Json(store.get(id)?))
            }
        })
    }

    /// `POST /`
    pub fn create(&self) -> BoxHandler {
        let store = Arc::clone(&self.store);
        handler_fn(move |req| {
            let store = Arc::clone(&store);
            async move {
                let payload = payload(&req)?;
                let product = store.create(payload);
                tracing::info!(product_id = %product.id, "Handle POST product");
                Ok::<_, ApiError>((StatusCode::CREATED, Json(product)))
            }
        })
    }

    /// `PUT /{id}`
    pub fn update(&self) -> BoxHandler {
        let store = Arc::clone(&self.store);
        handler_fn(move |req| {
            let store = Arc::clone(&store);
            async move {
                let id = product_id(&req)?;
                let payload = payload(&req)?;
                tracing::info!(product_id = %id, "Handle PUT product");
                Ok::<_, ApiError>(Json(store.update(id, payload)?))
            }
        })
    }
}
