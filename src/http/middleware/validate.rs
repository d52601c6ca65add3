//! Payload validation middleware.
//!
//! Reads the request body, hands it to a [`PayloadValidator`] and either
//! rejects the request or stores the decoded entity in the request
//! extensions as [`Validated`] before delegating.

use std::error::Error as StdError;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::{BoxFuture, FutureExt};
use http_body_util::LengthLimitError;

use crate::http::middleware::{Middleware, Next};
use crate::http::response::json_error;

/// Why a payload was refused by a validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The body could not be decoded at all.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// The body decoded but broke one or more rules.
    #[error("invalid payload: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl ValidationError {
    /// Individual problems, for the response body.
    pub fn details(&self) -> Vec<String> {
        match self {
            ValidationError::Malformed(reason) => vec![reason.clone()],
            ValidationError::Invalid(problems) => problems.clone(),
        }
    }
}

/// Decodes and validates a request body.
pub trait PayloadValidator: Send + Sync + 'static {
    type Entity: Clone + Send + Sync + 'static;

    fn decode_and_validate(&self, body: &[u8]) -> Result<Self::Entity, ValidationError>;
}

/// A decoded entity that passed validation.
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

/// Failures of the validation stage, each mapped to a client error.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed to read request body: {0}")]
    Read(axum::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl IntoResponse for PayloadError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            PayloadError::TooLarge { .. } => {
                json_error(StatusCode::PAYLOAD_TOO_LARGE, message, Vec::new())
            }
            PayloadError::Read(_) => json_error(StatusCode::BAD_REQUEST, message, Vec::new()),
            PayloadError::Invalid(e) => json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "payload validation failed",
                e.details(),
            ),
        }
    }
}

/// Middleware running a [`PayloadValidator`] over the request body.
pub struct ValidatePayload<V> {
    validator: Arc<V>,
    max_body_bytes: usize,
}

impl<V: PayloadValidator> ValidatePayload<V> {
    pub fn new(validator: Arc<V>, max_body_bytes: usize) -> Self {
        Self {
            validator,
            max_body_bytes,
        }
    }
}

impl<V: PayloadValidator> Middleware for ValidatePayload<V> {
    fn handle(&self, req: Request<Body>, next: Next) -> BoxFuture<'static, Response> {
        let validator = Arc::clone(&self.validator);
        let limit = self.max_body_bytes;

        async move {
            let (mut parts, body) = req.into_parts();

            let declared = parts
                .headers
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());
            if declared.is_some_and(|len| len > limit) {
                return PayloadError::TooLarge { limit }.into_response();
            }

            let bytes = match read_body(body, limit).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(error = %e, "Request body unreadable");
                    return e.into_response();
                }
            };

            match validator.decode_and_validate(&bytes) {
                Ok(entity) => {
                    parts.extensions.insert(Validated(entity));
                    next.run(Request::from_parts(parts, Body::from(bytes))).await
                }
                Err(e) => {
                    tracing::info!(error = %e, "Payload rejected");
                    PayloadError::Invalid(e).into_response()
                }
            }
        }
        .boxed()
    }
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, PayloadError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeded_limit(&e) {
            PayloadError::TooLarge { limit }
        } else {
            PayloadError::Read(e)
        }
    })
}

fn exceeded_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::handler_fn;
    use crate::http::middleware::build_chain;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts bodies that are a decimal number.
    struct NumberValidator;

    impl PayloadValidator for NumberValidator {
        type Entity = u32;

        fn decode_and_validate(&self, body: &[u8]) -> Result<u32, ValidationError> {
            let text = std::str::from_utf8(body)
                .map_err(|e| ValidationError::Malformed(e.to_string()))?;
            let n: u32 = text
                .trim()
                .parse()
                .map_err(|_| ValidationError::Malformed(format!("'{text}' is not a number")))?;
            if n == 0 {
                return Err(ValidationError::Invalid(vec!["must be positive".into()]));
            }
            Ok(n)
        }
    }

    fn chain(calls: &Arc<AtomicUsize>, limit: usize) -> crate::http::handler::BoxHandler {
        let calls = Arc::clone(calls);
        let terminal = handler_fn(move |req: Request<Body>| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let Validated(n) = req.extensions().get::<Validated<u32>>().cloned().unwrap();
                (n * 2).to_string()
            }
        });
        let validator: Arc<dyn Middleware> =
            Arc::new(ValidatePayload::new(Arc::new(NumberValidator), limit));
        build_chain(terminal, &[validator])
    }

    async fn body_string(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn valid_payload_reaches_terminal_with_entity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = chain(&calls, 64).call(Request::new(Body::from("21"))).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "42");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_payload_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = chain(&calls, 64).call(Request::new(Body::from("abc"))).await;

        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let body: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
        assert_eq!(body["message"], "payload validation failed");
        assert_eq!(body["errors"][0], "'abc' is not a number");
    }

    #[tokio::test]
    async fn rule_violation_is_unprocessable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = chain(&calls, 64).call(Request::new(Body::from("0"))).await;

        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = chain(&calls, 4).call(Request::new(Body::from("123456789"))).await;

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn declared_length_over_limit_is_rejected_without_reading() {
        let calls = Arc::new(AtomicUsize::new(0));
        let req = Request::builder()
            .header(header::CONTENT_LENGTH, "1000")
            .body(Body::from("1"))
            .unwrap();
        let res = chain(&calls, 4).call(req).await;

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
