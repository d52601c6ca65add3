//! Response construction helpers.
//!
//! # Responsibilities
//! - Render error responses in one JSON shape
//! - Produce the fixed routing-miss responses
//!
//! # Design Decisions
//! - Error bodies are always `{"message": ..., "errors": [...]}`
//! - Routing misses keep a plain-text body

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Build a JSON error response.
pub fn json_error(status: StatusCode, message: impl Into<String>, errors: Vec<String>) -> Response {
    let body = ErrorBody {
        message: message.into(),
        errors,
    };
    (status, Json(body)).into_response()
}

/// Response for a request no route matched.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}

/// Response for a path that exists under other methods only.
pub fn method_not_allowed(allowed: &[Method]) -> Response {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut res = (StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed\n").into_response();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        res.headers_mut().insert(header::ALLOW, value);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_error_omits_empty_details() {
        let res = json_error(StatusCode::NOT_FOUND, "product not found", Vec::new());
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({ "message": "product not found" }));
    }

    #[test]
    fn method_not_allowed_lists_methods() {
        let res = method_not_allowed(&[Method::GET, Method::PUT]);
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[header::ALLOW], "GET, PUT");
    }
}
