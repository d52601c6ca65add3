//! Product payload rules.

use regex::Regex;

use crate::http::middleware::{PayloadValidator, ValidationError};
use crate::products::model::ProductPayload;

/// Decodes JSON product payloads and enforces the product rules:
/// non-empty name, positive price, sku of the form `abc-def-ghi`.
#[derive(Debug, Clone)]
pub struct ProductValidator {
    sku: Regex,
}

impl ProductValidator {
    pub fn new() -> Self {
        Self {
            sku: Regex::new("^[a-z]+-[a-z]+-[a-z]+$").expect("sku pattern is valid"),
        }
    }

    /// Every rule the payload breaks.
    pub fn violations(&self, payload: &ProductPayload) -> Vec<String> {
        let mut problems = Vec::new();
        if payload.name.trim().is_empty() {
            problems.push("name: must not be empty".to_string());
        }
        if payload.price.is_nan() || payload.price <= 0.0 {
            problems.push("price: must be greater than 0".to_string());
        }
        if !self.sku.is_match(&payload.sku) {
            problems.push(format!(
                "sku: '{}' must look like 'abc-def-ghi'",
                payload.sku
            ));
        }
        problems
    }
}

impl Default for ProductValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadValidator for ProductValidator {
    type Entity = ProductPayload;

    fn decode_and_validate(&self, body: &[u8]) -> Result<ProductPayload, ValidationError> {
        let payload: ProductPayload =
            serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;

        let problems = self.violations(&payload);
        if problems.is_empty() {
            Ok(payload)
        } else {
            Err(ValidationError::Invalid(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_good_product() {
        let body = br#"{"name":"Mocha","description":"Chocolate","price":3.1,"sku":"moc-cha-one"}"#;
        let payload = ProductValidator::new().decode_and_validate(body).unwrap();
        assert_eq!(payload.name, "Mocha");
        assert_eq!(payload.sku, "moc-cha-one");
    }

    #[test]
    fn description_is_optional() {
        let body = br#"{"name":"Mocha","price":3.1,"sku":"moc-cha-one"}"#;
        let payload = ProductValidator::new().decode_and_validate(body).unwrap();
        assert!(payload.description.is_empty());
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = ProductValidator::new().decode_and_validate(b"{not json").unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn reports_every_broken_rule() {
        let body = br#"{"name":" ","price":0,"sku":"ABC"}"#;
        let err = ProductValidator::new().decode_and_validate(body).unwrap_err();
        match err {
            ValidationError::Invalid(problems) => {
                assert_eq!(problems.len(), 3);
                assert!(problems[0].starts_with("name"));
                assert!(problems[1].starts_with("price"));
                assert!(problems[2].starts_with("sku"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn nan_price_is_rejected() {
        let payload = ProductPayload {
            name: "x".into(),
            description: String::new(),
            price: f64::NAN,
            sku: "a-b-c".into(),
        };
        assert_eq!(ProductValidator::new().violations(&payload).len(), 1);
    }
}
