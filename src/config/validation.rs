//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check addresses parse and do not collide
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let bind = config.listener.bind_address.parse::<SocketAddr>();
    if bind.is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.idle_secs", timeouts.idle_secs),
        ("timeouts.read_secs", timeouts.read_secs),
        ("timeouts.write_secs", timeouts.write_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }
    // The idle timer also runs while a handler works without touching the
    // socket, so it must outlast the write timeout.
    if timeouts.idle_secs <= timeouts.write_secs {
        errors.push(ValidationError::new(
            "timeouts.idle_secs",
            "must be greater than timeouts.write_secs",
        ));
    }

    if config.shutdown.grace_period_secs == 0 {
        errors.push(ValidationError::new("shutdown.grace_period_secs", "must be greater than 0"));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled {
        match observability.metrics_address.parse::<SocketAddr>() {
            Err(_) => errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("'{}' is not a socket address", observability.metrics_address),
            )),
            Ok(metrics) => {
                if bind.is_ok_and(|bind| bind.port() == metrics.port()) {
                    errors.push(ValidationError::new(
                        "observability.metrics_address",
                        "must not share a port with the listener",
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_problem() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.read_secs = 0;
        config.shutdown.grace_period_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "timeouts.read_secs", "shutdown.grace_period_secs"]
        );
    }

    #[test]
    fn idle_must_outlast_write_timeout() {
        let mut config = ServiceConfig::default();
        config.timeouts.idle_secs = 5;
        config.timeouts.write_secs = 5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "timeouts.idle_secs");
    }

    #[test]
    fn metrics_port_must_differ_from_listener() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "127.0.0.1:9090".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
