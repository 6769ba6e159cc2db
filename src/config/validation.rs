//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting listeners
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::ServiceConfig;

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("http.addr and rpc.addr must differ (both `{0}`)")]
    AddressConflict(String),

    #[error("http.root must start with `/` (got `{0}`)")]
    InvalidRoot(String),

    #[error("rpc.service must be non-empty and contain no `.` (got `{0}`)")]
    InvalidServiceName(String),

    #[error("log.level: unknown level `{0}`")]
    InvalidLogLevel(String),

    #[error("tracing is enabled but neither tracing.endpoint nor tracing.collector is set")]
    MissingTracingEndpoint,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let http = check_addr("http.addr", &config.http.addr, &mut errors);
    let rpc = check_addr("rpc.addr", &config.rpc.addr, &mut errors);
    if config.debug.metrics_enabled {
        check_addr("debug.addr", &config.debug.addr, &mut errors);
    }
    if let (Some(http), Some(rpc)) = (http, rpc) {
        if http == rpc && http.port() != 0 {
            errors.push(ValidationError::AddressConflict(http.to_string()));
        }
    }

    if !config.http.root.starts_with('/') {
        errors.push(ValidationError::InvalidRoot(config.http.root.clone()));
    }

    let service = config.rpc.service.trim();
    if service.is_empty() || service.contains('.') {
        errors.push(ValidationError::InvalidServiceName(config.rpc.service.clone()));
    }

    if LevelFilter::from_str(&config.log.level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.log.level.clone()));
    }

    if config.tracing.enabled && config.tracing.export_endpoint().is_none() {
        errors.push(ValidationError::MissingTracingEndpoint);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SocketAddr> {
    match value.parse::<SocketAddr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.http.addr = "nowhere".into();
        config.http.root = "jupyter".into();
        config.rpc.service = "a.b".into();
        config.log.level = "loud".into();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::InvalidRoot("jupyter".into())));
        assert!(errors.contains(&ValidationError::Zero("timeouts.request_secs")));
    }

    #[test]
    fn test_conflicting_listeners() {
        let mut config = ServiceConfig::default();
        config.rpc.addr = config.http.addr.clone();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::AddressConflict("0.0.0.0:9105".into())]
        );
    }

    #[test]
    fn test_tracing_needs_endpoint() {
        let mut config = ServiceConfig::default();
        config.tracing.enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MissingTracingEndpoint])
        );

        config.tracing.collector = "http://localhost:4317".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_ephemeral_ports_may_repeat() {
        let mut config = ServiceConfig::default();
        config.http.addr = "127.0.0.1:0".into();
        config.rpc.addr = "127.0.0.1:0".into();
        assert!(validate_config(&config).is_ok());
    }
}
