//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All problems are
//! collected and returned together rather than stopping at the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{MonitorConfig, ServiceConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("monitor.interval_secs must be greater than zero")]
    ZeroInterval,

    #[error("monitor.probe_timeout_secs must be greater than zero")]
    ZeroProbeTimeout,

    #[error("monitor.max_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("observability.metrics_address is not a socket address: {0}")]
    InvalidMetricsAddress(String),

    #[error("service #{0} has an empty id")]
    EmptyServiceId(usize),

    #[error("service #{0} has an empty url")]
    EmptyServiceUrl(usize),

    #[error("duplicate service id '{0}'")]
    DuplicateServiceId(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.monitor.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if config.monitor.probe_timeout_secs == 0 {
        errors.push(ValidationError::ZeroProbeTimeout);
    }
    if config.monitor.max_concurrency == Some(0) {
        errors.push(ValidationError::ZeroConcurrency);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    errors.extend(validate_services(&config.services));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check a service list, inline or from a services file. Services
/// without an id are exempt from the id checks.
pub fn validate_services(services: &[ServiceConfig]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, service) in services.iter().enumerate() {
        if service.url.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceUrl(i));
        }
        match service.id.as_deref() {
            Some(id) if id.trim().is_empty() => errors.push(ValidationError::EmptyServiceId(i)),
            Some(id) => {
                if !seen.insert(id) {
                    errors.push(ValidationError::DuplicateServiceId(id.to_string()));
                }
            }
            None => {}
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str, url: &str) -> ServiceConfig {
        ServiceConfig {
            id: Some(id.to_string()),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MonitorConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = MonitorConfig::default();
        config.monitor.interval_secs = 0;
        config.monitor.probe_timeout_secs = 0;
        config.monitor.max_concurrency = Some(0);
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();
        config.services = vec![
            service("a", "http://a.test"),
            service("", "http://b.test"),
            service("c", " "),
            service("a", "http://a2.test"),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroInterval,
                ValidationError::ZeroProbeTimeout,
                ValidationError::ZeroConcurrency,
                ValidationError::InvalidMetricsAddress("nowhere".into()),
                ValidationError::EmptyServiceId(1),
                ValidationError::EmptyServiceUrl(2),
                ValidationError::DuplicateServiceId("a".into()),
            ]
        );
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = MonitorConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_malformed_service_url_is_allowed() {
        let mut config = MonitorConfig::default();
        config.services = vec![service("odd", "not a url")];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_services_without_id_skip_id_checks() {
        let services = vec![
            ServiceConfig {
                id: None,
                url: "http://a.test".into(),
            },
            ServiceConfig {
                id: None,
                url: "http://a.test".into(),
            },
            ServiceConfig {
                id: None,
                url: "".into(),
            },
        ];
        assert_eq!(validate_services(&services), vec![ValidationError::EmptyServiceUrl(2)]);
    }
}
