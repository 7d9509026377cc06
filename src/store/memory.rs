//! In-process directory and health log.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::config::schema::{ServiceConfig, ServicesFile};
use crate::config::validation::validate_services;
use crate::monitor::types::{CurrentHealth, HealthObservation, HealthStatus, Service, ServiceId};
use crate::observability::metrics;
use crate::store::{Directory, DirectoryError, HealthLog, LogError};

#[derive(Debug, Clone)]
struct DirectoryEntry {
    url: String,
    current: Option<CurrentHealth>,
}

/// A thread-safe service directory.
///
/// Cloning is cheap and every clone shares the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<DashMap<ServiceId, DirectoryEntry>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory pre-populated with the given services.
    pub fn with_services(services: impl IntoIterator<Item = Service>) -> Self {
        let directory = Self::new();
        for service in services {
            directory.upsert_service(service);
        }
        directory
    }

    /// Load and validate the `[[services]]` list of a TOML file.
    pub fn load_services_file(path: &Path) -> Result<Vec<ServiceConfig>, DirectoryError> {
        let content = std::fs::read_to_string(path)?;
        let file: ServicesFile = toml::from_str(&content)?;

        let errors = validate_services(&file.services);
        if !errors.is_empty() {
            let msg = errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            return Err(DirectoryError::Invalid(msg));
        }
        Ok(file.services)
    }

    /// Id of a registered service probing `url`, if any.
    pub fn id_for_url(&self, url: &str) -> Option<ServiceId> {
        self.inner
            .iter()
            .find(|entry| entry.value().url == url)
            .map(|entry| entry.key().clone())
    }

    /// Insert a service or update its URL. Changing the URL clears the
    /// current health, since it described a different endpoint.
    pub fn upsert_service(&self, service: Service) {
        self.inner
            .entry(service.id)
            .and_modify(|entry| {
                if entry.url != service.url {
                    entry.url = service.url.clone();
                    entry.current = None;
                }
            })
            .or_insert_with(|| DirectoryEntry {
                url: service.url.clone(),
                current: None,
            });
    }

    pub fn remove_service(&self, id: &ServiceId) -> bool {
        let removed = self.inner.remove(id).is_some();
        if removed {
            metrics::record_service_removed(id.as_str());
        }
        removed
    }

    /// Replace the registered set with `services`. Services that remain
    /// under the same URL keep their current health.
    pub fn replace_services(&self, services: Vec<Service>) {
        let keep: std::collections::HashSet<ServiceId> =
            services.iter().map(|s| s.id.clone()).collect();
        self.inner.retain(|id, _| {
            let kept = keep.contains(id);
            if !kept {
                metrics::record_service_removed(id.as_str());
            }
            kept
        });
        for service in services {
            self.upsert_service(service);
        }
        tracing::info!(services = self.inner.len(), "Directory services replaced");
    }

    pub fn current_health(&self, id: &ServiceId) -> Option<CurrentHealth> {
        self.inner.get(id).and_then(|entry| entry.current)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn list_services(&self) -> Result<Vec<Service>, DirectoryError> {
        let mut services: Vec<Service> = self
            .inner
            .iter()
            .map(|r| Service::new(r.key().clone(), r.value().url.clone()))
            .collect();
        services.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(services)
    }

    async fn set_current_health(
        &self,
        id: &ServiceId,
        status: HealthStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError> {
        match self.inner.get_mut(id) {
            Some(mut entry) => {
                entry.current = Some(CurrentHealth {
                    status,
                    observed_at,
                });
                Ok(())
            }
            None => Err(DirectoryError::NotFound(id.clone())),
        }
    }
}

/// Append-only in-process health log, partitioned by service.
#[derive(Debug, Clone, Default)]
pub struct MemoryHealthLog {
    inner: Arc<DashMap<ServiceId, Vec<HealthObservation>>>,
}

impl MemoryHealthLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observations for one service, in append order.
    pub fn observations_for(&self, id: &ServiceId) -> Vec<HealthObservation> {
        self.inner
            .get(id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Total number of appended observations.
    pub fn len(&self) -> usize {
        self.inner.iter().map(|r| r.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HealthLog for MemoryHealthLog {
    async fn append(&self, observation: &HealthObservation) -> Result<(), LogError> {
        self.inner
            .entry(observation.service_id.clone())
            .or_default()
            .push(observation.clone());
        Ok(())
    }
}
