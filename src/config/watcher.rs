//! Services file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::monitor::types::{Service, ServiceId};
use crate::store::{DirectoryError, MemoryDirectory};

/// Inline services followed by those of the services file, if any. A
/// file entry replaces an inline entry with the same id.
///
/// File entries without an id keep the id `known` already holds for
/// their URL, so current health survives a reload; otherwise one is
/// generated.
pub fn resolve_services(
    inline: &[Service],
    file: Option<&Path>,
    known: &MemoryDirectory,
) -> Result<Vec<Service>, DirectoryError> {
    let mut services: Vec<Service> = inline.to_vec();
    let Some(path) = file else {
        return Ok(services);
    };

    for entry in MemoryDirectory::load_services_file(path)? {
        let service = match entry.id {
            Some(id) => Service::new(id, entry.url),
            None => {
                let id = known
                    .id_for_url(&entry.url)
                    .filter(|id| !services.iter().any(|s| &s.id == id && s.url != entry.url))
                    .unwrap_or_else(ServiceId::generate);
                Service::new(id, entry.url)
            }
        };
        services.retain(|s| s.id != service.id);
        services.push(service);
    }
    Ok(services)
}

/// Reloads the directory whenever the services file changes.
pub struct ServicesWatcher {
    path: PathBuf,
    inline: Vec<Service>,
    directory: MemoryDirectory,
}

impl ServicesWatcher {
    pub fn new(path: &Path, inline: Vec<Service>, directory: MemoryDirectory) -> Self {
        Self {
            path: path.to_path_buf(),
            inline,
            directory,
        }
    }

    /// Re-read the services file into the directory. On failure the
    /// current services are kept.
    pub fn reload(&self) -> Result<usize, DirectoryError> {
        let services = resolve_services(&self.inline, Some(&self.path), &self.directory)?;
        let count = services.len();
        self.directory.replace_services(services);
        Ok(count)
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Services file change detected, reloading...");
                        match self.reload() {
                            Ok(count) => tracing::info!(services = count, "Services reloaded"),
                            Err(e) => tracing::error!(
                                error = %e,
                                "Failed to reload services file, keeping current services"
                            ),
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Services watcher started");
        Ok(watcher)
    }
}
