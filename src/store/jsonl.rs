//! JSON-lines health log.
//!
//! One observation per line, appended. Lines are written whole under a
//! file lock so concurrent checkers never interleave partial records.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::monitor::types::{HealthObservation, ServiceId};
use crate::store::{HealthLog, LogError};

/// Append-only file sink for health observations.
#[derive(Debug)]
pub struct JsonlHealthLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlHealthLog {
    /// Open (or create) the log file for appending.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::info!(path = ?path, "Health log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every observation in the file. Malformed lines are
    /// skipped with a warning.
    pub fn read_observations(path: &Path) -> Result<Vec<HealthObservation>, LogError> {
        let content = std::fs::read_to_string(path)?;
        let mut observations = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HealthObservation>(line) {
                Ok(observation) => observations.push(observation),
                Err(e) => {
                    tracing::warn!(path = ?path, line = line_no + 1, error = %e, "Skipping malformed health log line");
                }
            }
        }
        Ok(observations)
    }

    /// Observations recorded for a single service.
    pub fn read_service(path: &Path, id: &ServiceId) -> Result<Vec<HealthObservation>, LogError> {
        let mut observations = Self::read_observations(path)?;
        observations.retain(|o| &o.service_id == id);
        Ok(observations)
    }
}

#[async_trait]
impl HealthLog for JsonlHealthLog {
    async fn append(&self, observation: &HealthObservation) -> Result<(), LogError> {
        let mut line = serde_json::to_vec(observation)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        write_line(&mut *file, &line).await?;
        Ok(())
    }
}

/// Write one newline-terminated record. If the write fails part way, a
/// newline is still attempted so the fragment stays on a line of its
/// own and the next record starts clean.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &[u8]) -> std::io::Result<()> {
    if let Err(e) = writer.write_all(line).await {
        if let Err(e2) = writer.write_all(b"\n").await {
            tracing::warn!(error = %e2, "Failed to terminate partial health log line");
        }
        let _ = writer.flush().await;
        return Err(e);
    }
    writer.flush().await
}
