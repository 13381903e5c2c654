use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::models::{ProcessRecord, ProjectIdentity, RECORD_SCHEMA_VERSION};
use crate::services::error::LifecycleError;

/// Directory, relative to the project root, holding server state
pub const DEFAULT_STATE_DIR: &str = ".mcp-server";

const RECORD_FILE: &str = "server.json";
const LOG_FILE: &str = "server.log";

/// File-backed store of one [`ProcessRecord`] per project.
///
/// Every operation touches only `<root>/<state dir>/server.json`, so
/// different projects never contend. Writes go through a temp file and a
/// rename, so a crash leaves either the old record or the new one.
#[derive(Debug, Clone)]
pub struct Registry {
    state_dir_name: String,
}

impl Registry {
    pub fn new(state_dir_name: impl Into<String>) -> Self {
        Self {
            state_dir_name: state_dir_name.into(),
        }
    }

    pub fn state_dir(&self, identity: &ProjectIdentity) -> PathBuf {
        identity.root().join(&self.state_dir_name)
    }

    pub fn record_path(&self, identity: &ProjectIdentity) -> PathBuf {
        self.state_dir(identity).join(RECORD_FILE)
    }

    /// Where the server's stdout and stderr are appended
    pub fn log_path(&self, identity: &ProjectIdentity) -> PathBuf {
        self.state_dir(identity).join(LOG_FILE)
    }

    /// Read the record; `Ok(None)` when none exists
    pub fn load(&self, identity: &ProjectIdentity) -> Result<Option<ProcessRecord>, LifecycleError> {
        let path = self.record_path(identity);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LifecycleError::Registry { path, source }),
        };

        let record: ProcessRecord =
            serde_json::from_str(&content).map_err(|e| LifecycleError::CorruptRecord {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if record.schema_version != RECORD_SCHEMA_VERSION {
            return Err(LifecycleError::CorruptRecord {
                path,
                reason: format!("unsupported schema version {}", record.schema_version),
            });
        }

        log::debug!("Loaded record for '{}': PID {}", identity.name, record.pid);
        Ok(Some(record))
    }

    pub fn save(&self, record: &ProcessRecord) -> Result<(), LifecycleError> {
        let identity = ProjectIdentity::new(&record.root, &record.name);
        let dir = self.state_dir(&identity);
        let path = self.record_path(&identity);
        let registry_err = |source: io::Error| LifecycleError::Registry {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&dir).map_err(registry_err)?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(registry_err)?;
        serde_json::to_writer_pretty(&mut temp, record).map_err(|e| registry_err(e.into()))?;
        temp.write_all(b"\n").map_err(registry_err)?;
        temp.as_file().sync_all().map_err(registry_err)?;
        temp.persist(&path).map_err(|e| registry_err(e.error))?;

        log::debug!("Saved record for '{}' to {}", record.name, path.display());
        Ok(())
    }

    /// Remove the record. Succeeds when there is nothing to remove.
    pub fn delete(&self, identity: &ProjectIdentity) -> Result<(), LifecycleError> {
        let path = self.record_path(identity);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Deleted record {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LifecycleError::Registry { path, source }),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_DIR)
    }
}
