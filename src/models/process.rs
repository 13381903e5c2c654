use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::config::ServerConfig;
use crate::models::stats::ProcessStats;

/// Version written into every persisted record
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// A managed project: at most one live server per identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    /// Project root directory
    pub root: PathBuf,
    /// Human-readable project name
    pub name: String,
}

impl ProjectIdentity {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Persisted record of a started server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub schema_version: u32,
    /// Project name
    pub name: String,
    /// Project root directory
    pub root: PathBuf,
    /// OS process id
    pub pid: u32,
    /// Spawn time
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Command line the server was launched with
    #[serde(default)]
    pub command: Vec<String>,
}

impl ProcessRecord {
    pub fn new(
        identity: &ProjectIdentity,
        pid: u32,
        started_at: DateTime<Utc>,
        config: &ServerConfig,
        command: Vec<String>,
    ) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            name: identity.name.clone(),
            root: identity.root.clone(),
            pid,
            started_at,
            host: Some(config.host.clone()),
            port: Some(config.port),
            command,
        }
    }

    /// Time elapsed since spawn; zero if the clock went backwards
    pub fn uptime(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).to_std().unwrap_or_default()
    }
}

/// Server status, derived fresh from the OS on every query
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessStatus {
    pub running: bool,
    pub pid: Option<u32>,
    pub uptime: Option<Duration>,
    /// `None` when the OS could not report metrics
    pub stats: Option<ProcessStats>,
}

impl ProcessStatus {
    pub fn stopped() -> Self {
        Self {
            running: false,
            pid: None,
            uptime: None,
            stats: None,
        }
    }

    pub fn running(pid: u32, uptime: Duration, stats: Option<ProcessStats>) -> Self {
        Self {
            running: true,
            pid: Some(pid),
            uptime: Some(uptime),
            stats,
        }
    }
}

/// Per-project server state. `Starting` and `Stopping` only exist inside a
/// single invocation and are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}
