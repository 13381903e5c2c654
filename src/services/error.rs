use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of the server lifecycle operations
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("server is already running (PID {pid})")]
    AlreadyRunning { pid: u32 },

    #[error("server is not running")]
    NotRunning,

    #[error("server (PID {pid}) did not exit within {}s", waited.as_secs_f64())]
    StopTimeout { pid: u32, waited: Duration },

    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to signal PID {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("metrics unavailable for PID {pid}")]
    MetricsUnavailable { pid: u32 },

    #[error("server record {} is corrupt ({reason}); inspect or remove it manually", path.display())]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("cannot access server record {}: {source}", path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
