use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for project collaborators
pub type Result<T> = std::result::Result<T, SetupError>;

/// Failures while reading, scaffolding or registering a project
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid project descriptor {}: {reason}", path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("package directory {} not found", path.display())]
    MissingPackage { path: PathBuf },

    #[error("directory {} already exists and is not empty", path.display())]
    DirectoryNotEmpty { path: PathBuf },

    #[error("no project configuration given")]
    MissingConfig,

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("cannot update Claude config {}: {reason}", path.display())]
    ClaudeConfig { path: PathBuf, reason: String },
}
