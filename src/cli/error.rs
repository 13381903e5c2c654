use thiserror::Error;

use crate::cli::commands::plural;
use crate::models::ConfigError;
use crate::project::SetupError;
use crate::services::LifecycleError;

pub const EXIT_OK: i32 = 0;
pub const EXIT_INVALID_ARGS: i32 = 1;
pub const EXIT_SETUP_ERROR: i32 = 2;
pub const EXIT_RUNTIME_ERROR: i32 = 3;

/// Every way a command can fail, as seen by the dispatcher
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    InvalidArgs(#[from] ConfigError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("found {0} import {noun}", noun = error_noun(.0))]
    ImportErrors(usize),

    #[error("{0:#}")]
    Runtime(#[from] anyhow::Error),
}

fn error_noun(count: &usize) -> &'static str {
    plural(*count, "error", "errors")
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => EXIT_INVALID_ARGS,
            CliError::Setup(_) => EXIT_SETUP_ERROR,
            CliError::Lifecycle(_) => EXIT_SETUP_ERROR,
            CliError::ImportErrors(_) => EXIT_SETUP_ERROR,
            CliError::Runtime(_) => EXIT_RUNTIME_ERROR,
        }
    }
}
