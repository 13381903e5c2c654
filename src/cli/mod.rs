pub mod cli;
pub mod commands;
pub mod error;

pub use cli::{Commands, CommandArgs, CreateArgs, StartArgs};
pub use error::{CliError, EXIT_INVALID_ARGS, EXIT_OK};
