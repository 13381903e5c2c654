pub mod config;
pub mod process;
pub mod stats;

pub use config::{package_name, ConfigError, ProjectConfig, ServerConfig};
pub use process::{LifecycleState, ProcessRecord, ProcessStatus, ProjectIdentity, RECORD_SCHEMA_VERSION};
pub use stats::ProcessStats;
