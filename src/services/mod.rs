pub mod error;
pub mod lifecycle;
pub mod process_checker;
pub mod registry;
pub mod spawner;
pub mod stats_collector;

pub use error::LifecycleError;
pub use lifecycle::{LifecycleManager, ProcessOps};
pub use registry::Registry;
pub use stats_collector::StatsCollector;
