use std::time::Duration;

use crate::cli::CommandArgs;
use crate::services::registry::DEFAULT_STATE_DIR;

/// Runtime settings, built once in `main` and passed down explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Verbose logging
    pub debug: bool,
    /// Ceiling on how long `stop` waits for the server to exit
    pub stop_timeout: Duration,
    /// First delay between liveness polls while stopping
    pub poll_interval: Duration,
    /// Backoff cap for liveness polls
    pub max_poll_interval: Duration,
    /// Pause after spawning before confirming the server stayed up
    pub startup_grace: Duration,
    /// Per-project state directory name
    pub state_dir_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            stop_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            max_poll_interval: Duration::from_millis(500),
            startup_grace: Duration::from_millis(250),
            state_dir_name: DEFAULT_STATE_DIR.to_string(),
        }
    }
}

impl Settings {
    pub fn from_args(args: &CommandArgs) -> Self {
        Self {
            debug: args.debug(),
            // Out-of-range values mean "wait without a deadline"
            stop_timeout: Duration::try_from_secs_f64(args.stop_timeout).unwrap_or(Duration::MAX),
            ..Self::default()
        }
    }

    /// Default `env_logger` filter; `RUST_LOG` still wins
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}
