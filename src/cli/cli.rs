use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::config::{DEFAULT_HOST, DEFAULT_PORT};

/// Create and manage MCP servers
///
/// Scaffolds Model Context Protocol server projects and starts, stops and
/// reports on their server process.
#[derive(Parser, Debug)]
#[command(name = "create-mcp-server", author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Enable debug logging
    #[arg(long, global = true, overrides_with = "no_debug")]
    debug: bool,

    /// Disable debug logging
    #[arg(long = "no-debug", global = true, overrides_with = "debug")]
    #[allow(dead_code)]
    no_debug: bool,

    /// Seconds `stop` waits for the server to exit
    #[arg(
        long,
        global = true,
        env = "MCP_SERVER_STOP_TIMEOUT",
        default_value_t = 10.0,
        value_parser = parse_seconds
    )]
    pub stop_timeout: f64,

    #[command(subcommand)]
    pub command: Commands,
}

impl CommandArgs {
    pub fn debug(&self) -> bool {
        self.debug
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new MCP server project
    Create(CreateArgs),

    /// Check Python import hygiene in a project
    #[command(name = "check-imports")]
    CheckImports {
        /// Root directory of the project to check
        #[arg(value_parser = existing_path)]
        path: PathBuf,
    },

    /// Start an MCP server
    Start(StartArgs),

    /// Stop a running MCP server
    Stop {
        /// Project directory
        #[arg(value_parser = existing_path)]
        path: PathBuf,
    },

    /// Check MCP server status
    Status {
        /// Project directory
        #[arg(value_parser = existing_path)]
        path: PathBuf,
    },
}

impl Commands {
    /// Prefix for the one-line failure message
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            Commands::Create(_) => "Project setup failed",
            Commands::CheckImports { .. } => "Error checking imports",
            Commands::Start(_) => "Failed to start server",
            Commands::Stop { .. } => "Failed to stop server",
            Commands::Status { .. } => "Error checking status",
        }
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Project directory
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Project name
    #[arg(long)]
    pub name: Option<String>,

    /// Server version
    #[arg(long = "version")]
    pub server_version: Option<String>,

    /// Project description
    #[arg(long)]
    pub description: Option<String>,

    /// Enable Claude.app integration (default)
    #[arg(long = "claudeapp", overrides_with = "no_claudeapp")]
    #[allow(dead_code)]
    pub claudeapp: bool,

    /// Disable Claude.app integration
    #[arg(long = "no-claudeapp", overrides_with = "claudeapp")]
    pub no_claudeapp: bool,
}

impl CreateArgs {
    pub fn claude_app(&self) -> bool {
        !self.no_claudeapp
    }
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Project directory
    #[arg(value_parser = existing_path)]
    pub path: PathBuf,

    /// Server port
    #[arg(long, env = "MCP_SERVER_PORT", default_value_t = DEFAULT_PORT,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Server host
    #[arg(long, env = "MCP_SERVER_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Command to run instead of `uv run <name>`
    #[arg(last = true)]
    pub command: Vec<String>,
}

fn existing_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("path '{}' does not exist", value))
    }
}

/// Longest accepted `--stop-timeout`: one day
const MAX_STOP_TIMEOUT_SECS: f64 = 86_400.0;

fn parse_seconds(value: &str) -> Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("'{}' is not a non-negative number of seconds", value));
    }
    if secs > MAX_STOP_TIMEOUT_SECS {
        return Err(format!("'{}' exceeds the {} second maximum", value, MAX_STOP_TIMEOUT_SECS));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<CommandArgs, clap::Error> {
        CommandArgs::try_parse_from(std::iter::once("create-mcp-server").chain(args.iter().copied()))
    }

    #[test]
    fn create_accepts_all_options() {
        let args = parse(&[
            "create",
            "--path",
            "/tmp/weather",
            "--name",
            "weather",
            "--version",
            "0.2.0",
            "--description",
            "Weather tools",
            "--no-claudeapp",
        ])
        .unwrap();
        match args.command {
            Commands::Create(create) => {
                assert_eq!(create.name.as_deref(), Some("weather"));
                assert_eq!(create.server_version.as_deref(), Some("0.2.0"));
                assert_eq!(create.path, Some(PathBuf::from("/tmp/weather")));
                assert!(!create.claude_app());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn claudeapp_defaults_on_and_last_flag_wins() {
        let Commands::Create(create) = parse(&["create"]).unwrap().command else {
            panic!("expected create");
        };
        assert!(create.claude_app());

        let Commands::Create(create) = parse(&["create", "--no-claudeapp", "--claudeapp"]).unwrap().command else {
            panic!("expected create");
        };
        assert!(create.claude_app());
    }

    #[test]
    fn start_defaults_and_trailing_command() {
        let Commands::Start(start) = parse(&["start", ".", "--", "python", "-m", "weather"]).unwrap().command else {
            panic!("expected start");
        };
        assert_eq!(start.port, DEFAULT_PORT);
        assert_eq!(start.host, DEFAULT_HOST);
        assert_eq!(start.command, vec!["python", "-m", "weather"]);
    }

    #[test]
    fn start_rejects_port_zero() {
        assert_eq!(parse(&["start", ".", "--port", "0"]).unwrap_err().kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn missing_path_is_rejected() {
        let err = parse(&["status", "/definitely/not/here/7f3a"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn negative_stop_timeout_is_rejected() {
        assert!(parse(&["--stop-timeout", "-1", "stop", "."]).is_err());
    }

    #[test]
    fn oversized_stop_timeout_is_a_usage_error() {
        let err = parse(&["--stop-timeout", "1e20", "status", "."]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert!(parse(&["--stop-timeout", "86400", "status", "."]).is_ok());
        assert!(parse(&["--stop-timeout", "86400.5", "status", "."]).is_err());
    }

    #[test]
    fn failure_prefix_names_the_command() {
        let args = parse(&["stop", "."]).unwrap();
        assert_eq!(args.command.failure_prefix(), "Failed to stop server");
    }
}
