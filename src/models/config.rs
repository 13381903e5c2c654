use std::path::PathBuf;
use thiserror::Error;

/// Default port handed to a started server
pub const DEFAULT_PORT: u16 = 8000;
/// Default bind host handed to a started server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Rejected user-supplied configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid project name '{0}': use letters, digits, '-' or '_', starting with a letter")]
    InvalidName(String),

    #[error("invalid version '{0}': expected a semantic version such as 0.1.0")]
    InvalidVersion(String),

    #[error("host must not be empty")]
    EmptyHost,

    #[error("port must be between 1 and 65535")]
    InvalidPort,

    #[error("server command must not be empty")]
    EmptyCommand,
}

pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidName(name.to_string()))
    }
}

pub fn validate_version(version: &str) -> Result<(), ConfigError> {
    semver::Version::parse(version)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidVersion(version.to_string()))
}

/// Python package (import) name for a project name
pub fn package_name(name: &str) -> String {
    name.replace('-', "_").to_lowercase()
}

/// How one server is launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Project name
    pub name: String,
    /// Bind host passed to the server
    pub host: String,
    /// Bind port passed to the server
    pub port: u16,
    /// Explicit command line; `None` runs the project's script through uv
    pub command: Option<Vec<String>>,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Result<Self, ConfigError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(Self {
            name: name.into(),
            host,
            port,
            command: None,
        })
    }

    pub fn with_command(mut self, command: Vec<String>) -> Result<Self, ConfigError> {
        if command.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(ConfigError::EmptyCommand);
        }
        self.command = Some(command);
        Ok(self)
    }

    /// Command line to spawn
    pub fn command_line(&self) -> Vec<String> {
        match &self.command {
            Some(command) => command.clone(),
            None => vec!["uv".to_string(), "run".to_string(), self.name.clone()],
        }
    }

    /// Environment handed to the server process
    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            ("MCP_SERVER_NAME".to_string(), self.name.clone()),
            ("MCP_SERVER_HOST".to_string(), self.host.clone()),
            ("MCP_SERVER_PORT".to_string(), self.port.to_string()),
        ]
    }
}

/// Everything `create` needs to scaffold a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Target directory
    pub path: PathBuf,
    pub server: ServerConfig,
    /// Offer registration with the Claude desktop app
    pub claude_app: bool,
}

impl ProjectConfig {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        path: impl Into<PathBuf>,
        claude_app: bool,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let version = version.into();
        validate_name(&name)?;
        validate_version(&version)?;
        let server = ServerConfig::new(name.clone(), DEFAULT_HOST, DEFAULT_PORT)?;
        Ok(Self {
            name,
            version,
            description: description.into(),
            path: path.into(),
            server,
            claude_app,
        })
    }

    pub fn package_name(&self) -> String {
        package_name(&self.name)
    }
}
