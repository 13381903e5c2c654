use serde_json::{json, Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::project::error::{Result, SetupError};

const CONFIG_FILE: &str = "claude_desktop_config.json";

/// The Claude desktop app's MCP server configuration
#[derive(Debug, Clone)]
pub struct ClaudeDesktop {
    app_dir: PathBuf,
}

impl ClaudeDesktop {
    /// Platform location: `<config dir>/Claude`
    pub fn locate() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::at(dir.join("Claude")))
    }

    pub fn at(app_dir: impl Into<PathBuf>) -> Self {
        Self { app_dir: app_dir.into() }
    }

    pub fn config_path(&self) -> PathBuf {
        self.app_dir.join(CONFIG_FILE)
    }

    /// The app keeps its settings directory once installed and launched
    pub fn is_installed(&self) -> bool {
        self.app_dir.is_dir()
    }

    /// Add or replace the `mcpServers.<name>` entry for a project
    pub fn register(&self, name: &str, project_path: &Path) -> Result<()> {
        let path = self.config_path();
        let invalid = |reason: String| SetupError::ClaudeConfig {
            path: path.clone(),
            reason,
        };

        let mut config = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Value::Object(Map::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Value::Object(Map::new()),
            Err(source) => return Err(SetupError::Read { path: path.clone(), source }),
        };

        let root = config
            .as_object_mut()
            .ok_or_else(|| invalid("top level is not an object".to_string()))?;
        let servers = root
            .entry("mcpServers")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| invalid("mcpServers is not an object".to_string()))?;

        servers.insert(
            name.to_string(),
            json!({
                "command": "uv",
                "args": ["--directory", project_path.to_string_lossy(), "run", name],
            }),
        );

        self.write_config(&path, &config)?;
        log::info!("Registered '{}' in {}", name, path.display());
        Ok(())
    }

    fn write_config(&self, path: &Path, config: &Value) -> Result<()> {
        let write_err = |source: io::Error| SetupError::Write {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.app_dir).map_err(write_err)?;

        let mut temp = NamedTempFile::new_in(&self.app_dir).map_err(write_err)?;
        serde_json::to_writer_pretty(&mut temp, config).map_err(|e| write_err(e.into()))?;
        temp.write_all(b"\n").map_err(write_err)?;
        temp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}
