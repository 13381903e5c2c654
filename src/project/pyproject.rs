use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::models::package_name;
use crate::project::error::{Result, SetupError};

/// `[project]` table of a `pyproject.toml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct PyProjectFile {
    project: Option<ProjectMetadata>,
}

/// A parsed `pyproject.toml`
#[derive(Debug, Clone)]
pub struct PyProject {
    pub metadata: ProjectMetadata,
}

impl PyProject {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SetupError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Load `<root>/pyproject.toml`
    pub fn for_root(root: &Path) -> Result<Self> {
        Self::load(&root.join("pyproject.toml"))
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let invalid = |reason: String| SetupError::InvalidDescriptor {
            path: path.to_path_buf(),
            reason,
        };

        let file: PyProjectFile = toml::from_str(content).map_err(|e| invalid(e.message().to_string()))?;
        let metadata = file
            .project
            .ok_or_else(|| invalid("missing [project] table".to_string()))?;
        if metadata.name.trim().is_empty() {
            return Err(invalid("project name is empty".to_string()));
        }

        Ok(Self { metadata })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Python package directory name
    pub fn package_name(&self) -> String {
        package_name(&self.metadata.name)
    }
}
