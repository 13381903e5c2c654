use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::{package_name, ProjectConfig};
use crate::project::error::{Result, SetupError};

/// One finding of the import check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportIssue {
    /// File path relative to the project root
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    pub message: String,
    pub is_error: bool,
}

/// Scaffolds a project and checks its import hygiene
pub struct ProjectSetup {
    project_path: PathBuf,
    name: String,
    config: Option<ProjectConfig>,
}

impl ProjectSetup {
    /// Setup for an existing project; only [`ProjectSetup::check_imports`] applies
    pub fn new(project_path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            project_path: project_path.into(),
            name: name.into(),
            config: None,
        }
    }

    pub fn with_config(config: ProjectConfig) -> Self {
        Self {
            project_path: config.path.clone(),
            name: config.name.clone(),
            config: Some(config),
        }
    }

    fn package_dir(&self) -> PathBuf {
        self.project_path.join("src").join(package_name(&self.name))
    }

    /// Write the project skeleton. Refuses a non-empty target directory.
    pub fn run(&self) -> Result<()> {
        let Some(config) = &self.config else {
            return Err(SetupError::MissingConfig);
        };

        if dir_has_entries(&self.project_path)? {
            return Err(SetupError::DirectoryNotEmpty {
                path: self.project_path.clone(),
            });
        }

        let package = self.package_dir();
        let pyproject = render_pyproject(config).map_err(|e| SetupError::InvalidDescriptor {
            path: self.project_path.join("pyproject.toml"),
            reason: e.to_string(),
        })?;
        write_file(&self.project_path.join("pyproject.toml"), &pyproject)?;
        write_file(&self.project_path.join("README.md"), &render_readme(config))?;
        write_file(&package.join("__init__.py"), &render_init(config))?;
        write_file(&package.join("server.py"), &render_server(config))?;

        log::info!("Scaffolded '{}' in {}", config.name, self.project_path.display());
        Ok(())
    }

    /// Scan the package's Python files for import problems
    pub fn check_imports(&self) -> Result<Vec<ImportIssue>> {
        let package = self.package_dir();
        if !package.is_dir() {
            return Err(SetupError::MissingPackage { path: package });
        }

        let checker = ImportChecker::new();
        let mut issues = Vec::new();

        for entry in WalkDir::new(&package).sort_by_file_name() {
            let entry = entry.map_err(|e| SetupError::Read {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| package.clone()),
                source: e.into(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension() != Some(OsStr::new("py")) {
                continue;
            }

            let content = fs::read_to_string(path).map_err(|source| SetupError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            // Directories between the package root and this file
            let depth = path
                .strip_prefix(&package)
                .map(|rel| rel.components().count().saturating_sub(1))
                .unwrap_or(0);
            let display = path.strip_prefix(&self.project_path).unwrap_or(path);

            issues.extend(checker.check_source(&content, depth).into_iter().map(|(line, message, is_error)| {
                ImportIssue {
                    file: display.to_path_buf(),
                    line,
                    message,
                    is_error,
                }
            }));
        }

        log::debug!("Import check of '{}' found {} issues", self.name, issues.len());
        Ok(issues)
    }
}

struct ImportChecker {
    relative: Regex,
    wildcard: Regex,
    sys_path: Regex,
}

impl ImportChecker {
    fn new() -> Self {
        Self {
            relative: Regex::new(r"^from\s+(\.+)[\w.]*\s+import\b").expect("valid regex"),
            wildcard: Regex::new(r"^from\s+[\w.]+\s+import\s+\*").expect("valid regex"),
            sys_path: Regex::new(r"\bsys\.path\.(append|insert|extend)\s*\(").expect("valid regex"),
        }
    }

    /// `(line, message, is_error)` for each problem in one module at `depth`
    fn check_source(&self, source: &str, depth: usize) -> Vec<(usize, String, bool)> {
        let mut found = Vec::new();

        for (index, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }
            let number = index + 1;

            if let Some(caps) = self.relative.captures(line) {
                let dots = caps[1].len();
                if dots > depth + 1 {
                    found.push((number, "relative import beyond top-level package".to_string(), true));
                }
            }
            if self.wildcard.is_match(line) {
                found.push((number, "wildcard import".to_string(), false));
            }
            if self.sys_path.is_match(line) {
                found.push((number, "sys.path modification; rely on package imports instead".to_string(), false));
            }
        }

        found
    }
}

fn dir_has_entries(path: &Path) -> Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(SetupError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let write_err = |source: std::io::Error| SetupError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, content).map_err(write_err)
}

#[derive(Serialize)]
struct PyProjectDoc<'a> {
    project: ProjectTable<'a>,
    #[serde(rename = "build-system")]
    build_system: BuildSystem<'a>,
}

#[derive(Serialize)]
struct ProjectTable<'a> {
    name: &'a str,
    version: &'a str,
    description: &'a str,
    readme: &'a str,
    #[serde(rename = "requires-python")]
    requires_python: &'a str,
    dependencies: Vec<&'a str>,
    scripts: BTreeMap<&'a str, String>,
}

#[derive(Serialize)]
struct BuildSystem<'a> {
    requires: Vec<&'a str>,
    #[serde(rename = "build-backend")]
    build_backend: &'a str,
}

/// Serialized rather than templated so any description stays valid TOML
fn render_pyproject(config: &ProjectConfig) -> std::result::Result<String, toml::ser::Error> {
    let doc = PyProjectDoc {
        project: ProjectTable {
            name: &config.name,
            version: &config.version,
            description: &config.description,
            readme: "README.md",
            requires_python: ">=3.10",
            dependencies: vec!["mcp>=1.0"],
            scripts: BTreeMap::from([(config.name.as_str(), format!("{}.server:main", config.package_name()))]),
        },
        build_system: BuildSystem {
            requires: vec!["hatchling"],
            build_backend: "hatchling.build",
        },
    };
    toml::to_string(&doc)
}

fn render_readme(config: &ProjectConfig) -> String {
    format!(
        "# {name}\n\n{description}\n\n## Running\n\n```\ncreate-mcp-server start .\ncreate-mcp-server status .\ncreate-mcp-server stop .\n```\n\nThe server binds to `MCP_SERVER_HOST`:`MCP_SERVER_PORT` (default {host}:{port}).\n",
        name = config.name,
        description = config.description,
        host = config.server.host,
        port = config.server.port,
    )
}

fn render_init(config: &ProjectConfig) -> String {
    format!("\"\"\"{}\"\"\"\n\n__version__ = \"{}\"\n", config.name, config.version)
}

fn render_server(config: &ProjectConfig) -> String {
    format!(
        r#""""MCP server entry point for {name}."""

import os

from mcp.server.fastmcp import FastMCP

mcp = FastMCP(
    "{name}",
    host=os.environ.get("MCP_SERVER_HOST", "{host}"),
    port=int(os.environ.get("MCP_SERVER_PORT", "{port}")),
)


@mcp.tool()
def ping() -> str:
    """Health check."""
    return "pong"


def main() -> None:
    mcp.run(transport="sse")


if __name__ == "__main__":
    main()
"#,
        name = config.name,
        host = config.server.host,
        port = config.server.port,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::PyProject;
    use rstest::rstest;
    use tempfile::TempDir;

    fn scaffold(dir: &TempDir) -> ProjectSetup {
        let config = ProjectConfig::new(
            "weather-server",
            "0.1.0",
            "Weather \"tools\"",
            dir.path().join("weather"),
            false,
        )
        .unwrap();
        ProjectSetup::with_config(config)
    }

    #[test]
    fn run_writes_a_loadable_project() {
        let dir = TempDir::new().unwrap();
        scaffold(&dir).run().unwrap();

        let root = dir.path().join("weather");
        assert!(root.join("README.md").is_file());
        assert!(root.join("src/weather_server/__init__.py").is_file());
        assert!(root.join("src/weather_server/server.py").is_file());

        let project = PyProject::for_root(&root).unwrap();
        assert_eq!(project.name(), "weather-server");
        assert_eq!(project.metadata.description.as_deref(), Some("Weather \"tools\""));
    }

    #[rstest]
    #[case("line one\nline two")]
    #[case("tab\there, \"quoted\" and back\\slash")]
    #[case("bell \u{7} and '''triple'''")]
    fn any_description_reads_back(#[case] description: &str) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("notes");
        let config = ProjectConfig::new("notes", "0.1.0", description, &root, false).unwrap();
        ProjectSetup::with_config(config).run().unwrap();

        let project = PyProject::for_root(&root).unwrap();
        assert_eq!(project.name(), "notes");
        assert_eq!(project.metadata.description.as_deref(), Some(description));
    }

    #[test]
    fn scaffolded_project_has_clean_imports() {
        let dir = TempDir::new().unwrap();
        scaffold(&dir).run().unwrap();

        let setup = ProjectSetup::new(dir.path().join("weather"), "weather-server");
        assert_eq!(setup.check_imports().unwrap(), vec![]);
    }

    #[test]
    fn run_refuses_non_empty_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("weather");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("keep.txt"), "mine").unwrap();

        assert!(matches!(scaffold(&dir).run(), Err(SetupError::DirectoryNotEmpty { .. })));
        assert_eq!(fs::read_to_string(root.join("keep.txt")).unwrap(), "mine");
    }

    #[test]
    fn run_accepts_existing_empty_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("weather")).unwrap();
        scaffold(&dir).run().unwrap();
    }

    #[rstest]
    #[case("from . import tools", 0, vec![])]
    #[case("from .. import tools", 0, vec![(1, true)])]
    #[case("from .. import tools", 1, vec![])]
    #[case("from ...core import x", 1, vec![(1, true)])]
    #[case("from os.path import *", 0, vec![(1, false)])]
    #[case("sys.path.insert(0, '..')", 0, vec![(1, false)])]
    #[case("# from .. import tools", 0, vec![])]
    #[case("import os\nfrom .x import *", 0, vec![(2, false)])]
    fn classifies_import_lines(#[case] source: &str, #[case] depth: usize, #[case] expected: Vec<(usize, bool)>) {
        let found: Vec<(usize, bool)> = ImportChecker::new()
            .check_source(source, depth)
            .into_iter()
            .map(|(line, _, is_error)| (line, is_error))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn check_imports_reports_relative_paths_and_lines() {
        let dir = TempDir::new().unwrap();
        let package = dir.path().join("src/weather");
        fs::create_dir_all(package.join("tools")).unwrap();
        fs::write(package.join("__init__.py"), "").unwrap();
        fs::write(package.join("tools/forecast.py"), "import os\nfrom ... import secret\n").unwrap();

        let issues = ProjectSetup::new(dir.path(), "weather").check_imports().unwrap();
        assert_eq!(
            issues,
            vec![ImportIssue {
                file: PathBuf::from("src/weather/tools/forecast.py"),
                line: 2,
                message: "relative import beyond top-level package".to_string(),
                is_error: true,
            }]
        );
    }

    #[test]
    fn check_imports_without_package_fails() {
        let dir = TempDir::new().unwrap();
        let err = ProjectSetup::new(dir.path(), "weather").check_imports().unwrap_err();
        assert!(matches!(err, SetupError::MissingPackage { .. }));
    }
}
