use anyhow::Context;
use std::path::Path;
use std::time::Duration;

use crate::cli::{CliError, Commands, CreateArgs, StartArgs};
use crate::models::{ProcessStatus, ProjectConfig, ProjectIdentity, ServerConfig};
use crate::project::error::Result as SetupResult;
use crate::project::{prompts, ClaudeDesktop, DialoguerPrompter, Prompted, Prompter, ProjectSetup, PyProject};
use crate::services::{LifecycleManager, ProcessOps};
use crate::settings::Settings;

/// Run one parsed command
pub fn run(command: &Commands, settings: &Settings) -> Result<(), CliError> {
    match command {
        Commands::Create(args) => {
            let claude = ClaudeDesktop::locate().filter(ClaudeDesktop::is_installed);
            create(args, &DialoguerPrompter, claude.as_ref())
        }
        Commands::CheckImports { path } => check_imports(path),
        Commands::Start(args) => start(args, &LifecycleManager::new(settings.clone())),
        Commands::Stop { path } => stop(path, &LifecycleManager::new(settings.clone())),
        Commands::Status { path } => status(path, &LifecycleManager::new(settings.clone())),
    }
}

/// Resolve a project directory to its metadata and identity
fn load_project(path: &Path) -> Result<(PyProject, ProjectIdentity), CliError> {
    let root = path
        .canonicalize()
        .with_context(|| format!("cannot resolve project path {}", path.display()))?;
    let pyproject = PyProject::for_root(&root)?;
    let identity = ProjectIdentity::new(root, pyproject.name());
    Ok((pyproject, identity))
}

fn given_or<T>(given: Option<T>, ask: impl FnOnce() -> SetupResult<Prompted<T>>) -> SetupResult<Prompted<T>> {
    match given {
        Some(value) => Ok(Prompted::Value(value)),
        None => ask(),
    }
}

fn report_cancelled() {
    println!("Project creation cancelled.");
}

pub fn create(args: &CreateArgs, prompter: &dyn Prompter, claude: Option<&ClaudeDesktop>) -> Result<(), CliError> {
    let Prompted::Value(name) = given_or(args.name.clone(), || prompts::prompt_project_name(prompter))? else {
        report_cancelled();
        return Ok(());
    };
    let Prompted::Value(version) =
        given_or(args.server_version.clone(), || prompts::prompt_project_version(prompter))?
    else {
        report_cancelled();
        return Ok(());
    };
    let Prompted::Value(description) =
        given_or(args.description.clone(), || prompts::prompt_project_description(prompter))?
    else {
        report_cancelled();
        return Ok(());
    };
    let Prompted::Value(path) = given_or(args.path.clone(), || prompts::prompt_project_path(prompter, &name))? else {
        report_cancelled();
        return Ok(());
    };

    let config = ProjectConfig::new(name, version, description, path, args.claude_app())?;

    let Prompted::Value(()) = prompts::confirm_project_creation(prompter, &config)? else {
        report_cancelled();
        return Ok(());
    };

    ProjectSetup::with_config(config.clone()).run()?;

    if config.claude_app {
        if let Some(app) = claude {
            register_with_claude(app, prompter, &config);
        }
    }

    println!("✅ Created project {} in {}", config.name, config.path.display());
    println!();
    println!("Next steps:");
    println!("  1. cd {}", config.path.display());
    println!("  2. create-mcp-server start .");
    Ok(())
}

/// Best effort: the project already exists, so any failure here only warns
fn register_with_claude(app: &ClaudeDesktop, prompter: &dyn Prompter, config: &ProjectConfig) {
    match prompts::confirm_claude_registration(prompter) {
        Ok(Prompted::Value(true)) => {}
        Ok(_) => return,
        Err(err) => {
            log::warn!("Claude.app registration prompt failed: {}", err);
            eprintln!("Warning: skipped Claude.app registration: {}", err);
            return;
        }
    }
    let project_path = config.path.canonicalize().unwrap_or_else(|_| config.path.clone());
    if let Err(err) = app.register(&config.name, &project_path) {
        log::warn!("Claude.app registration failed: {}", err);
        eprintln!("Warning: could not register with Claude.app: {}", err);
    }
}

pub fn check_imports(path: &Path) -> Result<(), CliError> {
    let (pyproject, identity) = load_project(path)?;
    log::debug!("Checking imports of package {}", pyproject.package_name());
    let issues = ProjectSetup::new(identity.root(), pyproject.name()).check_imports()?;

    let (errors, warnings): (Vec<_>, Vec<_>) = issues.iter().partition(|issue| issue.is_error);

    for warning in &warnings {
        eprintln!("Warning: {}:{} - {}", warning.file.display(), warning.line, warning.message);
    }
    for error in &errors {
        eprintln!("Error: {}:{} - {}", error.file.display(), error.line, error.message);
    }

    if !errors.is_empty() {
        return Err(CliError::ImportErrors(errors.len()));
    }
    if warnings.is_empty() {
        println!("No import issues found.");
    } else {
        println!();
        println!("Found {} {}.", warnings.len(), plural(warnings.len(), "warning", "warnings"));
    }
    Ok(())
}

pub fn start<P: ProcessOps>(args: &StartArgs, manager: &LifecycleManager<P>) -> Result<(), CliError> {
    let (pyproject, identity) = load_project(&args.path)?;
    log::debug!(
        "Starting {} {}",
        identity.name,
        pyproject.metadata.version.as_deref().unwrap_or("(unversioned)")
    );

    let mut config = ServerConfig::new(identity.name.clone(), args.host.clone(), args.port)?;
    if !args.command.is_empty() {
        config = config.with_command(args.command.clone())?;
    }

    let record = manager.start(&identity, &config)?;
    println!(
        "✅ Server {} started (PID {}) on {}:{}",
        identity.name, record.pid, config.host, config.port
    );
    println!("   Logs: {}", manager.registry().log_path(&identity).display());
    Ok(())
}

pub fn stop<P: ProcessOps>(path: &Path, manager: &LifecycleManager<P>) -> Result<(), CliError> {
    let (_, identity) = load_project(path)?;
    manager.stop(&identity)?;
    println!("✅ Server stopped");
    Ok(())
}

pub fn status<P: ProcessOps>(path: &Path, manager: &LifecycleManager<P>) -> Result<(), CliError> {
    let (_, identity) = load_project(path)?;
    let status = manager.status(&identity)?;
    print!("{}", render_status(&identity.name, &status));
    Ok(())
}

/// The status block, one `Key: value` per line
pub fn render_status(name: &str, status: &ProcessStatus) -> String {
    let mut out = format!("Server: {}\n", name);
    out.push_str(&format!(
        "Status: {}\n",
        if status.running { "Running" } else { "Stopped" }
    ));

    if status.running {
        if let Some(pid) = status.pid {
            out.push_str(&format!("PID: {}\n", pid));
        }
        if let Some(uptime) = status.uptime {
            out.push_str(&format!("Uptime: {}\n", format_uptime(uptime)));
        }
        match &status.stats {
            Some(stats) => {
                out.push_str(&format!("Memory: {:.1} MB\n", stats.memory_mb()));
                out.push_str(&format!("CPU: {:.1}%\n", stats.cpu_usage));
            }
            None => {
                out.push_str("Memory: unknown\n");
                out.push_str("CPU: unknown\n");
            }
        }
    }
    out
}

pub fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}

/// `H:MM:SS`
fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessStats;
    use crate::project::prompts::testing::ScriptedPrompter;
    use crate::project::SetupError;
    use crate::services::LifecycleError;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    fn create_args(dir: &TempDir) -> CreateArgs {
        CreateArgs {
            path: Some(dir.path().join("weather")),
            name: Some("weather".to_string()),
            server_version: Some("0.1.0".to_string()),
            description: Some("Weather tools".to_string()),
            claudeapp: false,
            no_claudeapp: false,
        }
    }

    #[test]
    fn renders_running_status() {
        let status = ProcessStatus::running(
            4242,
            Duration::from_secs(3725),
            Some(ProcessStats {
                cpu_usage: 2.5,
                memory_bytes: 50 * 1024 * 1024,
            }),
        );
        assert_eq!(
            render_status("weather", &status),
            "Server: weather\nStatus: Running\nPID: 4242\nUptime: 1:02:05\nMemory: 50.0 MB\nCPU: 2.5%\n"
        );
    }

    #[test]
    fn renders_unknown_metrics() {
        let status = ProcessStatus::running(7, Duration::from_secs(1), None);
        let rendered = render_status("weather", &status);
        assert!(rendered.contains("Memory: unknown\n"));
        assert!(rendered.contains("CPU: unknown\n"));
    }

    #[test]
    fn renders_stopped_status() {
        assert_eq!(
            render_status("weather", &ProcessStatus::stopped()),
            "Server: weather\nStatus: Stopped\n"
        );
    }

    #[test]
    fn create_with_all_arguments_only_confirms() {
        let dir = TempDir::new().unwrap();
        let prompter = ScriptedPrompter::new(&[], &[Some(true)]);

        create(&create_args(&dir), &prompter, None).unwrap();

        assert!(dir.path().join("weather/pyproject.toml").is_file());
        assert_eq!(*prompter.asked.borrow(), vec!["Is this correct?"]);
    }

    #[test]
    fn create_prompts_for_missing_values() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("prompted");
        let target_answer = target.to_string_lossy().to_string();
        let prompter = ScriptedPrompter::new(
            &[Some("prompted"), Some(""), Some(""), Some(target_answer.as_str())],
            &[Some(true)],
        );
        let args = CreateArgs {
            path: None,
            name: None,
            server_version: None,
            description: None,
            claudeapp: false,
            no_claudeapp: true,
        };

        create(&args, &prompter, None).unwrap();

        let project = PyProject::for_root(&target).unwrap();
        assert_eq!(project.name(), "prompted");
        assert_eq!(project.metadata.version.as_deref(), Some("0.1.0"));
        assert_eq!(project.metadata.description.as_deref(), Some("An MCP server"));
    }

    #[test]
    fn cancelled_prompt_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let prompter = ScriptedPrompter::new(&[None], &[]);
        let mut args = create_args(&dir);
        args.name = None;

        create(&args, &prompter, None).unwrap();
        assert!(!dir.path().join("weather").exists());
    }

    #[test]
    fn declined_confirmation_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let prompter = ScriptedPrompter::new(&[], &[Some(false)]);

        create(&create_args(&dir), &prompter, None).unwrap();
        assert!(!dir.path().join("weather").exists());
    }

    #[test]
    fn invalid_name_argument_is_invalid_args() {
        let dir = TempDir::new().unwrap();
        let prompter = ScriptedPrompter::new(&[], &[]);
        let mut args = create_args(&dir);
        args.name = Some("not valid".to_string());

        let err = create(&args, &prompter, None).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn create_into_non_empty_directory_is_setup_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("weather")).unwrap();
        fs::write(dir.path().join("weather/existing.txt"), "").unwrap();
        let prompter = ScriptedPrompter::new(&[], &[Some(true)]);

        let err = create(&create_args(&dir), &prompter, None).unwrap_err();
        assert!(matches!(err, CliError::Setup(SetupError::DirectoryNotEmpty { .. })));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn create_registers_with_claude_when_accepted() {
        let dir = TempDir::new().unwrap();
        let app_dir = TempDir::new().unwrap();
        let app = ClaudeDesktop::at(app_dir.path());
        let prompter = ScriptedPrompter::new(&[], &[Some(true), Some(true)]);
        let mut args = create_args(&dir);
        args.claudeapp = true;

        create(&args, &prompter, Some(&app)).unwrap();

        let config = fs::read_to_string(app.config_path()).unwrap();
        assert!(config.contains("\"weather\""));
        assert_eq!(prompter.asked.borrow().last().unwrap(), "Register with Claude.app?");
    }

    /// Answers the creation confirmation, then loses its terminal
    struct TerminalLostAfterConfirm {
        confirmed: Cell<bool>,
    }

    impl Prompter for TerminalLostAfterConfirm {
        fn text(
            &self,
            _prompt: &str,
            _default: Option<&str>,
            _validate: fn(&str) -> std::result::Result<(), String>,
        ) -> SetupResult<Prompted<String>> {
            Err(SetupError::Prompt("not a terminal".to_string()))
        }

        fn confirm(&self, _prompt: &str, _default: bool) -> SetupResult<Prompted<bool>> {
            if self.confirmed.replace(true) {
                Err(SetupError::Prompt("not a terminal".to_string()))
            } else {
                Ok(Prompted::Value(true))
            }
        }
    }

    #[test]
    fn failed_registration_prompt_still_creates_project() {
        let dir = TempDir::new().unwrap();
        let app_dir = TempDir::new().unwrap();
        let app = ClaudeDesktop::at(app_dir.path());
        let prompter = TerminalLostAfterConfirm {
            confirmed: Cell::new(false),
        };

        create(&create_args(&dir), &prompter, Some(&app)).unwrap();

        assert!(dir.path().join("weather/pyproject.toml").is_file());
        assert!(!app.config_path().exists());
    }

    #[test]
    fn counts_read_naturally() {
        assert_eq!(plural(1, "warning", "warnings"), "warning");
        assert_eq!(plural(3, "warning", "warnings"), "warnings");
        assert_eq!(CliError::ImportErrors(1).to_string(), "found 1 import error");
        assert_eq!(CliError::ImportErrors(2).to_string(), "found 2 import errors");
    }

    #[test]
    fn no_claudeapp_skips_registration() {
        let dir = TempDir::new().unwrap();
        let app_dir = TempDir::new().unwrap();
        let app = ClaudeDesktop::at(app_dir.path());
        let prompter = ScriptedPrompter::new(&[], &[Some(true)]);
        let mut args = create_args(&dir);
        args.no_claudeapp = true;

        create(&args, &prompter, Some(&app)).unwrap();
        assert!(!app.config_path().exists());
    }

    fn write_project(dir: &Path, name: &str) {
        fs::write(
            dir.join("pyproject.toml"),
            format!("[project]\nname = \"{}\"\nversion = \"0.1.0\"\n", name),
        )
        .unwrap();
    }

    #[test]
    fn check_imports_fails_on_errors() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path(), "weather");
        fs::create_dir_all(dir.path().join("src/weather")).unwrap();
        fs::write(dir.path().join("src/weather/server.py"), "from .. import outside\n").unwrap();

        let err = check_imports(dir.path()).unwrap_err();
        assert!(matches!(err, CliError::ImportErrors(1)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn check_imports_passes_with_warnings_only() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path(), "weather");
        fs::create_dir_all(dir.path().join("src/weather")).unwrap();
        fs::write(dir.path().join("src/weather/server.py"), "from os import *\n").unwrap();

        check_imports(dir.path()).unwrap();
    }

    #[test]
    fn commands_without_pyproject_are_setup_errors() {
        let dir = TempDir::new().unwrap();
        let err = check_imports(dir.path()).unwrap_err();
        assert!(matches!(err, CliError::Setup(SetupError::Read { .. })));
        assert_eq!(err.exit_code(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn start_status_stop_round_trip() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path(), "sleeper");
        let settings = Settings {
            stop_timeout: Duration::from_secs(5),
            startup_grace: Duration::from_millis(50),
            ..Settings::default()
        };
        let manager = LifecycleManager::new(settings);
        let args = StartArgs {
            path: dir.path().to_path_buf(),
            port: 8000,
            host: "127.0.0.1".to_string(),
            command: vec!["sleep".to_string(), "30".to_string()],
        };
        let root = dir.path().to_path_buf();

        start(&args, &manager).unwrap();
        let err = start(&args, &manager).unwrap_err();
        assert!(matches!(err, CliError::Lifecycle(LifecycleError::AlreadyRunning { .. })));

        status(&root, &manager).unwrap();
        stop(&root, &manager).unwrap();

        let err = stop(&root, &manager).unwrap_err();
        assert!(matches!(err, CliError::Lifecycle(LifecycleError::NotRunning)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn start_rejects_blank_host() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path(), "weather");
        let manager = LifecycleManager::new(Settings::default());
        let args = StartArgs {
            path: dir.path().to_path_buf(),
            port: 8000,
            host: " ".to_string(),
            command: vec![],
        };

        let err = start(&args, &manager).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
