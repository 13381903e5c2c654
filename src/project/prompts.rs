use dialoguer::{Confirm, Input};
use std::io;
use std::path::{Path, PathBuf};

use crate::models::config::{validate_name, validate_version};
use crate::models::ProjectConfig;
use crate::project::error::{Result, SetupError};

/// Answer to a prompt: a value, or the user backed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompted<T> {
    Value(T),
    Cancelled,
}

impl<T> Prompted<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Prompted<U> {
        match self {
            Prompted::Value(value) => Prompted::Value(f(value)),
            Prompted::Cancelled => Prompted::Cancelled,
        }
    }
}

/// Source of interactive answers
pub trait Prompter {
    fn text(&self, prompt: &str, default: Option<&str>, validate: fn(&str) -> std::result::Result<(), String>)
        -> Result<Prompted<String>>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<Prompted<bool>>;
}

/// Terminal prompts
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn text(
        &self,
        prompt: &str,
        default: Option<&str>,
        validate: fn(&str) -> std::result::Result<(), String>,
    ) -> Result<Prompted<String>> {
        let mut input = Input::<String>::new()
            .with_prompt(prompt)
            .validate_with(move |value: &String| validate(value));
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        match input.interact_text() {
            Ok(value) => Ok(Prompted::Value(value)),
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => Ok(Prompted::Cancelled),
            Err(e) => Err(SetupError::Prompt(e.to_string())),
        }
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<Prompted<bool>> {
        match Confirm::new().with_prompt(prompt).default(default).interact_opt() {
            Ok(Some(answer)) => Ok(Prompted::Value(answer)),
            Ok(None) => Ok(Prompted::Cancelled),
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => Ok(Prompted::Cancelled),
            Err(e) => Err(SetupError::Prompt(e.to_string())),
        }
    }
}

fn check_name(value: &str) -> std::result::Result<(), String> {
    validate_name(value).map_err(|e| e.to_string())
}

fn check_version(value: &str) -> std::result::Result<(), String> {
    validate_version(value).map_err(|e| e.to_string())
}

fn accept_any(_: &str) -> std::result::Result<(), String> {
    Ok(())
}

pub fn prompt_project_name(prompter: &dyn Prompter) -> Result<Prompted<String>> {
    prompter.text("Project name", None, check_name)
}

pub fn prompt_project_version(prompter: &dyn Prompter) -> Result<Prompted<String>> {
    prompter.text("Project version", Some("0.1.0"), check_version)
}

pub fn prompt_project_description(prompter: &dyn Prompter) -> Result<Prompted<String>> {
    prompter.text("Project description", Some("An MCP server"), accept_any)
}

pub fn prompt_project_path(prompter: &dyn Prompter, name: &str) -> Result<Prompted<PathBuf>> {
    let default = Path::new(".").join(name);
    Ok(prompter
        .text("Project directory", Some(&default.to_string_lossy()), accept_any)?
        .map(PathBuf::from))
}

/// Show the summary and ask to go ahead; declining counts as cancelled
pub fn confirm_project_creation(prompter: &dyn Prompter, config: &ProjectConfig) -> Result<Prompted<()>> {
    println!();
    println!("Project will be created at: {}", config.path.display());
    println!("  Name:        {}", config.name);
    println!("  Version:     {}", config.version);
    println!("  Description: {}", config.description);
    println!();

    Ok(match prompter.confirm("Is this correct?", true)? {
        Prompted::Value(true) => Prompted::Value(()),
        Prompted::Value(false) | Prompted::Cancelled => Prompted::Cancelled,
    })
}

pub fn confirm_claude_registration(prompter: &dyn Prompter) -> Result<Prompted<bool>> {
    prompter.confirm("Register with Claude.app?", true)
}
