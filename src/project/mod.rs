//! Project-side collaborators of the server commands: reading project
//! metadata, scaffolding, import checks, prompting and Claude desktop
//! registration.

pub mod claude;
pub mod error;
pub mod prompts;
pub mod pyproject;
pub mod setup;

pub use claude::ClaudeDesktop;
pub use error::SetupError;
pub use prompts::{DialoguerPrompter, Prompted, Prompter};
pub use pyproject::PyProject;
pub use setup::ProjectSetup;
