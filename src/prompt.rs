//! Yes/no questions on the terminal.

use dialoguer::Confirm;

use crate::error::ReleaseError;

/// Asks the user to confirm an action.
///
/// This abstraction allows scripting answers in tests.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync {
    /// Show `message` and return the user's answer.
    fn confirm(&self, message: &str) -> Result<bool, ReleaseError>;
}

/// Prompter backed by dialoguer. An empty answer means "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str) -> Result<bool, ReleaseError> {
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(|e| ReleaseError::PromptFailed(e.to_string()))
    }
}
