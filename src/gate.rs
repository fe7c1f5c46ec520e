//! Clean working tree guard run before any mutating release step.

use std::future::Future;

use tracing::{debug, info};

use crate::error::ReleaseError;
use crate::git::GitClient;
use crate::prompt::Prompter;

/// How many times the gate will stash and check again.
pub const MAX_STASH_RETRIES: usize = 1;

/// Guarantees the working tree has no unstaged or uncommitted changes.
///
/// In interactive mode the user may agree to stash dirty files; the check then
/// runs again, at most [`MAX_STASH_RETRIES`] times.
pub struct ConfirmationGate<'a, G: ?Sized, P: ?Sized> {
    git: &'a G,
    prompter: &'a P,
    skip_interactive: bool,
}

impl<'a, G, P> ConfirmationGate<'a, G, P>
where
    G: GitClient + ?Sized,
    P: Prompter + ?Sized,
{
    pub fn new(git: &'a G, prompter: &'a P, skip_interactive: bool) -> Self {
        Self {
            git,
            prompter,
            skip_interactive,
        }
    }

    /// Succeed if the index is clean, possibly after one user-approved stash.
    pub async fn ensure_clean(&self) -> Result<(), ReleaseError> {
        let mut stashes = 0;

        loop {
            let unstaged = self.git.has_unstaged_changes().await?;
            let uncommitted = self.git.has_uncommitted_changes().await?;

            if !unstaged && !uncommitted {
                debug!(stashes, "Working tree is clean");
                return Ok(());
            }

            let files = self.git.diff_files().await?;
            debug!(unstaged, uncommitted, files = files.len(), "Working tree is dirty");

            if self.skip_interactive || stashes >= MAX_STASH_RETRIES {
                return Err(ReleaseError::DirtyIndex { files });
            }

            let question = format!(
                "Unstashed or uncommitted changes in:\n  {}\nStash these changes and continue?",
                files.join("\n  ")
            );
            if !self.prompter.confirm(&question)? {
                return Err(ReleaseError::ConfirmationDeclined(
                    "unstashed or uncommitted changes".to_string(),
                ));
            }

            info!("Stashing {} dirty file(s)", files.len());
            self.git.stash().await?;
            stashes += 1;
        }
    }

    /// Run `next` once the index is clean, returning its result.
    pub async fn ensure_clean_then<T, F, Fut>(&self, next: F) -> Result<T, ReleaseError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ReleaseError>>,
    {
        self.ensure_clean().await?;
        next().await
    }
}
