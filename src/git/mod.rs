//! Git collaborator used by the release workflow.
//!
//! Reads (tags, status, history) go through git2; anything that mutates the
//! repository shells out to the system `git` binary so the user's config,
//! hooks and credentials apply.

pub mod command;
pub mod repo;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::GitError;

pub use command::{check_git_installed, run_git};
pub use repo::GitRepo;

/// Operations the release workflow needs from a git repository.
///
/// This abstraction allows mocking git in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitClient: Send + Sync {
    /// All tag names, oldest first by the date of the commit they point to.
    async fn get_tags(&self) -> Result<Vec<String>, GitError>;

    /// The tag at HEAD, or the nearest tag reachable from it.
    async fn get_current_tag(&self) -> Result<Option<String>, GitError>;

    /// Tracked files modified in the working tree but not staged.
    async fn has_unstaged_changes(&self) -> Result<bool, GitError>;

    /// Changes staged in the index but not committed.
    async fn has_uncommitted_changes(&self) -> Result<bool, GitError>;

    async fn is_clean(&self) -> Result<bool, GitError> {
        Ok(!self.has_unstaged_changes().await? && !self.has_uncommitted_changes().await?)
    }

    /// Paths of every dirty (staged or unstaged) tracked file.
    async fn diff_files(&self) -> Result<Vec<String>, GitError>;

    async fn stash(&self) -> Result<(), GitError>;

    async fn commit(&self, files: &[PathBuf], message: &str) -> Result<(), GitError>;

    /// Create an annotated tag. Fails with [`GitError::TagExists`] if taken.
    async fn tag(&self, message: &str, tag_name: &str) -> Result<(), GitError>;

    /// Push the current branch, then tags.
    async fn push(&self) -> Result<(), GitError>;

    /// Subjects of non-merge commits in `tag..to`, newest first.
    async fn commits_since(&self, tag: &str, to: &str) -> Result<Vec<String>, GitError>;
}
