//! keybump - A CLI tool that cuts a new release from a plain-text changelog.
//!
//! # Overview
//!
//! keybump reads the most recent entry of `CHANGES.md`, bumps its version,
//! collects commit subjects since the last tag as summaries, prepends the new
//! entry to the changelog, then commits, tags and pushes it.

pub mod changelog;
pub mod config;
pub mod error;
pub mod gate;
pub mod git;
pub mod project;
pub mod prompt;
pub mod release;
pub mod version;

// Re-export commonly used types
pub use changelog::{Changelog, ChangelogFormat};
pub use config::Config;
pub use error::{ChangelogError, ConfigError, GitError, ReleaseError, VersionError};
pub use gate::ConfirmationGate;
pub use git::{GitClient, GitRepo};
pub use project::{Project, ProjectState};
pub use prompt::{Prompter, TerminalPrompter};
pub use release::Release;
pub use version::BumpType;
