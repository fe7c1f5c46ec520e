//! Error types for keybump modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git is not installed or not on PATH")]
    NotInstalled,

    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to read tags: {0}")]
    Tags(#[source] git2::Error),

    #[error("Failed to read working tree status: {0}")]
    Status(#[source] git2::Error),

    #[error("Failed to find reference '{0}': {1}")]
    ReferenceNotFound(String, #[source] git2::Error),

    #[error("Failed to walk commit history: {0}")]
    RevwalkError(#[source] git2::Error),

    #[error("Failed to spawn git process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Git {command} exited with code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Git {command} timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    #[error("Tag '{0}' already exists")]
    TagExists(String),
}

/// Errors from reading, parsing and writing the changelog.
#[derive(Error, Debug)]
pub enum ChangelogError {
    #[error("Failed to parse changelog: format not recognized by parser:\n\n{content}")]
    Unrecognized { content: String },

    #[error("Release '{version}' has no 'Released on' line (found: {found:?})")]
    MissingReleaseInfo {
        version: String,
        found: Option<String>,
    },

    #[error("Invalid release date '{value}' for format '{format}': {source}")]
    InvalidDate {
        value: String,
        format: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Failed to read changelog: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("Failed to write changelog: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("Failed to lock changelog for writing: {0}")]
    LockFailed(#[source] std::io::Error),
}

/// Errors from version operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version string '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidFormat(String),
}

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", .path.display())]
    ParseFailed { path: PathBuf, message: String },
}

/// Errors surfaced by the release workflow.
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error(
        "Project has not been initialized for releases. \
         Create a tag for version 0.0.0 and try again."
    )]
    UninitializedRepository,

    #[error("Failed to parse release from changelog history in {}", .0.display())]
    NoReleases(PathBuf),

    #[error(
        "Unstashed or uncommitted changes. Stash, commit or reset the following files:\n  {}",
        files.join("\n  ")
    )]
    DirtyIndex { files: Vec<String> },

    #[error("Version '{0}' is already tagged")]
    DuplicateVersion(String),

    #[error("Aborted: {0}")]
    ConfirmationDeclined(String),

    #[error("Failed to read confirmation: {0}")]
    PromptFailed(String),

    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
