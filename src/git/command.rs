//! Bounded `git` subprocess execution.

use std::env;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::GitError;

/// Default timeout for a single git subprocess.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable to override the default timeout.
const TIMEOUT_ENV_VAR: &str = "KEYBUMP_GIT_TIMEOUT";

/// Get the configured timeout duration.
///
/// Reads from KEYBUMP_GIT_TIMEOUT if set, otherwise uses 60 seconds.
/// Invalid values log a warning and fall back to the default.
fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// Check that the git binary is installed and accessible.
pub fn check_git_installed() -> Result<(), GitError> {
    which::which("git").map(|_| ()).map_err(|_| GitError::NotInstalled)
}

/// Run `git <args>` in `dir` and return its stdout.
pub async fn run_git(dir: &Path, args: &[&str]) -> Result<String, GitError> {
    run_command("git", dir, args, get_timeout()).await
}

/// Run a program with a deadline. The child is killed if the deadline passes.
pub(crate) async fn run_command(
    program: &str,
    dir: &Path,
    args: &[&str],
    limit: Duration,
) -> Result<String, GitError> {
    // git errors are labelled by subcommand, anything else by program name
    let command = match args.first() {
        Some(sub) if program == "git" => sub.to_string(),
        _ => program.to_string(),
    };
    debug!(program, ?args, "Running command");

    let output = timeout(
        limit,
        Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| GitError::Timeout {
        command: command.clone(),
        secs: limit.as_secs(),
    })?
    .map_err(GitError::SpawnFailed)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output.status.code().unwrap_or(-1);
        return Err(GitError::NonZeroExit {
            command,
            code,
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
