//! Parse changelog text into releases.
//!
//! The parser is a three-state machine driven one line at a time:
//!
//! - `SeekHeader`: skip lines until `Version <token>`.
//! - `SeekReleaseInfo`: skip an optional underline and blank lines, then
//!   require `Released on <date>[, codename <name>]`.
//! - `CollectSummaries`: gather non-blank lines until a blank line, the next
//!   header, or end of input.

use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::debug;

use crate::error::ChangelogError;
use crate::release::Release;

use super::format::ChangelogFormat;

static VERSION_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Version\s+(\S+)$").expect("version header regex is valid"));

static RELEASE_INFO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^Released on (.+?)(?:, codename (.+))?$").expect("release info regex is valid")
});

/// A release block whose header lines have been read.
#[derive(Debug)]
struct PendingRelease {
    version_num: String,
    datestr: String,
    codename: Option<String>,
    summaries: Vec<String>,
}

impl PendingRelease {
    fn finish(self, format: &ChangelogFormat) -> Result<Release, ChangelogError> {
        debug!(
            version = %self.version_num,
            summaries = self.summaries.len(),
            "Parsed release"
        );
        Release::new(
            self.version_num,
            Some(&self.datestr),
            self.codename,
            &self.summaries,
            format,
        )
    }
}

#[derive(Debug)]
enum State {
    SeekHeader,
    SeekReleaseInfo { version_num: String },
    CollectSummaries { pending: PendingRelease },
}

/// Parse the full text of a changelog into releases, in file order.
///
/// Empty (or whitespace-only) text yields no releases. Non-empty text without
/// a single release block is [`ChangelogError::Unrecognized`].
pub fn parse_releases(content: &str, format: &ChangelogFormat) -> Result<Vec<Release>, ChangelogError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut releases = Vec::new();
    let mut state = State::SeekHeader;

    for line in content.lines() {
        let trimmed = line.trim();

        state = match state {
            State::SeekHeader => match version_header(trimmed) {
                Some(version_num) => State::SeekReleaseInfo { version_num },
                None => State::SeekHeader,
            },

            State::SeekReleaseInfo { version_num } => {
                if trimmed.is_empty() || is_underline(trimmed) {
                    State::SeekReleaseInfo { version_num }
                } else if let Some((datestr, codename)) = release_info(trimmed) {
                    State::CollectSummaries {
                        pending: PendingRelease {
                            version_num,
                            datestr,
                            codename,
                            summaries: Vec::new(),
                        },
                    }
                } else {
                    return Err(ChangelogError::MissingReleaseInfo {
                        version: version_num,
                        found: Some(trimmed.to_string()),
                    });
                }
            }

            State::CollectSummaries { mut pending } => {
                if let Some(version_num) = version_header(trimmed) {
                    releases.push(pending.finish(format)?);
                    State::SeekReleaseInfo { version_num }
                } else if trimmed.is_empty() {
                    // blank lines before the first item belong to the header
                    if pending.summaries.is_empty() {
                        State::CollectSummaries { pending }
                    } else {
                        releases.push(pending.finish(format)?);
                        State::SeekHeader
                    }
                } else {
                    pending
                        .summaries
                        .push(format.strip_summary_prefix(line).to_string());
                    State::CollectSummaries { pending }
                }
            }
        };
    }

    match state {
        State::SeekHeader => {}
        State::SeekReleaseInfo { version_num } => {
            return Err(ChangelogError::MissingReleaseInfo {
                version: version_num,
                found: None,
            });
        }
        State::CollectSummaries { pending } => releases.push(pending.finish(format)?),
    }

    if releases.is_empty() {
        return Err(ChangelogError::Unrecognized {
            content: content.to_string(),
        });
    }

    Ok(releases)
}

fn version_header(line: &str) -> Option<String> {
    VERSION_HEADER_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn release_info(line: &str) -> Option<(String, Option<String>)> {
    let caps = RELEASE_INFO_RE.captures(line)?;
    let datestr = caps.get(1)?.as_str().trim().to_string();
    let codename = caps.get(2).map(|m| m.as_str().trim().to_string());
    Some((datestr, codename))
}

fn is_underline(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c == '-' || c == '=')
}
