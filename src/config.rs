//! Typed release configuration.
//!
//! Every field has a documented default, so a partial `.keybump.toml` (or no
//! file at all) still yields a complete [`Config`]. CLI flags are applied on
//! top by the binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::changelog::format::ChangelogFormat;
use crate::error::ConfigError;
use crate::version::BumpType;

/// Config file looked up in the repository root, then the home directory,
/// when none is given.
pub const DEFAULT_CONFIG_FILE: &str = ".keybump.toml";

pub const DEFAULT_CHANGELOG_FILE: &str = "CHANGES.md";
pub const DEFAULT_COMMIT_MSG_FMT: &str = "Version bumped to {version_num}";
pub const DEFAULT_TAG_MSG_FMT: &str = "Version bumped to {version_num}";
pub const DEFAULT_SUMMARY_ITEM_PREFIX: &str = "    * ";
pub const DEFAULT_DATESTR_FMT: &str = "%Y-%m-%d";

/// Default changelog entry template.
pub const DEFAULT_CHANGELOG_FMT: &str = "Version {version_num}
----------------------

Released on {datestr}{codename}

{summaries}

";

/// Release configuration passed into a [`crate::Project`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the changelog file (default `CHANGES.md`).
    pub changelog_file: PathBuf,
    /// Never prompt; would-be prompts become errors.
    pub skip_interactive: bool,
    pub skip_commit: bool,
    pub skip_tag: bool,
    pub skip_push: bool,
    /// Template for one changelog entry.
    pub changelog_fmt: String,
    pub commit_msg_fmt: String,
    pub tag_msg_fmt: String,
    /// Prefix written before (and stripped from) each summary line.
    pub summaryitem_fmt: String,
    /// chrono format string for release dates.
    pub datestr_fmt: String,
    /// Part to bump. Unset means only report the current version.
    pub bump_type: Option<BumpType>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            changelog_file: PathBuf::from(DEFAULT_CHANGELOG_FILE),
            skip_interactive: false,
            skip_commit: false,
            skip_tag: false,
            skip_push: false,
            changelog_fmt: DEFAULT_CHANGELOG_FMT.to_string(),
            commit_msg_fmt: DEFAULT_COMMIT_MSG_FMT.to_string(),
            tag_msg_fmt: DEFAULT_TAG_MSG_FMT.to_string(),
            summaryitem_fmt: DEFAULT_SUMMARY_ITEM_PREFIX.to_string(),
            datestr_fmt: DEFAULT_DATESTR_FMT.to_string(),
            bump_type: None,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or from `.keybump.toml` in
    /// `dir` or the user's home directory.
    ///
    /// An explicit path must exist. Without one, a missing default file yields
    /// [`Config::default`].
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        Self::load_with_home(explicit, dir, dirs::home_dir().as_deref())
    }

    /// [`Config::load`] with an explicit home directory.
    pub fn load_with_home(
        explicit: Option<&Path>,
        dir: &Path,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match find_config_file(dir, home) {
                Some(path) => path,
                None => {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFailed {
            path: path.clone(),
            source,
        })?;

        let config = Self::from_toml(&content).map_err(|message| ConfigError::ParseFailed {
            path: path.clone(),
            message,
        })?;

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml_edit::de::from_str(content).map_err(|e| e.to_string())
    }

    /// Formatting settings used when rendering and parsing changelog entries.
    pub fn changelog_format(&self) -> ChangelogFormat {
        ChangelogFormat {
            changelog_fmt: self.changelog_fmt.clone(),
            commit_msg_fmt: self.commit_msg_fmt.clone(),
            tag_msg_fmt: self.tag_msg_fmt.clone(),
            summaryitem_fmt: self.summaryitem_fmt.clone(),
            datestr_fmt: self.datestr_fmt.clone(),
        }
    }
}

fn find_config_file(dir: &Path, home: Option<&Path>) -> Option<PathBuf> {
    std::iter::once(dir)
        .chain(home)
        .map(|base| base.join(DEFAULT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}
