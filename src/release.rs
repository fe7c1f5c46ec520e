//! A single versioned changelog entry.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex_lite::Regex;
use semver::Version;

use crate::changelog::format::ChangelogFormat;
use crate::error::{ChangelogError, VersionError};
use crate::version::{BumpType, bump_version_num, parse_version_num};

/// Summary lines shorter than this (in characters) are dropped.
pub const MIN_SUMMARY_LENGTH: usize = 10;

/// Summary used for a synthesized initial release.
pub const INITIAL_VERSION_SUMMARY_ITEM: &str = "initial version setup";

const SKIP_PREFIXES: [&str; 2] = ["merge branch", "merge pull request"];
const SKIP_EQUALITY: [&str; 2] = ["whitespace.", "whitespace"];

static ORDINAL_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(st|nd|rd|th)").expect("ordinal regex is valid"));

/// One release: version, date, optional codename and cleaned summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version_num: String,
    pub date: NaiveDate,
    pub codename: Option<String>,
    pub summaries: Vec<String>,
}

impl Release {
    /// Build a release, parsing `datestr` with the configured date format.
    ///
    /// `None` dates default to today. Summaries are cleaned with [`clean_summaries`].
    pub fn new<S: AsRef<str>>(
        version_num: impl Into<String>,
        datestr: Option<&str>,
        codename: Option<String>,
        summaries: &[S],
        format: &ChangelogFormat,
    ) -> Result<Self, ChangelogError> {
        let date = match datestr {
            Some(value) => parse_datestr(value, &format.datestr_fmt)?,
            None => today(),
        };

        Ok(Self {
            version_num: version_num.into(),
            date,
            codename: codename.filter(|c| !c.trim().is_empty()),
            summaries: clean_summaries(summaries),
        })
    }

    /// Replace the summaries with a cleaned copy of `summaries`.
    pub fn set_summaries<S: AsRef<str>>(&mut self, summaries: &[S]) {
        self.summaries = clean_summaries(summaries);
    }

    /// Increment the version in place.
    pub fn bump(&mut self, bump_type: BumpType) -> Result<(), VersionError> {
        self.version_num = bump_version_num(&self.version_num, bump_type)?;
        Ok(())
    }

    /// The version as a semver triple.
    pub fn version(&self) -> Result<Version, VersionError> {
        parse_version_num(&self.version_num)
    }

    pub fn datestr(&self, format: &ChangelogFormat) -> String {
        self.date.format(&format.datestr_fmt).to_string()
    }

    /// Render this release as a changelog entry.
    pub fn format(&self, format: &ChangelogFormat) -> String {
        format.render_entry(
            &self.version_num,
            &self.datestr(format),
            self.codename.as_deref(),
            &self.summaries,
        )
    }

    pub fn commit_msg(&self, format: &ChangelogFormat) -> String {
        format.commit_msg(&self.version_num, &self.datestr(format))
    }

    pub fn tag_msg(&self, format: &ChangelogFormat) -> String {
        format.tag_msg(&self.version_num, &self.datestr(format))
    }

    /// Name of the git tag created for this release.
    pub fn tag_name(&self) -> &str {
        &self.version_num
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (codename: {}, date: {})",
            self.version_num,
            self.codename.as_deref().unwrap_or("none"),
            self.date
        )
    }
}

/// Filter summary lines into a fresh list.
///
/// Drops lines under [`MIN_SUMMARY_LENGTH`] characters, merge commit subjects
/// and bare "whitespace." entries. Comparisons are case-insensitive.
pub fn clean_summaries<S: AsRef<str>>(summaries: &[S]) -> Vec<String> {
    summaries
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|line| {
            let lower = line.to_lowercase();
            line.chars().count() >= MIN_SUMMARY_LENGTH
                && !SKIP_PREFIXES.iter().any(|p| lower.starts_with(p))
                && !SKIP_EQUALITY.iter().any(|e| lower == *e)
        })
        .map(str::to_string)
        .collect()
}

/// Parse a date, tolerating ordinal suffixes such as `1st` or `22nd`.
pub fn parse_datestr(value: &str, datestr_fmt: &str) -> Result<NaiveDate, ChangelogError> {
    let cleaned = ORDINAL_SUFFIX_RE.replace_all(value.trim(), "$1");
    NaiveDate::parse_from_str(&cleaned, datestr_fmt).map_err(|source| ChangelogError::InvalidDate {
        value: value.to_string(),
        format: datestr_fmt.to_string(),
        source,
    })
}

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
