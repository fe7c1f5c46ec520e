//! Template rendering for changelog entries, commit and tag messages.

use crate::config::{
    DEFAULT_CHANGELOG_FMT, DEFAULT_COMMIT_MSG_FMT, DEFAULT_DATESTR_FMT,
    DEFAULT_SUMMARY_ITEM_PREFIX, DEFAULT_TAG_MSG_FMT,
};

/// Formatting settings shared by the parser and the writer.
///
/// Templates use `{version_num}`, `{datestr}`, `{codename}` and `{summaries}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogFormat {
    pub changelog_fmt: String,
    pub commit_msg_fmt: String,
    pub tag_msg_fmt: String,
    pub summaryitem_fmt: String,
    pub datestr_fmt: String,
}

impl Default for ChangelogFormat {
    fn default() -> Self {
        Self {
            changelog_fmt: DEFAULT_CHANGELOG_FMT.to_string(),
            commit_msg_fmt: DEFAULT_COMMIT_MSG_FMT.to_string(),
            tag_msg_fmt: DEFAULT_TAG_MSG_FMT.to_string(),
            summaryitem_fmt: DEFAULT_SUMMARY_ITEM_PREFIX.to_string(),
            datestr_fmt: DEFAULT_DATESTR_FMT.to_string(),
        }
    }
}

impl ChangelogFormat {
    /// Render one changelog entry.
    pub fn render_entry(
        &self,
        version_num: &str,
        datestr: &str,
        codename: Option<&str>,
        summaries: &[String],
    ) -> String {
        // Summaries go in last so their text is never treated as a placeholder.
        fill(&self.changelog_fmt, version_num, datestr)
            .replace("{codename}", &render_codename(codename))
            .replace("{summaries}", &self.join_summaries(summaries))
    }

    pub fn commit_msg(&self, version_num: &str, datestr: &str) -> String {
        fill(&self.commit_msg_fmt, version_num, datestr)
    }

    pub fn tag_msg(&self, version_num: &str, datestr: &str) -> String {
        fill(&self.tag_msg_fmt, version_num, datestr)
    }

    /// Join summary lines, prefixing each with `summaryitem_fmt`.
    pub fn join_summaries(&self, summaries: &[String]) -> String {
        summaries
            .iter()
            .map(|s| format!("{}{}", self.summaryitem_fmt, s))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Remove the summary prefix from a changelog line.
    pub fn strip_summary_prefix<'a>(&self, line: &'a str) -> &'a str {
        let stripped = match line.strip_prefix(self.summaryitem_fmt.as_str()) {
            Some(rest) => rest,
            None => line.trim_start(),
        };
        stripped.trim_end()
    }
}

fn fill(template: &str, version_num: &str, datestr: &str) -> String {
    template
        .replace("{version_num}", version_num)
        .replace("{datestr}", datestr)
}

fn render_codename(codename: Option<&str>) -> String {
    match codename {
        Some(name) if !name.trim().is_empty() => format!(", codename {}", name.trim()),
        _ => String::new(),
    }
}
