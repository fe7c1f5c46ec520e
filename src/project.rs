//! Release lifecycle for one project.
//!
//! A [`Project`] moves through [`ProjectState`]s as it reads tags and the
//! changelog, computes the next release, and finally commits, tags and pushes
//! it. Every failure is returned as a [`ReleaseError`]; nothing here exits the
//! process.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::changelog::{Changelog, ChangelogFormat, parse_releases};
use crate::config::Config;
use crate::error::{GitError, ReleaseError};
use crate::gate::ConfirmationGate;
use crate::git::GitClient;
use crate::prompt::Prompter;
use crate::release::{INITIAL_VERSION_SUMMARY_ITEM, Release, today};
use crate::version::{INITIAL_VERSION_NUM, parse_version_num, strip_to_version_num};

/// Where a project is in the release lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectState {
    /// Nothing parsed yet.
    Uninitialized,
    /// The changelog was empty and a `0.0.0` release was synthesized.
    InitialRelease,
    /// At least one release was parsed from the changelog.
    HasReleases,
    /// The next release has been computed.
    Releasing,
    /// The next release has been committed (and tagged/pushed unless skipped).
    Committed,
}

/// Drives one release of a project.
pub struct Project<G, P> {
    config: Config,
    format: ChangelogFormat,
    changelog: Changelog,
    git: G,
    prompter: P,
    releases: Vec<Release>,
    tags: Vec<String>,
    latest_tag: Option<String>,
    current_tag: Option<String>,
    last_version_num: String,
    state: ProjectState,
}

impl<G: GitClient, P: Prompter> Project<G, P> {
    pub fn new(config: Config, git: G, prompter: P) -> Self {
        let format = config.changelog_format();
        let changelog = Changelog::new(config.changelog_file.clone());
        Self {
            config,
            format,
            changelog,
            git,
            prompter,
            releases: Vec::new(),
            tags: Vec::new(),
            latest_tag: None,
            current_tag: None,
            last_version_num: INITIAL_VERSION_NUM.to_string(),
            state: ProjectState::Uninitialized,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn format(&self) -> &ChangelogFormat {
        &self.format
    }

    pub fn changelog(&self) -> &Changelog {
        &self.changelog
    }

    pub fn git(&self) -> &G {
        &self.git
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn state(&self) -> ProjectState {
        self.state
    }

    /// Releases parsed from the changelog, most recent first.
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    /// The most recent release in the changelog.
    pub fn last_release(&self) -> Option<&Release> {
        self.releases.first()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn latest_tag(&self) -> Option<&str> {
        self.latest_tag.as_deref()
    }

    pub fn current_tag(&self) -> Option<&str> {
        self.current_tag.as_deref()
    }

    pub fn last_version_num(&self) -> &str {
        &self.last_version_num
    }

    /// The clean-index guard for this project.
    pub fn gate(&self) -> ConfirmationGate<'_, G, P> {
        ConfirmationGate::new(&self.git, &self.prompter, self.config.skip_interactive)
    }

    /// Load tags and resolve `latest_tag` and `current_tag`.
    ///
    /// `current_tag` is the tag at (or nearest to) HEAD when it is a known tag,
    /// otherwise the latest one.
    pub async fn parse_git_tags(&mut self) -> Result<(), ReleaseError> {
        let tags = self.git.get_tags().await?;
        let Some(latest) = tags.last().cloned() else {
            return Err(ReleaseError::UninitializedRepository);
        };

        let current = match self.git.get_current_tag().await? {
            Some(tag) if tags.contains(&tag) => tag,
            _ => latest.clone(),
        };

        debug!(latest = %latest, current = %current, count = tags.len(), "Parsed git tags");
        self.tags = tags;
        self.latest_tag = Some(latest);
        self.current_tag = Some(current);
        Ok(())
    }

    /// Derive `last_version_num` from `current_tag`, e.g. `v1.2.3` -> `1.2.3`.
    ///
    /// The next release is bumped from the changelog, so a tag that does not
    /// strip to `MAJOR.MINOR.PATCH` (`v1.2.1-rc.1`, `nightly`) is only reported.
    pub fn parse_versions(&mut self) {
        let Some(current) = self.current_tag.as_deref().filter(|t| !t.is_empty()) else {
            return;
        };

        let version_num = strip_to_version_num(current);
        if let Err(e) = parse_version_num(&version_num) {
            warn!(tag = current, "Current tag is not a release version: {}", e);
        }

        debug!(tag = current, version = %version_num, "Parsed last version");
        self.last_version_num = version_num;
    }

    /// Read tags and the last version only; nothing is prompted or written.
    pub async fn inspect(&mut self) -> Result<(), ReleaseError> {
        self.parse_git_tags().await?;
        self.parse_versions();
        Ok(())
    }

    /// Parse the changelog into releases.
    ///
    /// An empty changelog fails in non-interactive mode. Otherwise the user is
    /// asked whether to set up an initial `0.0.0` release, which is then
    /// written to the changelog.
    pub fn parse_releases(&mut self) -> Result<(), ReleaseError> {
        self.load_releases()?;
        if !self.releases.is_empty() {
            return Ok(());
        }

        let missing = ReleaseError::NoReleases(self.changelog.path().to_path_buf());
        if self.config.skip_interactive {
            return Err(missing);
        }
        info!("{}", missing);

        if !self
            .prompter
            .confirm("Do you want keybump to set up the initial release?")?
        {
            return Err(ReleaseError::ConfirmationDeclined(
                "initial release not created".to_string(),
            ));
        }

        let release = self.create_initial_release()?;
        self.changelog.prepend(&release.format(&self.format))?;
        info!("Created initial release {}", release.version_num);

        self.releases = vec![release];
        self.state = ProjectState::InitialRelease;
        Ok(())
    }

    fn load_releases(&mut self) -> Result<(), ReleaseError> {
        let content = self.changelog.read()?;
        self.releases = parse_releases(&content, &self.format)?;

        if !self.releases.is_empty() {
            debug!(count = self.releases.len(), "Parsed releases from changelog");
            self.state = ProjectState::HasReleases;
        }
        Ok(())
    }

    /// A `0.0.0` release dated today with the default summary.
    pub fn create_initial_release(&self) -> Result<Release, ReleaseError> {
        Ok(Release::new(
            INITIAL_VERSION_NUM,
            None,
            None,
            &[INITIAL_VERSION_SUMMARY_ITEM],
            &self.format,
        )?)
    }

    /// Compute the next release from the last one.
    ///
    /// The version is bumped per `config.bump_type` (patch when unset) and must
    /// not already be tagged. Summaries are the non-merge commit subjects since `current_tag`.
    pub async fn new_release(&mut self) -> Result<Release, ReleaseError> {
        let last = self
            .last_release()
            .ok_or_else(|| ReleaseError::NoReleases(self.changelog.path().to_path_buf()))?;

        let mut release = Release {
            version_num: last.version_num.clone(),
            date: today(),
            codename: last.codename.clone(),
            summaries: Vec::new(),
        };
        let bump_type = self.config.bump_type.unwrap_or_default();
        release.bump(bump_type)?;

        if self.is_tagged(&release.version_num) {
            return Err(ReleaseError::DuplicateVersion(release.version_num));
        }

        let since = self
            .current_tag
            .clone()
            .ok_or(ReleaseError::UninitializedRepository)?;
        let subjects = self.git.commits_since(&since, "HEAD").await?;
        release.set_summaries(&subjects);

        info!(
            from = %last.version_num,
            to = %release.version_num,
            bump = %bump_type,
            summaries = release.summaries.len(),
            "Prepared release"
        );
        self.state = ProjectState::Releasing;
        Ok(release)
    }

    /// Prepend the release entry to the changelog.
    pub fn write_release(&self, release: &Release) -> Result<(), ReleaseError> {
        self.changelog.prepend(&release.format(&self.format))?;
        Ok(())
    }

    /// Commit the changelog, tag the release and push, honoring the skip flags.
    pub async fn commit_release(&mut self, release: &Release) -> Result<(), ReleaseError> {
        if !self.config.skip_commit {
            let files: Vec<PathBuf> = vec![self.changelog.path().to_path_buf()];
            let message = release.commit_msg(&self.format);
            self.git.commit(&files, &message).await?;
            info!("Created commit: {}", message);
        }

        if !self.config.skip_tag {
            let message = release.tag_msg(&self.format);
            match self.git.tag(&message, release.tag_name()).await {
                Ok(()) => info!("Created tag: {}", release.tag_name()),
                // another run got there first
                Err(GitError::TagExists(_)) => {
                    return Err(ReleaseError::DuplicateVersion(release.version_num.clone()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        if !self.config.skip_push {
            self.git.push().await?;
            info!("Pushed to remote");
        }

        self.state = ProjectState::Committed;
        Ok(())
    }

    /// Check the index and compute the next release.
    ///
    /// Dirty files may be stashed and an empty changelog initialized, both
    /// only after the user confirms.
    pub async fn prepare(&mut self) -> Result<Release, ReleaseError> {
        self.gate().ensure_clean().await?;
        self.parse_git_tags().await?;
        self.parse_versions();
        self.parse_releases()?;
        self.new_release().await
    }

    /// Compute the next release without prompting, stashing or writing.
    ///
    /// A dirty index is reported as [`ReleaseError::DirtyIndex`]. An empty
    /// changelog is previewed as if the initial release had been accepted.
    pub async fn preview(&mut self) -> Result<Release, ReleaseError> {
        ConfirmationGate::new(&self.git, &self.prompter, true)
            .ensure_clean()
            .await?;
        self.parse_git_tags().await?;
        self.parse_versions();
        self.load_releases()?;

        if self.releases.is_empty() {
            debug!("Changelog is empty, previewing from the initial release");
            self.releases = vec![self.create_initial_release()?];
            self.state = ProjectState::InitialRelease;
        }

        self.new_release().await
    }

    /// Run the whole lifecycle and return the new release.
    pub async fn run(&mut self) -> Result<Release, ReleaseError> {
        let release = self.prepare().await?;
        self.write_release(&release)?;
        self.commit_release(&release).await?;
        Ok(release)
    }

    fn is_tagged(&self, version_num: &str) -> bool {
        self.tags
            .iter()
            .any(|tag| tag == version_num || strip_to_version_num(tag) == version_num)
    }
}

impl<G, P> fmt::Display for Project<G, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "project version information:")?;
        writeln!(f, "  latest tag:   {}", self.latest_tag.as_deref().unwrap_or("(none)"))?;
        writeln!(f, "  current tag:  {}", self.current_tag.as_deref().unwrap_or("(none)"))?;
        write!(f, "  version id:   {}", self.last_version_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockGitClient;
    use crate::prompt::MockPrompter;
    use crate::version::BumpType;

    const CHANGES: &str = "Version 1.0.0
----------------------

Released on 2024-01-01, codename otter

    * initial public release
";

    fn config_in(dir: &tempfile::TempDir) -> Config {
        Config {
            changelog_file: dir.path().join("CHANGES.md"),
            ..Config::default()
        }
    }

    fn tagged_git(tags: &[&str], current: Option<&str>) -> MockGitClient {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        let current = current.map(str::to_string);
        let mut git = MockGitClient::new();
        git.expect_get_tags().returning(move || Ok(tags.clone()));
        git.expect_get_current_tag()
            .returning(move || Ok(current.clone()));
        git
    }

    #[tokio::test]
    async fn test_parse_git_tags_without_tags_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = Project::new(config_in(&dir), tagged_git(&[], None), MockPrompter::new());

        assert!(matches!(
            project.parse_git_tags().await,
            Err(ReleaseError::UninitializedRepository)
        ));
    }

    #[tokio::test]
    async fn test_current_tag_falls_back_to_latest() {
        let dir = tempfile::tempdir().unwrap();
        let git = tagged_git(&["v0.9.0", "v1.0.0"], Some("not-a-known-tag"));
        let mut project = Project::new(config_in(&dir), git, MockPrompter::new());

        project.parse_git_tags().await.unwrap();

        assert_eq!(project.latest_tag(), Some("v1.0.0"));
        assert_eq!(project.current_tag(), Some("v1.0.0"));
    }

    #[tokio::test]
    async fn test_current_tag_prefers_head_tag() {
        let dir = tempfile::tempdir().unwrap();
        let git = tagged_git(&["v0.9.0", "v1.0.0"], Some("v0.9.0"));
        let mut project = Project::new(config_in(&dir), git, MockPrompter::new());

        project.parse_git_tags().await.unwrap();
        project.parse_versions();

        assert_eq!(project.current_tag(), Some("v0.9.0"));
        assert_eq!(project.last_version_num(), "0.9.0");
    }

    #[tokio::test]
    async fn test_parse_versions_keeps_non_release_tags() {
        let dir = tempfile::tempdir().unwrap();
        let git = tagged_git(&["1.2.0", "v1.2.1-rc.1"], None);
        let mut project = Project::new(config_in(&dir), git, MockPrompter::new());

        project.parse_git_tags().await.unwrap();
        project.parse_versions();

        assert_eq!(project.current_tag(), Some("v1.2.1-rc.1"));
        assert_eq!(project.last_version_num(), "1.2.1.1");
    }

    #[tokio::test]
    async fn test_inspect_reads_tags_only() {
        let dir = tempfile::tempdir().unwrap();
        let git = tagged_git(&["v0.9.0", "v1.0.0"], Some("v1.0.0"));
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().never();
        let mut project = Project::new(config_in(&dir), git, prompter);

        project.inspect().await.unwrap();

        assert_eq!(project.last_version_num(), "1.0.0");
        assert_eq!(project.state(), ProjectState::Uninitialized);
        assert!(!dir.path().join("CHANGES.md").exists());
        assert!(project.to_string().contains("current tag:  v1.0.0"));
    }

    #[test]
    fn test_parse_versions_without_tags_keeps_initial() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = Project::new(config_in(&dir), MockGitClient::new(), MockPrompter::new());

        project.parse_versions();
        assert_eq!(project.last_version_num(), INITIAL_VERSION_NUM);
    }

    #[test]
    fn test_parse_releases_from_changelog() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        std::fs::write(&config.changelog_file, CHANGES).unwrap();
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().never();
        let mut project = Project::new(config, MockGitClient::new(), prompter);

        project.parse_releases().unwrap();

        assert_eq!(project.state(), ProjectState::HasReleases);
        assert_eq!(project.last_release().unwrap().version_num, "1.0.0");
    }

    #[test]
    fn test_empty_changelog_non_interactive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            skip_interactive: true,
            ..config_in(&dir)
        };
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().never();
        let mut project = Project::new(config, MockGitClient::new(), prompter);

        let err = project.parse_releases().unwrap_err();
        assert!(matches!(err, ReleaseError::NoReleases(_)));
        assert!(err.to_string().contains("Failed to parse release from changelog history"));
    }

    #[test]
    fn test_empty_changelog_interactive_creates_initial_release() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let path = config.changelog_file.clone();
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().times(1).returning(|_| Ok(true));
        let mut project = Project::new(config, MockGitClient::new(), prompter);

        project.parse_releases().unwrap();

        assert_eq!(project.state(), ProjectState::InitialRelease);
        assert_eq!(project.releases().len(), 1);
        let release = project.last_release().unwrap();
        assert_eq!(release.version_num, "0.0.0");
        assert_eq!(release.summaries, vec![INITIAL_VERSION_SUMMARY_ITEM.to_string()]);

        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("Version 0.0.0\n"));
    }

    #[test]
    fn test_empty_changelog_declined() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let path = config.changelog_file.clone();
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().times(1).returning(|_| Ok(false));
        let mut project = Project::new(config, MockGitClient::new(), prompter);

        assert!(matches!(
            project.parse_releases(),
            Err(ReleaseError::ConfirmationDeclined(_))
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_new_release_duplicate_version() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            bump_type: Some(BumpType::Minor),
            ..config_in(&dir)
        };
        std::fs::write(&config.changelog_file, CHANGES).unwrap();
        let mut git = tagged_git(&["1.0.0", "1.1.0"], Some("1.0.0"));
        git.expect_commits_since().never();
        let mut project = Project::new(config, git, MockPrompter::new());

        project.parse_git_tags().await.unwrap();
        project.parse_releases().unwrap();

        match project.new_release().await {
            Err(ReleaseError::DuplicateVersion(v)) => assert_eq!(v, "1.1.0"),
            other => panic!("Expected DuplicateVersion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_new_release_collects_commit_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        std::fs::write(&config.changelog_file, CHANGES).unwrap();
        let mut git = tagged_git(&["v1.0.0"], Some("v1.0.0"));
        git.expect_commits_since()
            .withf(|tag, to| tag == "v1.0.0" && to == "HEAD")
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    "Merge pull request #3 from x/y".to_string(),
                    "fix crash on empty changelog".to_string(),
                    "wip".to_string(),
                ])
            });
        let mut project = Project::new(config, git, MockPrompter::new());

        project.parse_git_tags().await.unwrap();
        project.parse_releases().unwrap();
        let release = project.new_release().await.unwrap();

        assert_eq!(release.version_num, "1.0.1");
        assert_eq!(release.codename.as_deref(), Some("otter"));
        assert_eq!(release.summaries, vec!["fix crash on empty changelog".to_string()]);
        assert_eq!(project.state(), ProjectState::Releasing);
    }

    #[tokio::test]
    async fn test_new_release_without_releases_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = Project::new(config_in(&dir), MockGitClient::new(), MockPrompter::new());

        assert!(matches!(
            project.new_release().await,
            Err(ReleaseError::NoReleases(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_release_respects_skip_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            skip_push: true,
            skip_tag: true,
            ..config_in(&dir)
        };
        let mut git = MockGitClient::new();
        git.expect_commit()
            .withf(|files, message| files.len() == 1 && message == "Version bumped to 1.0.1")
            .times(1)
            .returning(|_, _| Ok(()));
        git.expect_tag().never();
        git.expect_push().never();
        let mut project = Project::new(config, git, MockPrompter::new());

        let release = Release::new("1.0.1", None, None, &["a real change message"], project.format()).unwrap();
        project.commit_release(&release).await.unwrap();

        assert_eq!(project.state(), ProjectState::Committed);
    }

    #[tokio::test]
    async fn test_commit_release_existing_tag_is_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            skip_commit: true,
            ..config_in(&dir)
        };
        let mut git = MockGitClient::new();
        git.expect_tag()
            .returning(|_, name| Err(GitError::TagExists(name.to_string())));
        git.expect_push().never();
        let mut project = Project::new(config, git, MockPrompter::new());

        let release = Release::new("2.0.0", None, None, &[] as &[&str], project.format()).unwrap();
        assert!(matches!(
            project.commit_release(&release).await,
            Err(ReleaseError::DuplicateVersion(_))
        ));
    }

    #[test]
    fn test_display() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(config_in(&dir), MockGitClient::new(), MockPrompter::new());
        let text = project.to_string();
        assert!(text.contains("latest tag:   (none)"));
        assert!(text.contains("version id:   0.0.0"));
    }
}
