//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use keybump::{GitClient, GitError, Prompter, ReleaseError};

/// Get the path to test fixtures directory.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Get the path to a changelog fixture.
pub fn changelog_fixture(name: &str) -> PathBuf {
    fixtures_dir().join("changelogs").join(name)
}

/// Read a fixture file as a string.
pub fn read_fixture(path: PathBuf) -> String {
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {:?}: {}", path, e))
}

/// Create a temporary directory for test output.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    ///
    /// The repository gets a local identity so the `git` binary can commit and tag.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config
                .set_str("user.name", "Test User")
                .expect("Failed to set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("Failed to set user.email");
            config
                .set_bool("commit.gpgsign", false)
                .expect("Failed to set commit.gpgsign");
            config
                .set_bool("tag.gpgsign", false)
                .expect("Failed to set tag.gpgsign");
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Get the test signature for commits.
    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Create a commit with the given message. Returns the commit OID.
    pub fn commit(&self, message: &str) -> Oid {
        let content = format!(
            "{}\n{}",
            message,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        self.commit_file("test.txt", &content, message)
    }

    /// Write `content` to `name`, stage it and commit. Returns the commit OID.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> Oid {
        self.commit_file_at(name, content, message, None)
    }

    /// Like [`TestRepo::commit_file`] with an explicit commit time in seconds.
    pub fn commit_file_at(&self, name: &str, content: &str, message: &str, time: Option<i64>) -> Oid {
        let sig = match time {
            Some(secs) => Signature::new("Test User", "test@example.com", &git2::Time::new(secs, 0))
                .expect("Failed to create signature"),
            None => self.signature(),
        };

        std::fs::write(self.dir.path().join(name), content).expect("Failed to write test file");

        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(name)).expect("Failed to add file");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Create a lightweight tag pointing to the given OID.
    pub fn tag_lightweight(&self, name: &str, oid: Oid) {
        let obj = self.repo.find_object(oid, None).expect("Failed to find object");
        self.repo.tag_lightweight(name, &obj, false).expect("Failed to create lightweight tag");
    }

    /// Create an annotated tag pointing to the given OID.
    pub fn tag_annotated(&self, name: &str, oid: Oid, message: &str) {
        let sig = self.signature();
        let obj = self.repo.find_object(oid, None).expect("Failed to find object");
        self.repo.tag(name, &obj, &sig, message, false).expect("Failed to create annotated tag");
    }

    /// Overwrite a tracked file without staging it.
    pub fn modify(&self, name: &str, content: &str) {
        std::fs::write(self.dir.path().join(name), content).expect("Failed to modify file");
    }

    /// Stage a file in the index without committing it.
    pub fn stage(&self, name: &str, content: &str) {
        self.modify(name, content);
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(name)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Subject line of the commit at HEAD.
    pub fn head_summary(&self) -> String {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map(|c| c.summary().unwrap_or_default().to_string())
            .expect("Failed to read HEAD commit")
    }
}

/// In-memory [`GitClient`] that records every mutating call.
#[derive(Default)]
pub struct FakeGit {
    pub tags: Vec<String>,
    pub current_tag: Option<String>,
    pub dirty: Mutex<Vec<String>>,
    pub subjects: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeGit {
    pub fn with_tags(tags: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            current_tag: tags.last().map(|t| t.to_string()),
            ..Self::default()
        }
    }

    pub fn subjects(mut self, subjects: &[&str]) -> Self {
        self.subjects = subjects.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn dirty(self, files: &[&str]) -> Self {
        *self.dirty.lock().unwrap() = files.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GitClient for FakeGit {
    async fn get_tags(&self) -> Result<Vec<String>, GitError> {
        Ok(self.tags.clone())
    }

    async fn get_current_tag(&self) -> Result<Option<String>, GitError> {
        Ok(self.current_tag.clone())
    }

    async fn has_unstaged_changes(&self) -> Result<bool, GitError> {
        Ok(!self.dirty.lock().unwrap().is_empty())
    }

    async fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        Ok(false)
    }

    async fn diff_files(&self) -> Result<Vec<String>, GitError> {
        Ok(self.dirty.lock().unwrap().clone())
    }

    async fn stash(&self) -> Result<(), GitError> {
        self.dirty.lock().unwrap().clear();
        self.record("stash".to_string());
        Ok(())
    }

    async fn commit(&self, files: &[PathBuf], message: &str) -> Result<(), GitError> {
        self.record(format!("commit {} files: {}", files.len(), message));
        Ok(())
    }

    async fn tag(&self, message: &str, tag_name: &str) -> Result<(), GitError> {
        if self.tags.iter().any(|t| t == tag_name) {
            return Err(GitError::TagExists(tag_name.to_string()));
        }
        self.record(format!("tag {}: {}", tag_name, message));
        Ok(())
    }

    async fn push(&self) -> Result<(), GitError> {
        self.record("push".to_string());
        Ok(())
    }

    async fn commits_since(&self, tag: &str, to: &str) -> Result<Vec<String>, GitError> {
        self.record(format!("log {}..{}", tag, to));
        Ok(self.subjects.clone())
    }
}

/// [`Prompter`] that replays scripted answers and records the questions.
///
/// Running out of answers fails the prompt.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    pub questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, message: &str) -> Result<bool, ReleaseError> {
        self.questions.lock().unwrap().push(message.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ReleaseError::PromptFailed(format!("no scripted answer for: {}", message)))
    }
}
