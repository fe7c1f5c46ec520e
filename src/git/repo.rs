//! Default [`GitClient`] backed by a repository on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{
    DescribeFormatOptions, DescribeOptions, ErrorCode, Oid, Repository, Sort, Status,
    StatusOptions,
};
use tracing::{debug, warn};

use crate::error::GitError;

use super::GitClient;
use super::command::run_git;

/// A git repository identified by its working directory.
///
/// The repository is reopened for each read so the client stays `Sync`.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Find the repository containing `path`.
    pub fn discover(path: &Path) -> Result<Self, GitError> {
        let repo = Repository::discover(path).map_err(GitError::OpenRepository)?;
        let root = repo
            .workdir()
            .ok_or_else(|| {
                GitError::OpenRepository(git2::Error::from_str("bare repositories are not supported"))
            })?
            .to_path_buf();
        Ok(Self { root })
    }

    /// The working directory root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn open(&self) -> Result<Repository, GitError> {
        Repository::open(&self.root).map_err(GitError::OpenRepository)
    }
}

#[async_trait]
impl GitClient for GitRepo {
    async fn get_tags(&self) -> Result<Vec<String>, GitError> {
        let repo = self.open()?;
        list_tags(&repo)
    }

    async fn get_current_tag(&self) -> Result<Option<String>, GitError> {
        let repo = self.open()?;
        describe_head(&repo)
    }

    async fn has_unstaged_changes(&self) -> Result<bool, GitError> {
        let repo = self.open()?;
        Ok(!dirty_paths(&repo, unstaged_mask())?.is_empty())
    }

    async fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        let repo = self.open()?;
        Ok(!dirty_paths(&repo, uncommitted_mask())?.is_empty())
    }

    async fn diff_files(&self) -> Result<Vec<String>, GitError> {
        let repo = self.open()?;
        dirty_paths(&repo, unstaged_mask() | uncommitted_mask())
    }

    async fn stash(&self) -> Result<(), GitError> {
        run_git(&self.root, &["stash"]).await?;
        Ok(())
    }

    async fn commit(&self, files: &[PathBuf], message: &str) -> Result<(), GitError> {
        let paths: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let mut add_args = vec!["add", "--"];
        add_args.extend(paths.iter().map(String::as_str));
        run_git(&self.root, &add_args).await?;

        run_git(&self.root, &["commit", "-m", message]).await?;
        Ok(())
    }

    async fn tag(&self, message: &str, tag_name: &str) -> Result<(), GitError> {
        match run_git(&self.root, &["tag", "-a", tag_name, "-m", message]).await {
            Ok(_) => Ok(()),
            Err(GitError::NonZeroExit { stderr, .. }) if stderr.contains("already exists") => {
                Err(GitError::TagExists(tag_name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn push(&self) -> Result<(), GitError> {
        // branch first, then tags; never --all
        run_git(&self.root, &["push"]).await?;
        run_git(&self.root, &["push", "--tags"]).await?;
        Ok(())
    }

    async fn commits_since(&self, tag: &str, to: &str) -> Result<Vec<String>, GitError> {
        let repo = self.open()?;
        commit_subjects(&repo, tag, to)
    }
}

/// Tag names sorted by the time of the commit they point to, then by name.
fn list_tags(repo: &Repository) -> Result<Vec<String>, GitError> {
    let mut tags: Vec<(i64, String)> = Vec::new();

    repo.tag_foreach(|oid, name_bytes| {
        let Ok(name_str) = std::str::from_utf8(name_bytes) else {
            warn!("Skipping tag with OID {} - name is not valid UTF-8", oid);
            return true;
        };
        let name = name_str
            .strip_prefix("refs/tags/")
            .unwrap_or(name_str)
            .to_string();

        // Annotated tags peel through the tag object to the commit.
        match repo.find_object(oid, None).and_then(|obj| obj.peel_to_commit()) {
            Ok(commit) => tags.push((commit.time().seconds(), name)),
            Err(e) => debug!(tag = %name, error = %e, "Tag does not point at a commit, skipping"),
        }
        true
    })
    .map_err(GitError::Tags)?;

    tags.sort();
    Ok(tags.into_iter().map(|(_, name)| name).collect())
}

fn describe_head(repo: &Repository) -> Result<Option<String>, GitError> {
    let mut opts = DescribeOptions::new();
    opts.describe_tags();

    let describe = match repo.describe(&opts) {
        Ok(describe) => describe,
        Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::UnbornBranch) => {
            debug!("No tag reachable from HEAD");
            return Ok(None);
        }
        Err(e) => return Err(GitError::ReferenceNotFound("HEAD".to_string(), e)),
    };

    let mut format = DescribeFormatOptions::new();
    format.abbreviated_size(0);
    describe
        .format(Some(&format))
        .map(Some)
        .map_err(|e| GitError::ReferenceNotFound("HEAD".to_string(), e))
}

fn unstaged_mask() -> Status {
    Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_TYPECHANGE | Status::WT_RENAMED
}

fn uncommitted_mask() -> Status {
    Status::INDEX_NEW
        | Status::INDEX_MODIFIED
        | Status::INDEX_DELETED
        | Status::INDEX_RENAMED
        | Status::INDEX_TYPECHANGE
}

/// Paths of tracked files whose status intersects `mask`. Untracked files are ignored.
fn dirty_paths(repo: &Repository, mask: Status) -> Result<Vec<String>, GitError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false)
        .include_ignored(false)
        .exclude_submodules(true);

    let statuses = repo.statuses(Some(&mut opts)).map_err(GitError::Status)?;

    Ok(statuses
        .iter()
        .filter(|entry| entry.status().intersects(mask))
        .filter_map(|entry| entry.path().map(str::to_string))
        .collect())
}

fn resolve_commit(repo: &Repository, reference: &str) -> Result<Oid, GitError> {
    repo.revparse_single(reference)
        .and_then(|obj| obj.peel_to_commit())
        .map(|commit| commit.id())
        .map_err(|e| GitError::ReferenceNotFound(reference.to_string(), e))
}

fn commit_subjects(repo: &Repository, from: &str, to: &str) -> Result<Vec<String>, GitError> {
    let from_oid = resolve_commit(repo, from)?;
    let to_oid = resolve_commit(repo, to)?;

    let mut revwalk = repo.revwalk().map_err(GitError::RevwalkError)?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
        .map_err(GitError::RevwalkError)?;
    revwalk.push(to_oid).map_err(GitError::RevwalkError)?;
    revwalk.hide(from_oid).map_err(GitError::RevwalkError)?;

    let mut subjects = Vec::new();
    for oid in revwalk {
        let oid = oid.map_err(GitError::RevwalkError)?;
        let commit = repo.find_commit(oid).map_err(GitError::RevwalkError)?;
        if commit.parent_count() > 1 {
            continue;
        }
        if let Some(summary) = commit.summary() {
            subjects.push(summary.trim().to_string());
        }
    }

    debug!(from, to, count = subjects.len(), "Collected commit subjects");
    Ok(subjects)
}
