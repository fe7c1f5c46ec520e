//! The changelog file on disk.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ChangelogError;

/// A changelog file, most recent release first.
#[derive(Debug, Clone)]
pub struct Changelog {
    path: PathBuf,
}

/// Exclusive advisory lock held for the duration of a write.
///
/// The lock is released when the file handle is dropped.
struct WriteLock {
    _file: File,
}

impl Changelog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full changelog text. A missing file reads as empty.
    pub fn read(&self) -> Result<String, ChangelogError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Changelog does not exist yet");
                Ok(String::new())
            }
            Err(e) => Err(ChangelogError::ReadFailed(e)),
        }
    }

    /// Prepend an entry, creating the file if needed.
    ///
    /// The read-modify-write runs under an exclusive lock on a sibling
    /// `.<name>.lock` file, and the new content replaces the old atomically.
    pub fn prepend(&self, entry: &str) -> Result<(), ChangelogError> {
        let _lock = self.lock()?;

        let existing = self.read()?;
        let content = if existing.is_empty() {
            entry.to_string()
        } else {
            format!("{}\n{}", entry, existing)
        };

        self.write_atomic(&content)?;
        debug!(path = %self.path.display(), bytes = content.len(), "Prepended changelog entry");
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "changelog".to_string());
        self.parent_dir().join(format!(".{}.lock", name))
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn lock(&self) -> Result<WriteLock, ChangelogError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())
            .map_err(ChangelogError::LockFailed)?;

        FileExt::lock_exclusive(&file).map_err(ChangelogError::LockFailed)?;
        Ok(WriteLock { _file: file })
    }

    fn write_atomic(&self, content: &str) -> Result<(), ChangelogError> {
        let mut tmp = NamedTempFile::new_in(self.parent_dir()).map_err(ChangelogError::WriteFailed)?;
        tmp.write_all(content.as_bytes())
            .map_err(ChangelogError::WriteFailed)?;
        tmp.as_file().sync_all().map_err(ChangelogError::WriteFailed)?;
        tmp.persist(&self.path)
            .map_err(|e| ChangelogError::WriteFailed(e.error))?;
        Ok(())
    }
}
