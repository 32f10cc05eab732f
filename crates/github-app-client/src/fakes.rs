//! In-memory fake for `RepositoryApi` (testing only)
//!
//! `MemoryGitHub` keeps files per repository, records every write and
//! deleted installation, and can be told to fail writes to given paths
//! or to refuse installation deletion.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::api::{FileWrite, InstallationId, RemoteFile, RepoRef, RepositoryApi};
use crate::error::GitHubError;
use crate::Result;

/// A write recorded by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub installation: InstallationId,
    pub repository: String,
    pub write: FileWrite,
}

#[derive(Debug, Default)]
struct State {
    files: HashMap<(String, String), RemoteFile>,
    writes: Vec<RecordedWrite>,
    deleted_installations: Vec<InstallationId>,
    failing_paths: HashSet<String>,
    fail_delete: bool,
}

/// In-memory GitHub backed by a `HashMap<(repository, path), file>`.
#[derive(Debug, Default)]
pub struct MemoryGitHub {
    state: Mutex<State>,
}

impl MemoryGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing file
    pub fn with_file(self, repo: &str, path: &str, content: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.files.insert(
                (repo.to_string(), path.to_string()),
                RemoteFile {
                    path: path.to_string(),
                    sha: blob_sha(content),
                    content: Some(content.to_string()),
                },
            );
        }
        self
    }

    /// Make every write to `path` fail with a 500
    pub fn failing_writes_to(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_paths
            .insert(path.to_string());
        self
    }

    /// Make `delete_installation` fail with a 500
    pub fn failing_installation_delete(self) -> Self {
        self.state.lock().unwrap().fail_delete = true;
        self
    }

    /// Current content of a file, if present
    pub fn file(&self, repo: &str, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(&(repo.to_string(), path.to_string()))
            .and_then(|f| f.content.clone())
    }

    /// All successful writes, in order
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Installations deleted so far, in order
    pub fn deleted_installations(&self) -> Vec<InstallationId> {
        self.state.lock().unwrap().deleted_installations.clone()
    }
}

#[async_trait]
impl RepositoryApi for MemoryGitHub {
    async fn read_file(
        &self,
        _installation: InstallationId,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<RemoteFile>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(&(repo.full_name(), path.to_string()))
            .cloned())
    }

    async fn write_file(
        &self,
        installation: InstallationId,
        repo: &RepoRef,
        write: &FileWrite,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_paths.contains(&write.path) {
            return Err(GitHubError::Http {
                status: Some(500),
                message: format!("injected failure for {}", write.path),
            });
        }

        let key = (repo.full_name(), write.path.clone());
        let existing_sha = state.files.get(&key).map(|f| f.sha.clone());
        if existing_sha != write.sha {
            // GitHub answers 422 when the SHA is missing for an existing
            // file, and 409 when it does not match.
            let status = if write.sha.is_none() { 422 } else { 409 };
            return Err(GitHubError::Http {
                status: Some(status),
                message: format!("sha mismatch for {}", write.path),
            });
        }

        state.files.insert(
            key,
            RemoteFile {
                path: write.path.clone(),
                sha: blob_sha(&write.content),
                content: Some(write.content.clone()),
            },
        );
        state.writes.push(RecordedWrite {
            installation,
            repository: repo.full_name(),
            write: write.clone(),
        });
        Ok(())
    }

    async fn delete_installation(&self, installation: InstallationId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(GitHubError::Http {
                status: Some(500),
                message: "injected installation delete failure".to_string(),
            });
        }
        state.deleted_installations.push(installation);
        Ok(())
    }
}

/// Git blob id shape (`blob {len}\0{content}`), hashed with SHA-256 and
/// cut to the 40 hex characters GitHub returns.
fn blob_sha(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content.as_bytes());
    let mut sha = hex::encode(hasher.finalize());
    sha.truncate(40);
    sha
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTALL: InstallationId = InstallationId(1);

    fn repo() -> RepoRef {
        RepoRef::new("acme", "api")
    }

    #[test]
    fn test_blob_sha_uses_git_blob_framing() {
        let sha = blob_sha("hello");
        assert_eq!(sha, "8aec4e4876f854f688d0ebfc8f37598f38e5fd69");
        assert_eq!(sha.len(), 40);
        assert_ne!(blob_sha("hello\n"), sha);
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let gh = MemoryGitHub::new();
        assert!(gh.read_file(INSTALL, &repo(), "a.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let gh = MemoryGitHub::new();
        gh.write_file(INSTALL, &repo(), &FileWrite::create("a.txt", "hello"))
            .await
            .unwrap();

        let file = gh.read_file(INSTALL, &repo(), "a.txt").await.unwrap().unwrap();
        assert_eq!(file.content.as_deref(), Some("hello"));
        assert_eq!(gh.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_requires_matching_sha() {
        let gh = MemoryGitHub::new().with_file("acme/api", "a.txt", "old");

        let err = gh
            .write_file(INSTALL, &repo(), &FileWrite::create("a.txt", "new"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(422));

        let err = gh
            .write_file(INSTALL, &repo(), &FileWrite::update("a.txt", "new", "bogus"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));

        let sha = gh
            .read_file(INSTALL, &repo(), "a.txt")
            .await
            .unwrap()
            .unwrap()
            .sha;
        gh.write_file(INSTALL, &repo(), &FileWrite::update("a.txt", "new", sha))
            .await
            .unwrap();
        assert_eq!(gh.file("acme/api", "a.txt").as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let gh = MemoryGitHub::new()
            .failing_writes_to("broken.txt")
            .failing_installation_delete();

        assert!(gh
            .write_file(INSTALL, &repo(), &FileWrite::create("broken.txt", "x"))
            .await
            .is_err());
        assert!(gh.delete_installation(INSTALL).await.is_err());
        assert!(gh.deleted_installations().is_empty());
    }
}
