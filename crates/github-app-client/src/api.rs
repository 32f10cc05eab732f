//! Repository API seam
//!
//! The orchestrator only needs three remote operations, each scoped to
//! an App installation:
//! - `read_file`: fetch a file by path, `None` on 404
//! - `write_file`: create or update a file by path
//! - `delete_installation`: uninstall the App
//!
//! All methods are async and backend-agnostic. `fakes::MemoryGitHub`
//! provides an in-memory implementation for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// GitHub App installation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub u64);

impl std::fmt::Display for InstallationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repository coordinates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepoRef {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `owner/name` full name
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(RepoRef::new(owner, name))
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A file as it currently exists in a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    /// Blob SHA, required to overwrite the file
    pub sha: String,
    /// Decoded text content; `None` for directories, submodules, or
    /// content that is not valid UTF-8
    pub content: Option<String>,
}

/// A create-or-update request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: String,
    /// Commit message
    pub message: String,
    /// Plain-text content; encoding for transport is the client's job
    pub content: String,
    /// Blob SHA of the file being replaced; `None` creates a new file
    pub sha: Option<String>,
}

impl FileWrite {
    /// A write that creates `path`
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        FileWrite {
            message: format!("Add {}", path),
            path,
            content: content.into(),
            sha: None,
        }
    }

    /// A write that replaces the blob `sha` at `path`
    pub fn update(
        path: impl Into<String>,
        content: impl Into<String>,
        sha: impl Into<String>,
    ) -> Self {
        let path = path.into();
        FileWrite {
            message: format!("Update {}", path),
            path,
            content: content.into(),
            sha: Some(sha.into()),
        }
    }
}

/// Remote repository operations scoped to an App installation.
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Read a file by path. Returns `Ok(None)` if it does not exist.
    async fn read_file(
        &self,
        installation: InstallationId,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<RemoteFile>>;

    /// Create or update a file. Overwrites require `write.sha`.
    async fn write_file(
        &self,
        installation: InstallationId,
        repo: &RepoRef,
        write: &FileWrite,
    ) -> Result<()>;

    /// Uninstall the App from the installation's account.
    async fn delete_installation(&self, installation: InstallationId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_parse() {
        let repo = RepoRef::parse("acme/api").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "api");
        assert_eq!(repo.full_name(), "acme/api");
        assert_eq!(repo.to_string(), "acme/api");

        assert!(RepoRef::parse("acme").is_none());
        assert!(RepoRef::parse("acme/").is_none());
        assert!(RepoRef::parse("a/b/c").is_none());
    }

    #[test]
    fn test_file_write_messages() {
        let create = FileWrite::create(".github/workflows/ci.yml", "x");
        assert_eq!(create.message, "Add .github/workflows/ci.yml");
        assert!(create.sha.is_none());

        let update = FileWrite::update("README.md", "y", "abc123");
        assert_eq!(update.message, "Update README.md");
        assert_eq!(update.sha.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_installation_id_serializes_as_number() {
        let json = serde_json::to_string(&InstallationId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
