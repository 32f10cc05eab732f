//! GitHub App Client
//!
//! The narrow slice of the GitHub REST API the onboarding bot needs:
//! read a file by path, create or update a file by path, and delete an
//! App installation. Requests are authenticated with installation access
//! tokens minted from the App's private key.
//!
//! `RepositoryApi` is the seam the orchestrator depends on; `GitHubClient`
//! is the production implementation and `fakes::MemoryGitHub` the test one.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod fakes;

pub use api::{FileWrite, InstallationId, RemoteFile, RepoRef, RepositoryApi};
pub use auth::{InstallationToken, TokenCache};
pub use client::GitHubClient;
pub use config::GitHubAppConfig;
pub use error::GitHubError;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, GitHubError>;
