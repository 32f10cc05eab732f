//! Provisioning orchestrator
//!
//! For every repository of an installation: resolve configuration once,
//! then walk the file catalog, skipping files that already exist unless
//! overwriting, and write the prepared content. A failure on one file or
//! one repository is recorded in the report and the batch continues.
//! Once every repository has been processed the installation is deleted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use github_app_client::{FileWrite, InstallationId, RepoRef, RepositoryApi};
use onboard_state::ConfigStore;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ConfigurationRecord;
use crate::error::{ProvisionError, ResolveError};
use crate::obs;
use crate::resolver::ConfigResolver;
use crate::templates::{prepare_file, CatalogEntry, FileCatalog, TemplateSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProvisionOptions {
    /// Replace files that already exist instead of skipping them.
    pub overwrite_existing: bool,
    /// Uninstall the App once every repository has been processed.
    pub delete_installation: bool,
    /// Reject repositories whose stored configuration is malformed or
    /// incomplete instead of degrading.
    pub strict_config: bool,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            overwrite_existing: false,
            delete_installation: true,
            strict_config: false,
        }
    }
}

/// Where a repository's configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    /// A stored record customized the files.
    Customized,
    /// No record is stored; raw templates were written.
    Default,
    /// The store could not be reached; raw templates were written.
    Unavailable,
    /// Strict resolution rejected the record; nothing was written.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Created,
    Updated,
    SkippedExisting,
    Failed { reason: String },
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReport {
    pub repository: String,
    pub customized: bool,
    pub config: ConfigStatus,
    pub files: Vec<FileReport>,
    /// Set when the repository was skipped as a whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepositoryReport {
    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_failure()).count()
    }

    pub fn outcome_of(&self, path: &str) -> Option<&FileOutcome> {
        self.files.iter().find(|f| f.path == path).map(|f| &f.outcome)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub run_id: String,
    pub installation_id: InstallationId,
    pub repositories: Vec<RepositoryReport>,
    pub installation_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ProvisionReport {
    pub fn failed_files(&self) -> usize {
        self.repositories.iter().map(RepositoryReport::failed_files).sum()
    }

    /// No file failed, no repository was rejected, and requested
    /// installation deletion succeeded.
    pub fn is_success(&self) -> bool {
        self.failed_files() == 0
            && self.repositories.iter().all(|r| r.error.is_none())
            && self.installation_error.is_none()
    }

    pub fn repository(&self, full_name: &str) -> Option<&RepositoryReport> {
        self.repositories.iter().find(|r| r.repository == full_name)
    }
}

pub struct Provisioner {
    resolver: ConfigResolver,
    github: Arc<dyn RepositoryApi>,
    templates: Arc<dyn TemplateSource>,
    catalog: FileCatalog,
    options: ProvisionOptions,
}

impl Provisioner {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        github: Arc<dyn RepositoryApi>,
        templates: Arc<dyn TemplateSource>,
    ) -> Self {
        let options = ProvisionOptions::default();
        Self {
            resolver: ConfigResolver::new(store).strict(options.strict_config),
            github,
            templates,
            catalog: FileCatalog::standard(),
            options,
        }
    }

    pub fn with_options(mut self, options: ProvisionOptions) -> Self {
        self.resolver = self.resolver.strict(options.strict_config);
        self.options = options;
        self
    }

    pub fn with_catalog(mut self, catalog: FileCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn options(&self) -> ProvisionOptions {
        self.options
    }

    pub fn catalog(&self) -> &FileCatalog {
        &self.catalog
    }

    /// Provision every repository, then delete the installation unless
    /// the options keep it.
    pub async fn provision_installation(
        &self,
        installation: InstallationId,
        repositories: &[RepoRef],
    ) -> ProvisionReport {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::provision_span(&run_id, installation);
        self.run(run_id, installation, repositories)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        run_id: String,
        installation: InstallationId,
        repositories: &[RepoRef],
    ) -> ProvisionReport {
        let started_at = Utc::now();
        obs::emit_provision_started(&run_id, installation, repositories.len());

        let mut reports = Vec::with_capacity(repositories.len());
        for repo in repositories {
            reports.push(self.provision_repository(installation, repo).await);
        }

        let mut installation_deleted = false;
        let mut installation_error = None;
        if self.options.delete_installation {
            match self.github.delete_installation(installation).await {
                Ok(()) => {
                    obs::emit_installation_deleted(installation);
                    installation_deleted = true;
                }
                Err(e) => {
                    obs::emit_installation_delete_failed(installation, &e);
                    installation_error = Some(e.to_string());
                }
            }
        }

        let finished_at = Utc::now();
        let report = ProvisionReport {
            run_id,
            installation_id: installation,
            repositories: reports,
            installation_deleted,
            installation_error,
            started_at,
            finished_at,
        };
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        obs::emit_provision_finished(
            &report.run_id,
            installation,
            duration_ms,
            report.failed_files(),
        );
        report
    }

    /// Provision the catalog into one repository.
    pub async fn provision_repository(
        &self,
        installation: InstallationId,
        repo: &RepoRef,
    ) -> RepositoryReport {
        let (config, status) = match self.resolver.resolve(&repo.full_name()).await {
            Ok(Some(config)) => (Some(config), ConfigStatus::Customized),
            Ok(None) => (None, ConfigStatus::Default),
            Err(e @ ResolveError::StoreUnavailable { .. }) => {
                obs::emit_config_fallback(repo, &e);
                (None, ConfigStatus::Unavailable)
            }
            Err(e @ ResolveError::MalformedConfiguration { .. }) => {
                obs::emit_config_rejected(repo, &e);
                return RepositoryReport {
                    repository: repo.full_name(),
                    customized: false,
                    config: ConfigStatus::Rejected,
                    files: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        obs::emit_repository_started(repo, config.is_some());

        let mut files = Vec::with_capacity(self.catalog.len());
        for entry in self.catalog.entries() {
            let outcome = match self
                .provision_file(installation, repo, entry, config.as_ref())
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    obs::emit_file_failed(repo, &entry.path, &e);
                    FileOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            files.push(FileReport {
                path: entry.path.clone(),
                outcome,
            });
        }

        RepositoryReport {
            repository: repo.full_name(),
            customized: config.is_some(),
            config: status,
            files,
            error: None,
        }
    }

    async fn provision_file(
        &self,
        installation: InstallationId,
        repo: &RepoRef,
        entry: &CatalogEntry,
        config: Option<&ConfigurationRecord>,
    ) -> Result<FileOutcome, ProvisionError> {
        let existing = self
            .github
            .read_file(installation, repo, &entry.path)
            .await?;
        if existing.is_some() && !self.options.overwrite_existing {
            obs::emit_file_skipped(repo, &entry.path);
            return Ok(FileOutcome::SkippedExisting);
        }

        let template = self.templates.read(&entry.template)?;
        let content = prepare_file(entry.kind, &template, &repo.name, config);
        let write = match existing {
            Some(current) => FileWrite::update(entry.path.clone(), content, current.sha),
            None => FileWrite::create(entry.path.clone(), content),
        };

        self.github.write_file(installation, repo, &write).await?;

        if write.sha.is_some() {
            obs::emit_file_updated(repo, &entry.path);
            Ok(FileOutcome::Updated)
        } else {
            obs::emit_file_created(repo, &entry.path);
            Ok(FileOutcome::Created)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_delete_installation() {
        let options = ProvisionOptions::default();
        assert!(options.delete_installation);
        assert!(!options.overwrite_existing);
        assert!(!options.strict_config);
    }

    #[test]
    fn test_file_report_serializes_flat() {
        let report = FileReport {
            path: "a.yml".to_string(),
            outcome: FileOutcome::Failed {
                reason: "boom".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"path": "a.yml", "outcome": "failed", "reason": "boom"})
        );

        let skipped = FileReport {
            path: "b.yml".to_string(),
            outcome: FileOutcome::SkippedExisting,
        };
        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            serde_json::json!({"path": "b.yml", "outcome": "skipped_existing"})
        );
    }
}
