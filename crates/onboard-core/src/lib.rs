//! Onboard Core Library
//!
//! Resolves per-repository configuration, renders CI/CD templates from
//! it, and orchestrates provisioning of the rendered files into
//! repositories reported by GitHub App webhooks.

pub mod config;
pub mod error;
pub mod obs;
pub mod provision;
pub mod render;
pub mod resolver;
pub mod telemetry;
pub mod templates;
pub mod webhook;

pub use config::{
    BranchTrigger, ConfigurationRecord, RunnerConfig, RunnerKind, ScheduleTrigger, Technology,
    Triggers,
};
pub use error::{ProvisionError, ResolveError, TemplateError, WebhookError};
pub use provision::{
    ConfigStatus, FileOutcome, FileReport, ProvisionOptions, ProvisionReport, Provisioner,
    RepositoryReport,
};
pub use render::{dynamic_config, finalize_primary, render, Placeholder};
pub use resolver::ConfigResolver;
pub use telemetry::init_tracing;
pub use templates::{
    prepare_file, CatalogEntry, DirTemplateSource, EmbeddedTemplates, FileCatalog, TemplateKind,
    TemplateSource,
};
pub use webhook::{sign, verify_signature, WebhookEvent};

pub use github_app_client::{InstallationId, RepoRef, RepositoryApi};
pub use onboard_state::{ConfigDocument, ConfigStore, StorageError};
