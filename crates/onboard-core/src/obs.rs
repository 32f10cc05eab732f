//! Structured observability hooks for onboarding lifecycle events.
//!
//! Every event carries an `event` field naming it (`provision.started`,
//! `file.created`, ...) so log pipelines can filter on it. Provisioning
//! runs get a span from [`provision_span`]; attach it with
//! `tracing::Instrument` rather than entering it across awaits.

use tracing::{info, warn, Span};

use github_app_client::{InstallationId, RepoRef};

/// Span for one provisioning run.
pub fn provision_span(run_id: &str, installation: InstallationId) -> Span {
    tracing::info_span!("onboard.provision", run_id = %run_id, installation_id = %installation)
}

/// Emit event: a webhook delivery was accepted and parsed as `kind`.
pub fn emit_delivery_received(delivery: Option<&str>, github_event: &str, kind: &str) {
    info!(
        event = "delivery.received",
        delivery = delivery.unwrap_or("-"),
        github_event = %github_event,
        kind = %kind,
    );
}

/// Emit event: a webhook delivery was rejected before parsing.
pub fn emit_delivery_rejected(delivery: Option<&str>, reason: &dyn std::fmt::Display) {
    warn!(event = "delivery.rejected", delivery = delivery.unwrap_or("-"), reason = %reason);
}

pub fn emit_provision_started(run_id: &str, installation: InstallationId, repositories: usize) {
    info!(
        event = "provision.started",
        run_id = %run_id,
        installation_id = %installation,
        repositories = repositories,
    );
}

/// Emit event: run finished with duration and failure count.
pub fn emit_provision_finished(
    run_id: &str,
    installation: InstallationId,
    duration_ms: u64,
    failed_files: usize,
) {
    info!(
        event = "provision.finished",
        run_id = %run_id,
        installation_id = %installation,
        duration_ms = duration_ms,
        failed_files = failed_files,
        success = failed_files == 0,
    );
}

pub fn emit_repository_started(repo: &RepoRef, customized: bool) {
    info!(event = "repository.started", repository = %repo, customized = customized);
}

/// Emit event: configuration lookup failed; files fall back to raw templates.
pub fn emit_config_fallback(repo: &RepoRef, error: &dyn std::fmt::Display) {
    warn!(event = "config.fallback", repository = %repo, error = %error);
}

/// Emit event: strict resolution rejected the repository.
pub fn emit_config_rejected(repo: &RepoRef, error: &dyn std::fmt::Display) {
    warn!(event = "config.rejected", repository = %repo, error = %error);
}

pub fn emit_file_created(repo: &RepoRef, path: &str) {
    info!(event = "file.created", repository = %repo, path = %path);
}

pub fn emit_file_updated(repo: &RepoRef, path: &str) {
    info!(event = "file.updated", repository = %repo, path = %path);
}

pub fn emit_file_skipped(repo: &RepoRef, path: &str) {
    info!(event = "file.skipped", repository = %repo, path = %path, reason = "exists");
}

/// Emit event: one file failed (warning level); the batch continues.
pub fn emit_file_failed(repo: &RepoRef, path: &str, error: &dyn std::fmt::Display) {
    warn!(event = "file.failed", repository = %repo, path = %path, error = %error);
}

pub fn emit_installation_deleted(installation: InstallationId) {
    info!(event = "installation.deleted", installation_id = %installation);
}

pub fn emit_installation_delete_failed(installation: InstallationId, error: &dyn std::fmt::Display) {
    warn!(event = "installation.delete_failed", installation_id = %installation, error = %error);
}
