//! Webhook receiver for the onboarding GitHub App.
//!
//! `POST /webhook` (and `POST /`) accept GitHub deliveries, verify their
//! signature when a secret is configured, and run the provisioner for
//! installation and repository events. `GET /healthz` is a liveness probe.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use github_app_client::config::DEFAULT_API_BASE_URL;
use github_app_client::{GitHubAppConfig, GitHubClient};
use onboard_core::webhook::{DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER};
use onboard_core::{
    obs, verify_signature, DirTemplateSource, EmbeddedTemplates, ProvisionOptions, Provisioner,
    TemplateSource, WebhookEvent,
};
use onboard_state::{CloudConfig, SurrealConfigStore};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, warn, Instrument};

/// Daemon settings; every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "onboardd")]
#[command(about = "GitHub App webhook receiver that provisions CI/CD files", long_about = None)]
#[command(version)]
pub struct Settings {
    /// GitHub App ID
    #[arg(long, env = "GITHUB_APP_ID")]
    pub github_app_id: String,

    /// PEM private key of the App (literal `\n` sequences are expanded)
    #[arg(long, env = "GITHUB_PRIVATE_KEY", hide_env_values = true)]
    pub github_private_key: String,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE_URL)]
    pub github_api_url: String,

    /// Shared secret for X-Hub-Signature-256; unsigned deliveries are
    /// accepted when unset
    #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    #[arg(long, env = "ONBOARD_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Read templates from this directory instead of the built-in set
    #[arg(long, env = "ONBOARD_TEMPLATES_DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Replace files that already exist
    #[arg(long, env = "ONBOARD_OVERWRITE_EXISTING")]
    pub overwrite_existing: bool,

    /// Keep the App installed after provisioning
    #[arg(long, env = "ONBOARD_KEEP_INSTALLATION")]
    pub keep_installation: bool,

    /// Skip repositories whose stored configuration is malformed
    #[arg(long, env = "ONBOARD_STRICT_CONFIG")]
    pub strict_config: bool,

    #[arg(long, env = "ONBOARD_MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    /// SurrealDB Cloud endpoint; without it `--surrealdb-url` or an
    /// in-memory store is used
    #[arg(long, env = "SURREALDB_ENDPOINT")]
    pub surrealdb_endpoint: Option<String>,

    #[arg(long, env = "SURREALDB_USERNAME")]
    pub surrealdb_username: Option<String>,

    #[arg(long, env = "SURREALDB_PASSWORD", hide_env_values = true)]
    pub surrealdb_password: Option<String>,

    #[arg(long, env = "SURREALDB_NAMESPACE")]
    pub surrealdb_namespace: Option<String>,

    #[arg(long, env = "SURREALDB_DATABASE")]
    pub surrealdb_database: Option<String>,

    /// Sign in as a root user instead of a database user
    #[arg(long, env = "SURREALDB_ROOT")]
    pub surrealdb_root: bool,

    #[arg(long, env = "SURREALDB_URL")]
    pub surrealdb_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

impl Settings {
    pub fn provision_options(&self) -> ProvisionOptions {
        ProvisionOptions {
            overwrite_existing: self.overwrite_existing,
            delete_installation: !self.keep_installation,
            strict_config: self.strict_config,
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    pub fn template_source(&self) -> Arc<dyn TemplateSource> {
        match &self.templates_dir {
            Some(dir) => Arc::new(DirTemplateSource::new(dir)),
            None => Arc::new(EmbeddedTemplates),
        }
    }

    /// Cloud connection settings, when an endpoint is configured.
    pub fn store_cloud_config(&self) -> Result<Option<CloudConfig>> {
        let Some(endpoint) = &self.surrealdb_endpoint else {
            return Ok(None);
        };
        let username = self
            .surrealdb_username
            .as_deref()
            .context("SURREALDB_USERNAME is required with SURREALDB_ENDPOINT")?;
        let password = self
            .surrealdb_password
            .as_deref()
            .context("SURREALDB_PASSWORD is required with SURREALDB_ENDPOINT")?;

        let mut config =
            CloudConfig::new(endpoint, username, password).with_root(self.surrealdb_root);
        if let Some(ns) = &self.surrealdb_namespace {
            config = config.with_namespace(ns);
        }
        if let Some(db) = &self.surrealdb_database {
            config = config.with_database(db);
        }
        Ok(Some(config))
    }

    pub fn github_client(&self) -> Result<GitHubClient> {
        let config = GitHubAppConfig::new(&self.github_app_id, &self.github_private_key)
            .context("invalid GitHub App credentials")?
            .with_api_base_url(&self.github_api_url)
            .context("invalid GitHub API URL")?;
        GitHubClient::new(config).context("failed to build GitHub client")
    }
}

#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<Provisioner>,
    pub webhook_secret: Option<SecretString>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(provisioner: Provisioner) -> Self {
        Self {
            provisioner: Arc::new(provisioner),
            webhook_secret: None,
            max_body_bytes: 1024 * 1024,
        }
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Wire the configured store, GitHub client and templates.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let store = SurrealConfigStore::connect(
            settings.store_cloud_config()?,
            settings.surrealdb_url.as_deref(),
        )
        .await
            .context("failed to connect to configuration store")?;
        let github = settings.github_client()?;

        let provisioner = Provisioner::new(
            Arc::new(store),
            Arc::new(github),
            settings.template_source(),
        )
        .with_options(settings.provision_options());

        let mut state = AppState::new(provisioner).with_max_body_bytes(settings.max_body_bytes);
        match &settings.webhook_secret {
            Some(secret) => state = state.with_webhook_secret(secret.clone()),
            None => warn!("GITHUB_WEBHOOK_SECRET not set; accepting unsigned deliveries"),
        }
        Ok(state)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook_handler))
        .route("/webhook", post(webhook_handler))
        .route("/healthz", get(healthz_handler))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state)
}

async fn healthz_handler() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn error_response(status: StatusCode, error: &dyn std::fmt::Display) -> Response {
    (status, Json(json!({"error": error.to_string()}))).into_response()
}

async fn webhook_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let delivery = header_str(&headers, DELIVERY_HEADER);

    if let Some(secret) = &state.webhook_secret {
        let signature = header_str(&headers, SIGNATURE_HEADER);
        if let Err(e) = verify_signature(secret.expose_secret().as_bytes(), &body, signature) {
            obs::emit_delivery_rejected(delivery, &e);
            return error_response(StatusCode::UNAUTHORIZED, &e);
        }
    }

    let Some(event_name) = header_str(&headers, EVENT_HEADER) else {
        let reason = format!("missing {EVENT_HEADER} header");
        obs::emit_delivery_rejected(delivery, &reason);
        return error_response(StatusCode::BAD_REQUEST, &reason);
    };

    let event = match WebhookEvent::parse(event_name, &body) {
        Ok(event) => event,
        Err(e) => {
            obs::emit_delivery_rejected(delivery, &e);
            return error_response(StatusCode::BAD_REQUEST, &e);
        }
    };
    obs::emit_delivery_received(delivery, event_name, event.kind());

    let Some((installation, repositories)) = event.provisioning_target() else {
        info!(github_event = %event_name, "No provisioning for this event");
        return Json(json!({
            "message": "Webhook received",
            "ignored": true,
            "event": event_name,
        }))
        .into_response();
    };

    let span = tracing::info_span!("onboard.delivery", delivery = delivery.unwrap_or("-"));
    let report = state
        .provisioner
        .provision_installation(installation, &repositories)
        .instrument(span)
        .await;

    Json(json!({
        "message": "Webhook received",
        "report": report,
    }))
    .into_response()
}
