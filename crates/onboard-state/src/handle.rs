//! SurrealDB Handle - Connection and Operations
//!
//! Manages the connection and provides the configuration document
//! operations used by `SurrealConfigStore`.
//!
//! Supports both local (in-memory) and cloud (WebSocket) connections.

use crate::error::StorageError;
use crate::schema::ConfigDocument;
use crate::storage_traits::StorageResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::sql::Datetime as SurrealDatetime;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

const DEFAULT_NAMESPACE: &str = "onboard";
const DEFAULT_DATABASE: &str = "main";

/// Configuration for SurrealDB Cloud connection
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    /// Database username
    pub username: String,
    /// Database password
    pub password: String,
    /// Namespace (default: "onboard")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Create a new cloud configuration for a database user
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            is_root: false,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Set whether this is a root user
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - SURREALDB_ENDPOINT (required)
    /// - SURREALDB_USERNAME (required)
    /// - SURREALDB_PASSWORD (required)
    /// - SURREALDB_NAMESPACE (optional, default: "onboard")
    /// - SURREALDB_DATABASE (optional, default: "main")
    /// - SURREALDB_ROOT (optional, default: "false")
    pub fn from_env() -> std::result::Result<Self, String> {
        let endpoint =
            std::env::var("SURREALDB_ENDPOINT").map_err(|_| "SURREALDB_ENDPOINT not set")?;
        let username =
            std::env::var("SURREALDB_USERNAME").map_err(|_| "SURREALDB_USERNAME not set")?;
        let password =
            std::env::var("SURREALDB_PASSWORD").map_err(|_| "SURREALDB_PASSWORD not set")?;
        let is_root = std::env::var("SURREALDB_ROOT")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let mut config = Self::new(endpoint, username, password).with_root(is_root);
        if let Ok(ns) = std::env::var("SURREALDB_NAMESPACE") {
            config = config.with_namespace(ns);
        }
        if let Ok(db) = std::env::var("SURREALDB_DATABASE") {
            config = config.with_database(db);
        }
        Ok(config)
    }
}

/// SurrealDB connection handle
#[derive(Clone)]
pub struct SurrealHandle {
    db: Surreal<Any>,
}

/// Row shape of `repo_configs`. The document is stored as JSON text so
/// arbitrary operator-supplied shapes survive the round trip untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbConfigRecord {
    repository: String,
    document: String,
    updated_at: SurrealDatetime,
}

impl DbConfigRecord {
    fn from_document(doc: &ConfigDocument) -> StorageResult<Self> {
        Ok(Self {
            repository: doc.repository.clone(),
            document: serde_json::to_string(&doc.document)?,
            updated_at: SurrealDatetime::from(doc.updated_at),
        })
    }

    fn into_document(self) -> StorageResult<ConfigDocument> {
        let document = serde_json::from_str(&self.document)?;
        Ok(ConfigDocument {
            repository: self.repository,
            document,
            updated_at: DateTime::<Utc>::from(self.updated_at),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryKey {
    repository: String,
}

impl SurrealHandle {
    /// Connect to SurrealDB in-memory and set up schema
    #[instrument(skip_all)]
    pub async fn setup_db() -> StorageResult<Self> {
        info!("Connecting to SurrealDB (in-memory)");
        Self::connect_url("mem://", DEFAULT_NAMESPACE, DEFAULT_DATABASE).await
    }

    /// Connect to SurrealDB Cloud
    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
    pub async fn setup_cloud(config: CloudConfig) -> StorageResult<Self> {
        info!("Connecting to SurrealDB Cloud (root={})", config.is_root);

        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StorageError::Unavailable(format!(
                    "Failed to connect to {}: {}",
                    config.endpoint, e
                ))
            })?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StorageError::Unavailable(format!("Root authentication failed: {}", e)))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| {
                StorageError::Unavailable(format!("Database authentication failed: {}", e))
            })?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StorageError::Unavailable(format!("Failed to select namespace/database: {}", e))
            })?;

        let handle = SurrealHandle { db };
        handle.init_schema().await?;

        info!("SurrealDB Cloud connected and schema initialized");
        Ok(handle)
    }

    /// Connect to SurrealDB Cloud when `cloud` is given, else to `url`,
    /// else in-memory.
    #[instrument(skip_all)]
    pub async fn setup(cloud: Option<CloudConfig>, url: Option<&str>) -> StorageResult<Self> {
        if let Some(config) = cloud {
            info!("Cloud config found, connecting to SurrealDB Cloud");
            return Self::setup_cloud(config).await;
        }

        if let Some(url) = url {
            info!("Connecting to {}", url);
            return Self::connect_url(url, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await;
        }

        info!("No cloud config found, using in-memory database");
        Self::setup_db().await
    }

    /// Connect using environment variables
    ///
    /// If SURREALDB_ENDPOINT is set, connects to cloud.
    /// If SURREALDB_URL is set, connects to that URL.
    /// Otherwise, falls back to in-memory.
    pub async fn setup_from_env() -> StorageResult<Self> {
        let url = std::env::var("SURREALDB_URL").ok();
        Self::setup(CloudConfig::from_env().ok(), url.as_deref()).await
    }

    async fn connect_url(url: &str, namespace: &str, database: &str) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        db.use_ns(namespace)
            .use_db(database)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        let handle = SurrealHandle { db };
        handle.init_schema().await?;
        debug!("SurrealDB connected and schema initialized");
        Ok(handle)
    }

    async fn init_schema(&self) -> StorageResult<()> {
        debug!("Initializing onboarding schema");

        let schema = r#"
            -- Per-repository onboarding configuration
            DEFINE TABLE repo_configs SCHEMAFULL;
            DEFINE FIELD repository ON repo_configs TYPE string;
            DEFINE FIELD document ON repo_configs TYPE string;
            DEFINE FIELD updated_at ON repo_configs TYPE datetime;
            DEFINE INDEX idx_repo_config_repository ON repo_configs FIELDS repository UNIQUE;
        "#;

        self.db
            .query(schema)
            .await
            .map_err(|e| StorageError::Backend(format!("schema setup failed: {}", e)))?;

        Ok(())
    }

    // ========== Configuration Operations ==========

    /// Load the configuration document for a repository
    #[instrument(skip(self))]
    pub async fn load_config(&self, repository: &str) -> StorageResult<Option<ConfigDocument>> {
        let repository_owned = repository.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM repo_configs WHERE repository = $repository")
            .bind(("repository", repository_owned))
            .await?;

        let rows: Vec<DbConfigRecord> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(DbConfigRecord::into_document)
            .transpose()
    }

    /// Insert or replace the configuration document for a repository
    #[instrument(skip(self, doc), fields(repository = %doc.repository))]
    pub async fn save_config(&self, doc: &ConfigDocument) -> StorageResult<()> {
        let row = DbConfigRecord::from_document(doc)?;
        let repository_owned = doc.repository.clone();

        self.db
            .query("DELETE repo_configs WHERE repository = $repository")
            .query("CREATE repo_configs CONTENT $row")
            .bind(("repository", repository_owned))
            .bind(("row", row))
            .await?
            .check()?;

        debug!("Configuration saved");
        Ok(())
    }

    /// Delete the configuration document for a repository
    #[instrument(skip(self))]
    pub async fn delete_config(&self, repository: &str) -> StorageResult<bool> {
        let repository_owned = repository.to_string();

        let mut result = self
            .db
            .query("DELETE repo_configs WHERE repository = $repository RETURN BEFORE")
            .bind(("repository", repository_owned))
            .await?;

        let removed: Vec<DbConfigRecord> = result.take(0)?;
        Ok(!removed.is_empty())
    }

    /// List repositories with a stored configuration, sorted by name
    #[instrument(skip(self))]
    pub async fn list_configs(&self) -> StorageResult<Vec<String>> {
        let mut result = self
            .db
            .query("SELECT repository FROM repo_configs ORDER BY repository ASC")
            .await?;

        let keys: Vec<RepositoryKey> = result.take(0)?;
        Ok(keys.into_iter().map(|k| k.repository).collect())
    }
}
