//! Production `RepositoryApi` over the GitHub REST API

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::api::{FileWrite, InstallationId, RemoteFile, RepoRef, RepositoryApi};
use crate::auth::{generate_app_jwt, InstallationToken, TokenCache};
use crate::config::GitHubAppConfig;
use crate::error::GitHubError;
use crate::Result;

const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// GitHub App client for repository contents and installation management
pub struct GitHubClient {
    config: GitHubAppConfig,
    http_client: reqwest::Client,
    tokens: TokenCache,
}

impl GitHubClient {
    /// Create a new client
    pub fn new(config: GitHubAppConfig) -> Result<Self> {
        Url::parse(&config.api_base_url).map_err(|e| GitHubError::InvalidInput {
            field: "api_base_url".to_string(),
            reason: e.to_string(),
        })?;

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(GitHubClient {
            config,
            http_client,
            tokens: TokenCache::new(),
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GitHubAppConfig::from_env()?)
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url =
            Url::parse(&self.config.api_base_url).map_err(|e| GitHubError::InvalidInput {
                field: "api_base_url".to_string(),
                reason: e.to_string(),
            })?;
        url.path_segments_mut()
            .map_err(|_| GitHubError::InvalidInput {
                field: "api_base_url".to_string(),
                reason: "cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, repo: &RepoRef, path: &str) -> Result<Url> {
        let mut segments = vec!["repos", repo.owner.as_str(), repo.name.as_str(), "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(segments)
    }

    fn request(&self, method: Method, url: Url, bearer: &SecretString) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .bearer_auth(bearer.expose_secret())
    }

    fn app_jwt(&self) -> Result<SecretString> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        generate_app_jwt(&self.config, now).map(SecretString::from)
    }

    /// Installation access token, minted on first use and cached
    #[instrument(skip(self))]
    pub async fn installation_token(&self, installation: InstallationId) -> Result<SecretString> {
        if let Some(token) = self.tokens.get(installation, Utc::now()) {
            return Ok(token);
        }

        debug!("Minting installation access token");
        let jwt = self.app_jwt()?;
        let installation_segment = installation.to_string();
        let url = self.endpoint([
            "app",
            "installations",
            installation_segment.as_str(),
            "access_tokens",
        ])?;

        let response = self.request(Method::POST, url, &jwt).send().await?;
        let response = ensure_success(response).await?;
        let payload: AccessTokenResponse = response.json().await?;

        let token = InstallationToken::new(payload.token, &payload.expires_at)?;
        let secret = token.token.clone();
        self.tokens.insert(installation, token);
        Ok(secret)
    }
}

#[async_trait]
impl RepositoryApi for GitHubClient {
    #[instrument(skip(self), fields(repository = %repo))]
    async fn read_file(
        &self,
        installation: InstallationId,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<RemoteFile>> {
        let token = self.installation_token(installation).await?;
        let url = self.contents_url(repo, path)?;

        let response = self.request(Method::GET, url, &token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("File does not exist");
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        let body: serde_json::Value = response.json().await?;
        if body.is_array() {
            // A directory occupies the path; there is no blob to overwrite.
            return Ok(Some(RemoteFile {
                path: path.to_string(),
                sha: String::new(),
                content: None,
            }));
        }

        let contents: ContentsResponse = serde_json::from_value(body)?;
        let content = match (contents.encoding.as_deref(), contents.content) {
            (Some("base64"), Some(encoded)) => decode_content(&encoded),
            _ => None,
        };

        Ok(Some(RemoteFile {
            path: contents.path,
            sha: contents.sha,
            content,
        }))
    }

    #[instrument(skip(self, write), fields(repository = %repo, path = %write.path))]
    async fn write_file(
        &self,
        installation: InstallationId,
        repo: &RepoRef,
        write: &FileWrite,
    ) -> Result<()> {
        let token = self.installation_token(installation).await?;
        let url = self.contents_url(repo, &write.path)?;
        let body = PutContentsRequest {
            message: &write.message,
            content: STANDARD.encode(write.content.as_bytes()),
            sha: write.sha.as_deref(),
        };

        let response = self
            .request(Method::PUT, url, &token)
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;

        debug!("File written");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_installation(&self, installation: InstallationId) -> Result<()> {
        let jwt = self.app_jwt()?;
        let installation_segment = installation.to_string();
        let url = self.endpoint(["app", "installations", installation_segment.as_str()])?;

        let response = self.request(Method::DELETE, url, &jwt).send().await?;
        ensure_success(response).await?;

        self.tokens.evict(installation);
        info!("Installation deleted");
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read response body".to_string());
    Err(GitHubError::Http {
        status: Some(status.as_u16()),
        message,
    })
}

/// Decode a contents-API payload: base64 wrapped at 60 columns.
fn decode_content(encoded: &str) -> Option<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}
