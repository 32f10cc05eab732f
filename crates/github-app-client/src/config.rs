//! GitHub App configuration

use secrecy::{ExposeSecret, SecretString};

use crate::error::GitHubError;
use crate::Result;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_USER_AGENT: &str = concat!("onboard-github-app/", env!("CARGO_PKG_VERSION"));

/// Credentials and endpoint for a GitHub App
#[derive(Debug, Clone)]
pub struct GitHubAppConfig {
    /// Numeric App ID (the JWT issuer)
    pub app_id: String,
    /// PEM-encoded RSA private key
    pub private_key: SecretString,
    /// REST API base URL
    pub api_base_url: String,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl GitHubAppConfig {
    /// Create a config for the public GitHub API.
    ///
    /// Literal `\n` sequences in the key are expanded, since PEM keys are
    /// commonly stored single-line in environment variables.
    pub fn new(app_id: impl Into<String>, private_key: impl Into<String>) -> Result<Self> {
        let app_id = app_id.into();
        if app_id.trim().is_empty() {
            return Err(GitHubError::InvalidInput {
                field: "app_id".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let private_key = private_key.into().replace("\\n", "\n");
        if private_key.trim().is_empty() {
            return Err(GitHubError::InvalidInput {
                field: "private_key".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(GitHubAppConfig {
            app_id,
            private_key: SecretString::from(private_key),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Create a config from environment variables
    ///
    /// Reads:
    /// - GITHUB_APP_ID (required)
    /// - GITHUB_PRIVATE_KEY (required)
    /// - GITHUB_API_URL (optional, default: "https://api.github.com")
    pub fn from_env() -> Result<Self> {
        let app_id = std::env::var("GITHUB_APP_ID").unwrap_or_default();
        let private_key = std::env::var("GITHUB_PRIVATE_KEY").unwrap_or_default();
        let config = Self::new(app_id, private_key)?;
        match std::env::var("GITHUB_API_URL") {
            Ok(url) if !url.trim().is_empty() => config.with_api_base_url(&url),
            _ => Ok(config),
        }
    }

    /// Point the client at a different API host (e.g. GitHub Enterprise)
    pub fn with_api_base_url(mut self, url: &str) -> Result<Self> {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(GitHubError::InvalidInput {
                field: "api_base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        self.api_base_url = url.to_string();
        Ok(self)
    }

    pub(crate) fn private_key_pem(&self) -> &[u8] {
        self.private_key.expose_secret().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_defaults() {
        let config = GitHubAppConfig::new("12345", "-----BEGIN KEY-----").unwrap();
        assert_eq!(config.app_id, "12345");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.user_agent.starts_with("onboard-github-app/"));
    }

    #[test]
    fn test_config_expands_escaped_newlines() {
        let config = GitHubAppConfig::new("1", "line1\\nline2").unwrap();
        assert_eq!(config.private_key_pem(), b"line1\nline2");
    }

    #[test]
    fn test_config_rejects_empty_values() {
        assert!(matches!(
            GitHubAppConfig::new(" ", "key"),
            Err(GitHubError::InvalidInput { field, .. }) if field == "app_id"
        ));
        assert!(matches!(
            GitHubAppConfig::new("1", ""),
            Err(GitHubError::InvalidInput { field, .. }) if field == "private_key"
        ));
    }

    #[test]
    fn test_config_api_base_url_trims_slash() {
        let config = GitHubAppConfig::new("1", "key")
            .unwrap()
            .with_api_base_url("https://ghe.example.com/api/v3/")
            .unwrap();
        assert_eq!(config.api_base_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_config_debug_does_not_leak_key() {
        let config = GitHubAppConfig::new("1", "super-secret-key").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-key"));
    }
}
