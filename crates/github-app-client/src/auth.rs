//! GitHub App authentication
//!
//! Two credentials are involved:
//! - the App JWT (RS256, signed with the App private key, valid ten
//!   minutes) authenticates `/app/...` endpoints;
//! - installation access tokens, minted with the JWT, authenticate
//!   repository endpoints. They are cached per installation until one
//!   minute before expiry.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::SecretString;
use serde::Serialize;

use crate::api::InstallationId;
use crate::config::GitHubAppConfig;
use crate::error::GitHubError;
use crate::Result;

/// Tokens this close to expiry are minted again.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct Claims {
    iat: u64,
    exp: u64,
    iss: String,
}

/// Sign an App JWT valid from one minute ago (clock drift) for ten minutes.
pub fn generate_app_jwt(config: &GitHubAppConfig, now: u64) -> Result<String> {
    let claims = Claims {
        iat: now.saturating_sub(60),
        exp: now + 600,
        iss: config.app_id.clone(),
    };
    let key = EncodingKey::from_rsa_pem(config.private_key_pem())
        .map_err(|e| GitHubError::Jwt(e.to_string()))?;

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| GitHubError::Jwt(e.to_string()))
}

/// An installation access token and its expiry
#[derive(Debug, Clone)]
pub struct InstallationToken {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl InstallationToken {
    /// Parse the `expires_at` field of an access token response
    pub fn new(token: String, expires_at: &str) -> Result<Self> {
        let expires_at = DateTime::parse_from_rfc3339(expires_at)
            .map_err(|e| GitHubError::TimeParse {
                value: expires_at.to_string(),
                message: e.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(InstallationToken {
            token: SecretString::from(token),
            expires_at,
        })
    }

    /// Whether the token can still be used at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Per-installation token cache
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: Mutex<HashMap<InstallationId, InstallationToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cached token that is still fresh at `now`
    pub fn get(&self, installation: InstallationId, now: DateTime<Utc>) -> Option<SecretString> {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        match tokens.get(&installation) {
            Some(cached) if cached.is_fresh(now) => Some(cached.token.clone()),
            Some(_) => {
                tokens.remove(&installation);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, installation: InstallationId, token: InstallationToken) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.insert(installation, token);
    }

    /// Drop the token for an installation (e.g. after uninstalling)
    pub fn evict(&self, installation: InstallationId) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.remove(&installation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn token_expiring_at(expires_at: DateTime<Utc>) -> InstallationToken {
        InstallationToken {
            token: SecretString::from("ghs_test".to_string()),
            expires_at,
        }
    }

    #[test]
    fn test_jwt_rejects_invalid_pem() {
        let config = GitHubAppConfig::new("123", "not a pem key").unwrap();
        let err = generate_app_jwt(&config, 1_700_000_000).unwrap_err();
        assert!(matches!(err, GitHubError::Jwt(_)));
    }

    #[test]
    fn test_installation_token_parses_expiry() {
        let token = InstallationToken::new("ghs_abc".to_string(), "2026-01-01T00:00:00Z").unwrap();
        assert_eq!(token.expires_at.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(token.token.expose_secret(), "ghs_abc");
    }

    #[test]
    fn test_installation_token_bad_expiry() {
        let err = InstallationToken::new("ghs_abc".to_string(), "tomorrow").unwrap_err();
        assert!(matches!(err, GitHubError::TimeParse { .. }));
    }

    #[test]
    fn test_token_freshness_margin() {
        let now = Utc::now();
        assert!(token_expiring_at(now + Duration::minutes(10)).is_fresh(now));
        assert!(!token_expiring_at(now + Duration::seconds(30)).is_fresh(now));
        assert!(!token_expiring_at(now - Duration::seconds(1)).is_fresh(now));
    }

    #[test]
    fn test_cache_returns_fresh_and_drops_stale() {
        let cache = TokenCache::new();
        let now = Utc::now();
        let id = InstallationId(7);

        cache.insert(id, token_expiring_at(now + Duration::minutes(30)));
        assert!(cache.get(id, now).is_some());

        let later = now + Duration::minutes(29) + Duration::seconds(30);
        assert!(cache.get(id, later).is_none());
        assert!(cache.get(id, now).is_none());
    }

    #[test]
    fn test_cache_evict() {
        let cache = TokenCache::new();
        let now = Utc::now();
        cache.insert(InstallationId(1), token_expiring_at(now + Duration::hours(1)));
        cache.evict(InstallationId(1));
        assert!(cache.get(InstallationId(1), now).is_none());
    }
}
