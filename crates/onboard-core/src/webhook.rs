//! GitHub webhook deliveries: signature verification and event parsing.

use github_app_client::{InstallationId, RepoRef};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const EVENT_HEADER: &str = "X-GitHub-Event";
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Check `header` (`sha256=<hex>`) against HMAC-SHA256 of the raw body.
///
/// The digest comparison is constant time.
pub fn verify_signature(
    secret: &[u8],
    body: &[u8],
    header: Option<&str>,
) -> Result<(), WebhookError> {
    let header = header.ok_or(WebhookError::MissingSignature)?;
    let hex_digest = header.trim().strip_prefix(SIGNATURE_PREFIX).ok_or_else(|| {
        WebhookError::MalformedSignature(format!("expected {SIGNATURE_PREFIX}<hex>"))
    })?;
    let expected =
        hex::decode(hex_digest).map_err(|e| WebhookError::MalformedSignature(e.to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| WebhookError::MalformedSignature(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| WebhookError::SignatureMismatch)
}

/// `sha256=<hex>` signature for `body`, as GitHub would send it.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| WebhookError::MalformedSignature(e.to_string()))?;
    mac.update(body);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// A delivery reduced to what the onboarding flow acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// The App was installed; `repositories` lists what it was granted.
    Installation {
        installation_id: InstallationId,
        repositories: Vec<RepoRef>,
    },
    /// Repositories were added to an existing installation.
    RepositoriesAdded {
        installation_id: InstallationId,
        repositories: Vec<RepoRef>,
    },
    /// A repository was created under an account with the App installed.
    RepositoryCreated {
        installation_id: InstallationId,
        repository: RepoRef,
    },
    Ping {
        zen: Option<String>,
    },
    Ignored {
        event: String,
        action: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct InstallationRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct OwnerRef {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryEntry {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    name: String,
    owner: OwnerRef,
}

#[derive(Debug, Deserialize)]
struct InstallationPayload {
    installation: InstallationRef,
    #[serde(default)]
    repositories: Vec<RepositoryEntry>,
}

#[derive(Debug, Deserialize)]
struct InstallationRepositoriesPayload {
    installation: InstallationRef,
    #[serde(default)]
    repositories_added: Vec<RepositoryEntry>,
}

#[derive(Debug, Deserialize)]
struct RepositoryEventPayload {
    installation: InstallationRef,
    repository: RepositoryPayload,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PingPayload {
    zen: Option<String>,
}

impl WebhookEvent {
    /// Parse a delivery given its `X-GitHub-Event` name and raw body.
    pub fn parse(event: &str, body: &[u8]) -> Result<Self, WebhookError> {
        let invalid = |reason: String| WebhookError::InvalidPayload {
            event: event.to_string(),
            reason,
        };

        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|e| invalid(e.to_string()))?;
        let action = envelope.action;

        match (event, action.as_deref()) {
            ("installation", Some("created")) => {
                let payload: InstallationPayload =
                    serde_json::from_slice(body).map_err(|e| invalid(e.to_string()))?;
                Ok(WebhookEvent::Installation {
                    installation_id: InstallationId(payload.installation.id),
                    repositories: repo_refs(payload.repositories).map_err(invalid)?,
                })
            }
            ("installation_repositories", Some("added")) => {
                let payload: InstallationRepositoriesPayload =
                    serde_json::from_slice(body).map_err(|e| invalid(e.to_string()))?;
                Ok(WebhookEvent::RepositoriesAdded {
                    installation_id: InstallationId(payload.installation.id),
                    repositories: repo_refs(payload.repositories_added).map_err(invalid)?,
                })
            }
            ("repository", Some("created")) => {
                let payload: RepositoryEventPayload =
                    serde_json::from_slice(body).map_err(|e| invalid(e.to_string()))?;
                Ok(WebhookEvent::RepositoryCreated {
                    installation_id: InstallationId(payload.installation.id),
                    repository: RepoRef::new(payload.repository.owner.login, payload.repository.name),
                })
            }
            ("ping", _) => {
                let payload: PingPayload =
                    serde_json::from_slice(body).map_err(|e| invalid(e.to_string()))?;
                Ok(WebhookEvent::Ping { zen: payload.zen })
            }
            _ => Ok(WebhookEvent::Ignored {
                event: event.to_string(),
                action,
            }),
        }
    }

    /// Installation and repositories to provision, if this event calls for it.
    pub fn provisioning_target(&self) -> Option<(InstallationId, Vec<RepoRef>)> {
        match self {
            WebhookEvent::Installation {
                installation_id,
                repositories,
            }
            | WebhookEvent::RepositoriesAdded {
                installation_id,
                repositories,
            } => Some((*installation_id, repositories.clone())),
            WebhookEvent::RepositoryCreated {
                installation_id,
                repository,
            } => Some((*installation_id, vec![repository.clone()])),
            WebhookEvent::Ping { .. } | WebhookEvent::Ignored { .. } => None,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::Installation { .. } => "installation",
            WebhookEvent::RepositoriesAdded { .. } => "installation_repositories",
            WebhookEvent::RepositoryCreated { .. } => "repository",
            WebhookEvent::Ping { .. } => "ping",
            WebhookEvent::Ignored { .. } => "ignored",
        }
    }
}

fn repo_refs(entries: Vec<RepositoryEntry>) -> Result<Vec<RepoRef>, String> {
    entries
        .into_iter()
        .map(|entry| {
            RepoRef::parse(&entry.full_name)
                .ok_or_else(|| format!("invalid repository full_name: {}", entry.full_name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &[u8] = b"It's a Secret to Everybody";

    #[test]
    fn test_signature_known_vector() {
        // Example from GitHub's webhook validation documentation.
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";
        assert!(verify_signature(SECRET, b"Hello, World!", Some(header)).is_ok());
    }

    #[test]
    fn test_sign_then_verify() {
        let body = br#"{"action":"created"}"#;
        let header = sign(SECRET, body).unwrap();
        assert!(verify_signature(SECRET, body, Some(&header)).is_ok());
        assert!(matches!(
            verify_signature(b"other", body, Some(&header)),
            Err(WebhookError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_signature_header_errors() {
        assert!(matches!(
            verify_signature(SECRET, b"x", None),
            Err(WebhookError::MissingSignature)
        ));
        assert!(matches!(
            verify_signature(SECRET, b"x", Some("sha1=abcd")),
            Err(WebhookError::MalformedSignature(_))
        ));
        assert!(matches!(
            verify_signature(SECRET, b"x", Some("sha256=not-hex")),
            Err(WebhookError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_parse_installation_created() {
        let body = json!({
            "action": "created",
            "installation": {"id": 42},
            "repositories": [
                {"id": 1, "name": "api", "full_name": "acme/api"},
                {"id": 2, "name": "web", "full_name": "acme/web"}
            ]
        });
        let event = WebhookEvent::parse("installation", body.to_string().as_bytes()).unwrap();
        assert_eq!(
            event,
            WebhookEvent::Installation {
                installation_id: InstallationId(42),
                repositories: vec![RepoRef::new("acme", "api"), RepoRef::new("acme", "web")],
            }
        );
    }

    #[test]
    fn test_parse_repositories_added() {
        let body = json!({
            "action": "added",
            "installation": {"id": 7},
            "repositories_added": [{"full_name": "acme/new"}],
            "repositories_removed": []
        });
        let event =
            WebhookEvent::parse("installation_repositories", body.to_string().as_bytes()).unwrap();
        let (id, repos) = event.provisioning_target().unwrap();
        assert_eq!(id, InstallationId(7));
        assert_eq!(repos, vec![RepoRef::new("acme", "new")]);
    }

    #[test]
    fn test_parse_repository_created() {
        let body = json!({
            "action": "created",
            "installation": {"id": 9},
            "repository": {"name": "svc", "full_name": "acme/svc", "owner": {"login": "acme"}}
        });
        let event = WebhookEvent::parse("repository", body.to_string().as_bytes()).unwrap();
        assert_eq!(
            event.provisioning_target(),
            Some((InstallationId(9), vec![RepoRef::new("acme", "svc")]))
        );
    }

    #[test]
    fn test_parse_ping_and_ignored() {
        let ping = WebhookEvent::parse("ping", br#"{"zen":"Keep it logically awesome."}"#).unwrap();
        assert!(matches!(ping, WebhookEvent::Ping { zen: Some(_) }));
        assert!(ping.provisioning_target().is_none());

        let deleted = WebhookEvent::parse("installation", br#"{"action":"deleted"}"#).unwrap();
        assert_eq!(
            deleted,
            WebhookEvent::Ignored {
                event: "installation".to_string(),
                action: Some("deleted".to_string()),
            }
        );

        let push = WebhookEvent::parse("push", br#"{"ref":"refs/heads/main"}"#).unwrap();
        assert_eq!(push.kind(), "ignored");
    }

    #[test]
    fn test_parse_invalid_payloads() {
        assert!(matches!(
            WebhookEvent::parse("installation", b"not json"),
            Err(WebhookError::InvalidPayload { .. })
        ));
        assert!(matches!(
            WebhookEvent::parse("repository", br#"{"action":"created"}"#),
            Err(WebhookError::InvalidPayload { .. })
        ));
        assert!(matches!(
            WebhookEvent::parse(
                "installation",
                br#"{"action":"created","installation":{"id":1},"repositories":[{"full_name":"noslash"}]}"#
            ),
            Err(WebhookError::InvalidPayload { .. })
        ));
    }
}
