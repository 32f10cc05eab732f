//! Per-repository onboarding configuration.
//!
//! Records come from operator-maintained JSON documents, so parsing is
//! lenient: every field is optional, and a field of the wrong shape is
//! read as absent rather than rejecting the whole record. Callers that
//! want strictness use [`ConfigurationRecord::validate`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Build technology of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Technology {
    Python,
    Maven,
    Node,
    /// Anything else, kept verbatim
    Other(String),
}

impl Technology {
    pub fn as_str(&self) -> &str {
        match self {
            Technology::Python => "python",
            Technology::Maven => "maven",
            Technology::Node => "node",
            Technology::Other(value) => value,
        }
    }
}

impl From<String> for Technology {
    fn from(value: String) -> Self {
        match value.as_str() {
            "python" => Technology::Python,
            "maven" => Technology::Maven,
            "node" => Technology::Node,
            _ => Technology::Other(value),
        }
    }
}

impl From<&str> for Technology {
    fn from(value: &str) -> Self {
        Technology::from(value.to_string())
    }
}

impl From<Technology> for String {
    fn from(value: Technology) -> Self {
        match value {
            Technology::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Technology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where CI jobs run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunnerKind {
    SelfHosted,
    /// Any other runner type, kept verbatim
    Hosted(String),
}

impl Default for RunnerKind {
    fn default() -> Self {
        RunnerKind::Hosted("hosted".to_string())
    }
}

impl From<String> for RunnerKind {
    fn from(value: String) -> Self {
        if value == "self-hosted" {
            RunnerKind::SelfHosted
        } else {
            RunnerKind::Hosted(value)
        }
    }
}

impl From<RunnerKind> for String {
    fn from(value: RunnerKind) -> Self {
        match value {
            RunnerKind::SelfHosted => "self-hosted".to_string(),
            RunnerKind::Hosted(value) => value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: RunnerKind,
    /// Extra runner labels; only meaningful for self-hosted runners
    #[serde(default, deserialize_with = "lenient")]
    pub labels: Vec<String>,
}

impl RunnerConfig {
    pub fn self_hosted<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RunnerConfig {
            kind: RunnerKind::SelfHosted,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn hosted() -> Self {
        RunnerConfig::default()
    }

    pub fn is_self_hosted(&self) -> bool {
        self.kind == RunnerKind::SelfHosted
    }
}

/// A push or pull_request trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchTrigger {
    #[serde(default, deserialize_with = "lenient")]
    pub active: bool,
    /// Comma-separated branch names
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub branches: Option<String>,
}

impl BranchTrigger {
    pub fn on_branches(branches: &str) -> Self {
        BranchTrigger {
            active: true,
            branches: Some(branches.to_string()),
        }
    }

    /// Branch names in the order given, trimmed, empty entries dropped
    pub fn branch_list(&self) -> Vec<&str> {
        self.branches
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTrigger {
    #[serde(default, deserialize_with = "lenient")]
    pub active: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub cron: String,
}

/// Which CI triggers are active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggers {
    #[serde(default, deserialize_with = "lenient")]
    pub workflow_dispatch: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub push: BranchTrigger,
    #[serde(default, deserialize_with = "lenient")]
    pub pull_request: BranchTrigger,
    #[serde(default, deserialize_with = "lenient")]
    pub schedule: ScheduleTrigger,
}

/// Onboarding configuration of one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub technology: Option<Technology>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerConfig>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Triggers>,
    /// Messaging app that receives notifications
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub docker: Option<bool>,
    /// Deployment target
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub deploy: Option<String>,
}

impl ConfigurationRecord {
    /// Fields that must be present for a full substitution.
    pub const REQUIRED_FIELDS: [&'static str; 6] =
        ["technology", "runner", "triggers", "notify", "docker", "deploy"];

    /// Parse a stored document. Fails only when the document is not a
    /// JSON object.
    pub fn from_document(document: &serde_json::Value) -> Result<Self, String> {
        if !document.is_object() {
            return Err(format!(
                "expected a JSON object, found {}",
                json_kind(document)
            ));
        }
        serde_json::from_value(document.clone()).map_err(|e| e.to_string())
    }

    /// Synthetic record used when a repository has no configuration.
    /// Its technology matches no known build, so technology-specific
    /// output renders empty.
    pub fn fallback() -> Self {
        ConfigurationRecord {
            technology: Some(Technology::Other("default".to_string())),
            ..Default::default()
        }
    }

    /// Names of required fields that are missing
    pub fn validate(&self) -> Vec<&'static str> {
        let present = [
            self.technology.is_some(),
            self.runner.is_some(),
            self.triggers.is_some(),
            self.notify.is_some(),
            self.docker.is_some(),
            self.deploy.is_some(),
        ];
        Self::REQUIRED_FIELDS
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn technology_str(&self) -> &str {
        self.technology.as_ref().map(Technology::as_str).unwrap_or("")
    }

    pub fn docker_enabled(&self) -> bool {
        self.docker.unwrap_or(false)
    }

    pub fn is_self_hosted(&self) -> bool {
        self.runner.as_ref().is_some_and(RunnerConfig::is_self_hosted)
    }
}

/// Deserialize `T`, falling back to `T::default()` when the value has the
/// wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
