//! Template rendering.
//!
//! Templates mark substitution points with `[[UPPER_SNAKE_CASE]]` tokens.
//! [`render`] replaces every recognized token with a value derived from a
//! [`ConfigurationRecord`] in one pass; unrecognized tokens are left as
//! written. No derived value contains a token, so there is nothing to
//! re-scan.

mod blocks;

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::config::ConfigurationRecord;

pub use blocks::{on_triggers, runs_on};

/// Literal replaced with the repository's short name in the primary
/// workflow configuration document.
pub const PROJECT_NAME_TOKEN: &str = "YOUR_PROJECT_NAME";

/// Recognized placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    WorkflowName,
    OnTriggers,
    RunsOnConfig,
    Technology,
    MessagingApp,
    DockerEnabled,
    SelfHostedRunnerEnabled,
    DeploymentType,
    DynamicConfig,
}

impl Placeholder {
    pub const ALL: [Placeholder; 9] = [
        Placeholder::WorkflowName,
        Placeholder::OnTriggers,
        Placeholder::RunsOnConfig,
        Placeholder::Technology,
        Placeholder::MessagingApp,
        Placeholder::DockerEnabled,
        Placeholder::SelfHostedRunnerEnabled,
        Placeholder::DeploymentType,
        Placeholder::DynamicConfig,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::WorkflowName => "WORKFLOW_NAME",
            Placeholder::OnTriggers => "ON_TRIGGERS",
            Placeholder::RunsOnConfig => "RUNS_ON_CONFIG",
            Placeholder::Technology => "TECHNOLOGY",
            Placeholder::MessagingApp => "MESSAGING_APP",
            Placeholder::DockerEnabled => "DOCKER_ENABLED",
            Placeholder::SelfHostedRunnerEnabled => "SELF_HOSTED_RUNNER_ENABLED",
            Placeholder::DeploymentType => "DEPLOYMENT_TYPE",
            Placeholder::DynamicConfig => "DYNAMIC_CONFIG",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The token as written in templates, e.g. `[[TECHNOLOGY]]`
    pub fn token(self) -> String {
        format!("[[{}]]", self.name())
    }

    /// Value substituted for this placeholder.
    pub fn value(self, config: &ConfigurationRecord) -> String {
        match self {
            Placeholder::WorkflowName => {
                format!("{} Build and Deploy Workflow", config.technology_str())
                    .trim_start()
                    .to_string()
            }
            Placeholder::OnTriggers => on_triggers(config.triggers.as_ref()),
            Placeholder::RunsOnConfig => runs_on(config),
            Placeholder::Technology => config.technology_str().to_string(),
            Placeholder::MessagingApp => {
                format!("'{}'", config.notify.as_deref().unwrap_or_default())
            }
            Placeholder::DockerEnabled => config.docker_enabled().to_string(),
            Placeholder::SelfHostedRunnerEnabled => config.is_self_hosted().to_string(),
            Placeholder::DeploymentType => config.deploy.clone().unwrap_or_default(),
            Placeholder::DynamicConfig => dynamic_config(config),
        }
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[\[([A-Z][A-Z0-9_]*)\]\]").expect("valid token regex"))
}

/// Substitute every recognized placeholder in `template`.
///
/// Pure and total: missing optional fields render as their emptiest
/// valid value.
pub fn render(template: &str, config: &ConfigurationRecord) -> String {
    token_pattern()
        .replace_all(template, |caps: &Captures<'_>| {
            match Placeholder::from_name(&caps[1]) {
                Some(placeholder) => placeholder.value(config),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Technology-specific `KEY="value"` lines for a record.
pub fn dynamic_config(config: &ConfigurationRecord) -> String {
    blocks::dynamic_config(config.technology.as_ref())
}

/// Post-pass for the primary workflow configuration document.
///
/// Replaces [`PROJECT_NAME_TOKEN`] with `repo_name` and any remaining
/// `[[DYNAMIC_CONFIG]]` token. Applies even without a record, using
/// [`ConfigurationRecord::fallback`].
pub fn finalize_primary(
    content: &str,
    repo_name: &str,
    config: Option<&ConfigurationRecord>,
) -> String {
    let fallback;
    let config = match config {
        Some(config) => config,
        None => {
            fallback = ConfigurationRecord::fallback();
            &fallback
        }
    };

    content
        .replace(PROJECT_NAME_TOKEN, repo_name)
        .replace(&Placeholder::DynamicConfig.token(), &dynamic_config(config))
}
