//! Derived fragments: runner selector, trigger block, dynamic config.

use crate::config::{BranchTrigger, ConfigurationRecord, Technology, Triggers};

/// Value for `runs-on`.
///
/// Self-hosted runners render as a label list headed by `self-hosted`;
/// every other runner type uses the hosted Ubuntu image.
pub fn runs_on(config: &ConfigurationRecord) -> String {
    match &config.runner {
        Some(runner) if runner.is_self_hosted() => {
            if runner.labels.is_empty() {
                "[self-hosted]".to_string()
            } else {
                format!("[self-hosted, {}]", runner.labels.join(", "))
            }
        }
        _ => "ubuntu-latest".to_string(),
    }
}

/// Body of the workflow `on:` key.
///
/// Blocks appear in a fixed order regardless of input order:
/// workflow_dispatch, push, schedule, pull_request. The first line
/// carries no indentation; the template supplies it.
///
/// Only `workflow_dispatch:` is emitted bare, so a template indent lines
/// the block up under `on:` only when dispatch is enabled. Without it the
/// first block lands two columns deeper than the ones after it.
pub fn on_triggers(triggers: Option<&Triggers>) -> String {
    let Some(triggers) = triggers else {
        return String::new();
    };

    let mut lines: Vec<String> = Vec::new();
    if triggers.workflow_dispatch {
        lines.push("workflow_dispatch:".to_string());
    }
    if triggers.push.active {
        lines.push("  push:".to_string());
        push_branches(&mut lines, &triggers.push);
    }
    if triggers.schedule.active {
        lines.push("  schedule:".to_string());
        lines.push(format!("    - cron: '{}'", triggers.schedule.cron));
    }
    if triggers.pull_request.active {
        lines.push("  pull_request:".to_string());
        push_branches(&mut lines, &triggers.pull_request);
    }
    lines.join("\n")
}

fn push_branches(lines: &mut Vec<String>, trigger: &BranchTrigger) {
    let branches = trigger.branch_list();
    if branches.is_empty() {
        return;
    }
    lines.push("    branches:".to_string());
    lines.extend(branches.into_iter().map(|b| format!("      - {}", b)));
}

/// Technology-specific `KEY="value"` lines, newline-terminated.
/// Unrecognized technologies yield an empty string.
pub fn dynamic_config(technology: Option<&Technology>) -> String {
    let pairs: &[(&str, &str)] = match technology {
        Some(Technology::Python) => &[("PYTHON_VERSION", "3.10"), ("PYTHON_DIST_DIR", "./")],
        Some(Technology::Maven) => &[
            ("JAVA_VERSION", "8"),
            ("JAVA_DIST_DIR", "target/"),
            ("JAVA_DISTRIBUTION", "temurin"),
        ],
        Some(Technology::Node) => &[("NODE_VERSION", "18"), ("NODE_DIST_DIR", "dist/")],
        Some(Technology::Other(_)) | None => &[],
    };

    pairs
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"\n", key, value))
        .collect()
}
