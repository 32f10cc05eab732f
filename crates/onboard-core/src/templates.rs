//! Template sources and the provisioned file catalog.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::ConfigurationRecord;
use crate::error::TemplateError;
use crate::render::{finalize_primary, render};

/// How a catalog file is turned into repository content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// Written byte for byte.
    Static,
    /// Placeholder pass when the repository has a configuration record.
    Templated,
    /// Placeholder pass when a record exists, then project name and
    /// dynamic config substitution regardless.
    Primary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Destination path inside the repository.
    pub path: String,
    /// Name handed to the [`TemplateSource`].
    pub template: String,
    pub kind: TemplateKind,
}

impl CatalogEntry {
    pub fn new(path: impl Into<String>, template: impl Into<String>, kind: TemplateKind) -> Self {
        Self {
            path: path.into(),
            template: template.into(),
            kind,
        }
    }
}

/// Ordered set of files provisioned into every repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileCatalog {
    entries: Vec<CatalogEntry>,
}

impl FileCatalog {
    pub fn standard() -> Self {
        Self {
            entries: vec![
                CatalogEntry::new(
                    ".github/workflows/build-and-deploy.yml",
                    "build-and-deploy.yml",
                    TemplateKind::Templated,
                ),
                CatalogEntry::new(
                    ".github/workflow-config.env",
                    "workflow-config.env",
                    TemplateKind::Primary,
                ),
                CatalogEntry::new(
                    "sonar-project.properties",
                    "sonar-project.properties",
                    TemplateKind::Static,
                ),
                CatalogEntry::new("README.md", "README.md", TemplateKind::Static),
            ],
        }
    }

    /// Append an entry, replacing any existing entry for the same path.
    pub fn with_entry(mut self, entry: CatalogEntry) -> Self {
        self.entries.retain(|e| e.path != entry.path);
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn find(&self, path: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named raw template text.
pub trait TemplateSource: Send + Sync {
    fn read(&self, name: &str) -> Result<String, TemplateError>;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplates;

impl EmbeddedTemplates {
    const BUILT_IN: [(&'static str, &'static str); 4] = [
        (
            "build-and-deploy.yml",
            include_str!("../templates/build-and-deploy.yml"),
        ),
        (
            "workflow-config.env",
            include_str!("../templates/workflow-config.env"),
        ),
        (
            "sonar-project.properties",
            include_str!("../templates/sonar-project.properties"),
        ),
        ("README.md", include_str!("../templates/README.md")),
    ];

    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::BUILT_IN.iter().map(|(name, _)| *name)
    }
}

impl TemplateSource for EmbeddedTemplates {
    fn read(&self, name: &str) -> Result<String, TemplateError> {
        Self::BUILT_IN
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, body)| body.to_string())
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }
}

/// Templates read from `<dir>/<name>` on every call.
#[derive(Debug, Clone)]
pub struct DirTemplateSource {
    dir: PathBuf,
}

impl DirTemplateSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TemplateSource for DirTemplateSource {
    fn read(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.dir.join(name);
        std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => TemplateError::NotFound(path.display().to_string()),
            _ => TemplateError::Io {
                name: name.to_string(),
                source,
            },
        })
    }
}

/// Produce the content written for one catalog file.
///
/// Without a record, `Templated` content passes through unchanged so the
/// repository receives the raw template.
pub fn prepare_file(
    kind: TemplateKind,
    template: &str,
    repo_name: &str,
    config: Option<&ConfigurationRecord>,
) -> String {
    match (kind, config) {
        (TemplateKind::Static, _) => template.to_string(),
        (TemplateKind::Templated, Some(config)) => render(template, config),
        (TemplateKind::Templated, None) => template.to_string(),
        (TemplateKind::Primary, Some(config)) => {
            finalize_primary(&render(template, config), repo_name, Some(config))
        }
        (TemplateKind::Primary, None) => finalize_primary(template, repo_name, None),
    }
}
