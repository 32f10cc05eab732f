//! Onboard - repository onboarding CLI
//!
//! ## Commands
//!
//! - `render`: print the files a repository would receive
//! - `config`: manage stored per-repository configuration
//! - `provision`: provision repositories of an installation now
//! - `templates`: list the file catalog

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use github_app_client::{GitHubClient, InstallationId, RepoRef};
use onboard_core::{
    prepare_file, ConfigResolver, ConfigStore, ConfigurationRecord, DirTemplateSource,
    EmbeddedTemplates, FileCatalog, ProvisionOptions, Provisioner, TemplateSource,
};
use onboard_state::SurrealConfigStore;
use serde_json::Value;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "onboard")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Provision CI/CD configuration into GitHub repositories", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the prepared content of catalog files for a repository
    Render {
        /// Repository full name (owner/name)
        #[arg(long)]
        repo: String,

        /// Configuration document to use instead of the store
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only print this catalog path
        #[arg(long)]
        file: Option<String>,

        /// Read templates from this directory
        #[arg(long, env = "ONBOARD_TEMPLATES_DIR")]
        templates_dir: Option<PathBuf>,
    },

    /// Manage stored repository configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Provision repositories of an installation
    Provision {
        /// Installation ID
        #[arg(long)]
        installation: u64,

        /// Keep the App installed afterwards
        #[arg(long)]
        keep_installation: bool,

        /// Replace files that already exist
        #[arg(long)]
        overwrite: bool,

        /// Skip repositories whose configuration is malformed
        #[arg(long)]
        strict: bool,

        /// Read templates from this directory
        #[arg(long, env = "ONBOARD_TEMPLATES_DIR")]
        templates_dir: Option<PathBuf>,

        /// Repositories (owner/name)
        #[arg(required = true)]
        repos: Vec<String>,
    },

    /// List the files provisioned into every repository
    Templates,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the stored document
    Get { repo: String },

    /// Store a document read from a file (`-` for stdin)
    Put { repo: String, file: PathBuf },

    /// Remove the stored document
    Delete { repo: String },

    /// List repositories with stored configuration
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    onboard_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Render {
            repo,
            config,
            file,
            templates_dir,
        } => cmd_render(&repo, config.as_deref(), file.as_deref(), templates_dir).await,
        Commands::Config { action } => {
            let store = connect_store().await?;
            match action {
                ConfigAction::Get { repo } => cmd_config_get(&store, &repo).await,
                ConfigAction::Put { repo, file } => cmd_config_put(&store, &repo, &file).await,
                ConfigAction::Delete { repo } => cmd_config_delete(&store, &repo).await,
                ConfigAction::List => cmd_config_list(&store).await,
            }
        }
        Commands::Provision {
            installation,
            keep_installation,
            overwrite,
            strict,
            templates_dir,
            repos,
        } => {
            let options = ProvisionOptions {
                overwrite_existing: overwrite,
                delete_installation: !keep_installation,
                strict_config: strict,
            };
            cmd_provision(InstallationId(installation), &repos, options, templates_dir).await
        }
        Commands::Templates => cmd_templates(),
    }
}

async fn connect_store() -> Result<SurrealConfigStore> {
    SurrealConfigStore::from_env()
        .await
        .context("Failed to connect to configuration store")
}

fn template_source(dir: Option<PathBuf>) -> Arc<dyn TemplateSource> {
    match dir {
        Some(dir) => Arc::new(DirTemplateSource::new(dir)),
        None => Arc::new(EmbeddedTemplates),
    }
}

fn parse_repo(full_name: &str) -> Result<RepoRef> {
    RepoRef::parse(full_name)
        .with_context(|| format!("Invalid repository '{}', expected owner/name", full_name))
}

/// Read a JSON document from `path`, or stdin for `-`.
fn load_document(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).context("Configuration is not valid JSON")
}

/// Prepared `(path, content)` pairs for every catalog entry, or just `only`.
fn render_files(
    catalog: &FileCatalog,
    templates: &dyn TemplateSource,
    repo: &RepoRef,
    config: Option<&ConfigurationRecord>,
    only: Option<&str>,
) -> Result<Vec<(String, String)>> {
    let entries: Vec<_> = match only {
        Some(path) => vec![catalog
            .find(path)
            .with_context(|| format!("'{}' is not in the file catalog", path))?],
        None => catalog.entries().iter().collect(),
    };

    entries
        .into_iter()
        .map(|entry| {
            let template = templates
                .read(&entry.template)
                .with_context(|| format!("Failed to read template for {}", entry.path))?;
            let content = prepare_file(entry.kind, &template, &repo.name, config);
            Ok((entry.path.clone(), content))
        })
        .collect()
}

async fn cmd_render(
    repo: &str,
    config_path: Option<&Path>,
    only: Option<&str>,
    templates_dir: Option<PathBuf>,
) -> Result<()> {
    let repo = parse_repo(repo)?;

    let config = match config_path {
        Some(path) => {
            let document = load_document(path)?;
            let record = ConfigurationRecord::from_document(&document)
                .map_err(anyhow::Error::msg)
                .context("Malformed configuration")?;
            Some(record)
        }
        None => {
            let store = connect_store().await?;
            ConfigResolver::new(Arc::new(store))
                .resolve(&repo.full_name())
                .await?
        }
    };
    if config.is_none() {
        info!(repository = %repo, "No configuration; rendering defaults");
    }

    let templates = template_source(templates_dir);
    let files = render_files(
        &FileCatalog::standard(),
        templates.as_ref(),
        &repo,
        config.as_ref(),
        only,
    )?;

    if only.is_some() {
        for (_, content) in files {
            print!("{}", content);
        }
    } else {
        for (path, content) in files {
            println!("==> {} <==", path);
            println!("{}", content);
        }
    }
    Ok(())
}

async fn cmd_config_get(store: &dyn ConfigStore, repo: &str) -> Result<()> {
    match store.get(repo).await? {
        Some(doc) => {
            println!("{}", serde_json::to_string_pretty(&doc.document)?);
            Ok(())
        }
        None => bail!("No configuration stored for {}", repo),
    }
}

async fn cmd_config_put(store: &dyn ConfigStore, repo: &str, file: &Path) -> Result<()> {
    parse_repo(repo)?;
    let document = load_document(file)?;
    let record = ConfigurationRecord::from_document(&document)
        .map_err(anyhow::Error::msg)
        .context("Malformed configuration")?;

    let missing = record.validate();
    if !missing.is_empty() {
        warn!(repository = %repo, missing = %missing.join(", "), "Configuration is incomplete");
    }

    store
        .put(repo, document)
        .await
        .with_context(|| format!("Failed to store configuration for {}", repo))?;
    println!("Stored configuration for {}", repo);
    Ok(())
}

async fn cmd_config_delete(store: &dyn ConfigStore, repo: &str) -> Result<()> {
    if store.delete(repo).await? {
        println!("Deleted configuration for {}", repo);
    } else {
        println!("No configuration stored for {}", repo);
    }
    Ok(())
}

async fn cmd_config_list(store: &dyn ConfigStore) -> Result<()> {
    let repos = store.list().await?;
    if repos.is_empty() {
        println!("No configuration stored.");
    }
    for repo in repos {
        println!("{}", repo);
    }
    Ok(())
}

async fn cmd_provision(
    installation: InstallationId,
    repos: &[String],
    options: ProvisionOptions,
    templates_dir: Option<PathBuf>,
) -> Result<()> {
    let repos = repos
        .iter()
        .map(|r| parse_repo(r))
        .collect::<Result<Vec<_>>>()?;

    let store = connect_store().await?;
    let github = GitHubClient::from_env().context("GitHub App credentials not configured")?;

    let provisioner = Provisioner::new(
        Arc::new(store),
        Arc::new(github),
        template_source(templates_dir),
    )
    .with_options(options);

    let report = provisioner.provision_installation(installation, &repos).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        bail!(
            "Provisioning finished with {} failed file(s)",
            report.failed_files()
        );
    }
    Ok(())
}

fn cmd_templates() -> Result<()> {
    for entry in FileCatalog::standard().entries() {
        println!(
            "{:<10} {} <- {}",
            format!("{:?}", entry.kind).to_lowercase(),
            entry.path,
            entry.template
        );
    }
    Ok(())
}
