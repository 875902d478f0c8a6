mod commands;
mod config;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use repo_mirror::Mirror;
use repo_mirror_github::{GitHubClient, GitHubConfig};

use crate::config::{AppConfig, MirrorEntry};

#[derive(Parser)]
#[command(name = "repo-mirror")]
#[command(about = "Mirror directories of GitHub repositories into local folders")]
struct Cli {
    /// Config file (defaults to ~/.config/repo-mirror/mirrors.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synchronize configured mirrors
    Sync {
        /// Only sync the mirror with this label (repeatable)
        #[arg(long = "mirror")]
        mirrors: Vec<String>,
        /// Report stale local files instead of deleting them
        #[arg(long)]
        dry_run: bool,
        /// Maximum files fetched and written at once
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// List configured mirrors
    List,
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

type RepoKey = (String, String, Option<String>);

/// One [`Mirror`] per `(owner, repo, branch)`, so entries that point at the
/// same repository share a client and a lock table.
struct MirrorPool {
    token: Option<String>,
    by_repo: HashMap<RepoKey, Mirror>,
}

impl MirrorPool {
    fn new(token: Option<String>) -> Self {
        Self {
            token,
            by_repo: HashMap::new(),
        }
    }

    fn get(&mut self, entry: &MirrorEntry) -> Mirror {
        let key = (entry.owner.clone(), entry.repo.clone(), entry.branch.clone());
        let token = &self.token;
        self.by_repo
            .entry(key)
            .or_insert_with(|| {
                let client = GitHubClient::new(GitHubConfig {
                    owner: entry.owner.clone(),
                    repo: entry.repo.clone(),
                    branch: entry.branch.clone(),
                    token: token.clone(),
                    api_base_url: None,
                });
                Mirror::new(Arc::new(client))
            })
            .clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.by_repo.len()
    }
}

fn selected<'a>(config: &'a AppConfig, labels: &[String]) -> Result<Vec<&'a MirrorEntry>> {
    if labels.is_empty() {
        return Ok(config.mirrors.iter().filter(|m| m.enabled).collect());
    }

    labels
        .iter()
        .map(|label| {
            config
                .mirrors
                .iter()
                .find(|m| &m.label == label)
                .ok_or_else(|| anyhow::anyhow!("no mirror labelled [{label}] in config"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let app_config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::List => {
            commands::list::run(&app_config);
            Ok(())
        }
        Command::Sync {
            mirrors,
            dry_run,
            concurrency,
        } => {
            let entries = selected(&app_config, &mirrors)?;
            if entries.is_empty() {
                anyhow::bail!("no enabled mirrors to sync");
            }

            let mut pool = MirrorPool::new(config::github_token(&app_config));
            let total = entries.len();
            let mut failed = 0usize;

            for entry in entries {
                let mirror = pool.get(entry);
                let options = commands::sync::options_for(entry, &app_config, dry_run, concurrency);

                if let Err(e) = commands::sync::run(&mirror, entry, &options).await {
                    tracing::error!(mirror = %entry.label, "{e:#}");
                    failed += 1;
                }
            }

            if failed > 0 {
                anyhow::bail!("{failed} of {total} mirrors failed to sync");
            }
            Ok(())
        }
    }
}
