use anyhow::{Context, Result};
use repo_mirror::{DEFAULT_CONCURRENCY, Mirror, SyncOptions, SyncResult};

use crate::commands::format;
use crate::config::{AppConfig, MirrorEntry};

/// Options for one mirror. `--dry-run` overrides `delete_stale`, and
/// `--concurrency` overrides the configured value.
pub fn options_for(
    entry: &MirrorEntry,
    config: &AppConfig,
    dry_run: bool,
    concurrency: Option<usize>,
) -> SyncOptions {
    SyncOptions {
        ok_to_delete_files: entry.delete_stale && !dry_run,
        concurrency: concurrency
            .or(config.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY),
    }
}

/// Run one mirror and print what changed.
pub async fn run(mirror: &Mirror, entry: &MirrorEntry, options: &SyncOptions) -> Result<SyncResult> {
    let local = entry.resolved_local_path();

    println!(
        "Syncing [{}] {}/{}:{} into {}...",
        entry.label,
        entry.owner,
        entry.repo,
        entry.remote_path,
        local.display()
    );

    let result = mirror
        .synchronize(&entry.remote_path, &local, options)
        .await
        .with_context(|| format!("sync failed for [{}]", entry.label))?;

    format::print_result(&entry.label, &result);

    Ok(result)
}
