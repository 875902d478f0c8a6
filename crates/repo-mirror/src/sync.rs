use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use futures::{StreamExt, TryStreamExt, stream};
use tracing::Instrument;

use crate::blob::fetch_content;
use crate::collect::collect;
use crate::error::{SyncError, io_err};
use crate::remote::RemoteRepository;
use crate::stale::{detect_stale, remove_stale};
use crate::writer::{WriteOutcome, write_file};

/// Default number of files fetched and written at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Per-run knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Delete stale local files. When false the run is a dry-run for
    /// deletions: stale files are only reported.
    pub ok_to_delete_files: bool,
    /// Maximum fetch/write units in flight. Zero is treated as one.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            ok_to_delete_files: true,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl SyncOptions {
    pub fn dry_run() -> Self {
        Self {
            ok_to_delete_files: false,
            ..Self::default()
        }
    }
}

/// Stages of a synchronization run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Idle,
    CollectingTree,
    FetchingAndWriting,
    DetectingStale,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CollectingTree => "collecting-tree",
            Self::FetchingAndWriting => "fetching-and-writing",
            Self::DetectingStale => "detecting-stale",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Summary of a completed run. All paths are absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    added: BTreeSet<PathBuf>,
    updated: BTreeSet<PathBuf>,
    deleted: BTreeSet<PathBuf>,
    dry_run: bool,
}

impl SyncResult {
    pub fn added(&self) -> &BTreeSet<PathBuf> {
        &self.added
    }

    pub fn updated(&self) -> &BTreeSet<PathBuf> {
        &self.updated
    }

    /// Stale files. Removed from disk unless the run was a dry-run.
    pub fn deleted(&self) -> &BTreeSet<PathBuf> {
        &self.deleted
    }

    /// Same set as [`SyncResult::deleted`], named for dry-run callers.
    pub fn stale(&self) -> &BTreeSet<PathBuf> {
        &self.deleted
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// True when the run changed nothing and found nothing stale.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

fn advance(stage: &mut SyncStage, next: SyncStage) {
    tracing::debug!(from = %stage, to = %next, "sync stage");
    *stage = next;
}

/// Mirror `remote_base_path` into `local_root`.
///
/// Returns either a complete [`SyncResult`] or the first error hit. Files
/// written before a failure stay on disk.
pub async fn synchronize<R>(
    repo: &R,
    remote_base_path: &str,
    local_root: &Path,
    options: &SyncOptions,
) -> Result<SyncResult, SyncError>
where
    R: RemoteRepository + ?Sized,
{
    let local_root = std::path::absolute(local_root).map_err(|e| io_err(local_root, e))?;
    let span = tracing::info_span!(
        "sync",
        base_path = remote_base_path,
        local_root = %local_root.display(),
    );

    async {
        let mut stage = SyncStage::Idle;
        let result = run(repo, remote_base_path, &local_root, options, &mut stage).await;

        match &result {
            Ok(summary) => {
                advance(&mut stage, SyncStage::Done);
                tracing::info!(
                    added = summary.added.len(),
                    updated = summary.updated.len(),
                    deleted = summary.deleted.len(),
                    dry_run = summary.dry_run,
                    "sync complete"
                );
            }
            Err(e) => {
                tracing::warn!(stage = %stage, error = %e, "sync failed");
                advance(&mut stage, SyncStage::Failed);
            }
        }

        result
    }
    .instrument(span)
    .await
}

async fn run<R>(
    repo: &R,
    remote_base_path: &str,
    local_root: &Path,
    options: &SyncOptions,
    stage: &mut SyncStage,
) -> Result<SyncResult, SyncError>
where
    R: RemoteRepository + ?Sized,
{
    advance(stage, SyncStage::CollectingTree);
    let files = collect(repo, remote_base_path).await?;
    tracing::info!(count = files.len(), "collected remote files");

    advance(stage, SyncStage::FetchingAndWriting);
    let outcomes: Vec<(PathBuf, WriteOutcome)> = stream::iter(files)
        .map(|file| async move {
            let content = fetch_content(repo, &file.content_id).await?;
            write_file(local_root, &file.relative_path, &content).await
        })
        .buffer_unordered(options.concurrency.max(1))
        .try_collect()
        .await?;

    let mut touched = HashSet::with_capacity(outcomes.len());
    let mut added = BTreeSet::new();
    let mut updated = BTreeSet::new();

    for (path, outcome) in outcomes {
        match outcome {
            WriteOutcome::Added => {
                added.insert(path.clone());
            }
            WriteOutcome::Updated => {
                updated.insert(path.clone());
            }
            WriteOutcome::Unchanged => {}
        }
        touched.insert(path);
    }

    advance(stage, SyncStage::DetectingStale);
    let stale = detect_stale(local_root.to_path_buf(), touched).await?;

    advance(stage, SyncStage::Finalizing);
    if options.ok_to_delete_files {
        remove_stale(&stale).await?;
    } else if !stale.is_empty() {
        tracing::info!(count = stale.len(), "dry-run: leaving stale files in place");
    }

    Ok(SyncResult {
        added,
        updated,
        deleted: stale,
        dry_run: !options.ok_to_delete_files,
    })
}
