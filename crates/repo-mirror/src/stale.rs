use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{SyncError, io_err};

/// Every file under `local_root` that is not in `touched`.
///
/// Must run after all writes of a run have completed, otherwise files added
/// in this run would be reported. A missing root has no stale files.
pub fn find_stale(
    local_root: &Path,
    touched: &HashSet<PathBuf>,
) -> Result<BTreeSet<PathBuf>, SyncError> {
    if !local_root.exists() {
        return Ok(BTreeSet::new());
    }

    let mut stale = BTreeSet::new();

    for entry in WalkDir::new(local_root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(local_root).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            io_err(&path, source)
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        if !touched.contains(entry.path()) {
            stale.insert(entry.into_path());
        }
    }

    Ok(stale)
}

/// [`find_stale`] on the blocking thread pool, so a large tree does not stall
/// the runtime's worker threads.
pub async fn detect_stale(
    local_root: PathBuf,
    touched: HashSet<PathBuf>,
) -> Result<BTreeSet<PathBuf>, SyncError> {
    let root = local_root.clone();
    tokio::task::spawn_blocking(move || find_stale(&root, &touched))
        .await
        .map_err(|e| io_err(&local_root, std::io::Error::other(e)))?
}

/// Delete each stale file. Directories left empty are kept.
pub async fn remove_stale(paths: &BTreeSet<PathBuf>) -> Result<(), SyncError> {
    for path in paths {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| io_err(path, e))?;
        tracing::debug!(path = %path.display(), "deleted stale file");
    }
    Ok(())
}
