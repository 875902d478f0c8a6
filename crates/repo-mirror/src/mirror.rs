use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::collect::normalize_base_path;
use crate::error::{SyncError, io_err};
use crate::remote::RemoteRepository;
use crate::sync::{SyncOptions, SyncResult, synchronize};

type RunKey = (String, PathBuf);

/// A remote repository plus run-level locking.
///
/// Runs against the same `(remote_base_path, local_root)` pair are
/// serialised; runs against different pairs proceed independently. Clones
/// share the same lock table.
///
/// Locks are never evicted: the table holds one entry per distinct pair ever
/// synced, so it stays bounded by the set of configured mirrors.
#[derive(Clone)]
pub struct Mirror {
    repo: Arc<dyn RemoteRepository>,
    locks: Arc<Mutex<HashMap<RunKey, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Mirror {
    pub fn new(repo: Arc<dyn RemoteRepository>) -> Self {
        Self {
            repo,
            locks: Arc::default(),
        }
    }

    fn run_lock(&self, key: RunKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Synchronize, waiting for any in-flight run on the same pair first.
    pub async fn synchronize(
        &self,
        remote_base_path: &str,
        local_root: &Path,
        options: &SyncOptions,
    ) -> Result<SyncResult, SyncError> {
        let root = std::path::absolute(local_root).map_err(|e| io_err(local_root, e))?;
        let key = (normalize_base_path(remote_base_path).to_owned(), root);

        let lock = self.run_lock(key);
        let _guard = lock.lock().await;

        synchronize(self.repo.as_ref(), remote_base_path, local_root, options).await
    }
}
