use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine;

use crate::{Blob, ContentId, DirectoryEntry, RemoteError, RemoteRepository, TreeEntry};

#[derive(Default)]
struct State {
    /// Full repository path -> blob id.
    files: BTreeMap<String, ContentId>,
    blobs: HashMap<ContentId, Blob>,
    failing_blobs: BTreeSet<String>,
    next_id: usize,
}

/// In-memory remote repository for testing.
///
/// Blobs are served base64-encoded and wrapped at 60 columns the way GitHub
/// delivers them, unless inserted with [`InMemoryRepository::insert_text`].
/// Directory ids are `tree:<path>`.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
    fail_subtrees: AtomicBool,
    blob_delay: Mutex<Option<Duration>>,
    subtree_requests: AtomicUsize,
    blob_requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, served base64-encoded.
    pub fn insert(&self, path: &str, content: impl AsRef<[u8]>) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        let wrapped = encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        self.insert_blob(path, Blob::Base64(wrapped));
    }

    /// Add or replace a file, served as plain text.
    pub fn insert_text(&self, path: &str, content: &str) {
        self.insert_blob(path, Blob::Text(content.to_owned()));
    }

    fn insert_blob(&self, path: &str, blob: Blob) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = ContentId::new(format!("blob:{}", state.next_id));
        state.blobs.insert(id.clone(), blob);
        state.files.insert(path.to_owned(), id);
    }

    pub fn remove(&self, path: &str) {
        self.state.lock().unwrap().files.remove(path);
    }

    /// Make every `get_subtree` call fail.
    pub fn fail_subtrees(&self) {
        self.fail_subtrees.store(true, Ordering::SeqCst);
    }

    /// Make `get_blob` fail for the blob currently stored at `path`.
    pub fn fail_blob(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.files.get(path).cloned();
        if let Some(id) = id {
            state.failing_blobs.insert(id.as_str().to_owned());
        }
    }

    /// Delay every `get_blob` call, to make concurrency observable.
    pub fn set_blob_delay(&self, delay: Duration) {
        *self.blob_delay.lock().unwrap() = Some(delay);
    }

    pub fn subtree_requests(&self) -> usize {
        self.subtree_requests.load(Ordering::SeqCst)
    }

    pub fn blob_requests(&self) -> usize {
        self.blob_requests.load(Ordering::SeqCst)
    }

    /// Highest number of `get_blob` calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn under<'a>(dir: &str, path: &'a str) -> Option<&'a str> {
    if dir.is_empty() {
        Some(path)
    } else {
        path.strip_prefix(dir)?.strip_prefix('/')
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_owned()
    } else {
        format!("{dir}/{name}")
    }
}

#[async_trait::async_trait]
impl RemoteRepository for InMemoryRepository {
    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
        let state = self.state.lock().unwrap();
        let mut files = Vec::new();
        let mut dirs = BTreeSet::new();

        for (full, id) in &state.files {
            let Some(rest) = under(path, full) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(join(path, dir));
                }
                None => files.push(DirectoryEntry::File {
                    path: full.clone(),
                    content_id: id.clone(),
                }),
            }
        }

        if files.is_empty() && dirs.is_empty() {
            return Err(RemoteError::NotFound(path.to_owned()));
        }

        files.extend(dirs.into_iter().map(|dir| DirectoryEntry::Directory {
            content_id: ContentId::new(format!("tree:{dir}")),
            path: dir,
        }));
        Ok(files)
    }

    async fn get_subtree(&self, id: &ContentId) -> Result<Vec<TreeEntry>, RemoteError> {
        self.subtree_requests.fetch_add(1, Ordering::SeqCst);

        if self.fail_subtrees.load(Ordering::SeqCst) {
            return Err(RemoteError::Http {
                status: 500,
                body: "subtree unavailable".into(),
            });
        }

        let dir = id
            .as_str()
            .strip_prefix("tree:")
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;

        let state = self.state.lock().unwrap();
        let mut trees = BTreeSet::new();
        let mut entries = Vec::new();

        for (full, blob_id) in &state.files {
            let Some(rest) = under(dir, full) else {
                continue;
            };
            let mut prefix = String::new();
            let segments: Vec<&str> = rest.split('/').collect();
            for segment in &segments[..segments.len() - 1] {
                prefix = join(&prefix, segment);
                trees.insert(prefix.clone());
            }
            entries.push(TreeEntry::Blob {
                path: rest.to_owned(),
                content_id: blob_id.clone(),
            });
        }

        if entries.is_empty() {
            return Err(RemoteError::NotFound(id.to_string()));
        }

        entries.extend(trees.into_iter().map(|tree| TreeEntry::Tree {
            content_id: ContentId::new(format!("tree:{}", join(dir, &tree))),
            path: tree,
        }));
        Ok(entries)
    }

    async fn get_blob(&self, id: &ContentId) -> Result<Blob, RemoteError> {
        self.blob_requests.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.blob_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let state = self.state.lock().unwrap();
            if state.failing_blobs.contains(id.as_str()) {
                Err(RemoteError::Network(format!("connection reset fetching {id}")))
            } else {
                state
                    .blobs
                    .get(id)
                    .cloned()
                    .ok_or_else(|| RemoteError::NotFound(id.to_string()))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_files_and_directories() {
        let repo = InMemoryRepository::new();
        repo.insert("posts/x.md", "hello");
        repo.insert("posts/sub/y.md", "world");

        let entries = repo.list_directory("posts").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| matches!(
            e,
            DirectoryEntry::File { path, .. } if path == "posts/x.md"
        )));
        assert!(entries.iter().any(|e| matches!(
            e,
            DirectoryEntry::Directory { path, content_id } if path == "posts/sub" && content_id.as_str() == "tree:posts/sub"
        )));
    }

    #[tokio::test]
    async fn subtree_paths_are_relative_to_the_tree() {
        let repo = InMemoryRepository::new();
        repo.insert("posts/sub/deeper/z.md", "z");

        let entries = repo
            .get_subtree(&ContentId::new("tree:posts/sub"))
            .await
            .unwrap();

        assert!(entries.contains(&TreeEntry::Tree {
            path: "deeper".into(),
            content_id: ContentId::new("tree:posts/sub/deeper"),
        }));
        assert!(entries.iter().any(|e| matches!(
            e,
            TreeEntry::Blob { path, .. } if path == "deeper/z.md"
        )));
    }

    #[tokio::test]
    async fn reinserting_changes_the_content_id() {
        let repo = InMemoryRepository::new();
        repo.insert("a.md", "one");
        let first = repo.list_directory("").await.unwrap();
        repo.insert("a.md", "two");
        let second = repo.list_directory("").await.unwrap();

        assert_ne!(first, second);
    }
}
