use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a remote content object (a git SHA on GitHub).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immediate child of a listed remote directory.
///
/// `path` is the full repository path (e.g. `posts/sub`), not the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEntry {
    File { path: String, content_id: ContentId },
    Directory { path: String, content_id: ContentId },
    /// Symlinks, submodules and anything else the mirror does not copy.
    Other { path: String, kind: String },
}

/// A node of a recursive tree listing. `path` is relative to the tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    Blob { path: String, content_id: ContentId },
    Tree { path: String, content_id: ContentId },
    /// Submodule pointer.
    Commit { path: String },
}

/// Raw blob content as delivered by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blob {
    Base64(String),
    Text(String),
}

/// Errors raised while talking to the remote repository.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("decode error: {0}")]
    Decode(String),

    /// The remote returned only part of a listing.
    #[error("incomplete listing: {0}")]
    Truncated(String),
}

/// Read-only access to a remote source-controlled repository.
///
/// Implementations are expected to be cheap to call concurrently; the sync
/// pipeline issues many `get_blob` calls at once.
#[async_trait::async_trait]
pub trait RemoteRepository: Send + Sync {
    /// List the immediate entries of the directory at `path`.
    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError>;

    /// Fetch the full recursive tree rooted at `id`.
    async fn get_subtree(&self, id: &ContentId) -> Result<Vec<TreeEntry>, RemoteError>;

    /// Fetch a single blob.
    async fn get_blob(&self, id: &ContentId) -> Result<Blob, RemoteError>;
}

#[async_trait::async_trait]
impl<T: RemoteRepository + ?Sized> RemoteRepository for Arc<T> {
    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
        (**self).list_directory(path).await
    }

    async fn get_subtree(&self, id: &ContentId) -> Result<Vec<TreeEntry>, RemoteError> {
        (**self).get_subtree(id).await
    }

    async fn get_blob(&self, id: &ContentId) -> Result<Blob, RemoteError> {
        (**self).get_blob(id).await
    }
}
