use futures::future::try_join_all;

use crate::remote::{ContentId, DirectoryEntry, RemoteError, RemoteRepository, TreeEntry};

/// A remote file scheduled for mirroring during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Forward-slash path relative to the synced base path.
    pub relative_path: String,
    pub content_id: ContentId,
}

/// Trim leading and trailing slashes. An empty result means the repository root.
pub fn normalize_base_path(base_path: &str) -> &str {
    base_path.trim_matches('/')
}

/// Strip `base/` from a full repository path.
fn strip_base<'a>(base: &str, full_path: &'a str) -> &'a str {
    if base.is_empty() {
        return full_path;
    }

    full_path
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(full_path)
}

/// Flatten the remote subtree under `base_path` into a list of files.
///
/// The base directory is listed once; each immediate subdirectory is then
/// expanded with a single recursive tree fetch, all of them concurrently.
/// Any failure aborts the whole collection.
pub async fn collect<R>(repo: &R, base_path: &str) -> Result<Vec<RemoteFile>, RemoteError>
where
    R: RemoteRepository + ?Sized,
{
    let base = normalize_base_path(base_path);
    let entries = repo.list_directory(base).await?;

    let mut files = Vec::new();
    let mut directories = Vec::new();

    for entry in entries {
        match entry {
            DirectoryEntry::File { path, content_id } => files.push(RemoteFile {
                relative_path: strip_base(base, &path).to_owned(),
                content_id,
            }),
            DirectoryEntry::Directory { path, content_id } => {
                directories.push((strip_base(base, &path).to_owned(), content_id));
            }
            DirectoryEntry::Other { path, kind } => {
                tracing::debug!(%path, %kind, "skipping unsupported remote entry");
            }
        }
    }

    let subtrees = try_join_all(directories.iter().map(|(dir, id)| async move {
        let tree = repo.get_subtree(id).await?;
        Ok::<_, RemoteError>((dir, tree))
    }))
    .await?;

    for (dir, tree) in subtrees {
        files.extend(tree.into_iter().filter_map(|node| match node {
            TreeEntry::Blob { path, content_id } => Some(RemoteFile {
                relative_path: format!("{dir}/{path}"),
                content_id,
            }),
            TreeEntry::Tree { .. } | TreeEntry::Commit { .. } => None,
        }));
    }

    tracing::debug!(
        base_path = base,
        directories = directories.len(),
        count = files.len(),
        "collected remote tree"
    );

    Ok(files)
}
