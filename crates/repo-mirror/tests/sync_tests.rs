use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use repo_mirror::test_support::InMemoryRepository;
use repo_mirror::{Mirror, RemoteError, SyncError, SyncOptions, synchronize};

fn set(paths: &[PathBuf]) -> BTreeSet<PathBuf> {
    paths.iter().cloned().collect()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

fn posts_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    repo.insert("posts/x.md", "hello");
    repo.insert("posts/sub/y.md", "world");
    repo
}

#[tokio::test]
async fn sync_into_empty_directory_adds_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = dir.path().join("mirror");
    let repo = posts_repo();

    let result = synchronize(&repo, "posts", &mirror, &SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(
        result.added(),
        &set(&[mirror.join("x.md"), mirror.join("sub").join("y.md")])
    );
    assert!(result.updated().is_empty());
    assert!(result.deleted().is_empty());
    assert_eq!(read(&mirror.join("x.md")), "hello");
    assert_eq!(read(&mirror.join("sub/y.md")), "world");
}

#[tokio::test]
async fn second_run_with_unchanged_remote_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let repo = posts_repo();

    synchronize(&repo, "posts", dir.path(), &SyncOptions::default())
        .await
        .unwrap();
    let second = synchronize(&repo, "posts", dir.path(), &SyncOptions::default())
        .await
        .unwrap();

    assert!(second.is_empty(), "expected no changes, got {second:?}");
}

#[tokio::test]
async fn removed_remote_file_is_deleted_locally() {
    let dir = tempfile::tempdir().unwrap();
    let repo = posts_repo();
    synchronize(&repo, "posts", dir.path(), &SyncOptions::default())
        .await
        .unwrap();

    repo.remove("posts/sub/y.md");
    let result = synchronize(&repo, "posts", dir.path(), &SyncOptions::default())
        .await
        .unwrap();

    let gone = dir.path().join("sub/y.md");
    assert_eq!(result.deleted(), &set(std::slice::from_ref(&gone)));
    assert!(!result.is_dry_run());
    assert!(!gone.exists());
    assert!(result.added().is_empty());
    assert!(result.updated().is_empty());
}

#[tokio::test]
async fn dry_run_reports_stale_files_without_deleting() {
    let dir = tempfile::tempdir().unwrap();
    let extra = dir.path().join("local-only.md");
    std::fs::write(&extra, "mine").unwrap();
    let repo = posts_repo();

    let result = synchronize(&repo, "posts", dir.path(), &SyncOptions::dry_run())
        .await
        .unwrap();

    assert!(result.is_dry_run());
    assert_eq!(result.stale(), &set(std::slice::from_ref(&extra)));
    assert_eq!(read(&extra), "mine");
    assert_eq!(result.added().len(), 2);
}

#[tokio::test]
async fn changed_remote_content_is_updated() {
    let dir = tempfile::tempdir().unwrap();
    let repo = posts_repo();
    synchronize(&repo, "posts", dir.path(), &SyncOptions::default())
        .await
        .unwrap();

    repo.insert("posts/x.md", "hello again");
    let result = synchronize(&repo, "posts", dir.path(), &SyncOptions::default())
        .await
        .unwrap();

    let changed = dir.path().join("x.md");
    assert_eq!(result.updated(), &set(std::slice::from_ref(&changed)));
    assert!(result.added().is_empty());
    assert_eq!(read(&changed), "hello again");
}

#[tokio::test]
async fn nested_paths_create_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryRepository::new();
    repo.insert("base/a/b/c.md", "deep");

    synchronize(&repo, "base", dir.path(), &SyncOptions::default())
        .await
        .unwrap();

    assert!(dir.path().join("a").is_dir());
    assert!(dir.path().join("a/b").is_dir());
    assert_eq!(read(&dir.path().join("a/b/c.md")), "deep");
}

#[tokio::test]
async fn plain_text_blobs_are_written_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryRepository::new();
    repo.insert_text("base/notes.txt", "plain ünïcode\n");

    synchronize(&repo, "base", dir.path(), &SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(read(&dir.path().join("notes.txt")), "plain ünïcode\n");
}

#[tokio::test]
async fn collection_failure_returns_error_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let repo = posts_repo();
    repo.fail_subtrees();

    let result = synchronize(&repo, "posts", dir.path(), &SyncOptions::default()).await;

    assert!(matches!(result, Err(SyncError::Remote(RemoteError::Http { status: 500, .. }))));
    assert_eq!(repo.blob_requests(), 0);
    assert!(!dir.path().join("x.md").exists());
}

#[tokio::test]
async fn blob_failure_fails_the_run_without_deleting() {
    let dir = tempfile::tempdir().unwrap();
    let local_only = dir.path().join("local-only.md");
    std::fs::write(&local_only, "mine").unwrap();

    let repo = posts_repo();
    repo.fail_blob("posts/sub/y.md");

    let result = synchronize(&repo, "posts", dir.path(), &SyncOptions::default()).await;

    assert!(matches!(result, Err(SyncError::Remote(RemoteError::Network(_)))));
    // Stale detection never ran.
    assert!(local_only.exists());
}

#[tokio::test]
async fn files_written_before_a_failure_stay_written() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.md");
    std::fs::write(&first, "old").unwrap();

    let repo = InMemoryRepository::new();
    repo.insert("base/a.md", "new");
    repo.insert("base/b.md", "unreachable");
    repo.fail_blob("base/b.md");

    // One at a time, in listing order: a.md completes before b.md fails.
    let options = SyncOptions {
        concurrency: 1,
        ..SyncOptions::default()
    };
    let result = synchronize(&repo, "base", dir.path(), &options).await;

    assert!(matches!(result, Err(SyncError::Remote(RemoteError::Network(_)))));
    assert_eq!(read(&first), "new");
    assert!(!dir.path().join("b.md").exists());
}

#[tokio::test]
async fn binary_blobs_are_mirrored_byte_for_byte() {
    let png_header: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryRepository::new();
    repo.insert("base/x.md", "hello");
    repo.insert("base/img/logo.png", png_header);

    let result = synchronize(&repo, "base", dir.path(), &SyncOptions::default())
        .await
        .unwrap();

    let image = dir.path().join("img/logo.png");
    assert_eq!(result.added(), &set(&[dir.path().join("x.md"), image.clone()]));
    assert_eq!(std::fs::read(&image).unwrap(), png_header);
    assert_eq!(read(&dir.path().join("x.md")), "hello");

    let again = synchronize(&repo, "base", dir.path(), &SyncOptions::default())
        .await
        .unwrap();
    assert!(again.is_empty(), "expected no changes, got {again:?}");
}

#[tokio::test]
async fn concurrency_cap_bounds_in_flight_fetches() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryRepository::new();
    for i in 0..12 {
        repo.insert(&format!("base/file-{i}.md"), &format!("content {i}"));
    }
    repo.set_blob_delay(std::time::Duration::from_millis(5));

    let options = SyncOptions {
        concurrency: 3,
        ..SyncOptions::default()
    };
    let result = synchronize(&repo, "base", dir.path(), &options).await.unwrap();

    assert_eq!(result.added().len(), 12);
    assert!(repo.max_in_flight() <= 3);
    assert!(repo.max_in_flight() > 1);
}

#[tokio::test]
async fn mirror_scenario_add_then_remove() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("mirror");
    let repo = Arc::new(posts_repo());
    let mirror = Mirror::new(repo.clone());

    let first = mirror
        .synchronize("posts", &root, &SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(
        first.added(),
        &set(&[root.join("x.md"), root.join("sub/y.md")])
    );

    repo.remove("posts/sub/y.md");
    let second = mirror
        .synchronize("posts", &root, &SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(second.deleted(), &set(&[root.join("sub/y.md")]));
    assert!(!root.join("sub/y.md").exists());
    assert_eq!(read(&root.join("x.md")), "hello");
}
