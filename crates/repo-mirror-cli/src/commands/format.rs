use repo_mirror::SyncResult;

use crate::config::MirrorEntry;

/// Lines describing one finished sync, in `added`, `updated`, `deleted` order.
pub fn result_lines(label: &str, result: &SyncResult) -> Vec<String> {
    let removed_verb = if result.is_dry_run() { "stale" } else { "deleted" };
    let mut lines = Vec::new();

    for path in result.added() {
        lines.push(format!("  added    {}", path.display()));
    }
    for path in result.updated() {
        lines.push(format!("  updated  {}", path.display()));
    }
    for path in result.deleted() {
        lines.push(format!("  {removed_verb:<8} {}", path.display()));
    }

    lines.push(format!(
        "[{label}] {} added, {} updated, {} {removed_verb}",
        result.added().len(),
        result.updated().len(),
        result.deleted().len(),
    ));

    lines
}

pub fn print_result(label: &str, result: &SyncResult) {
    for line in result_lines(label, result) {
        println!("{line}");
    }
}

pub fn mirror_line(entry: &MirrorEntry) -> String {
    let branch = entry.branch.as_deref().unwrap_or("default branch");
    let state = if entry.enabled { "" } else { " (disabled)" };
    format!(
        "{:<12} {}/{}:{} @ {} -> {}{}",
        entry.label,
        entry.owner,
        entry.repo,
        entry.remote_path,
        branch,
        entry.resolved_local_path().display(),
        state,
    )
}
