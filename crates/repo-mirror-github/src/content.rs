use serde::Deserialize;

/// One item of a directory listing from GitHub's Contents API.
/// `GET /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Deserialize)]
pub struct ContentItem {
    pub name: String,
    pub path: String,
    pub sha: String,
    /// `file`, `dir`, `symlink` or `submodule`.
    #[serde(rename = "type")]
    pub item_type: String,
}

/// The Contents API returns an array for directories and a single object
/// when the path names a file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContentListing {
    Directory(Vec<ContentItem>),
    Single(ContentItem),
}
