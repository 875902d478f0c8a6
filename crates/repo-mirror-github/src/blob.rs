use serde::Deserialize;

/// Response from GitHub's Git Blobs API.
/// `GET /repos/{owner}/{repo}/git/blobs/{sha}`
#[derive(Debug, Deserialize)]
pub struct BlobResponse {
    pub sha: String,
    pub content: String,
    /// `base64` or `utf-8`.
    pub encoding: String,
    #[serde(default)]
    pub size: u64,
}
