use serde::de::DeserializeOwned;

use repo_mirror::{Blob, ContentId, DirectoryEntry, RemoteError, RemoteRepository, TreeEntry};

use crate::blob::BlobResponse;
use crate::content::{ContentListing, ContentItem};
use crate::tree::TreeResponse;

/// Connection settings for one GitHub repository.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    /// Branch, tag or commit used for directory listings. `None` means the
    /// repository's default branch.
    pub branch: Option<String>,
    pub token: Option<String>,
    pub api_base_url: Option<String>,
}

/// REST client for the parts of the GitHub API the mirror needs.
pub struct GitHubClient {
    config: GitHubConfig,
    client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_base(&self) -> &str {
        self.config
            .api_base_url
            .as_deref()
            .unwrap_or("https://api.github.com")
            .trim_end_matches('/')
    }

    fn repo_url(&self, rest: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base(),
            self.config.owner,
            self.config.repo,
            rest,
        )
    }

    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .get(url)
            .header("User-Agent", "repo-mirror")
            .header("Accept", "application/vnd.github+json");

        if let Some(token) = &self.config.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        req
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, RemoteError> {
        tracing::trace!(%url, "GET");

        let response = self
            .build_request(url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 404 {
            return Err(RemoteError::NotFound(what.to_owned()));
        }

        if !status.is_success() {
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".into()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(format!("{what}: {e}")))
    }
}

fn directory_entry(item: ContentItem) -> DirectoryEntry {
    match item.item_type.as_str() {
        "file" => DirectoryEntry::File {
            path: item.path,
            content_id: ContentId::new(item.sha),
        },
        "dir" => DirectoryEntry::Directory {
            path: item.path,
            content_id: ContentId::new(item.sha),
        },
        _ => DirectoryEntry::Other {
            path: item.path,
            kind: item.item_type,
        },
    }
}

#[async_trait::async_trait]
impl RemoteRepository for GitHubClient {
    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
        let mut url = if path.is_empty() {
            self.repo_url("contents")
        } else {
            self.repo_url(&format!("contents/{path}"))
        };

        if let Some(branch) = &self.config.branch {
            url.push_str(&format!("?ref={branch}"));
        }

        let listing: ContentListing = self.get_json(&url, &format!("contents of '{path}'")).await?;

        match listing {
            ContentListing::Directory(items) => Ok(items.into_iter().map(directory_entry).collect()),
            ContentListing::Single(item) => Err(RemoteError::Parse(format!(
                "'{}' is a {}, not a directory",
                item.path, item.item_type
            ))),
        }
    }

    async fn get_subtree(&self, id: &ContentId) -> Result<Vec<TreeEntry>, RemoteError> {
        let url = self.repo_url(&format!("git/trees/{id}?recursive=1"));
        let response: TreeResponse = self.get_json(&url, &format!("tree {id}")).await?;

        // A partial tree would make every omitted file look stale.
        if response.truncated {
            tracing::warn!(
                tree = %response.sha,
                owner = %self.config.owner,
                repo = %self.config.repo,
                "tree response was truncated"
            );
            return Err(RemoteError::Truncated(format!(
                "tree {} has more entries than the API returns in one response",
                response.sha
            )));
        }

        Ok(response
            .tree
            .into_iter()
            .map(|item| match item.entry_type.as_str() {
                "blob" => TreeEntry::Blob {
                    path: item.path,
                    content_id: ContentId::new(item.sha),
                },
                "tree" => TreeEntry::Tree {
                    path: item.path,
                    content_id: ContentId::new(item.sha),
                },
                _ => TreeEntry::Commit { path: item.path },
            })
            .collect())
    }

    async fn get_blob(&self, id: &ContentId) -> Result<Blob, RemoteError> {
        let url = self.repo_url(&format!("git/blobs/{id}"));
        let response: BlobResponse = self.get_json(&url, &format!("blob {id}")).await?;

        tracing::trace!(blob = %response.sha, size = response.size, "fetched blob");

        Ok(match response.encoding.as_str() {
            "base64" => Blob::Base64(response.content),
            _ => Blob::Text(response.content),
        })
    }
}
