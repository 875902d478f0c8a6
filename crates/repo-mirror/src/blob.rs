use base64::Engine;

use crate::remote::{Blob, ContentId, RemoteError, RemoteRepository};

/// Fetch a blob and return its raw bytes.
pub async fn fetch_content<R>(repo: &R, id: &ContentId) -> Result<Vec<u8>, RemoteError>
where
    R: RemoteRepository + ?Sized,
{
    let blob = repo.get_blob(id).await?;
    decode(blob)
}

/// Decode a blob into the bytes it stands for. Content is not required to
/// be UTF-8, so images and other binary files mirror unchanged.
pub fn decode(blob: Blob) -> Result<Vec<u8>, RemoteError> {
    match blob {
        Blob::Text(text) => Ok(text.into_bytes()),
        Blob::Base64(encoded) => {
            // GitHub returns base64 with newlines embedded
            let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

            base64::engine::general_purpose::STANDARD
                .decode(&cleaned)
                .map_err(|e| RemoteError::Decode(format!("base64 decode failed: {e}")))
        }
    }
}
