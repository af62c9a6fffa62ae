/// Search result page cache
///
/// Each computed page of search results is written once to
/// `{base}/{hash}.json` under the content hash of (query + page number) and
/// read back verbatim on later requests. Entries are never revalidated;
/// overwriting an existing page is last-write-wins.
use crate::error::{BroadcasterError, BroadcasterResult};
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[derive(Clone)]
pub struct PageStore {
    base_path: PathBuf,
}

impl PageStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Fetch a cached page; `None` when the hash was never written.
    pub async fn get_page<T: DeserializeOwned>(&self, hash: &str) -> BroadcasterResult<Option<T>> {
        let path = match self.page_path(hash) {
            Some(path) => path,
            None => return Ok(None),
        };

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(page) => Ok(Some(page)),
            // unreadable entry: drop it and report a miss
            Err(_) => {
                let _ = fs::remove_file(&path).await;
                Ok(None)
            }
        }
    }

    /// Store a page under its hash, overwriting unconditionally.
    pub async fn put_page<T: Serialize>(&self, hash: &str, page: &T) -> BroadcasterResult<()> {
        let path = match self.page_path(hash) {
            Some(path) => path,
            None => return Ok(()),
        };

        let body = serde_json::to_vec(page).map_err(|e| {
            BroadcasterError::Internal(format!("Failed to serialize search page: {}", e))
        })?;

        fs::create_dir_all(&self.base_path).await?;
        fs::write(&path, body).await?;

        Ok(())
    }

    /// Hashes come straight from request paths; anything that is not a
    /// plain filename is treated as an unknown hash rather than a path.
    fn page_path(&self, hash: &str) -> Option<PathBuf> {
        if hash.is_empty()
            || hash == "."
            || hash == ".."
            || hash.contains('/')
            || hash.contains('\\')
        {
            return None;
        }

        Some(self.base_path.join(format!("{}.json", hash)))
    }
}
