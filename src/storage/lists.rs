/// List file store
///
/// A list lives at `{base}/{name}/index.jsonl` and holds the signed payload
/// exactly as published: the token payload is written verbatim so that
/// readers see the byte-for-byte content the curator signed.
use crate::error::BroadcasterResult;
use std::path::PathBuf;
use tokio::fs;

#[derive(Clone)]
pub struct ListStore {
    base_path: PathBuf,
}

impl ListStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub async fn put(&self, name: &str, payload: &str) -> BroadcasterResult<()> {
        let path = self.list_path(name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, payload).await?;

        Ok(())
    }

    pub async fn get(&self, name: &str) -> BroadcasterResult<Option<String>> {
        match fs::read_to_string(self.list_path(name)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a list file, pruning its directory if nothing else remains.
    pub async fn delete(&self, name: &str) -> BroadcasterResult<()> {
        let path = self.list_path(name);

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = path.parent() {
            let mut entries = fs::read_dir(parent).await?;
            if entries.next_entry().await?.is_none() {
                fs::remove_dir(parent).await?;
            }
        }

        Ok(())
    }

    fn list_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name).join("index.jsonl")
    }
}
