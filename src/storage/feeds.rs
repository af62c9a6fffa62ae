/// Feed file store
///
/// A feed lives at `{base}/{name}/latest.jsonl`, one document per line,
/// newest first. The name is either a query content hash, an operator-chosen
/// feedname, or a raw DID; DID names carry `/` separators and land in nested
/// directories.
use crate::error::{BroadcasterError, BroadcasterResult};
use std::path::PathBuf;
use tokio::fs;

#[derive(Clone)]
pub struct FeedStore {
    base_path: PathBuf,
}

impl FeedStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Replace a feed's contents with the given documents.
    pub async fn write(&self, name: &str, documents: &[serde_json::Value]) -> BroadcasterResult<()> {
        let path = self.feed_path(name)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut lines = String::new();
        for document in documents {
            let line = serde_json::to_string(document).map_err(|e| {
                BroadcasterError::Internal(format!("Failed to serialize feed document: {}", e))
            })?;
            lines.push_str(&line);
            lines.push('\n');
        }

        fs::write(&path, lines).await?;

        Ok(())
    }

    /// Read a feed back as parsed documents; `None` if it was never built.
    pub async fn read(&self, name: &str) -> BroadcasterResult<Option<Vec<serde_json::Value>>> {
        let path = self.feed_path(name)?;

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut documents = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let document = serde_json::from_str(line).map_err(|e| {
                BroadcasterError::Internal(format!("Corrupt feed entry in '{}': {}", name, e))
            })?;
            documents.push(document);
        }

        Ok(Some(documents))
    }

    /// Resolve a feed name to its `latest.jsonl` path.
    ///
    /// Names may contain `/` (DID-derived feeds), but every segment must be
    /// a plain directory name; dot segments would escape the feed root.
    fn feed_path(&self, name: &str) -> BroadcasterResult<PathBuf> {
        let segments: Vec<&str> = name.split('/').filter(|s| !s.is_empty()).collect();

        if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
            return Err(BroadcasterError::Validation(format!(
                "Feed name '{}' is not a valid storage location",
                name
            )));
        }

        let mut path = self.base_path.clone();
        for segment in segments {
            path.push(segment);
        }
        path.push("latest.jsonl");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path().to_path_buf());

        let documents = vec![json!({"infoHash": "a"}), json!({"infoHash": "b"})];
        store.write("abc123", &documents).await.unwrap();

        let read_back = store.read("abc123").await.unwrap().unwrap();
        assert_eq!(read_back, documents);
    }

    #[tokio::test]
    async fn test_read_missing_feed_is_none() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path().to_path_buf());

        assert!(store.read("never-built").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path().to_path_buf());

        store.write("feed", &[json!({"v": 1}), json!({"v": 2})]).await.unwrap();
        store.write("feed", &[json!({"v": 3})]).await.unwrap();

        let read_back = store.read("feed").await.unwrap().unwrap();
        assert_eq!(read_back, vec![json!({"v": 3})]);
    }

    #[tokio::test]
    async fn test_did_name_lands_in_nested_directory() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path().to_path_buf());

        store
            .write("did:psqr:example.com/u/alice", &[json!({"v": 1})])
            .await
            .unwrap();

        let expected = dir
            .path()
            .join("did:psqr:example.com")
            .join("u")
            .join("alice")
            .join("latest.jsonl");
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn test_dot_segments_are_rejected() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path().to_path_buf());

        let result = store.write("../escape", &[]).await;
        assert!(matches!(result, Err(BroadcasterError::Validation(_))));
    }

    #[tokio::test]
    async fn test_empty_feed_writes_empty_file() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path().to_path_buf());

        store.write("empty", &[]).await.unwrap();

        // an empty feed is a present, zero-line file, not a miss
        assert_eq!(store.read("empty").await.unwrap().unwrap(), Vec::<serde_json::Value>::new());
    }
}
