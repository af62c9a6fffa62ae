/// Broadcast ingestion journal
///
/// Every accepted broadcast is appended to `latest.jsonl` plus four
/// time-bucketed shard files (second, minute, hour, day), so downstream
/// ingesters can tail whichever granularity suits their replay window.
use crate::error::{BroadcasterError, BroadcasterResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::{fs, io::AsyncWriteExt};

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: i64,
    #[serde(rename = "infoHash")]
    pub info_hash: String,
    pub broadcast: serde_json::Value,
}

#[derive(Clone)]
pub struct BroadcastJournal {
    base_path: PathBuf,
}

impl BroadcastJournal {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub async fn append(
        &self,
        info_hash: &str,
        broadcast: &serde_json::Value,
        at: DateTime<Utc>,
    ) -> BroadcasterResult<()> {
        let entry = JournalEntry {
            timestamp: at.timestamp(),
            info_hash: info_hash.to_string(),
            broadcast: broadcast.clone(),
        };

        let mut line = serde_json::to_string(&entry).map_err(|e| {
            BroadcasterError::Internal(format!("Failed to serialize journal entry: {}", e))
        })?;
        line.push('\n');

        fs::create_dir_all(&self.base_path).await?;

        for filename in Self::shard_names(at) {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.base_path.join(filename))
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
        }

        Ok(())
    }

    fn shard_names(at: DateTime<Utc>) -> [String; 5] {
        [
            "latest.jsonl".to_string(),
            format!("{}.jsonl", at.format("%Y-%m-%d-%H-%M-%S")),
            format!("{}.jsonl", at.format("%Y-%m-%d-%H-%M")),
            format!("{}.jsonl", at.format("%Y-%m-%d-%H")),
            format!("{}.jsonl", at.format("%Y-%m-%d")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    // 2023-11-14 22:13:20 UTC
    const FIXED_TS: i64 = 1_700_000_000;

    #[tokio::test]
    async fn test_append_writes_all_time_shards() {
        let dir = tempdir().unwrap();
        let journal = BroadcastJournal::new(dir.path().to_path_buf());
        let at = DateTime::from_timestamp(FIXED_TS, 0).unwrap();

        journal
            .append("a".repeat(40).as_str(), &json!({"title": "hello"}), at)
            .await
            .unwrap();

        for name in [
            "latest.jsonl",
            "2023-11-14-22-13-20.jsonl",
            "2023-11-14-22-13.jsonl",
            "2023-11-14-22.jsonl",
            "2023-11-14.jsonl",
        ] {
            assert!(dir.path().join(name).exists(), "missing shard {}", name);
        }
    }

    #[tokio::test]
    async fn test_entry_line_shape() {
        let dir = tempdir().unwrap();
        let journal = BroadcastJournal::new(dir.path().to_path_buf());
        let at = DateTime::from_timestamp(FIXED_TS, 0).unwrap();

        journal
            .append("ab12", &json!({"title": "hello"}), at)
            .await
            .unwrap();

        let raw = fs::read_to_string(dir.path().join("latest.jsonl")).await.unwrap();
        let entry: JournalEntry = serde_json::from_str(raw.trim()).unwrap();

        assert_eq!(entry.timestamp, FIXED_TS);
        assert_eq!(entry.info_hash, "ab12");
        assert_eq!(entry.broadcast, json!({"title": "hello"}));

        // wire names, not struct names
        assert!(raw.contains("\"infoHash\""));
    }

    #[tokio::test]
    async fn test_same_minute_appends_accumulate() {
        let dir = tempdir().unwrap();
        let journal = BroadcastJournal::new(dir.path().to_path_buf());

        let first = DateTime::from_timestamp(FIXED_TS, 0).unwrap();
        let second = DateTime::from_timestamp(FIXED_TS + 1, 0).unwrap();

        journal.append("aa", &json!({"n": 1}), first).await.unwrap();
        journal.append("bb", &json!({"n": 2}), second).await.unwrap();

        let latest = fs::read_to_string(dir.path().join("latest.jsonl")).await.unwrap();
        assert_eq!(latest.lines().count(), 2);

        let minute = fs::read_to_string(dir.path().join("2023-11-14-22-13.jsonl"))
            .await
            .unwrap();
        assert_eq!(minute.lines().count(), 2);

        assert!(dir.path().join("2023-11-14-22-13-20.jsonl").exists());
        assert!(dir.path().join("2023-11-14-22-13-21.jsonl").exists());
    }
}
