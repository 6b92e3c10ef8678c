use std::path::Path;

use async_trait::async_trait;

use super::{SnapshotError, SnapshotResult, SnapshotSink};
use crate::models::ItemDump;

/// Writes snapshots as pretty-printed JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSnapshotSink;

#[async_trait]
impl SnapshotSink for FileSnapshotSink {
    async fn write(&self, path: &Path, dump: &ItemDump) -> SnapshotResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SnapshotError::Io(e, parent.to_path_buf()))?;
        }

        let json = serde_json::to_vec_pretty(dump)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| SnapshotError::Io(e, path.to_path_buf()))?;

        tracing::debug!(path = %path.display(), versions = dump.versions.len(), "Wrote snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn test_write_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024/3/7/home_x/Versions_1-2");
        let now = Utc::now();
        let mut dump = ItemDump {
            id: Uuid::new_v4(),
            name: "home".into(),
            path: "/home".into(),
            parent_id: None,
            template_id: Uuid::nil(),
            master_id: None,
            created: now,
            updated: now,
            versions: vec![],
            dumped_at: now,
        };

        FileSnapshotSink.write(&path, &dump).await.unwrap();
        dump.name = "renamed".into();
        FileSnapshotSink.write(&path, &dump).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: ItemDump = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.name, "renamed");
    }
}
