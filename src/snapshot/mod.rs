//! Point-in-time item dumps written before versions are removed.
//!
//! A snapshot always contains the whole item (every language, every
//! version). Its file name records which versions were about to be removed,
//! so the removed data can be found again:
//!
//! ```text
//! <root>/<yyyy>/<M>/<d>/<item name>_<item id>/Versions_<range>
//! ```
//!
//! Dates are in the local time zone of the host.

mod file;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Local, TimeZone};
pub use file::FileSnapshotSink;
use thiserror::Error;

use crate::{models::ItemDump, range::encode_versions};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error writing {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Raw writer for serialized snapshots.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Write `dump` to `path`, replacing any existing file.
    async fn write(&self, path: &Path, dump: &ItemDump) -> SnapshotResult<()>;
}

/// Build the snapshot path for an item and a set of version numbers.
///
/// Month and day are not zero-padded. The item name is reduced to a single
/// path component, see [`item_folder_name`].
pub fn snapshot_path<Tz: TimeZone>(
    root: &Path,
    date: DateTime<Tz>,
    dump: &ItemDump,
    versions: &[u32],
) -> PathBuf {
    root.join(date.year().to_string())
        .join(date.month().to_string())
        .join(date.day().to_string())
        .join(item_folder_name(&dump.name, &dump.id.to_string()))
        .join(format!("Versions_{}", encode_versions(versions)))
}

/// `<name>_<id>` with separators, drive markers and control characters in
/// the name replaced by `_`.
///
/// The id suffix keeps the result from ever being `.` or `..`.
pub fn item_folder_name(name: &str, id: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}_{}", name, id)
}

/// Writes item dumps under a serialization root.
pub struct SnapshotWriter {
    default_root: PathBuf,
    sink: Arc<dyn SnapshotSink>,
}

impl SnapshotWriter {
    pub fn new(default_root: impl Into<PathBuf>, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            default_root: default_root.into(),
            sink,
        }
    }

    /// Serialize `dump` once for the given versions, under `root` if given
    /// and the configured root otherwise. Returns the written path.
    pub async fn serialize_item_versions(
        &self,
        root: Option<&Path>,
        dump: &ItemDump,
        versions: &[u32],
    ) -> SnapshotResult<PathBuf> {
        let root = root.unwrap_or(&self.default_root);
        let path = snapshot_path(root, Local::now(), dump, versions);

        tracing::info!(
            item_path = %dump.path,
            snapshot = %path.display(),
            "Serializing item"
        );
        self.sink.write(&path, dump).await?;
        Ok(path)
    }
}
