use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row in `Archive`: groups every archived version of an item under a
/// single archive name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivalRecord {
    pub archival_id: Uuid,
    pub item_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    /// Path of the item at the time it was first archived
    pub original_location: String,
    pub archive_date: DateTime<Utc>,
    pub archived_by: String,
    pub archive_name: String,
}

/// Copy of an item's row in `Items`, stored once per item in `ArchivedItems`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedItemSnapshot {
    pub row_id: Uuid,
    pub archival_id: Uuid,
    pub item_id: Uuid,
    pub name: String,
    pub template_id: Uuid,
    pub master_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// How a field value is shared across versions and languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingType {
    /// One value per language and version
    Versioned,
    /// One value per language
    Unversioned,
    /// One value for every language and version
    Shared,
}

impl SharingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharingType::Versioned => "versioned",
            SharingType::Unversioned => "unversioned",
            SharingType::Shared => "shared",
        }
    }
}

impl std::fmt::Display for SharingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SharingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "versioned" => Ok(SharingType::Versioned),
            "unversioned" => Ok(SharingType::Unversioned),
            "shared" => Ok(SharingType::Shared),
            _ => Err(format!("Invalid sharing type: {}", s)),
        }
    }
}

/// One archived field value of one version, stored in `ArchivedFields`.
///
/// Rows are written once and never updated or deleted by the pruner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedFieldRecord {
    pub row_id: Uuid,
    pub archival_id: Uuid,
    pub sharing_type: SharingType,
    pub item_id: Uuid,
    pub language: String,
    pub version: u32,
    pub field_id: Uuid,
    pub value: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Where and as whom a batch of versions is archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTarget {
    pub archive_name: String,
    pub archived_by: String,
}

/// Result of archiving a batch of versions of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBatchResult {
    pub archival_id: Uuid,
    /// Number of versions copied
    pub versions: usize,
    /// Number of field rows written to `ArchivedFields`
    pub field_rows: u64,
    /// Whether this batch created the `ArchivedItems` row
    pub snapshot_created: bool,
}
