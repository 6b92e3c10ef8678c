use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node in the content hierarchy.
///
/// Items are owned by the content store; the pruner only holds them for the
/// duration of a run. The parent is a relation, never an owned value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier of the item
    pub id: Uuid,
    /// Item name (last path segment)
    pub name: String,
    /// Parent item, `None` for a hierarchy root
    pub parent_id: Option<Uuid>,
    /// Full path from the hierarchy root, e.g. `/sitecore/content/home`
    pub path: String,
    /// Template the item was created from
    pub template_id: Uuid,
    /// Branch/master the item was created from, if any
    pub master_id: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Item {
    /// Path of a direct child with the given name.
    pub fn child_path(&self, child_name: &str) -> String {
        if self.path.ends_with('/') {
            format!("{}{}", self.path, child_name)
        } else {
            format!("{}/{}", self.path, child_name)
        }
    }
}

/// Well-known field ids that carry publishing restrictions.
pub mod publishing_fields {
    use uuid::Uuid;

    /// `__Valid from`
    pub const VALID_FROM: Uuid = Uuid::from_u128(0xc8f93afe_bfd4_4e8f_9c61_152559854661);
    /// `__Valid to`
    pub const VALID_TO: Uuid = Uuid::from_u128(0x4c346442_e859_4efd_89b2_44aedf467d21);
    /// `__Hide version`
    pub const HIDE_VERSION: Uuid = Uuid::from_u128(0xb8f42732_9cb8_478d_ae95_07e25345fb0f);
}

/// Publishing restrictions of a single version.
///
/// A version is valid at an instant when it is not hidden and the instant
/// lies inside `[valid_from, valid_to)`. Missing bounds are open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishingWindow {
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub hidden: bool,
}

impl PublishingWindow {
    /// Read the window from a version's raw field values.
    ///
    /// Dates are accepted as RFC 3339 or in the compact `yyyyMMddTHHmmssZ`
    /// form; unparseable or empty values leave the bound open.
    pub fn from_fields(fields: &BTreeMap<Uuid, String>) -> Self {
        Self {
            valid_from: fields
                .get(&publishing_fields::VALID_FROM)
                .and_then(|v| parse_field_date(v)),
            valid_to: fields
                .get(&publishing_fields::VALID_TO)
                .and_then(|v| parse_field_date(v)),
            hidden: fields
                .get(&publishing_fields::HIDE_VERSION)
                .is_some_and(|v| v.trim() == "1"),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.hidden {
            return false;
        }
        if let Some(from) = self.valid_from
            && now < from
        {
            return false;
        }
        if let Some(to) = self.valid_to
            && now >= to
        {
            return false;
        }
        true
    }
}

fn parse_field_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ")
        .ok()
        .map(|naive| naive.and_utc())
}

/// One version of an item in one language.
///
/// Version numbers increase strictly per language but are not contiguous
/// once earlier versions have been pruned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemVersion {
    pub item_id: Uuid,
    /// Language code, e.g. `en` or `da-DK`
    pub language: String,
    /// Version number, starting at 1
    pub number: u32,
    pub publishing: PublishingWindow,
    /// Raw field values keyed by field id
    pub fields: BTreeMap<Uuid, String>,
}

impl ItemVersion {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.publishing.is_valid_at(now)
    }

    pub fn version_ref(&self) -> VersionRef {
        VersionRef {
            item_id: self.item_id,
            language: self.language.clone(),
            number: self.number,
        }
    }
}

/// Lightweight reference to a version, used as a rule parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRef {
    pub item_id: Uuid,
    pub language: String,
    pub number: u32,
}

/// Full point-in-time dump of an item: every language and every version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDump {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub parent_id: Option<Uuid>,
    pub template_id: Uuid,
    pub master_id: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub versions: Vec<ItemVersion>,
    /// When the dump was taken
    pub dumped_at: DateTime<Utc>,
}
