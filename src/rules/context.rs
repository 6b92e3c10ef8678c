use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Item, ItemVersion, VersionRef};

/// Parameter keys read and written by the pruning rules.
pub mod keys {
    pub const ITEM_VALID_FOR_VERSION_REMOVAL: &str = "ItemValidForVersionRemoval";
    pub const MARK_VERSION_FOR_REMOVAL: &str = "MarkVersionForRemoval";
    pub const ARCHIVE_THIS_VERSION: &str = "ArchiveThisVersion";
    pub const SERIALIZE_THIS_VERSION: &str = "SerializeThisVersion";
    pub const ARCHIVE_REMOVED_VERSIONS: &str = "ArchiveRemovedVersions";
    pub const ARCHIVE_NAME: &str = "ArchiveName";
    pub const SERIALIZE_REMOVED_VERSIONS: &str = "SerializeRemovedVersions";
    pub const SERIALIZE_ROOT_FOLDER: &str = "SerializeRootFolder";
    /// Input: the latest valid version of the item under test.
    pub const CURRENT_VERSION: &str = "currentversion";
}

/// A value stored in the rule parameter bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Text(String),
    Version(VersionRef),
}

impl ParamValue {
    /// Whether the value counts as a raised flag.
    ///
    /// Rules raise flags by setting a key; an explicit `false` or empty
    /// text clears it again.
    pub fn is_set(&self) -> bool {
        match self {
            ParamValue::Bool(b) => *b,
            ParamValue::Text(s) => !s.is_empty(),
            ParamValue::Version(_) => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn as_version(&self) -> Option<&VersionRef> {
        match self {
            ParamValue::Version(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<VersionRef> for ParamValue {
    fn from(value: VersionRef) -> Self {
        ParamValue::Version(value)
    }
}

/// What a rule list is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// An item, evaluated by the item filter.
    Item(&'a Item),
    /// One version of an item, evaluated by the version filter.
    Version {
        item: &'a Item,
        version: &'a ItemVersion,
    },
}

impl<'a> Subject<'a> {
    pub fn item(&self) -> &'a Item {
        match self {
            Subject::Item(item) => item,
            Subject::Version { item, .. } => item,
        }
    }

    pub fn version(&self) -> Option<&'a ItemVersion> {
        match self {
            Subject::Item(_) => None,
            Subject::Version { version, .. } => Some(version),
        }
    }
}

/// Per-evaluation rule context: the subject plus a mutable parameter bag.
///
/// A fresh context is built for each item and for each version under test
/// and dropped once the rule list has run.
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    pub subject: Subject<'a>,
    pub parameters: HashMap<String, ParamValue>,
}

impl<'a> RuleContext<'a> {
    pub fn for_item(item: &'a Item) -> Self {
        Self {
            subject: Subject::Item(item),
            parameters: HashMap::new(),
        }
    }

    /// Context for a version under test, carrying the latest valid version
    /// as `currentversion`.
    pub fn for_version(item: &'a Item, version: &'a ItemVersion, current: &ItemVersion) -> Self {
        let mut parameters = HashMap::new();
        parameters.insert(
            keys::CURRENT_VERSION.to_string(),
            ParamValue::Version(current.version_ref()),
        );
        Self {
            subject: Subject::Version { item, version },
            parameters,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.parameters.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(ParamValue::is_set)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_text)
    }
}
