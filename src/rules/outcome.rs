//! Typed views over the parameter bag a rule list leaves behind.

use super::{RuleContext, keys};

/// What the item filter decided about one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilterOutcome {
    pub valid_for_version_removal: bool,
    pub archive_removed_versions: bool,
    pub archive_name: Option<String>,
    pub serialize_removed_versions: bool,
    pub serialize_root_folder: Option<String>,
}

impl ItemFilterOutcome {
    pub fn from_context(ctx: &RuleContext<'_>) -> Self {
        Self {
            valid_for_version_removal: ctx.flag(keys::ITEM_VALID_FOR_VERSION_REMOVAL),
            archive_removed_versions: ctx.flag(keys::ARCHIVE_REMOVED_VERSIONS),
            archive_name: ctx.text(keys::ARCHIVE_NAME).map(str::to_string),
            serialize_removed_versions: ctx.flag(keys::SERIALIZE_REMOVED_VERSIONS),
            serialize_root_folder: ctx.text(keys::SERIALIZE_ROOT_FOLDER).map(str::to_string),
        }
    }
}

/// What the version filter decided about one candidate version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionFilterOutcome {
    pub mark_for_removal: bool,
    pub archive: bool,
    pub serialize: bool,
    pub serialize_root_folder: Option<String>,
}

impl VersionFilterOutcome {
    pub fn from_context(ctx: &RuleContext<'_>) -> Self {
        Self {
            mark_for_removal: ctx.flag(keys::MARK_VERSION_FOR_REMOVAL),
            archive: ctx.flag(keys::ARCHIVE_THIS_VERSION),
            serialize: ctx.flag(keys::SERIALIZE_THIS_VERSION),
            serialize_root_folder: ctx.text(keys::SERIALIZE_ROOT_FOLDER).map(str::to_string),
        }
    }
}
