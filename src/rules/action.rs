use serde::{Deserialize, Serialize};

use super::{ParamValue, RuleContext, keys};

/// Action half of a rule: what happens to the parameter bag when the
/// rule's condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    ItemValidForVersionRemoval,
    MarkVersionForRemoval,
    ArchiveThisVersion,
    SerializeThisVersion {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        root_folder: Option<String>,
    },
    ArchiveRemovedVersions {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        archive_name: Option<String>,
    },
    SerializeRemovedVersions {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        root_folder: Option<String>,
    },
    /// Set an arbitrary parameter.
    SetParameter { key: String, value: ParamValue },
}

/// Row of the action table: the flag an action raises and, for actions
/// with an argument, the key the argument is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub id: &'static str,
    pub flag: &'static str,
    pub argument_key: Option<&'static str>,
}

pub const ACTION_TABLE: &[ActionSpec] = &[
    ActionSpec {
        id: "item_valid_for_version_removal",
        flag: keys::ITEM_VALID_FOR_VERSION_REMOVAL,
        argument_key: None,
    },
    ActionSpec {
        id: "mark_version_for_removal",
        flag: keys::MARK_VERSION_FOR_REMOVAL,
        argument_key: None,
    },
    ActionSpec {
        id: "archive_this_version",
        flag: keys::ARCHIVE_THIS_VERSION,
        argument_key: None,
    },
    ActionSpec {
        id: "serialize_this_version",
        flag: keys::SERIALIZE_THIS_VERSION,
        argument_key: Some(keys::SERIALIZE_ROOT_FOLDER),
    },
    ActionSpec {
        id: "archive_removed_versions",
        flag: keys::ARCHIVE_REMOVED_VERSIONS,
        argument_key: Some(keys::ARCHIVE_NAME),
    },
    ActionSpec {
        id: "serialize_removed_versions",
        flag: keys::SERIALIZE_REMOVED_VERSIONS,
        argument_key: Some(keys::SERIALIZE_ROOT_FOLDER),
    },
];

impl Action {
    pub fn id(&self) -> &'static str {
        match self {
            Action::ItemValidForVersionRemoval => "item_valid_for_version_removal",
            Action::MarkVersionForRemoval => "mark_version_for_removal",
            Action::ArchiveThisVersion => "archive_this_version",
            Action::SerializeThisVersion { .. } => "serialize_this_version",
            Action::ArchiveRemovedVersions { .. } => "archive_removed_versions",
            Action::SerializeRemovedVersions { .. } => "serialize_removed_versions",
            Action::SetParameter { .. } => "set_parameter",
        }
    }

    fn argument(&self) -> Option<&str> {
        match self {
            Action::SerializeThisVersion { root_folder }
            | Action::SerializeRemovedVersions { root_folder } => root_folder.as_deref(),
            Action::ArchiveRemovedVersions { archive_name } => archive_name.as_deref(),
            _ => None,
        }
    }

    pub fn spec(&self) -> Option<&'static ActionSpec> {
        let id = self.id();
        ACTION_TABLE.iter().find(|spec| spec.id == id)
    }

    /// Apply the action to the context.
    pub fn apply(&self, ctx: &mut RuleContext<'_>) {
        if let Action::SetParameter { key, value } = self {
            ctx.set(key.clone(), value.clone());
            return;
        }
        let Some(spec) = self.spec() else {
            return;
        };
        ctx.set(spec.flag, true);
        if let (Some(argument_key), Some(argument)) = (spec.argument_key, self.argument()) {
            ctx.set(argument_key, argument);
        }
    }
}
