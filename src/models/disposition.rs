use serde::{Deserialize, Serialize};

/// Decided fate of a pruning candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Keep,
    Delete,
    DeleteSerialize,
    DeleteArchive,
    DeleteSerializeArchive,
}

impl Disposition {
    /// Disposition of a version selected for disposal, given whether it
    /// should be serialized and/or archived first.
    pub fn disposed(serialize: bool, archive: bool) -> Self {
        match (serialize, archive) {
            (false, false) => Disposition::Delete,
            (true, false) => Disposition::DeleteSerialize,
            (false, true) => Disposition::DeleteArchive,
            (true, true) => Disposition::DeleteSerializeArchive,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Disposition::Keep)
    }

    pub fn serializes(&self) -> bool {
        matches!(
            self,
            Disposition::DeleteSerialize | Disposition::DeleteSerializeArchive
        )
    }

    pub fn archives(&self) -> bool {
        matches!(
            self,
            Disposition::DeleteArchive | Disposition::DeleteSerializeArchive
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Keep => "keep",
            Disposition::Delete => "delete",
            Disposition::DeleteSerialize => "delete_serialize",
            Disposition::DeleteArchive => "delete_archive",
            Disposition::DeleteSerializeArchive => "delete_serialize_archive",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposed_flags() {
        assert_eq!(Disposition::disposed(false, false), Disposition::Delete);
        assert_eq!(
            Disposition::disposed(true, true),
            Disposition::DeleteSerializeArchive
        );

        let d = Disposition::disposed(true, false);
        assert!(d.serializes());
        assert!(!d.archives());
        assert!(!d.is_keep());

        assert!(Disposition::Keep.is_keep());
        assert!(!Disposition::Keep.serializes());
    }
}
