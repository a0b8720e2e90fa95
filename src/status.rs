//! Normalized file status as consumed by the presentation layer.
use serde::{Deserialize, Serialize};

use crate::StatusEntry;

/// One path's state relative to the repository. Derived on every status
/// query and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcsFileStatus {
    pub file_name: String,
    pub is_new: bool,
    pub is_modified: bool,
    pub is_deleted: bool,
    pub is_renamed: bool,
    pub is_ignored: bool,
    /// Raw backend bitfield
    pub status: u32,
}

impl VcsFileStatus {
    /// Short label for display; renamed wins over modified.
    pub fn label(&self) -> &'static str {
        if self.is_ignored {
            "ignored"
        } else if self.is_new {
            "new"
        } else if self.is_deleted {
            "deleted"
        } else if self.is_renamed {
            "renamed"
        } else if self.is_modified {
            "modified"
        } else {
            "unchanged"
        }
    }
}

/// Maps one status entry; every predicate is read independently.
pub fn classify<E: StatusEntry + ?Sized>(entry: &E) -> VcsFileStatus {
    VcsFileStatus {
        file_name: entry.path().to_string(),
        is_new: entry.is_new(),
        is_modified: entry.is_modified(),
        is_deleted: entry.is_deleted(),
        is_renamed: entry.is_renamed(),
        is_ignored: entry.is_ignored(),
        status: entry.status_bits(),
    }
}

pub fn classify_all<E: StatusEntry>(entries: &[E]) -> Vec<VcsFileStatus> {
    entries.iter().map(classify::<E>).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeEntry {
        path: String,
        bits: u32,
        new: bool,
        modified: bool,
        deleted: bool,
        renamed: bool,
        ignored: bool,
    }

    impl StatusEntry for FakeEntry {
        fn path(&self) -> &str {
            &self.path
        }
        fn status_bits(&self) -> u32 {
            self.bits
        }
        fn is_new(&self) -> bool {
            self.new
        }
        fn is_modified(&self) -> bool {
            self.modified
        }
        fn is_deleted(&self) -> bool {
            self.deleted
        }
        fn is_renamed(&self) -> bool {
            self.renamed
        }
        fn is_ignored(&self) -> bool {
            self.ignored
        }
    }

    #[test]
    fn new_entry_only_sets_new() {
        let entry = FakeEntry {
            path: "notes/a.gd/meta.json".into(),
            bits: 0b1000_0000,
            new: true,
            ..Default::default()
        };

        let status = classify(&entry);

        assert_eq!(status.file_name, "notes/a.gd/meta.json");
        assert!(status.is_new);
        assert!(!status.is_modified);
        assert!(!status.is_deleted);
        assert!(!status.is_renamed);
        assert!(!status.is_ignored);
        assert_eq!(status.status, 0b1000_0000);
        assert_eq!(status.label(), "new");
    }

    #[test]
    fn predicates_are_independent() {
        let entry = FakeEntry {
            path: "x".into(),
            renamed: true,
            modified: true,
            ..Default::default()
        };
        let status = classify(&entry);
        assert!(status.is_renamed && status.is_modified);
        assert_eq!(status.label(), "renamed");
    }

    #[test]
    fn serializes_camel_case() {
        let status = classify(&FakeEntry {
            path: "x".into(),
            ignored: true,
            ..Default::default()
        });
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["isIgnored"], true);
        assert_eq!(json["fileName"], "x");
    }

    #[test]
    fn classifies_git_entries() {
        let entries = vec![crate::GitStatusEntry {
            path: "deleted.txt".into(),
            status: git2::Status::WT_DELETED,
        }];
        let statuses = classify_all(&entries);
        assert!(statuses[0].is_deleted);
        assert_eq!(statuses[0].status, git2::Status::WT_DELETED.bits());
    }
}
