//! Directory listing DTOs.
//!
//! - `TreeEntry`: Single file/directory in a listing (file tree sidebar)
//! - `EntryType`: Provider-reported entry kind
//!
//! Listings are always presented directories-first, then by name with a
//! case-sensitive comparison; `sort_entries` is the one place that ordering
//! lives.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub size: Option<u64>,
    pub sha: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    #[serde(rename = "dir")]
    Directory,
    File,
    Symlink,
    Submodule,
}

/// Sort: directories first, then everything else, by name (case-sensitive).
pub fn sort_entries(entries: &mut [TreeEntry]) {
    entries.sort_by(|a, b| match (a.is_dir(), b.is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, entry_type: EntryType) -> TreeEntry {
        TreeEntry {
            name: name.to_string(),
            path: name.to_string(),
            entry_type,
            size: None,
            sha: format!("sha-{}", name),
            download_url: None,
        }
    }

    #[test]
    fn directories_sort_before_files() {
        let mut entries = vec![
            entry("b", EntryType::File),
            entry("a", EntryType::Directory),
            entry("a", EntryType::File),
        ];
        sort_entries(&mut entries);

        let order: Vec<(EntryType, &str)> =
            entries.iter().map(|e| (e.entry_type, e.name.as_str())).collect();
        assert_eq!(
            order,
            vec![
                (EntryType::Directory, "a"),
                (EntryType::File, "a"),
                (EntryType::File, "b"),
            ]
        );
    }

    #[test]
    fn name_comparison_is_case_sensitive() {
        let mut entries = vec![entry("b", EntryType::File), entry("Z", EntryType::File)];
        sort_entries(&mut entries);
        assert_eq!(entries[0].name, "Z");
    }

    #[test]
    fn provider_type_names_deserialize() {
        let json = r#"{"name":"src","path":"src","type":"dir","size":0,"sha":"abc","download_url":null}"#;
        let parsed: TreeEntry = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.entry_type, EntryType::Directory);
    }
}
