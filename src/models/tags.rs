//! Tag index snapshot types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tag name to the set of files whose front matter carries it.
pub type TagIndex = BTreeMap<String, BTreeSet<String>>;

/// One tag with the files that carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Tag name without `#`.
    pub name: String,
    /// Number of distinct files.
    pub count: usize,
    /// Sorted file paths.
    pub files: Vec<String>,
}

/// Aggregate figures over a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMetadata {
    /// Sum of `count` across all tags.
    pub total_occurrences: usize,
    /// Number of distinct tags.
    pub unique_tags: usize,
    /// Files that contributed at least one tag.
    pub scanned_files: usize,
    /// When the index was last rebuilt (RFC 3339).
    pub last_update: String,
}

/// Read view of the tag index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSnapshot {
    /// Tags ordered by count descending, then name ascending.
    pub tags: Vec<TagInfo>,
    /// Aggregates.
    pub metadata: TagMetadata,
}

impl TagSnapshot {
    /// Builds a snapshot from an index.
    ///
    /// With `path_prefix`, only files under that prefix are counted and tags
    /// left without files are dropped.
    #[must_use]
    pub fn from_index(index: &TagIndex, last_update: String, path_prefix: Option<&str>) -> Self {
        let prefix = path_prefix
            .map(|p| p.trim_start_matches("./").trim_start_matches('/'))
            .filter(|p| !p.is_empty());

        let mut tags: Vec<TagInfo> = index
            .iter()
            .filter_map(|(name, files)| {
                let files: Vec<String> = files
                    .iter()
                    .filter(|f| prefix.is_none_or(|p| f.starts_with(p)))
                    .cloned()
                    .collect();
                (!files.is_empty()).then(|| TagInfo {
                    name: name.clone(),
                    count: files.len(),
                    files,
                })
            })
            .collect();

        let scanned_files = tags
            .iter()
            .flat_map(|t| t.files.iter().map(String::as_str))
            .collect::<BTreeSet<&str>>()
            .len();

        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

        let metadata = TagMetadata {
            total_occurrences: tags.iter().map(|t| t.count).sum(),
            unique_tags: tags.len(),
            scanned_files,
            last_update,
        };

        Self { tags, metadata }
    }
}
