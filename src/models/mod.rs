//! Data models for obsidian-mcp.
//!
//! Front-matter properties, vault listings, search hits and tag snapshots.

mod properties;
mod tags;
mod vault;

pub use properties::{Properties, PropertyResult, STATUS_VALUES, json_type_name};
pub use tags::{TagIndex, TagInfo, TagMetadata, TagSnapshot};
pub use vault::{EntryKind, FileEntry, JsonSearchHit, MatchSpan, SearchHit, SearchMatch};
