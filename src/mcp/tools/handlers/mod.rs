//! Tool execution handlers.
//!
//! One module per capability. Each handler receives arguments that already
//! passed schema validation and returns a [`super::ToolResult`].

mod files;
mod properties;
mod search;
mod tags;

pub use files::{
    execute_append_content, execute_get_file_contents, execute_list_files_in_dir,
    execute_list_files_in_vault, execute_patch_content,
};
pub use properties::{execute_get_properties, execute_update_properties};
pub use search::{execute_complex_search, execute_find_in_file};
pub use tags::execute_get_tags;
