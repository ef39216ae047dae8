//! Shared filesystem utilities.

pub mod files;
pub mod paths;
pub mod temp;

pub use files::{disk_usage, write_file_with_dirs};
pub use paths::{ensure_parent_exists, is_within, prepare_tree_path, tree_relative};
pub use temp::reset_dir;
