//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `build` - Build the initramfs (the default command)
//! - `show` - Display recipes, generated specs and configuration
//! - `export` - Convert a container image into an initramfs
//! - `inspect` - Print the init command of a container image
//! - `preflight` - Run preflight checks

pub mod build;
pub mod export;
pub mod inspect;
mod preflight;
pub mod show;

pub use build::cmd_build;
pub use export::cmd_export;
pub use inspect::cmd_inspect_init;
pub use preflight::cmd_preflight;
pub use show::cmd_show;
