//! Penguin - builds minimal initramfs images from sandboxed recipes.
//!
//! Library crate behind the `penguin` binary, exposed for integration
//! testing:
//!
//! - [`recipe`] - declarative component descriptions and build spec rendering
//! - [`sandbox`] - container engine seam and the per-recipe executor
//! - [`assembler`] - the root tree and global symlink table
//! - [`artifact`] - newc archive serialization
//! - [`build`] - the orchestrator tying them together
//! - [`packages`] - the default component set

pub mod artifact;
pub mod assembler;
pub mod build;
pub mod commands;
pub mod common;
pub mod config;
pub mod error;
pub mod export;
pub mod packages;
pub mod preflight;
pub mod process;
pub mod recipe;
pub mod sandbox;
pub mod timing;

pub use error::{Error, ErrorKind, Result};
