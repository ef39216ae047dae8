//! Error types for the initramfs build pipeline.
//!
//! Every failure is fatal to the run. The variants fall into a few families
//! (see [`ErrorKind`]) so callers and tests can tell a bad recipe declaration
//! apart from a sandbox that failed to build.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad declarations or invocation, detected before any sandbox runs.
    Configuration,
    /// Image build or instance run exited non-zero.
    SandboxBuild,
    /// A declared output was not present in the finished instance.
    OutputMissing,
    /// The root tree could not be written as an archive.
    Archive,
    /// An external program could not be run or failed.
    Command,
    /// Filesystem or serialization failure.
    Io,
}

#[derive(Error, Debug)]
pub enum Error {
    /// Source URL does not end in a supported tarball extension.
    #[error("unknown file extension in the url: {url}")]
    UnknownArchiveExtension { url: String },

    /// A required command-line flag was not given.
    #[error("missing required flag: {flag}")]
    MissingFlag { flag: &'static str },

    /// Two registry entries share an identifier.
    #[error("recipe '{0}' is registered more than once")]
    DuplicateRecipe(String),

    /// A constructor produced a recipe whose name differs from its identifier.
    #[error("recipe registered as '{id}' is named '{name}'")]
    NameMismatch { id: String, name: String },

    /// Two declarations claim the same path in the root tree.
    #[error("'{path}' is declared by both '{first}' and '{second}'")]
    OutputConflict {
        path: String,
        first: String,
        second: String,
    },

    /// A declared path would land outside the root tree.
    #[error("path '{path}' escapes the root tree")]
    PathEscapesRoot { path: String },

    /// A declaration sits below another recipe's output or symlink.
    #[error("'{path}' from '{inner}' is nested under '{parent}' from '{outer}'")]
    NestedDeclaration {
        path: String,
        inner: String,
        parent: String,
        outer: String,
    },

    /// Creating a declared path would follow a symlink already in the tree.
    #[error("'{path}' would be created through the symlink '{}'", .link.display())]
    LinkInPath { path: String, link: PathBuf },

    /// An embedded file path cannot be placed in the build context.
    #[error("embedded file '{path}' {reason}")]
    EmbeddedPath { path: String, reason: &'static str },

    /// The archive destination lies inside the tree being archived.
    #[error(
        "output file '{}' is inside the build directory '{}'",
        .outfile.display(),
        .build_dir.display()
    )]
    OutfileInBuildDir { outfile: PathBuf, build_dir: PathBuf },

    /// Lookup of a recipe that is not in the registry.
    #[error("unknown recipe '{0}'")]
    UnknownRecipe(String),

    /// The container engine is not installed.
    #[error("container engine '{0}' not found in PATH")]
    EngineNotFound(String),

    /// The sandbox image failed to build or its instance failed to run.
    #[error("failed to build {recipe}:\n{output}")]
    SandboxBuild { recipe: String, output: String },

    /// A declared output could not be copied out of the instance.
    #[error("failed to copy '{path}' out of {recipe}: {detail}")]
    OutputMissing {
        recipe: String,
        path: String,
        detail: String,
    },

    /// A container image could not be exported.
    #[error("failed to export {image}:\n{output}")]
    ImageExport { image: String, output: String },

    /// An entry in the root tree cannot be stored in the archive.
    #[error("cannot archive '{}': {reason}", .path.display())]
    Archive { path: PathBuf, reason: String },

    /// An external program could not be spawned.
    #[error("failed to execute '{program}'. Is it installed?")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// An external program exited non-zero.
    #[error("{prefix} (exit code {code}){}", stderr_suffix(.stderr))]
    CommandFailed {
        prefix: String,
        code: i32,
        stderr: String,
    },

    /// Filesystem failure on a known path.
    #[error("{}: {source}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

impl Error {
    /// Attach a path to an I/O error.
    pub fn at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Path {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownArchiveExtension { .. }
            | Error::MissingFlag { .. }
            | Error::DuplicateRecipe(_)
            | Error::NameMismatch { .. }
            | Error::OutputConflict { .. }
            | Error::PathEscapesRoot { .. }
            | Error::NestedDeclaration { .. }
            | Error::LinkInPath { .. }
            | Error::EmbeddedPath { .. }
            | Error::OutfileInBuildDir { .. }
            | Error::UnknownRecipe(_)
            | Error::EngineNotFound(_) => ErrorKind::Configuration,
            Error::SandboxBuild { .. } | Error::ImageExport { .. } => ErrorKind::SandboxBuild,
            Error::OutputMissing { .. } => ErrorKind::OutputMissing,
            Error::Archive { .. } => ErrorKind::Archive,
            Error::Spawn { .. } | Error::CommandFailed { .. } => ErrorKind::Command,
            Error::Path { .. } | Error::Io(_) | Error::Walk(_) | Error::Json(_) => ErrorKind::Io,
        }
    }

    /// True for errors raised before any sandbox work starts.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
