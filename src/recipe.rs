//! Declarative recipes for initramfs components.
//!
//! A [`Recipe`] describes WHAT one component is: where its source comes from,
//! which host packages it needs, the ordered build steps, and which files of
//! the finished sandbox land where in the root tree. It knows nothing about
//! how a sandbox is run; [`spec::BuildSpec`] renders it into a container
//! build file and the sandbox executor takes it from there.
//!
//! ```text
//! Package::recipe()  ──►  Recipe (declarations)
//! Package::build()   ──►  Recipe (+ steps, embedded files)
//! BuildSpec::generate(&recipe)  ──►  FROM / RUN / ENV / ADD / WORKDIR
//! ```

pub mod registry;
pub mod shell;
pub mod spec;

pub use registry::{Prepared, Registry};
pub use spec::{BuildSpec, Compression, Directive};

use std::collections::{BTreeMap, BTreeSet};

/// Worker count for `make` steps.
pub const MAKE_JOBS: usize = 16;

/// A buildable component of the initramfs.
///
/// Implementations are pure data: `recipe` declares the component's identity
/// and outputs, `build` appends the steps that produce them.
pub trait Package {
    /// Declare name, version, source, host dependencies, outputs and symlinks.
    fn recipe(&self) -> Recipe;

    /// Append build steps and embedded files.
    fn build(&self, recipe: &mut Recipe);
}

/// Content of a file embedded into the sandbox build root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(s) => s.as_bytes(),
            FileContent::Bytes(b) => b,
        }
    }
}

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        FileContent::Text(s.to_string())
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        FileContent::Text(s)
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(b: Vec<u8>) -> Self {
        FileContent::Bytes(b)
    }
}

impl From<&[u8]> for FileContent {
    fn from(b: &[u8]) -> Self {
        FileContent::Bytes(b.to_vec())
    }
}

/// Value of a kernel-style configuration option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KConfigValue {
    Bool(bool),
    Str(String),
}

impl KConfigValue {
    /// Right-hand side of a `.config` assignment: `y`, `n` or `"text"`.
    pub fn render(&self) -> String {
        match self {
            KConfigValue::Bool(true) => "y".to_string(),
            KConfigValue::Bool(false) => "n".to_string(),
            KConfigValue::Str(s) => format!("\"{s}\""),
        }
    }
}

impl From<bool> for KConfigValue {
    fn from(b: bool) -> Self {
        KConfigValue::Bool(b)
    }
}

impl From<&str> for KConfigValue {
    fn from(s: &str) -> Self {
        KConfigValue::Str(s.to_string())
    }
}

impl From<String> for KConfigValue {
    fn from(s: String) -> Self {
        KConfigValue::Str(s)
    }
}

/// One step of a recipe's build, rendered in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStep {
    /// A command line interpreted by the sandbox shell.
    Shell(String),
    /// An exact argument vector; never re-split by a shell.
    Argv(Vec<String>),
    /// Set an environment variable for all following steps.
    EnvSet { key: String, value: String },
    /// Apply a unified diff to the extracted source tree.
    Patch { content: String, id: u32 },
    /// Force an option in `.config` to a value.
    KConfigSet { key: String, value: KConfigValue },
}

impl BuildStep {
    /// File name a patch body is embedded under inside the build root.
    pub fn patch_file_name(id: u32) -> String {
        format!("__build_{id}__.patch")
    }
}

/// Declarative build description of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    name: String,
    version: String,
    url: Option<String>,
    host_deps: BTreeSet<String>,
    steps: Vec<BuildStep>,
    outputs: BTreeMap<String, String>,
    symlinks: BTreeMap<String, String>,
    files: BTreeMap<String, FileContent>,
    patch_counter: u32,
}

impl Recipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            url: None,
            host_deps: BTreeSet::new(),
            steps: Vec::new(),
            outputs: BTreeMap::new(),
            symlinks: BTreeMap::new(),
            files: BTreeMap::new(),
            patch_counter: 1,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Declarations
    // ─────────────────────────────────────────────────────────────────────

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Source tarball; its extension selects the decompression codec.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// A host package to install in the sandbox before building.
    pub fn host_dep(mut self, dep: impl Into<String>) -> Self {
        self.host_deps.insert(dep.into());
        self
    }

    /// Copy `src` (relative to the build root unless absolute) out of the
    /// finished sandbox to `dest` in the root tree.
    pub fn output(mut self, dest: impl Into<String>, src: impl Into<String>) -> Self {
        self.outputs.insert(dest.into(), src.into());
        self
    }

    /// Create `link` in the root tree pointing at `target` once every recipe
    /// has been built.
    pub fn symlink(mut self, link: impl Into<String>, target: impl Into<String>) -> Self {
        self.symlinks.insert(link.into(), target.into());
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Build steps
    // ─────────────────────────────────────────────────────────────────────

    /// Run a shell command line.
    pub fn run(&mut self, command: impl Into<String>) {
        self.steps.push(BuildStep::Shell(command.into()));
    }

    /// Run an exact argument vector.
    pub fn run_argv<I, S>(&mut self, argv: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps
            .push(BuildStep::Argv(argv.into_iter().map(Into::into).collect()));
    }

    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.steps.push(BuildStep::EnvSet {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Apply a patch to the source tree. Each call gets the next id.
    pub fn patch(&mut self, content: impl Into<String>) {
        let id = self.patch_counter;
        self.patch_counter += 1;
        self.steps.push(BuildStep::Patch {
            content: content.into(),
            id,
        });
    }

    /// `make -j16`
    pub fn make(&mut self) {
        self.make_args(std::iter::empty::<String>());
    }

    /// `make -j16 <target>`
    pub fn make_target(&mut self, target: impl Into<String>) {
        self.make_args([target.into()]);
    }

    /// `make -j16` followed by arbitrary targets or variable assignments.
    pub fn make_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec!["make".to_string(), format!("-j{MAKE_JOBS}")];
        argv.extend(args.into_iter().map(Into::into));
        self.steps.push(BuildStep::Argv(argv));
    }

    /// Embed a file at `path` relative to the sandbox build root.
    pub fn add_file(&mut self, path: impl Into<String>, content: impl Into<FileContent>) {
        self.files.insert(path.into(), content.into());
    }

    /// Set `CONFIG_<key>` in `.config`, whatever its current state.
    pub fn set_kconfig(&mut self, key: impl Into<String>, value: impl Into<KConfigValue>) {
        self.steps.push(BuildStep::KConfigSet {
            key: key.into(),
            value: value.into(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_str(&self) -> &str {
        &self.version
    }

    pub fn source_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn host_deps(&self) -> &BTreeSet<String> {
        &self.host_deps
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    pub fn symlinks(&self) -> &BTreeMap<String, String> {
        &self.symlinks
    }

    pub fn embedded_files(&self) -> &BTreeMap<String, FileContent> {
        &self.files
    }
}
