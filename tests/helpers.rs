//! Shared test utilities for penguin tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use penguin::process::CommandResult;
use penguin::recipe::{Package, Recipe};
use penguin::sandbox::SandboxRuntime;
use tempfile::TempDir;

/// Test environment with a temporary build directory and output path.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Root tree location handed to the orchestrator
    pub build_dir: PathBuf,
    /// Archive destination
    pub outfile: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let build_dir = temp_dir.path().join("build");
        let outfile = temp_dir.path().join("out/initramfs.cpio");

        Self {
            _temp_dir: temp_dir,
            build_dir,
            outfile,
        }
    }

    pub fn path(&self) -> &Path {
        self._temp_dir.path()
    }

    pub fn options(&self) -> penguin::build::BuildOptions {
        penguin::build::BuildOptions {
            build_dir: self.build_dir.clone(),
            outfile: self.outfile.clone(),
            image_prefix: "test".to_string(),
        }
    }
}

// =============================================================================
// Fake container engine
// =============================================================================

pub fn exit(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

pub fn result(code: i32, stdout: &str, stderr: &str) -> CommandResult {
    CommandResult {
        status: exit(code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

/// In-memory [`SandboxRuntime`].
///
/// Images hold a flat map of absolute path to content: the files configured
/// with [`FakeRuntime::with_file`] plus whatever the spec `ADD`s. Every call
/// is recorded as one line in [`FakeRuntime::calls`].
#[derive(Default)]
pub struct FakeRuntime {
    calls: RefCell<Vec<String>>,
    live: RefCell<BTreeSet<String>>,
    /// instance name -> image tag
    instances: RefCell<HashMap<String, String>>,
    /// image tag -> (path -> content)
    images: RefCell<HashMap<String, BTreeMap<String, Vec<u8>>>>,
    /// image tag -> rendered spec
    specs: RefCell<HashMap<String, String>>,
    preset: HashMap<String, BTreeMap<String, Vec<u8>>>,
    fail_build: HashSet<String>,
    fail_run: HashSet<String>,
    export_tree: Option<PathBuf>,
    inspect_json: String,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` exist in images tagged `tag`.
    pub fn with_file(mut self, tag: &str, path: &str, content: &str) -> Self {
        self.preset
            .entry(tag.to_string())
            .or_default()
            .insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn failing_build(mut self, tag: &str) -> Self {
        self.fail_build.insert(tag.to_string());
        self
    }

    pub fn failing_run(mut self, tag: &str) -> Self {
        self.fail_run.insert(tag.to_string());
        self
    }

    /// Directory whose contents `export_instance` tars up.
    pub fn with_export_tree(mut self, dir: &Path) -> Self {
        self.export_tree = Some(dir.to_path_buf());
        self
    }

    pub fn with_inspect_json(mut self, json: &str) -> Self {
        self.inspect_json = json.to_string();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls whose first word is `verb`.
    pub fn calls_of(&self, verb: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.split(' ').next() == Some(verb))
            .cloned()
            .collect()
    }

    pub fn live_instances(&self) -> BTreeSet<String> {
        self.live.borrow().clone()
    }

    pub fn spec_for(&self, tag: &str) -> Option<String> {
        self.specs.borrow().get(tag).cloned()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn start_instance(&self, tag: &str, name: &str) -> Option<CommandResult> {
        if !self.live.borrow_mut().insert(name.to_string()) {
            return Some(result(
                125,
                "",
                &format!("Conflict. The container name \"/{name}\" is already in use"),
            ));
        }
        self.instances
            .borrow_mut()
            .insert(name.to_string(), tag.to_string());
        None
    }
}

impl SandboxRuntime for FakeRuntime {
    fn build_image(&self, context_dir: &Path, tag: &str) -> penguin::Result<CommandResult> {
        self.record(format!("build {tag}"));
        let spec = fs::read_to_string(context_dir.join("Dockerfile"))?;
        self.specs.borrow_mut().insert(tag.to_string(), spec.clone());

        if self.fail_build.contains(tag) {
            return Ok(result(1, "Step 3/9 : RUN make", "make: *** [all] Error 2"));
        }

        let mut files = self.preset.get(tag).cloned().unwrap_or_default();
        for line in spec.lines() {
            if let Some(rest) = line.strip_prefix("ADD ") {
                let (src, dest) = rest.split_once(' ').expect("ADD src dest");
                files.insert(dest.to_string(), fs::read(context_dir.join(src))?);
            }
        }
        self.images.borrow_mut().insert(tag.to_string(), files);
        Ok(result(0, "Successfully built", ""))
    }

    fn remove_instance(&self, name: &str) -> penguin::Result<()> {
        self.record(format!("rm {name}"));
        self.live.borrow_mut().remove(name);
        Ok(())
    }

    fn run_instance(&self, tag: &str, name: &str) -> penguin::Result<CommandResult> {
        self.record(format!("run {tag} {name}"));
        if let Some(conflict) = self.start_instance(tag, name) {
            return Ok(conflict);
        }
        if self.fail_run.contains(tag) {
            return Ok(result(1, "", "/bin/true: exec format error"));
        }
        Ok(result(0, "", ""))
    }

    fn copy_from_instance(&self, name: &str, src: &str, dest: &Path) -> penguin::Result<CommandResult> {
        self.record(format!("cp {name}:{src}"));
        let Some(tag) = self.instances.borrow().get(name).cloned() else {
            return Ok(result(1, "", &format!("No such container: {name}")));
        };
        let images = self.images.borrow();
        let files = images.get(&tag).cloned().unwrap_or_default();

        if let Some(content) = files.get(src) {
            fs::write(dest, content)?;
            return Ok(result(0, "", ""));
        }

        let prefix = format!("{}/", src.trim_end_matches('/'));
        let mut found = false;
        for (path, content) in &files {
            if let Some(rel) = path.strip_prefix(&prefix) {
                let target = dest.join(rel);
                fs::create_dir_all(target.parent().unwrap())?;
                fs::write(target, content)?;
                found = true;
            }
        }
        if found {
            Ok(result(0, "", ""))
        } else {
            Ok(result(
                1,
                "",
                &format!("Error: Could not find the file {src} in container {name}"),
            ))
        }
    }

    fn create_instance(&self, image: &str, name: &str) -> penguin::Result<CommandResult> {
        self.record(format!("create {image} {name}"));
        Ok(self
            .start_instance(image, name)
            .unwrap_or_else(|| result(0, "0123456789ab", "")))
    }

    fn export_instance(&self, name: &str, dest: &Path) -> penguin::Result<CommandResult> {
        self.record(format!("export {name}"));
        let tree = self.export_tree.as_ref().expect("no export tree configured");
        let status = std::process::Command::new("tar")
            .arg("cf")
            .arg(dest)
            .arg("-C")
            .arg(tree)
            .arg(".")
            .status()?;
        Ok(CommandResult {
            status,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn inspect_image(&self, image: &str) -> penguin::Result<CommandResult> {
        self.record(format!("inspect {image}"));
        if self.inspect_json.is_empty() {
            return Ok(result(1, "[]", &format!("Error: No such image: {image}")));
        }
        Ok(result(0, &self.inspect_json, ""))
    }
}

// =============================================================================
// Test recipes
// =============================================================================

/// Recipe built from plain data.
#[derive(Clone, Default)]
pub struct TestPackage {
    pub name: &'static str,
    pub url: Option<&'static str>,
    pub outputs: Vec<(&'static str, &'static str)>,
    pub symlinks: Vec<(&'static str, &'static str)>,
    pub files: Vec<(&'static str, &'static str)>,
    pub commands: Vec<&'static str>,
}

impl Package for TestPackage {
    fn recipe(&self) -> Recipe {
        let mut recipe = Recipe::new(self.name).version("1.0");
        if let Some(url) = self.url {
            recipe = recipe.url(url);
        }
        for (dest, src) in &self.outputs {
            recipe = recipe.output(*dest, *src);
        }
        for (link, target) in &self.symlinks {
            recipe = recipe.symlink(*link, *target);
        }
        recipe
    }

    fn build(&self, recipe: &mut Recipe) {
        for (path, content) in &self.files {
            recipe.add_file(*path, *content);
        }
        for command in &self.commands {
            recipe.run(*command);
        }
    }
}

// =============================================================================
// Archive reader
// =============================================================================

/// One decoded newc entry.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub ino: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.mode & 0o170000 == 0o040000
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & 0o170000 == 0o120000
    }

    pub fn is_file(&self) -> bool {
        self.mode & 0o170000 == 0o100000
    }
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Decode a whole archive, trailer included. Panics on malformed input.
pub fn read_newc(bytes: &[u8]) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut pos = 0;

    loop {
        let header = std::str::from_utf8(&bytes[pos..pos + 110]).expect("ascii header");
        assert_eq!(&header[..6], "070701", "bad magic at offset {}", pos);
        let field = |i: usize| {
            u32::from_str_radix(&header[6 + i * 8..14 + i * 8], 16).expect("hex field")
        };

        let namesize = field(11) as usize;
        let filesize = field(6) as usize;
        let name_start = pos + 110;
        let name = String::from_utf8(bytes[name_start..name_start + namesize - 1].to_vec())
            .expect("utf-8 name");
        assert_eq!(bytes[name_start + namesize - 1], 0, "name not NUL-terminated");

        let data_start = align4(name_start + namesize);
        let data = bytes[data_start..data_start + filesize].to_vec();
        pos = align4(data_start + filesize);

        let entry = Entry {
            name,
            ino: field(0),
            mode: field(1),
            uid: field(2),
            gid: field(3),
            nlink: field(4),
            data,
        };
        let done = entry.name == "TRAILER!!!";
        entries.push(entry);
        if done {
            assert_eq!(pos, bytes.len(), "trailing bytes after trailer");
            return entries;
        }
    }
}

pub fn read_archive(path: &Path) -> Vec<Entry> {
    read_newc(&fs::read(path).expect("Failed to read archive"))
}

pub fn entry<'a>(entries: &'a [Entry], name: &str) -> &'a Entry {
    entries
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("no archive entry named {}", name))
}

// =============================================================================
// Assertions
// =============================================================================

/// Assert that a symlink exists and points to the expected target.
pub fn assert_symlink(path: &Path, expected_target: &str) {
    assert!(
        path.is_symlink(),
        "Expected symlink at {}, but it's not a symlink",
        path.display()
    );

    let target = fs::read_link(path).expect("Failed to read symlink");
    assert_eq!(
        target.to_string_lossy(),
        expected_target,
        "Symlink {} points to {:?}, expected {}",
        path.display(),
        target,
        expected_target
    );
}

/// Assert that a file exists with exactly the given content.
pub fn assert_file_content(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert_eq!(content, expected, "Unexpected content in {}", path.display());
}
