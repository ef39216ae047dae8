//! Build spec generation: renders a [`Recipe`] into a container build file.
//!
//! The generated spec is line-oriented and fully determined by recipe state:
//!
//! ```text
//! FROM ubuntu:20.04
//! RUN apt-get update && apt-get install -qy build-essential curl sed
//! RUN apt-get install -qy musl-tools                 (host deps, if any)
//! RUN curl -fsSL --output tarball.tar.bz2 "<url>"    (source, if any)
//! RUN mkdir -p /build && tar -xjf tarball.tar.bz2 --strip-components=1 -C /build
//! ADD add_files/<path> /build/<path>                 (embedded files, patches)
//! WORKDIR /build
//! RUN ... / ENV ...                                  (build steps, in order)
//! ```

use std::fmt;
use std::path::Path;

use tracing::debug;

use super::{shell, BuildStep, KConfigValue, Recipe};
use crate::common::{tree_relative, write_file_with_dirs};
use crate::error::{Error, Result};

/// Base image every sandbox starts from.
pub const BASE_IMAGE: &str = "ubuntu:20.04";

/// Packages installed in every sandbox.
pub const BASELINE_PACKAGES: &[&str] = &["build-essential", "curl", "sed"];

/// Build root inside the sandbox; relative output paths resolve against it.
pub const BUILD_ROOT: &str = "/build";

/// Directory in the build context holding embedded files.
pub const ADD_FILES_DIR: &str = "add_files";

/// File name of the rendered spec inside the build context.
pub const SPEC_FILE_NAME: &str = "Dockerfile";

/// One line of a build spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    From(String),
    Run(String),
    Env { key: String, value: String },
    Add { src: String, dest: String },
    Workdir(String),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::From(image) => write!(f, "FROM {image}"),
            Directive::Run(command) => write!(f, "RUN {command}"),
            Directive::Env { key, value } => write!(f, "ENV {key}=\"{}\"", escape_env(value)),
            Directive::Add { src, dest } => write!(f, "ADD {src} {dest}"),
            Directive::Workdir(path) => write!(f, "WORKDIR {path}"),
        }
    }
}

fn escape_env(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Decompression selected by a source URL's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    /// Pick the codec from the extension of the URL's last path segment.
    ///
    /// Query strings and fragments are ignored. Anything other than
    /// `.tar`, `.gz`, `.bz2` or `.xz` is a configuration error.
    pub fn from_url(url: &str) -> Result<Self> {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .trim_end_matches('/');
        let file_name = path.rsplit('/').next().unwrap_or(path);

        match file_name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("tar") => Ok(Compression::None),
            Some("gz") => Ok(Compression::Gzip),
            Some("bz2") => Ok(Compression::Bzip2),
            Some("xz") => Ok(Compression::Xz),
            _ => Err(Error::UnknownArchiveExtension {
                url: url.to_string(),
            }),
        }
    }

    /// Name the downloaded tarball is saved under.
    pub fn tarball_name(self) -> &'static str {
        match self {
            Compression::None => "tarball.tar",
            Compression::Gzip => "tarball.tar.gz",
            Compression::Bzip2 => "tarball.tar.bz2",
            Compression::Xz => "tarball.tar.xz",
        }
    }

    /// `tar` extraction flags for this codec.
    pub fn tar_flags(self) -> &'static str {
        match self {
            Compression::None => "-xf",
            Compression::Gzip => "-xzf",
            Compression::Bzip2 => "-xjf",
            Compression::Xz => "-xJf",
        }
    }
}

/// A rendered build spec plus the files its `ADD` directives reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    directives: Vec<Directive>,
    /// (path inside the build context, content)
    context_files: Vec<(String, Vec<u8>)>,
}

impl BuildSpec {
    /// Render a recipe. Pure: the same recipe always yields the same spec.
    pub fn generate(recipe: &Recipe) -> Result<Self> {
        let mut spec = BuildSpec {
            directives: vec![
                Directive::From(BASE_IMAGE.to_string()),
                Directive::Run(format!(
                    "apt-get update && apt-get install -qy {}",
                    BASELINE_PACKAGES.join(" ")
                )),
            ],
            context_files: Vec::new(),
        };

        if !recipe.host_deps().is_empty() {
            let deps: Vec<&str> = recipe.host_deps().iter().map(String::as_str).collect();
            spec.run(format!("apt-get install -qy {}", deps.join(" ")));
        }

        if let Some(url) = recipe.source_url() {
            let compression = Compression::from_url(url)?;
            let tarball = compression.tarball_name();
            spec.run(format!("curl -fsSL --output {tarball} \"{url}\""));
            spec.run(format!(
                "mkdir -p {BUILD_ROOT} && tar {} {tarball} --strip-components=1 -C {BUILD_ROOT}",
                compression.tar_flags()
            ));
        }

        for (path, content) in recipe.embedded_files() {
            spec.add(path, content.as_bytes())?;
        }
        for step in recipe.steps() {
            if let BuildStep::Patch { content, id } = step {
                spec.add(&BuildStep::patch_file_name(*id), content.as_bytes())?;
            }
        }

        spec.directives
            .push(Directive::Workdir(BUILD_ROOT.to_string()));

        for step in recipe.steps() {
            spec.step(step);
        }

        debug!(
            recipe = recipe.name(),
            directives = spec.directives.len(),
            files = spec.context_files.len(),
            "generated build spec"
        );
        Ok(spec)
    }

    fn run(&mut self, command: String) {
        self.directives.push(Directive::Run(command));
    }

    /// Embed a file under the build root. The path must stay inside both
    /// the build context and the build root, and fit on one `ADD` line.
    fn add(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let invalid = |reason| Error::EmbeddedPath {
            path: path.to_string(),
            reason,
        };
        if path.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }
        let relative = tree_relative(path)
            .map_err(|_| invalid("must name a file below the build root"))?;
        let relative = relative.to_string_lossy();

        let src = format!("{ADD_FILES_DIR}/{relative}");
        if self.context_files.iter().any(|(existing, _)| *existing == src) {
            return Err(invalid("collides with another embedded file"));
        }

        self.directives.push(Directive::Add {
            src: src.clone(),
            dest: format!("{BUILD_ROOT}/{relative}"),
        });
        self.context_files.push((src, content.to_vec()));
        Ok(())
    }

    fn step(&mut self, step: &BuildStep) {
        match step {
            BuildStep::Shell(command) => self.run(command.clone()),
            BuildStep::Argv(argv) => self.run(shell::join(argv)),
            BuildStep::EnvSet { key, value } => self.directives.push(Directive::Env {
                key: key.clone(),
                value: value.clone(),
            }),
            BuildStep::Patch { id, .. } => {
                let apply = format!(
                    "patch --ignore-whitespace -p1 < {}",
                    BuildStep::patch_file_name(*id)
                );
                self.run(shell::join(["sh", "-c", apply.as_str()]));
            }
            BuildStep::KConfigSet { key, value } => {
                let script = kconfig_script(key, value);
                self.run(shell::join(["sh", "-c", script.as_str()]));
            }
        }
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn context_files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.context_files
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_slice()))
    }

    /// The spec as text, one directive per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for directive in &self.directives {
            out.push_str(&directive.to_string());
            out.push('\n');
        }
        out
    }

    /// Write the spec and every referenced file into a build context.
    pub fn write_to(&self, context_dir: &Path) -> Result<()> {
        write_file_with_dirs(context_dir.join(SPEC_FILE_NAME), self.render())?;
        for (path, content) in self.context_files() {
            write_file_with_dirs(context_dir.join(path), content)?;
        }
        Ok(())
    }
}

impl fmt::Display for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Shell script forcing `CONFIG_<key>` in `./.config` to `value`.
///
/// Two substitutions run together: one for the `# CONFIG_X is not set`
/// form, one for any existing assignment (commented or not). Whatever the
/// option's prior state, the line ends up as `CONFIG_X=<value>`.
pub fn kconfig_script(key: &str, value: &KConfigValue) -> String {
    let replacement = sed_replacement(&format!("CONFIG_{key}={}", value.render()));
    let unset = format!("s/^# CONFIG_{key} is not set$/{replacement}/");
    let assigned = format!("s/^[# ]*CONFIG_{key}=.*$/{replacement}/");
    format!(
        "sed -i -e {} -e {} .config",
        shell::quote(&unset),
        shell::quote(&assigned)
    )
}

fn sed_replacement(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '/' | '&') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Cmd;
    use std::fs;
    use tempfile::TempDir;

    fn lines(recipe: &Recipe) -> Vec<String> {
        BuildSpec::generate(recipe)
            .unwrap()
            .directives()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_compression_from_extension() {
        let cases = [
            ("https://example.com/src-1.0.tar", Compression::None),
            ("https://example.com/src-1.0.tar.gz", Compression::Gzip),
            ("https://example.com/src-1.0.tar.bz2", Compression::Bzip2),
            ("https://example.com/src-1.0.tar.xz", Compression::Xz),
            ("https://example.com/src-1.0.tar.xz?mirror=1#top", Compression::Xz),
        ];
        for (url, expected) in cases {
            assert_eq!(Compression::from_url(url).unwrap(), expected, "{url}");
        }
    }

    #[test]
    fn test_unknown_extension_is_configuration_error() {
        for url in [
            "https://example.com/src.zip",
            "https://example.com/src.tgz",
            "https://example.com/download",
            "https://example.com/v1.2/",
        ] {
            let err = Compression::from_url(url).unwrap_err();
            assert!(err.is_configuration(), "{url}");
        }

        let recipe = Recipe::new("bad").url("https://example.com/src.zip");
        assert!(BuildSpec::generate(&recipe).is_err());
    }

    #[test]
    fn test_baseline_always_first() {
        let lines = lines(&Recipe::new("empty"));
        assert_eq!(lines[0], "FROM ubuntu:20.04");
        assert_eq!(
            lines[1],
            "RUN apt-get update && apt-get install -qy build-essential curl sed"
        );
        assert_eq!(lines[2], "WORKDIR /build");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_source_and_deps_rendered_before_workdir() {
        let recipe = Recipe::new("busybox")
            .url("https://busybox.net/downloads/busybox-1.31.1.tar.bz2")
            .host_dep("musl-tools");
        let lines = lines(&recipe);
        assert_eq!(lines[2], "RUN apt-get install -qy musl-tools");
        assert_eq!(
            lines[3],
            "RUN curl -fsSL --output tarball.tar.bz2 \"https://busybox.net/downloads/busybox-1.31.1.tar.bz2\""
        );
        assert_eq!(
            lines[4],
            "RUN mkdir -p /build && tar -xjf tarball.tar.bz2 --strip-components=1 -C /build"
        );
        assert_eq!(lines[5], "WORKDIR /build");
    }

    #[test]
    fn test_single_embedded_file() {
        let mut recipe = Recipe::new("x");
        recipe.add_file("x", "hello");
        let spec = BuildSpec::generate(&recipe).unwrap();

        let adds: Vec<_> = spec
            .directives()
            .iter()
            .filter(|d| matches!(d, Directive::Add { .. }))
            .collect();
        assert_eq!(adds.len(), 1);
        assert_eq!(adds[0].to_string(), "ADD add_files/x /build/x");
        assert!(!spec.render().contains("curl -fsSL"));

        let files: Vec<_> = spec.context_files().collect();
        assert_eq!(files, vec![("add_files/x", b"hello".as_slice())]);
    }

    #[test]
    fn test_argv_is_quoted_and_shell_is_verbatim() {
        let mut recipe = Recipe::new("hello_world");
        recipe.run("ln -s /usr/bin/ar /usr/bin/musl-ar && echo $PATH");
        recipe.run_argv(["gcc", "-o", "hello world", "main.c"]);
        let lines = lines(&recipe);
        assert_eq!(lines[3], "RUN ln -s /usr/bin/ar /usr/bin/musl-ar && echo $PATH");
        assert_eq!(lines[4], "RUN gcc -o 'hello world' main.c");
    }

    #[test]
    fn test_env_value_escaped() {
        let mut recipe = Recipe::new("env");
        recipe.env("CFLAGS", r#"-DNAME="x" -I\inc"#);
        let lines = lines(&recipe);
        assert_eq!(lines[3], r#"ENV CFLAGS="-DNAME=\"x\" -I\\inc""#);
    }

    #[test]
    fn test_patches_embedded_with_sequential_names() {
        let mut recipe = Recipe::new("dropbear");
        recipe.patch("--- a\n+++ b\n");
        recipe.patch("--- c\n+++ d\n");
        let spec = BuildSpec::generate(&recipe).unwrap();
        let text = spec.render();

        assert!(text.contains("ADD add_files/__build_1__.patch /build/__build_1__.patch"));
        assert!(text.contains("ADD add_files/__build_2__.patch /build/__build_2__.patch"));
        assert!(text.contains(
            "RUN sh -c 'patch --ignore-whitespace -p1 < __build_1__.patch'"
        ));

        // Files are added before the working directory is fixed, steps after.
        let workdir = text.find("WORKDIR").unwrap();
        assert!(text.find("ADD add_files/__build_2__").unwrap() < workdir);
        assert!(text.find("patch --ignore").unwrap() > workdir);
    }

    #[test]
    fn test_embedded_path_outside_build_root_rejected() {
        for path in ["../../escaped", "/etc/../../escaped", "/", "a b", "tab\tname"] {
            let mut recipe = Recipe::new("x");
            recipe.add_file(path, "pwn");
            let err = BuildSpec::generate(&recipe).unwrap_err();
            assert!(err.is_configuration(), "{path:?}");
            assert!(matches!(err, Error::EmbeddedPath { .. }), "{path:?}");
        }
    }

    #[test]
    fn test_embedded_file_colliding_with_patch_rejected() {
        let mut recipe = Recipe::new("dropbear");
        recipe.add_file("__build_1__.patch", "not a patch");
        recipe.patch("--- a\n+++ b\n");
        let err = BuildSpec::generate(&recipe).unwrap_err();
        assert!(err.to_string().contains("__build_1__.patch"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_same_file_with_and_without_slash_rejected() {
        let mut recipe = Recipe::new("x");
        recipe.add_file("/etc/motd", "one");
        recipe.add_file("etc/motd", "two");
        assert!(BuildSpec::generate(&recipe).is_err());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut recipe = Recipe::new("d").host_dep("b").host_dep("a");
        recipe.add_file("z", "1");
        recipe.add_file("a", "2");
        recipe.make();
        let first = BuildSpec::generate(&recipe).unwrap();
        let second = BuildSpec::generate(&recipe).unwrap();
        assert_eq!(first, second);
        assert!(first.render().contains("RUN apt-get install -qy a b"));
    }

    #[test]
    fn test_write_to_context_dir() {
        let temp = TempDir::new().unwrap();
        let mut recipe = Recipe::new("inittab");
        recipe.add_file("/etc/inittab", "::sysinit:/etc/init.d/rcS\n");
        BuildSpec::generate(&recipe)
            .unwrap()
            .write_to(temp.path())
            .unwrap();

        let spec = fs::read_to_string(temp.path().join("Dockerfile")).unwrap();
        assert!(spec.contains("ADD add_files/etc/inittab /build/etc/inittab"));
        assert_eq!(
            fs::read_to_string(temp.path().join("add_files/etc/inittab")).unwrap(),
            "::sysinit:/etc/init.d/rcS\n"
        );
    }

    // =========================================================================
    // KConfig semantics, checked by running the rendered script
    // =========================================================================

    fn apply_kconfig(initial: &str, sets: &[(&str, KConfigValue)]) -> String {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".config"), initial).unwrap();
        for (key, value) in sets {
            Cmd::new("sh")
                .arg("-c")
                .arg(kconfig_script(key, value))
                .dir(temp.path())
                .run()
                .unwrap();
        }
        fs::read_to_string(temp.path().join(".config")).unwrap()
    }

    #[test]
    fn test_kconfig_from_every_prior_state() {
        let priors = [
            "# CONFIG_STATIC is not set\n",
            "CONFIG_STATIC=y\n",
            "CONFIG_STATIC=n\n",
            "CONFIG_STATIC=\"old value\"\n",
        ];
        for prior in priors {
            let config = format!("CONFIG_STATIC_LIBGCC=y\n{prior}CONFIG_LS=y\n");
            let result = apply_kconfig(&config, &[("STATIC", true.into())]);
            assert_eq!(
                result, "CONFIG_STATIC_LIBGCC=y\nCONFIG_STATIC=y\nCONFIG_LS=y\n",
                "prior state {prior:?}"
            );
        }
    }

    #[test]
    fn test_kconfig_last_set_wins() {
        let result = apply_kconfig(
            "# CONFIG_CROSS_COMPILER_PREFIX is not set\n",
            &[
                ("CROSS_COMPILER_PREFIX", true.into()),
                ("CROSS_COMPILER_PREFIX", "musl-".into()),
            ],
        );
        assert_eq!(result, "CONFIG_CROSS_COMPILER_PREFIX=\"musl-\"\n");

        let result = apply_kconfig(
            "CONFIG_ASH=y\n",
            &[("ASH", "a/b & c".into()), ("ASH", false.into())],
        );
        assert_eq!(result, "CONFIG_ASH=n\n");
    }

    #[test]
    fn test_kconfig_string_with_sed_metacharacters() {
        let result = apply_kconfig("CONFIG_PREFIX=\"\"\n", &[("PREFIX", "/usr/a&b".into())]);
        assert_eq!(result, "CONFIG_PREFIX=\"/usr/a&b\"\n");
    }

    #[test]
    fn test_kconfig_rendered_as_sh_run() {
        let mut recipe = Recipe::new("busybox");
        recipe.set_kconfig("STATIC", true);
        let lines = lines(&recipe);
        assert!(lines[3].starts_with("RUN sh -c "));
        assert!(lines[3].contains("CONFIG_STATIC=y"));
    }
}
