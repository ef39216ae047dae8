//! Static busybox providing the shell and core utilities.

use crate::recipe::{Package, Recipe};

const VERSION: &str = "1.31.1";

/// Applets linked into `/bin`.
pub const COMMANDS: &[&str] = &[
    "sh", "echo", "cat", "ls", "cp", "ln", "mv", "env", "mkdir", "touch", "rm", "rmdir", "sleep",
    "uname", "clear", "head", "tail", "grep", "nslookup", "wget", "httpd",
];

/// Options enabled on top of `allnoconfig`.
const ENABLED: &[&str] = &[
    "STATIC",
    "ECHO",
    "CAT",
    "LS",
    "CP",
    "LN",
    "MV",
    "ENV",
    "MKDIR",
    "TOUCH",
    "RM",
    "GREP",
    "RMDIR",
    "SLEEP",
    "CLEAR",
    "HEAD",
    "TAIL",
    "UNAME",
    "ASH",
    "ASH_OPTIMIZE_FOR_SIZE",
    "ASH_JOB_CONTROL",
    "NSLOOKUP",
    "VERBOSE_RESOLUTION_ERRORS",
    "WGET",
    "HTTPD",
    "DEBUG",
];

pub struct Busybox;

impl Package for Busybox {
    fn recipe(&self) -> Recipe {
        let recipe = Recipe::new("busybox")
            .version(VERSION)
            .url(format!(
                "https://busybox.net/downloads/busybox-{VERSION}.tar.bz2"
            ))
            .host_dep("musl-tools")
            .output("/bin/busybox", "busybox_unstripped");

        COMMANDS.iter().fold(recipe, |recipe, cmd| {
            recipe.symlink(format!("/bin/{cmd}"), "/bin/busybox")
        })
    }

    fn build(&self, recipe: &mut Recipe) {
        // The build expects prefixed binutils next to musl-gcc.
        recipe.run("ln -s /usr/bin/ar /usr/bin/musl-ar");
        recipe.run("ln -s /usr/bin/strip /usr/bin/musl-strip");
        recipe.make_target("allnoconfig");
        recipe.set_kconfig("CROSS_COMPILER_PREFIX", "musl-");
        for option in ENABLED {
            recipe.set_kconfig(*option, true);
        }
        recipe.make();
    }
}
