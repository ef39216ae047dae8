//! Boot scripts: busybox-style inittab and the rcS that starts dropbear.

use crate::recipe::{Package, Recipe};

const INITTAB: &str = "\
::sysinit:/etc/init.d/rcS
::askfirst:/bin/sh
";

const RC_STARTUP: &str = "\
#!/bin/sh
dropbearkey -t ed25519 -f /tmp/dropbear_host_key
dropbear -F -B -r /tmp/dropbear_host_key -P /tmp/dropbear.pid

/bin/sh
";

pub struct Inittab;

impl Package for Inittab {
    fn recipe(&self) -> Recipe {
        // TODO: switch /sbin/init to busybox init(1) once the applet is enabled.
        Recipe::new("inittab")
            .output("/etc/inittab", "inittab")
            .output("/etc/init.d/rcS", "rcS")
            .output("/sbin/init", "rcS")
    }

    fn build(&self, recipe: &mut Recipe) {
        recipe.add_file("inittab", INITTAB);
        recipe.add_file("rcS", RC_STARTUP);
        recipe.run_argv(["chmod", "+x", "rcS"]);
    }
}
