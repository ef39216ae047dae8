//! Static configuration files.

use crate::recipe::{Package, Recipe};

const BANNER: &str = r#" _________________________________
< Rewrite in Rust ALL THE THINGS! >
 ---------------------------------
        \   ^__^
         \  (oo)\_______
            (__)\       )\/\
                ||----w |
                ||     ||
"#;

// Double-quoted by the shell, so every backslash is doubled.
const PROFILE: &str = r#"echo ""
echo " _________"
echo "< Welcome >"
echo " ---------"
echo "        \\   ^__^"
echo "         \\  (oo)\\_______"
echo "            (__)\\       )\\/\\"
echo "                ||----w |"
echo "                ||     ||"
echo ""
"#;

/// (path in the root tree, content)
pub const FILES: &[(&str, &str)] = &[
    ("/dev/.keep", ""),
    ("/tmp/.keep", ""),
    ("/etc/banner", BANNER),
    ("/etc/resolv.conf", "nameserver 1.1.1.1\n"),
    ("/etc/passwd", "root:x:0:0:root:/:/bin/sh\n"),
    ("/etc/group", "root:x:0:\n"),
    ("/etc/profile", PROFILE),
];

pub struct Files;

impl Package for Files {
    fn recipe(&self) -> Recipe {
        FILES.iter().fold(Recipe::new("files"), |recipe, (path, _)| {
            recipe.output(*path, path.trim_start_matches('/'))
        })
    }

    fn build(&self, recipe: &mut Recipe) {
        for (path, content) in FILES {
            recipe.add_file(path.trim_start_matches('/'), *content);
        }
    }
}
