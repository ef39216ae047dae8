//! The components that make up the default initramfs.
//!
//! Registration order is build order. Recipes must not depend on each
//! other's build results; anything shared goes through symlinks, which are
//! created after every recipe has been built.

pub mod busybox;
pub mod curl;
pub mod dropbear;
pub mod files;
pub mod hello_world;
pub mod inittab;

use crate::recipe::Registry;

/// Registry of every default component.
pub fn registry() -> Registry {
    Registry::new()
        .register("busybox", || Box::new(busybox::Busybox))
        .register("dropbear", || Box::new(dropbear::Dropbear))
        .register("curl", || Box::new(curl::Curl))
        .register("files", || Box::new(files::Files))
        .register("inittab", || Box::new(inittab::Inittab))
        .register("hello_world", || Box::new(hello_world::HelloWorld))
}
