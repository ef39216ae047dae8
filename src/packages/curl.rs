//! Static curl with only the HTTP(S) protocols.

use crate::recipe::{Package, Recipe};

const VERSION: &str = "7.76.1";

const CONFIGURE: &[&str] = &[
    "./configure",
    "CC=musl-gcc",
    "--disable-shared",
    "--disable-pthreads",
    "--disable-threaded-resolver",
    "--disable-rtsp",
    "--disable-alt-svc",
    "--disable-libcurl-option",
    "--disable-telnet",
    "--disable-gopher",
    "--disable-dict",
    "--disable-file",
    "--disable-ftp",
    "--disable-tftp",
    "--disable-imap",
    "--disable-pop3",
    "--disable-smtp",
    "--disable-mqtt",
    "--disable-unix-sockets",
];

pub struct Curl;

impl Package for Curl {
    fn recipe(&self) -> Recipe {
        Recipe::new("curl")
            .version(VERSION)
            .url(format!("https://curl.se/download/curl-{VERSION}.tar.xz"))
            .host_dep("musl-tools")
            .output("/bin/curl", "src/curl")
    }

    fn build(&self, recipe: &mut Recipe) {
        recipe.run_argv(CONFIGURE.iter().copied());
        recipe.make_args(["curl_LDFLAGS=-all-static"]);
    }
}
