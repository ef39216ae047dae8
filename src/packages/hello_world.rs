//! Smoke-test binary.

use crate::recipe::{Package, Recipe};

const MAIN_C: &str = r#"#include <stdio.h>

int main(void) {
    puts("Hello World!");
    return 0;
}
"#;

pub struct HelloWorld;

impl Package for HelloWorld {
    fn recipe(&self) -> Recipe {
        Recipe::new("hello_world")
            .version("0.0.1")
            .host_dep("gcc")
            .output("/bin/hello", "hello")
    }

    fn build(&self, recipe: &mut Recipe) {
        recipe.add_file("main.c", MAIN_C);
        recipe.run_argv(["gcc", "-O0", "-g3", "-static", "-o", "hello", "main.c"]);
    }
}
