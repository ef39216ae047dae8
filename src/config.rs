//! Configuration management for penguin.
//!
//! Reads configuration from .env file and environment variables.
//! Environment variables take precedence over .env file.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

/// Default container engine program.
pub const DEFAULT_ENGINE: &str = "docker";
/// Default prefix for image tags and instance names.
pub const DEFAULT_IMAGE_PREFIX: &str = "penguin";

pub const ENGINE_VAR: &str = "PENGUIN_ENGINE";
pub const IMAGE_PREFIX_VAR: &str = "PENGUIN_IMAGE_PREFIX";

/// Penguin configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Container engine with a docker-compatible CLI
    pub engine: String,
    /// Namespace for image tags and instance names (`<prefix>-<recipe>`)
    pub image_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `base_dir/.env` and the environment.
    pub fn load(base_dir: &Path) -> Self {
        let mut vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if env_path.exists() {
            match dotenvy::from_path_iter(&env_path) {
                Ok(iter) => {
                    for item in iter {
                        match item {
                            Ok((key, value)) => {
                                vars.insert(key, value);
                            }
                            Err(e) => warn!(path = %env_path.display(), error = %e, "bad .env line"),
                        }
                    }
                }
                Err(e) => warn!(path = %env_path.display(), error = %e, "could not read .env"),
            }
        }

        // Environment variables override .env file
        vars.extend(std::env::vars());

        Self::from_vars(&vars)
    }

    /// Build a configuration from a variable map, filling in defaults.
    /// Empty values count as unset.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let get = |key: &str, default: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        Self {
            engine: get(ENGINE_VAR, DEFAULT_ENGINE),
            image_prefix: get(IMAGE_PREFIX_VAR, DEFAULT_IMAGE_PREFIX),
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  {}: {}", ENGINE_VAR, self.engine);
        println!("  {}: {}", IMAGE_PREFIX_VAR, self.image_prefix);
        match which::which(&self.engine) {
            Ok(path) => println!("  Engine: FOUND ({})", path.display()),
            Err(_) => println!("  Engine: NOT FOUND in PATH"),
        }
    }
}
