//! Show command - displays information.

use anyhow::Result;

use crate::config::Config;
use crate::packages;
use crate::recipe::BuildSpec;

/// Show target for the show command.
pub enum ShowTarget {
    /// List registered recipes in build order
    Recipes,
    /// Print the generated build spec of one recipe
    Spec { name: String },
    /// Show configuration
    Config,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    let registry = packages::registry();

    match target {
        ShowTarget::Recipes => {
            for id in registry.ids() {
                let recipe = registry.prepare(id)?;
                let version = match recipe.version_str() {
                    "" => "-",
                    v => v,
                };
                println!(
                    "{:<12} {:<10} {}",
                    recipe.name(),
                    version,
                    recipe.source_url().unwrap_or("(no source)")
                );
            }
        }
        ShowTarget::Spec { name } => {
            let recipe = registry.prepare(&name)?;
            print!("{}", BuildSpec::generate(&recipe)?);
        }
        ShowTarget::Config => config.print(),
    }
    Ok(())
}
