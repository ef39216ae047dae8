//! Static recipe registry.
//!
//! Components are registered explicitly, by identifier, in build order.
//! [`Registry::instantiate`] constructs one recipe per entry and rejects
//! inconsistent declarations before any sandbox is started.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::{Package, Recipe};
use crate::common::tree_relative;
use crate::error::{Error, Result};

/// Constructs a package. One call per registry entry per run.
pub type Constructor = fn() -> Box<dyn Package>;

/// A package with its declared recipe, ready for its build phase.
pub struct Prepared {
    pub package: Box<dyn Package>,
    pub recipe: Recipe,
}

impl Prepared {
    /// Run the package's build phase and hand back the finished recipe.
    pub fn into_built(self) -> Recipe {
        let Prepared {
            package,
            mut recipe,
        } = self;
        package.build(&mut recipe);
        recipe
    }
}

struct Claim {
    recipe: String,
    declared: String,
    is_output: bool,
}

/// Reject `relative` if a claimed path is its ancestor or its descendant.
fn check_nesting(claimed: &HashMap<PathBuf, Claim>, relative: &Path, claim: &Claim) -> Result<()> {
    let nested = |inner: &Claim, outer: &Claim| Error::NestedDeclaration {
        path: inner.declared.clone(),
        inner: inner.recipe.clone(),
        parent: outer.declared.clone(),
        outer: outer.recipe.clone(),
    };

    for ancestor in relative.ancestors().skip(1) {
        if let Some(outer) = claimed.get(ancestor) {
            return Err(nested(claim, outer));
        }
    }
    for (path, inner) in claimed {
        if path != relative && path.starts_with(relative) {
            return Err(nested(inner, claim));
        }
    }
    Ok(())
}

/// Ordered mapping from component identifier to constructor.
#[derive(Default)]
pub struct Registry {
    entries: Vec<(&'static str, Constructor)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component. Order of registration is build order.
    pub fn register(mut self, id: &'static str, constructor: Constructor) -> Self {
        self.entries.push((id, constructor));
        self
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Construct every registered package, in order, and validate them.
    ///
    /// Fails on duplicate identifiers, a recipe whose name differs from its
    /// identifier, declared paths escaping the root tree, two declarations
    /// claiming the same destination, and a declaration nested below
    /// another one (an output may be a directory, a symlink may point
    /// anywhere, so nothing can be placed underneath either).
    pub fn instantiate(&self) -> Result<Vec<Prepared>> {
        let mut seen = HashSet::new();
        let mut claimed: HashMap<PathBuf, Claim> = HashMap::new();
        let mut prepared = Vec::with_capacity(self.entries.len());

        for (id, constructor) in &self.entries {
            if !seen.insert(*id) {
                return Err(Error::DuplicateRecipe(id.to_string()));
            }

            let package = constructor();
            let recipe = package.recipe();
            if recipe.name() != *id {
                return Err(Error::NameMismatch {
                    id: id.to_string(),
                    name: recipe.name().to_string(),
                });
            }

            // Symlinks may be redeclared by later recipes (last one wins);
            // outputs may not overlap anything.
            let declared = recipe
                .outputs()
                .keys()
                .map(|dest| (dest, true))
                .chain(recipe.symlinks().keys().map(|link| (link, false)));
            for (dest, is_output) in declared {
                let relative = tree_relative(dest)?;
                if let Some(first) = claimed.get(&relative) {
                    if is_output || first.is_output {
                        return Err(Error::OutputConflict {
                            path: dest.clone(),
                            first: first.recipe.clone(),
                            second: id.to_string(),
                        });
                    }
                }

                let claim = Claim {
                    recipe: id.to_string(),
                    declared: dest.clone(),
                    is_output,
                };
                check_nesting(&claimed, &relative, &claim)?;
                claimed.insert(relative, claim);
            }

            prepared.push(Prepared { package, recipe });
        }

        Ok(prepared)
    }

    /// Construct and build a single registered recipe.
    pub fn prepare(&self, id: &str) -> Result<Recipe> {
        let (_, constructor) = self
            .entries
            .iter()
            .find(|(entry, _)| *entry == id)
            .ok_or_else(|| Error::UnknownRecipe(id.to_string()))?;

        let package = constructor();
        let recipe = package.recipe();
        Ok(Prepared { package, recipe }.into_built())
    }
}
