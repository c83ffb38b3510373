//! Recipes assembled from YAML documents.
//!
//! A declarative recipe names other recipes in its `recipeList`. Entries
//! referencing a recipe by bare name are resolved by
//! [`DeclarativeRecipe::initialize`] once the environment has gathered the
//! full recipe list; entries with parameters are constructed eagerly
//! through the [`RecipeRegistry`]. A reference that resolves to nothing
//! fails the recipe's validation, naming the unknown recipe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_yaml::Mapping;

use crate::core::{RegraftError, Result};
use crate::recipe::{Recipe, Validated};

/// Constructor for a registered recipe type: parameters in, recipe out.
pub type RecipeConstructor = Arc<dyn Fn(&Mapping) -> Result<Arc<dyn Recipe>> + Send + Sync>;

/// Named recipe constructors. The analog of a classpath scan: the host
/// registers every recipe type it ships, and declarative documents can
/// then instantiate them with parameters.
#[derive(Default)]
pub struct RecipeRegistry {
    constructors: HashMap<String, RecipeConstructor>,
}

impl RecipeRegistry {
    pub fn new() -> RecipeRegistry {
        RecipeRegistry::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn(&Mapping) -> Result<Arc<dyn Recipe>> + Send + Sync + 'static,
    ) {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    pub fn construct(&self, name: &str, params: &Mapping) -> Result<Arc<dyn Recipe>> {
        match self.constructors.get(name) {
            Some(constructor) => constructor(params),
            None => Err(RegraftError::InvalidRecipe {
                name: name.to_string(),
                reason: "no recipe with this name is registered".to_string(),
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }
}

/// One `recipeList` entry.
pub(crate) enum DeclarativeEntry {
    /// A bare name, resolved against the environment's recipe list.
    Reference(String),
    /// A parameterized entry, constructed through the registry at load.
    Constructed(Arc<dyn Recipe>),
}

/// A recipe assembled from a YAML document.
pub struct DeclarativeRecipe {
    name: String,
    display_name: Option<String>,
    description: String,
    entries: Vec<DeclarativeEntry>,
    state: Mutex<InitState>,
}

#[derive(Default)]
struct InitState {
    initialized: bool,
    resolved: Vec<Arc<dyn Recipe>>,
    unresolved: Vec<String>,
}

impl DeclarativeRecipe {
    pub(crate) fn new(
        name: String,
        display_name: Option<String>,
        description: String,
        entries: Vec<DeclarativeEntry>,
    ) -> DeclarativeRecipe {
        DeclarativeRecipe {
            name,
            display_name,
            description,
            entries,
            state: Mutex::new(InitState::default()),
        }
    }

    /// Resolve name references against the full recipe list. Called by the
    /// environment after all loaders have contributed; until then the
    /// recipe fails validation.
    pub fn initialize(&self, all: &[Arc<dyn Recipe>]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.resolved.clear();
        state.unresolved.clear();
        for entry in &self.entries {
            match entry {
                DeclarativeEntry::Constructed(recipe) => {
                    state.resolved.push(Arc::clone(recipe));
                }
                DeclarativeEntry::Reference(name) => {
                    let found = all
                        .iter()
                        .find(|candidate| candidate.name() == name && name != &self.name);
                    match found {
                        Some(recipe) => state.resolved.push(Arc::clone(recipe)),
                        None => state.unresolved.push(name.clone()),
                    }
                }
            }
        }
        state.initialized = true;
    }
}

impl Recipe for DeclarativeRecipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate(&self) -> Validated {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.initialized {
            return Validated::invalid("recipeList", "recipe has not been initialized");
        }
        state
            .unresolved
            .iter()
            .fold(Validated::valid(), |acc, name| {
                acc.and(Validated::invalid(
                    "recipeList",
                    format!("recipe '{name}' does not exist"),
                ))
            })
    }

    fn recipe_list(&self) -> Vec<Arc<dyn Recipe>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resolved
            .clone()
    }
}

/// Read a string parameter from a recipe's YAML parameters.
pub fn param_str(params: &Mapping, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|value| value.as_str())
        .map(str::to_string)
}
