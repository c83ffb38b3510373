//! The recipe environment: aggregates recipe and style sources, resolves
//! declarative references, and activates recipes by name.
//!
//! An [`Environment`] owns a list of [`ResourceLoader`]s. The
//! [`RegistryLoader`] contributes recipes the host instantiated directly
//! (the classpath-scan analog); [`YamlResourceLoader`] contributes
//! declarative recipes and styles parsed from YAML documents. After all
//! loaders are gathered, declarative recipes are initialized against the
//! full recipe list so bare-name references resolve across sources.
//!
//! `activate_recipes` chains matches in input order. Names that match
//! nothing are skipped with a warning rather than failing the activation,
//! so the condition stays visible without changing the API.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::core::{RegraftError, Result};
use crate::recipe::declarative::DeclarativeEntry;
use crate::recipe::{CompositeRecipe, DeclarativeRecipe, Recipe, RecipeRegistry};

const RECIPE_DOC_TYPE: &str = "specs.openrewrite.org/v1beta/recipe";
const STYLE_DOC_TYPE: &str = "specs.openrewrite.org/v1beta/style";

/// A named style descriptor, activated by name like recipes are.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedStyle {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// The document's remaining keys, kept verbatim for the consumer.
    pub settings: Mapping,
}

/// A recipe as produced by a loader.
pub enum LoadedRecipe {
    /// Ready to run as loaded.
    Ready(Arc<dyn Recipe>),
    /// Needs initialization against the full recipe list.
    Declarative(Arc<DeclarativeRecipe>),
}

/// A source of recipes and styles.
pub trait ResourceLoader: Send + Sync {
    fn recipes(&self) -> Vec<LoadedRecipe>;

    fn styles(&self) -> Vec<NamedStyle> {
        Vec::new()
    }
}

/// Loader over recipes the host constructed programmatically.
#[derive(Default)]
pub struct RegistryLoader {
    recipes: Vec<Arc<dyn Recipe>>,
}

impl RegistryLoader {
    pub fn new() -> RegistryLoader {
        RegistryLoader::default()
    }

    pub fn with_recipe(mut self, recipe: Arc<dyn Recipe>) -> RegistryLoader {
        self.recipes.push(recipe);
        self
    }
}

impl ResourceLoader for RegistryLoader {
    fn recipes(&self) -> Vec<LoadedRecipe> {
        self.recipes
            .iter()
            .map(|recipe| LoadedRecipe::Ready(Arc::clone(recipe)))
            .collect()
    }
}

/// Loader over declarative YAML documents.
pub struct YamlResourceLoader {
    recipes: Vec<Arc<DeclarativeRecipe>>,
    styles: Vec<NamedStyle>,
}

impl YamlResourceLoader {
    /// Parse one YAML source (possibly multi-document). `source` names the
    /// origin in errors. Parameter values may reference `${key}` entries of
    /// `properties`; parameterized `recipeList` entries are constructed
    /// through `registry`.
    pub fn new(
        yaml: &str,
        source: &str,
        properties: &HashMap<String, String>,
        registry: &RecipeRegistry,
    ) -> Result<YamlResourceLoader> {
        use serde::Deserialize;

        let mut recipes = Vec::new();
        let mut styles = Vec::new();

        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            let doc_type = value.get("type").and_then(Value::as_str).unwrap_or("");
            match doc_type {
                RECIPE_DOC_TYPE => recipes.push(Arc::new(parse_recipe_document(
                    &value, source, properties, registry,
                )?)),
                STYLE_DOC_TYPE => styles.push(parse_style_document(&value, source)?),
                other => {
                    warn!(source, doc_type = other, "skipping document of unknown type");
                }
            }
        }

        Ok(YamlResourceLoader { recipes, styles })
    }
}

impl ResourceLoader for YamlResourceLoader {
    fn recipes(&self) -> Vec<LoadedRecipe> {
        self.recipes
            .iter()
            .map(|recipe| LoadedRecipe::Declarative(Arc::clone(recipe)))
            .collect()
    }

    fn styles(&self) -> Vec<NamedStyle> {
        self.styles.clone()
    }
}

fn doc_name(value: &Value, source: &str) -> Result<String> {
    value
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RegraftError::InvalidRecipe {
            name: source.to_string(),
            reason: "document has no name".to_string(),
        })
}

fn parse_recipe_document(
    value: &Value,
    source: &str,
    properties: &HashMap<String, String>,
    registry: &RecipeRegistry,
) -> Result<DeclarativeRecipe> {
    let name = doc_name(value, source)?;
    let display_name = value
        .get("displayName")
        .and_then(Value::as_str)
        .map(str::to_string);
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let mut entries = Vec::new();
    if let Some(list) = value.get("recipeList").and_then(Value::as_sequence) {
        for entry in list {
            match entry {
                Value::String(reference) => {
                    entries.push(DeclarativeEntry::Reference(reference.clone()));
                }
                Value::Mapping(mapping) if mapping.len() == 1 => {
                    let Some((key, params)) = mapping.iter().next() else {
                        continue;
                    };
                    let recipe_name =
                        key.as_str().ok_or_else(|| RegraftError::InvalidRecipe {
                            name: name.clone(),
                            reason: "recipeList entry key is not a string".to_string(),
                        })?;
                    let params = match params {
                        Value::Mapping(params) => substitute_params(params, properties),
                        Value::Null => Mapping::new(),
                        _ => {
                            return Err(RegraftError::InvalidRecipe {
                                name: name.clone(),
                                reason: format!(
                                    "parameters of '{recipe_name}' must be a mapping"
                                ),
                            })
                        }
                    };
                    entries.push(DeclarativeEntry::Constructed(
                        registry.construct(recipe_name, &params)?,
                    ));
                }
                _ => {
                    return Err(RegraftError::InvalidRecipe {
                        name: name.clone(),
                        reason: "recipeList entries must be a name or a single-key mapping"
                            .to_string(),
                    })
                }
            }
        }
    }

    Ok(DeclarativeRecipe::new(name, display_name, description, entries))
}

fn parse_style_document(value: &Value, source: &str) -> Result<NamedStyle> {
    let name = doc_name(value, source)?;
    let mut settings = Mapping::new();
    if let Some(mapping) = value.as_mapping() {
        for (key, entry) in mapping {
            let keep = !matches!(
                key.as_str(),
                Some("type" | "name" | "displayName" | "description")
            );
            if keep {
                settings.insert(key.clone(), entry.clone());
            }
        }
    }
    Ok(NamedStyle {
        name,
        display_name: value
            .get("displayName")
            .and_then(Value::as_str)
            .map(str::to_string),
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        settings,
    })
}

/// Replace `${key}` references in string parameter values.
fn substitute_params(params: &Mapping, properties: &HashMap<String, String>) -> Mapping {
    let mut out = Mapping::new();
    for (key, value) in params {
        let value = match value {
            Value::String(text) => Value::String(substitute_properties(text, properties)),
            other => other.clone(),
        };
        out.insert(key.clone(), value);
    }
    out
}

fn substitute_properties(text: &str, properties: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match properties.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Aggregates loaders and activates recipes and styles by name.
pub struct Environment {
    loaders: Vec<Box<dyn ResourceLoader>>,
}

impl Environment {
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::new()
    }

    /// Every recipe from every loader, declarative recipes initialized
    /// against the full list.
    pub fn list_recipes(&self) -> Vec<Arc<dyn Recipe>> {
        let mut all: Vec<Arc<dyn Recipe>> = Vec::new();
        let mut declarative = Vec::new();
        for loader in &self.loaders {
            for loaded in loader.recipes() {
                match loaded {
                    LoadedRecipe::Ready(recipe) => all.push(recipe),
                    LoadedRecipe::Declarative(recipe) => {
                        all.push(Arc::clone(&recipe) as Arc<dyn Recipe>);
                        declarative.push(recipe);
                    }
                }
            }
        }
        for recipe in &declarative {
            recipe.initialize(&all);
        }
        all
    }

    /// Chain the named recipes, in input order, under one root recipe.
    /// Unmatched names are skipped with a warning.
    pub fn activate_recipes<I, S>(&self, names: I) -> CompositeRecipe
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let recipes = self.list_recipes();
        let mut root = CompositeRecipe::new("regraft.ActiveRecipes");
        for name in names {
            let name = name.as_ref();
            match recipes.iter().find(|recipe| recipe.name() == name) {
                Some(recipe) => root = root.do_next(Arc::clone(recipe)),
                None => warn!(recipe = name, "active recipe matched nothing; skipping"),
            }
        }
        root
    }

    pub fn list_styles(&self) -> Vec<NamedStyle> {
        self.loaders
            .iter()
            .flat_map(|loader| loader.styles())
            .collect()
    }

    /// The named styles, in input order; unmatched names are skipped with
    /// a warning.
    pub fn activate_styles<I, S>(&self, names: I) -> Vec<NamedStyle>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let styles = self.list_styles();
        let mut activated = Vec::new();
        for name in names {
            let name = name.as_ref();
            match styles.iter().find(|style| style.name == name) {
                Some(style) => activated.push(style.clone()),
                None => warn!(style = name, "active style matched nothing; skipping"),
            }
        }
        activated
    }
}

/// Builder for [`Environment`]. Set properties and the registry before
/// loading YAML sources that depend on them.
pub struct EnvironmentBuilder {
    properties: HashMap<String, String>,
    registry: RecipeRegistry,
    loaders: Vec<Box<dyn ResourceLoader>>,
}

impl EnvironmentBuilder {
    fn new() -> EnvironmentBuilder {
        EnvironmentBuilder {
            properties: HashMap::new(),
            registry: RecipeRegistry::new(),
            loaders: Vec::new(),
        }
    }

    /// Properties substituted into `${key}` references in declarative
    /// recipe parameters.
    pub fn with_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    /// The registry used to construct parameterized `recipeList` entries.
    pub fn with_registry(mut self, registry: RecipeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn load(mut self, loader: impl ResourceLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Parse a YAML source with the current properties and registry.
    pub fn load_yaml(mut self, yaml: &str, source: &str) -> Result<Self> {
        let loader = YamlResourceLoader::new(yaml, source, &self.properties, &self.registry)?;
        self.loaders.push(Box::new(loader));
        Ok(self)
    }

    /// Load `~/.regraft/regraft.yml` when present; absent is not an error.
    pub fn scan_user_home(self) -> Result<Self> {
        let Some(path) = user_home_config() else {
            return Ok(self);
        };
        if !path.is_file() {
            return Ok(self);
        }
        let yaml = std::fs::read_to_string(&path)?;
        self.load_yaml(&yaml, &path.display().to_string())
    }

    pub fn build(self) -> Environment {
        Environment {
            loaders: self.loaders,
        }
    }
}

fn user_home_config() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)?;
    Some(home.join(".regraft").join("regraft.yml"))
}
