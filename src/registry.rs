//! Build-once cache of trees, keyed by alias.
//!
//! Aliases come from the `trees:` section of the catalog configuration. Any
//! other alias is taken as an entity name and gets a tree with no routing
//! rules. Building happens under a single lock so concurrent first access
//! never produces duplicate or partial trees; built trees are shared as
//! `Arc<Tree>`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::EngineConfig;
use crate::schema_catalog::{CatalogConfig, EntityKey, SchemaCatalog};
use crate::tree::{Tree, TreeDefinition, TreeError, TreeResult};

pub const DEFAULT_TREE_ALIAS: &str = "default";

/// Cache slot of a built tree. Configured aliases and entity roots never
/// share a slot, even when an alias is spelled like a qualified entity name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TreeKey {
    Alias(String),
    Entity(EntityKey),
}

impl fmt::Display for TreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeKey::Alias(alias) => write!(f, "{}", alias),
            TreeKey::Entity(key) => write!(f, "{}", key),
        }
    }
}

#[derive(Debug)]
pub struct TreeRegistry {
    catalog: Arc<dyn SchemaCatalog>,
    definitions: HashMap<String, TreeDefinition>,
    default_alias: String,
    max_depth: Option<usize>,
    self_joins: bool,
    trees: Mutex<HashMap<TreeKey, Arc<Tree>>>,
}

impl TreeRegistry {
    pub fn new(catalog: Arc<dyn SchemaCatalog>, definitions: HashMap<String, TreeDefinition>) -> Self {
        Self {
            catalog,
            definitions,
            default_alias: DEFAULT_TREE_ALIAS.to_string(),
            max_depth: None,
            self_joins: true,
            trees: Mutex::new(HashMap::new()),
        }
    }

    /// Registry over a loaded catalog configuration, capped by engine settings.
    pub fn from_config(config: &CatalogConfig, engine: &EngineConfig) -> TreeResult<Self> {
        let catalog = config.build_catalog()?;
        let mut registry = Self::new(Arc::new(catalog), config.trees.clone());
        registry.default_alias = engine.default_tree.clone();
        registry.max_depth = Some(engine.max_depth);
        registry.self_joins = engine.self_joins;
        Ok(registry)
    }

    pub fn with_default_alias(mut self, alias: impl Into<String>) -> Self {
        self.default_alias = alias.into();
        self
    }

    pub fn catalog(&self) -> Arc<dyn SchemaCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn default_alias(&self) -> &str {
        &self.default_alias
    }

    pub fn get_or_build_default(&self) -> TreeResult<Arc<Tree>> {
        let alias = self.default_alias.clone();
        self.get_or_build(&alias)
    }

    /// The tree for `alias`, building it on first use.
    pub fn get_or_build(&self, alias: &str) -> TreeResult<Arc<Tree>> {
        let (key, definition) = self.definition(alias)?;

        let mut trees = self.trees.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tree) = trees.get(&key) {
            return Ok(Arc::clone(tree));
        }

        log::debug!("Building tree '{}' rooted at {}", key, definition.root);
        let tree = Arc::new(Tree::from_definition(Arc::clone(&self.catalog), &definition)?);
        trees.insert(key, Arc::clone(&tree));
        Ok(tree)
    }

    /// Replace the definition for `alias`; a cached tree for it is dropped
    /// and rebuilt on next use.
    pub fn register(&mut self, alias: impl Into<String>, definition: TreeDefinition) {
        let alias = alias.into();
        self.invalidate(&alias);
        self.definitions.insert(alias, definition);
    }

    /// Drop the cached tree `alias` resolves to. Entity names drop the tree
    /// cached under their qualified key.
    pub fn invalidate(&self, alias: &str) -> bool {
        let key = match self.tree_key(alias) {
            Ok(key) => key,
            Err(_) => return false,
        };
        self.trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    pub fn clear(&self) {
        self.trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn cached_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(TreeKey::to_string)
            .collect();
        aliases.sort();
        aliases
    }

    /// Cache slot for `alias`: configured trees first, then entity names.
    fn tree_key(&self, alias: &str) -> TreeResult<TreeKey> {
        if self.definitions.contains_key(alias) {
            return Ok(TreeKey::Alias(alias.to_string()));
        }
        if alias == self.default_alias {
            return Err(TreeError::UnknownTree {
                alias: alias.to_string(),
            });
        }
        let entity = self.catalog.resolve_entity_by_name(alias, None)?;
        Ok(TreeKey::Entity(entity.key.clone()))
    }

    /// Cache slot and effective definition for `alias`.
    fn definition(&self, alias: &str) -> TreeResult<(TreeKey, TreeDefinition)> {
        let key = self.tree_key(alias)?;
        let mut definition = match &key {
            TreeKey::Alias(alias) => self
                .definitions
                .get(alias)
                .cloned()
                .ok_or_else(|| TreeError::UnknownTree {
                    alias: alias.clone(),
                })?,
            TreeKey::Entity(entity) => TreeDefinition::for_root(entity.to_string()),
        };

        if let Some(cap) = self.max_depth {
            definition.max_depth = Some(definition.max_depth.map_or(cap, |d| d.min(cap)));
        }
        definition.self_joins &= self.self_joins;
        Ok((key, definition))
    }
}
