//! Schema trees.
//!
//! A [`Tree`] is a rooted spanning tree over the entities reachable from one
//! root entity. It gives every reachable entity exactly one path from the
//! root, which is then turned into join descriptors ([`joins`]) or lookup
//! strings ([`lookup`]).
//!
//! ```ignore
//! let tree = Tree::for_root(catalog, "tests.Office")?;
//! let title = tree.entity("Title")?;
//! let path = tree.resolve_path(&title, None)?;        // [Employee, Title]
//! let joins = tree.synthesize_joins(&title, None)?;   // office -> employee -> title
//! ```

pub mod builder;
pub mod errors;
pub mod filter;
pub mod joins;
pub mod lookup;
pub mod node;
pub mod path;
pub mod preview;
pub mod routes;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::schema_catalog::{CatalogError, Entity, EntityKey, SchemaCatalog};
use builder::TreeBuilder;
pub use errors::{TreeError, TreeResult};
pub use filter::LookupFilter;
pub use joins::{JoinDescriptor, JoinKind, JoinPlan, SelectPlan};
pub use lookup::{FieldRef, LOOKUP_SEP};
pub use node::{NodeId, TreeNode};
pub use routes::{
    RequiredSource, Route, RouteDefinition, RoutePolicy, RouteRules, RouterChain, TreeDefinition,
    TreeRouter,
};

/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Tree {
    catalog: Arc<dyn SchemaCatalog>,
    router: TreeRouter,
    nodes: Vec<TreeNode>,
    index: HashMap<EntityKey, NodeId>,
}

impl Tree {
    pub fn build(
        catalog: Arc<dyn SchemaCatalog>,
        router: TreeRouter,
        max_depth: Option<usize>,
    ) -> TreeResult<Self> {
        let built = TreeBuilder::new(catalog.as_ref(), &router, max_depth).build()?;
        Ok(Self {
            catalog,
            router,
            nodes: built.nodes,
            index: built.index,
        })
    }

    pub fn from_definition(catalog: Arc<dyn SchemaCatalog>, def: &TreeDefinition) -> TreeResult<Self> {
        let router = TreeRouter::from_definition(def, catalog.as_ref())?;
        Self::build(catalog, router, def.max_depth)
    }

    /// Tree with no routing rules for a bare or qualified entity name.
    pub fn for_root(catalog: Arc<dyn SchemaCatalog>, root: &str) -> TreeResult<Self> {
        Self::from_definition(catalog, &TreeDefinition::for_root(root))
    }

    pub fn catalog(&self) -> &dyn SchemaCatalog {
        self.catalog.as_ref()
    }

    pub fn router(&self) -> &TreeRouter {
        &self.router
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn root_entity(&self) -> &EntityKey {
        &self.root().entity
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// All nodes in pre-order, self-join leaves included.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &TreeNode> {
        self.nodes[id.0].children.iter().map(|c| &self.nodes[c.0])
    }

    /// Number of entities in the index.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, entity: &EntityKey) -> bool {
        self.index.contains_key(entity)
    }

    /// The node of `entity`, if reachable.
    pub fn node_for(&self, entity: &EntityKey) -> TreeResult<&TreeNode> {
        self.index
            .get(entity)
            .map(|id| &self.nodes[id.0])
            .ok_or_else(|| self.not_in_tree(entity))
    }

    /// Resolve a bare or qualified name against the entities of this tree.
    /// Names that are valid in the catalog but unreachable here fail with
    /// `EntityNotInTree`.
    pub fn entity(&self, name: &str) -> TreeResult<EntityKey> {
        self.entity_in(name, None)
    }

    pub fn entity_in(&self, name: &str, namespace: Option<&str>) -> TreeResult<EntityKey> {
        let (name, namespace) = match EntityKey::parse_qualified(name) {
            Some(key) => (key.name, Some(namespace.map_or(key.namespace, str::to_string))),
            None => (name.to_string(), namespace.map(str::to_string)),
        };

        let mut local: Vec<&EntityKey> = self
            .index
            .keys()
            .filter(|k| k.matches(&name, namespace.as_deref()))
            .collect();
        local.sort();

        match local.as_slice() {
            [only] => Ok((*only).clone()),
            [] => {
                let entity = self
                    .catalog
                    .resolve_entity_by_name(&name, namespace.as_deref())?;
                Err(self.not_in_tree(&entity.key))
            }
            many => Err(CatalogError::AmbiguousEntityName {
                name,
                candidates: many.iter().map(|k| k.to_string()).collect(),
            }
            .into()),
        }
    }

    pub(crate) fn entity_meta(&self, key: &EntityKey) -> TreeResult<&Entity> {
        Ok(self.catalog.get_entity(key)?)
    }

    pub(crate) fn not_in_tree(&self, entity: &EntityKey) -> TreeError {
        TreeError::EntityNotInTree {
            entity: entity.to_string(),
            root: self.root_entity().to_string(),
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&preview::render(self))
    }
}
