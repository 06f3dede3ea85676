//! Tree construction.
//!
//! Relations are discovered depth-first in pre-order. Each node expands its
//! edges many-to-many first, then one-to-one, then foreign keys (forward
//! before reverse within each kind), so a many-to-many bridge is never
//! claimed as a plain foreign-key child.
//!
//! An entity keeps the shallowest claim. When a shallower path turns up
//! later, the old node is detached from its parent together with its subtree
//! and the entity is rediscovered from the new node. Detached nodes stay in
//! the arena until the build finishes and are then dropped by compaction.

use std::collections::HashMap;

use super::errors::TreeResult;
use super::node::{NodeId, TreeNode};
use super::routes::TreeRouter;
use crate::schema_catalog::{EntityKey, RelationshipEdge, SchemaCatalog};

pub(crate) struct BuiltTree {
    pub nodes: Vec<TreeNode>,
    pub index: HashMap<EntityKey, NodeId>,
}

pub(crate) struct TreeBuilder<'a> {
    catalog: &'a dyn SchemaCatalog,
    router: &'a TreeRouter,
    max_depth: Option<usize>,
    nodes: Vec<TreeNode>,
    attached: Vec<bool>,
    claims: HashMap<EntityKey, NodeId>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog, router: &'a TreeRouter, max_depth: Option<usize>) -> Self {
        Self {
            catalog,
            router,
            max_depth,
            nodes: Vec::new(),
            attached: Vec::new(),
            claims: HashMap::new(),
        }
    }

    pub fn build(mut self) -> TreeResult<BuiltTree> {
        let root = self.catalog.get_entity(self.router.root())?;
        let root_node = TreeNode::root(root.key.clone(), root.table.clone(), root.primary_key_columns());
        self.nodes.push(root_node);
        self.attached.push(true);
        self.claims.insert(root.key.clone(), NodeId::ROOT);

        self.discover(NodeId::ROOT)?;

        let built = self.compact();
        log::info!(
            "Built tree rooted at {} with {} nodes",
            self.router.root(),
            built.nodes.len()
        );
        Ok(built)
    }

    fn discover(&mut self, id: NodeId) -> TreeResult<()> {
        let entity = self.nodes[id.0].entity.clone();
        let depth = self.nodes[id.0].depth + 1;
        if self.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        let mut edges: Vec<RelationshipEdge> = self.catalog.get_relationships(&entity)?.to_vec();
        edges.sort_by_key(RelationshipEdge::discovery_rank);

        for edge in edges {
            if edge.disabled {
                continue;
            }

            if edge.is_self_referential() {
                if self.router.allow_self_join(&entity, &edge.accessor) {
                    self.add_self_join(id, edge, depth)?;
                }
                continue;
            }

            if !self
                .router
                .allow(&edge.source, &edge.target, Some(&edge.accessor))
            {
                continue;
            }

            if let Some(&existing) = self.claims.get(&edge.target) {
                let current = &self.nodes[existing.0];
                if self.attached[existing.0] {
                    if current.depth <= depth {
                        continue;
                    }
                    log::debug!(
                        "Replacing {} at depth {} with shallower path via {} at depth {}",
                        edge.target,
                        current.depth,
                        edge.source,
                        depth
                    );
                    self.detach(existing);
                }
            }

            let child = self.add_node(id, edge, depth)?;
            self.claims.insert(self.nodes[child.0].entity.clone(), child);
            self.discover(child)?;
        }

        Ok(())
    }

    fn add_node(&mut self, parent: NodeId, edge: RelationshipEdge, depth: usize) -> TreeResult<NodeId> {
        let target = self.catalog.get_entity(&edge.target)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            id,
            entity: target.key.clone(),
            table: target.table.clone(),
            primary_key: target.primary_key_columns(),
            parent: Some(parent),
            edge: Some(edge),
            depth,
            children: Vec::new(),
            self_join: false,
        });
        self.attached.push(true);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    fn add_self_join(&mut self, parent: NodeId, edge: RelationshipEdge, depth: usize) -> TreeResult<()> {
        let id = self.add_node(parent, edge, depth)?;
        self.nodes[id.0].self_join = true;
        Ok(())
    }

    /// Unlink a node from its parent and mark its whole subtree detached.
    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            self.attached[next.0] = false;
            stack.extend(self.nodes[next.0].children.iter().copied());
        }
    }

    /// Renumber attached nodes in pre-order and rebuild the index from them.
    fn compact(&mut self) -> BuiltTree {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }

        let remap: HashMap<NodeId, NodeId> = order
            .iter()
            .enumerate()
            .map(|(pos, old)| (*old, NodeId(pos)))
            .collect();

        let nodes: Vec<TreeNode> = order
            .iter()
            .map(|old| {
                let mut node = self.nodes[old.0].clone();
                node.id = remap[old];
                node.parent = node.parent.map(|p| remap[&p]);
                node.children = node.children.iter().map(|c| remap[c]).collect();
                node
            })
            .collect();

        let mut index = HashMap::with_capacity(self.claims.len());
        for (entity, claim) in &self.claims {
            match remap.get(claim) {
                Some(id) => {
                    index.insert(entity.clone(), *id);
                }
                None => log::warn!("Dropping detached claim for {} after tree build", entity),
            }
        }

        BuiltTree { nodes, index }
    }
}
