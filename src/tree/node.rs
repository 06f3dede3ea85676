use std::fmt;

use crate::schema_catalog::{EntityKey, RelationKind, RelationshipEdge};

/// Stable position of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One entity reachable from the root, annotated with the edge that reached it.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: NodeId,
    pub entity: EntityKey,
    pub table: String,
    pub primary_key: Vec<String>,
    pub parent: Option<NodeId>,
    /// Edge from the parent's entity to this one; `None` for the root.
    pub edge: Option<RelationshipEdge>,
    pub depth: usize,
    pub children: Vec<NodeId>,
    /// Leaf produced by a self-referential edge. Not part of the entity index.
    pub self_join: bool,
}

impl TreeNode {
    pub(crate) fn root(entity: EntityKey, table: String, primary_key: Vec<String>) -> Self {
        Self {
            id: NodeId::ROOT,
            entity,
            table,
            primary_key,
            parent: None,
            edge: None,
            depth: 0,
            children: Vec::new(),
            self_join: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn display_name(&self) -> &str {
        &self.entity.name
    }

    /// Lookup name used to get here from the parent.
    pub fn related_name(&self) -> Option<&str> {
        self.edge.as_ref().map(|e| e.name.as_str())
    }

    /// Accessor on the parent entity used to get here.
    pub fn accessor(&self) -> Option<&str> {
        self.edge.as_ref().map(|e| e.accessor.as_str())
    }

    pub fn relation(&self) -> Option<RelationKind> {
        self.edge.as_ref().map(|e| e.kind)
    }

    pub fn is_reverse(&self) -> bool {
        self.edge.as_ref().is_some_and(|e| e.is_reverse())
    }

    pub fn nullable(&self) -> bool {
        self.edge.as_ref().is_some_and(|e| e.nullable)
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeNode: {}", self.entity.name)?;
        if let Some(edge) = &self.edge {
            write!(f, " via {}", edge.source.name)?;
        }
        Ok(())
    }
}
