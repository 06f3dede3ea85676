//! Path resolution: the nodes between the root and an entity.

use super::errors::{TreeError, TreeResult};
use super::node::{NodeId, TreeNode};
use super::Tree;
use crate::schema_catalog::EntityKey;

impl Tree {
    /// Nodes from just below the root down to `target`, root excluded. An
    /// empty path means `target` is the root.
    ///
    /// `via` selects which tree entity to resolve against when `target` has
    /// several representations (proxies of one concrete entity); it must be
    /// backed by the same concrete entity as `target`.
    pub fn resolve_path(&self, target: &EntityKey, via: Option<&EntityKey>) -> TreeResult<Vec<&TreeNode>> {
        let key = match via {
            Some(via) if via != target => {
                let catalog = self.catalog();
                if catalog.concrete_key(via)? != catalog.concrete_key(target)? {
                    return Err(TreeError::invalid_lookup(
                        target.to_string(),
                        format!("{} is not a representation of {}", via, target),
                    ));
                }
                via
            }
            _ => target,
        };

        let node = self.node_for(key)?;
        Ok(self.path_to(node.id))
    }

    /// Path ending at the self-join leaf reached from `entity` through `accessor`.
    pub fn self_join_path(&self, entity: &EntityKey, accessor: &str) -> TreeResult<Vec<&TreeNode>> {
        let node = self.node_for(entity)?;
        let leaf = self
            .children(node.id)
            .find(|c| c.self_join && c.accessor() == Some(accessor))
            .ok_or_else(|| {
                TreeError::invalid_lookup(
                    format!("{}.{}", entity, accessor),
                    "no self-join with this accessor in the tree",
                )
            })?;
        Ok(self.path_to(leaf.id))
    }

    pub(crate) fn path_to(&self, id: NodeId) -> Vec<&TreeNode> {
        let mut path = Vec::new();
        let mut current = self.node(id);
        while let Some(parent) = current.parent {
            path.push(current);
            current = self.node(parent);
        }
        path.reverse();
        path
    }
}
