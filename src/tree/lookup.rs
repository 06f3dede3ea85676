//! Lookup strings: relationship paths joined by `__`, as consumed by a
//! query builder's filter and select keys.

use std::fmt;

use super::errors::{TreeError, TreeResult};
use super::node::TreeNode;
use super::Tree;
use crate::schema_catalog::{CatalogError, Direction, EntityKey, RelationshipEdge};

pub const LOOKUP_SEP: &str = "__";

/// A field reference to render as a lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    /// A field or forward relationship of an entity.
    Field { entity: EntityKey, name: String },
    /// A reverse relationship referenced directly; rendered by its own name.
    Reverse(RelationshipEdge),
}

impl FieldRef {
    pub fn new(entity: EntityKey, name: impl Into<String>) -> Self {
        FieldRef::Field {
            entity,
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Field { entity, name } => write!(f, "{}.{}", entity, name),
            FieldRef::Reverse(edge) => write!(f, "{}.{}", edge.source, edge.accessor),
        }
    }
}

/// Join the relationship names of `path`, then the field, then the operator.
pub fn render(path: &[&TreeNode], field: Option<&str>, operator: Option<&str>) -> String {
    path.iter()
        .filter_map(|node| node.related_name())
        .chain(field)
        .chain(operator)
        .collect::<Vec<_>>()
        .join(LOOKUP_SEP)
}

enum LocalName {
    Usable,
    Disabled,
    Missing,
}

impl Tree {
    /// Lookup prefix reaching `target`; empty for the root.
    pub fn query_string(&self, target: &EntityKey) -> TreeResult<String> {
        let path = self.resolve_path(target, None)?;
        Ok(render(&path, None, None))
    }

    /// Field reference for `name` on `entity`: a column-backed field, a
    /// forward relationship, or a reverse relationship (by query name or
    /// accessor).
    pub fn field(&self, entity: &EntityKey, name: &str) -> TreeResult<FieldRef> {
        let catalog = self.catalog();
        if catalog.get_fields(entity)?.iter().any(|f| f.name == name) {
            return Ok(FieldRef::new(entity.clone(), name));
        }

        let edges = catalog.get_relationships(entity)?;
        if edges
            .iter()
            .any(|e| e.direction == Direction::Forward && e.name == name)
        {
            return Ok(FieldRef::new(entity.clone(), name));
        }
        if let Some(edge) = edges
            .iter()
            .find(|e| e.is_reverse() && (e.accessor == name || e.name == name))
        {
            return Ok(FieldRef::Reverse(edge.clone()));
        }

        Err(CatalogError::FieldNotFound {
            entity: entity.to_string(),
            field: name.to_string(),
        }
        .into())
    }

    /// Render `field` relative to the root. `via` picks the tree entity to
    /// route through when the field's entity has proxy representations.
    pub fn render_lookup(
        &self,
        field: &FieldRef,
        operator: Option<&str>,
        via: Option<&EntityKey>,
    ) -> TreeResult<String> {
        match field {
            FieldRef::Reverse(edge) => {
                if edge.disabled {
                    return Err(TreeError::invalid_lookup(
                        field.to_string(),
                        "reverse accessor is disabled",
                    ));
                }
                Ok(render(&[], Some(&edge.name), operator))
            }
            FieldRef::Field { entity, name } => {
                let path = self.resolve_path(entity, via)?;
                Ok(render(&path, Some(name), operator))
            }
        }
    }

    /// Rewrite a user lookup into one relative to the root.
    ///
    /// Names of the root's own fields and relationships pass through
    /// unchanged. Otherwise the first token (after an optional namespace
    /// token) names an entity in the tree and is replaced by the path to it:
    /// on a tree rooted at Office, `title__salary` becomes
    /// `employee__title__salary`.
    pub fn resolve_lookup(&self, lookup: &str) -> TreeResult<String> {
        let tokens: Vec<&str> = lookup.split(LOOKUP_SEP).collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(TreeError::invalid_lookup(lookup, "empty lookup segment"));
        }

        let mut rest = tokens.as_slice();
        let mut namespace = None;
        loop {
            match self.local_name(self.root_entity(), rest[0])? {
                LocalName::Usable => return Ok(rest.join(LOOKUP_SEP)),
                LocalName::Disabled => {
                    return Err(TreeError::invalid_lookup(lookup, "reverse accessor is disabled"))
                }
                LocalName::Missing => {}
            }
            if namespace.is_none() && rest.len() > 1 && self.is_namespace(rest[0]) {
                namespace = Some(rest[0]);
                rest = &rest[1..];
                continue;
            }
            break;
        }

        let entity = match self.entity_in(rest[0], namespace) {
            Ok(entity) => entity,
            Err(TreeError::Catalog(CatalogError::EntityNotFound { .. })) => {
                return Err(TreeError::invalid_lookup(
                    lookup,
                    format!("no field or related entity named `{}`", rest[0]),
                ))
            }
            Err(TreeError::EntityNotInTree { entity, .. }) => {
                return Err(TreeError::invalid_lookup(
                    lookup,
                    format!("`{}` is not reachable from this tree", entity),
                ))
            }
            Err(e) => return Err(e),
        };

        if entity == *self.root_entity() {
            return Err(TreeError::invalid_lookup(
                lookup,
                "refers to the root entity; use its fields directly",
            ));
        }

        let path = self.resolve_path(&entity, None)?;
        let tail = &rest[1..];
        if let Some(first) = tail.first() {
            match self.local_name(&entity, first)? {
                LocalName::Usable => {}
                LocalName::Disabled => {
                    return Err(TreeError::invalid_lookup(lookup, "reverse accessor is disabled"))
                }
                LocalName::Missing => {
                    return Err(TreeError::invalid_lookup(
                        lookup,
                        format!("{} has no field named `{}`", entity, first),
                    ))
                }
            }
        }

        let prefix = render(&path, None, None);
        Ok(std::iter::once(prefix.as_str())
            .chain(tail.iter().copied())
            .collect::<Vec<_>>()
            .join(LOOKUP_SEP))
    }

    /// Classify `name` as a field or relationship of `entity`. Enabled
    /// relationships win over a disabled one with the same name.
    fn local_name(&self, entity: &EntityKey, name: &str) -> TreeResult<LocalName> {
        let catalog = self.catalog();
        if catalog.get_fields(entity)?.iter().any(|f| f.name == name) {
            return Ok(LocalName::Usable);
        }
        let mut disabled = false;
        for edge in catalog.get_relationships(entity)? {
            if edge.name == name {
                if !edge.disabled {
                    return Ok(LocalName::Usable);
                }
                disabled = true;
            }
        }
        Ok(if disabled {
            LocalName::Disabled
        } else {
            LocalName::Missing
        })
    }

    fn is_namespace(&self, token: &str) -> bool {
        self.nodes()
            .any(|n| n.entity.namespace.eq_ignore_ascii_case(token))
    }
}
