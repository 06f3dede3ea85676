//! The catalog boundary the tree engine depends on, plus an in-memory
//! implementation backed by configuration.

use std::collections::HashMap;
use std::fmt;

use super::entity::{Direction, Entity, EntityKey, Field, RelationKind, Relationship, RelationshipEdge};
use super::errors::{CatalogError, CatalogResult};

/// Read-only access to entity metadata.
///
/// Implementations must be cheap to query; the tree builder calls
/// `get_relationships` once per discovered node.
pub trait SchemaCatalog: Send + Sync + fmt::Debug {
    /// All entities, in declaration order.
    fn list_entities(&self) -> Vec<&Entity>;

    fn get_entity(&self, key: &EntityKey) -> CatalogResult<&Entity>;

    /// Fields of the entity. Proxies report the fields of their concrete entity.
    fn get_fields(&self, key: &EntityKey) -> CatalogResult<&[Field]>;

    /// Forward edges followed by derived reverse edges.
    fn get_relationships(&self, key: &EntityKey) -> CatalogResult<&[RelationshipEdge]>;

    /// Resolve `Name`, `namespace.Name` or (`Name`, namespace). Matching is
    /// case-insensitive; a bare name defined in several namespaces is ambiguous.
    fn resolve_entity_by_name(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> CatalogResult<&Entity> {
        let (name, namespace) = match (EntityKey::parse_qualified(name), namespace) {
            (Some(key), None) => (key.name, Some(key.namespace)),
            (Some(key), Some(ns)) => (key.name, Some(ns.to_string())),
            (None, ns) => (name.to_string(), ns.map(str::to_string)),
        };

        let mut matches: Vec<&Entity> = self
            .list_entities()
            .into_iter()
            .filter(|e| e.key.matches(&name, namespace.as_deref()))
            .collect();

        match matches.len() {
            0 => Err(CatalogError::EntityNotFound {
                name: match namespace {
                    Some(ns) => format!("{}.{}", ns, name),
                    None => name,
                },
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(CatalogError::AmbiguousEntityName {
                name,
                candidates: matches.iter().map(|e| e.key.to_string()).collect(),
            }),
        }
    }

    /// The entity whose table backs `key` (itself unless it is a proxy).
    fn concrete_key(&self, key: &EntityKey) -> CatalogResult<EntityKey> {
        let entity = self.get_entity(key)?;
        Ok(entity.proxy_of.clone().unwrap_or_else(|| entity.key.clone()))
    }
}

/// Catalog held entirely in memory. Reverse edges are derived once at
/// construction, in entity declaration order.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    entities: Vec<Entity>,
    index: HashMap<EntityKey, usize>,
    edges: Vec<Vec<RelationshipEdge>>,
}

impl InMemoryCatalog {
    pub fn new(entities: Vec<Entity>) -> CatalogResult<Self> {
        let mut index = HashMap::with_capacity(entities.len());
        for (pos, entity) in entities.iter().enumerate() {
            if index.insert(entity.key.clone(), pos).is_some() {
                return Err(CatalogError::invalid_config(format!(
                    "Duplicate entity: {}",
                    entity.key
                )));
            }
        }

        for entity in &entities {
            if let Some(concrete) = &entity.proxy_of {
                let target = index.get(concrete).map(|&pos| &entities[pos]).ok_or_else(|| {
                    CatalogError::invalid_config(format!(
                        "Proxy {} refers to unknown entity {}",
                        entity.key, concrete
                    ))
                })?;
                if target.is_proxy() {
                    return Err(CatalogError::invalid_config(format!(
                        "Proxy {} must refer to a concrete entity, {} is itself a proxy",
                        entity.key, concrete
                    )));
                }
            }
        }

        let mut forward: Vec<Vec<RelationshipEdge>> = vec![Vec::new(); entities.len()];
        let mut reverse: Vec<Vec<RelationshipEdge>> = vec![Vec::new(); entities.len()];

        for (pos, entity) in entities.iter().enumerate() {
            for rel in &entity.relationships {
                let target_pos = *index.get(&rel.target).ok_or_else(|| {
                    CatalogError::invalid_config(format!(
                        "Relationship {}.{} targets unknown entity {}",
                        entity.key, rel.name, rel.target
                    ))
                })?;
                forward[pos].push(forward_edge(&entity.key, &entity.key, rel));
                reverse[target_pos].push(reverse_edge(&entity.key, rel));
            }
        }

        // Proxies inherit the forward relationships of their concrete entity.
        for (pos, entity) in entities.iter().enumerate() {
            if let Some(concrete) = &entity.proxy_of {
                let concrete_entity = &entities[index[concrete]];
                for rel in &concrete_entity.relationships {
                    forward[pos].push(forward_edge(&entity.key, concrete, rel));
                }
            }
        }

        let edges = forward
            .into_iter()
            .zip(reverse)
            .map(|(mut f, r)| {
                f.extend(r);
                f
            })
            .collect();

        log::debug!("Catalog loaded with {} entities", entities.len());
        Ok(Self {
            entities,
            index,
            edges,
        })
    }

    fn position(&self, key: &EntityKey) -> CatalogResult<usize> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| CatalogError::EntityNotFound {
                name: key.to_string(),
            })
    }
}

impl SchemaCatalog for InMemoryCatalog {
    fn list_entities(&self) -> Vec<&Entity> {
        self.entities.iter().collect()
    }

    fn get_entity(&self, key: &EntityKey) -> CatalogResult<&Entity> {
        Ok(&self.entities[self.position(key)?])
    }

    fn get_fields(&self, key: &EntityKey) -> CatalogResult<&[Field]> {
        let entity = self.get_entity(key)?;
        match &entity.proxy_of {
            Some(concrete) => Ok(&self.get_entity(concrete)?.fields),
            None => Ok(&entity.fields),
        }
    }

    fn get_relationships(&self, key: &EntityKey) -> CatalogResult<&[RelationshipEdge]> {
        Ok(&self.edges[self.position(key)?])
    }
}

fn forward_edge(source: &EntityKey, declared_on: &EntityKey, rel: &Relationship) -> RelationshipEdge {
    RelationshipEdge {
        source: source.clone(),
        target: rel.target.clone(),
        declared_on: declared_on.clone(),
        field: rel.name.clone(),
        kind: rel.kind,
        direction: Direction::Forward,
        nullable: rel.kind == RelationKind::ManyToMany || rel.nullable,
        name: rel.name.clone(),
        accessor: rel.name.clone(),
        disabled: false,
        link: rel.link.clone(),
    }
}

fn reverse_edge(declared_on: &EntityKey, rel: &Relationship) -> RelationshipEdge {
    let (name, accessor) = reverse_names(declared_on, rel);
    RelationshipEdge {
        source: rel.target.clone(),
        target: declared_on.clone(),
        declared_on: declared_on.clone(),
        field: rel.name.clone(),
        kind: rel.kind,
        direction: Direction::Reverse,
        // the far side may have zero matches
        nullable: true,
        name,
        accessor,
        disabled: rel.reverse_disabled(),
        link: rel.link.clone(),
    }
}

/// Query name and accessor of the reverse side of `rel`.
fn reverse_names(declared_on: &EntityKey, rel: &Relationship) -> (String, String) {
    let explicit = rel
        .related_name
        .as_deref()
        .map(|name| name.trim_end_matches('+'))
        .filter(|name| !name.is_empty());

    match explicit {
        Some(name) => (name.to_string(), name.to_string()),
        None => {
            let lower = declared_on.name.to_lowercase();
            let accessor = match rel.kind {
                RelationKind::OneToOne => lower.clone(),
                RelationKind::ForeignKey | RelationKind::ManyToMany => format!("{}_set", lower),
            };
            (lower, accessor)
        }
    }
}
