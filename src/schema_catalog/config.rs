use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use super::catalog::InMemoryCatalog;
use super::entity::{
    EdgeLink, Entity, EntityKey, Field, Identifier, RelationKind, Relationship, ThroughTable,
};
use super::errors::{CatalogError, CatalogResult};
use crate::tree::routes::TreeDefinition;

/// Catalog configuration management.
///
/// Entities and the trees built over them are defined in YAML (or JSON) with
/// the following structure:
///
/// ```yaml
/// name: company              # Configuration name
/// schema:
///   entities:
///     - namespace: tests
///       name: Employee
///       table: tests_employee  # default "<namespace>_<name lowercase>"
///       primary_key: id        # single column or list; default "id"
///       fields:
///         - { name: first_name, column: firstName }
///       relationships:
///         - name: title
///           kind: foreign_key  # foreign_key | one_to_one | many_to_many
///           target: tests.Title
///           related_name: employees
/// trees:
///   default:
///     root: tests.Employee
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub schema: SchemaDefinition,
    #[serde(default)]
    pub trees: HashMap<String, TreeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub entities: Vec<EntityDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    /// Primary key column(s)
    #[serde(default)]
    pub primary_key: Option<Identifier>,
    #[serde(default)]
    pub proxy_of: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDefinition {
    pub name: String,
    pub kind: RelationKind,
    /// Qualified or bare entity name, or `self`
    pub target: String,
    /// Foreign key column(s) on the declaring table
    #[serde(default)]
    pub column: Option<Identifier>,
    /// Referenced field(s) on the target, defaults to its primary key
    #[serde(default)]
    pub to_field: Option<Identifier>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub related_name: Option<String>,
    #[serde(default)]
    pub through: Option<ThroughDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThroughDefinition {
    #[serde(default)]
    pub table: Option<String>,
    /// Bridge column(s) pointing at the declaring entity
    #[serde(default)]
    pub source_column: Option<Identifier>,
    /// Bridge column(s) pointing at the target entity
    #[serde(default)]
    pub target_column: Option<Identifier>,
    /// Declaring entity field(s) referenced by `source_column`
    #[serde(default)]
    pub source_key: Option<Identifier>,
    /// Target entity field(s) referenced by `target_column`
    #[serde(default)]
    pub target_key: Option<Identifier>,
}

impl CatalogConfig {
    /// Load catalog configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CatalogError::ConfigReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    /// Parse catalog configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> CatalogResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| CatalogError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Parse catalog configuration from JSON string
    pub fn from_json_str(json: &str) -> CatalogResult<Self> {
        serde_json::from_str(json).map_err(|e| CatalogError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Structural validation that does not need resolved entities
    pub fn validate(&self) -> CatalogResult<()> {
        if self.schema.entities.is_empty() {
            return Err(CatalogError::invalid_config(
                "Schema must contain at least one entity definition",
            ));
        }

        let mut seen = HashSet::new();
        for entity in &self.schema.entities {
            if entity.namespace.is_empty() || entity.name.is_empty() {
                return Err(CatalogError::invalid_config(
                    "Entity namespace and name cannot be empty",
                ));
            }
            let qualified = format!(
                "{}.{}",
                entity.namespace.to_lowercase(),
                entity.name.to_lowercase()
            );
            if !seen.insert(qualified) {
                return Err(CatalogError::invalid_config(format!(
                    "Duplicate entity: {}.{}",
                    entity.namespace, entity.name
                )));
            }

            let mut names = HashSet::new();
            for name in entity
                .fields
                .iter()
                .map(|f| &f.name)
                .chain(entity.relationships.iter().map(|r| &r.name))
            {
                if !names.insert(name) {
                    return Err(CatalogError::invalid_config(format!(
                        "Duplicate field or relationship '{}' on {}.{}",
                        name, entity.namespace, entity.name
                    )));
                }
            }

            for rel in &entity.relationships {
                if rel.through.is_some() && rel.kind != RelationKind::ManyToMany {
                    return Err(CatalogError::invalid_config(format!(
                        "Relationship {}.{} declares a through table but is not many_to_many",
                        entity.name, rel.name
                    )));
                }
            }
        }

        for (alias, tree) in &self.trees {
            if alias.is_empty() || tree.root.is_empty() {
                return Err(CatalogError::invalid_config(
                    "Tree alias and root cannot be empty",
                ));
            }
        }

        Ok(())
    }

    /// Validate and resolve every definition into catalog entities.
    pub fn build_catalog(&self) -> CatalogResult<InMemoryCatalog> {
        self.validate()?;
        InMemoryCatalog::new(self.resolve_entities()?)
    }

    fn resolve_entities(&self) -> CatalogResult<Vec<Entity>> {
        let defs = &self.schema.entities;
        let keys: Vec<EntityKey> = defs
            .iter()
            .map(|d| EntityKey::new(&d.namespace, &d.name))
            .collect();

        // First pass: tables, keys and fields of concrete entities.
        let mut entities: Vec<Entity> = defs
            .iter()
            .zip(&keys)
            .map(|(def, key)| concrete_shape(def, key))
            .collect::<CatalogResult<_>>()?;

        // Proxies take the storage shape of their concrete entity.
        for (pos, def) in defs.iter().enumerate() {
            if let Some(name) = &def.proxy_of {
                let concrete = resolve_key(&keys, name, &keys[pos])?;
                let source = keys.iter().position(|k| *k == concrete).ok_or_else(|| {
                    CatalogError::invalid_config(format!("Unknown proxy target {}", name))
                })?;
                if defs[source].proxy_of.is_some() {
                    return Err(CatalogError::invalid_config(format!(
                        "Proxy {} must refer to a concrete entity",
                        keys[pos]
                    )));
                }
                let (table, primary_key, fields) = {
                    let c = &entities[source];
                    (c.table.clone(), c.primary_key.clone(), c.fields.clone())
                };
                let entity = &mut entities[pos];
                entity.table = table;
                entity.primary_key = primary_key;
                entity.fields = fields;
                entity.proxy_of = Some(concrete);
            }
        }

        // Second pass: relationships, which need the target's shape.
        for (pos, def) in defs.iter().enumerate() {
            let mut relationships = Vec::with_capacity(def.relationships.len());
            for rel in &def.relationships {
                let target_key = resolve_key(&keys, &rel.target, &keys[pos])?;
                let target_pos = keys.iter().position(|k| *k == target_key).ok_or_else(|| {
                    CatalogError::invalid_config(format!("Unknown target {}", rel.target))
                })?;
                let link = build_link(&entities[pos], &entities[target_pos], rel)?;
                relationships.push(Relationship {
                    name: rel.name.clone(),
                    kind: rel.kind,
                    target: target_key,
                    nullable: rel.nullable,
                    related_name: rel.related_name.clone(),
                    link,
                });
            }
            entities[pos].relationships = relationships;
        }

        Ok(entities)
    }
}

fn concrete_shape(def: &EntityDefinition, key: &EntityKey) -> CatalogResult<Entity> {
    let table = def
        .table
        .clone()
        .unwrap_or_else(|| format!("{}_{}", def.namespace, def.name.to_lowercase()));

    let mut fields: Vec<Field> = def
        .fields
        .iter()
        .map(|f| Field {
            name: f.name.clone(),
            column: f.column.clone().unwrap_or_else(|| f.name.clone()),
            primary_key: f.primary_key,
            nullable: f.nullable,
        })
        .collect();

    let pk_columns: Vec<String> = match &def.primary_key {
        Some(pk) => pk.to_columns(),
        None => {
            let marked: Vec<String> = fields
                .iter()
                .filter(|f| f.primary_key)
                .map(|f| f.column.clone())
                .collect();
            if marked.is_empty() {
                vec!["id".to_string()]
            } else {
                marked
            }
        }
    };

    if def.proxy_of.is_none() {
        let missing: Vec<String> = pk_columns
            .iter()
            .filter(|c| !fields.iter().any(|f| &f.column == *c || &f.name == *c))
            .cloned()
            .collect();
        if def.primary_key.is_some() {
            let fk_columns = foreign_key_columns(def);
            if let Some(unknown) = missing.iter().find(|c| !fk_columns.contains(c)) {
                return Err(CatalogError::invalid_config(format!(
                    "Primary key of {} names unknown field '{}'",
                    key, unknown
                )));
            }
        }
        // Key fields without a declaration go first, like an auto-created primary key.
        for (offset, column) in missing.into_iter().enumerate() {
            fields.insert(
                offset,
                Field {
                    primary_key: true,
                    ..Field::new(column.clone(), column)
                },
            );
        }
        for field in &mut fields {
            if pk_columns.contains(&field.column) || pk_columns.contains(&field.name) {
                field.primary_key = true;
            }
        }
    }

    let primary_key = Identifier::from(
        pk_columns
            .iter()
            .map(|c| column_of(&fields, c))
            .collect::<Vec<_>>(),
    );

    Ok(Entity {
        key: key.clone(),
        table,
        primary_key,
        fields,
        relationships: Vec::new(),
        proxy_of: None,
    })
}

/// Columns the entity's own foreign keys occupy. A primary key may reuse them.
fn foreign_key_columns(def: &EntityDefinition) -> Vec<String> {
    def.relationships
        .iter()
        .filter(|r| matches!(r.kind, RelationKind::ForeignKey | RelationKind::OneToOne))
        .flat_map(|r| match &r.column {
            Some(id) => id.to_columns(),
            None => vec![format!("{}_id", r.name)],
        })
        .collect()
}

/// Resolve a relationship target. `self` is the declaring entity; bare names
/// prefer the declaring namespace.
fn resolve_key(keys: &[EntityKey], name: &str, declaring: &EntityKey) -> CatalogResult<EntityKey> {
    if name.eq_ignore_ascii_case("self") {
        return Ok(declaring.clone());
    }
    if let Some(qualified) = EntityKey::parse_qualified(name) {
        return keys
            .iter()
            .find(|k| k.matches(&qualified.name, Some(&qualified.namespace)))
            .cloned()
            .ok_or_else(|| CatalogError::not_found_with_context(name, format!("Relationship target on {}", declaring)));
    }
    if let Some(local) = keys
        .iter()
        .find(|k| k.matches(name, Some(&declaring.namespace)))
    {
        return Ok(local.clone());
    }
    let candidates: Vec<&EntityKey> = keys.iter().filter(|k| k.matches(name, None)).collect();
    match candidates.as_slice() {
        [] => Err(CatalogError::not_found_with_context(
            name,
            format!("Relationship target on {}", declaring),
        )),
        [only] => Ok((*only).clone()),
        many => Err(CatalogError::AmbiguousEntityName {
            name: name.to_string(),
            candidates: many.iter().map(|k| k.to_string()).collect(),
        }),
    }
}

/// Column for a field name, or the name itself when it already is a column.
fn column_of(fields: &[Field], name: &str) -> String {
    fields
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.column.clone())
        .unwrap_or_else(|| name.to_string())
}

fn key_columns(entity: &Entity, key: Option<&Identifier>) -> Vec<String> {
    match key {
        Some(id) => id
            .columns()
            .into_iter()
            .map(|name| column_of(&entity.fields, name))
            .collect(),
        None => entity.primary_key_columns(),
    }
}

fn build_link(
    declaring: &Entity,
    target: &Entity,
    rel: &RelationshipDefinition,
) -> CatalogResult<EdgeLink> {
    match rel.kind {
        RelationKind::ForeignKey | RelationKind::OneToOne => {
            let references = key_columns(target, rel.to_field.as_ref());
            let columns = match &rel.column {
                Some(id) => id.to_columns(),
                None if references.len() == 1 => vec![format!("{}_id", rel.name)],
                None => references
                    .iter()
                    .map(|c| format!("{}_{}", rel.name, c))
                    .collect(),
            };
            if columns.len() != references.len() {
                return Err(CatalogError::invalid_config(format!(
                    "Relationship {}.{} has {} column(s) but references {} key column(s) on {}",
                    declaring.key,
                    rel.name,
                    columns.len(),
                    references.len(),
                    target.key
                )));
            }
            Ok(EdgeLink::ForeignKey {
                columns,
                references,
            })
        }
        RelationKind::ManyToMany => {
            let through = rel.through.clone().unwrap_or_default();
            let source_key = key_columns(declaring, through.source_key.as_ref());
            let target_key = key_columns(target, through.target_key.as_ref());

            let declaring_lower = declaring.key.name.to_lowercase();
            let target_lower = target.key.name.to_lowercase();
            let (source_prefix, target_prefix) = if declaring.key == target.key {
                (format!("from_{}", declaring_lower), format!("to_{}", target_lower))
            } else {
                (declaring_lower, target_lower)
            };

            let source_columns = match through.source_column {
                Some(id) => id.to_columns(),
                None => default_bridge_columns(&source_prefix, &source_key),
            };
            let target_columns = match through.target_column {
                Some(id) => id.to_columns(),
                None => default_bridge_columns(&target_prefix, &target_key),
            };

            if source_columns.len() != source_key.len() || target_columns.len() != target_key.len() {
                return Err(CatalogError::invalid_config(format!(
                    "Many-to-many {}.{}: bridge columns do not match key arity",
                    declaring.key, rel.name
                )));
            }

            Ok(EdgeLink::Through(ThroughTable {
                table: through
                    .table
                    .unwrap_or_else(|| format!("{}_{}", declaring.table, rel.name)),
                source_columns,
                target_columns,
                source_key,
                target_key,
            }))
        }
    }
}

fn default_bridge_columns(prefix: &str, key: &[String]) -> Vec<String> {
    if key.len() == 1 {
        vec![format!("{}_id", prefix)]
    } else {
        key.iter().map(|c| format!("{}_{}", prefix, c)).collect()
    }
}
