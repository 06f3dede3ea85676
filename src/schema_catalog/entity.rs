//! Entity metadata as supplied by the schema catalog.
//!
//! Entities, fields and relationship edges are read-only for the tree engine.
//! Forward relationships are declared on the entity that owns the key columns;
//! the catalog derives the matching reverse edges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace-qualified entity identity, rendered as `namespace.Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub namespace: String,
    pub name: String,
}

impl EntityKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Split `namespace.Name` into its parts. Bare names yield `None`.
    pub fn parse_qualified(qualified: &str) -> Option<Self> {
        let (namespace, name) = qualified.split_once('.')?;
        if namespace.is_empty() || name.is_empty() || name.contains('.') {
            return None;
        }
        Some(Self::new(namespace, name))
    }

    /// Case-insensitive comparison against a bare or qualified name.
    pub fn matches(&self, name: &str, namespace: Option<&str>) -> bool {
        self.name.eq_ignore_ascii_case(name)
            && namespace.is_none_or(|ns| self.namespace.eq_ignore_ascii_case(ns))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Key column(s) of an entity or a relationship: either a single column or a
/// composite list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// Single column identifier
    Single(String),
    /// Composite identifier (multiple columns)
    Composite(Vec<String>),
}

impl Identifier {
    /// Get all columns in the identifier
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Identifier::Single(col) => vec![col.as_str()],
            Identifier::Composite(cols) => cols.iter().map(|s| s.as_str()).collect(),
        }
    }

    pub fn to_columns(&self) -> Vec<String> {
        self.columns().into_iter().map(str::to_string).collect()
    }

    /// Check if this is a composite identifier
    pub fn is_composite(&self) -> bool {
        matches!(self, Identifier::Composite(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Identifier::Single(_) => 1,
            Identifier::Composite(cols) => cols.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier::Single(s)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::Single(s.to_string())
    }
}

impl From<Vec<String>> for Identifier {
    fn from(v: Vec<String>) -> Self {
        if v.len() == 1 {
            Identifier::Single(v[0].clone())
        } else {
            Identifier::Composite(v)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub column: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            primary_key: false,
            nullable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    OneToOne,
    ForeignKey,
    ManyToMany,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::OneToOne => write!(f, "one_to_one"),
            RelationKind::ForeignKey => write!(f, "foreign_key"),
            RelationKind::ManyToMany => write!(f, "many_to_many"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

/// Bridge table backing a many-to-many relationship.
///
/// `source_*` refers to the entity declaring the relationship, `target_*` to
/// the related entity. `source_columns[i]` in the bridge references
/// `source_key[i]` on the declaring entity's table; likewise for the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughTable {
    pub table: String,
    pub source_columns: Vec<String>,
    pub target_columns: Vec<String>,
    pub source_key: Vec<String>,
    pub target_key: Vec<String>,
}

/// How the two tables of a relationship are physically connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeLink {
    /// `columns` live on the declaring entity and reference `references` on
    /// the related entity.
    ForeignKey {
        columns: Vec<String>,
        references: Vec<String>,
    },
    Through(ThroughTable),
}

/// A relationship as declared on the entity owning it (the forward side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub kind: RelationKind,
    pub target: EntityKey,
    pub nullable: bool,
    /// Name of the reverse accessor. `+` (or a trailing `+`) suppresses it.
    pub related_name: Option<String>,
    pub link: EdgeLink,
}

impl Relationship {
    pub fn reverse_disabled(&self) -> bool {
        self.related_name
            .as_deref()
            .is_some_and(|name| name.ends_with('+'))
    }
}

/// One traversable edge out of an entity, forward or reverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// Entity the edge leaves from.
    pub source: EntityKey,
    /// Entity the edge arrives at.
    pub target: EntityKey,
    /// Entity that declares the relationship.
    pub declared_on: EntityKey,
    /// Field name of the forward declaration.
    pub field: String,
    pub kind: RelationKind,
    pub direction: Direction,
    pub nullable: bool,
    /// Name used in lookup strings.
    pub name: String,
    /// Attribute name relative to `source`.
    pub accessor: String,
    /// Reverse accessor explicitly suppressed.
    pub disabled: bool,
    pub link: EdgeLink,
}

impl RelationshipEdge {
    pub fn is_reverse(&self) -> bool {
        self.direction == Direction::Reverse
    }

    pub fn is_self_referential(&self) -> bool {
        self.source == self.target
    }

    /// Discovery order used by the tree builder: many-to-many first, then
    /// one-to-one, then foreign keys; forward before reverse within a kind.
    pub fn discovery_rank(&self) -> u8 {
        let kind = match self.kind {
            RelationKind::ManyToMany => 0,
            RelationKind::OneToOne => 2,
            RelationKind::ForeignKey => 4,
        };
        kind + u8::from(self.is_reverse())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub key: EntityKey,
    pub table: String,
    pub primary_key: Identifier,
    pub fields: Vec<Field>,
    pub relationships: Vec<Relationship>,
    /// Concrete entity this one is a proxy view of (same table and fields).
    pub proxy_of: Option<EntityKey>,
}

impl Entity {
    pub fn display_name(&self) -> &str {
        &self.key.name
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key_columns(&self) -> Vec<String> {
        self.primary_key.to_columns()
    }

    /// Field representing the primary key, if it is a single column.
    pub fn primary_key_field(&self) -> Option<&Field> {
        match &self.primary_key {
            Identifier::Single(col) => self.fields.iter().find(|f| &f.column == col),
            Identifier::Composite(_) => None,
        }
    }

    pub fn is_proxy(&self) -> bool {
        self.proxy_of.is_some()
    }
}
