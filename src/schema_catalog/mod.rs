//! Schema catalog: entity metadata consumed by the tree engine.
//!
//! The engine only depends on the [`SchemaCatalog`] trait. [`InMemoryCatalog`]
//! is the bundled implementation, usually built from a [`CatalogConfig`].

pub mod catalog;
pub mod config;
pub mod entity;
pub mod errors;

pub use catalog::{InMemoryCatalog, SchemaCatalog};
pub use config::CatalogConfig;
pub use entity::{
    Direction, EdgeLink, Entity, EntityKey, Field, Identifier, RelationKind, Relationship,
    RelationshipEdge, ThroughTable,
};
pub use errors::{CatalogError, CatalogResult};
