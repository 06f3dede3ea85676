//! Schematree - schema-graph traversal for query builders
//!
//! This crate builds deterministic spanning trees over an entity schema and
//! derives from them:
//! - the unique path from a root entity to any reachable entity
//! - the join descriptors connecting them (inner/outer, bridge tables, composite keys)
//! - relationship lookup strings such as `employee__title__salary`
//!
//! Entity metadata comes from a [`schema_catalog::SchemaCatalog`]; trees are
//! cached per alias in a [`registry::TreeRegistry`].

pub mod config;
pub mod registry;
pub mod schema_catalog;
pub mod tree;

pub use registry::TreeRegistry;
pub use schema_catalog::{CatalogConfig, CatalogError, EntityKey, InMemoryCatalog, SchemaCatalog};
pub use tree::{Tree, TreeError, TreeResult};
