//! # Schema Catalog Error Types
//!
//! Errors raised while loading catalog configuration and while resolving
//! entity names against the catalog.
//!
//! ## Error Categories
//!
//! - **Resolution Errors**: a name that matches no entity, or several
//! - **Configuration Errors**: file I/O, parsing and structural validation
//!
//! ## Usage Patterns
//!
//! ```ignore
//! // Provide what was looked up and where
//! CatalogError::not_found_with_context("Employe", "While resolving tree root for alias 'default'")
//! ```

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("No entity found named `{name}`")]
    EntityNotFound { name: String },
    #[error("Entity name `{name}` is ambiguous, qualify it with one of: {}", candidates.join(", "))]
    AmbiguousEntityName {
        name: String,
        candidates: Vec<String>,
    },
    #[error("Entity `{entity}` has no field or relationship named `{field}`")]
    FieldNotFound { entity: String, field: String },
    #[error("Failed to read configuration file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse configuration: {error}")]
    ConfigParseError { error: String },
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CatalogError {
    /// Create an EntityNotFound error with context information
    pub fn not_found_with_context(name: impl Into<String>, context: impl Into<String>) -> Self {
        CatalogError::EntityNotFound {
            name: format!("{}\n  Context: {}", name.into(), context.into()),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        CatalogError::InvalidConfig {
            message: message.into(),
        }
    }

    /// True for the caller-input failures of name resolution.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            CatalogError::EntityNotFound { .. } | CatalogError::AmbiguousEntityName { .. }
        )
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
