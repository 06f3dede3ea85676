use thiserror::Error;

use crate::schema_catalog::CatalogError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TreeError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Entity `{entity}` is not reachable from tree root `{root}`")]
    EntityNotInTree { entity: String, root: String },
    #[error("Conflicting routes for `{target}`: {message}")]
    RouteConflict { target: String, message: String },
    #[error("Invalid lookup `{lookup}`: {reason}")]
    InvalidLookup { lookup: String, reason: String },
    #[error("No tree registered under alias `{alias}`")]
    UnknownTree { alias: String },
}

impl TreeError {
    pub(crate) fn invalid_lookup(lookup: impl Into<String>, reason: impl Into<String>) -> Self {
        TreeError::InvalidLookup {
            lookup: lookup.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn route_conflict(target: impl ToString, message: impl Into<String>) -> Self {
        TreeError::RouteConflict {
            target: target.to_string(),
            message: message.into(),
        }
    }
}

pub type TreeResult<T> = Result<T, TreeError>;
