//! Domain-specific error types and error handling.

use thiserror::Error;

/// Core domain errors for the exemptions subsystem
#[derive(Error, Debug)]
pub enum DomainError {
    /// The component name is not present in the component registry.
    #[error("Invalid component name '{component}'")]
    InvalidComponent { component: String },

    /// A required field was missing when persisting an exemption.
    #[error("Incomplete exemption record: missing {field}")]
    IncompleteRecord { field: String },

    /// The (component, itemtype, itemid, contextid, userid) tuple is
    /// already present in storage.
    #[error("Exemption already exists for {component}/{itemtype} item {itemid}")]
    DuplicateKey {
        component: String,
        itemtype: String,
        itemid: i64,
    },

    /// The requested record does not exist.
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// The exemption does not resolve to a record owned by the scoping
    /// user or component.
    #[error("Exemption for {component}/{itemtype} item {itemid} does not exist in this scope; cannot delete")]
    NotOwned {
        component: String,
        itemtype: String,
        itemid: i64,
    },

    /// Underlying storage failure.
    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    /// True for the absence-style errors: `NotFound` and its ownership
    /// specialization `NotOwned`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::NotFound { .. } | DomainError::NotOwned { .. }
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
