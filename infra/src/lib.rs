//! # Infrastructure Layer
//!
//! Concrete storage for the exemptions backend: the MySQL repository
//! implementation using SQLx, and connection-pool management. The domain
//! and service layers in `ex_core` stay independent of the database
//! technology behind this crate.

pub mod database;

pub use database::{DatabasePool, MySqlExemptionRepository};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
