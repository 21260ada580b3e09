//! # Exemptions Core
//!
//! Core domain and service layer for the exemptions backend. This crate
//! contains the exemption entity, the repository interface with its
//! in-memory implementation, the component registry contract, the user and
//! component scoped services, and the error types shared by all of them.

pub mod domain;
pub mod errors;
pub mod registry;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use registry::*;
pub use repositories::*;
pub use services::*;
