//! Configuration types loaded from the environment.

pub mod database;

pub use database::DatabaseConfig;
