//! MySQL repository implementations.

pub mod exemption_repository_impl;

pub use exemption_repository_impl::MySqlExemptionRepository;
