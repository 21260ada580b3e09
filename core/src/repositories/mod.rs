//! Repository interfaces and implementations for exemption persistence.

pub mod exemption;

pub use exemption::{
    ExemptionCriteria, ExemptionRepository, FieldFilter, InMemoryExemptionRepository,
};
