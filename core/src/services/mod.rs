//! Business services exposing the exemptions API to callers.
//!
//! Services wrap a repository with business-rule enforcement: component
//! validation against the registry and scoping (one user, or one component
//! across all users). Callers construct them with explicit dependencies;
//! there is no service locator.

pub mod component;
pub mod user;

// Re-export commonly used types
pub use component::ComponentExemptionService;
pub use user::UserExemptionService;
