pub mod r#trait {
    pub use super::trait_::*;
}
#[path = "trait.rs"]
mod trait_;
pub mod criteria;
pub mod memory;

pub use criteria::{ExemptionCriteria, FieldFilter};
pub use memory::InMemoryExemptionRepository;
pub use r#trait::ExemptionRepository;

#[cfg(test)]
mod tests;
