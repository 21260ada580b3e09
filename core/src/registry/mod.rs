//! Component registry contract.
//!
//! The set of valid component names is owned by the host application;
//! services consult it before touching storage. Hosts hand the services a
//! registry implementation at construction time.

use std::collections::HashSet;

/// Lookup of known component names
pub trait ComponentRegistry: Send + Sync {
    /// Whether the given namespaced component name is known to the host
    fn is_known(&self, component: &str) -> bool;
}

/// Registry over a fixed set of component names
pub struct StaticComponentRegistry {
    names: HashSet<String>,
}

impl StaticComponentRegistry {
    /// Create a registry from an explicit list of component names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ComponentRegistry for StaticComponentRegistry {
    fn is_known(&self, component: &str) -> bool {
        self.names.contains(component)
    }
}

/// Registry accepting every component name; stub for tests and embedders
/// that do not track components.
pub struct AcceptAllRegistry;

impl ComponentRegistry for AcceptAllRegistry {
    fn is_known(&self, _component: &str) -> bool {
        true
    }
}
