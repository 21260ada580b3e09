//! Exemption entity: one user's flag on a component item within a context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};

/// A single exemption record.
///
/// Records that user `userid` has flagged the item identified by
/// (`component`, `itemtype`, `itemid`) within context `contextid`. That
/// five-field tuple is unique per record; `id` and `timecreated` are
/// assigned by the repository when the record is first persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exemption {
    /// Surrogate key, assigned by storage on creation
    pub id: Option<i64>,

    /// Namespaced name of the component owning the flagged item
    pub component: String,

    /// Item classification within the component's domain (e.g. "course")
    pub itemtype: String,

    /// Identifier of the flagged item; meaning defined by (component, itemtype)
    pub itemid: i64,

    /// Context in which the flag applies
    pub contextid: i64,

    /// The user owning this flag
    pub userid: i64,

    /// Optional caller-controlled sort order within an area
    pub ordering: Option<i64>,

    /// Set once when the record is persisted, immutable afterwards
    pub timecreated: Option<DateTime<Utc>>,

    /// The user who last wrote the record; required before persistence
    pub usermodified: Option<i64>,
}

impl Exemption {
    /// Creates a new, not yet persisted exemption
    pub fn new(
        component: impl Into<String>,
        itemtype: impl Into<String>,
        itemid: i64,
        contextid: i64,
        userid: i64,
    ) -> Self {
        Self {
            id: None,
            component: component.into(),
            itemtype: itemtype.into(),
            itemid,
            contextid,
            userid,
            ordering: None,
            timecreated: None,
            usermodified: None,
        }
    }

    /// Sets the sort order
    pub fn with_ordering(mut self, ordering: i64) -> Self {
        self.ordering = Some(ordering);
        self
    }

    /// Sets the user recorded as having last written the record
    pub fn with_usermodified(mut self, usermodified: i64) -> Self {
        self.usermodified = Some(usermodified);
        self
    }

    /// Whether the record has been persisted
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Check the record is complete enough to be persisted.
    ///
    /// `component` and `itemtype` must be non-empty and `usermodified`
    /// must be set. Repositories call this before writing.
    pub fn validate(&self) -> DomainResult<()> {
        if self.component.is_empty() {
            return Err(DomainError::IncompleteRecord {
                field: "component".to_string(),
            });
        }
        if self.itemtype.is_empty() {
            return Err(DomainError::IncompleteRecord {
                field: "itemtype".to_string(),
            });
        }
        if self.usermodified.is_none() {
            return Err(DomainError::IncompleteRecord {
                field: "usermodified".to_string(),
            });
        }
        Ok(())
    }
}
