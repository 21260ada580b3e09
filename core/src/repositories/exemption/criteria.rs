//! Composite query criteria over exemption fields.

use crate::domain::entities::Exemption;

/// A predicate over a single field: equality or set membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter<T> {
    /// The field must equal the value
    Equals(T),
    /// The field must equal one of the values (an IN-match); an empty
    /// list matches nothing
    AnyOf(Vec<T>),
}

impl<T: PartialEq> FieldFilter<T> {
    /// Whether the given field value satisfies this predicate
    pub fn matches(&self, value: &T) -> bool {
        match self {
            FieldFilter::Equals(expected) => value == expected,
            FieldFilter::AnyOf(allowed) => allowed.contains(value),
        }
    }
}

/// Composite criteria over the natural-key fields of an exemption.
///
/// Each field is optional; a record matches when it satisfies every
/// predicate that is present, so empty criteria match every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExemptionCriteria {
    pub userid: Option<FieldFilter<i64>>,
    pub component: Option<FieldFilter<String>>,
    pub itemtype: Option<FieldFilter<String>>,
    pub itemid: Option<FieldFilter<i64>>,
    pub contextid: Option<FieldFilter<i64>>,
}

impl ExemptionCriteria {
    /// Criteria with no predicates, matching every record
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the given owning user
    pub fn with_userid(mut self, userid: i64) -> Self {
        self.userid = Some(FieldFilter::Equals(userid));
        self
    }

    /// Require the given component name
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(FieldFilter::Equals(component.into()));
        self
    }

    /// Require the given item type
    pub fn with_itemtype(mut self, itemtype: impl Into<String>) -> Self {
        self.itemtype = Some(FieldFilter::Equals(itemtype.into()));
        self
    }

    /// Require the item type to be one of the given values
    pub fn with_itemtypes<I, S>(mut self, itemtypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.itemtype = Some(FieldFilter::AnyOf(
            itemtypes.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Require the given item id
    pub fn with_itemid(mut self, itemid: i64) -> Self {
        self.itemid = Some(FieldFilter::Equals(itemid));
        self
    }

    /// Require the given context
    pub fn with_contextid(mut self, contextid: i64) -> Self {
        self.contextid = Some(FieldFilter::Equals(contextid));
        self
    }

    /// Whether no predicates are present
    pub fn is_empty(&self) -> bool {
        self.userid.is_none()
            && self.component.is_none()
            && self.itemtype.is_none()
            && self.itemid.is_none()
            && self.contextid.is_none()
    }

    /// Whether the exemption satisfies every predicate present
    pub fn matches(&self, exemption: &Exemption) -> bool {
        self.userid
            .as_ref()
            .map_or(true, |f| f.matches(&exemption.userid))
            && self
                .component
                .as_ref()
                .map_or(true, |f| f.matches(&exemption.component))
            && self
                .itemtype
                .as_ref()
                .map_or(true, |f| f.matches(&exemption.itemtype))
            && self
                .itemid
                .as_ref()
                .map_or(true, |f| f.matches(&exemption.itemid))
            && self
                .contextid
                .as_ref()
                .map_or(true, |f| f.matches(&exemption.contextid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Exemption {
        Exemption::new("core_course", "course", 42, 7, 100)
    }

    #[test]
    fn test_empty_criteria_match_everything() {
        let criteria = ExemptionCriteria::new();
        assert!(criteria.is_empty());
        assert!(criteria.matches(&sample()));
    }

    #[test]
    fn test_scalar_criteria() {
        let criteria = ExemptionCriteria::new()
            .with_component("core_course")
            .with_itemtype("course")
            .with_userid(100);
        assert!(criteria.matches(&sample()));

        let other_user = ExemptionCriteria::new().with_userid(101);
        assert!(!other_user.matches(&sample()));
    }

    #[test]
    fn test_set_valued_itemtype() {
        let criteria = ExemptionCriteria::new().with_itemtypes(["course", "course_item"]);
        assert!(criteria.matches(&sample()));

        let miss = ExemptionCriteria::new().with_itemtypes(["folder", "page"]);
        assert!(!miss.matches(&sample()));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let criteria = ExemptionCriteria::new().with_itemtypes(Vec::<String>::new());
        assert!(!criteria.matches(&sample()));
    }
}
