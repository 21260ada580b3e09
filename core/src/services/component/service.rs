//! Component-scoped service for the exemptions subsystem.
//!
//! Provides exemption operations for one component across all users. Used
//! when a component manages exemptions of its own items regardless of
//! owner, most importantly to purge them when an item is deleted. The
//! component name is validated against the registry once, at construction.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use ex_shared::types::Paging;

use crate::domain::entities::Exemption;
use crate::domain::value_objects::ExemptionJoinSql;
use crate::errors::{DomainError, DomainResult};
use crate::registry::ComponentRegistry;
use crate::repositories::{ExemptionCriteria, ExemptionRepository};

/// Exemption operations scoped to a single component, across all users
pub struct ComponentExemptionService<R>
where
    R: ExemptionRepository,
{
    repo: Arc<R>,
    component: String,
}

impl<R> ComponentExemptionService<R>
where
    R: ExemptionRepository,
{
    /// Create a service scoped to the given component.
    ///
    /// Fails with the invalid-component error if the registry does not
    /// know the name; no further validation happens per call.
    pub fn new(
        component: impl Into<String>,
        repo: Arc<R>,
        registry: Arc<dyn ComponentRegistry>,
    ) -> DomainResult<Self> {
        let component = component.into();
        if !registry.is_known(&component) {
            return Err(DomainError::InvalidComponent { component });
        }
        Ok(Self { repo, component })
    }

    /// The component this service is scoped to
    pub fn component(&self) -> &str {
        &self.component
    }

    fn area_criteria(&self, itemtype: &str) -> ExemptionCriteria {
        ExemptionCriteria::new()
            .with_component(self.component.clone())
            .with_itemtype(itemtype)
    }

    fn item_criteria(&self, itemtype: &str, itemid: i64, contextid: i64) -> ExemptionCriteria {
        self.area_criteria(itemtype)
            .with_itemid(itemid)
            .with_contextid(contextid)
    }

    /// Flag the item defined by itemid/contextid for the given user, in
    /// the area defined by this component and itemtype.
    ///
    /// The acting user is passed per call; only a positive `ordering` is
    /// kept.
    pub async fn create_exemption(
        &self,
        userid: i64,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
        ordering: Option<i64>,
    ) -> DomainResult<Exemption> {
        let mut exemption =
            Exemption::new(self.component.clone(), itemtype, itemid, contextid, userid)
                .with_usermodified(userid);
        exemption.ordering = ordering.filter(|o| *o > 0);

        debug!(
            component = self.component.as_str(),
            itemtype,
            itemid,
            userid,
            "creating exemption"
        );
        self.repo.add(exemption).await
    }

    /// Find every user's exemptions in one area of this component
    pub async fn find_exemptions_by_type(
        &self,
        itemtype: &str,
        paging: Paging,
    ) -> DomainResult<BTreeMap<i64, Exemption>> {
        self.repo.find_by(&self.area_criteria(itemtype), paging).await
    }

    /// Find every user's exemptions in this component, optionally
    /// restricted to a set of item types (an IN-match). An empty
    /// `itemtypes` slice matches every type.
    pub async fn find_all_exemptions(
        &self,
        itemtypes: &[&str],
        paging: Paging,
    ) -> DomainResult<BTreeMap<i64, Exemption>> {
        let mut criteria = ExemptionCriteria::new().with_component(self.component.clone());
        if !itemtypes.is_empty() {
            criteria = criteria.with_itemtypes(itemtypes.iter().copied());
        }
        self.repo.find_by(&criteria, paging).await
    }

    /// Returns the SQL required to include exemption information for one
    /// area of this component in an external query.
    ///
    /// Like the user-scoped variant but with no userid predicate: the
    /// join matches any user's exemption of the row's item.
    pub fn get_join_sql_by_type(
        &self,
        itemtype: &str,
        alias: &str,
        join_item_expr: &str,
    ) -> ExemptionJoinSql {
        ExemptionJoinSql::build(&self.component, itemtype, alias, join_item_expr, None)
    }

    /// Delete the exemptions of one item within one context, for all
    /// users.
    ///
    /// Fails with the ownership error if no record for the item exists in
    /// this component.
    pub async fn delete_exemption(
        &self,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
    ) -> DomainResult<()> {
        let criteria = self.item_criteria(itemtype, itemid, contextid);

        if !self.repo.exists_by(&criteria).await? {
            return Err(DomainError::NotOwned {
                component: self.component.clone(),
                itemtype: itemtype.to_string(),
                itemid,
            });
        }

        let removed = self.repo.delete_by(&criteria).await?;
        debug!(
            component = self.component.as_str(),
            itemtype, itemid, removed, "deleted exemptions"
        );
        Ok(())
    }

    /// Whether any user has flagged the given item in the given context
    pub async fn exemption_exists(
        &self,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
    ) -> DomainResult<bool> {
        self.repo
            .exists_by(&self.item_criteria(itemtype, itemid, contextid))
            .await
    }

    /// Fetch an exemption of the given item, or `None` if no user has
    /// flagged it. When several users have, the oldest record is returned.
    pub async fn get_exemption(
        &self,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
    ) -> DomainResult<Option<Exemption>> {
        let found = self
            .repo
            .find_by(
                &self.item_criteria(itemtype, itemid, contextid),
                Paging::new(0, 1),
            )
            .await?;
        Ok(found.into_iter().next().map(|(_, exemption)| exemption))
    }

    /// Count the exemptions in one area of this component, optionally
    /// restricted to a context
    pub async fn count_exemptions_by_type(
        &self,
        itemtype: &str,
        contextid: Option<i64>,
    ) -> DomainResult<u64> {
        let mut criteria = self.area_criteria(itemtype);
        if let Some(contextid) = contextid {
            criteria = criteria.with_contextid(contextid);
        }
        self.repo.count_by(&criteria).await
    }

    /// Delete every user's exemptions of one item.
    ///
    /// Typically called when the component deletes the item itself. With a
    /// context given, only exemptions within that context are removed and
    /// exemptions of the same item elsewhere survive. Returns the number
    /// of records removed; zero matches is a no-op.
    pub async fn delete_exemptions_by_type_and_item(
        &self,
        itemtype: &str,
        itemid: i64,
        contextid: Option<i64>,
    ) -> DomainResult<u64> {
        let mut criteria = self.area_criteria(itemtype).with_itemid(itemid);
        if let Some(contextid) = contextid {
            criteria = criteria.with_contextid(contextid);
        }

        let removed = self.repo.delete_by(&criteria).await?;
        debug!(
            component = self.component.as_str(),
            itemtype, itemid, removed, "purged item exemptions"
        );
        Ok(removed)
    }
}
