//! User-scoped service for the exemptions subsystem.
//!
//! Provides a single API for interacting with the exemptions subsystem for
//! one user: every operation is pre-scoped to the user id fixed at
//! construction. The service enforces the business rules the repository
//! does not know about (component-name validation, ownership on delete)
//! and delegates all persistence to the repository.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use ex_shared::types::Paging;

use crate::domain::entities::Exemption;
use crate::domain::value_objects::ExemptionJoinSql;
use crate::errors::{DomainError, DomainResult};
use crate::registry::ComponentRegistry;
use crate::repositories::{ExemptionCriteria, ExemptionRepository};

/// Exemption operations scoped to a single user
pub struct UserExemptionService<R>
where
    R: ExemptionRepository,
{
    repo: Arc<R>,
    registry: Arc<dyn ComponentRegistry>,
    userid: i64,
}

impl<R> UserExemptionService<R>
where
    R: ExemptionRepository,
{
    /// Create a service scoped to the given user
    pub fn new(userid: i64, repo: Arc<R>, registry: Arc<dyn ComponentRegistry>) -> Self {
        Self {
            repo,
            registry,
            userid,
        }
    }

    /// The user this service is scoped to
    pub fn userid(&self) -> i64 {
        self.userid
    }

    fn validate_component(&self, component: &str) -> DomainResult<()> {
        if !self.registry.is_known(component) {
            return Err(DomainError::InvalidComponent {
                component: component.to_string(),
            });
        }
        Ok(())
    }

    /// Flag the item defined by itemid/contextid, in the area defined by
    /// component/itemtype.
    ///
    /// Only a positive `ordering` is kept; anything else collapses to
    /// unset. Any component can ask to flag something; access to the item
    /// itself cannot be verified here.
    pub async fn create_exemption(
        &self,
        component: &str,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
        ordering: Option<i64>,
    ) -> DomainResult<Exemption> {
        self.validate_component(component)?;

        let mut exemption = Exemption::new(component, itemtype, itemid, contextid, self.userid)
            .with_usermodified(self.userid);
        exemption.ordering = ordering.filter(|o| *o > 0);

        debug!(
            component,
            itemtype,
            itemid,
            userid = self.userid,
            "creating exemption"
        );
        self.repo.add(exemption).await
    }

    /// Find this user's exemptions in one area, where an area is the
    /// component/itemtype pair.
    ///
    /// E.g. "find all exempt courses" is
    /// `find_exemptions_by_type("core_course", "course", Paging::all())`.
    pub async fn find_exemptions_by_type(
        &self,
        component: &str,
        itemtype: &str,
        paging: Paging,
    ) -> DomainResult<BTreeMap<i64, Exemption>> {
        self.validate_component(component)?;

        let criteria = ExemptionCriteria::new()
            .with_userid(self.userid)
            .with_component(component)
            .with_itemtype(itemtype);
        self.repo.find_by(&criteria, paging).await
    }

    /// Find this user's exemptions in a component, optionally restricted
    /// to a set of item types (an IN-match). An empty `itemtypes` slice
    /// matches every type in the component.
    pub async fn find_all_exemptions(
        &self,
        component: &str,
        itemtypes: &[&str],
        paging: Paging,
    ) -> DomainResult<BTreeMap<i64, Exemption>> {
        self.validate_component(component)?;

        let mut criteria = ExemptionCriteria::new()
            .with_userid(self.userid)
            .with_component(component);
        if !itemtypes.is_empty() {
            criteria = criteria.with_itemtypes(itemtypes.iter().copied());
        }
        self.repo.find_by(&criteria, paging).await
    }

    /// Returns the SQL required to include exemption information for a
    /// given component/itemtype combination in an external query.
    ///
    /// The fragment is a LEFT JOIN so the caller's base rows are all
    /// preserved; rows without an exemption carry NULLs under the alias.
    /// `join_item_expr` is the caller-side expression the item id is
    /// matched against, e.g. `c.id`. The scoping user id is inlined; the
    /// component and itemtype literals come back as named parameters.
    pub fn get_join_sql_by_type(
        &self,
        component: &str,
        itemtype: &str,
        alias: &str,
        join_item_expr: &str,
    ) -> ExemptionJoinSql {
        ExemptionJoinSql::build(
            component,
            itemtype,
            alias,
            join_item_expr,
            Some(self.userid),
        )
    }

    /// Delete one exemption from an area and from within a context.
    ///
    /// The record must exist for the scoping user; a missing record (or
    /// one owned by someone else) fails with the ownership error.
    pub async fn delete_exemption(
        &self,
        component: &str,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
    ) -> DomainResult<()> {
        self.validate_component(component)?;

        // The user must own the exemption.
        let exemption = match self
            .repo
            .find_exemption(self.userid, component, itemtype, itemid, contextid)
            .await
        {
            Ok(exemption) => exemption,
            Err(err) if err.is_not_found() => {
                return Err(DomainError::NotOwned {
                    component: component.to_string(),
                    itemtype: itemtype.to_string(),
                    itemid,
                });
            }
            Err(err) => return Err(err),
        };

        if let Some(id) = exemption.id {
            debug!(id, userid = self.userid, "deleting exemption");
            self.repo.delete(id).await?;
        }
        Ok(())
    }

    /// Whether this user has flagged the given item in the given context
    pub async fn exemption_exists(
        &self,
        component: &str,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
    ) -> DomainResult<bool> {
        let criteria = ExemptionCriteria::new()
            .with_userid(self.userid)
            .with_component(component)
            .with_itemtype(itemtype)
            .with_itemid(itemid)
            .with_contextid(contextid);
        self.repo.exists_by(&criteria).await
    }

    /// Fetch this user's exemption of the given item, or `None` if the
    /// item is not flagged. The non-throwing form of the exact lookup.
    pub async fn get_exemption(
        &self,
        component: &str,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
    ) -> DomainResult<Option<Exemption>> {
        match self
            .repo
            .find_exemption(self.userid, component, itemtype, itemid, contextid)
            .await
        {
            Ok(exemption) => Ok(Some(exemption)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Count this user's exemptions in one area, optionally restricted to
    /// a context
    pub async fn count_exemptions_by_type(
        &self,
        component: &str,
        itemtype: &str,
        contextid: Option<i64>,
    ) -> DomainResult<u64> {
        let mut criteria = ExemptionCriteria::new()
            .with_userid(self.userid)
            .with_component(component)
            .with_itemtype(itemtype);
        if let Some(contextid) = contextid {
            criteria = criteria.with_contextid(contextid);
        }
        self.repo.count_by(&criteria).await
    }
}
