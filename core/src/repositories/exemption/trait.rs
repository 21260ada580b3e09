//! Exemption repository trait defining the interface for exemption
//! persistence.
//!
//! This module defines the repository pattern interface for Exemption
//! entities. The trait is async-first, keys every query on composite
//! criteria rather than single-column indexes, and uses Result types for
//! proper error handling. Two conforming implementations ship with the
//! workspace: the in-memory store in this crate and the MySQL store in the
//! infrastructure crate.

use std::collections::BTreeMap;

use async_trait::async_trait;

use ex_shared::types::Paging;

use crate::domain::entities::Exemption;
use crate::errors::DomainResult;

use super::criteria::ExemptionCriteria;

/// Repository contract for exemption persistence operations.
///
/// Implementations are the sole gateway to storage for exemption records.
/// They enforce the natural-key uniqueness invariant and record
/// completeness; business rules such as component validation live in the
/// service layer above.
#[async_trait]
pub trait ExemptionRepository: Send + Sync {
    /// Persist a new exemption.
    ///
    /// Assigns the surrogate id and the creation timestamp. The record
    /// must pass [`Exemption::validate`]; a record whose natural key
    /// (component, itemtype, itemid, contextid, userid) already exists
    /// fails with a duplicate-key error.
    ///
    /// # Example
    /// ```no_run
    /// # use ex_core::domain::entities::Exemption;
    /// # use ex_core::repositories::ExemptionRepository;
    /// # async fn example(repo: &impl ExemptionRepository) -> Result<(), Box<dyn std::error::Error>> {
    /// let exemption = Exemption::new("core_course", "course", 42, 7, 100)
    ///     .with_usermodified(100);
    ///
    /// let saved = repo.add(exemption).await?;
    /// assert!(saved.id.is_some());
    /// # Ok(())
    /// # }
    /// ```
    async fn add(&self, exemption: Exemption) -> DomainResult<Exemption>;

    /// Persist a batch of exemptions.
    ///
    /// Same per-record semantics as [`add`](Self::add). The batch is
    /// applied atomically: a validation failure or duplicate key anywhere
    /// in the batch surfaces the error and leaves no partial rows behind.
    async fn add_all(&self, exemptions: Vec<Exemption>) -> DomainResult<Vec<Exemption>>;

    /// Fetch one exemption by surrogate id.
    ///
    /// # Returns
    /// * `Ok(Exemption)` - the record
    /// * `Err(DomainError::NotFound)` - no record has that id
    async fn find(&self, id: i64) -> DomainResult<Exemption>;

    /// Fetch all exemptions, ordered by id ascending (creation order).
    ///
    /// The paging window is applied after ordering; an unbounded window
    /// returns everything.
    async fn find_all(&self, paging: Paging) -> DomainResult<Vec<Exemption>>;

    /// Fetch the exemptions matching the given criteria, keyed by id.
    ///
    /// Scalar criteria are equality matches, set-valued criteria are
    /// IN-matches, and empty criteria match everything. The result map
    /// iterates in id order and supports keyed lookups, so callers can
    /// resolve individual records without a second query.
    ///
    /// # Example
    /// ```no_run
    /// # use ex_core::repositories::{ExemptionCriteria, ExemptionRepository};
    /// # use ex_shared::types::Paging;
    /// # async fn example(repo: &impl ExemptionRepository) -> Result<(), Box<dyn std::error::Error>> {
    /// let criteria = ExemptionCriteria::new()
    ///     .with_component("core_course")
    ///     .with_itemtypes(["course", "course_item"]);
    ///
    /// let found = repo.find_by(&criteria, Paging::all()).await?;
    /// for (id, exemption) in &found {
    ///     println!("{}: {}/{}", id, exemption.component, exemption.itemtype);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn find_by(
        &self,
        criteria: &ExemptionCriteria,
        paging: Paging,
    ) -> DomainResult<BTreeMap<i64, Exemption>>;

    /// Exact natural-key lookup.
    ///
    /// # Returns
    /// * `Ok(Exemption)` - the record for that exact composite key
    /// * `Err(DomainError::NotFound)` - no such record
    async fn find_exemption(
        &self,
        userid: i64,
        component: &str,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
    ) -> DomainResult<Exemption>;

    /// Whether a record with the given surrogate id exists
    async fn exists(&self, id: i64) -> DomainResult<bool>;

    /// Whether any record matches the criteria; stops at the first match
    async fn exists_by(&self, criteria: &ExemptionCriteria) -> DomainResult<bool>;

    /// Total number of exemption records
    async fn count(&self) -> DomainResult<u64>;

    /// Number of records matching the criteria
    async fn count_by(&self, criteria: &ExemptionCriteria) -> DomainResult<u64>;

    /// Persist the mutable fields (ordering, usermodified) of an existing
    /// record.
    ///
    /// The creation timestamp is never overwritten.
    ///
    /// # Returns
    /// * `Ok(Exemption)` - the stored record after the write
    /// * `Err(DomainError::NotFound)` - the id is absent
    async fn update(&self, exemption: Exemption) -> DomainResult<Exemption>;

    /// Remove one record by surrogate id.
    ///
    /// # Returns
    /// * `Ok(true)` - the record was removed
    /// * `Ok(false)` - no record had that id; absence is not an error
    async fn delete(&self, id: i64) -> DomainResult<bool>;

    /// Remove every record matching the criteria.
    ///
    /// Matching semantics are those of [`find_by`](Self::find_by), so
    /// empty criteria remove everything. Returns the number of records
    /// removed; zero matches is a no-op, not an error.
    async fn delete_by(&self, criteria: &ExemptionCriteria) -> DomainResult<u64>;
}
