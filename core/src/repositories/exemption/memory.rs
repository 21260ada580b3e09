//! In-memory implementation of the exemption repository.
//!
//! Backed by an ordered id-to-record map behind an async lock. Behaviour
//! (uniqueness enforcement, creation ordering, pagination, criteria
//! matching) mirrors the MySQL implementation, which makes this store the
//! substitute of choice for unit tests and for embedders that do not need
//! durable storage.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use ex_shared::types::Paging;

use crate::domain::entities::Exemption;
use crate::errors::{DomainError, DomainResult};

use super::criteria::ExemptionCriteria;
use super::r#trait::ExemptionRepository;

/// Exemption repository over an in-memory ordered map
pub struct InMemoryExemptionRepository {
    store: RwLock<BTreeMap<i64, Exemption>>,
    next_id: AtomicI64,
}

impl InMemoryExemptionRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            store: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn same_natural_key(a: &Exemption, b: &Exemption) -> bool {
        a.component == b.component
            && a.itemtype == b.itemtype
            && a.itemid == b.itemid
            && a.contextid == b.contextid
            && a.userid == b.userid
    }

    fn duplicate_error(exemption: &Exemption) -> DomainError {
        DomainError::DuplicateKey {
            component: exemption.component.clone(),
            itemtype: exemption.itemtype.clone(),
            itemid: exemption.itemid,
        }
    }

    fn not_found(id: i64) -> DomainError {
        DomainError::NotFound {
            resource: format!("exemption {}", id),
        }
    }
}

impl Default for InMemoryExemptionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExemptionRepository for InMemoryExemptionRepository {
    async fn add(&self, exemption: Exemption) -> DomainResult<Exemption> {
        exemption.validate()?;

        let mut store = self.store.write().await;
        if store
            .values()
            .any(|existing| Self::same_natural_key(existing, &exemption))
        {
            return Err(Self::duplicate_error(&exemption));
        }

        let mut saved = exemption;
        let id = self.allocate_id();
        saved.id = Some(id);
        saved.timecreated = Some(Utc::now());
        store.insert(id, saved.clone());
        Ok(saved)
    }

    async fn add_all(&self, exemptions: Vec<Exemption>) -> DomainResult<Vec<Exemption>> {
        let mut store = self.store.write().await;

        // The whole batch is checked before anything is inserted, so a
        // failure leaves the store untouched.
        for (index, exemption) in exemptions.iter().enumerate() {
            exemption.validate()?;
            if store
                .values()
                .any(|existing| Self::same_natural_key(existing, exemption))
            {
                return Err(Self::duplicate_error(exemption));
            }
            if exemptions[..index]
                .iter()
                .any(|earlier| Self::same_natural_key(earlier, exemption))
            {
                return Err(Self::duplicate_error(exemption));
            }
        }

        let timecreated = Utc::now();
        let mut saved = Vec::with_capacity(exemptions.len());
        for exemption in exemptions {
            let mut record = exemption;
            let id = self.allocate_id();
            record.id = Some(id);
            record.timecreated = Some(timecreated);
            store.insert(id, record.clone());
            saved.push(record);
        }
        Ok(saved)
    }

    async fn find(&self, id: i64) -> DomainResult<Exemption> {
        let store = self.store.read().await;
        store.get(&id).cloned().ok_or_else(|| Self::not_found(id))
    }

    async fn find_all(&self, paging: Paging) -> DomainResult<Vec<Exemption>> {
        let store = self.store.read().await;
        Ok(paging.clip(store.values().cloned()).collect())
    }

    async fn find_by(
        &self,
        criteria: &ExemptionCriteria,
        paging: Paging,
    ) -> DomainResult<BTreeMap<i64, Exemption>> {
        let store = self.store.read().await;
        Ok(paging
            .clip(
                store
                    .iter()
                    .filter(|(_, exemption)| criteria.matches(exemption)),
            )
            .map(|(id, exemption)| (*id, exemption.clone()))
            .collect())
    }

    async fn find_exemption(
        &self,
        userid: i64,
        component: &str,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
    ) -> DomainResult<Exemption> {
        let store = self.store.read().await;
        store
            .values()
            .find(|exemption| {
                exemption.userid == userid
                    && exemption.component == component
                    && exemption.itemtype == itemtype
                    && exemption.itemid == itemid
                    && exemption.contextid == contextid
            })
            .cloned()
            .ok_or_else(|| DomainError::NotFound {
                resource: format!("exemption for {}/{} item {}", component, itemtype, itemid),
            })
    }

    async fn exists(&self, id: i64) -> DomainResult<bool> {
        let store = self.store.read().await;
        Ok(store.contains_key(&id))
    }

    async fn exists_by(&self, criteria: &ExemptionCriteria) -> DomainResult<bool> {
        let store = self.store.read().await;
        Ok(store.values().any(|exemption| criteria.matches(exemption)))
    }

    async fn count(&self) -> DomainResult<u64> {
        let store = self.store.read().await;
        Ok(store.len() as u64)
    }

    async fn count_by(&self, criteria: &ExemptionCriteria) -> DomainResult<u64> {
        let store = self.store.read().await;
        Ok(store
            .values()
            .filter(|exemption| criteria.matches(exemption))
            .count() as u64)
    }

    async fn update(&self, exemption: Exemption) -> DomainResult<Exemption> {
        let id = exemption.id.ok_or(DomainError::NotFound {
            resource: "exemption without an id".to_string(),
        })?;

        let mut store = self.store.write().await;
        let existing = store.get_mut(&id).ok_or_else(|| Self::not_found(id))?;

        // Only the mutable fields are written; timecreated stays as it
        // was at creation.
        existing.ordering = exemption.ordering;
        existing.usermodified = exemption.usermodified;
        Ok(existing.clone())
    }

    async fn delete(&self, id: i64) -> DomainResult<bool> {
        let mut store = self.store.write().await;
        Ok(store.remove(&id).is_some())
    }

    async fn delete_by(&self, criteria: &ExemptionCriteria) -> DomainResult<u64> {
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|_, exemption| !criteria.matches(exemption));
        Ok((before - store.len()) as u64)
    }
}
