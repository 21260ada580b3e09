//! Unit tests for the in-memory exemption repository

use chrono::Utc;

use crate::domain::entities::Exemption;
use crate::errors::DomainError;
use crate::repositories::exemption::{
    ExemptionCriteria, ExemptionRepository, InMemoryExemptionRepository,
};
use ex_shared::types::Paging;

fn course_exemption(itemid: i64, contextid: i64, userid: i64) -> Exemption {
    Exemption::new("core_course", "course", itemid, contextid, userid).with_usermodified(userid)
}

#[tokio::test]
async fn test_add_round_trip() {
    let repo = InMemoryExemptionRepository::new();
    let before = Utc::now();

    let saved = repo.add(course_exemption(42, 7, 100)).await.unwrap();

    assert!(saved.id.is_some());
    assert!(saved.timecreated.unwrap() >= before);

    let found = repo.find(saved.id.unwrap()).await.unwrap();
    assert_eq!(found.component, "core_course");
    assert_eq!(found.itemtype, "course");
    assert_eq!(found.itemid, 42);
    assert_eq!(found.contextid, 7);
    assert_eq!(found.userid, 100);
    assert_eq!(found.usermodified, Some(100));
}

#[tokio::test]
async fn test_add_duplicate_key_rejected() {
    let repo = InMemoryExemptionRepository::new();
    repo.add(course_exemption(42, 7, 100)).await.unwrap();

    let result = repo.add(course_exemption(42, 7, 100)).await;
    assert!(matches!(result, Err(DomainError::DuplicateKey { .. })));

    // Changing any one natural-key field makes the record acceptable.
    repo.add(course_exemption(43, 7, 100)).await.unwrap();
    repo.add(course_exemption(42, 8, 100)).await.unwrap();
    repo.add(course_exemption(42, 7, 101)).await.unwrap();
    repo.add(
        Exemption::new("core_user", "course", 42, 7, 100).with_usermodified(100),
    )
    .await
    .unwrap();
    repo.add(
        Exemption::new("core_course", "whatnow", 42, 7, 100).with_usermodified(100),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_add_incomplete_record_rejected() {
    let repo = InMemoryExemptionRepository::new();

    // No usermodified set.
    let result = repo
        .add(Exemption::new("core_course", "course", 42, 7, 100))
        .await;

    assert!(matches!(
        result,
        Err(DomainError::IncompleteRecord { ref field }) if field == "usermodified"
    ));
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_add_all_basic() {
    let repo = InMemoryExemptionRepository::new();

    let saved = repo
        .add_all(vec![
            course_exemption(1, 7, 100),
            course_exemption(2, 7, 100),
            course_exemption(3, 7, 100),
        ])
        .await
        .unwrap();

    assert_eq!(saved.len(), 3);
    assert!(saved.iter().all(|e| e.id.is_some()));
    assert_eq!(repo.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_add_all_duplicate_leaves_no_partial_rows() {
    let repo = InMemoryExemptionRepository::new();
    repo.add(course_exemption(2, 7, 100)).await.unwrap();

    // The second entry collides with the pre-existing record; the first
    // entry must not survive the failed batch.
    let result = repo
        .add_all(vec![course_exemption(1, 7, 100), course_exemption(2, 7, 100)])
        .await;

    assert!(matches!(result, Err(DomainError::DuplicateKey { .. })));
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_add_all_rejects_duplicate_within_batch() {
    let repo = InMemoryExemptionRepository::new();

    let result = repo
        .add_all(vec![course_exemption(1, 7, 100), course_exemption(1, 7, 100)])
        .await;

    assert!(matches!(result, Err(DomainError::DuplicateKey { .. })));
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_find_nonexistent() {
    let repo = InMemoryExemptionRepository::new();

    let result = repo.find(999).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_find_all_pagination_partitions() {
    let repo = InMemoryExemptionRepository::new();
    for itemid in 1..=10 {
        repo.add(course_exemption(itemid, 7, 100)).await.unwrap();
    }

    let all = repo.find_all(Paging::all()).await.unwrap();
    assert_eq!(all.len(), 10);

    // Records come back in creation order.
    let ids: Vec<i64> = all.iter().map(|e| e.id.unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);

    let page1 = repo.find_all(Paging::new(0, 5)).await.unwrap();
    let page2 = repo.find_all(Paging::new(5, 5)).await.unwrap();
    let page3 = repo.find_all(Paging::new(10, 5)).await.unwrap();

    assert_eq!(page1.len(), 5);
    assert_eq!(page2.len(), 5);
    assert_eq!(page3.len(), 0);

    // Consecutive windows partition the set without overlap.
    let first: Vec<i64> = page1.iter().map(|e| e.id.unwrap()).collect();
    let second: Vec<i64> = page2.iter().map(|e| e.id.unwrap()).collect();
    assert!(first.iter().all(|id| !second.contains(id)));
}

#[tokio::test]
async fn test_find_by_scalar_and_set_criteria() {
    let repo = InMemoryExemptionRepository::new();
    repo.add(course_exemption(1, 7, 100)).await.unwrap();
    repo.add(
        Exemption::new("core_course", "course_item", 2, 7, 100).with_usermodified(100),
    )
    .await
    .unwrap();
    repo.add(
        Exemption::new("core_user", "course", 3, 7, 100).with_usermodified(100),
    )
    .await
    .unwrap();

    // Scalar criterion: one itemtype only.
    let criteria = ExemptionCriteria::new()
        .with_component("core_course")
        .with_itemtype("course");
    let found = repo.find_by(&criteria, Paging::all()).await.unwrap();
    assert_eq!(found.len(), 1);

    // Set-valued criterion: the union of both itemtypes.
    let criteria = ExemptionCriteria::new()
        .with_component("core_course")
        .with_itemtypes(["course", "course_item"]);
    let found = repo.find_by(&criteria, Paging::all()).await.unwrap();
    assert_eq!(found.len(), 2);

    // The result is keyed by id.
    for (id, exemption) in &found {
        assert_eq!(Some(*id), exemption.id);
    }
}

#[tokio::test]
async fn test_find_by_empty_criteria_matches_everything() {
    let repo = InMemoryExemptionRepository::new();
    repo.add(course_exemption(1, 7, 100)).await.unwrap();
    repo.add(course_exemption(2, 7, 100)).await.unwrap();

    let found = repo
        .find_by(&ExemptionCriteria::new(), Paging::all())
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_find_by_pagination() {
    let repo = InMemoryExemptionRepository::new();
    for itemid in 1..=10 {
        repo.add(course_exemption(itemid, 7, 100)).await.unwrap();
    }

    let criteria = ExemptionCriteria::new().with_userid(100);
    assert_eq!(
        repo.find_by(&criteria, Paging::new(0, 5)).await.unwrap().len(),
        5
    );
    assert_eq!(
        repo.find_by(&criteria, Paging::new(5, 5)).await.unwrap().len(),
        5
    );
    assert_eq!(
        repo.find_by(&criteria, Paging::new(10, 5)).await.unwrap().len(),
        0
    );
}

#[tokio::test]
async fn test_find_exemption_exact_lookup() {
    let repo = InMemoryExemptionRepository::new();
    let saved = repo.add(course_exemption(42, 7, 100)).await.unwrap();

    let found = repo
        .find_exemption(100, "core_course", "course", 42, 7)
        .await
        .unwrap();
    assert_eq!(found.id, saved.id);

    // Any differing key field misses.
    let result = repo.find_exemption(101, "core_course", "course", 42, 7).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_exists_and_exists_by() {
    let repo = InMemoryExemptionRepository::new();
    let saved = repo.add(course_exemption(42, 7, 100)).await.unwrap();

    assert!(repo.exists(saved.id.unwrap()).await.unwrap());
    assert!(!repo.exists(saved.id.unwrap() + 1).await.unwrap());

    let criteria = ExemptionCriteria::new()
        .with_component("core_course")
        .with_itemid(42);
    assert!(repo.exists_by(&criteria).await.unwrap());

    let criteria = ExemptionCriteria::new().with_component("core_user");
    assert!(!repo.exists_by(&criteria).await.unwrap());
}

#[tokio::test]
async fn test_count_by() {
    let repo = InMemoryExemptionRepository::new();
    repo.add(course_exemption(1, 7, 100)).await.unwrap();
    repo.add(course_exemption(2, 7, 100)).await.unwrap();
    repo.add(course_exemption(1, 7, 101)).await.unwrap();

    assert_eq!(repo.count().await.unwrap(), 3);

    let criteria = ExemptionCriteria::new().with_userid(100);
    assert_eq!(repo.count_by(&criteria).await.unwrap(), 2);

    let criteria = ExemptionCriteria::new().with_userid(999);
    assert_eq!(repo.count_by(&criteria).await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_mutable_fields_only() {
    let repo = InMemoryExemptionRepository::new();
    let saved = repo.add(course_exemption(42, 7, 100)).await.unwrap();
    let created_at = saved.timecreated;

    let mut changed = saved.clone();
    changed.ordering = Some(5);
    changed.usermodified = Some(101);

    let updated = repo.update(changed).await.unwrap();
    assert_eq!(updated.ordering, Some(5));
    assert_eq!(updated.usermodified, Some(101));
    assert_eq!(updated.timecreated, created_at);
}

#[tokio::test]
async fn test_update_nonexistent() {
    let repo = InMemoryExemptionRepository::new();

    let mut phantom = course_exemption(42, 7, 100);
    phantom.id = Some(999);

    let result = repo.update(phantom).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let repo = InMemoryExemptionRepository::new();
    let saved = repo.add(course_exemption(42, 7, 100)).await.unwrap();
    let id = saved.id.unwrap();

    assert!(repo.delete(id).await.unwrap());
    assert!(!repo.exists(id).await.unwrap());

    // A second delete of the same id is a no-op, not an error.
    assert!(!repo.delete(id).await.unwrap());
}

#[tokio::test]
async fn test_delete_by_no_matches_is_noop() {
    let repo = InMemoryExemptionRepository::new();
    repo.add(course_exemption(42, 7, 100)).await.unwrap();

    let criteria = ExemptionCriteria::new().with_component("core_user");
    let removed = repo.delete_by(&criteria).await.unwrap();

    assert_eq!(removed, 0);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_by_criteria() {
    let repo = InMemoryExemptionRepository::new();
    repo.add(course_exemption(1, 7, 100)).await.unwrap();
    repo.add(course_exemption(1, 7, 101)).await.unwrap();
    repo.add(course_exemption(1, 8, 100)).await.unwrap();

    let criteria = ExemptionCriteria::new().with_itemid(1).with_contextid(7);
    let removed = repo.delete_by(&criteria).await.unwrap();

    assert_eq!(removed, 2);
    assert_eq!(repo.count().await.unwrap(), 1);

    // The record in the other context survives.
    assert!(repo
        .find_exemption(100, "core_course", "course", 1, 8)
        .await
        .is_ok());
}
