//! MySQL implementation of the ExemptionRepository trait.
//!
//! This module provides the concrete implementation of exemption
//! persistence using MySQL with SQLx. The natural-key uniqueness invariant
//! is enforced by a unique index on the table (see `schema.sql`), so
//! concurrent creates for the same key cannot both succeed; the driver's
//! unique-violation classification is surfaced as the duplicate-key error.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{MySql, MySqlPool, Row};

use ex_core::domain::entities::Exemption;
use ex_core::domain::value_objects::EXEMPTION_TABLE;
use ex_core::errors::{DomainError, DomainResult};
use ex_core::repositories::{ExemptionCriteria, ExemptionRepository, FieldFilter};
use ex_shared::types::Paging;

/// Column list shared by every SELECT over the exemptions table
const COLUMNS: &str =
    "id, component, itemtype, itemid, contextid, userid, ordering, timecreated, usermodified";

/// MySQL implementation of ExemptionRepository
pub struct MySqlExemptionRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlExemptionRepository {
    /// Create a new MySQL exemption repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert a database row to an Exemption entity
    fn row_to_exemption(row: &MySqlRow) -> DomainResult<Exemption> {
        let timecreated: DateTime<Utc> = row
            .try_get("timecreated")
            .map_err(|e| column_error("timecreated", e))?;

        Ok(Exemption {
            id: Some(row.try_get::<i64, _>("id").map_err(|e| column_error("id", e))?),
            component: row
                .try_get("component")
                .map_err(|e| column_error("component", e))?,
            itemtype: row
                .try_get("itemtype")
                .map_err(|e| column_error("itemtype", e))?,
            itemid: row.try_get("itemid").map_err(|e| column_error("itemid", e))?,
            contextid: row
                .try_get("contextid")
                .map_err(|e| column_error("contextid", e))?,
            userid: row.try_get("userid").map_err(|e| column_error("userid", e))?,
            ordering: row
                .try_get("ordering")
                .map_err(|e| column_error("ordering", e))?,
            timecreated: Some(timecreated),
            usermodified: Some(
                row.try_get::<i64, _>("usermodified")
                    .map_err(|e| column_error("usermodified", e))?,
            ),
        })
    }
}

#[async_trait]
impl ExemptionRepository for MySqlExemptionRepository {
    async fn add(&self, exemption: Exemption) -> DomainResult<Exemption> {
        exemption.validate()?;

        let timecreated = Utc::now();
        let query = format!(
            "INSERT INTO {} (component, itemtype, itemid, contextid, userid, ordering, timecreated, usermodified) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            EXEMPTION_TABLE
        );

        let result = sqlx::query(&query)
            .bind(&exemption.component)
            .bind(&exemption.itemtype)
            .bind(exemption.itemid)
            .bind(exemption.contextid)
            .bind(exemption.userid)
            .bind(exemption.ordering)
            .bind(timecreated)
            .bind(exemption.usermodified)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error(&exemption, e))?;

        let mut saved = exemption;
        saved.id = Some(result.last_insert_id() as i64);
        saved.timecreated = Some(timecreated);
        Ok(saved)
    }

    async fn add_all(&self, exemptions: Vec<Exemption>) -> DomainResult<Vec<Exemption>> {
        for exemption in &exemptions {
            exemption.validate()?;
        }

        // One transaction for the whole batch: dropping it on an early
        // return rolls everything back, so a duplicate mid-batch leaves no
        // partial rows behind.
        let mut tx = self.pool.begin().await.map_err(query_error)?;

        let timecreated = Utc::now();
        let query = format!(
            "INSERT INTO {} (component, itemtype, itemid, contextid, userid, ordering, timecreated, usermodified) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            EXEMPTION_TABLE
        );

        let mut saved = Vec::with_capacity(exemptions.len());
        for exemption in exemptions {
            let result = sqlx::query(&query)
                .bind(&exemption.component)
                .bind(&exemption.itemtype)
                .bind(exemption.itemid)
                .bind(exemption.contextid)
                .bind(exemption.userid)
                .bind(exemption.ordering)
                .bind(timecreated)
                .bind(exemption.usermodified)
                .execute(&mut *tx)
                .await
                .map_err(|e| insert_error(&exemption, e))?;

            let mut record = exemption;
            record.id = Some(result.last_insert_id() as i64);
            record.timecreated = Some(timecreated);
            saved.push(record);
        }

        tx.commit().await.map_err(query_error)?;
        Ok(saved)
    }

    async fn find(&self, id: i64) -> DomainResult<Exemption> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = ? LIMIT 1",
            COLUMNS, EXEMPTION_TABLE
        );

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Self::row_to_exemption(&row),
            None => Err(DomainError::NotFound {
                resource: format!("exemption {}", id),
            }),
        }
    }

    async fn find_all(&self, paging: Paging) -> DomainResult<Vec<Exemption>> {
        let mut query = format!(
            "SELECT {} FROM {} ORDER BY id ASC",
            COLUMNS, EXEMPTION_TABLE
        );
        let mut binds = Vec::new();
        push_paging(&mut query, &mut binds, paging);

        let rows = bind_all(sqlx::query(&query), &binds)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        rows.iter().map(Self::row_to_exemption).collect()
    }

    async fn find_by(
        &self,
        criteria: &ExemptionCriteria,
        paging: Paging,
    ) -> DomainResult<BTreeMap<i64, Exemption>> {
        let (where_sql, mut binds) = build_where(criteria);
        let mut query = format!(
            "SELECT {} FROM {}{} ORDER BY id ASC",
            COLUMNS, EXEMPTION_TABLE, where_sql
        );
        push_paging(&mut query, &mut binds, paging);

        let rows = bind_all(sqlx::query(&query), &binds)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        let mut found = BTreeMap::new();
        for row in &rows {
            let exemption = Self::row_to_exemption(row)?;
            if let Some(id) = exemption.id {
                found.insert(id, exemption);
            }
        }
        Ok(found)
    }

    async fn find_exemption(
        &self,
        userid: i64,
        component: &str,
        itemtype: &str,
        itemid: i64,
        contextid: i64,
    ) -> DomainResult<Exemption> {
        let query = format!(
            "SELECT {} FROM {} \
             WHERE userid = ? AND component = ? AND itemtype = ? AND itemid = ? AND contextid = ? \
             LIMIT 1",
            COLUMNS, EXEMPTION_TABLE
        );

        let row = sqlx::query(&query)
            .bind(userid)
            .bind(component)
            .bind(itemtype)
            .bind(itemid)
            .bind(contextid)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Self::row_to_exemption(&row),
            None => Err(DomainError::NotFound {
                resource: format!("exemption for {}/{} item {}", component, itemtype, itemid),
            }),
        }
    }

    async fn exists(&self, id: i64) -> DomainResult<bool> {
        let query = format!("SELECT 1 FROM {} WHERE id = ? LIMIT 1", EXEMPTION_TABLE);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(row.is_some())
    }

    async fn exists_by(&self, criteria: &ExemptionCriteria) -> DomainResult<bool> {
        let (where_sql, binds) = build_where(criteria);
        let query = format!("SELECT 1 FROM {}{} LIMIT 1", EXEMPTION_TABLE, where_sql);

        let row = bind_all(sqlx::query(&query), &binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(row.is_some())
    }

    async fn count(&self) -> DomainResult<u64> {
        self.count_by(&ExemptionCriteria::new()).await
    }

    async fn count_by(&self, criteria: &ExemptionCriteria) -> DomainResult<u64> {
        let (where_sql, binds) = build_where(criteria);
        let query = format!(
            "SELECT COUNT(*) AS total FROM {}{}",
            EXEMPTION_TABLE, where_sql
        );

        let row = bind_all(sqlx::query(&query), &binds)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;

        let total: i64 = row.try_get("total").map_err(|e| column_error("total", e))?;
        Ok(total as u64)
    }

    async fn update(&self, exemption: Exemption) -> DomainResult<Exemption> {
        let id = exemption.id.ok_or(DomainError::NotFound {
            resource: "exemption without an id".to_string(),
        })?;

        // MySQL reports zero affected rows for a value-identical update,
        // so absence is checked explicitly rather than via rows_affected.
        if !self.exists(id).await? {
            return Err(DomainError::NotFound {
                resource: format!("exemption {}", id),
            });
        }

        let query = format!(
            "UPDATE {} SET ordering = ?, usermodified = ? WHERE id = ?",
            EXEMPTION_TABLE
        );

        sqlx::query(&query)
            .bind(exemption.ordering)
            .bind(exemption.usermodified)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        self.find(id).await
    }

    async fn delete(&self, id: i64) -> DomainResult<bool> {
        let query = format!("DELETE FROM {} WHERE id = ?", EXEMPTION_TABLE);

        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by(&self, criteria: &ExemptionCriteria) -> DomainResult<u64> {
        let (where_sql, binds) = build_where(criteria);
        let query = format!("DELETE FROM {}{}", EXEMPTION_TABLE, where_sql);

        let result = bind_all(sqlx::query(&query), &binds)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected())
    }
}

/// A value waiting to be bound into a dynamically built query
enum BindValue {
    Int(i64),
    Text(String),
}

/// Render the criteria as a WHERE clause with positional placeholders.
///
/// Scalar predicates become equality matches, set-valued predicates become
/// IN-lists, and empty criteria produce no clause at all (matching
/// everything). An empty IN-list can never match, which is rendered as a
/// contradiction.
fn build_where(criteria: &ExemptionCriteria) -> (String, Vec<BindValue>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    int_field(&mut clauses, &mut binds, "userid", &criteria.userid);
    text_field(&mut clauses, &mut binds, "component", &criteria.component);
    text_field(&mut clauses, &mut binds, "itemtype", &criteria.itemtype);
    int_field(&mut clauses, &mut binds, "itemid", &criteria.itemid);
    int_field(&mut clauses, &mut binds, "contextid", &criteria.contextid);

    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), binds)
    }
}

fn int_field(
    clauses: &mut Vec<String>,
    binds: &mut Vec<BindValue>,
    column: &str,
    filter: &Option<FieldFilter<i64>>,
) {
    match filter {
        None => {}
        Some(FieldFilter::Equals(value)) => {
            clauses.push(format!("{} = ?", column));
            binds.push(BindValue::Int(*value));
        }
        Some(FieldFilter::AnyOf(values)) => {
            if values.is_empty() {
                clauses.push("1 = 0".to_string());
            } else {
                let placeholders = vec!["?"; values.len()].join(", ");
                clauses.push(format!("{} IN ({})", column, placeholders));
                binds.extend(values.iter().map(|value| BindValue::Int(*value)));
            }
        }
    }
}

fn text_field(
    clauses: &mut Vec<String>,
    binds: &mut Vec<BindValue>,
    column: &str,
    filter: &Option<FieldFilter<String>>,
) {
    match filter {
        None => {}
        Some(FieldFilter::Equals(value)) => {
            clauses.push(format!("{} = ?", column));
            binds.push(BindValue::Text(value.clone()));
        }
        Some(FieldFilter::AnyOf(values)) => {
            if values.is_empty() {
                clauses.push("1 = 0".to_string());
            } else {
                let placeholders = vec!["?"; values.len()].join(", ");
                clauses.push(format!("{} IN ({})", column, placeholders));
                binds.extend(values.iter().map(|value| BindValue::Text(value.clone())));
            }
        }
    }
}

/// Append the pagination window to a query.
///
/// MySQL has no OFFSET without LIMIT, so an unbounded window with an
/// offset uses the documented maximal limit literal.
fn push_paging(query: &mut String, binds: &mut Vec<BindValue>, paging: Paging) {
    if !paging.is_unbounded() {
        query.push_str(" LIMIT ? OFFSET ?");
        binds.push(BindValue::Int(paging.limit_i64()));
        binds.push(BindValue::Int(paging.offset_i64()));
    } else if paging.offset > 0 {
        query.push_str(" LIMIT 18446744073709551615 OFFSET ?");
        binds.push(BindValue::Int(paging.offset_i64()));
    }
}

fn bind_all<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    binds: &'q [BindValue],
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    let mut query = query;
    for bind in binds {
        query = match bind {
            BindValue::Int(value) => query.bind(*value),
            BindValue::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

fn insert_error(exemption: &Exemption, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DomainError::DuplicateKey {
                component: exemption.component.clone(),
                itemtype: exemption.itemtype.clone(),
                itemid: exemption.itemid,
            };
        }
    }
    DomainError::Database {
        message: format!("Failed to insert exemption: {}", err),
    }
}

fn query_error(err: sqlx::Error) -> DomainError {
    DomainError::Database {
        message: format!("Database query failed: {}", err),
    }
}

fn column_error(column: &str, err: sqlx::Error) -> DomainError {
    DomainError::Database {
        message: format!("Failed to get {}: {}", column, err),
    }
}
