//! Value objects for the exemptions domain.

pub mod join_sql;

pub use join_sql::{ExemptionJoinSql, EXEMPTION_TABLE};
