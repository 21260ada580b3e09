//! Join fragment handed to external queries for result-set enrichment.

use std::collections::BTreeMap;

/// Name of the table holding exemption records.
pub const EXEMPTION_TABLE: &str = "exemptions";

/// A LEFT OUTER JOIN clause plus the named parameters it requires.
///
/// The fragment joins the exemptions table into a caller's query so each
/// base row can be annotated with its exemption status (a NULL check on
/// the alias) without filtering any rows out. Placeholder names are
/// derived from the caller-chosen alias, so they cannot collide with the
/// caller's own parameters.
///
/// Callers on drivers with positional binds should substitute the
/// placeholders in map iteration order; the map is sorted and the
/// placeholders appear in the fragment in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemptionJoinSql {
    /// The join clause, embeddable after the base table of a query
    pub sql: String,

    /// Placeholder name to value, for the parameterized predicates
    pub params: BTreeMap<String, String>,
}

impl ExemptionJoinSql {
    /// Build the join clause for one component/itemtype area.
    ///
    /// `join_item_expr` is the caller-side column expression the item id is
    /// matched against (e.g. `c.id`). When `userid` is given it is inlined
    /// as a literal predicate, scoping the join to that user's exemptions.
    pub(crate) fn build(
        component: &str,
        itemtype: &str,
        alias: &str,
        join_item_expr: &str,
        userid: Option<i64>,
    ) -> Self {
        let component_param = format!("{}component", alias);
        let itemtype_param = format!("{}itemtype", alias);

        let mut sql = format!(
            "LEFT JOIN {} {} ON {}.component = :{} AND {}.itemtype = :{}",
            EXEMPTION_TABLE, alias, alias, component_param, alias, itemtype_param,
        );
        if let Some(userid) = userid {
            sql.push_str(&format!(" AND {}.userid = {}", alias, userid));
        }
        sql.push_str(&format!(" AND {}.itemid = {}", alias, join_item_expr));

        let mut params = BTreeMap::new();
        params.insert(component_param, component.to_string());
        params.insert(itemtype_param, itemtype.to_string());

        Self { sql, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_scoped_fragment() {
        let join = ExemptionJoinSql::build("core_course", "course", "exem", "c.id", Some(1234));

        assert_eq!(
            join.sql,
            "LEFT JOIN exemptions exem ON exem.component = :exemcomponent \
             AND exem.itemtype = :exemitemtype AND exem.userid = 1234 AND exem.itemid = c.id"
        );
        assert_eq!(
            join.params.get("exemcomponent").map(String::as_str),
            Some("core_course")
        );
        assert_eq!(
            join.params.get("exemitemtype").map(String::as_str),
            Some("course")
        );
    }

    #[test]
    fn test_component_wide_fragment_has_no_userid_predicate() {
        let join = ExemptionJoinSql::build("core_course", "course", "exem", "c.id", None);

        assert!(!join.sql.contains("userid"));
        assert!(join.sql.contains("exem.itemid = c.id"));
    }

    #[test]
    fn test_placeholders_follow_alias() {
        let join = ExemptionJoinSql::build("core_course", "course", "other", "t.item", Some(1));

        assert!(join.sql.contains(":othercomponent"));
        assert!(join.sql.contains(":otheritemtype"));
        assert_eq!(join.params.len(), 2);
    }
}
