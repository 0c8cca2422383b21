//! Parameterized MySQL rendering of list plans and lookups.
//!
//! Identifiers come exclusively from the resource catalog and are
//! backtick-quoted; request text is only ever bound through `?`
//! placeholders. `LIKE` wildcards inside the search term are escaped with
//! `!`.

use lcadash_core::Value;

use super::{Condition, ListPlan, SearchPredicate};

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

fn quote_ident(ident: &'static str) -> String {
    debug_assert!(!ident.contains('`'), "catalog identifier contains a backtick");
    format!("`{ident}`")
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(ch);
    }
    escaped
}

fn to_param(n: u64) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn push_where(sql: &mut String, predicate: &SearchPredicate, params: &mut Vec<Value>) {
    if let SearchPredicate::Contains { columns, needle } = predicate {
        let cols: Vec<String> = columns.iter().copied().map(quote_ident).collect();
        sql.push_str(" WHERE LOWER(CONCAT_WS('', ");
        sql.push_str(&cols.join(", "));
        sql.push_str(")) LIKE ? ESCAPE '!'");
        params.push(Value::String(format!("%{}%", escape_like(needle))));
    }
}

/// `SELECT` for one window of a list plan.
#[must_use]
pub fn list_statement(plan: &ListPlan) -> SqlStatement {
    let mut sql = format!("SELECT * FROM {}", quote_ident(plan.resource));
    let mut params = Vec::new();
    push_where(&mut sql, &plan.predicate, &mut params);

    if !plan.order.is_empty() {
        let terms: Vec<String> = plan
            .order
            .iter()
            .map(|t| {
                let dir = if t.descending { "DESC" } else { "ASC" };
                format!("{} {dir}", quote_ident(t.column))
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }

    sql.push_str(" LIMIT ? OFFSET ?");
    params.push(to_param(plan.take));
    params.push(to_param(plan.skip));

    SqlStatement { sql, params }
}

/// `SELECT COUNT(*)` of the rows matching the plan's predicate.
#[must_use]
pub fn count_statement(plan: &ListPlan) -> SqlStatement {
    let mut sql = format!("SELECT COUNT(*) AS total FROM {}", quote_ident(plan.resource));
    let mut params = Vec::new();
    push_where(&mut sql, &plan.predicate, &mut params);
    SqlStatement { sql, params }
}

/// `SELECT` of every row satisfying all `conditions`, ordered by `order_by`.
#[must_use]
pub fn select_where(
    resource: &'static str,
    conditions: &[Condition],
    order_by: &'static str,
) -> SqlStatement {
    let mut sql = format!("SELECT * FROM {}", quote_ident(resource));
    let mut params = Vec::with_capacity(conditions.len());
    if !conditions.is_empty() {
        let terms: Vec<String> = conditions
            .iter()
            .map(|c| format!("{} = ?", quote_ident(c.column)))
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&terms.join(" AND "));
        params.extend(conditions.iter().map(|c| c.value.clone()));
    }
    sql.push_str(&format!(" ORDER BY {} ASC", quote_ident(order_by)));
    SqlStatement { sql, params }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceCatalog;
    use crate::query::compile;
    use lcadash_core::{QueryDescriptor, SearchSpec, SortSpec};

    #[test]
    fn list_statement_binds_search_and_window() {
        let catalog = ResourceCatalog::lca();
        let d = QueryDescriptor::new("buildings", 100)
            .with_search(SearchSpec::new("Oslo", ["city", "project"]))
            .with_sort(SortSpec::descending("city"))
            .with_window(200, 100);
        let stmt = list_statement(&compile(&catalog, &d, 1000).unwrap());

        assert_eq!(
            stmt.sql,
            "SELECT * FROM `buildings` WHERE LOWER(CONCAT_WS('', `city`, `project`)) LIKE ? \
             ESCAPE '!' ORDER BY `city` DESC, `idbuildings` ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            stmt.params,
            vec![Value::from("%oslo%"), Value::Int(100), Value::Int(200)]
        );
    }

    #[test]
    fn injection_text_stays_in_parameters() {
        let catalog = ResourceCatalog::lca();
        let d = QueryDescriptor::new("buildings", 10)
            .with_search(SearchSpec::new("x' OR 1=1; --", ["city"]));
        let stmt = list_statement(&compile(&catalog, &d, 1000).unwrap());
        assert!(!stmt.sql.contains("OR 1=1"));
        assert_eq!(stmt.params[0], Value::from("%x' or 1=1; --%"));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_a!"), "50!%!_a!!");
    }

    #[test]
    fn count_statement_has_no_window() {
        let catalog = ResourceCatalog::lca();
        let plan = compile(&catalog, &QueryDescriptor::new("location", 10), 1000).unwrap();
        let stmt = count_statement(&plan);
        assert_eq!(stmt.sql, "SELECT COUNT(*) AS total FROM `location`");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn select_where_joins_conditions() {
        let stmt = select_where(
            "buildingelements",
            &[
                Condition::new("idbuildings", 7_i64),
                Condition::new("idlevels", 0_i64),
            ],
            "idbuilding_elements",
        );
        assert_eq!(
            stmt.sql,
            "SELECT * FROM `buildingelements` WHERE `idbuildings` = ? AND `idlevels` = ? \
             ORDER BY `idbuilding_elements` ASC"
        );
        assert_eq!(stmt.params, vec![Value::Int(7), Value::Int(0)]);
    }
}
