//! Salesforce Object Query Language (SOQL) generation.

use crate::ast::SelectAst;
use crate::transpiler::conditions::ConditionToSoql;

/// Projected when neither the selection nor the model yields a field.
pub const DEFAULT_PROJECTION: &str = "Id";

/// Build the SOQL text for a select descriptor.
///
/// Total over any descriptor: keys missing from the model's field map are
/// used as paths verbatim.
pub fn build_soql(ast: &SelectAst) -> String {
    let model = &ast.model;
    let path_for = |key: &str| model.path_for(key).unwrap_or(key).to_string();

    let mut sql = String::from("SELECT ");

    // Columns
    let fields: Vec<String> = ast.projected_keys().into_iter().map(path_for).collect();
    if fields.is_empty() {
        sql.push_str(DEFAULT_PROJECTION);
    } else {
        sql.push_str(&fields.join(", "));
    }

    // FROM
    sql.push_str(" FROM ");
    sql.push_str(&model.object);

    // WHERE
    if let Some(filter) = &ast.filter {
        sql.push_str(" WHERE ");
        sql.push_str(&filter.to_soql());
    }

    // ORDER BY
    if !ast.order_by.is_empty() {
        let order: Vec<String> = ast
            .order_by
            .iter()
            .map(|o| format!("{} {}", path_for(o.field.as_str()), o.direction.keyword()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));
    }

    // LIMIT / OFFSET, only when positive
    if let Some(n) = ast.limit.filter(|n| *n > 0) {
        sql.push_str(&format!(" LIMIT {}", n));
    }
    if let Some(n) = ast.offset.filter(|n| *n > 0) {
        sql.push_str(&format!(" OFFSET {}", n));
    }

    sql
}
