//! Structure-preserving rewrites over finalized SELECT statements
//!
//! A join predicate such as
//!
//! ```text
//! FROM users AS u INNER JOIN orders AS o ON u.user_id = o.user_id
//! ```
//!
//! is parsed attached to one FROM element, but both sides need to compute
//! their half of the key (`user_id` here, `LOWER(email)` for a predicate
//! like `ON LOWER(u.email) = LOWER(o.email)`). Finalize shares the predicate
//! across the partnered sources; `join_value_expr` extracts the per-source
//! half; `rewrite` synthesizes the pushdown sub-statement each source scans
//! with.

use super::expressions::{BinaryOp, Expression};
use super::select::{Column, SelectStatement, SqlSource};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

impl SelectStatement {
    /// The projection list keyed by unqualified field name. Duplicate keys
    /// are overwritten in source order; the caller disambiguates upstream.
    pub fn unaliased_columns(&self) -> HashMap<String, Column> {
        let mut cols = HashMap::with_capacity(self.columns.len());
        for col in &self.columns {
            let (left, right) = col.left_right();
            if left.is_some() {
                cols.insert(right.to_string(), col.clone());
            } else {
                cols.insert(col.as_name.clone(), col.clone());
            }
        }
        cols
    }

    /// Populate the derived fields of every FROM element: canonical alias,
    /// the shared unaliased-column map, and the cross-source join
    /// expression fan-out. Idempotent; must run once before execution.
    pub fn finalize(&mut self) {
        if self.from.is_empty() {
            return;
        }
        let cols = Arc::new(self.unaliased_columns());
        let mut exprs: HashMap<String, Arc<Expression>> = HashMap::new();

        for from in &mut self.from {
            from.finalize();
            from.cols = Some(cols.clone());
            if let Some(expr) = from.join_expr.clone() {
                let (left, right) = from.find_from_aliases();
                exprs.insert(left, expr.clone());
                if !right.is_empty() {
                    exprs.insert(right, expr);
                }
            }
        }

        // The predicate was parsed onto one source; its partner gets the
        // same (shared, immutable) expression.
        for from in &mut self.from {
            if from.join_expr.is_none() {
                if let Some(expr) = exprs.get(&from.canonical_alias) {
                    from.join_expr = Some(expr.clone());
                }
            }
        }
    }
}

impl SqlSource {
    /// The two FROM aliases referenced by this source's join expression.
    /// Each side contributes its identifier qualifier, falling back to this
    /// source's own alias for the first and empty for the second.
    pub(crate) fn find_from_aliases(&self) -> (String, String) {
        let mut from1 = self.canonical_alias.clone();
        let mut from2 = String::new();
        if let Some(expr) = &self.join_expr {
            match expr.as_ref() {
                Expression::Binary(bn) => {
                    if let Expression::Identity(id) = bn.args[0].as_ref() {
                        if let (Some(left), _) = id.left_right() {
                            from1 = left.to_string();
                        }
                    }
                    if let Expression::Identity(id) = bn.args[1].as_ref() {
                        if let (Some(left), _) = id.left_right() {
                            from2 = left.to_string();
                        }
                    }
                }
                other => {
                    tracing::warn!(
                        "node type not supported for join alias discovery: {}",
                        other
                    );
                }
            }
        }
        (from1, from2)
    }

    /// The half of the join predicate that applies to this source, with the
    /// qualifier stripped: `u.user_id = o.user_id` yields `user_id` for the
    /// source aliased `u`.
    ///
    /// Requires the predicate to be a simple binary equality. When neither
    /// operand references this source's alias, the full predicate is
    /// returned and the caller's evaluation will surface the mismatch.
    pub fn join_value_expr(&self) -> Result<Expression> {
        let join_expr = self
            .join_expr
            .as_ref()
            .ok_or_else(|| Error::JoinNotEvaluable("<no join expression>".to_string()))?;
        let Expression::Binary(bn) = join_expr.as_ref() else {
            return Err(Error::JoinNotEvaluable(join_expr.to_string()));
        };
        if !bn.op.is_simple() {
            return Err(Error::JoinNotEvaluable(join_expr.to_string()));
        }
        for arg in &bn.args {
            if let Expression::Identity(id) = arg.as_ref() {
                let (left, right) = id.left_right();
                if left == Some(self.canonical_alias.as_str()) && !right.is_empty() {
                    return Ok(Expression::identity(right));
                }
            }
        }
        Ok(join_expr.as_ref().clone())
    }

    /// Synthesize the per-source SELECT for pushdown: project the parent
    /// columns that belong to this source (qualifiers stripped), append the
    /// fields the join predicate needs, and scan this source's table.
    pub fn rewrite(&mut self, parent: &SelectStatement) -> SelectStatement {
        if parent.star {
            self.star = true;
        } else {
            self.columns = Vec::new();
            for col in &parent.columns {
                match col.qualifier() {
                    // Not left/right qualified, so use as-is.
                    None => self.columns.push(col.clone()),
                    Some(left) if left == self.canonical_alias => {
                        let mut new_col = col.rewrite_for_source();
                        if let Some(expr) = &col.expr {
                            if let Some(rewritten) = rewrite_node(&self.canonical_alias, expr) {
                                new_col.expr = Some(rewritten);
                            }
                        }
                        self.columns.push(new_col);
                    }
                    // Belongs to another source.
                    Some(_) => {}
                }
            }
        }
        // TODO: push the WHERE clause and sort down into the sub-statement.
        let mut child = SelectStatement {
            star: self.star,
            columns: self.columns.clone(),
            ..Default::default()
        };
        child.from.push(SqlSource::table(self.name.clone()));
        if let Some(join_expr) = &self.join_expr {
            child.columns = columns_from_node(&self.canonical_alias, join_expr, child.columns);
        }
        child
    }
}

/// Rewrite an expression for one source by stripping that source's
/// qualifier. Returns `None` when no part of the node references the alias.
fn rewrite_node(alias: &str, node: &Expression) -> Option<Expression> {
    match node {
        Expression::Identity(id) => {
            let (left, right) = id.left_right();
            if left == Some(alias) {
                return Some(Expression::identity(right));
            }
            None
        }
        Expression::Binary(bn) => match bn.op {
            BinaryOp::And | BinaryOp::Or => {
                let lhs = rewrite_node(alias, &bn.args[0]);
                let rhs = rewrite_node(alias, &bn.args[1]);
                match (lhs, rhs) {
                    (Some(lhs), Some(rhs)) => Some(Expression::binary(bn.op, lhs, rhs)),
                    _ => None,
                }
            }
            BinaryOp::Eq | BinaryOp::EqEq => {
                if let Some(n) = rewrite_node(alias, &bn.args[0]) {
                    return Some(n);
                }
                if let Some(n) = rewrite_node(alias, &bn.args[1]) {
                    return Some(n);
                }
                tracing::warn!("could not find node for {} in: {}", alias, node);
                None
            }
            op => {
                tracing::warn!("un-implemented operator in join rewrite: {}", op.symbol());
                None
            }
        },
        Expression::Function(_) => {
            tracing::warn!("function nodes are not supported for join rewrite: {}", node);
            None
        }
    }
}

/// Walk the join predicate and make sure every field it references on this
/// source is present in the projection, appending unqualified columns for
/// the missing ones.
fn columns_from_node(alias: &str, node: &Expression, mut cols: Vec<Column>) -> Vec<Column> {
    match node {
        Expression::Identity(id) => {
            let (left, right) = id.left_right();
            if left == Some(alias) {
                let found = cols.iter().any(|col| col.right_name() == right);
                if !found {
                    cols.push(Column::with_expr(right, Expression::identity(right)));
                }
            }
            cols
        }
        Expression::Binary(bn) => match bn.op {
            BinaryOp::And | BinaryOp::Or | BinaryOp::Eq | BinaryOp::EqEq => {
                let cols = columns_from_node(alias, &bn.args[0], cols);
                columns_from_node(alias, &bn.args[1], cols)
            }
            op => {
                tracing::warn!("un-implemented operator in join rewrite: {}", op.symbol());
                cols
            }
        },
        Expression::Function(_) => {
            tracing::warn!("function nodes are not supported for join rewrite: {}", node);
            cols
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{JoinKind, JoinOp};
    use super::*;

    fn users_orders_join() -> SelectStatement {
        let mut sel = SelectStatement::new();
        sel.add_column(Column::with_expr("u.name", Expression::identity("u.name")));
        sel.add_column(Column::with_expr("o.item", Expression::identity("o.item")));
        sel.from.push(SqlSource::aliased("users", "u"));

        let mut orders = SqlSource::aliased("orders", "o");
        orders.op = Some(JoinOp::On);
        orders.join_kind = Some(JoinKind::Inner);
        orders.join_expr = Some(Arc::new(Expression::binary(
            BinaryOp::Eq,
            Expression::identity("u.user_id"),
            Expression::identity("o.user_id"),
        )));
        sel.from.push(orders);
        sel
    }

    #[test]
    fn test_unaliased_columns_keys() {
        let sel = users_orders_join();
        let cols = sel.unaliased_columns();
        assert_eq!(cols.len(), 2);
        assert!(cols.contains_key("name"));
        assert!(cols.contains_key("item"));
        assert!(cols.keys().all(|k| !k.is_empty()));
    }

    #[test]
    fn test_unaliased_columns_bounded_by_projection() {
        let mut sel = SelectStatement::new();
        sel.add_column(Column::with_expr("u.name", Expression::identity("u.name")));
        // Same unqualified key; last write wins.
        sel.add_column(Column::with_expr("o.name", Expression::identity("o.name")));
        let cols = sel.unaliased_columns();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols["name"].as_name, "o.name");
    }

    #[test]
    fn test_finalize_shares_join_expr() {
        let mut sel = users_orders_join();
        sel.finalize();

        assert_eq!(sel.from[0].canonical_alias, "u");
        assert_eq!(sel.from[1].canonical_alias, "o");
        assert!(sel.from[0].join_expr.is_some());
        assert!(Arc::ptr_eq(
            sel.from[0].join_expr.as_ref().unwrap(),
            sel.from[1].join_expr.as_ref().unwrap()
        ));
        assert_eq!(sel.from[0].unaliased_columns().len(), 2);
    }

    #[test]
    fn test_finalize_defaults_alias_to_name() {
        let mut sel = SelectStatement::new();
        sel.add_column(Column::new("name"));
        sel.from.push(SqlSource::table("Users"));
        sel.finalize();
        assert_eq!(sel.from[0].canonical_alias, "users");
    }

    #[test]
    fn test_finalize_idempotent() {
        let mut once = users_orders_join();
        once.finalize();
        let mut twice = once.clone();
        twice.finalize();

        assert_eq!(once, twice);
        for (a, b) in once.from.iter().zip(twice.from.iter()) {
            assert_eq!(a.canonical_alias, b.canonical_alias);
            assert_eq!(a.unaliased_columns().len(), b.unaliased_columns().len());
        }
    }

    #[test]
    fn test_join_value_expr_both_sides() {
        let mut sel = users_orders_join();
        sel.finalize();

        let lh = sel.from[0].join_value_expr().unwrap();
        let rh = sel.from[1].join_value_expr().unwrap();
        assert_eq!(lh.to_string(), "user_id");
        assert_eq!(rh.to_string(), "user_id");
        assert!(matches!(lh, Expression::Identity(_)));
    }

    #[test]
    fn test_join_value_expr_requires_simple_equality() {
        let mut sel = users_orders_join();
        sel.from[1].join_expr = Some(Arc::new(Expression::binary(
            BinaryOp::Gt,
            Expression::identity("u.user_id"),
            Expression::identity("o.user_id"),
        )));
        sel.finalize();

        let err = sel.from[1].join_value_expr().unwrap_err();
        assert!(matches!(err, Error::JoinNotEvaluable(_)));
    }

    #[test]
    fn test_join_value_expr_missing_predicate() {
        let mut source = SqlSource::aliased("users", "u");
        source.finalize();
        assert!(source.join_value_expr().is_err());
    }

    #[test]
    fn test_join_value_expr_falls_back_to_full_predicate() {
        let mut sel = users_orders_join();
        sel.finalize();
        // An alias the predicate never references.
        let mut stray = SqlSource::aliased("extra", "x");
        stray.join_expr = sel.from[1].join_expr.clone();
        stray.finalize();

        let expr = stray.join_value_expr().unwrap();
        assert_eq!(expr.to_string(), "u.user_id = o.user_id");
    }

    #[test]
    fn test_rewrite_projects_own_columns() {
        let mut sel = users_orders_join();
        sel.finalize();

        let mut left = sel.from[0].clone();
        let child = left.rewrite(&sel);

        assert_eq!(child.from.len(), 1);
        assert_eq!(child.from[0].name, "users");
        let names: Vec<_> = child.columns.iter().map(|c| c.key().to_string()).collect();
        assert_eq!(names, vec!["name", "user_id"]);
    }

    #[test]
    fn test_rewrite_star_parent() {
        let mut sel = users_orders_join();
        sel.columns.clear();
        sel.star = true;
        sel.finalize();

        let mut right = sel.from[1].clone();
        let child = right.rewrite(&sel);
        assert!(child.star);
        // The join key still has to be projected.
        let names: Vec<_> = child.columns.iter().map(|c| c.key().to_string()).collect();
        assert_eq!(names, vec!["user_id"]);
    }

    #[test]
    fn test_rewrite_does_not_duplicate_join_key() {
        let mut sel = users_orders_join();
        sel.add_column(Column::with_expr(
            "u.user_id",
            Expression::identity("u.user_id"),
        ));
        sel.finalize();

        let mut left = sel.from[0].clone();
        let child = left.rewrite(&sel);
        let user_id_cols = child
            .columns
            .iter()
            .filter(|c| c.right_name() == "user_id")
            .count();
        assert_eq!(user_id_cols, 1);
    }

    #[test]
    fn test_rewrite_keeps_unqualified_columns() {
        let mut sel = users_orders_join();
        sel.add_column(Column::with_expr("total", Expression::identity("total")));
        sel.finalize();

        let mut left = sel.from[0].clone();
        let child = left.rewrite(&sel);
        assert!(child.columns.iter().any(|c| c.key() == "total"));
    }

    #[test]
    fn test_rewrite_node_and_chain() {
        let expr = Expression::binary(
            BinaryOp::And,
            Expression::binary(
                BinaryOp::Eq,
                Expression::identity("u.a"),
                Expression::identity("o.a"),
            ),
            Expression::binary(
                BinaryOp::Eq,
                Expression::identity("u.b"),
                Expression::identity("o.b"),
            ),
        );
        let rewritten = rewrite_node("u", &expr).unwrap();
        assert_eq!(rewritten.to_string(), "a AND b");
    }

    #[test]
    fn test_rewrite_node_unsupported_operator() {
        let expr = Expression::binary(
            BinaryOp::Gt,
            Expression::identity("u.a"),
            Expression::identity("o.a"),
        );
        assert!(rewrite_node("u", &expr).is_none());
    }

    #[test]
    fn test_find_from_aliases() {
        let mut sel = users_orders_join();
        sel.finalize();
        let (left, right) = sel.from[1].find_from_aliases();
        assert_eq!(left, "u");
        assert_eq!(right, "o");
    }
}
