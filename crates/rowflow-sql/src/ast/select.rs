//! SELECT statements and their clauses
//!
//! A `SelectStatement` is built by the parser, finalized once (which
//! populates the derived alias and column-map fields), and is then
//! read-only for the rest of its life.

use super::expressions::{Expression, split_qualified};
use super::{Direction, JoinKind, JoinOp, JoinSide, Pos};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A projection element of a SELECT list.
///
/// The parser guarantees `as_name` is non-empty; star columns carry `"*"`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    /// Field name of the underlying source field.
    pub source_field: String,
    /// The column's alias; auto-populated from the field name when no
    /// explicit AS was given.
    pub as_name: String,
    /// Expression, often a bare identity node.
    pub expr: Option<Expression>,
    /// IF guard expression.
    pub guard: Option<Expression>,
    /// Whether this column is just `*`.
    pub star: bool,
    /// ASC | DESC, for ORDER BY columns.
    pub order: Option<Direction>,
    /// Quote byte around the source field in the original text.
    pub source_quote: Option<u8>,
    /// Quote byte around the alias in the original text.
    pub as_quote: Option<u8>,
    /// In-line comment attached to the column.
    pub comment: Option<String>,
}

impl Column {
    pub fn new<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        Self {
            source_field: name.clone(),
            as_name: name,
            ..Default::default()
        }
    }

    /// Column with an explicit expression.
    pub fn with_expr<S: Into<String>>(name: S, expr: Expression) -> Self {
        let mut col = Column::new(name);
        col.expr = Some(expr);
        col
    }

    /// The `*` column.
    pub fn wildcard() -> Self {
        Self {
            source_field: "*".to_string(),
            as_name: "*".to_string(),
            star: true,
            ..Default::default()
        }
    }

    /// The key this column projects under.
    pub fn key(&self) -> &str {
        &self.as_name
    }

    /// Split the alias into qualifier and base name, `(None, whole)` when
    /// unqualified.
    pub fn left_right(&self) -> (Option<&str>, &str) {
        split_qualified(&self.as_name)
    }

    /// The table qualifier of the alias, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.left_right().0
    }

    /// The alias with any table qualifier stripped.
    pub fn right_name(&self) -> &str {
        self.left_right().1
    }

    /// Clone of this column suitable for a per-source sub-statement: the
    /// alias drops its qualifier, quoting is preserved.
    pub fn rewrite_for_source(&self) -> Column {
        Column {
            source_field: self.source_field.clone(),
            as_name: self.right_name().to_string(),
            source_quote: self.source_quote,
            as_quote: self.as_quote,
            ..Default::default()
        }
    }

    /// Is this a `count(*)` column?
    pub fn is_count_star(&self) -> bool {
        match &self.expr {
            Some(Expression::Function(f)) => {
                f.name.eq_ignore_ascii_case("count")
                    && f.args.len() == 1
                    && f.args[0].to_string() == "*"
            }
            _ => false,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.star {
            return write!(f, "*");
        }
        let rendered = match &self.expr {
            Some(expr) => expr.to_string(),
            None => self.source_field.clone(),
        };
        write!(f, "{}", rendered)?;
        if self.as_name != rendered {
            match self.as_quote {
                Some(q) => write!(f, " AS {q}{}{q}", self.as_name, q = q as char)?,
                None => write!(f, " AS {}", self.as_name)?,
            }
        }
        if let Some(guard) = &self.guard {
            write!(f, " IF {}", guard)?;
        }
        match self.order {
            Some(Direction::Asc) => write!(f, " ASC")?,
            Some(Direction::Desc) => write!(f, " DESC")?,
            None => {}
        }
        Ok(())
    }
}

/// A WHERE clause: either a plain expression or an `IN (SELECT ...)`
/// subquery.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    Expr(Expression),
    Subquery {
        op: JoinOp,
        source: Box<SelectStatement>,
    },
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereClause::Expr(expr) => write!(f, "{}", expr),
            WhereClause::Subquery { op, source } => {
                write!(f, "{} ({})", op.keyword(), source)
            }
        }
    }
}

impl JoinOp {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinOp::On => "ON",
            JoinOp::Using => "USING",
            JoinOp::In => "IN",
        }
    }
}

/// One element of a FROM list: a base table, a sub-select, or a join.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlSource {
    pub pos: Pos,
    /// Raw partial statement text.
    pub raw: String,
    /// Table name; empty for a pure sub-select.
    pub name: String,
    /// Alias as parsed (`users AS u`).
    pub alias: Option<String>,
    /// ON / USING / IN.
    pub op: Option<JoinOp>,
    /// LEFT / RIGHT.
    pub side: Option<JoinSide>,
    /// INNER / OUTER.
    pub join_kind: Option<JoinKind>,
    /// Sub-select, for `FROM (SELECT ...)` or join sources.
    pub source: Option<Box<SelectStatement>>,
    /// Join predicate, e.g. `u.user_id = o.user_id`. Shared with the partner
    /// source by `SelectStatement::finalize`; immutable after parsing.
    pub join_expr: Option<Arc<Expression>>,

    /// Canonical lowercased alias, set by finalize.
    pub canonical_alias: String,
    /// The parent statement's unaliased column map, set by finalize.
    pub(crate) cols: Option<Arc<HashMap<String, Column>>>,

    /// Set when this source has been rewritten into a pushdown statement.
    pub star: bool,
    pub columns: Vec<Column>,
    pub r#where: Option<WhereClause>,
    pub into: Option<String>,
}

impl SqlSource {
    /// A plain table reference.
    pub fn table<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A table reference with an alias.
    pub fn aliased<S: Into<String>, A: Into<String>>(name: S, alias: A) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
            ..Default::default()
        }
    }

    /// Whether this FROM element is a join clause.
    pub fn is_join(&self) -> bool {
        self.op.is_some() || self.side.is_some() || self.join_kind.is_some()
    }

    /// Set the canonical alias: the lowercased alias, falling back to the
    /// lowercased table name.
    pub fn finalize(&mut self) {
        self.canonical_alias = match &self.alias {
            Some(alias) if !alias.is_empty() => alias.to_lowercase(),
            _ => self.name.to_lowercase(),
        };
    }

    /// The parent statement's projection vocabulary, keyed by unqualified
    /// field name. Empty until the parent has been finalized.
    pub fn unaliased_columns(&self) -> Arc<HashMap<String, Column>> {
        self.cols.clone().unwrap_or_default()
    }
}

impl fmt::Display for SqlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_join() {
            return match &self.alias {
                Some(alias) => write!(f, "{} AS {}", self.name, alias),
                None => write!(f, "{}", self.name),
            };
        }
        if let Some(kind) = self.join_kind {
            match kind {
                JoinKind::Inner => write!(f, "INNER ")?,
                JoinKind::Outer => write!(f, "OUTER ")?,
            }
        }
        write!(f, "JOIN ")?;
        match &self.alias {
            Some(alias) => write!(f, "{} AS {}", self.name, alias)?,
            None => write!(f, "{}", self.name)?,
        }
        if let Some(op) = self.op {
            write!(f, " {}", op.keyword())?;
        }
        if let Some(expr) = &self.join_expr {
            write!(f, " {}", expr)?;
        }
        if let Some(source) = &self.source {
            write!(f, " {}", source)?;
        }
        Ok(())
    }
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub pos: Pos,
    /// `USE <db>` context, if one was provided.
    pub db: Option<String>,
    /// Full original raw statement text.
    pub raw: String,
    /// `SELECT * FROM ...`
    pub star: bool,
    /// Ordered projection list.
    pub columns: Vec<Column>,
    /// FROM and JOIN clauses, in statement order.
    pub from: Vec<SqlSource>,
    /// INTO table.
    pub into: Option<String>,
    pub r#where: Option<WhereClause>,
    pub having: Option<Expression>,
    pub group_by: Vec<Column>,
    pub order_by: Vec<Column>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, col: Column) {
        self.columns.push(col);
    }

    /// Projection keys in statement order.
    pub fn field_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.key().to_string()).collect()
    }

    /// Is this a `SELECT count(*) FROM ...` query?
    pub fn is_count_star(&self) -> bool {
        self.columns.len() == 1 && self.columns[0].is_count_star()
    }

    /// The `@@variable` name, for internal-variable queries such as
    /// `SELECT @@max_packet_size`.
    pub fn sys_variable(&self) -> Option<&str> {
        if self.columns.len() != 1 {
            return None;
        }
        match &self.columns[0].expr {
            Some(Expression::Identity(id)) if id.text.starts_with("@@") => Some(&id.text),
            _ => None,
        }
    }

    fn columns_string(&self) -> String {
        if self.columns.is_empty() {
            if self.star {
                return "*".to_string();
            }
            return String::new();
        }
        self.columns
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {}", self.columns_string())?;
        if let Some(into) = &self.into {
            write!(f, " INTO {}", into)?;
        }
        if !self.from.is_empty() {
            write!(f, " FROM")?;
            for from in &self.from {
                write!(f, " {}", from)?;
            }
        }
        if let Some(where_clause) = &self.r#where {
            write!(f, " WHERE {}", where_clause)?;
        }
        if !self.group_by.is_empty() {
            let cols: Vec<_> = self.group_by.iter().map(|c| c.to_string()).collect();
            write!(f, " GROUP BY {}", cols.join(", "))?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.order_by.is_empty() {
            let cols: Vec<_> = self.order_by.iter().map(|c| c.to_string()).collect();
            write!(f, " ORDER BY {}", cols.join(", "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::expressions::BinaryOp;
    use super::*;

    #[test]
    fn test_column_key_and_split() {
        let col = Column::new("u.name");
        assert_eq!(col.key(), "u.name");
        assert_eq!(col.qualifier(), Some("u"));
        assert_eq!(col.right_name(), "name");

        let bare = Column::new("item");
        assert_eq!(bare.qualifier(), None);
        assert_eq!(bare.right_name(), "item");
    }

    #[test]
    fn test_rewrite_for_source_drops_qualifier() {
        let col = Column::with_expr("u.name", Expression::identity("u.name"));
        let rewritten = col.rewrite_for_source();
        assert_eq!(rewritten.as_name, "name");
        assert_eq!(rewritten.source_field, "u.name");
        assert!(rewritten.expr.is_none());
    }

    #[test]
    fn test_count_star() {
        let col = Column::with_expr(
            "count(*)",
            Expression::func("count", vec![Expression::identity("*")]),
        );
        assert!(col.is_count_star());

        let mut sel = SelectStatement::new();
        sel.add_column(col);
        assert!(sel.is_count_star());
    }

    #[test]
    fn test_sys_variable() {
        let mut sel = SelectStatement::new();
        sel.add_column(Column::with_expr(
            "@@max_packet_size",
            Expression::identity("@@max_packet_size"),
        ));
        assert_eq!(sel.sys_variable(), Some("@@max_packet_size"));
    }

    #[test]
    fn test_is_join() {
        let mut source = SqlSource::table("users");
        assert!(!source.is_join());
        source.side = Some(JoinSide::Left);
        assert!(source.is_join());
    }

    #[test]
    fn test_wildcard_column() {
        let star = Column::wildcard();
        assert!(star.star);
        assert_eq!(star.key(), "*");
        assert_eq!(star.to_string(), "*");
    }

    #[test]
    fn test_field_names() {
        let mut sel = SelectStatement::new();
        sel.add_column(Column::new("u.name"));
        sel.add_column(Column::new("total"));
        assert_eq!(sel.field_names(), vec!["u.name", "total"]);
    }

    #[test]
    fn test_display_where_and_order_by() {
        let mut sel = SelectStatement::new();
        sel.add_column(Column::new("name"));
        sel.from.push(SqlSource::table("users"));
        sel.r#where = Some(WhereClause::Expr(Expression::binary(
            BinaryOp::Eq,
            Expression::identity("name"),
            Expression::identity("wanted"),
        )));
        let mut order = Column::new("name");
        order.order = Some(Direction::Desc);
        sel.order_by.push(order);
        sel.limit = Some(10);

        assert_eq!(
            sel.to_string(),
            "SELECT name FROM users WHERE name = wanted ORDER BY name DESC LIMIT 10"
        );
    }

    #[test]
    fn test_display_subquery_where() {
        let mut inner = SelectStatement::new();
        inner.add_column(Column::new("user_id"));
        inner.from.push(SqlSource::table("banned"));

        let mut sel = SelectStatement::new();
        sel.add_column(Column::new("name"));
        sel.from.push(SqlSource::table("users"));
        sel.r#where = Some(WhereClause::Subquery {
            op: JoinOp::In,
            source: Box::new(inner),
        });

        assert_eq!(
            sel.to_string(),
            "SELECT name FROM users WHERE IN (SELECT user_id FROM banned)"
        );
    }

    #[test]
    fn test_display_round_trip() {
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

        assert_eq!(
            sel.to_string(),
            "SELECT u.name, o.item FROM users AS u INNER JOIN orders AS o ON u.user_id = o.user_id"
        );
    }
}
