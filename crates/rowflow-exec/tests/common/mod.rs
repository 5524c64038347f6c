//! Common fixtures for execution integration tests
#![allow(dead_code)]

use rowflow_exec::RuntimeConfig;
use rowflow_source::{
    DataSource, FieldMap, MemTable, Message, Registry, RowIter, Scanner, SourceConn,
};
use rowflow_sql::ast::{JoinKind, JoinOp};
use rowflow_sql::{BinaryOp, Column, Expression, SelectStatement, SqlSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// The users table from the canonical two-table join scenario.
pub fn users_table() -> MemTable {
    let rows: Vec<FieldMap> = vec![
        [("user_id", "1"), ("name", "alice")].into_iter().collect(),
        [("user_id", "2"), ("name", "bob")].into_iter().collect(),
    ];
    MemTable::new("users", rows)
}

/// The orders table: two orders for user 1, one for an unknown user.
pub fn orders_table() -> MemTable {
    let rows: Vec<FieldMap> = vec![
        [("user_id", "1"), ("item", "book")].into_iter().collect(),
        [("user_id", "1"), ("item", "pen")].into_iter().collect(),
        [("user_id", "3"), ("item", "mug")].into_iter().collect(),
    ];
    MemTable::new("orders", rows)
}

/// A config whose registry serves the given tables by name.
pub fn config_with_tables(tables: Vec<MemTable>) -> RuntimeConfig {
    let registry = Arc::new(Registry::new());
    for table in tables {
        registry.register(table.name().to_string(), Arc::new(table));
    }
    RuntimeConfig::with_sources(registry)
}

/// The finalized AST for
/// `SELECT u.name, o.item FROM users AS u INNER JOIN orders AS o
///  ON u.user_id = o.user_id`.
pub fn users_orders_select() -> SelectStatement {
    two_table_join_select("users", "u", "orders", "o", "user_id")
}

/// A finalized two-table equi-join SELECT over `<l>.name, <r>.item`.
pub fn two_table_join_select(
    left: &str,
    left_alias: &str,
    right: &str,
    right_alias: &str,
    key: &str,
) -> SelectStatement {
    let mut sel = SelectStatement::new();
    let name = format!("{left_alias}.name");
    let item = format!("{right_alias}.item");
    sel.add_column(Column::with_expr(name.clone(), Expression::identity(name)));
    sel.add_column(Column::with_expr(item.clone(), Expression::identity(item)));

    sel.from.push(SqlSource::aliased(left, left_alias));
    let mut right_source = SqlSource::aliased(right, right_alias);
    right_source.op = Some(JoinOp::On);
    right_source.join_kind = Some(JoinKind::Inner);
    right_source.join_expr = Some(Arc::new(Expression::binary(
        BinaryOp::Eq,
        Expression::identity(format!("{left_alias}.{key}")),
        Expression::identity(format!("{right_alias}.{key}")),
    )));
    sel.from.push(right_source);

    sel.finalize();
    sel
}

/// A source that never runs dry: the same row, one per millisecond, until
/// the consumer goes away.
#[derive(Clone)]
pub struct InfiniteTable {
    row: FieldMap,
}

impl InfiniteTable {
    pub fn new(row: FieldMap) -> Self {
        Self { row }
    }
}

impl Scanner for InfiniteTable {
    fn create_iterator(&self, _filter: Option<&Expression>) -> Box<dyn RowIter> {
        Box::new(InfiniteIter {
            row: self.row.clone(),
            next_id: 0,
        })
    }

    fn mesg_chan(&self, _filter: Option<&Expression>) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(1);
        let row = self.row.clone();
        tokio::spawn(async move {
            let mut id = 0u64;
            loop {
                if tx.send(Message::new(id, row.clone())).await.is_err() {
                    return;
                }
                id += 1;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });
        rx
    }
}

impl SourceConn for InfiniteTable {
    fn scanner(&self) -> Option<&dyn Scanner> {
        Some(self)
    }
}

impl DataSource for InfiniteTable {
    fn open(&self, _db: &str) -> rowflow_source::Result<Arc<dyn SourceConn>> {
        Ok(Arc::new(self.clone()))
    }
}

struct InfiniteIter {
    row: FieldMap,
    next_id: u64,
}

impl RowIter for InfiniteIter {
    fn next(&mut self) -> Option<Message> {
        let msg = Message::new(self.next_id, self.row.clone());
        self.next_id += 1;
        Some(msg)
    }
}
