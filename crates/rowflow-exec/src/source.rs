//! Scan and join operators
//!
//! `Source` drives one scanner's iterator onto its outbox. `SourceJoin`
//! consumes two scanners concurrently for queries like
//!
//! ```text
//! SELECT u.name, o.item
//!     FROM users AS u
//!     INNER JOIN orders AS o
//!     ON u.user_id = o.user_id
//! ```
//!
//! building one hash table per side keyed by the stringified join value,
//! then emitting the re-aliased cartesian product of matching buckets.

use crate::config::RuntimeConfig;
use crate::context::{ExecutionContext, panic_message};
use crate::error::{Error, Result};
use crate::task::{Task, TaskBase};
use async_trait::async_trait;
use rowflow_source::{FieldMap, Message, SourceConn};
use rowflow_sql::Statement;
use rowflow_sql::ast::{Column, SqlSource};
use rowflow_sql::{Expression, eval};
use rowflow_value::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Scan a data source for rows and feed them downstream. The scanner is the
/// origin of the stream: it produces messages instead of consuming an inbox.
pub struct Source {
    base: TaskBase,
    name: String,
    conn: Arc<dyn SourceConn>,
}

impl Source {
    pub fn new<S: Into<String>>(
        name: S,
        conn: Arc<dyn SourceConn>,
        ctx: &ExecutionContext,
    ) -> Self {
        Self {
            base: TaskBase::new("Source", ctx),
            name: name.into(),
            conn,
        }
    }
}

#[async_trait]
impl Task for Source {
    fn task_type(&self) -> &str {
        self.base.task_type()
    }

    fn message_out(&mut self) -> mpsc::Receiver<Message> {
        self.base.message_out()
    }

    async fn run(&mut self, _ctx: &ExecutionContext) -> Result<()> {
        let sender = self.base.take_sender();
        let mut sig = self.base.signal();

        let scanner = self
            .conn
            .scanner()
            .ok_or_else(|| Error::MissingScanner(self.name.clone()))?;
        let mut iter = scanner.create_iterator(None);

        while let Some(msg) = iter.next() {
            tokio::select! {
                // Signal first, so a cancelled task never sends another row.
                biased;
                _ = sig.wait_for(|cancelled| *cancelled) => {
                    tracing::warn!("got signal quit");
                    return Ok(());
                }
                sent = sender.send(msg) => {
                    if sent.is_err() {
                        // Downstream went away; nothing left to feed.
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.conn.close()?;
        self.base.close()
    }
}

/// Hash-join two scanners for a two-source FROM clause. Construction
/// resolves both sides through the runtime config and fails on a source
/// that cannot scan.
#[derive(Debug)]
pub struct SourceJoin {
    base: TaskBase,
    left_stmt: SqlSource,
    right_stmt: SqlSource,
    left_source: Arc<dyn SourceConn>,
    right_source: Arc<dyn SourceConn>,
}

impl SourceJoin {
    pub fn new(
        left: &SqlSource,
        right: &SqlSource,
        conf: &RuntimeConfig,
        ctx: &ExecutionContext,
    ) -> Result<Self> {
        let left_source = conf
            .conn(&left.name)
            .ok_or_else(|| Error::SourceNotFound(left.name.clone()))?;
        if left_source.scanner().is_none() {
            tracing::error!("could not create scanner for {}", left.name);
            return Err(Error::MissingScanner(left.name.clone()));
        }

        let right_source = conf
            .conn(&right.name)
            .ok_or_else(|| Error::SourceNotFound(right.name.clone()))?;
        if right_source.scanner().is_none() {
            tracing::error!("could not create scanner for {}", right.name);
            return Err(Error::MissingScanner(right.name.clone()));
        }

        Ok(Self {
            base: TaskBase::new("SourceJoin", ctx),
            left_stmt: left.clone(),
            right_stmt: right.clone(),
            left_source,
            right_source,
        })
    }
}

#[async_trait]
impl Task for SourceJoin {
    fn task_type(&self) -> &str {
        self.base.task_type()
    }

    fn message_out(&mut self) -> mpsc::Receiver<Message> {
        self.base.message_out()
    }

    async fn run(&mut self, _ctx: &ExecutionContext) -> Result<()> {
        let sender = self.base.take_sender();
        let mut sig = self.base.signal();

        let left_in = self
            .left_source
            .scanner()
            .ok_or_else(|| Error::MissingScanner(self.left_stmt.name.clone()))?
            .mesg_chan(None);
        let right_in = self
            .right_source
            .scanner()
            .ok_or_else(|| Error::MissingScanner(self.right_stmt.name.clone()))?
            .mesg_chan(None);

        let lh_expr = self.left_stmt.join_value_expr()?;
        let rh_expr = self.right_stmt.join_value_expr()?;
        // The projection vocabulary; the same map on both sides by
        // construction.
        let cols = self.left_stmt.unaliased_columns();

        // One drain per input. Each owns its hash table until it finishes;
        // joining both handles is the barrier that hands them over.
        let left_drain = tokio::spawn(drain(left_in, lh_expr, self.base.signal()));
        let right_drain = tokio::spawn(drain(right_in, rh_expr, self.base.signal()));
        let (lh, rh) = tokio::join!(left_drain, right_drain);
        let lh = lh.map_err(|err| Error::PanicCaptured(panic_message(err)))?;
        let rh = rh.map_err(|err| Error::PanicCaptured(panic_message(err)))?;

        let mut id: u64 = 0;
        for (key, left_msgs) in &lh {
            let Some(right_msgs) = rh.get(key) else {
                continue;
            };
            for left_msg in left_msgs {
                for right_msg in right_msgs {
                    let mut body = FieldMap::new();
                    re_alias(&mut body, &left_msg.body, &cols);
                    re_alias(&mut body, &right_msg.body, &cols);
                    let msg = Message::new(id, body);
                    id += 1;
                    tokio::select! {
                        biased;
                        _ = sig.wait_for(|cancelled| *cancelled) => {
                            tracing::warn!("got signal quit");
                            return Ok(());
                        }
                        sent = sender.send(msg) => {
                            if sent.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.left_source.close()?;
        self.right_source.close()?;
        self.base.close()
    }
}

/// Consume one input until it closes or cancellation fires, bucketing each
/// message under its join-key value.
async fn drain(
    mut rx: mpsc::Receiver<Message>,
    expr: Expression,
    mut sig: watch::Receiver<bool>,
) -> HashMap<String, Vec<Message>> {
    let mut table: HashMap<String, Vec<Message>> = HashMap::new();
    loop {
        tokio::select! {
            biased;
            _ = sig.wait_for(|cancelled| *cancelled) => {
                tracing::warn!("got signal quit");
                return table;
            }
            msg = rx.recv() => match msg {
                None => return table,
                Some(msg) => {
                    if let Some(key) = join_value(&expr, &msg) {
                        table.entry(key).or_default().push(msg);
                    }
                }
            }
        }
    }
}

/// Evaluate the join expression against a message body. Only string join
/// keys participate; anything else drops the row with a warning.
fn join_value(expr: &Expression, msg: &Message) -> Option<String> {
    match eval(&msg.body, expr) {
        Ok(Value::Str(s)) => Some(s),
        Ok(other) => {
            tracing::warn!("unsupported join key type {}: {}", other.type_name(), other);
            None
        }
        Err(err) => {
            tracing::warn!("could not evaluate join value: {}", err);
            None
        }
    }
}

/// Rebuild a joined row against the parent projection: each source field
/// maps to its parent-level alias; fields outside the projection vocabulary
/// are dropped.
fn re_alias(out: &mut FieldMap, body: &FieldMap, cols: &HashMap<String, Column>) {
    for (field, value) in body.iter() {
        if let Some(col) = cols.get(field.as_str()) {
            out.set(col.as_name.clone(), value.clone());
        }
    }
}

/// Build the leaf operator for a statement: a scan for one FROM source, a
/// hash join for two. Anything else is rejected up front.
pub fn source_for_statement(
    stmt: &Statement,
    conf: &RuntimeConfig,
    ctx: &ExecutionContext,
) -> Result<Box<dyn Task>> {
    let Statement::Select(sel) = stmt else {
        return Err(Error::Sql(rowflow_sql::Error::UnsupportedStatement(
            stmt.keyword().to_string(),
        )));
    };
    match sel.from.as_slice() {
        [from] => {
            let conn = conf
                .conn(&from.name)
                .ok_or_else(|| Error::SourceNotFound(from.name.clone()))?;
            Ok(Box::new(Source::new(&from.name, conn, ctx)))
        }
        [left, right] => Ok(Box::new(SourceJoin::new(left, right, conf, ctx)?)),
        from => Err(Error::UnsupportedFrom(from.len())),
    }
}
