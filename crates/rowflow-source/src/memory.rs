//! In-memory data sources
//!
//! `MemTable` is a fixed set of rows that is its own live connection;
//! registered under its table name it backs `FROM name` directly.
//! `MemSource` groups named tables under one scheme for embedders that
//! resolve through a connection string.

use crate::datasource::{DataSource, RowIter, Scanner, SourceConn};
use crate::error::{Error, Result};
use crate::message::{FieldMap, Message};
use parking_lot::RwLock;
use rowflow_sql::Expression;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// An immutable in-memory table. Cloning is cheap; the rows are shared.
#[derive(Clone)]
pub struct MemTable {
    name: String,
    rows: Arc<Vec<FieldMap>>,
}

impl MemTable {
    pub fn new<S: Into<String>>(name: S, rows: Vec<FieldMap>) -> Self {
        Self {
            name: name.into(),
            rows: Arc::new(rows),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Scanner for MemTable {
    fn create_iterator(&self, _filter: Option<&Expression>) -> Box<dyn RowIter> {
        Box::new(MemIter {
            rows: self.rows.clone(),
            pos: 0,
        })
    }

    fn mesg_chan(&self, _filter: Option<&Expression>) -> mpsc::Receiver<Message> {
        // Pre-fill a channel sized to the table; the dropped sender is the
        // end-of-stream signal.
        let (tx, rx) = mpsc::channel(self.rows.len().max(1));
        for (i, row) in self.rows.iter().enumerate() {
            let _ = tx.try_send(Message::new(i as u64, row.clone()));
        }
        rx
    }
}

impl SourceConn for MemTable {
    fn scanner(&self) -> Option<&dyn Scanner> {
        Some(self)
    }
}

impl DataSource for MemTable {
    fn open(&self, _db: &str) -> Result<Arc<dyn SourceConn>> {
        Ok(Arc::new(self.clone()))
    }
}

struct MemIter {
    rows: Arc<Vec<FieldMap>>,
    pos: usize,
}

impl RowIter for MemIter {
    fn next(&mut self) -> Option<Message> {
        let row = self.rows.get(self.pos)?;
        let msg = Message::new(self.pos as u64, row.clone());
        self.pos += 1;
        Some(msg)
    }
}

/// A collection of named in-memory tables behind one scheme.
#[derive(Default)]
pub struct MemSource {
    tables: RwLock<HashMap<String, MemTable>>,
}

impl MemSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a table, keyed by its name.
    pub fn add_table(&self, table: MemTable) {
        self.tables
            .write()
            .insert(table.name().to_string(), table);
    }
}

impl SourceConn for MemSource {
    fn scanner(&self) -> Option<&dyn Scanner> {
        None
    }
}

impl DataSource for MemSource {
    fn open(&self, db: &str) -> Result<Arc<dyn SourceConn>> {
        match self.tables.read().get(db) {
            Some(table) => Ok(Arc::new(table.clone())),
            None => Err(Error::NotFound(db.to_string())),
        }
    }
}
