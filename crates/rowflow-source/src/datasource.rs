//! Data-source capability traits
//!
//! A `DataSource` is what gets registered under a scheme; opening it yields
//! a `SourceConn` bound to one database. Sources that are themselves a live
//! connection (the in-memory tables, for instance) implement both and are
//! used as-is. Scanning is a separate capability: the operators probe for
//! it and fail construction when it is absent.

use crate::error::Result;
use crate::message::Message;
use rowflow_sql::Expression;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Pull-style row iterator.
pub trait RowIter: Send {
    fn next(&mut self) -> Option<Message>;
}

/// A source that can produce its rows, either pulled through an iterator or
/// pushed onto a channel.
pub trait Scanner: Send + Sync {
    /// Iterator form. The filter is reserved for predicate pushdown and may
    /// be ignored by sources that do not support it.
    fn create_iterator(&self, filter: Option<&Expression>) -> Box<dyn RowIter>;

    /// Channel form, preferred by operators that multiplex several inputs.
    /// The channel closes when the source is exhausted.
    fn mesg_chan(&self, filter: Option<&Expression>) -> mpsc::Receiver<Message>;
}

impl std::fmt::Debug for dyn SourceConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConn").finish()
    }
}

/// An opened, live connection to a specific database within a data source.
pub trait SourceConn: Send + Sync {
    /// The scanning capability, when this connection has one.
    fn scanner(&self) -> Option<&dyn Scanner>;

    /// Release underlying resources.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A registered source of databases.
pub trait DataSource: SourceConn {
    /// Open a connection to the named database within this source.
    fn open(&self, db: &str) -> Result<Arc<dyn SourceConn>>;
}
