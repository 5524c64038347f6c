//! Runtime configuration: binding FROM names to live sources
//!
//! Connection strings take the form `scheme://db-name` or a bare scheme:
//! `csv:///dev/stdin` resolves the `csv` driver against `/dev/stdin`,
//! `mem` is just a scheme. Resolution failures are logged and yield `None`;
//! the caller decides how fatal that is.

use parking_lot::Mutex;
use rowflow_source::{DataSource, Registry, SourceConn, registry};
use std::sync::Arc;

/// Per-engine runtime configuration. Owns a registry handle plus the
/// single-connection override used when the engine is embedded as a driver.
pub struct RuntimeConfig {
    pub sources: Arc<Registry>,
    /// When set, every FROM name resolves through this one connection.
    single_conn: Option<String>,
    /// Database name parsed out of the most recent connection string.
    db: Mutex<Option<String>>,
}

impl RuntimeConfig {
    /// Configuration over the process-wide registry.
    pub fn new() -> Self {
        Self::with_sources(registry())
    }

    /// Configuration over an explicit registry, for embedders and tests.
    pub fn with_sources(sources: Arc<Registry>) -> Self {
        Self {
            sources,
            single_conn: None,
            db: Mutex::new(None),
        }
    }

    /// Restrict resolution to a single connection string, as database
    /// drivers require.
    pub fn with_connection<S: Into<String>>(mut self, conn_info: S) -> Self {
        self.single_conn = Some(conn_info.into());
        self
    }

    /// The database name parsed from the last resolved connection string.
    pub fn db(&self) -> Option<String> {
        self.db.lock().clone()
    }

    /// Resolve a FROM-clause name to a live connection.
    ///
    /// Without a single-connection override the name is looked up directly
    /// in the registry; sources that are also connections are used as-is.
    /// With an override, the override resolves to a data source which is
    /// then opened for the named database.
    pub fn conn(&self, db: &str) -> Option<Arc<dyn SourceConn>> {
        match &self.single_conn {
            None => {
                if let Some(source) = self.sources.get(&db.to_lowercase()) {
                    let conn: Arc<dyn SourceConn> = source;
                    Some(conn)
                } else {
                    tracing::error!("data source {} was not found", db);
                    None
                }
            }
            Some(conn_info) => {
                let source = self.data_source(conn_info)?;
                match source.open(db) {
                    Ok(conn) => Some(conn),
                    Err(err) => {
                        tracing::error!("could not open data source: {} {}", db, err);
                        None
                    }
                }
            }
        }
    }

    /// Resolve a connection string to its registered data source, storing
    /// the database-name remainder.
    pub fn data_source(&self, conn_info: &str) -> Option<Arc<dyn DataSource>> {
        let scheme = if let Some(rest) = conn_info.strip_prefix("csv://") {
            *self.db.lock() = Some(rest.to_string());
            "csv"
        } else if let Some(idx) = conn_info.find("://") {
            *self.db.lock() = Some(conn_info[idx + 3..].to_string());
            &conn_info[..idx]
        } else {
            conn_info
        };

        let scheme = scheme.to_lowercase();
        match self.sources.get(&scheme) {
            Some(source) => Some(source),
            None => {
                tracing::error!("data source was not found: '{}'", scheme);
                None
            }
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
