//! Pluggable row-oriented data sources for the rowflow engine
//!
//! A data source is registered under a connection-string scheme and exposes
//! rows either as a pull iterator or a message channel. The execution layer
//! resolves `FROM` names through the registry and probes connections for
//! the scanning capability.

mod datasource;
mod error;
pub mod memory;
mod message;
mod registry;

pub use datasource::{DataSource, RowIter, Scanner, SourceConn};
pub use error::{Error, Result};
pub use memory::{MemSource, MemTable};
pub use message::{FieldMap, Message};
pub use registry::{Registry, register, registry};
