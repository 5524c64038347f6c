//! Task-based dataflow runtime for the rowflow engine
//!
//! A statement executes as a set of operators connected by message
//! channels: scans at the leaves, joins fanning two streams in, all
//! sharing one cancellation signal and one error sink. Control flows
//! top-down through the signal; data flows bottom-up through the channels.

mod config;
mod context;
mod error;
mod source;
mod task;

pub use config::RuntimeConfig;
pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use source::{Source, SourceJoin, source_for_statement};
pub use task::{Execution, MESSAGE_BUFFER, Task, TaskBase};
