//! Error types for the execution runtime

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A FROM name or connection scheme did not resolve to a data source.
    #[error("data source not found: {0}")]
    SourceNotFound(String),

    /// The resolved source does not support scanning.
    #[error("does not implement Scanner: {0}")]
    MissingScanner(String),

    /// A FROM shape the runtime has no operator for.
    #[error("unsupported FROM clause count: {0}")]
    UnsupportedFrom(usize),

    #[error(transparent)]
    Sql(#[from] rowflow_sql::Error),

    #[error(transparent)]
    Source(#[from] rowflow_source::Error),

    /// A panic recovered from an operator; aborts the statement.
    #[error("task panicked: {0}")]
    PanicCaptured(String),
}
