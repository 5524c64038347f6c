//! Error types for the SQL layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The join predicate is not a shape the rewrite layer can split into
    /// per-source key expressions.
    #[error("cannot evaluate join expression: {0}")]
    JoinNotEvaluable(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),
}
