//! Error types for data sources

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("data source not found: {0}")]
    NotFound(String),
}
