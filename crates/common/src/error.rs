//! Unified error type for the delivery-radius service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("CSV decode error: {0}")]
    Csv(String),

    #[error("Row {row} rejected: {message}")]
    RowParse { row: usize, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("service not ready")]
    NotReady,

    #[error("{0}")]
    Other(String),
}
