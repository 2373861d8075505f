use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("record format error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid capacity {0}, must be at least 1")]
    InvalidCapacity(usize),
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("structural invariant violated: {0}")]
    Corruption(String),
}
