use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("duplicate job name in catalog: {0}")]
    DuplicateJob(String),

    #[error("invalid instance {path}: {reason}")]
    InvalidInstance { path: PathBuf, reason: String },

    #[error("catalog json: {0}")]
    Json(#[from] serde_json::Error),
}
