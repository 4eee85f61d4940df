use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failures surfaced by the store layer.
///
/// `NotFound` is a deliberate halt the dashboard renders as a page. The other
/// variants are data-access failures that abort the current request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database file {} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("query failed: {0}")]
    DataAccess(#[from] rusqlite::Error),

    #[error("column `{column}` is not {expected}")]
    Decode {
        column: String,
        expected: &'static str,
    },

    /// A failure from a computation shared by concurrent cache misses.
    #[error(transparent)]
    Shared(Arc<StoreError>),
}

pub type Result<T> = std::result::Result<T, StoreError>;
