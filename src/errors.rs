//! Error types shared across the pipeline stages.

use crate::models::copy::CopyStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the blob store client.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("request to blob store failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("blob store returned {status} for {op} `{name}`")]
    UnexpectedStatus {
        op: &'static str,
        name: String,
        status: u16,
    },
    #[error("blob `{0}` reported no copy status")]
    MissingCopyStatus(String),
    #[error("blob `{name}` reported unknown copy status `{value}`")]
    UnknownCopyStatus { name: String, value: String },
    #[error("invalid storage access key: {0}")]
    InvalidAccessKey(String),
    #[error("invalid blob endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Per-record failures, caught at the record boundary so the batch
/// continues with the next record.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    BlobStore(#[from] BlobStoreError),
    #[error("copy of `{src}` to `{dest}` finished as {status}")]
    CopyFailed {
        src: String,
        dest: String,
        status: CopyStatus,
    },
    #[error("copy of `{src}` to `{dest}` still pending after {elapsed:?}")]
    CopyTimedOut {
        src: String,
        dest: String,
        elapsed: Duration,
    },
    #[error(
        "row update for record {id} failed after its blob was renamed; \
         the database no longer matches storage: {source}"
    )]
    UpdateFailed { id: i32, source: sqlx::Error },
}
