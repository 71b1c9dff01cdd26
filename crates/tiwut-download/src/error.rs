//! Download error types

use thiserror::Error;

use crate::download::{DownloadId, DownloadState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    #[error("Download not found: {0}")]
    NotFound(DownloadId),

    #[error("Invalid download transition from {from} to {to}")]
    InvalidTransition {
        from: DownloadState,
        to: DownloadState,
    },
}
