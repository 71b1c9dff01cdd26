//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] tiwut_storage::StorageError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] tiwut_navigation::NavigationError),

    #[error("Tab error: {0}")]
    Tab(#[from] tiwut_tabs::TabError),

    #[error("Download error: {0}")]
    Download(#[from] tiwut_download::DownloadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
