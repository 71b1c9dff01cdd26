//! Navigation error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavigationError {
    /// A history or bookmark write could not be committed
    #[error("Storage error: {0}")]
    Storage(#[from] tiwut_storage::StorageError),
}
