//! Tab error types

use thiserror::Error;

use crate::tab::TabHandle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    #[error("Tab not found: {0}")]
    NotFound(TabHandle),

    #[error("No active tab")]
    NoActiveTab,
}
