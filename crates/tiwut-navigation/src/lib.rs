//! Tiwut Navigation
//!
//! - Address bar input resolution:
//!   1. Text with a space or without a dot → search
//!   2. Anything else → host/URL, upgraded to HTTPS when configured
//! - Scheme policy for navigations requested by pages
//! - History and bookmark records behind [`PersistenceStore`]

mod bookmarks;
mod error;
mod history;
mod input;
mod policy;
mod store;

pub use bookmarks::{Bookmark, BookmarkManager};
pub use error::NavigationError;
pub use history::{HistoryEntry, HistoryManager, HISTORY_LIMIT};
pub use input::{AddressResolver, Resolution, BLANK_ADDRESS, SEARCH_PREFIX};
pub use policy::{NavigationDecision, NavigationPolicy};
pub use store::PersistenceStore;

pub type Result<T> = std::result::Result<T, NavigationError>;
