//! Tiwut Core
//!
//! Control loop of the Tiwut Secure Browser. [`Browser`] owns the session,
//! the persistence store, the download tracker and the privacy policies;
//! the host toolkit plugs in through [`Embedder`].

mod browser;
mod embedder;
mod error;
mod paths;
mod settings;

pub use browser::{
    Browser, Notice, NoticeLevel, BOOKMARKS_CLEARED, BOOKMARK_ADDED, CACHE_CLEARED,
    HISTORY_CLEARED, SETTINGS_SAVED,
};
pub use embedder::Embedder;
pub use error::CoreError;
pub use paths::{BrowserPaths, DATA_DIR_ENV};
pub use settings::Settings;

// Re-export core components
pub use tiwut_download::{
    Download, DownloadError, DownloadId, DownloadReporter, DownloadState, DownloadTicket,
    DownloadTracker,
};
pub use tiwut_navigation::{
    AddressResolver, Bookmark, HistoryEntry, NavigationDecision, NavigationError,
    PersistenceStore, Resolution,
};
pub use tiwut_privacy::{
    CacheMode, Capability, CookiePolicy, PermissionDecision, PermissionPolicy, ProfileSettings,
};
pub use tiwut_session::Snapshot;
pub use tiwut_storage::{keys, Config, LoadFailure, StorageError};
pub use tiwut_tabs::{
    labels, ChromeState, CloseOutcome, EngineEvent, EngineFactory, EventSender, RenderEngine,
    TabError, TabHandle, TabSummary,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging. `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if fmt().with_env_filter(filter).with_target(true).try_init().is_err() {
        tracing::debug!("Logging already initialized");
    }
}
