//! Host integration
//!
//! The embedder supplies render engines and the few things only the host
//! toolkit can do: profile setup, cache and cookie stores, the save dialog
//! and handing addresses to the operating system.

use std::path::{Path, PathBuf};

use tiwut_privacy::ProfileSettings;
use tiwut_tabs::EngineFactory;

pub trait Embedder: EngineFactory {
    /// Configure the engine profile. Called at startup and when settings change.
    fn apply_profile(&self, profile: &ProfileSettings);

    fn clear_http_cache(&self);

    fn delete_all_cookies(&self);

    /// Show the save dialog. `None` when the user dismissed it.
    fn choose_download_destination(&self, suggested: &Path) -> Option<PathBuf>;

    /// Hand an address with a non-web scheme to the operating system.
    fn open_externally(&self, address: &str);
}
