//! Browser control loop
//!
//! Ties the session, the persistence store, the download tracker and the
//! privacy policies together and answers everything the session hands out
//! as a [`SessionEffect`]. Driven from the UI thread.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tiwut_download::{Download, DownloadId, DownloadTracker};
use tiwut_navigation::{
    AddressResolver, Bookmark, HistoryEntry, NavigationDecision, NavigationPolicy,
    PersistenceStore, Resolution, BLANK_ADDRESS,
};
use tiwut_privacy::{PermissionPolicy, ProfileSettings};
use tiwut_session::{restore_snapshot, save_snapshot};
use tiwut_storage::Config;
use tiwut_tabs::{
    labels, ChromeState, CloseOutcome, EngineFactory, SessionEffect, SessionState, TabHandle,
};

use crate::embedder::Embedder;
use crate::paths::BrowserPaths;
use crate::settings::Settings;
use crate::Result;

pub const BOOKMARK_ADDED: &str = "Bookmark added!";
pub const HISTORY_CLEARED: &str = "History cleared.";
pub const BOOKMARKS_CLEARED: &str = "Bookmarks cleared.";
pub const CACHE_CLEARED: &str = "Cache has been cleared.";
pub const SETTINGS_SAVED: &str = "Settings saved. Some changes require a restart.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Message for the status bar or a dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }
}

pub struct Browser<E: Embedder + 'static> {
    embedder: Arc<E>,
    config: Config,
    session: SessionState,
    store: PersistenceStore,
    downloads: DownloadTracker,
    resolver: AddressResolver,
    permissions: PermissionPolicy,
    profile: ProfileSettings,
    download_dir: Option<PathBuf>,
    notices: VecDeque<Notice>,
    quit_requested: bool,
}

impl<E: Embedder + 'static> Browser<E> {
    /// Load the config and open the store under `paths`, then start up.
    pub fn open(paths: &BrowserPaths, embedder: Arc<E>) -> Result<Self> {
        paths.ensure_dirs()?;

        let config = Config::load(&paths.config_file);
        let store = PersistenceStore::open(&paths.database_file)?;

        tracing::info!(data_dir = %paths.data_dir.display(), "Opening browser");

        let mut browser = Self::with_parts(config, store, embedder);
        browser.download_dir = Some(paths.download_dir.clone());
        Ok(browser)
    }

    /// Start up from an already loaded config and store: apply the engine
    /// profile and open either the restored tabs or one homepage tab.
    pub fn with_parts(config: Config, store: PersistenceStore, embedder: Arc<E>) -> Self {
        let profile = ProfileSettings::from_config(&config);
        embedder.apply_profile(&profile);

        let factory: Arc<dyn EngineFactory> = embedder.clone();
        let mut session = SessionState::new(factory, &config);

        let restored = restore_snapshot(&config);
        if restored.is_empty() {
            session.open_tab(None, Some(labels::HOME));
        } else {
            for address in &restored {
                session.open_tab(Some(address), Some(labels::LOADING));
            }
        }

        tracing::info!(
            tabs = session.len(),
            profile = %profile.profile_name,
            "Browser started"
        );

        let mut notices = VecDeque::new();
        if let Some(failure) = config.load_failure() {
            notices.push_back(Notice::warning(config_failure_text(failure)));
        }

        Self {
            resolver: AddressResolver::from_config(&config),
            permissions: PermissionPolicy::from_config(&config),
            embedder,
            config,
            session,
            store,
            downloads: DownloadTracker::new(),
            profile,
            download_dir: None,
            notices,
            quit_requested: false,
        }
    }

    pub fn with_download_dir(mut self, download_dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(download_dir.into());
        self
    }

    // === Accessors ===

    pub fn embedder(&self) -> &Arc<E> {
        &self.embedder
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn store(&self) -> &PersistenceStore {
        &self.store
    }

    /// Shared with the downloads panel.
    pub fn downloads(&self) -> &DownloadTracker {
        &self.downloads
    }

    pub fn resolver(&self) -> &AddressResolver {
        &self.resolver
    }

    pub fn permissions(&self) -> &PermissionPolicy {
        &self.permissions
    }

    pub fn permissions_mut(&mut self) -> &mut PermissionPolicy {
        &mut self.permissions
    }

    pub fn profile(&self) -> &ProfileSettings {
        &self.profile
    }

    pub fn chrome(&self) -> ChromeState {
        self.session.chrome()
    }

    pub fn observe(&self) -> tokio::sync::watch::Receiver<ChromeState> {
        self.session.observe()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    // === Navigation ===

    /// Resolve address bar input and load it in the active tab.
    pub fn navigate(&mut self, input: &str) -> Result<Resolution> {
        let resolution = self.resolver.resolve_input(input);
        self.session.load_active(resolution.address())?;

        tracing::debug!(
            address = %resolution.address(),
            search = resolution.is_search(),
            "Navigating"
        );

        Ok(resolution)
    }

    pub fn navigate_home(&mut self) -> Result<()> {
        let homepage = self.session.homepage().to_string();
        self.session.load_active(&homepage)?;
        Ok(())
    }

    pub fn back(&mut self) -> Result<()> {
        Ok(self.session.go_back_active()?)
    }

    pub fn forward(&mut self) -> Result<()> {
        Ok(self.session.go_forward_active()?)
    }

    pub fn reload(&mut self) -> Result<()> {
        Ok(self.session.reload_active()?)
    }

    pub fn stop(&mut self) -> Result<()> {
        Ok(self.session.stop_active()?)
    }

    // === Tabs ===

    pub fn new_tab(&mut self) -> TabHandle {
        self.session.open_tab(None, Some(labels::NEW_TAB))
    }

    pub fn open_in_new_tab(&mut self, address: &str, label: &str) -> TabHandle {
        self.session.open_tab(Some(address), Some(label))
    }

    pub fn open_history_entry(&mut self, entry: &HistoryEntry) -> TabHandle {
        self.open_in_new_tab(&entry.address, labels::HISTORY)
    }

    pub fn open_bookmark(&mut self, bookmark: &Bookmark) -> TabHandle {
        self.open_in_new_tab(&bookmark.address, labels::BOOKMARK)
    }

    /// Closing the only tab leaves it open and requests quit instead.
    pub fn close_tab(&mut self, handle: TabHandle) -> Result<CloseOutcome> {
        let outcome = self.session.close_tab(handle)?;
        if outcome == CloseOutcome::Terminate {
            tracing::info!("Quit requested");
            self.quit_requested = true;
        }
        Ok(outcome)
    }

    pub fn activate_tab(&mut self, handle: TabHandle) -> Result<()> {
        Ok(self.session.set_active(handle)?)
    }

    pub fn move_tab(&mut self, handle: TabHandle, index: usize) -> Result<()> {
        Ok(self.session.move_tab(handle, index)?)
    }

    // === History and bookmarks ===

    /// Bookmark the active tab. Returns true when a bookmark was added.
    pub fn bookmark_active_tab(&mut self) -> bool {
        let Some(tab) = self.session.active_tab() else {
            return false;
        };

        let address = tab.address().to_string();
        let title = tab.title().to_string();
        if address.is_empty() || title.is_empty() || address.contains(BLANK_ADDRESS) {
            tracing::debug!(address = %address, "Nothing to bookmark");
            return false;
        }

        match self.store.add_bookmark(&address, &title) {
            Ok(added) => {
                self.notices.push_back(Notice::info(BOOKMARK_ADDED));
                added
            }
            Err(e) => {
                self.storage_failed("add bookmark", e);
                false
            }
        }
    }

    pub fn recent_history(&mut self) -> Vec<HistoryEntry> {
        let result = self.store.history();
        self.or_notice("read history", result).unwrap_or_default()
    }

    pub fn search_history(&mut self, query: &str) -> Vec<HistoryEntry> {
        let result = self
            .store
            .search_history(query, tiwut_navigation::HISTORY_LIMIT);
        self.or_notice("search history", result).unwrap_or_default()
    }

    pub fn bookmarks(&mut self) -> Vec<Bookmark> {
        let result = self.store.bookmarks();
        self.or_notice("read bookmarks", result).unwrap_or_default()
    }

    pub fn delete_bookmark(&mut self, address: &str) -> bool {
        let result = self.store.delete_bookmark(address);
        self.or_notice("delete bookmark", result).unwrap_or(false)
    }

    pub fn clear_history(&mut self) -> bool {
        let result = self.store.clear_history();
        let cleared = self.or_notice("clear history", result).is_some();
        if cleared {
            self.notices.push_back(Notice::info(HISTORY_CLEARED));
        }
        cleared
    }

    pub fn clear_bookmarks(&mut self) -> bool {
        let result = self.store.clear_bookmarks();
        let cleared = self.or_notice("clear bookmarks", result).is_some();
        if cleared {
            self.notices.push_back(Notice::info(BOOKMARKS_CLEARED));
        }
        cleared
    }

    pub fn clear_cache(&mut self) {
        self.embedder.clear_http_cache();
        tracing::info!("HTTP cache cleared");
        self.notices.push_back(Notice::info(CACHE_CLEARED));
    }

    // === Settings ===

    pub fn settings(&self) -> Settings {
        Settings::from_config(&self.config)
    }

    /// Save path of the settings dialog. The new values take effect in
    /// memory even when the config file cannot be written.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<()> {
        settings.write_to(&mut self.config);

        self.resolver.set_force_https(settings.force_https);
        self.session.set_homepage(settings.homepage.trim());

        self.profile = ProfileSettings::resolve(settings.cookie_policy, settings.persistent_cache);
        self.embedder.apply_profile(&self.profile);

        if let Err(e) = self.config.save() {
            tracing::warn!(error = %e, "Failed to save settings");
            self.notices
                .push_back(Notice::warning(format!("Failed to save settings: {e}")));
            return Err(e.into());
        }

        tracing::info!(
            cookie_policy = settings.cookie_policy.label(),
            force_https = settings.force_https,
            "Settings saved"
        );
        self.notices.push_back(Notice::info(SETTINGS_SAVED));
        Ok(())
    }

    // === Event loop ===

    /// Fold pending engine events and download reports into state and
    /// answer every request. Returns the downloads that changed.
    pub fn pump(&mut self) -> Vec<Download> {
        for effect in self.session.pump_events() {
            self.dispatch(effect);
        }
        self.downloads.process_reports()
    }

    fn dispatch(&mut self, effect: SessionEffect) {
        match effect {
            SessionEffect::RecordHistory { address, title } => {
                let result = self.store.add_history_entry(&address, &title);
                self.or_notice("record history", result);
            }
            SessionEffect::DownloadRequested {
                tab,
                suggested_path,
                source,
                reply,
            } => {
                let ticket = self.start_download(tab, suggested_path, source);
                if reply.send(ticket).is_err() {
                    tracing::debug!(tab = %tab, "Download reply dropped");
                }
            }
            SessionEffect::PermissionRequested {
                tab,
                origin,
                capability,
                reply,
            } => {
                let decision = self.permissions.decide(&origin, capability);
                if reply.send(decision).is_err() {
                    tracing::debug!(tab = %tab, "Permission reply dropped");
                }
            }
            SessionEffect::NavigationRequested {
                tab,
                address,
                reply,
            } => {
                let decision = NavigationPolicy::decide(&address);
                if decision == NavigationDecision::OpenExternally {
                    tracing::info!(tab = %tab, address = %address, "Opening externally");
                    self.embedder.open_externally(&address);
                }
                if reply.send(decision).is_err() {
                    tracing::debug!(tab = %tab, "Navigation reply dropped");
                }
            }
        }
    }

    fn start_download(
        &self,
        tab: TabHandle,
        suggested_path: PathBuf,
        source: Option<String>,
    ) -> Option<tiwut_download::DownloadTicket> {
        let suggested_path = self.download_target(suggested_path);
        let download = self.downloads.request_download(suggested_path, source);

        let chosen = self
            .embedder
            .choose_download_destination(&download.suggested_path);
        let accepted = chosen.is_some();

        let result = self
            .downloads
            .resolve_destination(download.id, chosen)
            .and_then(|_| self.downloads.ticket(download.id));

        match result {
            Ok(ticket) => Some(ticket),
            Err(_) if !accepted => None,
            Err(e) => {
                tracing::warn!(tab = %tab, download_id = %download.id, error = %e, "Download not started");
                None
            }
        }
    }

    /// Cancel a running download. The engine writing it sees the stop on
    /// its reporter and removes the partial file.
    pub fn cancel_download(&mut self, id: DownloadId) -> Result<Download> {
        Ok(self.downloads.cancel(id)?)
    }

    fn download_target(&self, suggested_path: PathBuf) -> PathBuf {
        match &self.download_dir {
            Some(dir) if suggested_path.is_relative() => dir.join(suggested_path),
            _ => suggested_path,
        }
    }

    // === Shutdown ===

    /// Save the session snapshot, purge cookies when the policy says so,
    /// then flush the config file.
    pub fn shutdown(&mut self) -> Result<()> {
        save_snapshot(&self.session, &mut self.config);

        if self.profile.purge_cookies_on_exit {
            tracing::info!("Deleting cookies on exit");
            self.embedder.delete_all_cookies();
        }

        self.config.save()?;
        tracing::info!("Browser shut down");
        Ok(())
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.path()
    }

    fn or_notice<T>(
        &mut self,
        action: &str,
        result: tiwut_navigation::Result<T>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.storage_failed(action, e);
                None
            }
        }
    }

    fn storage_failed(&mut self, action: &str, error: tiwut_navigation::NavigationError) {
        tracing::warn!(action, error = %error, "Storage operation failed");
        self.notices
            .push_back(Notice::warning(format!("Could not {action}: {error}")));
    }
}

fn config_failure_text(failure: &tiwut_storage::LoadFailure) -> String {
    match &failure.backup {
        Some(backup) => format!(
            "Settings could not be read ({}). Defaults are in use; the original file was kept as {}.",
            failure.error,
            backup.display()
        ),
        None => format!(
            "Settings could not be read ({}). Defaults are in use and the file will not be changed.",
            failure.error
        ),
    }
}
