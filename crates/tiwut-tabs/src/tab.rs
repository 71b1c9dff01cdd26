//! Tab data structure
//!
//! A tab shows its page title (truncated) in the tab bar, or its label
//! ("New Tab", "Pop-up", "Loading..." ...) until the first title arrives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chrome::TabSummary;
use crate::engine::{EngineEvent, RenderEngine};

/// Characters of the title shown in the tab bar.
pub const TAB_TEXT_LIMIT: usize = 20;

/// Tab bar text until the page reports a title
pub mod labels {
    pub const NEW_TAB: &str = "New Tab";
    pub const POPUP: &str = "Pop-up";
    pub const HOME: &str = "Home";
    pub const LOADING: &str = "Loading...";
    pub const HISTORY: &str = "History";
    pub const BOOKMARK: &str = "Bookmark";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabHandle(Uuid);

impl TabHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

pub struct Tab {
    handle: TabHandle,
    engine: Box<dyn RenderEngine>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    address: String,
    title: String,
    label: String,
    /// `Some` while loading
    progress: Option<u8>,
    can_go_back: bool,
    can_go_forward: bool,
    created_at: DateTime<Utc>,
}

impl Tab {
    pub(crate) fn new(
        handle: TabHandle,
        engine: Box<dyn RenderEngine>,
        events: mpsc::UnboundedReceiver<EngineEvent>,
        address: String,
        label: String,
    ) -> Self {
        Self {
            handle,
            engine,
            events,
            address,
            title: String::new(),
            label,
            progress: None,
            can_go_back: false,
            can_go_forward: false,
            created_at: Utc::now(),
        }
    }

    pub fn handle(&self) -> TabHandle {
        self.handle
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn is_loading(&self) -> bool {
        self.progress.is_some()
    }

    pub fn can_go_back(&self) -> bool {
        self.can_go_back
    }

    pub fn can_go_forward(&self) -> bool {
        self.can_go_forward
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Tab bar text: the title cut to [`TAB_TEXT_LIMIT`] characters, or the
    /// label while the page has no title.
    pub fn display_text(&self) -> String {
        if self.title.is_empty() {
            self.label.clone()
        } else {
            self.title.chars().take(TAB_TEXT_LIMIT).collect()
        }
    }

    pub fn summary(&self) -> TabSummary {
        TabSummary {
            handle: self.handle,
            text: self.display_text(),
            address: self.address.clone(),
            loading: self.is_loading(),
        }
    }

    pub(crate) fn engine_mut(&mut self) -> &mut dyn RenderEngine {
        self.engine.as_mut()
    }

    pub(crate) fn set_address(&mut self, address: String) {
        self.address = address;
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub(crate) fn set_progress(&mut self, progress: Option<u8>) {
        self.progress = progress.map(|p| p.min(100));
    }

    pub(crate) fn refresh_navigation(&mut self) {
        self.can_go_back = self.engine.can_go_back();
        self.can_go_forward = self.engine.can_go_forward();
    }

    /// Queued engine events in arrival order.
    pub(crate) fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Stop the engine and detach its event sender.
    pub(crate) fn shut_down(mut self) {
        self.engine.stop();
        self.events.close();
        tracing::debug!(tab = %self.handle, "Tab engine released");
    }
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("handle", &self.handle)
            .field("address", &self.address)
            .field("title", &self.title)
            .field("label", &self.label)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}
