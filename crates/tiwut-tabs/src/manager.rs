//! Session state
//!
//! Owns the ordered tab set and the active pointer. Invariant: while the
//! session has tabs, exactly one of them is active. Closing the last tab
//! never removes it; the caller is told to terminate instead.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use tiwut_download::DownloadTicket;
use tiwut_navigation::{NavigationDecision, BLANK_ADDRESS};
use tiwut_privacy::{Capability, PermissionDecision};
use tiwut_storage::{keys, Config};

use crate::chrome::ChromeState;
use crate::engine::{EngineEvent, EngineFactory, EventSender};
use crate::error::TabError;
use crate::tab::{labels, Tab, TabHandle};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The tab is gone; `activated` is set when it was the active one.
    Closed { activated: Option<TabHandle> },
    /// It was the only tab. It stays open and the browser should quit.
    Terminate,
}

/// Work the session cannot do itself
#[derive(Debug)]
pub enum SessionEffect {
    RecordHistory {
        address: String,
        title: String,
    },
    DownloadRequested {
        tab: TabHandle,
        suggested_path: PathBuf,
        source: Option<String>,
        reply: oneshot::Sender<Option<DownloadTicket>>,
    },
    PermissionRequested {
        tab: TabHandle,
        origin: String,
        capability: Capability,
        reply: oneshot::Sender<PermissionDecision>,
    },
    NavigationRequested {
        tab: TabHandle,
        address: String,
        reply: oneshot::Sender<NavigationDecision>,
    },
}

pub struct SessionState {
    tabs: Vec<Tab>,
    active: Option<TabHandle>,
    factory: Arc<dyn EngineFactory>,
    homepage: String,
    chrome: watch::Sender<ChromeState>,
}

impl SessionState {
    pub fn new(factory: Arc<dyn EngineFactory>, config: &Config) -> Self {
        let (chrome, _) = watch::channel(ChromeState::default());

        Self {
            tabs: Vec::new(),
            active: None,
            factory,
            homepage: config.get_str(keys::HOMEPAGE, keys::DEFAULT_HOMEPAGE),
            chrome,
        }
    }

    pub fn homepage(&self) -> &str {
        &self.homepage
    }

    /// Used by tabs opened from now on.
    pub fn set_homepage(&mut self, homepage: impl Into<String>) {
        self.homepage = homepage.into();
    }

    /// Follow the window chrome as it changes.
    pub fn observe(&self) -> watch::Receiver<ChromeState> {
        self.chrome.subscribe()
    }

    pub fn chrome(&self) -> ChromeState {
        self.chrome.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Tabs in tab bar order
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn get(&self, handle: TabHandle) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.handle() == handle)
    }

    pub fn active(&self) -> Option<TabHandle> {
        self.active
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.and_then(|handle| self.get(handle))
    }

    /// Tab addresses in tab bar order, for the session snapshot.
    pub fn addresses(&self) -> Vec<String> {
        self.tabs.iter().map(|t| t.address().to_string()).collect()
    }

    /// Open a tab at the end of the tab bar and make it active. Without an
    /// address it loads the homepage.
    pub fn open_tab(&mut self, address: Option<&str>, label: Option<&str>) -> TabHandle {
        let handle = TabHandle::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = self
            .factory
            .create_engine(handle, EventSender::new(handle, tx));

        let address = address.unwrap_or(self.homepage.as_str()).to_string();
        let label = label.unwrap_or(labels::NEW_TAB).to_string();

        let mut tab = Tab::new(handle, engine, rx, address.clone(), label);
        tab.engine_mut().load(&address);
        self.tabs.push(tab);
        self.active = Some(handle);

        tracing::info!(tab = %handle, address = %address, "Opened tab");

        self.publish();
        handle
    }

    pub fn close_tab(&mut self, handle: TabHandle) -> Result<CloseOutcome> {
        let index = self.index_of(handle)?;

        if self.tabs.len() == 1 {
            tracing::info!(tab = %handle, "Last tab close requested");
            return Ok(CloseOutcome::Terminate);
        }

        let tab = self.tabs.remove(index);
        tab.shut_down();

        let activated = if self.active == Some(handle) {
            let next = self
                .tabs
                .get(index.min(self.tabs.len() - 1))
                .map(Tab::handle);
            self.active = next;
            next
        } else {
            None
        };

        tracing::info!(tab = %handle, remaining = self.tabs.len(), "Closed tab");

        self.publish();
        Ok(CloseOutcome::Closed { activated })
    }

    pub fn set_active(&mut self, handle: TabHandle) -> Result<()> {
        self.index_of(handle)?;

        if self.active != Some(handle) {
            tracing::debug!(tab = %handle, "Activated tab");
            self.active = Some(handle);
        }

        self.publish();
        Ok(())
    }

    /// Move a tab to `index` in the tab bar, clamped to the end.
    pub fn move_tab(&mut self, handle: TabHandle, index: usize) -> Result<()> {
        let from = self.index_of(handle)?;
        let tab = self.tabs.remove(from);
        let to = index.min(self.tabs.len());
        self.tabs.insert(to, tab);

        tracing::debug!(tab = %handle, from, to, "Moved tab");

        self.publish();
        Ok(())
    }

    pub fn load(&mut self, handle: TabHandle, address: &str) -> Result<()> {
        let tab = self.tab_mut(handle)?;
        tab.set_address(address.to_string());
        tab.engine_mut().load(address);

        tracing::debug!(tab = %handle, address = %address, "Load requested");

        self.publish();
        Ok(())
    }

    pub fn go_back(&mut self, handle: TabHandle) -> Result<()> {
        self.tab_mut(handle)?.engine_mut().back();
        Ok(())
    }

    pub fn go_forward(&mut self, handle: TabHandle) -> Result<()> {
        self.tab_mut(handle)?.engine_mut().forward();
        Ok(())
    }

    pub fn reload(&mut self, handle: TabHandle) -> Result<()> {
        self.tab_mut(handle)?.engine_mut().reload();
        Ok(())
    }

    pub fn stop(&mut self, handle: TabHandle) -> Result<()> {
        let tab = self.tab_mut(handle)?;
        tab.engine_mut().stop();
        tab.set_progress(None);

        self.publish();
        Ok(())
    }

    pub fn load_active(&mut self, address: &str) -> Result<()> {
        let handle = self.require_active()?;
        self.load(handle, address)
    }

    pub fn go_back_active(&mut self) -> Result<()> {
        let handle = self.require_active()?;
        self.go_back(handle)
    }

    pub fn go_forward_active(&mut self) -> Result<()> {
        let handle = self.require_active()?;
        self.go_forward(handle)
    }

    pub fn reload_active(&mut self) -> Result<()> {
        let handle = self.require_active()?;
        self.reload(handle)
    }

    pub fn stop_active(&mut self) -> Result<()> {
        let handle = self.require_active()?;
        self.stop(handle)
    }

    /// Drain every tab's channel, tabs in tab bar order and each tab's
    /// events in the order they were sent.
    pub fn pump_events(&mut self) -> Vec<SessionEffect> {
        let queued: Vec<_> = self
            .tabs
            .iter_mut()
            .map(|tab| (tab.handle(), tab.drain_events()))
            .collect();

        let mut effects = Vec::new();
        for (handle, events) in queued {
            for event in events {
                effects.extend(self.handle_event(handle, event));
            }
        }
        effects
    }

    /// Fold one engine event into the state of the tab it came from.
    pub fn handle_event(&mut self, handle: TabHandle, event: EngineEvent) -> Vec<SessionEffect> {
        let Some(index) = self.tabs.iter().position(|t| t.handle() == handle) else {
            tracing::debug!(tab = %handle, event = event.kind(), "Event for closed tab ignored");
            return Vec::new();
        };

        let is_active = self.active == Some(handle);
        let mut effects = Vec::new();

        match event {
            EngineEvent::AddressChanged(address) => {
                let tab = &mut self.tabs[index];
                tab.set_address(address);
                tab.refresh_navigation();
            }
            EngineEvent::TitleChanged(title) => {
                self.tabs[index].set_title(title);
            }
            EngineEvent::ProgressChanged(progress) => {
                self.tabs[index].set_progress(Some(progress));
            }
            EngineEvent::LoadFinished { success } => {
                let tab = &mut self.tabs[index];
                tab.set_progress(None);
                tab.refresh_navigation();

                if !success {
                    tracing::debug!(tab = %handle, address = %tab.address(), "Load failed");
                }

                if is_active {
                    effects.extend(history_effect(tab));
                }
            }
            EngineEvent::PopupRequested { reply } => {
                let popup = self.open_tab(None, Some(labels::POPUP));
                if reply.send(popup).is_err() {
                    tracing::debug!(tab = %handle, popup = %popup, "Popup requester went away");
                }
            }
            EngineEvent::DownloadRequested {
                suggested_path,
                source,
                reply,
            } => effects.push(SessionEffect::DownloadRequested {
                tab: handle,
                suggested_path,
                source,
                reply,
            }),
            EngineEvent::PermissionRequested {
                origin,
                capability,
                reply,
            } => effects.push(SessionEffect::PermissionRequested {
                tab: handle,
                origin,
                capability,
                reply,
            }),
            EngineEvent::NavigationRequested { address, reply } => {
                effects.push(SessionEffect::NavigationRequested {
                    tab: handle,
                    address,
                    reply,
                })
            }
        }

        self.publish();
        effects
    }

    fn index_of(&self, handle: TabHandle) -> Result<usize> {
        self.tabs
            .iter()
            .position(|t| t.handle() == handle)
            .ok_or(TabError::NotFound(handle))
    }

    fn tab_mut(&mut self, handle: TabHandle) -> Result<&mut Tab> {
        self.tabs
            .iter_mut()
            .find(|t| t.handle() == handle)
            .ok_or(TabError::NotFound(handle))
    }

    fn require_active(&self) -> Result<TabHandle> {
        self.active.ok_or(TabError::NoActiveTab)
    }

    /// Re-derive the chrome from the active tab; observers are only woken
    /// when something visible changed.
    fn publish(&self) {
        let next = ChromeState::derive(&self.tabs, self.active);
        self.chrome.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        for tab in self.tabs.drain(..) {
            tab.shut_down();
        }
    }
}

/// A finished load is worth remembering once it has a real address and a
/// title.
fn history_effect(tab: &Tab) -> Option<SessionEffect> {
    let address = tab.address();
    let title = tab.title();

    if address.is_empty() || address == BLANK_ADDRESS || title.is_empty() {
        return None;
    }

    Some(SessionEffect::RecordHistory {
        address: address.to_string(),
        title: title.to_string(),
    })
}
