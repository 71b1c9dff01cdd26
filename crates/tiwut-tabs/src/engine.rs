//! Render engine seam
//!
//! The engine is instructed through [`RenderEngine`] and talks back through
//! the [`EventSender`] it was created with. Requests that need an answer
//! carry a oneshot reply channel.

use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

use tiwut_download::DownloadTicket;
use tiwut_navigation::NavigationDecision;
use tiwut_privacy::{Capability, PermissionDecision};

use crate::tab::TabHandle;

pub trait RenderEngine {
    fn load(&mut self, address: &str);
    fn back(&mut self);
    fn forward(&mut self);
    fn reload(&mut self);
    fn stop(&mut self);
    fn can_go_back(&self) -> bool;
    fn can_go_forward(&self) -> bool;
}

pub trait EngineFactory {
    /// A fresh engine for `tab`, reporting through `events`.
    fn create_engine(&self, tab: TabHandle, events: EventSender) -> Box<dyn RenderEngine>;
}

#[derive(Debug)]
pub enum EngineEvent {
    AddressChanged(String),
    TitleChanged(String),
    /// Percentage, 100 when done
    ProgressChanged(u8),
    LoadFinished {
        success: bool,
    },
    /// Answered with a ticket once the user picked a destination, `None`
    /// when declined.
    DownloadRequested {
        suggested_path: PathBuf,
        source: Option<String>,
        reply: oneshot::Sender<Option<DownloadTicket>>,
    },
    /// Answered with the handle of the tab that hosts the popup.
    PopupRequested {
        reply: oneshot::Sender<TabHandle>,
    },
    PermissionRequested {
        origin: String,
        capability: Capability,
        reply: oneshot::Sender<PermissionDecision>,
    },
    /// A page-initiated navigation, before the engine commits to it.
    NavigationRequested {
        address: String,
        reply: oneshot::Sender<NavigationDecision>,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::AddressChanged(_) => "address_changed",
            EngineEvent::TitleChanged(_) => "title_changed",
            EngineEvent::ProgressChanged(_) => "progress_changed",
            EngineEvent::LoadFinished { .. } => "load_finished",
            EngineEvent::DownloadRequested { .. } => "download_requested",
            EngineEvent::PopupRequested { .. } => "popup_requested",
            EngineEvent::PermissionRequested { .. } => "permission_requested",
            EngineEvent::NavigationRequested { .. } => "navigation_requested",
        }
    }
}

/// Sending half of a tab's event channel. Once the tab is closed every send
/// fails and returns `false`.
#[derive(Debug, Clone)]
pub struct EventSender {
    tab: TabHandle,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSender {
    pub(crate) fn new(tab: TabHandle, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tab, tx }
    }

    pub fn tab(&self) -> TabHandle {
        self.tab
    }

    pub fn send(&self, event: EngineEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(tab = %self.tab, event = e.0.kind(), "Tab is gone, event dropped");
                false
            }
        }
    }

    pub fn is_detached(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn address_changed(&self, address: impl Into<String>) -> bool {
        self.send(EngineEvent::AddressChanged(address.into()))
    }

    pub fn title_changed(&self, title: impl Into<String>) -> bool {
        self.send(EngineEvent::TitleChanged(title.into()))
    }

    pub fn progress_changed(&self, progress: u8) -> bool {
        self.send(EngineEvent::ProgressChanged(progress))
    }

    pub fn load_finished(&self, success: bool) -> bool {
        self.send(EngineEvent::LoadFinished { success })
    }
}
