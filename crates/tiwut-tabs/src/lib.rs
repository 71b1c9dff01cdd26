//! Tiwut Tab Management
//!
//! [`SessionState`] owns every tab and its render engine. Engines report
//! back through a per-tab ordered channel; the session folds those events
//! into tab state, republishes the active tab's [`ChromeState`] and hands
//! everything that needs the outside world to the caller as a
//! [`SessionEffect`].

mod chrome;
mod engine;
mod error;
mod manager;
mod tab;

pub use chrome::{ChromeState, TabSummary, APP_NAME};
pub use engine::{EngineEvent, EngineFactory, EventSender, RenderEngine};
pub use error::TabError;
pub use manager::{CloseOutcome, SessionEffect, SessionState};
pub use tab::{labels, Tab, TabHandle, TAB_TEXT_LIMIT};

pub type Result<T> = std::result::Result<T, TabError>;
