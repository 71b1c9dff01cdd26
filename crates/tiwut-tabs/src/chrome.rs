//! What the window shows for the active tab

use serde::{Deserialize, Serialize};

use crate::tab::{Tab, TabHandle};

pub const APP_NAME: &str = "Tiwut Secure Browser";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSummary {
    pub handle: TabHandle,
    /// Tab bar text
    pub text: String,
    pub address: String,
    pub loading: bool,
}

/// Address bar, progress indicator, navigation buttons, window title and
/// tab bar, always derived from the active tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromeState {
    pub active: Option<TabHandle>,
    pub address: String,
    /// Shown only while strictly between 0 and 100
    pub progress: Option<u8>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub window_title: String,
    pub tabs: Vec<TabSummary>,
}

impl ChromeState {
    pub(crate) fn derive(tabs: &[Tab], active: Option<TabHandle>) -> Self {
        let summaries = tabs.iter().map(Tab::summary).collect();
        let Some(tab) = active.and_then(|handle| tabs.iter().find(|t| t.handle() == handle)) else {
            return Self {
                tabs: summaries,
                ..Self::default()
            };
        };

        Self {
            active: Some(tab.handle()),
            address: tab.address().to_string(),
            progress: tab.progress().filter(|p| (1..100).contains(p)),
            can_go_back: tab.can_go_back(),
            can_go_forward: tab.can_go_forward(),
            window_title: window_title(tab.title()),
            tabs: summaries,
        }
    }
}

impl Default for ChromeState {
    fn default() -> Self {
        Self {
            active: None,
            address: String::new(),
            progress: None,
            can_go_back: false,
            can_go_forward: false,
            window_title: APP_NAME.to_string(),
            tabs: Vec::new(),
        }
    }
}

fn window_title(title: &str) -> String {
    if title.is_empty() {
        APP_NAME.to_string()
    } else {
        format!("{title} - {APP_NAME}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_title() {
        assert_eq!(window_title(""), "Tiwut Secure Browser");
        assert_eq!(window_title("Example"), "Example - Tiwut Secure Browser");
    }

    #[test]
    fn test_empty_session() {
        let chrome = ChromeState::derive(&[], None);
        assert_eq!(chrome, ChromeState::default());
    }
}
