//! Session snapshot
//!
//! Stored as one comma-separated string. A literal `,` inside an address is
//! written as `%2C`, which loads the same page, so splitting on `,` is
//! always safe.

use serde::{Deserialize, Serialize};
use url::Url;

use tiwut_storage::{keys, Config};
use tiwut_tabs::SessionState;

const SEPARATOR: char = ',';
const ESCAPED_SEPARATOR: &str = "%2C";

/// Ordered tab addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    addresses: Vec<String>,
}

impl Snapshot {
    pub fn new(addresses: Vec<String>) -> Self {
        Self { addresses }
    }

    pub fn of(session: &SessionState) -> Self {
        Self::new(session.addresses())
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn into_addresses(self) -> Vec<String> {
        self.addresses
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn encode(&self) -> String {
        self.addresses
            .iter()
            .map(|address| address.replace(SEPARATOR, ESCAPED_SEPARATOR))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Lenient: entries are trimmed, empty ones and anything that is not an
    /// absolute URL are skipped.
    pub fn decode(raw: &str) -> Self {
        let mut dropped = 0usize;

        let addresses = raw
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter(|entry| {
                let valid = Url::parse(entry).is_ok();
                if !valid {
                    dropped += 1;
                }
                valid
            })
            .map(str::to_string)
            .collect();

        if dropped > 0 {
            tracing::warn!(dropped, "Skipped unreadable snapshot entries");
        }

        Self { addresses }
    }
}

fn restore_enabled(config: &Config) -> bool {
    config.get_bool(keys::RESTORE_SESSION, keys::DEFAULT_RESTORE_SESSION)
}

/// Write the open tabs into `config` when restoring is enabled, otherwise
/// clear whatever an earlier run left there. The config is not flushed.
pub fn save_snapshot(session: &SessionState, config: &mut Config) {
    if restore_enabled(config) {
        let snapshot = Snapshot::of(session);
        config.set_str(keys::OPEN_TABS, snapshot.encode());
        tracing::info!(tabs = snapshot.addresses().len(), "Session snapshot saved");
    } else {
        config.set_str(keys::OPEN_TABS, "");
        tracing::debug!("Session restore disabled, snapshot cleared");
    }
}

/// Addresses to reopen at startup. Empty when restoring is disabled or
/// nothing usable was stored.
pub fn restore_snapshot(config: &Config) -> Vec<String> {
    if !restore_enabled(config) {
        return Vec::new();
    }

    let raw = config.get_str(keys::OPEN_TABS, "");
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let addresses = Snapshot::decode(&raw).into_addresses();
    tracing::info!(tabs = addresses.len(), "Session snapshot restored");
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tiwut_tabs::{EngineFactory, EventSender, RenderEngine, TabHandle};

    struct NullEngine;

    impl RenderEngine for NullEngine {
        fn load(&mut self, _address: &str) {}
        fn back(&mut self) {}
        fn forward(&mut self) {}
        fn reload(&mut self) {}
        fn stop(&mut self) {}
        fn can_go_back(&self) -> bool {
            false
        }
        fn can_go_forward(&self) -> bool {
            false
        }
    }

    struct NullFactory;

    impl EngineFactory for NullFactory {
        fn create_engine(&self, _tab: TabHandle, _events: EventSender) -> Box<dyn RenderEngine> {
            Box::new(NullEngine)
        }
    }

    fn session_with(addresses: &[&str]) -> SessionState {
        let mut session = SessionState::new(Arc::new(NullFactory), &Config::default());
        for address in addresses {
            session.open_tab(Some(*address), None);
        }
        session
    }

    fn config(restore: bool) -> Config {
        let mut config = Config::default();
        config.set_bool(keys::RESTORE_SESSION, restore);
        config
    }

    #[test]
    fn test_round_trip() {
        let session = session_with(&["https://a", "https://b"]);
        let mut config = config(true);

        save_snapshot(&session, &mut config);
        assert_eq!(config.get_str(keys::OPEN_TABS, ""), "https://a,https://b");
        assert_eq!(restore_snapshot(&config), vec!["https://a", "https://b"]);
    }

    #[test]
    fn test_disabled_clears_stale_value() {
        let session = session_with(&["https://a"]);
        let mut config = config(false);
        config.set_str(keys::OPEN_TABS, "https://old");

        save_snapshot(&session, &mut config);
        assert_eq!(config.get_str(keys::OPEN_TABS, "x"), "");
        assert!(restore_snapshot(&config).is_empty());
    }

    #[test]
    fn test_disabled_ignores_stored_value() {
        let mut config = config(false);
        config.set_str(keys::OPEN_TABS, "https://a");
        assert!(restore_snapshot(&config).is_empty());
    }

    #[test]
    fn test_commas_inside_addresses_are_escaped() {
        let session = session_with(&["https://maps.example/@1,2", "https://b.example"]);
        let mut config = config(true);

        save_snapshot(&session, &mut config);
        assert_eq!(
            config.get_str(keys::OPEN_TABS, ""),
            "https://maps.example/@1%2C2,https://b.example"
        );

        let restored = restore_snapshot(&config);
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0], "https://maps.example/@1%2C2");
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let snapshot = Snapshot::decode(" https://a , ,not a url,,example.com, https://b ");
        assert_eq!(snapshot.addresses(), ["https://a", "https://b"]);

        assert!(Snapshot::decode(",,,").is_empty());
        assert!(Snapshot::decode("").is_empty());
    }
}
