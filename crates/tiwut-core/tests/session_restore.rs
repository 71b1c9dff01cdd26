//! Restart scenarios against a real data directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use tiwut_core::{
    keys, labels, Browser, BrowserPaths, Config, CookiePolicy, EngineFactory, Embedder, EventSender,
    NoticeLevel, ProfileSettings, RenderEngine, Settings, TabHandle,
};

#[derive(Default)]
struct RecordingEmbedder {
    loads: Arc<Mutex<Vec<String>>>,
    senders: Mutex<HashMap<TabHandle, EventSender>>,
    cookie_purges: Mutex<usize>,
}

struct RecordingEngine {
    loads: Arc<Mutex<Vec<String>>>,
}

impl RenderEngine for RecordingEngine {
    fn load(&mut self, address: &str) {
        self.loads.lock().push(address.to_string());
    }
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

impl EngineFactory for RecordingEmbedder {
    fn create_engine(&self, tab: TabHandle, events: EventSender) -> Box<dyn RenderEngine> {
        self.senders.lock().insert(tab, events);
        Box::new(RecordingEngine {
            loads: self.loads.clone(),
        })
    }
}

impl Embedder for RecordingEmbedder {
    fn apply_profile(&self, _profile: &ProfileSettings) {}

    fn clear_http_cache(&self) {}

    fn delete_all_cookies(&self) {
        *self.cookie_purges.lock() += 1;
    }

    fn choose_download_destination(&self, _suggested: &Path) -> Option<PathBuf> {
        None
    }

    fn open_externally(&self, _address: &str) {}
}

fn paths(dir: &Path) -> BrowserPaths {
    BrowserPaths::new(dir.join("profile")).with_download_dir(dir.join("downloads"))
}

fn start(paths: &BrowserPaths) -> Browser<RecordingEmbedder> {
    Browser::open(paths, Arc::new(RecordingEmbedder::default())).unwrap()
}

fn write_config(paths: &BrowserPaths, restore: bool, cookie_policy: CookiePolicy) {
    paths.ensure_dirs().unwrap();
    let mut config = Config::load(&paths.config_file);
    Settings {
        restore_session: restore,
        cookie_policy,
        ..Settings::default()
    }
    .write_to(&mut config);
    config.save().unwrap();
}

/// Leave exactly `addresses` open, in order.
fn open_only(browser: &mut Browser<RecordingEmbedder>, addresses: &[&str]) {
    let initial = browser.session().active().unwrap();
    for address in addresses {
        browser.open_in_new_tab(address, labels::NEW_TAB);
    }
    browser.close_tab(initial).unwrap();
}

#[test]
fn restores_open_tabs_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    write_config(&paths, true, CookiePolicy::AllowAll);

    let mut browser = start(&paths);
    open_only(&mut browser, &["https://a", "https://b"]);
    browser.shutdown().unwrap();
    drop(browser);

    let browser = start(&paths);
    assert_eq!(browser.session().addresses(), vec!["https://a", "https://b"]);
    assert!(browser
        .session()
        .tabs()
        .iter()
        .all(|tab| tab.label() == labels::LOADING));
    assert_eq!(
        browser.embedder().loads.lock().as_slice(),
        ["https://a", "https://b"]
    );

    let active = browser.session().active().unwrap();
    assert_eq!(browser.session().get(active).unwrap().address(), "https://b");
}

#[test]
fn restore_disabled_opens_homepage() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    write_config(&paths, false, CookiePolicy::AllowAll);

    let mut browser = start(&paths);
    open_only(&mut browser, &["https://a", "https://b"]);
    browser.shutdown().unwrap();
    drop(browser);

    let saved = Config::load(&paths.config_file);
    assert_eq!(saved.get_str(keys::OPEN_TABS, "x"), "");

    let browser = start(&paths);
    assert_eq!(browser.session().len(), 1);
    let tab = browser.session().active_tab().unwrap();
    assert_eq!(tab.address(), "https://www.google.com");
    assert_eq!(tab.label(), labels::HOME);
}

#[test]
fn first_start_without_config() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());

    let mut browser = start(&paths);
    assert_eq!(browser.session().len(), 1);
    assert_eq!(browser.settings(), Settings::default());

    browser.shutdown().unwrap();
    assert!(paths.config_file.exists());
    assert!(paths.database_file.exists());
}

#[test]
fn history_and_bookmarks_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());

    let mut browser = start(&paths);
    let active = browser.session().active().unwrap();
    let events = browser.embedder().senders.lock()[&active].clone();
    events.address_changed("https://example.com/");
    events.title_changed("Example");
    events.load_finished(true);
    browser.pump();
    assert!(browser.bookmark_active_tab());
    browser.shutdown().unwrap();
    drop(browser);

    let mut browser = start(&paths);
    let history = browser.recent_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].title, "Example");
    assert_eq!(browser.bookmarks()[0].address, "https://example.com/");
}

#[test]
fn delete_on_exit_purges_cookies() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    write_config(&paths, false, CookiePolicy::DeleteOnExit);

    let mut browser = start(&paths);
    assert!(browser.profile().purge_cookies_on_exit);
    browser.shutdown().unwrap();
    assert_eq!(*browser.embedder().cookie_purges.lock(), 1);
}

#[test]
fn unreadable_config_is_kept_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths(dir.path());
    paths.ensure_dirs().unwrap();

    let original = "[settings]\nhomepage = \"https://start.example\nforce_https = false\n";
    std::fs::write(&paths.config_file, original).unwrap();

    let mut browser = start(&paths);
    let notices = browser.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert!(notices[0].text.contains("config.toml.bak"));

    browser.shutdown().unwrap();
    drop(browser);

    let mut backup = paths.config_file.clone().into_os_string();
    backup.push(".bak");
    assert_eq!(std::fs::read_to_string(backup).unwrap(), original);

    // The rewritten file is readable again
    let mut browser = start(&paths);
    assert!(browser.drain_notices().is_empty());
}
