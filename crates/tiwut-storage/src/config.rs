//! Config store
//!
//! A `[section] key = value` TOML file the user may edit by hand. Values are
//! read through typed accessors that fall back to a default when the key is
//! missing or unreadable, and the file is replaced atomically on save.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use toml::Value;

use crate::Result;

/// Recognized config keys and their defaults.
pub mod keys {
    /// A `section.key` address in the config file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Key {
        pub section: &'static str,
        pub name: &'static str,
    }

    impl Key {
        pub const fn new(section: &'static str, name: &'static str) -> Self {
            Self { section, name }
        }
    }

    impl std::fmt::Display for Key {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}.{}", self.section, self.name)
        }
    }

    pub const HOMEPAGE: Key = Key::new("settings", "homepage");
    pub const FORCE_HTTPS: Key = Key::new("settings", "force_https");
    pub const RESTORE_SESSION: Key = Key::new("tabs", "restore_session");
    pub const COOKIE_POLICY: Key = Key::new("privacy", "cookie_policy");
    pub const PERSISTENT_CACHE: Key = Key::new("performance", "persistent_cache");
    pub const OPEN_TABS: Key = Key::new("session", "open_tabs");

    /// Section holding `default` plus one key per capability.
    pub const PERMISSIONS_SECTION: &str = "permissions";

    pub const DEFAULT_HOMEPAGE: &str = "https://www.google.com";
    pub const DEFAULT_FORCE_HTTPS: bool = true;
    pub const DEFAULT_RESTORE_SESSION: bool = false;
    pub const DEFAULT_COOKIE_POLICY: i64 = 0;
    pub const DEFAULT_PERSISTENT_CACHE: bool = false;
}

use keys::Key;

const BACKUP_SUFFIX: &str = ".bak";

/// A config file that existed but could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub error: String,
    /// Copy of the file as it was found. Without one the file is never
    /// written back.
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    sections: BTreeMap<String, BTreeMap<String, Value>>,
    path: Option<PathBuf>,
    load_failure: Option<LoadFailure>,
}

impl Config {
    /// Load the config file at `path`. Never fails: a missing file yields an
    /// empty config and the path is remembered for [`Config::save`].
    ///
    /// A file that exists but cannot be read or parsed is copied to
    /// `<path>.bak` before defaults are used, and the problem is kept in
    /// [`Config::load_failure`]. When no copy can be made the path is not
    /// remembered, so the original is never overwritten.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        let error = match fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(mut config) => {
                    tracing::info!(path = %path.display(), "Configuration loaded");
                    config.path = Some(path.to_path_buf());
                    return config;
                }
                Err(e) => e.to_string(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                let mut config = Self::default();
                config.path = Some(path.to_path_buf());
                return config;
            }
            Err(e) => e.to_string(),
        };

        tracing::warn!(path = %path.display(), error = %error, "Unreadable config, using defaults");

        let backup = backup_path(path);
        let backup = match fs::copy(path, &backup) {
            Ok(_) => {
                tracing::info!(backup = %backup.display(), "Kept a copy of the unreadable config");
                Some(backup)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Cannot copy the unreadable config, it will not be overwritten"
                );
                None
            }
        };

        Self {
            path: backup.is_some().then(|| path.to_path_buf()),
            load_failure: Some(LoadFailure { error, backup }),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let mut sections = BTreeMap::new();

        for (name, value) in table {
            match value {
                Value::Table(entries) => {
                    sections.insert(name, entries.into_iter().collect());
                }
                _ => {
                    tracing::warn!(key = %name, "Ignoring config value outside of a section");
                }
            }
        }

        Ok(Self {
            sections,
            ..Self::default()
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let mut table = toml::Table::new();
        for (name, entries) in &self.sections {
            let section: toml::Table = entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            table.insert(name.clone(), Value::Table(section));
        }
        Ok(toml::to_string_pretty(&table)?)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.path = Some(path.into());
    }

    /// Set when the file at load time existed but could not be used.
    pub fn load_failure(&self) -> Option<&LoadFailure> {
        self.load_failure.as_ref()
    }

    /// Flush to the remembered path. A config without a path is never written.
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => {
                tracing::debug!("Config has no backing file, skipping save");
                Ok(())
            }
        }
    }

    /// Write to `path` through a temp file in the same directory, then rename
    /// it over the target so readers never see a partial file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let content = self.to_toml_string()?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    fn value(&self, key: Key) -> Option<&Value> {
        self.sections.get(key.section)?.get(key.name)
    }

    pub fn contains(&self, key: Key) -> bool {
        self.value(key).is_some()
    }

    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, Value>> {
        self.sections.get(name)
    }

    pub fn get_bool(&self, key: Key, default: bool) -> bool {
        let Some(value) = self.value(key) else {
            return default;
        };

        let parsed = match value {
            Value::Boolean(b) => Some(*b),
            Value::Integer(0) => Some(false),
            Value::Integer(1) => Some(true),
            Value::String(s) => parse_bool(s),
            _ => None,
        };

        parsed.unwrap_or_else(|| {
            tracing::warn!(key = %key, value = %value, "Not a boolean, using default");
            default
        })
    }

    pub fn get_int(&self, key: Key, default: i64) -> i64 {
        let Some(value) = self.value(key) else {
            return default;
        };

        let parsed = match value {
            Value::Integer(i) => Some(*i),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };

        parsed.unwrap_or_else(|| {
            tracing::warn!(key = %key, value = %value, "Not an integer, using default");
            default
        })
    }

    pub fn get_str(&self, key: Key, default: &str) -> String {
        match self.value(key) {
            None => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Integer(i)) => i.to_string(),
            Some(Value::Float(f)) => f.to_string(),
            Some(Value::Boolean(b)) => b.to_string(),
            Some(Value::Datetime(dt)) => dt.to_string(),
            Some(other) => {
                tracing::warn!(key = %key, value = %other, "Not a string, using default");
                default.to_string()
            }
        }
    }

    pub fn set_bool(&mut self, key: Key, value: bool) {
        self.set(key, Value::Boolean(value));
    }

    pub fn set_int(&mut self, key: Key, value: i64) {
        self.set(key, Value::Integer(value));
    }

    pub fn set_str(&mut self, key: Key, value: impl Into<String>) {
        self.set(key, Value::String(value.into()));
    }

    pub fn remove(&mut self, key: Key) -> bool {
        self.sections
            .get_mut(key.section)
            .and_then(|section| section.remove(key.name))
            .is_some()
    }

    fn set(&mut self, key: Key, value: Value) {
        self.sections
            .entry(key.section.to_string())
            .or_default()
            .insert(key.name.to_string(), value);
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
