//! Where the browser keeps its files

use std::fs;
use std::io;
use std::path::PathBuf;

/// Overrides the data directory when set.
pub const DATA_DIR_ENV: &str = "TIWUT_DATA_DIR";

const APP_DIR: &str = "Tiwut";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "browser_data.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserPaths {
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
    /// Where downloads with a bare file name are proposed
    pub download_dir: PathBuf,
}

impl BrowserPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let download_dir = dirs::download_dir().unwrap_or_else(|| data_dir.join("Downloads"));

        Self {
            config_file: data_dir.join(CONFIG_FILE),
            database_file: data_dir.join(DATABASE_FILE),
            download_dir,
            data_dir,
        }
    }

    /// Paths under [`BrowserPaths::default_data_dir`]
    pub fn from_env() -> Self {
        Self::new(Self::default_data_dir())
    }

    pub fn default_data_dir() -> PathBuf {
        std::env::var_os(DATA_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::data_local_dir().map(|d| d.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from(".tiwut"))
    }

    pub fn with_download_dir(mut self, download_dir: impl Into<PathBuf>) -> Self {
        self.download_dir = download_dir.into();
        self
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.data_dir)
    }
}

// Platform directories from the usual environment variables
mod dirs {
    use std::path::PathBuf;

    fn env_path(name: &str) -> Option<PathBuf> {
        std::env::var_os(name)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            env_path("LOCALAPPDATA")
        }
        #[cfg(target_os = "macos")]
        {
            env_path("HOME").map(|h| h.join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            env_path("XDG_DATA_HOME").or_else(|| env_path("HOME").map(|h| h.join(".local/share")))
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }

    pub fn download_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            env_path("USERPROFILE").map(|h| h.join("Downloads"))
        }
        #[cfg(target_os = "macos")]
        {
            env_path("HOME").map(|h| h.join("Downloads"))
        }
        #[cfg(target_os = "linux")]
        {
            env_path("XDG_DOWNLOAD_DIR").or_else(|| env_path("HOME").map(|h| h.join("Downloads")))
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
