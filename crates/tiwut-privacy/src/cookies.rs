//! Cookie and cache policy for the engine profile

use serde::{Deserialize, Serialize};

use tiwut_storage::{keys, Config};

const PERSISTENT_PROFILE: &str = "TiwutPersistentProfile";
const VOLATILE_PROFILE: &str = "TiwutVolatileProfile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CookiePolicy {
    #[default]
    AllowAll,
    BlockAll,
    /// Accept cookies while running, purge them at shutdown
    DeleteOnExit,
}

impl CookiePolicy {
    /// Map the stored integer. Unknown values allow all cookies.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => CookiePolicy::AllowAll,
            1 => CookiePolicy::BlockAll,
            2 => CookiePolicy::DeleteOnExit,
            other => {
                tracing::warn!(code = other, "Unknown cookie policy, allowing all cookies");
                CookiePolicy::AllowAll
            }
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            CookiePolicy::AllowAll => 0,
            CookiePolicy::BlockAll => 1,
            CookiePolicy::DeleteOnExit => 2,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_code(config.get_int(keys::COOKIE_POLICY, keys::DEFAULT_COOKIE_POLICY))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CookiePolicy::AllowAll => "Allow all cookies",
            CookiePolicy::BlockAll => "Block all cookies",
            CookiePolicy::DeleteOnExit => "Delete cookies on exit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheMode {
    Disk,
    Memory,
}

/// How the embedder should set up the engine profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub profile_name: String,
    pub cache_mode: CacheMode,
    pub accept_cookies: bool,
    pub purge_cookies_on_exit: bool,
}

impl ProfileSettings {
    /// Delete-on-exit wins over a persistent cache so that nothing from the
    /// session outlives it. Blocking cookies leaves the cache as configured.
    pub fn resolve(cookie_policy: CookiePolicy, persistent_cache: bool) -> Self {
        let cache_mode = match (cookie_policy, persistent_cache) {
            (CookiePolicy::DeleteOnExit, _) | (_, false) => CacheMode::Memory,
            (_, true) => CacheMode::Disk,
        };

        let profile_name = match cache_mode {
            CacheMode::Disk => PERSISTENT_PROFILE,
            CacheMode::Memory => VOLATILE_PROFILE,
        };

        Self {
            profile_name: profile_name.to_string(),
            cache_mode,
            accept_cookies: cookie_policy != CookiePolicy::BlockAll,
            purge_cookies_on_exit: cookie_policy == CookiePolicy::DeleteOnExit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::resolve(
            CookiePolicy::from_config(config),
            config.get_bool(keys::PERSISTENT_CACHE, keys::DEFAULT_PERSISTENT_CACHE),
        )
    }
}
