//! Settings dialog model

use serde::{Deserialize, Serialize};

use tiwut_privacy::CookiePolicy;
use tiwut_storage::{keys, Config};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub homepage: String,
    pub force_https: bool,
    pub restore_session: bool,
    pub cookie_policy: CookiePolicy,
    pub persistent_cache: bool,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            homepage: config.get_str(keys::HOMEPAGE, keys::DEFAULT_HOMEPAGE),
            force_https: config.get_bool(keys::FORCE_HTTPS, keys::DEFAULT_FORCE_HTTPS),
            restore_session: config.get_bool(keys::RESTORE_SESSION, keys::DEFAULT_RESTORE_SESSION),
            cookie_policy: CookiePolicy::from_config(config),
            persistent_cache: config.get_bool(keys::PERSISTENT_CACHE, keys::DEFAULT_PERSISTENT_CACHE),
        }
    }

    /// Every key is written, whether or not its section existed.
    pub fn write_to(&self, config: &mut Config) {
        config.set_str(keys::HOMEPAGE, self.homepage.trim());
        config.set_bool(keys::FORCE_HTTPS, self.force_https);
        config.set_bool(keys::RESTORE_SESSION, self.restore_session);
        config.set_int(keys::COOKIE_POLICY, self.cookie_policy.code());
        config.set_bool(keys::PERSISTENT_CACHE, self.persistent_cache);
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
