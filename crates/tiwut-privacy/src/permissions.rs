//! Permission management
//!
//! | Capability | Config key |
//! |---|---|
//! | Geolocation | `geolocation` |
//! | Microphone | `microphone` |
//! | Camera | `camera` |
//! | Camera and microphone | `camera_and_microphone` |
//! | Mouse lock | `mouse_lock` |
//! | Screen capture | `screen_capture` |
//! | Screen capture with audio | `screen_capture_with_audio` |
//! | Notifications | `notifications` |
//!
//! Values are `grant` or `deny` under `[permissions]`; `default` applies to
//! everything not listed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use tiwut_storage::keys::{Key, PERMISSIONS_SECTION};
use tiwut_storage::Config;

const DEFAULT_KEY: Key = Key::new(PERMISSIONS_SECTION, "default");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Geolocation,
    Microphone,
    Camera,
    CameraAndMicrophone,
    MouseLock,
    ScreenCapture,
    ScreenCaptureWithAudio,
    Notifications,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::Geolocation,
        Capability::Microphone,
        Capability::Camera,
        Capability::CameraAndMicrophone,
        Capability::MouseLock,
        Capability::ScreenCapture,
        Capability::ScreenCaptureWithAudio,
        Capability::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Geolocation => "geolocation",
            Capability::Microphone => "microphone",
            Capability::Camera => "camera",
            Capability::CameraAndMicrophone => "camera_and_microphone",
            Capability::MouseLock => "mouse_lock",
            Capability::ScreenCapture => "screen_capture",
            Capability::ScreenCaptureWithAudio => "screen_capture_with_audio",
            Capability::Notifications => "notifications",
        }
    }

    fn config_key(&self) -> Key {
        Key::new(PERMISSIONS_SECTION, self.as_str())
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown capability: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionDecision {
    Grant,
    Deny,
}

impl PermissionDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionDecision::Grant)
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "grant" | "allow" | "true" | "yes" => Some(PermissionDecision::Grant),
            "deny" | "block" | "false" | "no" => Some(PermissionDecision::Deny),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PermissionPolicy {
    default: PermissionDecision,
    capabilities: HashMap<Capability, PermissionDecision>,
    /// (origin, capability) -> decision
    sites: HashMap<(String, Capability), PermissionDecision>,
}

impl PermissionPolicy {
    pub fn new(default: PermissionDecision) -> Self {
        Self {
            default,
            capabilities: HashMap::new(),
            sites: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let default = read_decision(config, DEFAULT_KEY).unwrap_or(PermissionDecision::Deny);
        let mut policy = Self::new(default);

        for capability in Capability::ALL {
            if let Some(decision) = read_decision(config, capability.config_key()) {
                policy.capabilities.insert(capability, decision);
            }
        }

        policy
    }

    pub fn default_decision(&self) -> PermissionDecision {
        self.default
    }

    pub fn set_capability_decision(&mut self, capability: Capability, decision: PermissionDecision) {
        self.capabilities.insert(capability, decision);
    }

    /// Remember a decision for one site, taking precedence over settings.
    /// Pages without a site of their own (`file:`, `data:`, sandboxed
    /// frames) share the opaque origin `null` and are never remembered;
    /// returns false for them.
    pub fn set_site_decision(
        &mut self,
        origin: &str,
        capability: Capability,
        decision: PermissionDecision,
    ) -> bool {
        let Some(site) = normalize_origin(origin) else {
            tracing::warn!(origin = %origin, capability = %capability, "No site to remember a decision for");
            return false;
        };

        self.sites.insert((site, capability), decision);
        true
    }

    pub fn clear_site_decision(&mut self, origin: &str, capability: Capability) {
        if let Some(site) = normalize_origin(origin) {
            self.sites.remove(&(site, capability));
        }
    }

    pub fn decide(&self, origin: &str, capability: Capability) -> PermissionDecision {
        let decision = normalize_origin(origin)
            .and_then(|site| self.sites.get(&(site, capability)))
            .or_else(|| self.capabilities.get(&capability))
            .copied()
            .unwrap_or(self.default);

        tracing::debug!(
            origin = %origin,
            capability = %capability,
            decision = ?decision,
            "Permission decided"
        );

        decision
    }
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self::new(PermissionDecision::Deny)
    }
}

fn read_decision(config: &Config, key: Key) -> Option<PermissionDecision> {
    if !config.contains(key) {
        return None;
    }

    let raw = config.get_str(key, "");
    let decision = PermissionDecision::parse(&raw);
    if decision.is_none() {
        tracing::warn!(key = %key, value = %raw, "Not a permission decision, ignoring");
    }
    decision
}

/// `https://maps.example.com/a/b` and `https://maps.example.com` are the
/// same site. `None` for opaque origins and anything that is not a URL.
fn normalize_origin(origin: &str) -> Option<String> {
    let origin = Url::parse(origin.trim()).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
