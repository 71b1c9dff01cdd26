//! Tiwut Privacy
//!
//! Profile policy:
//! - Cookies: allow all, block all, or delete on exit
//! - Cache: disk or memory; delete-on-exit always runs from memory
//!
//! Permissions model:
//! - Lookup order: site decision → capability setting → default
//! - Default: deny, unless `permissions.default = "grant"`

mod cookies;
mod permissions;

pub use cookies::{CacheMode, CookiePolicy, ProfileSettings};
pub use permissions::{Capability, PermissionDecision, PermissionPolicy};
