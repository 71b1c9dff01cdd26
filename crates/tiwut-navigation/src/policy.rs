//! Scheme policy for navigations a page asks for

use serde::{Deserialize, Serialize};
use url::Url;

/// Schemes the render engine loads itself.
const WEB_SCHEMES: &[&str] = &["http", "https", "ftp", "file", "about"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationDecision {
    /// Let the engine load the address
    Accept,
    /// Block it in the page and hand it to the operating system
    OpenExternally,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationPolicy;

impl NavigationPolicy {
    pub fn decide(address: &str) -> NavigationDecision {
        let Ok(url) = Url::parse(address.trim()) else {
            return NavigationDecision::Accept;
        };

        if WEB_SCHEMES.contains(&url.scheme()) {
            NavigationDecision::Accept
        } else {
            tracing::debug!(scheme = %url.scheme(), "Navigation handed to the system");
            NavigationDecision::OpenExternally
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_schemes_accepted() {
        for address in [
            "https://example.com",
            "http://example.com/a?b=c",
            "ftp://files.example.com/pub",
            "file:///tmp/index.html",
            "about:blank",
            "HTTPS://EXAMPLE.COM",
        ] {
            assert_eq!(NavigationPolicy::decide(address), NavigationDecision::Accept, "{address}");
        }
    }

    #[test]
    fn test_other_schemes_open_externally() {
        for address in ["mailto:someone@example.com", "magnet:?xt=urn:btih:abc", "tel:+123"] {
            assert_eq!(
                NavigationPolicy::decide(address),
                NavigationDecision::OpenExternally,
                "{address}"
            );
        }
    }

    #[test]
    fn test_unparsable_is_accepted() {
        assert_eq!(NavigationPolicy::decide("not a url"), NavigationDecision::Accept);
        assert_eq!(NavigationPolicy::decide(""), NavigationDecision::Accept);
    }
}
