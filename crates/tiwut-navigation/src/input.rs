//! Input resolution for the address bar
//!
//! 1. Trim the input.
//! 2. A space anywhere, or no dot at all → search query.
//! 3. Otherwise a host/URL: `http://` is upgraded when HTTPS is forced and a
//!    missing scheme becomes `https://`.
//! 4. A candidate that still is not a valid absolute URL degrades to a search.

use url::form_urlencoded;
use url::Url;

use tiwut_storage::{keys, Config};

/// Search engine template; the encoded query is appended.
pub const SEARCH_PREFIX: &str = "https://www.google.com/search?q=";

/// Placeholder address of a page with no content.
pub const BLANK_ADDRESS: &str = "about:blank";

const HTTP: &str = "http://";
const HTTPS: &str = "https://";

/// Result of resolving address bar input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Input named a host or URL
    Navigate(String),
    /// Input was turned into a search query
    Search(String),
}

impl Resolution {
    pub fn address(&self) -> &str {
        match self {
            Resolution::Navigate(address) | Resolution::Search(address) => address,
        }
    }

    pub fn into_address(self) -> String {
        match self {
            Resolution::Navigate(address) | Resolution::Search(address) => address,
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, Resolution::Search(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressResolver {
    force_https: bool,
}

impl AddressResolver {
    pub fn new(force_https: bool) -> Self {
        Self { force_https }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.get_bool(keys::FORCE_HTTPS, keys::DEFAULT_FORCE_HTTPS))
    }

    pub fn force_https(&self) -> bool {
        self.force_https
    }

    pub fn set_force_https(&mut self, force_https: bool) {
        self.force_https = force_https;
    }

    /// Resolve with this resolver's HTTPS setting.
    pub fn resolve_input(&self, input: &str) -> Resolution {
        Self::resolve(input, self.force_https)
    }

    /// Turn raw user input into an address. Never fails.
    pub fn resolve(input: &str, force_https: bool) -> Resolution {
        let input = input.trim();

        if input.contains(' ') || !input.contains('.') {
            return Resolution::Search(search_address(input));
        }

        let candidate = with_scheme(input, force_https);
        if Url::parse(&candidate).is_ok() {
            Resolution::Navigate(candidate)
        } else {
            tracing::debug!(input = %input, "Input is not a valid address, searching instead");
            Resolution::Search(search_address(input))
        }
    }
}

impl Default for AddressResolver {
    fn default() -> Self {
        Self::new(keys::DEFAULT_FORCE_HTTPS)
    }
}

/// Build the search address for `query`: spaces become `+`, other
/// reserved bytes are percent-encoded.
pub(crate) fn search_address(query: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{SEARCH_PREFIX}{encoded}")
}

fn with_scheme(input: &str, force_https: bool) -> String {
    if let Some(rest) = strip_prefix_ignore_case(input, HTTPS) {
        return format!("{HTTPS}{rest}");
    }

    if let Some(rest) = strip_prefix_ignore_case(input, HTTP) {
        return if force_https {
            format!("{HTTPS}{rest}")
        } else {
            format!("{HTTP}{rest}")
        };
    }

    format!("{HTTPS}{input}")
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        input.get(prefix.len()..)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_search_query() {
        assert_eq!(
            AddressResolver::resolve("openai gpt", true),
            Resolution::Search("https://www.google.com/search?q=openai+gpt".to_string())
        );
        assert_eq!(
            AddressResolver::resolve("  rust  ", false).address(),
            "https://www.google.com/search?q=rust"
        );
    }

    #[test]
    fn test_host_gets_https() {
        assert_eq!(
            AddressResolver::resolve("example.com", true),
            Resolution::Navigate("https://example.com".to_string())
        );
        assert_eq!(
            AddressResolver::resolve("example.com", false).address(),
            "https://example.com"
        );
    }

    #[test]
    fn test_http_upgrade() {
        assert_eq!(
            AddressResolver::resolve("http://example.com", true).address(),
            "https://example.com"
        );
        assert_eq!(
            AddressResolver::resolve("http://example.com", false).address(),
            "http://example.com"
        );
        assert_eq!(
            AddressResolver::resolve("HTTP://Example.com/a", true).address(),
            "https://Example.com/a"
        );
    }

    #[test]
    fn test_https_kept() {
        assert_eq!(
            AddressResolver::resolve("https://docs.rs/url", false).address(),
            "https://docs.rs/url"
        );
    }

    #[test]
    fn test_empty_input() {
        let resolution = AddressResolver::resolve("   ", true);
        assert!(resolution.is_search());
        assert_eq!(resolution.address(), "https://www.google.com/search?q=");
    }

    #[test]
    fn test_no_dot_is_search() {
        assert!(AddressResolver::resolve("localhost:8080", true).is_search());
        assert!(AddressResolver::resolve("http://intranet", false).is_search());
    }

    #[test]
    fn test_reserved_characters_are_encoded() {
        assert_eq!(
            AddressResolver::resolve("c++ vs rust?", true).address(),
            "https://www.google.com/search?q=c%2B%2B+vs+rust%3F"
        );
    }

    #[test]
    fn test_invalid_host_degrades_to_search() {
        let resolution = AddressResolver::resolve("example.com:99999", true);
        assert!(resolution.is_search());
        assert!(resolution.address().starts_with(SEARCH_PREFIX));
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        assert!(AddressResolver::from_config(&config).force_https());

        config.set_bool(keys::FORCE_HTTPS, false);
        let resolver = AddressResolver::from_config(&config);
        assert_eq!(
            resolver.resolve_input("http://example.com").address(),
            "http://example.com"
        );
    }

    proptest! {
        #[test]
        fn prop_words_become_plus_joined_search(
            words in prop::collection::vec("[a-z0-9]{1,8}", 2..5),
            force in any::<bool>(),
        ) {
            let input = words.join(" ");
            let resolution = AddressResolver::resolve(&input, force);
            prop_assert!(resolution.is_search());
            prop_assert_eq!(
                resolution.address(),
                format!("{SEARCH_PREFIX}{}", words.join("+"))
            );
        }

        #[test]
        fn prop_dotless_input_is_search(input in "[a-zA-Z0-9:/_-]{0,20}", force in any::<bool>()) {
            let resolution = AddressResolver::resolve(&input, force);
            prop_assert!(resolution.is_search());
            prop_assert!(resolution.address().starts_with(SEARCH_PREFIX));
        }

        #[test]
        fn prop_host_input_has_web_scheme(
            input in "(http://|https://|HTTP://)?[a-z0-9]{1,10}\\.[a-z]{2,6}(/[a-z0-9]{0,8})?",
            force in any::<bool>(),
        ) {
            let resolution = AddressResolver::resolve(&input, force);
            let address = resolution.address();
            prop_assert!(address.starts_with(HTTPS) || address.starts_with(HTTP));
            if force {
                prop_assert!(!address.starts_with(HTTP));
            }
            prop_assert!(Url::parse(address).is_ok());
        }

        #[test]
        fn prop_never_panics_and_is_absolute(input in ".{0,40}", force in any::<bool>()) {
            let resolution = AddressResolver::resolve(&input, force);
            prop_assert!(Url::parse(resolution.address()).is_ok());
            if force {
                prop_assert!(!resolution.address().starts_with(HTTP));
            }
        }
    }
}
