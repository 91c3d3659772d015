//! Configuration for the GIF search chain.

use std::env;
use std::time::Duration;

/// Default Giphy API base URL.
pub const DEFAULT_API_URL: &str = "https://api.giphy.com";

/// How a proxy route reaches the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The percent-encoded target URL is appended to this prefix,
    /// e.g. `https://api.allorigins.win/get?url=`.
    UrlPrefix(String),
    /// Requests are sent through this HTTP proxy.
    HttpProxy(String),
}

impl Route {
    /// Parse one `GIF_PROXY_URLS` entry. `proxy=<url>` selects an HTTP proxy;
    /// anything else is a URL prefix.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        match entry.strip_prefix("proxy=") {
            Some(proxy) if !proxy.trim().is_empty() => {
                Some(Self::HttpProxy(proxy.trim().to_string()))
            }
            Some(_) => None,
            None => Some(Self::UrlPrefix(entry.to_string())),
        }
    }
}

/// Settings for [`GifFallbackChain`](crate::GifFallbackChain).
#[derive(Debug, Clone)]
pub struct GifSearchConfig {
    /// Giphy API key. Without one only the local generator answers.
    pub api_key: Option<String>,
    /// Giphy API base URL.
    pub api_url: String,
    /// Proxy routes tried after the direct call, in order.
    pub proxy_routes: Vec<Route>,
    /// Deadline for the direct call.
    pub direct_timeout: Duration,
    /// Deadline for each proxied call.
    pub proxy_timeout: Duration,
    /// Content rating passed to Giphy.
    pub rating: String,
}

impl Default for GifSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            proxy_routes: Vec::new(),
            direct_timeout: Duration::from_millis(5000),
            proxy_timeout: Duration::from_millis(8000),
            rating: "g".to_string(),
        }
    }
}

impl GifSearchConfig {
    /// Create configuration from environment variables.
    ///
    /// - `GIPHY_API_KEY`: optional
    /// - `GIPHY_API_URL`: defaults to `https://api.giphy.com`
    /// - `GIF_PROXY_URLS`: comma-separated routes (`proxy=<url>` for an HTTP proxy)
    /// - `GIF_DIRECT_TIMEOUT_MS`: defaults to 5000
    /// - `GIF_PROXY_TIMEOUT_MS`: defaults to 8000
    /// - `GIPHY_RATING`: defaults to `g`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = env::var("GIPHY_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let api_url = env::var("GIPHY_API_URL").unwrap_or(defaults.api_url);

        let proxy_routes = env::var("GIF_PROXY_URLS")
            .map(|v| v.split(',').filter_map(Route::parse).collect())
            .unwrap_or_default();

        let direct_timeout = env::var("GIF_DIRECT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.direct_timeout);

        let proxy_timeout = env::var("GIF_PROXY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.proxy_timeout);

        let rating = env::var("GIPHY_RATING").unwrap_or(defaults.rating);

        Self {
            api_key,
            api_url,
            proxy_routes,
            direct_timeout,
            proxy_timeout,
            rating,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.proxy_routes.push(route);
        self
    }

    pub fn with_timeouts(mut self, direct: Duration, proxy: Duration) -> Self {
        self.direct_timeout = direct;
        self.proxy_timeout = proxy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parse() {
        assert_eq!(
            Route::parse(" https://corsproxy.io/? "),
            Some(Route::UrlPrefix("https://corsproxy.io/?".into()))
        );
        assert_eq!(
            Route::parse("proxy=http://10.0.0.2:3128"),
            Some(Route::HttpProxy("http://10.0.0.2:3128".into()))
        );
        assert_eq!(Route::parse("proxy="), None);
        assert_eq!(Route::parse("  "), None);
    }

    #[test]
    fn test_defaults() {
        let config = GifSearchConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.direct_timeout, Duration::from_millis(5000));
        assert_eq!(config.proxy_timeout, Duration::from_millis(8000));
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_builder() {
        let config = GifSearchConfig::default()
            .with_api_key("key")
            .with_route(Route::UrlPrefix("https://p/?url=".into()))
            .with_timeouts(Duration::from_millis(10), Duration::from_millis(20));
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.proxy_routes.len(), 1);
        assert_eq!(config.proxy_timeout, Duration::from_millis(20));
    }
}
