//! The GIF search fallback chain.

use std::sync::Arc;

use brain_core::{FallbackChain, FallbackSource, TerminalSource};
use tracing::{info, warn};

use crate::config::GifSearchConfig;
use crate::error::GifError;
use crate::local::LocalGifGenerator;
use crate::source::GiphySource;
use crate::types::{GifItem, GifMeta, GifQuery, GifResultSet, MediaKind};

/// Searches Giphy directly, then through each proxy route, then falls back to
/// [`LocalGifGenerator`]. Never fails and never returns an empty set.
pub struct GifFallbackChain {
    chain: FallbackChain<GifQuery, Vec<GifItem>>,
}

impl GifFallbackChain {
    /// Build the chain described by `config`.
    pub fn new(config: &GifSearchConfig) -> Result<Self, GifError> {
        let mut sources: Vec<Arc<dyn FallbackSource<GifQuery, Vec<GifItem>>>> = Vec::new();

        match &config.api_key {
            Some(key) => {
                sources.push(Arc::new(
                    GiphySource::direct(&config.api_url, key, config.direct_timeout)?
                        .with_rating(&config.rating),
                ));
                for (i, route) in config.proxy_routes.iter().enumerate() {
                    sources.push(Arc::new(
                        GiphySource::proxied(
                            format!("giphy-proxy-{}", i + 1),
                            &config.api_url,
                            key,
                            route.clone(),
                            config.proxy_timeout,
                        )?
                        .with_rating(&config.rating),
                    ));
                }
            }
            None => warn!("GIPHY_API_KEY not set, GIF search will use local placeholders only"),
        }

        info!("GIF search chain with {} remote sources", sources.len());
        Ok(Self::with_sources(sources))
    }

    /// Build from environment variables.
    pub fn from_env() -> Result<Self, GifError> {
        Self::new(&GifSearchConfig::from_env())
    }

    /// Build from explicit sources, ending in the local generator.
    pub fn with_sources(sources: Vec<Arc<dyn FallbackSource<GifQuery, Vec<GifItem>>>>) -> Self {
        let terminal: Arc<dyn TerminalSource<GifQuery, Vec<GifItem>>> = Arc::new(LocalGifGenerator);
        let mut chain = FallbackChain::new("gif-search", terminal)
            .accept_when(|items: &Vec<GifItem>| !items.is_empty());
        for source in sources {
            chain = chain.with_source(source);
        }
        Self { chain }
    }

    /// Source names in the order they are tried.
    pub fn source_names(&self) -> Vec<&str> {
        self.chain.source_names()
    }

    /// Search for `query` (trending when `None` or blank).
    pub async fn search(&self, query: Option<&str>, limit: u32, kind: MediaKind) -> GifResultSet {
        let query = GifQuery::new(query, limit, kind);
        let outcome = self.chain.run(&query).await;
        if outcome.exhausted {
            info!(
                "GIF search for '{}' fell back to local placeholders after {} failures",
                query.label(),
                outcome.failures.len()
            );
        }

        GifResultSet {
            data: outcome.value,
            meta: GifMeta {
                msg: outcome.served_by,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Route;
    use crate::local::LOCAL_RESULT_COUNT;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn giphy_body(ids: &[&str]) -> serde_json::Value {
        let data: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "title": format!("gif {id}"),
                    "images": {
                        "fixed_height": {"url": format!("https://media.example/{id}.gif"), "width": "200", "height": "200"},
                        "original": {"url": format!("https://media.example/{id}-o.gif"), "width": "480", "height": "480"}
                    }
                })
            })
            .collect();
        json!({"data": data, "meta": {"status": 200, "msg": "OK"}})
    }

    fn config(api_url: &str) -> GifSearchConfig {
        GifSearchConfig::default()
            .with_api_key("test-key")
            .with_api_url(api_url)
            .with_timeouts(Duration::from_millis(500), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_direct_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/gifs/search"))
            .and(query_param("q", "cat"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(giphy_body(&["a", "b"])))
            .expect(1)
            .mount(&server)
            .await;

        let chain = GifFallbackChain::new(&config(&server.uri())).unwrap();
        let result = chain.search(Some("cat"), 2, MediaKind::Gifs).await;

        assert_eq!(result.data.len(), 2);
        assert_eq!(result.meta.msg, "giphy-direct");
        assert_eq!(result.data[0].images.fixed_height.width, 200);
    }

    #[tokio::test]
    async fn test_trending_when_no_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/stickers/trending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(giphy_body(&["t"])))
            .expect(1)
            .mount(&server)
            .await;

        let chain = GifFallbackChain::new(&config(&server.uri())).unwrap();
        let result = chain.search(Some("  "), 10, MediaKind::Stickers).await;
        assert_eq!(result.data[0].id, "t");
    }

    #[tokio::test]
    async fn test_failed_direct_falls_back_to_prefix_proxy() {
        let giphy = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&giphy)
            .await;

        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contents": giphy_body(&["via-proxy"]).to_string()
            })))
            .expect(1)
            .mount(&proxy)
            .await;

        let cfg = config(&giphy.uri())
            .with_route(Route::UrlPrefix(format!("{}/get?url=", proxy.uri())));
        let chain = GifFallbackChain::new(&cfg).unwrap();
        assert_eq!(
            chain.source_names(),
            vec!["giphy-direct", "giphy-proxy-1", "local-generator"]
        );

        let result = chain.search(Some("cat"), 5, MediaKind::Gifs).await;
        assert_eq!(result.meta.msg, "giphy-proxy-1");
        assert_eq!(result.data[0].id, "via-proxy");
    }

    #[tokio::test]
    async fn test_route_ignoring_limit_is_capped() {
        let giphy = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&giphy)
            .await;

        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(giphy_body(&["1", "2", "3", "4", "5", "6"])),
            )
            .mount(&proxy)
            .await;

        let cfg = config(&giphy.uri()).with_route(Route::UrlPrefix(format!("{}/?", proxy.uri())));
        let result = GifFallbackChain::new(&cfg)
            .unwrap()
            .search(Some("cat"), 2, MediaKind::Gifs)
            .await;

        assert_eq!(result.meta.msg, "giphy-proxy-1");
        let ids: Vec<_> = result.data.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_empty_success_is_a_failure() {
        let giphy = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&giphy)
            .await;

        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(giphy_body(&["p"])))
            .mount(&proxy)
            .await;

        let cfg = config(&giphy.uri()).with_route(Route::UrlPrefix(format!("{}/?", proxy.uri())));
        let result = GifFallbackChain::new(&cfg)
            .unwrap()
            .search(Some("nothing"), 5, MediaKind::Gifs)
            .await;
        assert_eq!(result.meta.msg, "giphy-proxy-1");
    }

    #[tokio::test]
    async fn test_http_proxy_route() {
        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(giphy_body(&["tunnelled"])))
            .expect(1)
            .mount(&proxy)
            .await;

        // The direct host does not resolve; the HTTP proxy answers instead.
        let cfg = config("http://giphy.invalid").with_route(Route::HttpProxy(proxy.uri()));
        let result = GifFallbackChain::new(&cfg)
            .unwrap()
            .search(Some("cat"), 5, MediaKind::Gifs)
            .await;
        assert_eq!(result.meta.msg, "giphy-proxy-1");
        assert_eq!(result.data[0].id, "tunnelled");
    }

    #[tokio::test]
    async fn test_slow_sources_time_out_to_local() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(giphy_body(&["late"]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let cfg = config(&server.uri())
            .with_route(Route::UrlPrefix(format!("{}/?", server.uri())))
            .with_timeouts(Duration::from_millis(100), Duration::from_millis(100));
        let result = GifFallbackChain::new(&cfg)
            .unwrap()
            .search(Some("slow"), 5, MediaKind::Gifs)
            .await;

        assert_eq!(result.meta.msg, "local-generator");
        assert_eq!(result.data.len(), LOCAL_RESULT_COUNT);
    }

    #[tokio::test]
    async fn test_offline_never_empty() {
        let cfg = config("http://127.0.0.1:9")
            .with_route(Route::UrlPrefix("http://127.0.0.1:9/?".into()));
        let chain = GifFallbackChain::new(&cfg).unwrap();

        for query in [Some("cat"), None, Some("")] {
            let result = chain.search(query, 0, MediaKind::Gifs).await;
            assert!(!result.data.is_empty());
            assert_eq!(result.meta.msg, "local-generator");
        }
    }

    #[tokio::test]
    async fn test_without_api_key_only_local_runs() {
        let chain = GifFallbackChain::new(&GifSearchConfig::default()).unwrap();
        assert_eq!(chain.source_names(), vec!["local-generator"]);

        let a = chain.search(Some("wave"), 10, MediaKind::Gifs).await;
        let b = chain.search(Some("wave"), 10, MediaKind::Gifs).await;
        assert_eq!(a, b);
        assert_eq!(a.data.len(), LOCAL_RESULT_COUNT);
    }
}
