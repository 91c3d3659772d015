//! Giphy search source, reachable directly or through a proxy route.

use std::time::Duration;

use async_trait::async_trait;
use brain_core::{FallbackSource, SourceError};
use reqwest::{Client, Proxy};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::Route;
use crate::error::GifError;
use crate::normalize::normalize_payload;
use crate::types::{GifItem, GifQuery};

/// A Giphy endpoint reached directly or via one [`Route`].
pub struct GiphySource {
    name: String,
    client: Client,
    api_url: String,
    api_key: String,
    rating: String,
    route: Option<Route>,
    timeout: Duration,
}

impl GiphySource {
    /// A source that calls Giphy directly.
    pub fn direct(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GifError> {
        Self::build("giphy-direct".to_string(), api_url.into(), api_key.into(), None, timeout)
    }

    /// A source that reaches Giphy through `route`.
    pub fn proxied(
        name: impl Into<String>,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        route: Route,
        timeout: Duration,
    ) -> Result<Self, GifError> {
        Self::build(name.into(), api_url.into(), api_key.into(), Some(route), timeout)
    }

    fn build(
        name: String,
        api_url: String,
        api_key: String,
        route: Option<Route>,
        timeout: Duration,
    ) -> Result<Self, GifError> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(Route::HttpProxy(proxy)) = &route {
            let proxy = Proxy::all(proxy)
                .map_err(|e| GifError::Configuration(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            name,
            client: builder.build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            rating: "g".to_string(),
            route,
            timeout,
        })
    }

    /// Content rating sent with each request.
    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = rating.into();
        self
    }

    /// The provider URL for `query`, before any route is applied.
    pub fn endpoint(&self, query: &GifQuery) -> Result<Url, url::ParseError> {
        let limit = query.limit.to_string();
        let mut params = vec![
            ("api_key", self.api_key.as_str()),
            ("limit", limit.as_str()),
            ("rating", self.rating.as_str()),
        ];

        let path = match &query.query {
            Some(terms) => {
                params.push(("q", terms.as_str()));
                format!("{}/v1/{}/search", self.api_url, query.kind)
            }
            None => format!("{}/v1/{}/trending", self.api_url, query.kind),
        };

        Url::parse_with_params(&path, &params)
    }

    /// The URL actually requested, with the route applied.
    pub fn request_url(&self, query: &GifQuery) -> Result<String, url::ParseError> {
        let target = self.endpoint(query)?;
        Ok(match &self.route {
            Some(Route::UrlPrefix(prefix)) => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
                format!("{}{}", prefix, encoded)
            }
            _ => target.to_string(),
        })
    }
}

#[async_trait]
impl FallbackSource<GifQuery, Vec<GifItem>> for GiphySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, query: &GifQuery) -> Result<Vec<GifItem>, SourceError> {
        let url = self
            .request_url(query)
            .map_err(|e| SourceError::Failed(format!("bad request URL: {}", e)))?;

        debug!("[{}] GET {} ({})", self.name, query.kind, query.label());
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(self.timeout)
            } else {
                SourceError::Failed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Failed(format!("HTTP {}", status.as_u16())));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Failed(format!("malformed payload: {}", e)))?;

        // Not every route forwards `limit`.
        let mut items = normalize_payload(&payload);
        items.truncate(query.limit as usize);
        Ok(items)
    }
}
