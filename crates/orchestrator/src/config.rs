//! Orchestrator configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use image_gen::{SeedStrategy, DEFAULT_DOWNLOAD_TIMEOUT};

use crate::error::OrchestratorError;

/// Default render provider endpoint.
pub const DEFAULT_RENDER_URL: &str = "https://image.pollinations.ai/prompt";

/// Default directory for cached renders.
pub const DEFAULT_IMAGE_CACHE_DIR: &str = "generated-images";

/// Default URL prefix under which cached renders are served.
pub const DEFAULT_IMAGE_PUBLIC_PREFIX: &str = "/generated-images";

/// Default directory searched for attachments.
pub const DEFAULT_ATTACHMENT_DIR: &str = "uploads";

/// Configuration for the [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Route chat through the primary-then-rules fallback chain. When false,
    /// primary failures produce the apology reply.
    pub fallback_enabled: bool,
    /// Render provider endpoint; the request is sent as query parameters.
    pub render_url: String,
    /// Directory holding cached renders.
    pub image_cache_dir: PathBuf,
    /// URL prefix used in image replies.
    pub image_public_prefix: String,
    /// Deadline for a render download.
    pub image_download_timeout: Duration,
    /// How render seeds are chosen.
    pub seed_strategy: SeedStrategy,
    /// Directories searched for attachments, in order.
    pub attachment_dirs: Vec<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            render_url: DEFAULT_RENDER_URL.to_string(),
            image_cache_dir: PathBuf::from(DEFAULT_IMAGE_CACHE_DIR),
            image_public_prefix: DEFAULT_IMAGE_PUBLIC_PREFIX.to_string(),
            image_download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            seed_strategy: SeedStrategy::default(),
            attachment_dirs: vec![PathBuf::from(DEFAULT_ATTACHMENT_DIR)],
        }
    }
}

impl OrchestratorConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `AI_FALLBACK_ENABLED` (default: true)
    /// - `IMAGE_RENDER_URL` (default: pollinations prompt endpoint)
    /// - `IMAGE_CACHE_DIR` (default: `generated-images`)
    /// - `IMAGE_PUBLIC_PREFIX` (default: `/generated-images`)
    /// - `IMAGE_DOWNLOAD_TIMEOUT_SECS` (default: 120)
    /// - `IMAGE_SEED_STRATEGY` (`clock` or `hash`, default: clock)
    /// - `ATTACHMENT_DIRS` (comma-separated, default: `uploads`)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let fallback_enabled = env::var("AI_FALLBACK_ENABLED")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.fallback_enabled);

        let render_url = env::var("IMAGE_RENDER_URL").unwrap_or(defaults.render_url);

        let image_cache_dir = env::var("IMAGE_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.image_cache_dir);

        let image_public_prefix =
            env::var("IMAGE_PUBLIC_PREFIX").unwrap_or(defaults.image_public_prefix);

        let image_download_timeout = env::var("IMAGE_DOWNLOAD_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.image_download_timeout);

        let seed_strategy = env::var("IMAGE_SEED_STRATEGY")
            .ok()
            .and_then(|v| SeedStrategy::parse(&v))
            .unwrap_or(defaults.seed_strategy);

        let attachment_dirs = env::var("ATTACHMENT_DIRS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(PathBuf::from)
                    .collect::<Vec<_>>()
            })
            .filter(|dirs| !dirs.is_empty())
            .unwrap_or(defaults.attachment_dirs);

        Self {
            fallback_enabled,
            render_url,
            image_cache_dir,
            image_public_prefix,
            image_download_timeout,
            seed_strategy,
            attachment_dirs,
        }
    }

    /// Check settings that would otherwise only fail at request time.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if !(self.render_url.starts_with("http://") || self.render_url.starts_with("https://")) {
            return Err(OrchestratorError::Configuration(format!(
                "IMAGE_RENDER_URL must be an http(s) URL, got '{}'",
                self.render_url
            )));
        }
        if self.image_download_timeout.is_zero() {
            return Err(OrchestratorError::Configuration(
                "IMAGE_DOWNLOAD_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn with_render_url(mut self, url: impl Into<String>) -> Self {
        self.render_url = url.into();
        self
    }

    pub fn with_image_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_cache_dir = dir.into();
        self
    }

    pub fn with_public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_public_prefix = prefix.into();
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.image_download_timeout = timeout;
        self
    }

    pub fn with_seed_strategy(mut self, strategy: SeedStrategy) -> Self {
        self.seed_strategy = strategy;
        self
    }

    pub fn with_attachment_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.attachment_dirs = dirs;
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
