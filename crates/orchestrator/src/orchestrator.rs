//! Main orchestrator that turns a user message into a reply.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use brain_core::{
    Brain, BrainError, FallbackChain, FallbackSource, InboundMessage, OutboundMessage, SourceError,
    TerminalSource,
};
use futures::FutureExt;
use image_gen::{GenerationRequest, ImageCache, PromptEnhancer};
use ollama_brain::{HealthSnapshot, OllamaBrain};
use pattern_brain::PatternMatcher;
use tracing::{debug, error, info, warn};

use crate::attachments::AttachmentIngestor;
use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::error::OrchestratorError;
use crate::formatting::{format_cached_image, format_remote_image, public_image_url};
use crate::sender::ResponseSink;

/// Reply used when nothing else could answer.
pub const APOLOGY_TEXT: &str =
    "I'm sorry, I ran into a problem while putting together a reply. Please try again in a moment.";

/// Steps a request moves through, reported at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    ImageIntentCheck,
    GenerateImage,
    IngestAttachment,
    DispatchPrimary,
    Fallback,
    Done,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ImageIntentCheck => "image-intent-check",
            Self::GenerateImage => "generate-image",
            Self::IngestAttachment => "ingest-attachment",
            Self::DispatchPrimary => "dispatch-primary",
            Self::Fallback => "fallback",
            Self::Done => "done",
        })
    }
}

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseRoute {
    /// Image rendered and served from the local cache.
    CachedImage,
    /// Image could not be cached; the reply links to the render provider.
    RemoteImage,
    /// The primary model answered.
    Primary,
    /// The rule-based matcher answered.
    PatternFallback,
    /// Nothing could answer.
    Apology,
}

impl fmt::Display for ResponseRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CachedImage => "cached-image",
            Self::RemoteImage => "remote-image",
            Self::Primary => "primary",
            Self::PatternFallback => "pattern-fallback",
            Self::Apology => "apology",
        })
    }
}

/// The primary model as a fallback-chain source, gated on its health check.
struct PrimarySource {
    brain: Arc<OllamaBrain>,
    timeout: Duration,
}

#[async_trait]
impl FallbackSource<InboundMessage, OutboundMessage> for PrimarySource {
    fn name(&self) -> &str {
        "primary"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, message: &InboundMessage) -> Result<OutboundMessage, SourceError> {
        if !self.brain.is_ready().await {
            let reason = self
                .brain
                .health()
                .snapshot()
                .await
                .error
                .unwrap_or_else(|| "health check failed".to_string());
            return Err(SourceError::Unavailable(reason));
        }

        match self.brain.process(message.clone()).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                if err.is_unavailable() {
                    // Don't trust the cached healthy verdict on the next request.
                    self.brain.health().invalidate().await;
                }
                Err(source_error(err))
            }
        }
    }
}

fn source_error(err: BrainError) -> SourceError {
    match err {
        BrainError::Timeout(ms) => SourceError::Timeout(Duration::from_millis(ms)),
        BrainError::Unavailable(reason) => SourceError::Unavailable(reason),
        other => SourceError::Failed(other.to_string()),
    }
}

/// Top-level entry point: image generation, or chat with fallback.
///
/// The orchestrator:
/// - Answers "draw ..." style messages with a cached render, never touching the model
/// - Inlines attachments into the outgoing message
/// - Dispatches to the primary model while it is healthy
/// - Falls back to the rule-based matcher when it is not
/// - Never returns an error from [`generate_response`](Self::generate_response)
pub struct Orchestrator {
    config: OrchestratorConfig,
    primary: Arc<OllamaBrain>,
    patterns: Arc<PatternMatcher>,
    chat_chain: FallbackChain<InboundMessage, OutboundMessage>,
    enhancer: PromptEnhancer,
    images: ImageCache,
    attachments: AttachmentIngestor,
}

impl Orchestrator {
    /// Create an orchestrator around `primary` with the built-in rule set.
    pub fn new(config: OrchestratorConfig, primary: Arc<OllamaBrain>) -> Self {
        Self::with_patterns(config, primary, Arc::new(PatternMatcher::new()))
    }

    /// Create an orchestrator with a custom pattern matcher.
    pub fn with_patterns(
        config: OrchestratorConfig,
        primary: Arc<OllamaBrain>,
        patterns: Arc<PatternMatcher>,
    ) -> Self {
        let primary_source = PrimarySource {
            brain: primary.clone(),
            // The health probe runs inside the same attempt.
            timeout: primary.config().request_timeout + primary.config().probe_timeout,
        };
        let terminal: Arc<dyn TerminalSource<InboundMessage, OutboundMessage>> = patterns.clone();
        let chat_chain = FallbackChain::new("chat", terminal)
            .with_source(Arc::new(primary_source))
            .accept_when(|reply: &OutboundMessage| !reply.text.trim().is_empty());

        let enhancer = PromptEnhancer::new(config.seed_strategy);
        let images = ImageCache::new(&config.image_cache_dir, config.image_download_timeout);
        let attachments = AttachmentIngestor::new(config.attachment_dirs.clone());

        info!(
            "Orchestrator initialized (fallback: {}, image cache: {}, attachment dirs: {})",
            config.fallback_enabled,
            config.image_cache_dir.display(),
            config.attachment_dirs.len()
        );

        Self {
            config,
            primary,
            patterns,
            chat_chain,
            enhancer,
            images,
            attachments,
        }
    }

    /// Create an orchestrator from environment variables.
    ///
    /// See [`OrchestratorConfig::from_env`] and [`ollama_brain::OllamaBrainConfig::from_env`].
    pub fn from_env() -> Result<Self, OrchestratorError> {
        let config = OrchestratorConfig::from_env();
        config.validate()?;
        let primary = Arc::new(OllamaBrain::from_env()?);
        Ok(Self::new(config, primary))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The rule-based matcher, e.g. to register custom patterns.
    pub fn patterns(&self) -> &PatternMatcher {
        &self.patterns
    }

    pub fn primary(&self) -> &Arc<OllamaBrain> {
        &self.primary
    }

    /// Whether the primary model is currently considered available.
    pub async fn primary_available(&self) -> bool {
        self.primary.is_ready().await
    }

    /// The primary model's last health snapshot, without probing.
    pub async fn health_snapshot(&self) -> HealthSnapshot {
        self.primary.health().snapshot().await
    }

    /// Forget the conversation context of `user_id`.
    pub async fn clear_history(&self, user_id: &str) {
        info!("Clearing conversation history for {}", user_id);
        self.primary.clear_history(user_id).await;
    }

    /// Produce a markdown-capable reply. Never fails.
    pub async fn generate_response(
        &self,
        user_id: &str,
        message: &str,
        attachment_ref: Option<&str>,
    ) -> String {
        let started = Instant::now();
        debug!("[{}] stage: {}", user_id, GenerationStage::ImageIntentCheck);

        let work = async {
            match self.enhancer.detect_image_intent(message) {
                Some(request) => self.generate_image(user_id, &request).await,
                None => self.generate_chat(user_id, message, attachment_ref).await,
            }
        };
        // A panic anywhere below (e.g. in a custom pattern) must not reach the caller.
        let (text, route) = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(reply) => reply,
            Err(_) => {
                error!("Response generation for {} panicked", user_id);
                (APOLOGY_TEXT.to_string(), ResponseRoute::Apology)
            }
        };

        debug!("[{}] stage: {}", user_id, GenerationStage::Done);
        info!(
            "Response for {} via {} ({} chars, {} ms)",
            user_id,
            route,
            text.len(),
            started.elapsed().as_millis()
        );
        text
    }

    /// Generate a reply and hand it to `sink`.
    pub async fn deliver(
        &self,
        user_id: &str,
        message: &str,
        attachment_ref: Option<&str>,
        sink: &dyn ResponseSink,
    ) -> Result<(), OrchestratorError> {
        let text = self.generate_response(user_id, message, attachment_ref).await;
        sink.send_response(user_id, &text).await
    }

    async fn generate_image(
        &self,
        user_id: &str,
        request: &GenerationRequest,
    ) -> (String, ResponseRoute) {
        debug!("[{}] stage: {}", user_id, GenerationStage::GenerateImage);
        info!(
            "Image request from {}: {} ({}, {}x{}, seed {})",
            user_id,
            request.subject,
            request.composition,
            request.width,
            request.height,
            request.seed
        );

        let render_url = match request.render_url(&self.config.render_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not build render URL: {}", e);
                return (APOLOGY_TEXT.to_string(), ResponseRoute::Apology);
            }
        };

        match self
            .images
            .fetch_or_create(render_url.as_str(), &request.raw_prompt)
            .await
        {
            Ok(image) => {
                let url = public_image_url(&self.config.image_public_prefix, &image.file_name());
                debug!(
                    "Image {} ready at {} (from cache: {})",
                    image.content_hash,
                    image.local_path.display(),
                    image.from_cache
                );
                (format_cached_image(&request.subject, &url), ResponseRoute::CachedImage)
            }
            Err(e) => {
                warn!("Image cache failed, linking render provider directly: {}", e);
                (
                    format_remote_image(&request.subject, render_url.as_str()),
                    ResponseRoute::RemoteImage,
                )
            }
        }
    }

    async fn generate_chat(
        &self,
        user_id: &str,
        message: &str,
        attachment_ref: Option<&str>,
    ) -> (String, ResponseRoute) {
        let mut context = Context::new();
        if let Some(reference) = attachment_ref {
            debug!("[{}] stage: {}", user_id, GenerationStage::IngestAttachment);
            context.add_attachment(self.attachments.resolve(reference).await);
            debug!("Attachment context: {}", context.format_summary());
        }

        let timestamp = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let inbound = context.augment_message(&InboundMessage::direct(user_id, message, timestamp));

        debug!("[{}] stage: {}", user_id, GenerationStage::DispatchPrimary);
        if self.config.fallback_enabled {
            let outcome = self.chat_chain.run(&inbound).await;
            if outcome.exhausted {
                debug!("[{}] stage: {}", user_id, GenerationStage::Fallback);
                for failure in &outcome.failures {
                    info!("Primary skipped for {}: {}", user_id, failure.error);
                }
                (outcome.value.text, ResponseRoute::PatternFallback)
            } else {
                (outcome.value.text, ResponseRoute::Primary)
            }
        } else {
            match self.primary.process(inbound).await {
                Ok(reply) if !reply.text.trim().is_empty() => (reply.text, ResponseRoute::Primary),
                Ok(_) => {
                    warn!("Primary returned an empty reply for {}", user_id);
                    (APOLOGY_TEXT.to_string(), ResponseRoute::Apology)
                }
                Err(e) => {
                    warn!("Primary failed for {} with fallback disabled: {}", user_id, e);
                    (APOLOGY_TEXT.to_string(), ResponseRoute::Apology)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_mapping() {
        assert_eq!(
            source_error(BrainError::Timeout(1500)),
            SourceError::Timeout(Duration::from_millis(1500))
        );
        assert_eq!(
            source_error(BrainError::Unavailable("refused".into())),
            SourceError::Unavailable("refused".into())
        );
        assert!(matches!(
            source_error(BrainError::Protocol("HTTP 500".into())),
            SourceError::Failed(ref m) if m.contains("HTTP 500")
        ));
    }

    #[test]
    fn test_stage_and_route_names() {
        assert_eq!(GenerationStage::DispatchPrimary.to_string(), "dispatch-primary");
        assert_eq!(ResponseRoute::PatternFallback.to_string(), "pattern-fallback");
    }
}
