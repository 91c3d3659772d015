//! OllamaBrain implementation using the Ollama chat API.

use std::sync::Arc;

use brain_core::{
    async_trait, hash_prompt, Brain, BrainError, ConversationHistory, ConversationTurn,
    InboundMessage, OutboundMessage,
};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api_types::{ApiError, ChatMessage, ChatOptions, ChatRequest, ChatResponse};
use crate::config::OllamaBrainConfig;
use crate::health::{BackendProbe, HealthMonitor, TagsProbe};

/// Per-call overrides for [`OllamaBrain::dispatch`].
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Use this model instead of the configured one.
    pub model: Option<String>,
    /// Use this temperature instead of the configured one.
    pub temperature: Option<f32>,
    /// Use this system prompt instead of the configured one.
    pub system_prompt: Option<String>,
}

/// A brain implementation backed by a local Ollama server.
///
/// OllamaBrain keeps per-user conversation context in a shared
/// [`ConversationHistory`] and reports readiness through a TTL-cached
/// [`HealthMonitor`]. A failed request is returned to the caller as-is;
/// retrying is the caller's decision.
pub struct OllamaBrain {
    client: Client,
    config: OllamaBrainConfig,
    history: Arc<ConversationHistory>,
    health: HealthMonitor,
    system_prompt_hash: Option<String>,
}

impl OllamaBrain {
    /// Create a new OllamaBrain with its own conversation history.
    pub fn new(config: OllamaBrainConfig) -> Result<Self, BrainError> {
        let history = Arc::new(ConversationHistory::new(config.max_history_turns));
        Self::with_history(config, history)
    }

    /// Create an OllamaBrain that records context into a shared history.
    pub fn with_history(
        config: OllamaBrainConfig,
        history: Arc<ConversationHistory>,
    ) -> Result<Self, BrainError> {
        let client = build_client(&config)?;
        let probe = TagsProbe::new(client.clone(), config.tags_url(), config.probe_timeout);
        Ok(Self::assemble(client, config, history, Arc::new(probe)))
    }

    /// Create an OllamaBrain with a custom liveness probe.
    pub fn with_probe(
        config: OllamaBrainConfig,
        history: Arc<ConversationHistory>,
        probe: Arc<dyn BackendProbe>,
    ) -> Result<Self, BrainError> {
        let client = build_client(&config)?;
        Ok(Self::assemble(client, config, history, probe))
    }

    /// Create an OllamaBrain from environment variables.
    ///
    /// See [`OllamaBrainConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, BrainError> {
        Self::new(OllamaBrainConfig::from_env())
    }

    fn assemble(
        client: Client,
        config: OllamaBrainConfig,
        history: Arc<ConversationHistory>,
        probe: Arc<dyn BackendProbe>,
    ) -> Self {
        let health = HealthMonitor::new(probe, config.health_check_interval);
        let system_prompt_hash = config.system_prompt.as_deref().map(hash_prompt);

        if let Some(ref hash) = system_prompt_hash {
            info!("OllamaBrain system prompt fingerprint: {}", hash);
        }

        info!(
            "OllamaBrain initialized with model: {}, url: {}, health ttl: {} ms",
            config.model,
            config.api_url,
            config.health_check_interval.as_millis()
        );

        Self {
            client,
            config,
            history,
            health,
            system_prompt_hash,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &OllamaBrainConfig {
        &self.config
    }

    /// Get the shared conversation history.
    pub fn history(&self) -> &Arc<ConversationHistory> {
        &self.history
    }

    /// Get the health monitor.
    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    /// Get the system prompt fingerprint, if configured.
    pub fn system_prompt_hash(&self) -> Option<&str> {
        self.system_prompt_hash.as_deref()
    }

    /// Clear conversation history for a specific user.
    pub async fn clear_history(&self, user: &str) {
        self.history.clear(user).await;
    }

    /// Send a message to the model and record the exchange.
    ///
    /// The request carries the system prompt, the user's stored context, and
    /// the new turn. On success both turns are appended to the user's context
    /// (trimmed to the configured bound) and the assistant text is returned.
    /// On failure the context is left untouched.
    pub async fn dispatch(
        &self,
        user: &str,
        text: &str,
        images: Vec<String>,
        options: &DispatchOptions,
    ) -> Result<String, BrainError> {
        let messages = self.build_messages(user, text, &images, options).await;
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        let request = ChatRequest {
            model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: options.temperature.unwrap_or(self.config.temperature),
                num_predict: self.config.max_tokens,
            },
        };

        debug!(
            "Dispatching to {} for {} ({} messages, {} images)",
            request.model,
            user,
            request.messages.len(),
            images.len()
        );

        let completion = self.chat(&request).await?;
        debug!(
            "Completion from {} (role: {}, done: {})",
            completion.model.as_deref().unwrap_or(&request.model),
            completion.message.role,
            completion.done
        );
        if !completion.done {
            warn!("Model {} returned an unfinished completion", request.model);
        }

        let response_text = completion.message.content.trim().to_string();
        if response_text.is_empty() {
            warn!("Model {} returned empty content", request.model);
            return Err(BrainError::Protocol("empty response content".to_string()));
        }

        if let (Some(prompt), Some(generated)) =
            (completion.prompt_eval_count, completion.eval_count)
        {
            debug!("Token usage - prompt: {}, completion: {}", prompt, generated);
        }

        self.history
            .add_exchange(
                user,
                ConversationTurn::user_with_images(text, images),
                &response_text,
            )
            .await;

        info!("Generated response for {}: {} chars", user, response_text.len());
        Ok(response_text)
    }

    /// Build the messages array for a chat request.
    async fn build_messages(
        &self,
        user: &str,
        text: &str,
        images: &[String],
        options: &DispatchOptions,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::new();

        let system_prompt = options
            .system_prompt
            .as_ref()
            .or(self.config.system_prompt.as_ref());
        if let Some(prompt) = system_prompt {
            messages.push(ChatMessage::system(prompt.clone()));
        }

        messages.extend(self.history.get(user).await.into_iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(text, images));

        messages
    }

    /// Make a chat request to the Ollama API.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BrainError> {
        let timeout_ms = self.config.request_timeout.as_millis() as u64;
        let map_transport = |e: reqwest::Error| {
            if e.is_timeout() {
                BrainError::Timeout(timeout_ms)
            } else {
                BrainError::Unavailable(format!("Failed to send request: {}", e))
            }
        };

        let response = self
            .client
            .post(self.config.chat_url())
            .json(request)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
                return Err(BrainError::Protocol(format!(
                    "API error ({}): {}",
                    status.as_u16(),
                    api_error.error
                )));
            }

            return Err(BrainError::Protocol(format!(
                "API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let body = response.bytes().await.map_err(map_transport)?;
        serde_json::from_slice(&body)
            .map_err(|e| BrainError::Protocol(format!("Failed to parse response: {}", e)))
    }
}

fn build_client(config: &OllamaBrainConfig) -> Result<Client, BrainError> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| BrainError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

#[async_trait]
impl Brain for OllamaBrain {
    async fn process(&self, message: InboundMessage) -> Result<OutboundMessage, BrainError> {
        debug!("Processing message from {}: {}", message.sender, message.text);

        let response_text = self
            .dispatch(
                &message.sender,
                &message.text,
                message.images.clone(),
                &DispatchOptions::default(),
            )
            .await?;

        Ok(OutboundMessage::reply_to(&message, response_text))
    }

    fn name(&self) -> &str {
        "OllamaBrain"
    }

    async fn is_ready(&self) -> bool {
        self.health.is_available().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama3.2:1b",
            "message": {"role": "assistant", "content": content},
            "done": true
        }))
    }

    fn brain_for(server: &MockServer) -> OllamaBrain {
        let config = OllamaBrainConfig::builder()
            .api_url(server.uri())
            .system_prompt("You are a test bot")
            .request_timeout(Duration::from_secs(5))
            .build();
        OllamaBrain::new(config).unwrap()
    }

    async fn last_request_json(server: &MockServer) -> serde_json::Value {
        let requests = server.received_requests().await.unwrap();
        let last = requests.last().unwrap();
        serde_json::from_slice(&last.body).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_records_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(reply("Hi there!"))
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        let text = brain
            .dispatch("u1", "hello", Vec::new(), &DispatchOptions::default())
            .await
            .unwrap();

        assert_eq!(text, "Hi there!");
        let turns = brain.history().get("u1").await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[1].content, "Hi there!");
    }

    #[tokio::test]
    async fn test_request_shape_includes_system_history_and_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(reply("ok"))
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        brain
            .dispatch("u1", "first", Vec::new(), &DispatchOptions::default())
            .await
            .unwrap();
        brain
            .dispatch("u1", "see this", vec!["aW1n".into()], &DispatchOptions::default())
            .await
            .unwrap();

        let body = last_request_json(&server).await;
        assert_eq!(body["model"], "llama3.2:1b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 500);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are a test bot");
        assert_eq!(messages[1]["content"], "first");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "see this");
        assert_eq!(messages[3]["images"][0], "aW1n");
    }

    #[tokio::test]
    async fn test_dispatch_options_override() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(reply("ok"))
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        let options = DispatchOptions {
            model: Some("llava:7b".into()),
            temperature: Some(0.1),
            system_prompt: Some("Describe images".into()),
        };
        brain.dispatch("u1", "hi", Vec::new(), &options).await.unwrap();

        let body = last_request_json(&server).await;
        assert_eq!(body["model"], "llava:7b");
        assert_eq!(body["messages"][0]["content"], "Describe images");
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_context_is_capped_at_twenty_turns() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(reply("ack"))
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        for i in 0..12 {
            brain
                .dispatch("u1", &format!("msg {}", i), Vec::new(), &DispatchOptions::default())
                .await
                .unwrap();
        }

        let turns = brain.history().get("u1").await;
        assert_eq!(turns.len(), 20);
        assert_eq!(turns[0].content, "msg 2");
        assert_eq!(turns[19].content, "ack");
    }

    #[tokio::test]
    async fn test_non_success_status_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model 'x' not found"})),
            )
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        let err = brain
            .dispatch("u1", "hello", Vec::new(), &DispatchOptions::default())
            .await
            .unwrap_err();

        match err {
            BrainError::Protocol(msg) => assert!(msg.contains("not found")),
            other => panic!("Expected Protocol error, got {:?}", other),
        }
        assert!(brain.history().is_empty("u1").await);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        let err = brain
            .dispatch("u1", "hello", Vec::new(), &DispatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BrainError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_unfinished_completion_still_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "partial answer"},
                "done": false
            })))
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        let text = brain
            .dispatch("u1", "hello", Vec::new(), &DispatchOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "partial answer");
        assert_eq!(brain.history().len("u1").await, 2);
    }

    #[tokio::test]
    async fn test_empty_content_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(reply("   "))
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        let err = brain
            .dispatch("u1", "hello", Vec::new(), &DispatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BrainError::Protocol(_)));
        assert!(brain.history().is_empty("u1").await);
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(reply("late").set_delay(Duration::from_secs(5)))
            .expect(1)
            .mount(&server)
            .await;

        let config = OllamaBrainConfig::builder()
            .api_url(server.uri())
            .request_timeout(Duration::from_millis(200))
            .build();
        let brain = OllamaBrain::new(config).unwrap();

        let err = brain
            .dispatch("u1", "hello", Vec::new(), &DispatchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, BrainError::Timeout(200));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let config = OllamaBrainConfig::builder()
            .api_url("http://127.0.0.1:9")
            .build();
        let brain = OllamaBrain::new(config).unwrap();

        let err = brain
            .dispatch("u1", "hello", Vec::new(), &DispatchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_is_ready_uses_cached_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"models": [{"name": "llama3.2:1b"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        assert!(brain.is_ready().await);
        assert!(brain.is_ready().await);
        assert!(brain.health().snapshot().await.has_model("llama3.2:1b"));
    }

    #[tokio::test]
    async fn test_process_replies_to_sender() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(reply("Hello!"))
            .mount(&server)
            .await;

        let brain = brain_for(&server);
        let response = brain
            .process(InboundMessage::direct("u9", "hi", 0))
            .await
            .unwrap();
        assert_eq!(response.recipient, "u9");
        assert_eq!(response.text, "Hello!");
        assert_eq!(brain.name(), "OllamaBrain");
    }

    #[test]
    fn test_system_prompt_fingerprint() {
        let config = OllamaBrainConfig::builder().system_prompt("abc").build();
        let brain = OllamaBrain::new(config).unwrap();
        assert_eq!(brain.system_prompt_hash(), Some(hash_prompt("abc").as_str()));
    }
}
