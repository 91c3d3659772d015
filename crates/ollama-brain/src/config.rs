//! Configuration for OllamaBrain.

use std::env;
use std::path::Path;
use std::time::Duration;

use brain_core::DEFAULT_MAX_TURNS;

/// Default system prompt file name.
pub const DEFAULT_PROMPT_FILE: &str = "SYSTEM_PROMPT.md";

/// Default Ollama server URL.
pub const DEFAULT_API_URL: &str = "http://localhost:11434";

/// Default model: small enough to run on a laptop CPU.
pub const DEFAULT_MODEL: &str = "llama3.2:1b";

/// Built-in persona used when no system prompt is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly, upbeat assistant in a group chat app. \
Keep answers short and conversational, use markdown when it helps readability, \
and never pretend to have browsed the web or seen files you were not given.";

/// Configuration for OllamaBrain.
#[derive(Debug, Clone)]
pub struct OllamaBrainConfig {
    /// Ollama server URL.
    pub api_url: String,

    /// Model name to use.
    pub model: String,

    /// System prompt injected at the start of every request.
    pub system_prompt: Option<String>,

    /// Maximum tokens to generate (`num_predict`).
    pub max_tokens: Option<u32>,

    /// Temperature for generation (0.0 - 2.0).
    pub temperature: f32,

    /// Maximum number of turns (individual messages) kept per user.
    pub max_history_turns: usize,

    /// Deadline for a chat request. Local models can be slow.
    pub request_timeout: Duration,

    /// How long a health verdict stays valid.
    pub health_check_interval: Duration,

    /// Deadline for a single health probe.
    pub probe_timeout: Duration,
}

impl Default for OllamaBrainConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tokens: Some(500),
            temperature: 0.7,
            max_history_turns: DEFAULT_MAX_TURNS,
            request_timeout: Duration::from_secs(300),
            health_check_interval: Duration::from_millis(60_000),
            probe_timeout: Duration::from_millis(2_000),
        }
    }
}

impl OllamaBrainConfig {
    /// Create configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `OLLAMA_API_URL` - Server URL (default: http://localhost:11434)
    /// - `OLLAMA_MODEL` - Model name (default: llama3.2:1b)
    /// - `OLLAMA_SYSTEM_PROMPT` - System prompt (overrides prompt file)
    /// - `OLLAMA_PROMPT_FILE` - Path to system prompt file (default: SYSTEM_PROMPT.md)
    /// - `OLLAMA_MAX_TOKENS` - Max tokens (default: 500)
    /// - `OLLAMA_TEMPERATURE` - Temperature (default: 0.7)
    /// - `OLLAMA_MAX_HISTORY` - Turns kept per user (default: 20)
    /// - `OLLAMA_REQUEST_TIMEOUT_SECS` - Chat deadline (default: 300)
    /// - `HEALTH_CHECK_INTERVAL_MS` - Health verdict TTL (default: 60000)
    /// - `HEALTH_PROBE_TIMEOUT_MS` - Health probe deadline (default: 2000)
    ///
    /// System prompt priority:
    /// 1. `OLLAMA_SYSTEM_PROMPT` env var (if set)
    /// 2. Contents of prompt file (if exists)
    /// 3. Built-in persona
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = env::var("OLLAMA_API_URL").unwrap_or(defaults.api_url);
        let model = env::var("OLLAMA_MODEL").unwrap_or(defaults.model);

        let system_prompt = if let Ok(prompt) = env::var("OLLAMA_SYSTEM_PROMPT") {
            Some(prompt)
        } else {
            let prompt_file = env::var("OLLAMA_PROMPT_FILE")
                .unwrap_or_else(|_| DEFAULT_PROMPT_FILE.to_string());
            load_prompt_file(&prompt_file).or(defaults.system_prompt)
        };

        let max_tokens = env::var("OLLAMA_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(defaults.max_tokens);

        let temperature = env::var("OLLAMA_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.temperature);

        let max_history_turns = env::var("OLLAMA_MAX_HISTORY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_history_turns);

        let request_timeout = env::var("OLLAMA_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let health_check_interval = env::var("HEALTH_CHECK_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.health_check_interval);

        let probe_timeout = env::var("HEALTH_PROBE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.probe_timeout);

        Self {
            api_url,
            model,
            system_prompt,
            max_tokens,
            temperature,
            max_history_turns,
            request_timeout,
            health_check_interval,
            probe_timeout,
        }
    }

    /// Create a new config builder.
    pub fn builder() -> OllamaBrainConfigBuilder {
        OllamaBrainConfigBuilder::default()
    }

    /// URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.api_url.trim_end_matches('/'))
    }

    /// URL of the model listing endpoint, used as the liveness probe.
    pub fn tags_url(&self) -> String {
        format!("{}/api/tags", self.api_url.trim_end_matches('/'))
    }
}

/// Builder for OllamaBrainConfig.
#[derive(Debug, Default)]
pub struct OllamaBrainConfigBuilder {
    config: OllamaBrainConfig,
}

impl OllamaBrainConfigBuilder {
    /// Set the server URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Send no system prompt at all.
    pub fn no_system_prompt(mut self) -> Self {
        self.config.system_prompt = None;
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = temp;
        self
    }

    /// Set the number of turns kept per user.
    pub fn max_history_turns(mut self, turns: usize) -> Self {
        self.config.max_history_turns = turns;
        self
    }

    /// Set the chat request deadline.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the health verdict TTL.
    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.config.health_check_interval = interval;
        self
    }

    /// Set the health probe deadline.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OllamaBrainConfig {
        self.config
    }

    /// Load system prompt from a file.
    ///
    /// If the file exists and is non-empty, sets the system prompt.
    pub fn load_prompt_file(mut self, path: impl AsRef<Path>) -> Self {
        if let Some(prompt) = load_prompt_file(path) {
            self.config.system_prompt = Some(prompt);
        }
        self
    }
}

/// Load a prompt file, returning None if not found or empty.
fn load_prompt_file(path: impl AsRef<Path>) -> Option<String> {
    match std::fs::read_to_string(path.as_ref()) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(_) => None,
    }
}
