//! Simple round trip against a local Ollama server.
//!
//! Run with: cargo run -p ollama-brain --example test_chat
//! Or with a custom message: cargo run -p ollama-brain --example test_chat -- "Your message here"
//!
//! Optional environment variables (see OllamaBrainConfig::from_env):
//!   OLLAMA_API_URL, OLLAMA_MODEL, OLLAMA_SYSTEM_PROMPT

use ollama_brain::{Brain, InboundMessage, OllamaBrain};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let message_text = if args.len() > 1 {
        args[1..].join(" ")
    } else {
        "Hello! Please respond with a short greeting.".to_string()
    };

    let brain = OllamaBrain::from_env()?;
    println!("Brain initialized: {}", brain.name());
    println!("API URL: {}", brain.config().api_url);
    println!("Model: {}", brain.config().model);

    if !brain.is_ready().await {
        let snapshot = brain.health().snapshot().await;
        println!(
            "Backend unavailable: {}",
            snapshot.error.unwrap_or_else(|| "unknown".to_string())
        );
        return Ok(());
    }

    println!("Sending: \"{}\"", message_text);
    let response = brain
        .process(InboundMessage::direct("example-user", &message_text, 0))
        .await?;
    println!("Response:\n{}", response.text);

    Ok(())
}
