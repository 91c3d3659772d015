//! `gateway` command-line front end.
//!
//! Configuration comes from the environment (and `.env`), see
//! `OrchestratorConfig::from_env`, `OllamaBrainConfig::from_env` and
//! `GifSearchConfig::from_env`.

use clap::{Parser, Subcommand};
use gif_search::{GifFallbackChain, MediaKind};
use orchestrator::{Orchestrator, StdoutSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gateway")]
#[command(about = "Conversational assistant gateway with local fallbacks")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a message and print the reply. Reads lines from stdin when no message is given;
    /// context lives for the session and `/clear` forgets it.
    Chat {
        /// Conversation owner
        #[arg(long, default_value = "cli")]
        user: String,

        /// Attachment reference (file name, path or URL)
        #[arg(long)]
        attachment: Option<String>,

        message: Vec<String>,
    },
    /// Search reaction GIFs; trending when no query is given
    Gif {
        query: Option<String>,

        #[arg(long, default_value_t = 10)]
        limit: u32,

        /// gifs or stickers
        #[arg(long, default_value = "gifs")]
        kind: String,
    },
    /// Probe the primary model and print its health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Chat {
            user,
            attachment,
            message,
        } => chat(&user, attachment.as_deref(), message).await,
        Command::Gif { query, limit, kind } => {
            let kind = MediaKind::parse(&kind).ok_or_else(|| {
                format!("unknown media kind '{}' (expected gifs or stickers)", kind)
            })?;
            let chain = GifFallbackChain::from_env()?;
            info!("GIF sources: {}", chain.source_names().join(" -> "));
            let results = chain.search(query.as_deref(), limit, kind).await;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Command::Health => {
            let orchestrator = Orchestrator::from_env()?;
            let available = orchestrator.primary_available().await;
            let snapshot = orchestrator.health_snapshot().await;
            let config = orchestrator.primary().config();
            println!("Backend: {} ({})", config.api_url, config.model);
            println!("Available: {}", available);
            if !snapshot.models.is_empty() {
                let models: Vec<&str> = snapshot.models.iter().map(String::as_str).collect();
                println!("Models: {}", models.join(", "));
            }
            if let Some(error) = snapshot.error {
                println!("Error: {}", error);
            }
            Ok(())
        }
    }
}

async fn chat(
    user: &str,
    attachment: Option<&str>,
    message: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = Orchestrator::from_env()?;

    if !message.is_empty() {
        orchestrator
            .deliver(user, &message.join(" "), attachment, &StdoutSink)
            .await?;
        return Ok(());
    }

    // Interactive session; context persists across lines until `/clear`.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                orchestrator.clear_history(user).await;
                println!("(history cleared)");
            }
            text => orchestrator.deliver(user, text, attachment, &StdoutSink).await?,
        }
    }
    Ok(())
}
