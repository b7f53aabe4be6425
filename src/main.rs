//! Gemini Chat - streaming LLM chat in the terminal
//!
//! A single conversation driven by a pure state machine, rendered with
//! ratatui while replies stream in chunk by chunk.

mod config;
mod llm;
mod runtime;
mod state_machine;
mod ui;

use config::AppConfig;
use runtime::{ProductionRuntime, ServiceLlmClient};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration errors are reported before the terminal is taken over
    let config = AppConfig::from_env()?;

    init_logging(&config.log_path)?;
    tracing::info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        log_path = %config.log_path.display(),
        "Starting gemini-chat"
    );

    let service = llm::create_service(&config.llm)?;
    let client = ServiceLlmClient::new(service, config.llm.max_output_tokens);
    let mut runtime = ProductionRuntime::new(client);
    let title = format!("{}: {}", config.llm.provider, runtime.model_id());

    ui::run(&mut runtime, &title).await?;

    tracing::info!("Exited cleanly");
    Ok(())
}

/// Structured JSON logs go to a file; the terminal belongs to the UI
fn init_logging(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}
