// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Sky - streaming airline assistant for your terminal
//!
//! Entry point for the Sky CLI. Opens one session against the
//! conversation engine and bridges it to stdin/stdout: fragments print
//! as they stream, `/pause` stops the response mid-flight.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;

use sky::booking::BookingDirectory;
use sky::chat::{ConversationEngine, Outbound, SessionManager, TurnStatus, PAUSE_TOKEN};
use sky::config::Settings;
use sky::error::{Result, SkyError};
use sky::flightdata::FlightDataFacade;
use sky::llm::openai::OpenAiProvider;
use sky::llm::provider::LlmProvider;
use sky::tools::ToolRouter;

#[derive(Parser, Debug)]
#[command(name = "sky", version, about = "Streaming airline assistant")]
struct Cli {
    /// Model to use (overrides settings)
    #[arg(long)]
    model: Option<String>,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` enables engine diagnostics without knowing target names;
    // RUST_LOG still takes precedence.
    if cli.verbose > 0 {
        for directive in ["sky=debug"] {
            if let Ok(parsed) = directive.parse() {
                env_filter = env_filter.add_directive(parsed);
            }
        }
    }

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = Settings::load()?;
    let model = cli
        .model
        .unwrap_or_else(|| settings.provider.model.clone());

    let api_key = settings.provider_api_key()?;
    let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::with_base_url(
        api_key,
        settings.provider.base_url.clone(),
    ));

    let flights = Arc::new(FlightDataFacade::new(
        settings.flight_data_api_key(),
        &settings.flight_data,
    ));
    let bookings = Arc::new(BookingDirectory::new());
    let tools = Arc::new(ToolRouter::new(flights, bookings));

    let engine = Arc::new(ConversationEngine::new(
        provider,
        tools,
        model,
        settings.engine.clone(),
    ));
    let manager = Arc::new(SessionManager::new(
        engine,
        settings.conversation.clone(),
    ));

    let (session_id, mut outbound) = manager.open_session().await;
    tracing::info!(session = %session_id, "interactive session started");

    // Print outbound frames as they arrive
    let printer = tokio::spawn(async move {
        while let Some(frame) = outbound.next().await {
            match frame {
                Outbound::Fragment { text } => {
                    print!("{}", text);
                    let _ = std::io::stdout().flush();
                }
                Outbound::Terminal { status, detail } => {
                    match status {
                        TurnStatus::Completed => println!(),
                        TurnStatus::Cancelled => {
                            println!("\n[{}]", detail.unwrap_or_else(|| "paused".to_string()))
                        }
                        TurnStatus::Failed => {
                            println!("\n[{}]", detail.unwrap_or_else(|| "error".to_string()))
                        }
                    }
                    print!("> ");
                    let _ = std::io::stdout().flush();
                }
            }
        }
    });

    println!("Sky is ready. Type a question, /pause to stop a response, /quit to exit.");
    print!("> ");
    std::io::stdout().flush()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            print!("> ");
            std::io::stdout().flush()?;
            continue;
        }

        let message = match input {
            "/quit" | "/exit" => break,
            "/pause" => PAUSE_TOKEN,
            other => other,
        };

        match manager.handle_message(session_id, message).await {
            Ok(_) => {}
            Err(SkyError::SessionBusy(_)) => {
                println!("(still answering; /pause to stop it first)");
                print!("> ");
                std::io::stdout().flush()?;
            }
            Err(e) => return Err(e),
        }
    }

    manager.close_session(session_id).await;
    printer.abort();
    println!("Goodbye!");
    Ok(())
}
