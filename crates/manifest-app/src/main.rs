//! Manifest binary - composition root.
//!
//! `manifest serve` loads the configuration and the dataset, binds the
//! OpenAI-backed agent to it and starts the query service.
//! `manifest chat` runs the interactive terminal client against it.

mod cli;

use std::io;
use std::sync::Arc;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use manifest_agent::OpenAiAgent;
use manifest_api::{start_server, AppState};
use manifest_client::{ChatSession, QueryClient, Render, TerminalRenderer};
use manifest_core::{Dataset, ManifestConfig};

use cli::{parse_input, CliArgs, Command, Input};

const HEADER: &str = "Titanic Chatbot\nAsk me anything related to the Titanic dataset! \
                      (type 'exit' or press Ctrl-D to quit, Ctrl-C to redraw)";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    // Config is read before tracing starts so its log level can apply.
    let config_file = args.resolve_config_path();
    let loaded = ManifestConfig::load(&config_file);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("Starting Manifest v{}", env!("CARGO_PKG_VERSION"));
    match &loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Configuration not loaded, using defaults"
        ),
    }

    match args.command {
        Command::Serve { .. } => serve(&args, config).await,
        Command::Chat { .. } => chat(&args, &config).await,
    }
}

/// Load the dataset, build the agent and run the query service.
async fn serve(args: &CliArgs, mut config: ManifestConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.server.port = args.resolve_port(config.server.port);
    let dataset_path = args.resolve_dataset(&config.dataset.path);

    let dataset = match Dataset::load(&dataset_path) {
        Ok(ds) => Arc::new(ds),
        Err(e) => {
            tracing::error!(path = %dataset_path.display(), error = %e, "Failed to load dataset");
            return Err(e.into());
        }
    };

    let api_key = match config.agent.api_key() {
        Ok(key) => key,
        Err(e) => {
            tracing::error!(error = %e, "Agent API key unavailable");
            return Err(e.into());
        }
    };

    let agent = OpenAiAgent::new(&config.agent, &api_key, Arc::clone(&dataset))?;
    let state = AppState::new(dataset, Arc::new(agent));

    start_server(&config.server, state).await?;
    Ok(())
}

/// Interactive prompt loop over a single chat session.
async fn chat(args: &CliArgs, config: &ManifestConfig) -> Result<(), Box<dyn std::error::Error>> {
    let url = args.resolve_url(&config.client.server_url);
    let client = QueryClient::new(url, config.client.timeout())?;
    let mut session = ChatSession::new(client);
    let mut renderer = TerminalRenderer::new(io::stdout(), &config.client.image_dir);
    let mut editor = DefaultEditor::new()?;

    tracing::info!(
        url = %session.client().url(),
        image_dir = %renderer.image_dir().display(),
        "Chat session started"
    );
    println!("{HEADER}\n");

    loop {
        match editor.readline("> ") {
            Ok(line) => match parse_input(&line) {
                Input::Blank => continue,
                Input::Exit => break,
                Input::Question(question) => {
                    if let Err(e) = editor.add_history_entry(question) {
                        tracing::debug!(error = %e, "history entry not recorded");
                    }
                    if let Err(e) = session.ask(question, &mut renderer).await {
                        tracing::error!(error = %e, "failed to display reply");
                    }
                }
            },
            Err(ReadlineError::Interrupted) => {
                editor.clear_screen()?;
                println!("{HEADER}\n");
                if let Err(e) = renderer.render_transcript(session.transcript()) {
                    tracing::error!(error = %e, "failed to redraw transcript");
                }
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(entries = session.transcript().len(), "Chat session ended");
    Ok(())
}
