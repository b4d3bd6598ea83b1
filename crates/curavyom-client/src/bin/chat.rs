//! Terminal chat with Agent Core.
//!
//! Run with: cargo run -p curavyom-client --bin curavyom-chat
//!
//! Each line is submitted as a question. Commands:
//!   /upload <path>      upload a document for analysis
//!   /subscribe <email>  join the newsletter
//!   /quit               close the session and exit

use clap::Parser;
use curavyom_client::{
    ApiClient, ChatSession, FormTracker, SessionEvent, SessionHooks, SubmitOutcome, UploadFile,
};
use curavyom_common::entities::Sender;
use curavyom_config::CuravyomConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "curavyom-chat", version, about = "Chat with the CuraVyom Agent Core")]
struct Cli {
    /// Config file (TOML or YAML)
    #[arg(short, long, env = "CURAVYOM_CONFIG")]
    config: Option<PathBuf>,

    /// Override the HTTP API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Override the streaming base URL
    #[arg(long)]
    ws_url: Option<String>,
}

fn load_config(cli: &Cli) -> anyhow::Result<CuravyomConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = CuravyomConfig::from_path(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config
        }
        None => CuravyomConfig::load()?,
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(url) = &cli.ws_url {
        config.stream.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::MessageAppended { message } if message.sender != Sender::User || message.is_upload => {
            let who = message.agent.as_deref().unwrap_or(match message.sender {
                Sender::System => "System",
                _ => "You",
            });
            println!("[{}] {}: {}", message.timestamp, who, message.text);
        }
        SessionEvent::MessageUpdated { message } => {
            println!("[{}] {}", message.timestamp, message.text);
        }
        SessionEvent::Status { status } => println!("  · {status}"),
        _ => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("curavyom=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let endpoints = config.endpoints();
    info!(chat = %endpoints.chat, api = %config.api.base_url, "💬 CuraVyom chat starting");

    let hooks = SessionHooks::default().on_agent_update(|agents| {
        for (agent, status) in agents.iter() {
            tracing::debug!(agent, status = status.label(), "agent activity");
        }
    });
    let session = Arc::new(ChatSession::from_config(&config, hooks).mount());

    let mut events = session.subscribe();
    for message in &session.snapshot().messages {
        println!("[{}] System: {}", message.timestamp, message.text);
    }
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(&event);
        }
    });

    let api = ApiClient::new(endpoints);
    let newsletter = FormTracker::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line == "/quit" {
            break;
        } else if let Some(path) = line.strip_prefix("/upload ") {
            match UploadFile::from_path(path.trim()).await {
                Ok(file) => {
                    let session = session.clone();
                    tokio::spawn(async move {
                        if let Err(e) = session.upload(file).await {
                            warn!(error = %e, "upload not started");
                        }
                    });
                }
                Err(e) => warn!(path, error = %e, "could not read file"),
            }
        } else if let Some(email) = line.strip_prefix("/subscribe ") {
            let email = email.trim();
            if email.is_empty() {
                continue;
            }
            if let Some(status) = newsletter.submit("subscribe", || api.subscribe(email)).await {
                println!("  · subscribe: {status:?}");
            }
        } else if session.submit(line)? == SubmitOutcome::Rejected {
            warn!("not connected, message not sent");
        }
    }

    session.close().await;
    printer.abort();
    info!("👋 Session closed");
    Ok(())
}
