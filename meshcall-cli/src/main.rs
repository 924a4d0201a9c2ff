mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use meshcall_client::{
    MeetingSession, SessionConfig, SessionHandle, SessionNotice, SyntheticMediaDevices,
    TransportConfig, WebRtcTransportFactory,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::render::ViewPrinter;

#[derive(Parser)]
#[command(name = "meshcall")]
#[command(about = "Headless participant for full-mesh meetings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a room and stay until /leave or end of input
    Join {
        /// JSON session settings; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        relay: Option<String>,

        #[arg(short, long)]
        room: Option<String>,

        #[arg(short, long)]
        name: Option<String>,

        /// Do not connect to the gesture recognizers
        #[arg(long)]
        no_gestures: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Join {
            config,
            relay,
            room,
            name,
            no_gestures,
        } => {
            let mut settings = match config {
                Some(path) => SessionConfig::from_file(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => SessionConfig::default(),
            };
            if let Some(relay) = relay {
                settings.relay_url = relay;
            }
            if let Some(room) = room {
                settings.room = room;
            }
            match name {
                Some(name) => settings.display_name = name,
                None if settings.display_name.trim().is_empty() => {
                    settings.display_name = prompt_name().await?;
                }
                None => {}
            }
            if no_gestures {
                settings.gestures.clear();
            }

            run_join(settings).await?;
        }
    }

    Ok(())
}

async fn prompt_name() -> Result<String> {
    tokio::task::spawn_blocking(|| {
        dialoguer::Input::<String>::new()
            .with_prompt("Your name")
            .allow_empty(true)
            .interact_text()
    })
    .await
    .context("Name prompt panicked")?
    .context("Failed to read name")
}

async fn run_join(settings: SessionConfig) -> Result<()> {
    println!(
        "{}",
        format!("📡 Joining room '{}' via {}...", settings.room, settings.relay_url)
            .cyan()
            .bold()
    );

    let factory = WebRtcTransportFactory::new(TransportConfig::new(settings.ice_servers.clone()));
    let (handle, mut notices) = MeetingSession::join(
        &settings,
        Arc::new(SyntheticMediaDevices::new()),
        Arc::new(factory),
    )
    .await
    .context("Failed to join the meeting")?;

    println!(
        "{}",
        format!("✅ Joined as {}", handle.local_id()).green().bold()
    );
    println!(
        "   Type to chat. Commands: /video /audio /screen /caption <text> /leave"
    );

    let mut view = handle.view();
    let mut printer = ViewPrinter::default();
    printer.print(&view.borrow_and_update());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    debug!("End of input");
                    break;
                };
                if !handle_line(&handle, line.trim()).await {
                    break;
                }
            }

            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let unseen = printer.print(&view.borrow_and_update());
                // Printed messages count as read
                if unseen > 0 {
                    let _ = handle.mark_chat_seen().await;
                }
            }

            notice = notices.recv() => match notice {
                Some(SessionNotice::Left(reason)) => {
                    println!("{}", format!("👋 Meeting ended: {reason:?}").yellow());
                    return Ok(());
                }
                Some(notice) => render::print_notice(&notice),
                None => break,
            },
        }
    }

    if handle.leave().await.is_ok() {
        info!("Left the meeting");
    }
    println!("{}", "👋 Left the meeting".yellow());
    Ok(())
}

/// Returns false once the user asked to leave.
async fn handle_line(handle: &SessionHandle, line: &str) -> bool {
    let sent = match line {
        "" => return true,
        "/leave" => return false,
        "/video" => handle.toggle_video().await,
        "/audio" => handle.toggle_audio().await,
        "/screen" => handle.toggle_screen_share().await,
        _ => match line.strip_prefix("/caption") {
            Some(caption) => handle.moment_captured(caption.trim()).await,
            None => handle.send_chat(line).await,
        },
    };
    sent.is_ok()
}
