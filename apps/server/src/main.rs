use anyhow::Context;
use clap::{Parser, Subcommand};
use courier_backend_runtime::{telemetry, BackendServices};
use courier_chats::MessageDescriptor;
use courier_config::load as load_config;
use courier_gateway::{build_router, GatewayState};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "courier-backend")]
#[command(about = "Courier direct messaging backend (serves HTTP by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// List the rooms an identity belongs to, most recent first
    Rooms {
        /// Member identity
        identity: String,
    },
    /// Print a room's reconstructed timeline
    DumpRoom {
        /// Public room id
        room_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::Rooms { identity } => list_rooms(&identity).await,
        Commands::DumpRoom { room_id } => dump_room(&room_id).await,
    }
}

async fn initialise() -> anyhow::Result<(courier_config::AppConfig, BackendServices)> {
    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;
    Ok((config, services))
}

async fn run_server() -> anyhow::Result<()> {
    info!("starting Courier backend");

    let (config, services) = initialise().await?;

    let state = GatewayState::new(
        services.chats.clone(),
        services.blobs.clone(),
        services.max_upload_bytes,
    );
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(courier_backend_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn list_rooms(identity: &str) -> anyhow::Result<()> {
    let (_, services) = initialise().await?;

    let rooms = services
        .chats
        .list_rooms(identity)
        .await
        .with_context(|| format!("failed to list rooms for {identity}"))?;

    if rooms.is_empty() {
        println!("{identity} is not in any room");
        return Ok(());
    }

    println!("Found {} rooms for {identity}:", rooms.len());
    println!(
        "{:<26} {:<24} {:<40} {:<28}",
        "Room ID", "Other member", "Last message", "Updated at"
    );
    println!("{}", "-".repeat(120));

    for room in rooms {
        let last = room
            .last_message
            .map(|last| format!("{}: {}", last.sender_identity, truncate(&last.text, 32)))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<26} {:<24} {:<40} {:<28}",
            room.room_id,
            truncate(&room.other_member.identity, 24),
            last,
            room.updated_at.to_rfc3339()
        );
    }

    Ok(())
}

async fn dump_room(room_id: &str) -> anyhow::Result<()> {
    let (_, services) = initialise().await?;

    let messages = services
        .chats
        .list_messages(room_id)
        .await
        .with_context(|| format!("failed to read room {room_id}"))?;

    println!("=== ROOM {room_id} ({} messages) ===", messages.len());
    println!(
        "{:<6} {:<28} {:<20} {:<6} {:<50} {:<8}",
        "Seq", "Timestamp", "Sender", "Kind", "Content", "Hidden"
    );
    println!("{}", "-".repeat(122));

    for message in &messages {
        println!(
            "{:<6} {:<28} {:<20} {:<6} {:<50} {:<8}",
            message.seq,
            message.timestamp.to_rfc3339(),
            truncate(&message.sender_identity, 20),
            message.variant.as_str(),
            truncate(&content_of(message), 50),
            hidden_marker(message)
        );
    }

    Ok(())
}

fn content_of(message: &MessageDescriptor) -> String {
    match (&message.text, &message.file_ref) {
        (Some(text), _) => text.clone(),
        (None, Some(file)) => format!("[{}] {}", file.media_kind.as_str(), file.name),
        (None, None) => String::new(),
    }
}

fn hidden_marker(message: &MessageDescriptor) -> &'static str {
    match (message.hidden_for_everyone, message.hidden_for_sender) {
        (true, _) => "all",
        (false, true) => "sender",
        (false, false) => "",
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
