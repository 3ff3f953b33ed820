mod cli;
mod config;
mod session;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tether_common::{ConnectionStatus, Sender, SessionId};
use tether_persist::SessionArchive;
use tether_sync::{SseTransport, SubmitClient};

use crate::config::TetherConfig;
use crate::session::{SessionCoordinator, SyncEvent};

fn main() {
    let args = cli::parse();

    let log_directive = args.log_level.as_deref().unwrap_or("tether=info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "tether=info".parse().unwrap()),
            ),
        )
        .init();

    tracing::info!("Tether v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => config::load_from_path(std::path::Path::new(path)).unwrap_or_else(|e| {
            tracing::warn!("Config load failed, using defaults: {e}");
            TetherConfig::default()
        }),
        None => config::load_config().unwrap_or_else(|e| {
            tracing::warn!("Config load failed, using defaults: {e}");
            TetherConfig::default()
        }),
    };
    if let Some(server) = args.server {
        config.server_url = server;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };
    runtime.block_on(run(config, args.session));
    tracing::info!("Shutdown complete");
}

async fn run(config: TetherConfig, resume: Option<String>) {
    let archive_root = match &config.data_dir {
        Some(dir) => dir.clone(),
        None => match SessionArchive::default_root() {
            Ok(root) => root,
            Err(e) => {
                tracing::error!("No usable data directory: {e}");
                return;
            }
        },
    };
    let archive = SessionArchive::new(archive_root).with_cap(config.session_cap);

    let transport = Arc::new(SseTransport::new(&config.server_url));
    let submit = SubmitClient::new(&config.server_url);

    let mut coordinator =
        SessionCoordinator::new(transport, archive, submit, config.retry_policy());
    if let Some(id) = resume {
        coordinator = coordinator.with_session(SessionId::from_raw(id));
    }

    println!("Session: {}", coordinator.session_id());
    println!("Server:  {}", config.server_url);
    println!("Type a message, or /help for commands.");
    coordinator.start().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = coordinator.poll() => render(&event),
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    // Stdin closed (EOF) or unreadable.
                    Ok(None) | Err(_) => break,
                };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.starts_with('/') {
                    if !handle_command(&mut coordinator, input).await {
                        break;
                    }
                } else if let Err(e) = coordinator.submit_turn(input, Vec::new()).await {
                    eprintln!("! {e}");
                }
            }
        }
    }

    coordinator.shutdown().await;
}

fn render(event: &SyncEvent) {
    match event {
        SyncEvent::Message(message) => {
            let tag = match message.sender {
                Sender::User => "you",
                Sender::Assistant => "assistant",
                Sender::System => "system",
                Sender::Error => "error",
            };
            println!("[{tag}] {}", message.content);
            if let Some(meta) = &message.metadata {
                println!(
                    "       ({} turns, {:.1}s, ${:.4})",
                    meta.num_turns,
                    meta.duration_ms as f64 / 1000.0,
                    meta.total_cost_usd
                );
            }
        }
        SyncEvent::Progress(Some(status)) => println!("  ... {status}"),
        SyncEvent::Progress(None) => {}
        SyncEvent::FilesChanged { total, created } => {
            println!("  (workspace: {total} files)");
            for path in created {
                println!("  + {path}");
            }
        }
        SyncEvent::Status(status) => match status {
            ConnectionStatus::Connected => println!("* connected"),
            ConnectionStatus::Connecting => println!("* connecting..."),
            ConnectionStatus::Disconnected => println!("* disconnected"),
            ConnectionStatus::Error => println!("* connection lost, retrying"),
            ConnectionStatus::Failed => {
                println!("* connection failed; /reconnect to try again")
            }
        },
    }
}

/// Returns false when the loop should exit.
async fn handle_command(coordinator: &mut SessionCoordinator, input: &str) -> bool {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command {
        "/quit" | "/exit" => return false,
        "/help" => print_help(),
        "/sessions" => {
            let sessions = coordinator.sessions();
            if sessions.is_empty() {
                println!("No saved sessions.");
            }
            for meta in sessions {
                println!(
                    "{}  {}  ({} messages, {})",
                    meta.id,
                    meta.title,
                    meta.message_count,
                    meta.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        "/switch" => {
            if rest.is_empty() {
                println!("Usage: /switch <session-id>");
            } else {
                coordinator.switch_to(SessionId::from_raw(rest)).await;
                println!("Session: {}", coordinator.session_id());
            }
        }
        "/new" => {
            let id = coordinator.new_session().await;
            println!("Session: {id}");
        }
        "/delete" => {
            let id = if rest.is_empty() {
                coordinator.session_id().clone()
            } else {
                SessionId::from_raw(rest)
            };
            match coordinator.delete_session(&id).await {
                Ok(()) => println!("Deleted {id}. Session: {}", coordinator.session_id()),
                Err(e) => eprintln!("! failed to delete {id}: {e}"),
            }
        }
        "/reconnect" => coordinator.reconnect().await,
        "/stop" => {
            coordinator.stop_generation();
            println!("Stopped watching the current run; the server keeps going.");
        }
        "/files" => {
            let files = coordinator.workspace().files();
            if files.is_empty() {
                println!("No files reported yet.");
            }
            for file in files {
                println!("{:>8}  {}", file.size, file.path);
            }
        }
        other => println!("Unknown command {other}; /help for the list."),
    }
    true
}

fn print_help() {
    println!(
        "\
/sessions        list saved sessions
/switch <id>     switch to a session
/new             start a fresh session
/delete [id]     delete a session (current one when omitted)
/reconnect       retry the push channel
/stop            stop watching the in-flight run
/files           list workspace files
/quit            save and exit"
    );
}
