//! Chat relay server binary.
//!
//! ```text
//! chat-relay --port 3000 --debug
//! RUST_LOG=chat_relay=trace chat-relay
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_relay::config::{
    DEFAULT_BIND_IP, DEFAULT_CHAT_PATH, DEFAULT_PORT, DEFAULT_PRESENCE_PATH, DEFAULT_USERS_PATH,
};
use chat_relay::{ChatServer, InMemoryUserStore, MessageRouter, Result, ServerConfig, endpoints};

// ============================================================================
// Args
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "chat-relay")]
#[command(version)]
#[command(about = "In-memory WebSocket chat relay with rooms and presence", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "CHAT_RELAY_HOST", default_value_t = DEFAULT_BIND_IP)]
    host: IpAddr,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, env = "CHAT_RELAY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Upgrade path of the chat endpoint
    #[arg(long, env = "CHAT_RELAY_CHAT_PATH", default_value = DEFAULT_CHAT_PATH)]
    chat_path: String,

    /// Upgrade path of the presence endpoint
    #[arg(long, env = "CHAT_RELAY_PRESENCE_PATH", default_value = DEFAULT_PRESENCE_PATH)]
    presence_path: String,

    /// Upgrade path of the user-records endpoint
    #[arg(long, env = "CHAT_RELAY_USERS_PATH", default_value = DEFAULT_USERS_PATH)]
    users_path: String,

    /// Enable debug logging
    #[arg(long, env = "CHAT_RELAY_DEBUG")]
    debug: bool,
}

impl Args {
    fn config(&self) -> Result<ServerConfig> {
        ServerConfig::builder()
            .bind_ip(self.host)
            .port(self.port)
            .chat_path(&self.chat_path)
            .presence_path(&self.presence_path)
            .users_path(&self.users_path)
            .build()
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing. `RUST_LOG` wins over `--debug` when set.
fn init_logging(debug: bool) {
    let filter = if debug {
        "chat_relay=debug"
    } else {
        "chat_relay=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = args.config()?;
    let router = Arc::new(MessageRouter::new());
    let store = Arc::new(InMemoryUserStore::new());
    let dispatcher = endpoints::mount(&config, router, store);

    let server = ChatServer::start(&config, dispatcher).await?;
    info!(
        chat = %server.ws_url(config.chat_path()),
        presence = %server.ws_url(config.presence_path()),
        users = %server.ws_url(config.users_path()),
        "Listening"
    );

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;

    Ok(())
}
