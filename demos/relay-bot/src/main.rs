//! Minimal runnable bridge: load a JSON config, run until ctrl-c.
//!
//! ```sh
//! relay-bot config.json
//! ```
//!
//! Example config:
//!
//! ```json
//! {
//!   "server_endpoint": "wss://game.example:5334/ws",
//!   "agent_endpoint": "ws://127.0.0.1:8089/",
//!   "lobby_username": "watcher",
//!   "lobby_password": "secret",
//!   "bots": [
//!     {"name": "bot-a", "username": "bot-a", "password": "secret"}
//!   ]
//! }
//! ```

use std::time::Duration;

use tilebridge::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: relay-bot <config.json>")?;
    let config: BridgeConfig =
        serde_json::from_str(&std::fs::read_to_string(&path)?)?;

    let service = BridgeService::start(config).await;

    let mut ticker = tokio::time::interval(Duration::from_secs(30));
    ticker.tick().await; // the first tick fires immediately
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                for (name, status) in service.statuses().await {
                    tracing::info!(bot = %name, ?status, "bot status");
                }
                let registry = service.registry().read().await;
                let stats = registry.stats();
                tracing::info!(
                    rooms = registry.len(),
                    idle = stats.idle,
                    waiting = stats.waiting,
                    playing = stats.playing,
                    "lobby"
                );
            }
        }
    }

    tracing::info!("shutting down");
    service.shutdown().await;
    Ok(())
}
