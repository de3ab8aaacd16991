use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use merlion_server::connection::{ws_handler, Registry};
use merlion_server::room::RoomConfig;

#[derive(Parser)]
#[command(name = "merlion-server", version, about = "Singapore mahjong room server")]
struct Args {
    #[arg(long, env = "MERLION_BIND", default_value = "127.0.0.1:9000")]
    bind: SocketAddr,
    /// Delay before a bot seat acts, keeping pacing readable.
    #[arg(long, default_value_t = 800)]
    bot_delay_ms: u64,
    /// How long humans get to respond to a claim window.
    #[arg(long, default_value_t = 15_000)]
    claim_timeout_ms: u64,
    /// How long a disconnected seat waits before going bot-owned.
    #[arg(long, default_value_t = 60_000)]
    disconnect_grace_ms: u64,
    #[arg(long, default_value_t = 1)]
    min_tai: u32,
    /// Deterministic session seed for every room; omit for entropy.
    #[arg(long, env = "MERLION_SEED")]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let cfg = RoomConfig {
        bot_delay: Duration::from_millis(args.bot_delay_ms),
        claim_timeout: Duration::from_millis(args.claim_timeout_ms),
        disconnect_grace: Duration::from_millis(args.disconnect_grace_ms),
        min_tai: args.min_tai,
        preset_walls: Vec::new(),
    };
    let registry = Registry::new(cfg, args.seed);

    let app = Router::new()
        .route("/ws/{room}", get(ws_handler))
        .with_state(registry);

    tracing::info!("listening on ws://{}/ws/<room>", args.bind);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
