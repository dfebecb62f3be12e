//! Headless viewer client for the kodou live heartbeat display.
//!
//! Connects to the relay, applies broadcasts to the local state machines,
//! and prints what happens. Plain input sends danmaku; slash commands
//! switch modes, list, and delete.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kodou-client -- --name Ann
//! cargo run --bin kodou-client -- --url ws://127.0.0.1:2026/ws --name Bob
//! ```

use clap::Parser;

use kodou_client::{ClientOptions, run_client};
use kodou_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kodou-client")]
#[command(about = "Viewer client for the kodou live heartbeat display", long_about = None)]
struct Args {
    /// WebSocket URL of the relay server
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:2026/ws")]
    url: String,

    /// Display name for registration and chat
    #[arg(short = 'n', long)]
    name: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_PKG_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run_client(ClientOptions {
        url: args.url,
        name: args.name,
    })
    .await
    {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
