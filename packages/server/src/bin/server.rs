//! Broadcast relay server for the kodou live heartbeat display.
//!
//! Fans every typed event out to all connected viewers; stores danmaku so
//! late joiners can rehydrate.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kodou-server
//! cargo run --bin kodou-server -- --host 0.0.0.0 --port 2026
//! ```

use clap::Parser;

use kodou_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kodou-server")]
#[command(about = "Broadcast relay for the kodou live heartbeat display", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "2026")]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_PKG_NAME"), "debug");

    let args = Args::parse();

    if let Err(e) = kodou_server::run_server(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
