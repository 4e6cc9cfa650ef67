//! # App Server Binary
//!
//! ```bash
//! postline-server --config config/server.toml
//! ```
//!
//! Registers with the broker to obtain a server id, then runs the request
//! loop plus the five control-plane loops (heartbeat, membership, election,
//! clock-sync subscription, drift) until the process is killed.

use clap::Parser;
use postline::common::config::load_config;
use postline::common::logging::init_logger;
use postline::server::Server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to this server's TOML configuration file.
    #[arg(short, long)]
    config: String,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);

    let config = load_config(&args.config)?;
    let server = Server::start(config).await?;
    server.run().await;
    Ok(())
}
