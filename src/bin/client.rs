//! # Client Binary
//!
//! ```bash
//! postline-client --config config/client.toml
//! ```
//!
//! Signs up, retrying on a taken username, subscribes to its own
//! notification topic, and drives the 7-option interactive menu.

use clap::Parser;
use postline::client::{menu, Session};
use postline::common::config::{load_config, ClientConfig};
use postline::common::logging::{init_logger, init_logger_with_file};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to this client's TOML configuration file. When omitted, the
    /// client connects to the default broker ports from spec §6.
    #[arg(short, long)]
    config: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also mirror logs to this file (the original opens one named after
    /// the signed-up username; here it must be chosen up front).
    #[arg(long)]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    match &args.log_file {
        Some(path) => init_logger_with_file(&args.log_level, path),
        None => init_logger(&args.log_level),
    }

    let config: ClientConfig = match args.config {
        Some(path) => load_config(&path)?,
        None => ClientConfig::default(),
    };

    let session = Session::sign_up(
        &config.broker_frontend_addr,
        &config.broker_notify_addr,
        Duration::from_secs(config.rpc_timeout_secs),
    )
    .await?;

    menu::run(session).await
}
