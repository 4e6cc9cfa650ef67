//! # Broker Binary
//!
//! ```bash
//! postline-broker --config config/broker.toml
//! ```

use clap::Parser;
use postline::broker::Broker;
use postline::common::config::{load_config, BrokerConfig};
use postline::common::logging::init_logger;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the broker's TOML configuration file. When omitted, the
    /// broker runs with the default ports from spec §6.
    #[arg(short, long)]
    config: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);

    let config: BrokerConfig = match args.config {
        Some(path) => load_config(&path)?,
        None => BrokerConfig::default(),
    };

    let broker = Broker::new(config);
    broker.run().await;
    Ok(())
}
