//! # Data Store Binary
//!
//! ```bash
//! postline-store --port 6011
//! ```

use clap::Parser;
use postline::common::logging::init_logger;
use postline::store::Store;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on for data-store requests.
    #[arg(long, default_value_t = 6011)]
    port: u16,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);

    let addr = format!("0.0.0.0:{}", args.port);
    let store = Store::new();
    store.run(&addr).await
}
