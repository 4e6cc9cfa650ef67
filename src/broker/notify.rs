//! # Notification Bus
//!
//! A single [`broadcast`] channel carries every publication (`"<topic>
//! <payload>"`) to every connected subscriber. `tokio::sync::broadcast` has
//! no server-side prefix filter the way a ZeroMQ `SUB` socket does, so each
//! subscriber connection filters client-side by a topic it sends as its
//! first frame — semantically equivalent pub/sub: at-most-once, lossy under
//! backpressure (a lagging subscriber observes [`broadcast::error::RecvError::Lagged`]
//! and simply misses the gap), and a publish never blocks on a slow reader.

use crate::common::framing::{read_string, write_string};
use anyhow::Result;
use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct NotifyBus {
    tx: broadcast::Sender<String>,
}

impl NotifyBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish `"<topic> <payload>"`. Returns silently if there are no
    /// subscribers; a publish is never an error.
    pub fn publish(&self, topic: &str, payload: &str) {
        let line = format!("{topic} {payload}");
        let _ = self.tx.send(line);
    }

    pub async fn run(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("notification bus listening on {addr}");

        loop {
            let (socket, peer) = listener.accept().await?;
            debug!("notify subscriber connected from {peer}");
            let rx = self.tx.subscribe();
            tokio::spawn(async move {
                if let Err(e) = serve_subscriber(socket, rx).await {
                    debug!("notify subscriber {peer} disconnected: {e:#}");
                }
            });
        }
    }
}

impl Default for NotifyBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn serve_subscriber(mut socket: TcpStream, mut rx: broadcast::Receiver<String>) -> Result<()> {
    let topic_prefix = match read_string(&mut socket).await? {
        Some(t) => t,
        None => return Ok(()),
    };

    loop {
        match rx.recv().await {
            Ok(line) => {
                if line.starts_with(&topic_prefix) {
                    write_string(&mut socket, &line).await?;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("notify subscriber lagged, skipped {skipped} messages");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}
