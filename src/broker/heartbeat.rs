//! # Heartbeat Ingress and Liveness Sweep
//!
//! Heartbeat connections push `"HEARTBEAT <id>"` lines; an unbounded
//! channel decouples ingestion from the sweep so a burst of pings never
//! blocks behind the 1 Hz eviction scan, and the scan never blocks waiting
//! for a ping that isn't coming.

use crate::broker::state::ClusterState;
use crate::common::framing::read_string;
use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub async fn run_ingress(addr: &str, tx: mpsc::UnboundedSender<u32>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("heartbeat ingress listening on {addr}");

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match read_string(&mut socket).await {
                    Ok(Some(line)) => {
                        if let Some(id) = parse_heartbeat(&line) {
                            let _ = tx.send(id);
                        } else {
                            warn!("malformed heartbeat from {peer}: {line:?}");
                        }
                    }
                    Ok(None) => {
                        debug!("heartbeat connection from {peer} closed");
                        return;
                    }
                    Err(e) => {
                        warn!("heartbeat read error from {peer}: {e:#}");
                        return;
                    }
                }
            }
        });
    }
}

fn parse_heartbeat(line: &str) -> Option<u32> {
    let id_str = line.strip_prefix("HEARTBEAT ")?;
    id_str.trim().parse().ok()
}

/// Drains pending heartbeats non-blockingly, then evicts stale entries.
/// Runs at `sweep_interval`, forever.
pub async fn run_sweep(
    state: Arc<ClusterState>,
    mut rx: mpsc::UnboundedReceiver<u32>,
    timeout: Duration,
    sweep_interval: Duration,
) {
    let mut ticker = tokio::time::interval(sweep_interval);
    loop {
        ticker.tick().await;

        while let Ok(id) = rx.try_recv() {
            state.record_heartbeat(id);
        }

        let evicted = state.sweep(timeout);
        for id in evicted {
            info!("evicted server {id} after missed heartbeats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_heartbeat() {
        assert_eq!(parse_heartbeat("HEARTBEAT 7"), Some(7));
    }

    #[test]
    fn rejects_malformed_heartbeat() {
        assert_eq!(parse_heartbeat("nonsense"), None);
        assert_eq!(parse_heartbeat("HEARTBEAT abc"), None);
    }
}
