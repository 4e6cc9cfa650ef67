//! # App Server Coordinator
//!
//! Wires the five concurrent loops from spec §4.3 around the request loop:
//! heartbeat, membership refresh, election + clock broadcast, clock-sync
//! subscription, and drift simulation. Mirrors the teacher's "spawn one
//! task per responsibility, `tokio::select!` on all of them" shape — if
//! any loop exits (which should only happen on an unrecoverable transport
//! error), the process logs it and the whole server goes down with it,
//! since a server missing one of its loops is no longer a correct
//! participant in the cluster.

use crate::common::config::ServerConfig;
use crate::common::framing::{read_frame, read_string, write_json, write_string};
use crate::common::messages::{
    codes, now_seconds, ClientRequest, ControlRequest, LeaderReply, ServerIdReply, ServersReply,
};
use crate::server::handlers::{self, ServerContext};
use crate::server::rpc;
use anyhow::Result;
use log::{debug, error, info, warn};
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};

pub struct Coordinator {
    server_id: u32,
    config: ServerConfig,
    ctx: ServerContext,
    local_clock: Arc<Mutex<f64>>,
    active_servers: Arc<RwLock<Vec<u32>>>,
}

impl Coordinator {
    /// Registers with the broker's control channel to obtain a server id,
    /// then builds a coordinator ready to run the full loop set.
    pub async fn register(config: ServerConfig) -> Result<Self> {
        let rpc_timeout = Duration::from_secs(config.rpc_timeout_secs);
        let reply: ServerIdReply = rpc::call(
            &config.broker_control_addr,
            &ControlRequest::GetServerId,
            rpc_timeout,
        )
        .await?;

        info!("registered with broker as server {}", reply.server_id);

        let ctx = ServerContext {
            store_addr: config.store_addr.clone(),
            control_addr: config.broker_control_addr.clone(),
            rpc_timeout,
        };

        Ok(Self {
            server_id: reply.server_id,
            config,
            ctx,
            local_clock: Arc::new(Mutex::new(now_seconds())),
            active_servers: Arc::new(RwLock::new(vec![reply.server_id])),
        })
    }

    pub fn server_id(&self) -> u32 {
        self.server_id
    }

    pub async fn run(&self) {
        tokio::select! {
            _ = self.request_loop() => error!("request loop terminated"),
            _ = self.heartbeat_loop() => error!("heartbeat loop terminated"),
            _ = self.membership_loop() => error!("membership loop terminated"),
            _ = self.election_loop() => error!("election loop terminated"),
            _ = self.clock_sync_loop() => error!("clock-sync subscriber terminated"),
            _ = self.drift_loop() => error!("drift loop terminated"),
        }
    }

    /// Dials the broker's backend once and serves forwarded client
    /// requests one at a time for as long as the connection lives;
    /// reconnects after a short backoff if it drops.
    async fn request_loop(&self) {
        loop {
            match TcpStream::connect(&self.config.broker_backend_addr).await {
                Ok(stream) => {
                    info!("attached to broker backend as a worker");
                    if let Err(e) = self.serve_backend(stream).await {
                        warn!("backend connection ended: {e:#}");
                    }
                }
                Err(e) => warn!("failed to connect to broker backend: {e:#}"),
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn serve_backend(&self, mut stream: TcpStream) -> Result<()> {
        loop {
            let body = match read_frame(&mut stream).await? {
                Some(b) => b,
                None => return Ok(()),
            };
            let reply = match serde_json::from_slice::<ClientRequest>(&body) {
                Ok(request) => handlers::handle(request, &self.ctx).await,
                Err(e) => {
                    warn!("unrecognized action on backend channel: {e:#}");
                    json!({ "ret": codes::ERROR_UNKNOWN_ACTION, "msg": "Ação desconhecida" })
                }
            };
            write_json(&mut stream, &reply).await?;
        }
    }

    async fn heartbeat_loop(&self) {
        let interval = Duration::from_secs(self.config.heartbeat_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            if let Err(e) = self.send_heartbeat().await {
                warn!("failed to send heartbeat: {e:#}");
            }
        }
    }

    async fn send_heartbeat(&self) -> Result<()> {
        let mut stream = TcpStream::connect(&self.config.broker_heartbeat_addr).await?;
        write_string(&mut stream, &format!("HEARTBEAT {}", self.server_id)).await
    }

    async fn membership_loop(&self) {
        let interval = Duration::from_secs(self.config.membership_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            let result: Result<ServersReply> = rpc::call(
                &self.config.broker_control_addr,
                &ControlRequest::ListServers,
                self.ctx.rpc_timeout,
            )
            .await;
            match result {
                Ok(reply) => {
                    debug!("membership refreshed: {:?}", reply.servers);
                    *self.active_servers.write().await = reply.servers;
                }
                Err(e) => warn!("membership refresh failed: {e:#}"),
            }
        }
    }

    async fn election_loop(&self) {
        let interval = Duration::from_secs(self.config.election_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            let result: Result<LeaderReply> = rpc::call(
                &self.config.broker_control_addr,
                &ControlRequest::WhoIsLeader,
                self.ctx.rpc_timeout,
            )
            .await;

            match result {
                Ok(reply) if reply.leader_id == Some(self.server_id) => {
                    info!("elected leader, broadcasting clock sync");
                    let timestamp = now_seconds();
                    let sync: Result<serde_json::Value> = rpc::call(
                        &self.config.broker_control_addr,
                        &ControlRequest::SyncClock { timestamp },
                        self.ctx.rpc_timeout,
                    )
                    .await;
                    if let Err(e) = sync {
                        warn!("failed to broadcast clock sync: {e:#}");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("leader probe failed: {e:#}"),
            }
        }
    }

    /// Subscribes to the `clock_sync` topic and adopts whatever timestamp
    /// the current leader last broadcast. Two servers can briefly both
    /// believe themselves leader during membership churn; duplicate
    /// broadcasts are idempotent here since this just overwrites the clock.
    async fn clock_sync_loop(&self) {
        loop {
            match TcpStream::connect(&self.config.broker_notify_addr).await {
                Ok(mut stream) => {
                    if write_string(&mut stream, "clock_sync").await.is_err() {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                    loop {
                        match read_string(&mut stream).await {
                            Ok(Some(line)) => {
                                if let Some(ts) = line.strip_prefix("clock_sync ") {
                                    if let Ok(ts) = ts.trim().parse::<f64>() {
                                        *self.local_clock.lock().await = ts;
                                        debug!("adopted clock sync: {ts}");
                                    }
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                warn!("clock-sync subscription error: {e:#}");
                                break;
                            }
                        }
                    }
                }
                Err(e) => warn!("failed to connect to notify bus: {e:#}"),
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn drift_loop(&self) {
        let interval = Duration::from_secs(self.config.drift_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            let delta: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
            let mut clock = self.local_clock.lock().await;
            *clock += delta;
            debug!("drift applied: {delta:+.3}s, local_clock={:.3}", *clock);
        }
    }
}
