//! Shared test harness: picks free loopback ports and spawns real
//! components as background tasks for in-process TCP loopback testing.

use postline::common::config::{BrokerConfig, ServerConfig};
use postline::server::coordinator::Coordinator;
use postline::store::Store;
use serde_json::Value;
use std::net::TcpListener as StdTcpListener;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub fn free_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn fast_broker_config() -> BrokerConfig {
    BrokerConfig {
        frontend_addr: format!("127.0.0.1:{}", free_port()),
        backend_addr: format!("127.0.0.1:{}", free_port()),
        control_addr: format!("127.0.0.1:{}", free_port()),
        notify_addr: format!("127.0.0.1:{}", free_port()),
        heartbeat_addr: format!("127.0.0.1:{}", free_port()),
        heartbeat_timeout_secs: 1,
        sweep_interval_secs: 1,
    }
}

pub async fn spawn_store() -> String {
    let addr = format!("127.0.0.1:{}", free_port());
    let bound = addr.clone();
    tokio::spawn(async move {
        let store = Store::new();
        let _ = store.run(&bound).await;
    });
    wait_for_listener(&addr).await;
    addr
}

pub async fn spawn_broker(config: BrokerConfig) -> BrokerConfig {
    let broker = postline::broker::Broker::new(config.clone());
    tokio::spawn(async move {
        broker.run().await;
    });
    wait_for_listener(&config.frontend_addr).await;
    wait_for_listener(&config.control_addr).await;
    wait_for_listener(&config.heartbeat_addr).await;
    wait_for_listener(&config.notify_addr).await;
    config
}

/// Registers and runs a full app server, returning its assigned server id.
pub async fn spawn_server(config: ServerConfig) -> u32 {
    let coordinator = Coordinator::register(config).await.expect("registration");
    let id = coordinator.server_id();
    tokio::spawn(async move {
        coordinator.run().await;
    });
    id
}

/// Builds a [`ServerConfig`] pointed at `broker`/`store` with generous
/// default cadences, registers it, and waits for it to attach to the
/// broker's backend so callers can immediately forward requests through
/// it. Returns its assigned server id.
pub async fn spawn_app_server(broker: &BrokerConfig, store_addr: &str) -> u32 {
    let config = ServerConfig {
        store_addr: store_addr.to_string(),
        broker_backend_addr: broker.backend_addr.clone(),
        broker_control_addr: broker.control_addr.clone(),
        broker_notify_addr: broker.notify_addr.clone(),
        broker_heartbeat_addr: broker.heartbeat_addr.clone(),
        heartbeat_interval_secs: 2,
        membership_interval_secs: 10,
        election_interval_secs: 12,
        drift_interval_secs: 5,
        rpc_timeout_secs: 2,
    };
    let id = spawn_server(config).await;
    // The request loop dials the backend asynchronously after this
    // function returns; give it a moment to attach as a worker before the
    // caller starts forwarding requests through the frontend.
    tokio::time::sleep(Duration::from_millis(150)).await;
    id
}

async fn wait_for_listener(addr: &str) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("nothing ever started listening on {addr}");
}

pub async fn send_frame(stream: &mut TcpStream, value: &Value) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec(value)?;
    stream.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn recv_frame(stream: &mut TcpStream) -> anyhow::Result<Value> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut data = vec![0u8; len];
    stream.read_exact(&mut data).await?;
    Ok(serde_json::from_slice(&data)?)
}

pub async fn send_string(stream: &mut TcpStream, s: &str) -> anyhow::Result<()> {
    let bytes = s.as_bytes();
    stream.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    stream.write_all(bytes).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn recv_string(stream: &mut TcpStream) -> anyhow::Result<String> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut data = vec![0u8; len];
    stream.read_exact(&mut data).await?;
    Ok(String::from_utf8(data)?)
}
