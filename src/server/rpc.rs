//! # Outbound RPC Helpers
//!
//! Every call this server makes to the data store or the broker's control
//! channel is a new short-lived TCP connection: connect, write one JSON
//! frame, read one JSON frame back, drop the connection. A fresh
//! connection per call avoids needing to correlate replies on a shared
//! socket, at the cost of a connect per request — an acceptable trade for
//! a control-plane call volume this low. Every call is wrapped in a
//! timeout; a timed-out or failed call surfaces as a plain `anyhow::Error`
//! so the handler boundary can turn it into `ret: -1`.

use crate::common::framing::{read_json, write_json};
use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;

pub async fn call<Req, Resp>(addr: &str, request: &Req, timeout: Duration) -> Result<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    tokio::time::timeout(timeout, call_inner(addr, request))
        .await
        .map_err(|_| anyhow!("rpc to {addr} timed out after {timeout:?}"))?
}

async fn call_inner<Req, Resp>(addr: &str, request: &Req) -> Result<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let mut stream = TcpStream::connect(addr).await?;
    write_json(&mut stream, request).await?;
    read_json(&mut stream)
        .await?
        .ok_or_else(|| anyhow!("{addr} closed the connection before replying"))
}
