//! # Client Session
//!
//! Owns the two sockets spec §4.5 describes: one request/reply connection
//! to the broker frontend (held open for the session's lifetime, giving
//! strict per-client FIFO ordering), and one subscription to the
//! notification bus drained into a local queue for later display.

use crate::common::framing::{read_frame, read_string, write_frame, write_string};
use crate::common::messages::{codes, now_seconds, ClientRequest};
use anyhow::{anyhow, Result};
use log::{error, info, warn};
use serde_json::Value;
use std::collections::VecDeque;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

pub struct Session {
    frontend: Mutex<TcpStream>,
    rpc_timeout: Duration,
    pub username: String,
    pub user_id: u32,
    pub topic: String,
    forced_delay_secs: Mutex<i64>,
    notifications: Arc<Mutex<VecDeque<String>>>,
}

impl Session {
    /// Prompts for a username, retrying on `ERROR_USERNAME_TAKEN`, until
    /// signup succeeds. Then spawns the background task draining the
    /// notification subscription into a local queue.
    pub async fn sign_up(
        frontend_addr: &str,
        notify_addr: &str,
        rpc_timeout: Duration,
    ) -> Result<Self> {
        let mut frontend = TcpStream::connect(frontend_addr).await?;

        let (username, user_id, topic) = loop {
            let candidate = prompt_line("Choose a username: ")?;
            let request = ClientRequest::AddUser {
                username: candidate.clone(),
            };
            let body = serde_json::to_vec(&request)?;
            write_frame(&mut frontend, &body).await?;
            let reply_bytes = tokio::time::timeout(rpc_timeout, read_frame(&mut frontend))
                .await
                .map_err(|_| anyhow!("signup timed out"))??
                .ok_or_else(|| anyhow!("broker closed the connection during signup"))?;
            let reply: Value = serde_json::from_slice(&reply_bytes)?;

            let ret = reply["ret"].as_i64().unwrap_or(codes::ERROR_RUNTIME as i64);
            if ret == codes::SUCCESS as i64 {
                let id = reply["id"].as_u64().unwrap_or(0) as u32;
                let topic = reply["topic"].as_str().unwrap_or_default().to_string();
                break (candidate, id, topic);
            } else if ret == codes::ERROR_USERNAME_TAKEN as i64 {
                println!("Username '{candidate}' is already taken, try another.");
            } else {
                println!("Signup failed with code {ret}, try another username.");
            }
        };

        info!("signed up as {username} (id {user_id}, topic {topic})");

        let notifications = Arc::new(Mutex::new(VecDeque::new()));
        spawn_notification_listener(notify_addr.to_string(), topic.clone(), notifications.clone());

        Ok(Self {
            frontend: Mutex::new(frontend),
            rpc_timeout,
            username,
            user_id,
            topic,
            forced_delay_secs: Mutex::new(0),
            notifications,
        })
    }

    pub async fn set_forced_delay(&self, secs: i64) {
        *self.forced_delay_secs.lock().await = secs;
    }

    /// ISO-8601 timestamp for posts, back-dated by the forced delay if set.
    pub async fn post_timestamp(&self) -> String {
        let delay = *self.forced_delay_secs.lock().await;
        let adjusted = now_seconds() - delay as f64;
        let secs = adjusted as i64;
        let datetime = chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default();
        datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// Integer-seconds timestamp for private messages, same forced-delay
    /// knob applied; kept as a distinct representation from post
    /// timestamps per spec's unresolved timestamp-format inconsistency.
    pub async fn message_timestamp(&self) -> i64 {
        let delay = *self.forced_delay_secs.lock().await;
        (now_seconds() - delay as f64) as i64
    }

    pub async fn drain_notifications(&self) -> Vec<String> {
        let mut queue = self.notifications.lock().await;
        queue.drain(..).collect()
    }

    pub async fn request(&self, request: &ClientRequest) -> Result<Value> {
        let mut stream = self.frontend.lock().await;
        let body = serde_json::to_vec(request)?;
        tokio::time::timeout(self.rpc_timeout, write_frame(&mut stream, &body)).await??;
        let reply_bytes = tokio::time::timeout(self.rpc_timeout, read_frame(&mut stream))
            .await
            .map_err(|_| anyhow!("request timed out"))??
            .ok_or_else(|| anyhow!("broker closed the connection"))?;
        Ok(serde_json::from_slice(&reply_bytes)?)
    }
}

fn spawn_notification_listener(
    notify_addr: String,
    topic: String,
    queue: Arc<Mutex<VecDeque<String>>>,
) {
    tokio::spawn(async move {
        loop {
            match TcpStream::connect(&notify_addr).await {
                Ok(mut stream) => {
                    if write_string(&mut stream, &topic).await.is_err() {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                    loop {
                        match read_string(&mut stream).await {
                            Ok(Some(line)) => {
                                queue.lock().await.push_back(line);
                            }
                            Ok(None) => break,
                            Err(e) => {
                                warn!("notification subscription error: {e:#}");
                                break;
                            }
                        }
                    }
                }
                Err(e) => error!("failed to connect to notification bus: {e:#}"),
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    });
}

pub fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
