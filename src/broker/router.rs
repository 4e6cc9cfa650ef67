//! # Frontend/Backend Request Router
//!
//! Implements the transparent load-balancer described in spec §4.2 as a
//! worker pool rather than full ROUTER/DEALER multiplexing: each app server
//! that dials the backend address becomes one long-lived worker connection,
//! owned by a dedicated task that processes one forwarded request at a time
//! (write, read reply, repeat). A client-facing frontend task picks the
//! next worker round-robin and exchanges one request/reply pair with it
//! through an `mpsc` + `oneshot` pair, holding the client's own TCP
//! connection open for the whole round trip. This gets the same two
//! guarantees spec §4.2 asks for — round-robin across currently attached
//! app servers, client identity preserved — without needing a wire-level
//! correlation id, since each worker only ever has one request in flight.

use crate::common::framing::{read_frame, write_frame};
use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

type WorkerRequest = (Vec<u8>, oneshot::Sender<Vec<u8>>);

#[derive(Clone)]
pub struct Router {
    workers: Arc<RwLock<Vec<mpsc::Sender<WorkerRequest>>>>,
    next: Arc<AtomicUsize>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            workers: Arc::new(RwLock::new(Vec::new())),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Accept backend connections forever; each one becomes a worker.
    pub async fn run_backend(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("backend listening on {addr}");

        loop {
            let (socket, peer) = listener.accept().await?;
            info!("app server worker attached from {peer}");
            let (tx, rx) = mpsc::channel::<WorkerRequest>(32);
            self.workers.write().await.push(tx.clone());
            let workers = self.workers.clone();
            tokio::spawn(async move {
                run_worker(socket, rx).await;
                debug!("worker {peer} detached");
                workers.write().await.retain(|w| !w.same_channel(&tx));
            });
        }
    }

    /// Accept client connections forever; each request is forwarded to the
    /// next worker round-robin.
    pub async fn run_frontend(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("frontend listening on {addr}");

        loop {
            let (socket, peer) = listener.accept().await?;
            debug!("client connected from {peer}");
            let router = self.clone();
            tokio::spawn(async move {
                if let Err(e) = router.serve_client(socket).await {
                    debug!("client {peer} disconnected: {e:#}");
                }
            });
        }
    }

    async fn serve_client(&self, mut socket: TcpStream) -> Result<()> {
        loop {
            let request = match read_frame(&mut socket).await? {
                Some(bytes) => bytes,
                None => return Ok(()),
            };

            let reply = self.forward(request).await?;
            write_frame(&mut socket, &reply).await?;
        }
    }

    async fn forward(&self, request: Vec<u8>) -> Result<Vec<u8>> {
        let worker = self.pick_worker().await?;
        let (tx, rx) = oneshot::channel();
        worker
            .send((request, tx))
            .await
            .map_err(|_| anyhow!("worker channel closed"))?;
        rx.await.map_err(|_| anyhow!("worker dropped reply"))
    }

    async fn pick_worker(&self) -> Result<mpsc::Sender<WorkerRequest>> {
        let workers = self.workers.read().await;
        if workers.is_empty() {
            return Err(anyhow!("no app servers attached"));
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % workers.len();
        Ok(workers[idx].clone())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker(mut socket: TcpStream, mut rx: mpsc::Receiver<WorkerRequest>) {
    while let Some((request, reply_tx)) = rx.recv().await {
        if let Err(e) = write_frame(&mut socket, &request).await {
            warn!("failed to forward request to worker: {e:#}");
            return;
        }
        match read_frame(&mut socket).await {
            Ok(Some(reply)) => {
                let _ = reply_tx.send(reply);
            }
            Ok(None) => {
                warn!("worker closed connection mid-request");
                return;
            }
            Err(e) => {
                warn!("failed to read worker reply: {e:#}");
                return;
            }
        }
    }
}
