//! # App Server Entry Point
//!
//! Thin wrapper tying config loading to [`Coordinator::register`] and
//! [`Coordinator::run`].

use crate::common::config::ServerConfig;
use crate::server::coordinator::Coordinator;
use anyhow::Result;

pub struct Server {
    coordinator: Coordinator,
}

impl Server {
    pub async fn start(config: ServerConfig) -> Result<Self> {
        let coordinator = Coordinator::register(config).await?;
        Ok(Self { coordinator })
    }

    pub async fn run(&self) {
        self.coordinator.run().await;
    }
}
