//! # Broker Wiring
//!
//! Assembles [`ClusterState`], [`NotifyBus`], and [`Router`] and runs every
//! independent loop described in spec §4.2 concurrently: frontend,
//! backend, control, notify, heartbeat ingress, and the liveness sweep. If
//! any of them terminates — which should only happen on a bind failure —
//! the whole process logs it and exits, the same "let it crash" posture
//! the app server takes on its own loops.

use crate::broker::control;
use crate::broker::heartbeat;
use crate::broker::notify::NotifyBus;
use crate::broker::router::Router;
use crate::broker::state::ClusterState;
use crate::common::config::BrokerConfig;
use log::error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct Broker {
    config: BrokerConfig,
    state: Arc<ClusterState>,
    notify: NotifyBus,
    router: Router,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            state: Arc::new(ClusterState::new()),
            notify: NotifyBus::new(),
            router: Router::new(),
        }
    }

    pub async fn run(&self) {
        let (heartbeat_tx, heartbeat_rx) = mpsc::unbounded_channel();

        let frontend = self.router.run_frontend(&self.config.frontend_addr);
        let backend = self.router.run_backend(&self.config.backend_addr);
        let control = control::run(
            &self.config.control_addr,
            self.state.clone(),
            self.notify.clone(),
        );
        let notify = self.notify.run(&self.config.notify_addr);
        let ingress = heartbeat::run_ingress(&self.config.heartbeat_addr, heartbeat_tx);
        let sweep = heartbeat::run_sweep(
            self.state.clone(),
            heartbeat_rx,
            Duration::from_secs(self.config.heartbeat_timeout_secs),
            Duration::from_secs(self.config.sweep_interval_secs),
        );

        tokio::select! {
            r = frontend => error!("frontend task terminated: {:?}", r),
            r = backend => error!("backend task terminated: {:?}", r),
            r = control => error!("control task terminated: {:?}", r),
            r = notify => error!("notify task terminated: {:?}", r),
            r = ingress => error!("heartbeat ingress task terminated: {:?}", r),
            _ = sweep => error!("liveness sweep task terminated"),
        }
    }
}
