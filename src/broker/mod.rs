//! # Broker
//!
//! Load-balances client requests across the currently attached app
//! servers and hosts the cluster control plane: membership, election,
//! heartbeat liveness, and notification fan-out.
//!
//! - [`state`]: the shared registry/heartbeat/id-counter behind one mutex
//! - [`router`]: frontend/backend request forwarding (worker pool)
//! - [`control`]: registration, membership, election, clock sync, notify
//! - [`notify`]: the publish/subscribe notification bus
//! - [`heartbeat`]: heartbeat ingress and the liveness sweep
//! - [`service`]: wiring everything together

pub mod control;
pub mod heartbeat;
pub mod notify;
pub mod router;
pub mod service;
pub mod state;

pub use service::Broker;
