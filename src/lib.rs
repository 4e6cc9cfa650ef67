//! # postline — Cluster Control Plane
//!
//! A small distributed social-messaging service: clients publish timeline
//! posts, follow other users, exchange private messages, and receive
//! real-time notifications when followed users post. This crate is the
//! *cluster control plane* formed by the broker and the app servers:
//! request load-balancing across a dynamic server set, heartbeat-based
//! liveness tracking, leader election by highest live id, logical-clock
//! synchronization, and publish/subscribe notification fan-out.
//!
//! ## Modules
//!
//! - [`common`]: wire types, framing, configuration, logging
//! - [`store`]: the in-memory data store (users, follow graph, posts, DMs)
//! - [`broker`]: request routing, membership, election, heartbeat, notify
//! - [`server`]: the stateless app server and its control-plane loops
//! - [`client`]: signup, notification subscription, the interactive menu

pub mod broker;
pub mod client;
pub mod common;
pub mod server;
pub mod store;
