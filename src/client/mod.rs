//! # Client
//!
//! Signs up (retrying on a taken username), subscribes to its own
//! notification topic, and drives the interactive menu described in
//! spec §6.
//!
//! - [`session`]: the request socket, notification subscription, and the
//!   forced-delay test knob
//! - [`menu`]: the 7-option interactive CLI loop

pub mod menu;
pub mod session;

pub use session::Session;
