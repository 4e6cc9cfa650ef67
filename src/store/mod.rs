//! # Data Store
//!
//! Single-process authoritative state for users, the follow graph, posts,
//! and private messages. Serves [`crate::common::messages::StoreRequest`]
//! over a plain request/reply TCP listener; internally serialized behind
//! one mutex, so no concurrency control is needed in [`db`] itself.

pub mod db;
pub mod service;

pub use db::Database;
pub use service::Store;
