//! # parlor-server: the leader/follower replica process
//!
//! Wires together [`parlor_store`]'s in-memory store, [`parlor_replica`]'s
//! node state and replication machinery, and this crate's password hashing
//! and client-facing RPC handler into the `parlor-server` binary.

pub mod auth;
pub mod error;
pub mod handler;
pub mod listener;

pub use error::ServerError;
