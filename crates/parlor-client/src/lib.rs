//! # parlor-client: a caller-side library for the parlor chat cluster
//!
//! [`Client`] holds a list of candidate addresses and transparently rotates
//! past followers and unreachable nodes until it finds the current leader,
//! the way a terminal or GUI front-end built on top of this crate would.

mod client;
mod error;

pub use client::Client;
pub use error::ClientError;
