//! # parlor-wire: framing, codec and RPC envelopes
//!
//! A minimal length-prefixed `postcard` transport over any async byte
//! stream, a schema-versioned codec for replicated [`parlor_store::MutationEvent`]s
//! and snapshots, and the request/response envelopes for the peer and
//! client services.

mod codec;
mod error;
mod framing;
mod messages;

pub use codec::{decode_event, decode_snapshot, encode_event, encode_snapshot, SCHEMA_VERSION};
pub use error::WireError;
pub use framing::{read_message, write_message, MAX_FRAME_BYTES};
pub use messages::{ClientRequest, ClientResponse, PeerRequest, PeerResponse, WireMessage};
