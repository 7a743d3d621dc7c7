//! Self-describing codec for replicated events and snapshots.
//!
//! Every encoded payload is prefixed by a one-byte schema version. A decoder
//! that sees a mismatched version fails closed rather than guessing at a
//! layout — cross-version mixing between leader and follower builds is
//! explicitly undefined.

use parlor_store::{MutationEvent, Snapshot};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::WireError;

/// Bumped whenever [`MutationEvent`] or [`Snapshot`]'s on-wire shape changes.
pub const SCHEMA_VERSION: u8 = 1;

fn encode_versioned<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut out = vec![SCHEMA_VERSION];
    let body = postcard::to_allocvec(value).map_err(WireError::Encode)?;
    out.extend_from_slice(&body);
    Ok(out)
}

fn decode_versioned<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    let (version, body) = bytes.split_first().ok_or(WireError::SchemaMismatch {
        expected: SCHEMA_VERSION,
        found: 0,
    })?;
    if *version != SCHEMA_VERSION {
        return Err(WireError::SchemaMismatch {
            expected: SCHEMA_VERSION,
            found: *version,
        });
    }
    postcard::from_bytes(body).map_err(WireError::Decode)
}

/// Encodes a [`MutationEvent`] for transmission over `AcceptUpdates`.
pub fn encode_event(event: &MutationEvent) -> Result<Vec<u8>, WireError> {
    encode_versioned(event)
}

/// Decodes bytes previously produced by [`encode_event`].
pub fn decode_event(bytes: &[u8]) -> Result<MutationEvent, WireError> {
    decode_versioned(bytes)
}

/// Encodes a full [`Snapshot`] for transmission in `RegisterFollower`'s reply.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, WireError> {
    encode_versioned(snapshot)
}

/// Decodes bytes previously produced by [`encode_snapshot`].
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot, WireError> {
    decode_versioned(bytes)
}
