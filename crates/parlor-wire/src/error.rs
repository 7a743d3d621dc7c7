use thiserror::Error;

/// Errors raised while framing, encoding or decoding wire payloads.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("i/o error on wire connection")]
    Io(#[from] std::io::Error),

    #[error("failed to encode payload")]
    Encode(#[source] postcard::Error),

    #[error("failed to decode payload")]
    Decode(#[source] postcard::Error),

    #[error("frame of {0} bytes exceeds the maximum of {1} bytes")]
    FrameTooLarge(u32, u32),

    #[error("payload schema version {found} does not match the expected {expected}")]
    SchemaMismatch { expected: u8, found: u8 },

    #[error("connection closed before a complete frame was read")]
    ConnectionClosed,
}
