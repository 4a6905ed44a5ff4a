use thiserror::Error;

/// Frame-parse errors — always handled by dropping the single frame and
/// logging; never propagated as process-fatal.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("buffer too short: {0} bytes, need at least 30")]
    TooShort(usize),
    #[error("declared total_bytes {declared} does not match payload_len {actual}")]
    LengthMismatch { declared: u16, actual: usize },
    #[error("beacon payload too short: {0} bytes, need 33")]
    BeaconTooShort(usize),
}

/// Session-level errors. Every variant here is handled in place (close
/// gate, backoff, drop, reconnect) per the error taxonomy; none of them
/// abort the process.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unmapped command byte at offset {offset}: 0x{byte:02x}")]
    UnmappedCommand { offset: usize, byte: u8 },
    #[error("mapping node referenced out-of-range byte index {index} (payload len {len})")]
    ByteOutOfRange { index: usize, len: usize },
    #[error("unsupported device type: {0:?}")]
    UnsupportedDeviceType(String),
    #[error("NIC send returned short count: wrote {wrote} of {expected}")]
    ShortSend { wrote: usize, expected: usize },
}
