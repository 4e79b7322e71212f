use thiserror::Error;

use crate::format::PARAMS_SIZE;

/// Opaque codec parameters carried in the first five header bytes.
///
/// The bridge never interprets `props`; its bit layout belongs to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecParams {
    pub props: u8,
    pub dict_size: u32,
}

impl CodecParams {
    pub fn to_bytes(&self) -> [u8; PARAMS_SIZE] {
        let mut buf = [0u8; PARAMS_SIZE];
        buf[0] = self.props;
        buf[1..].copy_from_slice(&self.dict_size.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: [u8; PARAMS_SIZE]) -> Self {
        Self {
            props: buf[0],
            dict_size: u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]),
        }
    }
}

// ── Bridge-level statuses ──────────────────────────────────────────────────
// Native codecs report non-negative status codes; negative values are
// reserved for conditions the bridge itself detects.

/// The codec ran out of destination space.
pub const STATUS_OUTPUT_FULL: i32 = -1;

/// The codec produced a different byte count than the block promised.
pub const STATUS_SIZE_MISMATCH: i32 = -2;

/// What a native codec call can report besides success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The destination region filled before the codec finished.
    #[error("destination region exhausted")]
    OutputFull,
    /// Any other native status, passed through verbatim.
    #[error("native status {0}")]
    Status(i32),
}

impl CodecError {
    pub fn status(&self) -> i32 {
        match self {
            CodecError::OutputFull => STATUS_OUTPUT_FULL,
            CodecError::Status(status) => *status,
        }
    }
}

/// The native compression primitive driven by the bridge.
///
/// Implementations:
/// - Work directly on the caller's memory: `src` and `dst` are disjoint views
///   into the shared buffer, and nothing is copied on the way in or out.
/// - Write at most `dst.len()` bytes and report how many were produced.
/// - Hold no per-call state between invocations. One codec is shared by every
///   thread using the bridge, hence `Send + Sync`.
pub trait NativeCodec: Send + Sync {
    /// Human-readable codec name for errors and CLI display.
    fn name(&self) -> &'static str;

    /// One-time setup: resolve whatever native state the codec needs and
    /// report the parameters every compressed block will carry.
    fn negotiate(&self) -> Result<CodecParams, CodecError>;

    /// Compress `src` into `dst`, returning the payload length.
    ///
    /// `Err(CodecError::OutputFull)` when `dst` is too small; the contents of
    /// `dst` are unspecified in that case.
    fn compress(&self, params: &CodecParams, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError>;

    /// Decompress `src` into `dst`, which is sized to the exact original
    /// length. Returns the number of bytes produced.
    fn decompress(&self, params: &CodecParams, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError>;
}
