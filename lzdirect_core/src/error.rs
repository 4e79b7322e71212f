//! Typed failures returned by the bridge.
//!
//! Nothing here is logged by the library; every failure travels back to the
//! caller, which owns retry policy.

use thiserror::Error;

/// The codec could not be set up. A process that sees this should not
/// attempt further compression through the same bridge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("codec '{codec}' unusable: initialization returned native status {status}")]
pub struct FatalError {
    pub codec: &'static str,
    pub status: i32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error("bridge used before initialize()")]
    Uninitialized,

    #[error(
        "invalid range: input {input_offset}+{input_length}, output {output_offset}+{output_capacity}, buffer capacity {capacity}"
    )]
    InvalidRange {
        input_offset: usize,
        input_length: usize,
        output_offset: usize,
        output_capacity: usize,
        capacity: usize,
    },

    #[error("malformed block header: {available} bytes available, 13 required")]
    MalformedHeader { available: usize },

    #[error("output region too small: {capacity} bytes available, {required} required")]
    OutputTooSmall { required: u64, capacity: usize },

    #[error("codec '{codec}' failed with native status {status}")]
    CodecFailure { codec: &'static str, status: i32 },
}

impl BridgeError {
    /// Only a short output region can be fixed by retrying the same call
    /// with more capacity.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BridgeError::OutputTooSmall { .. })
    }
}
