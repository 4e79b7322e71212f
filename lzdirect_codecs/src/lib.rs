mod lzma_codec;
mod props;

pub use lzma_codec::{LzmaCodec, DEFAULT_DICT_SIZE, DEFAULT_PRESET, DICT_SIZE_MIN};
pub use props::LzmaProps;

use std::sync::OnceLock;

use lzdirect_core::{BridgeError, CompressionRequest, DirectBufferBridge, FatalError};

static DEFAULT_BRIDGE: OnceLock<DirectBufferBridge> = OnceLock::new();

/// The process-wide bridge over `LzmaCodec::default()`.
///
/// Used by the free functions below, which are the call contract the
/// engine's buffer-pool and spill layer codes against.
pub fn default_bridge() -> &'static DirectBufferBridge {
    DEFAULT_BRIDGE.get_or_init(|| DirectBufferBridge::new(Box::new(LzmaCodec::default())))
}

/// One-time process-wide setup. Safe to call from several threads and any
/// number of times; must precede the first `compress`/`decompress`.
pub fn initialize() -> Result<(), FatalError> {
    default_bridge().initialize()
}

pub fn compress(
    buffer: &mut [u8],
    input_offset: usize,
    input_length: usize,
    output_offset: usize,
    output_capacity: usize,
) -> Result<usize, BridgeError> {
    default_bridge().compress_direct(CompressionRequest::new(
        buffer,
        input_offset,
        input_length,
        output_offset,
        output_capacity,
    ))
}

pub fn decompress(
    buffer: &mut [u8],
    input_offset: usize,
    input_length: usize,
    output_offset: usize,
    output_capacity: usize,
) -> Result<usize, BridgeError> {
    default_bridge().decompress_direct(CompressionRequest::new(
        buffer,
        input_offset,
        input_length,
        output_offset,
        output_capacity,
    ))
}
