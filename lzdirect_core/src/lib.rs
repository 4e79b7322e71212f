pub mod bridge;
pub mod codec;
pub mod error;
pub mod format;

pub use bridge::{CompressionRequest, DirectBufferBridge};
pub use codec::{CodecError, CodecParams, NativeCodec};
pub use error::{BridgeError, FatalError};
pub use format::{compress_bound, peek_original_size, BlockHeader, HEADER_SIZE};
