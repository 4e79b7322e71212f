use std::ops::Range;
use std::sync::OnceLock;

use log::{debug, trace};

use crate::codec::{CodecError, CodecParams, NativeCodec, STATUS_SIZE_MISMATCH};
use crate::error::{BridgeError, FatalError};
use crate::format::{compress_bound, BlockHeader, HEADER_SIZE};

/// One compression or decompression call over a caller-owned region.
///
/// `buffer` is borrowed for the duration of the call only; the caller keeps
/// ownership, and the exclusive borrow rules out two concurrent calls on the
/// same region.
#[derive(Debug)]
pub struct CompressionRequest<'a> {
    pub buffer: &'a mut [u8],
    pub input_offset: usize,
    pub input_length: usize,
    pub output_offset: usize,
    pub output_capacity: usize,
}

impl<'a> CompressionRequest<'a> {
    pub fn new(
        buffer: &'a mut [u8],
        input_offset: usize,
        input_length: usize,
        output_offset: usize,
        output_capacity: usize,
    ) -> Self {
        Self {
            buffer,
            input_offset,
            input_length,
            output_offset,
            output_capacity,
        }
    }

    fn invalid(&self) -> BridgeError {
        BridgeError::InvalidRange {
            input_offset: self.input_offset,
            input_length: self.input_length,
            output_offset: self.output_offset,
            output_capacity: self.output_capacity,
            capacity: self.buffer.len(),
        }
    }

    fn ranges(&self) -> Option<(Range<usize>, Range<usize>)> {
        let capacity = self.buffer.len();
        let input_end = self
            .input_offset
            .checked_add(self.input_length)
            .filter(|&end| end <= capacity)?;
        let output_end = self
            .output_offset
            .checked_add(self.output_capacity)
            .filter(|&end| end <= capacity)?;
        Some((self.input_offset..input_end, self.output_offset..output_end))
    }

    /// Validate the ranges and split the buffer into a read-only input view
    /// and a writable output view. Non-empty ranges must not overlap.
    fn split(self) -> Result<(&'a [u8], &'a mut [u8]), BridgeError> {
        let Some((input, output)) = self.ranges() else {
            return Err(self.invalid());
        };
        let disjoint = input.is_empty()
            || output.is_empty()
            || input.end <= output.start
            || output.end <= input.start;
        if !disjoint {
            return Err(self.invalid());
        }

        let buffer = self.buffer;
        if input.is_empty() {
            let (head, tail) = buffer.split_at_mut(output.start);
            Ok((&head[..0], &mut tail[..output.len()]))
        } else if output.is_empty() {
            let (head, tail) = buffer.split_at_mut(input.end);
            Ok((&head[input], &mut tail[..0]))
        } else if input.end <= output.start {
            let (head, tail) = buffer.split_at_mut(output.start);
            Ok((&head[input], &mut tail[..output.len()]))
        } else {
            let (head, tail) = buffer.split_at_mut(input.start);
            Ok((&tail[..input.len()], &mut head[output]))
        }
    }
}

/// Drives a [`NativeCodec`] over caller-owned memory without copying payload
/// bytes.
///
/// # Call contract
/// 1. Call [`initialize`] once before the first compress/decompress. Extra
///    calls are free and return the cached outcome.
/// 2. Each [`compress_direct`] / [`decompress_direct`] validates the request,
///    invokes the codec at most once, and returns the produced length.
///
/// The bridge holds no per-call state. Share it across threads by reference;
/// each thread brings its own buffer.
///
/// # Block layout written
/// ```text
/// [HEADER: 13 bytes] [PAYLOAD: codec output]
///  ↑ written last, only after the codec succeeds
/// ```
///
/// [`initialize`]: DirectBufferBridge::initialize
/// [`compress_direct`]: DirectBufferBridge::compress_direct
/// [`decompress_direct`]: DirectBufferBridge::decompress_direct
pub struct DirectBufferBridge {
    codec: Box<dyn NativeCodec>,
    negotiated: OnceLock<Result<CodecParams, FatalError>>,
}

impl DirectBufferBridge {
    pub fn new(codec: Box<dyn NativeCodec>) -> Self {
        Self {
            codec,
            negotiated: OnceLock::new(),
        }
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    /// One-time codec setup.
    ///
    /// The first caller runs the codec's negotiation; concurrent first calls
    /// block until it finishes. The outcome, success or failure, is cached
    /// for the life of the bridge.
    pub fn initialize(&self) -> Result<(), FatalError> {
        self.negotiated
            .get_or_init(|| {
                let codec = self.codec.name();
                let params = self
                    .codec
                    .negotiate()
                    .map_err(|e| FatalError { codec, status: e.status() })?;
                debug!(
                    "codec '{}' negotiated props=0x{:02x} dict_size={}",
                    codec, params.props, params.dict_size
                );
                Ok(params)
            })
            .clone()
            .map(|_| ())
    }

    /// Parameters written into every block header, once initialized.
    pub fn negotiated_params(&self) -> Option<CodecParams> {
        match self.negotiated.get() {
            Some(Ok(params)) => Some(*params),
            _ => None,
        }
    }

    fn params(&self) -> Result<CodecParams, BridgeError> {
        match self.negotiated.get() {
            Some(Ok(params)) => Ok(*params),
            Some(Err(fatal)) => Err(fatal.clone().into()),
            None => Err(BridgeError::Uninitialized),
        }
    }

    fn failure(&self, status: i32) -> BridgeError {
        BridgeError::CodecFailure {
            codec: self.codec.name(),
            status,
        }
    }

    /// Compress `[input_offset, +input_length)` into
    /// `[output_offset, +output_capacity)` and return the block length
    /// (header plus payload).
    ///
    /// On any error the header slot is left untouched, so no partial block
    /// is ever observable.
    pub fn compress_direct(&self, request: CompressionRequest<'_>) -> Result<usize, BridgeError> {
        let params = self.params()?;
        let (src, dst) = request.split()?;

        if dst.len() < HEADER_SIZE {
            return Err(BridgeError::OutputTooSmall {
                required: HEADER_SIZE as u64,
                capacity: dst.len(),
            });
        }
        let capacity = dst.len();
        let (slot, payload) = dst.split_at_mut(HEADER_SIZE);

        let payload_len = if src.is_empty() {
            0
        } else {
            self.codec
                .compress(&params, src, payload)
                .map_err(|e| match e {
                    CodecError::OutputFull => BridgeError::OutputTooSmall {
                        required: compress_bound(src.len()) as u64,
                        capacity,
                    },
                    CodecError::Status(status) => self.failure(status),
                })?
        };
        if payload_len > payload.len() {
            return Err(self.failure(STATUS_SIZE_MISMATCH));
        }

        BlockHeader::new(params, src.len() as u64).write_to(slot);
        let produced = HEADER_SIZE + payload_len;
        trace!("compressed {} -> {} bytes ({})", src.len(), produced, self.codec.name());
        Ok(produced)
    }

    /// Decompress the block at `[input_offset, +input_length)` into
    /// `[output_offset, +output_capacity)` and return the original length.
    ///
    /// Exactly `original_size` bytes of the output region are written; the
    /// rest is untouched.
    pub fn decompress_direct(&self, request: CompressionRequest<'_>) -> Result<usize, BridgeError> {
        self.params()?;
        let (src, dst) = request.split()?;

        let header = BlockHeader::from_bytes(src)?;
        let required = header.original_size;
        let size = usize::try_from(required)
            .ok()
            .filter(|&n| n <= dst.len())
            .ok_or(BridgeError::OutputTooSmall {
                required,
                capacity: dst.len(),
            })?;
        if size == 0 {
            return Ok(0);
        }

        let produced = self
            .codec
            .decompress(&header.params, &src[HEADER_SIZE..], &mut dst[..size])
            .map_err(|e| self.failure(e.status()))?;
        if produced != size {
            return Err(self.failure(STATUS_SIZE_MISMATCH));
        }

        trace!("decompressed {} -> {} bytes ({})", src.len(), size, self.codec.name());
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Stores payloads verbatim so block layout is easy to assert on.
    struct CopyCodec {
        calls: Arc<AtomicUsize>,
    }

    impl NativeCodec for CopyCodec {
        fn name(&self) -> &'static str {
            "copy"
        }

        fn negotiate(&self) -> Result<CodecParams, CodecError> {
            Ok(CodecParams {
                props: 0x5D,
                dict_size: 4096,
            })
        }

        fn compress(&self, _params: &CodecParams, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let out = dst.get_mut(..src.len()).ok_or(CodecError::OutputFull)?;
            out.copy_from_slice(src);
            Ok(src.len())
        }

        fn decompress(&self, _params: &CodecParams, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = src.len().min(dst.len());
            dst[..n].copy_from_slice(&src[..n]);
            Ok(n)
        }
    }

    fn bridge() -> (DirectBufferBridge, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let bridge = DirectBufferBridge::new(Box::new(CopyCodec { calls: calls.clone() }));
        bridge.initialize().unwrap();
        (bridge, calls)
    }

    #[test]
    fn compress_before_initialize_is_rejected() {
        let bridge = DirectBufferBridge::new(Box::new(CopyCodec {
            calls: Arc::new(AtomicUsize::new(0)),
        }));
        let mut buf = [0u8; 64];
        let err = bridge
            .compress_direct(CompressionRequest::new(&mut buf, 0, 4, 16, 32))
            .unwrap_err();
        assert_eq!(err, BridgeError::Uninitialized);
    }

    #[test]
    fn header_precedes_payload() {
        let (bridge, _) = bridge();
        let mut buf = [0u8; 64];
        buf[..4].copy_from_slice(b"abcd");
        let n = bridge
            .compress_direct(CompressionRequest::new(&mut buf, 0, 4, 8, 40))
            .unwrap();
        assert_eq!(n, HEADER_SIZE + 4);
        let header = BlockHeader::from_bytes(&buf[8..]).unwrap();
        assert_eq!(header.original_size, 4);
        assert_eq!(header.params.props, 0x5D);
        assert_eq!(&buf[8 + HEADER_SIZE..8 + HEADER_SIZE + 4], b"abcd");
    }

    #[test]
    fn output_may_precede_input() {
        let (bridge, _) = bridge();
        let mut buf = [0u8; 64];
        buf[40..44].copy_from_slice(b"wxyz");
        let n = bridge
            .compress_direct(CompressionRequest::new(&mut buf, 40, 4, 0, 40))
            .unwrap();
        assert_eq!(&buf[HEADER_SIZE..n], b"wxyz");
    }

    #[test]
    fn out_of_bounds_and_overlap_are_invalid() {
        let (bridge, calls) = bridge();
        let mut buf = [0u8; 64];
        let cases = [
            (60, 8, 0, 16),
            (0, 8, 60, 16),
            (usize::MAX, 2, 0, 16),
            (0, 8, usize::MAX - 4, 16),
            (0, 32, 16, 32),
            (16, 32, 0, 32),
        ];
        for (io, il, oo, oc) in cases {
            let err = bridge
                .compress_direct(CompressionRequest::new(&mut buf, io, il, oo, oc))
                .unwrap_err();
            assert!(matches!(err, BridgeError::InvalidRange { .. }), "{io} {il} {oo} {oc}: {err:?}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_input_may_sit_inside_output() {
        let (bridge, calls) = bridge();
        let mut buf = [0u8; 32];
        let n = bridge
            .compress_direct(CompressionRequest::new(&mut buf, 10, 0, 0, 32))
            .unwrap();
        assert_eq!(n, HEADER_SIZE);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(BlockHeader::from_bytes(&buf).unwrap().original_size, 0);
    }

    #[test]
    fn tiny_output_never_touches_header_slot() {
        let (bridge, calls) = bridge();
        let mut buf = [0xCCu8; 32];
        let err = bridge
            .compress_direct(CompressionRequest::new(&mut buf, 0, 4, 16, HEADER_SIZE - 1))
            .unwrap_err();
        assert!(matches!(err, BridgeError::OutputTooSmall { capacity: 12, .. }));
        assert!(buf[16..].iter().all(|&b| b == 0xCC));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn codec_output_full_maps_to_output_too_small() {
        let (bridge, _) = bridge();
        let mut buf = [0xCCu8; 64];
        let err = bridge
            .compress_direct(CompressionRequest::new(&mut buf, 0, 32, 32, HEADER_SIZE + 8))
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(buf[32..32 + HEADER_SIZE].iter().all(|&b| b == 0xCC));
    }

    #[test]
    fn decompress_checks_header_then_capacity() {
        let (bridge, calls) = bridge();
        let mut buf = [0u8; 64];
        let err = bridge
            .decompress_direct(CompressionRequest::new(&mut buf, 0, 12, 32, 32))
            .unwrap_err();
        assert_eq!(err, BridgeError::MalformedHeader { available: 12 });

        BlockHeader::new(CodecParams::default(), 40).write_to(&mut buf);
        let err = bridge
            .decompress_direct(CompressionRequest::new(&mut buf, 0, 20, 32, 32))
            .unwrap_err();
        assert_eq!(err, BridgeError::OutputTooSmall { required: 40, capacity: 32 });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn short_decode_is_codec_failure() {
        let (bridge, _) = bridge();
        let mut buf = [0u8; 64];
        BlockHeader::new(CodecParams::default(), 10).write_to(&mut buf);
        // Only 4 payload bytes behind a header that promises 10.
        let err = bridge
            .decompress_direct(CompressionRequest::new(&mut buf, 0, HEADER_SIZE + 4, 32, 32))
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::CodecFailure {
                codec: "copy",
                status: STATUS_SIZE_MISMATCH
            }
        );
    }

    #[test]
    fn roundtrip_through_one_buffer() {
        let (bridge, _) = bridge();
        let mut buf = [0u8; 96];
        buf[..10].copy_from_slice(b"0123456789");
        let n = bridge
            .compress_direct(CompressionRequest::new(&mut buf, 0, 10, 16, 40))
            .unwrap();
        let m = bridge
            .decompress_direct(CompressionRequest::new(&mut buf, 16, n, 64, 32))
            .unwrap();
        assert_eq!(m, 10);
        assert_eq!(&buf[64..74], b"0123456789");
    }
}
