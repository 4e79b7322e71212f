use crate::codec::CodecParams;
use crate::error::BridgeError;

/// Fixed size of the block header in bytes.
///   props:u8 + dict_size:u32 + original_size:u64
///   = 1 + 4 + 8 = 13
pub const HEADER_SIZE: usize = 13;

/// Size of the opaque codec parameter prefix (props byte + dictionary size).
pub const PARAMS_SIZE: usize = 5;

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 13-byte header that prefixes every
/// compressed block.
///
/// The layout follows the legacy `.lzma` convention, so the header alone is
/// enough to size the decompression output before any codec call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub params: CodecParams,
    /// Exact byte count of the uncompressed payload.
    pub original_size: u64,
}

impl BlockHeader {
    pub fn new(params: CodecParams, original_size: u64) -> Self {
        Self {
            params,
            original_size,
        }
    }

    /// Serialize to exactly `HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..PARAMS_SIZE].copy_from_slice(&self.params.to_bytes());
        buf[PARAMS_SIZE..HEADER_SIZE].copy_from_slice(&self.original_size.to_le_bytes());
        buf
    }

    /// Write the encoding into the first `HEADER_SIZE` bytes of `slot`.
    ///
    /// `slot` must be at least `HEADER_SIZE` bytes; the bridge only calls this
    /// on the slot it reserved.
    pub fn write_to(&self, slot: &mut [u8]) {
        slot[..HEADER_SIZE].copy_from_slice(&self.to_bytes());
    }

    /// Deserialize from the first `HEADER_SIZE` bytes of `buf`.
    ///
    /// Trailing bytes (the compressed payload) are ignored.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, BridgeError> {
        let buf: &[u8; HEADER_SIZE] = buf
            .get(..HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(BridgeError::MalformedHeader { available: buf.len() })?;

        let mut params = [0u8; PARAMS_SIZE];
        params.copy_from_slice(&buf[..PARAMS_SIZE]);
        let mut size = [0u8; 8];
        size.copy_from_slice(&buf[PARAMS_SIZE..]);

        Ok(Self {
            params: CodecParams::from_bytes(params),
            original_size: u64::from_le_bytes(size),
        })
    }
}

/// Read only the original size from a compressed block.
///
/// Lets a caller allocate the decompression region before handing the
/// buffer to the bridge.
pub fn peek_original_size(block: &[u8]) -> Result<u64, BridgeError> {
    Ok(BlockHeader::from_bytes(block)?.original_size)
}

/// Worst-case output capacity for compressing `input_len` bytes, header
/// included. A region of this size never yields `OutputTooSmall`.
pub fn compress_bound(input_len: usize) -> usize {
    HEADER_SIZE
        .saturating_add(input_len)
        .saturating_add(input_len / 3)
        .saturating_add(128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> BlockHeader {
        BlockHeader::new(
            CodecParams {
                props: 0x5D,
                dict_size: 1 << 20,
            },
            1000,
        )
    }

    #[test]
    fn encodes_legacy_layout() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(bytes[0], 0x5D);
        assert_eq!(&bytes[1..5], &[0x00, 0x00, 0x10, 0x00]);
        assert_eq!(&bytes[5..13], &1000u64.to_le_bytes());
    }

    #[test]
    fn decode_ignores_trailing_payload() {
        let mut block = sample().to_bytes().to_vec();
        block.extend_from_slice(&[0xFF; 32]);
        assert_eq!(BlockHeader::from_bytes(&block).unwrap(), sample());
    }

    #[test]
    fn short_input_is_malformed() {
        let bytes = sample().to_bytes();
        for len in 0..HEADER_SIZE {
            match BlockHeader::from_bytes(&bytes[..len]) {
                Err(BridgeError::MalformedHeader { available }) => assert_eq!(available, len),
                other => panic!("expected MalformedHeader for {len} bytes, got {other:?}"),
            }
        }
    }

    #[test]
    fn write_to_fills_only_the_slot() {
        let mut slot = [0xEEu8; HEADER_SIZE + 4];
        sample().write_to(&mut slot);
        assert_eq!(&slot[..HEADER_SIZE], &sample().to_bytes());
        assert_eq!(&slot[HEADER_SIZE..], &[0xEE; 4]);
    }

    #[test]
    fn peek_reads_size_only() {
        assert_eq!(peek_original_size(&sample().to_bytes()).unwrap(), 1000);
        assert!(peek_original_size(&[0x5D, 0, 0]).is_err());
    }

    #[test]
    fn bound_covers_header_and_saturates() {
        assert_eq!(compress_bound(0), HEADER_SIZE + 128);
        assert!(compress_bound(1000) >= HEADER_SIZE + 1000);
        assert_eq!(compress_bound(usize::MAX), usize::MAX);
    }

    proptest! {
        #[test]
        fn prop_header_roundtrip(props in any::<u8>(), dict_size in any::<u32>(), size in any::<u64>()) {
            let header = BlockHeader::new(CodecParams { props, dict_size }, size);
            let bytes = header.to_bytes();
            prop_assert_eq!(bytes.len(), HEADER_SIZE);
            prop_assert_eq!(BlockHeader::from_bytes(&bytes).unwrap(), header);
        }
    }
}
