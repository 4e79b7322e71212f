use liblzma::stream::{Action, Error as LzmaError, Filters, LzmaOptions, Status, Stream};
use lzdirect_core::codec::{CodecError, CodecParams, NativeCodec};

use crate::props::LzmaProps;

// ── liblzma status codes (lzma_ret) ────────────────────────────────────────

pub const LZMA_NO_CHECK: i32 = 2;
pub const LZMA_UNSUPPORTED_CHECK: i32 = 3;
pub const LZMA_MEM_ERROR: i32 = 5;
pub const LZMA_MEMLIMIT_ERROR: i32 = 6;
pub const LZMA_FORMAT_ERROR: i32 = 7;
pub const LZMA_OPTIONS_ERROR: i32 = 8;
pub const LZMA_DATA_ERROR: i32 = 9;
pub const LZMA_BUF_ERROR: i32 = 10;
pub const LZMA_PROG_ERROR: i32 = 11;

/// Smallest dictionary liblzma accepts.
pub const DICT_SIZE_MIN: u32 = 4096;

/// Default dictionary: 1 MiB.
pub const DEFAULT_DICT_SIZE: u32 = 1 << 20;

pub const DEFAULT_PRESET: u32 = 6;

fn status_of(err: LzmaError) -> CodecError {
    #[allow(unreachable_patterns)]
    let status = match err {
        LzmaError::Data => LZMA_DATA_ERROR,
        LzmaError::Options => LZMA_OPTIONS_ERROR,
        LzmaError::Format => LZMA_FORMAT_ERROR,
        LzmaError::MemLimit => LZMA_MEMLIMIT_ERROR,
        LzmaError::Mem => LZMA_MEM_ERROR,
        LzmaError::Program => LZMA_PROG_ERROR,
        LzmaError::NoCheck => LZMA_NO_CHECK,
        LzmaError::UnsupportedCheck => LZMA_UNSUPPORTED_CHECK,
        _ => LZMA_PROG_ERROR,
    };
    CodecError::Status(status)
}

/// Raw LZMA1 codec backed by liblzma.
///
/// Blocks carry no container of their own: the bridge's 13-byte header holds
/// the props byte and dictionary size, and the payload is a bare LZMA1
/// stream terminated by an end-of-payload marker. Header plus payload is a
/// valid legacy `.lzma` file.
///
/// liblzma coders are stateful and not `Sync`, so a fresh coder is built per
/// call from the plain configuration held here.
#[derive(Debug, Clone)]
pub struct LzmaCodec {
    /// Compression preset (0 = fast / larger, 9 = slow / smallest).
    pub preset: u32,
    pub dict_size: u32,
    pub lc: u32,
    pub lp: u32,
    pub pb: u32,
}

impl Default for LzmaCodec {
    fn default() -> Self {
        let props = LzmaProps::default();
        Self {
            preset: DEFAULT_PRESET,
            dict_size: DEFAULT_DICT_SIZE,
            lc: props.lc(),
            lp: props.lp(),
            pb: props.pb(),
        }
    }
}

impl LzmaCodec {
    pub fn new(preset: u32) -> Self {
        Self {
            preset,
            ..Self::default()
        }
    }

    pub fn with_dict_size(mut self, dict_size: u32) -> Self {
        self.dict_size = dict_size;
        self
    }

    pub fn with_lclppb(mut self, lc: u32, lp: u32, pb: u32) -> Self {
        self.lc = lc;
        self.lp = lp;
        self.pb = pb;
        self
    }

    fn filters(preset: u32, props: LzmaProps, dict_size: u32) -> Result<Filters, CodecError> {
        let mut opts = LzmaOptions::new_preset(preset).map_err(status_of)?;
        opts.dict_size(dict_size)
            .literal_context_bits(props.lc())
            .literal_position_bits(props.lp())
            .position_bits(props.pb());
        let mut filters = Filters::new();
        filters.lzma1(&opts);
        Ok(filters)
    }

    fn encoder(&self, params: &CodecParams) -> Result<Stream, CodecError> {
        let props = LzmaProps::from_byte(params.props).ok_or(CodecError::Status(LZMA_OPTIONS_ERROR))?;
        let filters = Self::filters(self.preset, props, params.dict_size)?;
        Stream::new_raw_encoder(&filters).map_err(status_of)
    }
}

impl NativeCodec for LzmaCodec {
    fn name(&self) -> &'static str {
        "lzma"
    }

    fn negotiate(&self) -> Result<CodecParams, CodecError> {
        let props = LzmaProps::new(self.lc, self.lp, self.pb).ok_or(CodecError::Status(LZMA_OPTIONS_ERROR))?;
        if self.dict_size < DICT_SIZE_MIN {
            return Err(CodecError::Status(LZMA_OPTIONS_ERROR));
        }
        let params = CodecParams {
            props: props.to_byte(),
            dict_size: self.dict_size,
        };
        // Building a coder proves liblzma accepts the whole filter chain.
        self.encoder(&params)?;
        Ok(params)
    }

    fn compress(&self, params: &CodecParams, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        let mut stream = self.encoder(params)?;
        loop {
            let in_pos = stream.total_in() as usize;
            let out_pos = stream.total_out() as usize;
            let status = stream
                .process(&src[in_pos..], &mut dst[out_pos..], Action::Finish)
                .map_err(status_of)?;
            let produced = stream.total_out() as usize;
            match status {
                Status::StreamEnd => return Ok(produced),
                // liblzma reports "no progress possible" as a buffer error.
                Status::MemNeeded => return Err(CodecError::OutputFull),
                Status::Ok | Status::GetCheck if produced == dst.len() => return Err(CodecError::OutputFull),
                Status::Ok | Status::GetCheck => {}
            }
        }
    }

    fn decompress(&self, params: &CodecParams, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        if dst.is_empty() {
            return Ok(0);
        }
        let props = LzmaProps::from_byte(params.props).ok_or(CodecError::Status(LZMA_OPTIONS_ERROR))?;
        // Back-references never reach past the start of the output, so a
        // dictionary larger than the output is wasted memory.
        let window = u32::try_from(dst.len()).unwrap_or(u32::MAX);
        let dict_size = params.dict_size.min(window).max(DICT_SIZE_MIN);
        let filters = Self::filters(0, props, dict_size)?;
        let mut stream = Stream::new_raw_decoder(&filters).map_err(status_of)?;

        loop {
            let in_pos = stream.total_in() as usize;
            let out_pos = stream.total_out() as usize;
            let status = stream
                .process(&src[in_pos..], &mut dst[out_pos..], Action::Finish)
                .map_err(status_of)?;
            let produced = stream.total_out() as usize;
            // The header fixes the size, so a full output region is success
            // even when the end marker has not been consumed yet.
            if produced == dst.len() {
                return Ok(produced);
            }
            match status {
                Status::StreamEnd => return Err(CodecError::Status(LZMA_DATA_ERROR)),
                Status::MemNeeded => return Err(CodecError::Status(LZMA_BUF_ERROR)),
                Status::Ok | Status::GetCheck => {}
            }
        }
    }
}
