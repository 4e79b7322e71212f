/// Upper bound for `lc + lp` enforced by liblzma.
pub const LCLP_MAX: u32 = 4;

/// Upper bound for `pb`.
pub const PB_MAX: u32 = 4;

/// Largest valid props byte: `(4 * 5 + 4) * 9 + 8`.
const PROPS_BYTE_MAX: u8 = 224;

/// Literal-context, literal-position and position bits, packed into the
/// header's props byte as `(pb * 5 + lp) * 9 + lc`.
///
/// Only constructible through [`LzmaProps::new`] / [`LzmaProps::from_byte`],
/// so every value packs into a byte the decoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaProps {
    lc: u32,
    lp: u32,
    pb: u32,
}

impl Default for LzmaProps {
    fn default() -> Self {
        Self { lc: 3, lp: 0, pb: 2 }
    }
}

impl LzmaProps {
    /// `None` when the combination is outside what the decoder accepts.
    pub fn new(lc: u32, lp: u32, pb: u32) -> Option<Self> {
        let lclp = lc.checked_add(lp)?;
        if lclp > LCLP_MAX || pb > PB_MAX {
            return None;
        }
        Some(Self { lc, lp, pb })
    }

    pub fn lc(&self) -> u32 {
        self.lc
    }

    pub fn lp(&self) -> u32 {
        self.lp
    }

    pub fn pb(&self) -> u32 {
        self.pb
    }

    pub fn to_byte(&self) -> u8 {
        ((self.pb * 5 + self.lp) * 9 + self.lc) as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte > PROPS_BYTE_MAX {
            return None;
        }
        let byte = byte as u32;
        Self::new(byte % 9, (byte / 9) % 5, byte / 45)
    }
}
