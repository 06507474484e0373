//! # isobits core
//!
//! Bit-exact building blocks shared by the isobits codec crates:
//! - Error handling types
//! - Plain bit cursor and the [`ReadBits`] / [`WriteBits`] traits
//! - Escaped (EBSP) reader and writer with emulation prevention handling
//! - Exp-Golomb codec
//! - NAL unit framing helpers
//! - VUI lookup tables

pub mod bits;
pub mod ebsp;
pub mod error;
pub mod golomb;
pub mod nalu;
pub mod vui;

pub use bits::{BitReader, BitWriter, ReadBits, WriteBits};
pub use ebsp::{EbspReader, EbspWriter, ReaderState};
pub use error::{BitResult, BitstreamError, Error, ParseError, ParseResult, Result, ResultExt};
pub use golomb::{ExpGolombRead, ExpGolombWrite};

/// Smallest `k` with `2^k >= n`; 0 for `n <= 1`.
///
/// Sizes fields such as `slice_segment_address` (`Ceil(Log2(PicSizeInCtbsY))`).
#[inline]
pub fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros()
    }
}
