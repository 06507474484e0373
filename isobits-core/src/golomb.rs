//! Exp-Golomb codes, ue(v) and se(v).
//!
//! A code is `k` zero bits, a one bit, then a `k`-bit suffix; it stands for
//! `2^k - 1 + suffix`. The signed form maps odd codes to positive values and
//! even codes to zero and negative values.
//!
//! The prefix loop has no iteration cap: it stops at the first one bit or at
//! the reader's end-of-data fault, whichever comes first.

use crate::bits::{ReadBits, WriteBits};
use crate::error::{BitResult, BitstreamError};

/// Exp-Golomb decoding on top of any [`ReadBits`].
pub trait ExpGolombRead: ReadBits {
    /// Read an unsigned Exp-Golomb coded value (ue(v)).
    ///
    /// Codes worth more than `u32::MAX` fail with
    /// [`BitstreamError::ExpGolombOverflow`] once the prefix has been read.
    fn read_ue(&mut self) -> BitResult<u32> {
        let code = read_code(self)?;
        u32::try_from(code).map_err(|_| self.fail(BitstreamError::ExpGolombOverflow))
    }

    /// Read a signed Exp-Golomb coded value (se(v)).
    fn read_se(&mut self) -> BitResult<i32> {
        let code = read_code(self)?;
        i32::try_from(ue_to_se(code)).map_err(|_| self.fail(BitstreamError::ExpGolombOverflow))
    }
}

impl<R: ReadBits + ?Sized> ExpGolombRead for R {}

/// Raw code number; prefixes longer than 32 zeros are rejected.
fn read_code<R: ReadBits + ?Sized>(reader: &mut R) -> BitResult<u64> {
    let mut leading_zeros: u32 = 0;
    while reader.read_bits(1)? == 0 {
        leading_zeros += 1;
    }
    if leading_zeros > 32 {
        return Err(reader.fail(BitstreamError::ExpGolombOverflow));
    }
    let suffix = reader.read_bits(leading_zeros as u8)?;
    Ok((1u64 << leading_zeros) - 1 + u64::from(suffix))
}

/// Exp-Golomb encoding on top of any [`WriteBits`].
pub trait ExpGolombWrite: WriteBits {
    /// Write an unsigned Exp-Golomb coded value.
    fn write_ue(&mut self, value: u32) -> BitResult<()> {
        write_code(self, u64::from(value))
    }

    /// Write a signed Exp-Golomb coded value.
    fn write_se(&mut self, value: i32) -> BitResult<()> {
        write_code(self, se_to_ue(value))
    }
}

impl<W: WriteBits + ?Sized> ExpGolombWrite for W {}

fn write_code<W: WriteBits + ?Sized>(writer: &mut W, code: u64) -> BitResult<()> {
    let value_plus_1 = code + 1;
    let leading_zeros = (63 - value_plus_1.leading_zeros()) as u8;
    writer.write_bits(0, leading_zeros)?;
    writer.write_bits_u64(value_plus_1, leading_zeros + 1)
}

/// Length in bits of the ue(v) code for `value`.
pub fn ue_bit_len(value: u32) -> u32 {
    let value_plus_1 = u64::from(value) + 1;
    2 * (63 - value_plus_1.leading_zeros()) + 1
}

/// Code number carrying the signed value `value`.
pub fn se_to_ue(value: i32) -> u64 {
    let v = i64::from(value);
    if v > 0 {
        (2 * v - 1) as u64
    } else {
        (-2 * v) as u64
    }
}

/// Signed value carried by the code number `code`.
pub fn ue_to_se(code: u64) -> i64 {
    let magnitude = (code / 2 + code % 2) as i64;
    if code % 2 == 1 {
        magnitude
    } else {
        -magnitude
    }
}
