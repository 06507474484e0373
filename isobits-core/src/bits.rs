//! Plain bit cursor and the bit-level I/O traits shared by every reader and
//! writer in the workspace.
//!
//! [`BitReader`] and [`BitWriter`] work on bytes exactly as stored; they know
//! nothing about emulation prevention. Use [`crate::ebsp`] for NAL unit
//! payloads.

use crate::error::{BitResult, BitstreamError};

/// Mask with the low `n` bits set (`n` up to 64).
#[inline]
pub(crate) fn low_mask(n: u8) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// MSB-first bit source.
///
/// Implementors keep a sticky fault: after the first failed read every later
/// read returns that same error without moving the cursor.
pub trait ReadBits {
    /// Read `n` bits (0..=32), most significant first.
    fn read_bits(&mut self, n: u8) -> BitResult<u32>;

    /// Decoded bits consumed so far.
    fn bit_position(&self) -> u64;

    /// Upper bound on the bits that can still be read.
    fn bits_left(&self) -> u64;

    /// Record `error` as the reader's fault unless one is already set, and
    /// return the fault now in effect.
    fn fail(&mut self, error: BitstreamError) -> BitstreamError;

    /// Read `n` bits (0..=64).
    fn read_bits_u64(&mut self, n: u8) -> BitResult<u64> {
        if n > 64 {
            return Err(self.fail(BitstreamError::InvalidBitCount(n)));
        }
        if n <= 32 {
            return self.read_bits(n).map(u64::from);
        }
        let high = self.read_bits(n - 32)?;
        let low = self.read_bits(32)?;
        Ok((u64::from(high) << 32) | u64::from(low))
    }

    /// Read a single bit as a flag.
    fn read_flag(&mut self) -> BitResult<bool> {
        self.read_bits(1).map(|b| b == 1)
    }

    /// Read an 8-bit value.
    fn read_u8(&mut self) -> BitResult<u8> {
        self.read_bits(8).map(|v| v as u8)
    }

    /// Read a 16-bit value.
    fn read_u16(&mut self) -> BitResult<u16> {
        self.read_bits(16).map(|v| v as u16)
    }

    /// Skip `n` bits.
    fn skip_bits(&mut self, mut n: u64) -> BitResult<()> {
        while n > 0 {
            let step = n.min(32) as u8;
            self.read_bits(step)?;
            n -= u64::from(step);
        }
        Ok(())
    }

    /// Check if the cursor sits on a byte boundary.
    fn is_byte_aligned(&self) -> bool {
        self.bit_position() % 8 == 0
    }

    /// Discard bits up to the next byte boundary.
    fn byte_align(&mut self) -> BitResult<()> {
        let pad = (8 - self.bit_position() % 8) % 8;
        self.skip_bits(pad)
    }

    /// Capacity to reserve for `count` elements coded in at least
    /// `min_bits` bits each, capped by what the remaining input can hold.
    fn capacity_for(&self, count: u64, min_bits: u64) -> usize {
        let fit = self.bits_left() / min_bits.max(1);
        usize::try_from(count.min(fit)).unwrap_or(usize::MAX)
    }
}

/// MSB-first bit sink.
pub trait WriteBits {
    /// Write the low `n` bits (0..=32) of `value`, most significant first.
    fn write_bits(&mut self, value: u32, n: u8) -> BitResult<()>;

    /// Bits written so far, escape bytes excluded.
    fn bits_written(&self) -> u64;

    /// Write the low `n` bits (0..=64) of `value`.
    fn write_bits_u64(&mut self, value: u64, n: u8) -> BitResult<()> {
        if n > 64 {
            return Err(BitstreamError::InvalidBitCount(n));
        }
        if n > 32 {
            self.write_bits((value >> 32) as u32, n - 32)?;
            self.write_bits(value as u32, 32)
        } else {
            self.write_bits(value as u32, n)
        }
    }

    /// Write a single bit.
    fn write_flag(&mut self, bit: bool) -> BitResult<()> {
        self.write_bits(u32::from(bit), 1)
    }

    /// Check if the next bit starts a new byte.
    fn is_byte_aligned(&self) -> bool {
        self.bits_written() % 8 == 0
    }

    /// Pad with zero bits to the next byte boundary.
    fn stuff_to_byte_with_zeros(&mut self) -> BitResult<()> {
        let pad = (8 - self.bits_written() % 8) % 8;
        self.write_bits(0, pad as u8)
    }

    /// Write `rbsp_trailing_bits`: a one bit, then zeros to byte alignment.
    fn write_rbsp_trailing_bits(&mut self) -> BitResult<()> {
        self.write_flag(true)?;
        self.stuff_to_byte_with_zeros()
    }
}

/// A bit reader over raw bytes.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
    fault: Option<BitstreamError>,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
            fault: None,
        }
    }

    /// Get the total number of bits in the stream.
    pub fn total_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    /// Get the current bit position in the stream.
    pub fn position(&self) -> u64 {
        self.byte_pos as u64 * 8 + u64::from(self.bit_pos)
    }

    /// Get the number of remaining bits.
    pub fn remaining_bits(&self) -> u64 {
        self.total_bits().saturating_sub(self.position())
    }

    /// The fault that stopped this reader, if any.
    pub fn fault(&self) -> Option<BitstreamError> {
        self.fault
    }

    /// Forget a recorded fault so reading can resume.
    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    /// Skip to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bit_pos != 0 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
    }

    /// Peek at the next n bits without consuming them.
    pub fn peek_bits(&self, n: u8) -> BitResult<u32> {
        let mut clone = self.clone();
        clone.read_bits(n)
    }

    /// Get the underlying byte slice from the next whole byte onward.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        let start = if self.bit_pos == 0 {
            self.byte_pos
        } else {
            self.byte_pos + 1
        };
        self.data.get(start..).unwrap_or(&[])
    }

    fn next_bit(&mut self) -> u32 {
        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
        u32::from(bit)
    }
}

impl ReadBits for BitReader<'_> {
    fn read_bits(&mut self, n: u8) -> BitResult<u32> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        if n > 32 {
            return Err(self.fail(BitstreamError::InvalidBitCount(n)));
        }
        if self.remaining_bits() < u64::from(n) {
            return Err(self.fail(BitstreamError::UnexpectedEnd));
        }

        let mut value: u32 = 0;
        for _ in 0..n {
            value = (value << 1) | self.next_bit();
        }
        Ok(value)
    }

    fn bit_position(&self) -> u64 {
        self.position()
    }

    fn bits_left(&self) -> u64 {
        self.remaining_bits()
    }

    fn fail(&mut self, error: BitstreamError) -> BitstreamError {
        *self.fault.get_or_insert(error)
    }
}

/// A bit writer producing raw bytes.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_pos: u8,
}

impl BitWriter {
    /// Create a new bit writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new bit writer with capacity.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            bit_pos: 0,
        }
    }

    /// Get the written data. A partial last byte is zero-padded.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the written data, consuming the writer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl WriteBits for BitWriter {
    fn write_bits(&mut self, value: u32, n: u8) -> BitResult<()> {
        if n > 32 {
            return Err(BitstreamError::InvalidBitCount(n));
        }
        for i in (0..n).rev() {
            if self.bit_pos == 0 {
                self.data.push(0);
            }
            if (value >> i) & 1 != 0 {
                if let Some(last) = self.data.last_mut() {
                    *last |= 1 << (7 - self.bit_pos);
                }
            }
            self.bit_pos = (self.bit_pos + 1) % 8;
        }
        Ok(())
    }

    fn bits_written(&self) -> u64 {
        let full = self.data.len() as u64 * 8;
        if self.bit_pos == 0 {
            full
        } else {
            full - 8 + u64::from(self.bit_pos)
        }
    }
}
