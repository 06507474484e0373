//! Escaped bitstream (EBSP) reader and writer.
//!
//! NAL unit payloads carry emulation prevention bytes: whenever two zero
//! bytes are followed by a byte in `0..=3`, an extra `0x03` is inserted so
//! that no start code can appear inside a unit. [`EbspReader`] drops those
//! bytes while refilling its accumulator and [`EbspWriter`] inserts them while
//! flushing, so parsers only ever see RBSP bits.
//!
//! Position queries on the reader report raw bytes, escapes included. The
//! whole unit is resident in memory, so lookahead is a copy of
//! [`ReaderState`] and never needs a seekable source.

use crate::bits::{low_mask, ReadBits, WriteBits};
use crate::error::{BitResult, BitstreamError};

/// Zero bytes that arm the escape check.
const ESCAPE_ZERO_RUN: u8 = 2;
/// The emulation prevention byte.
const ESCAPE_BYTE: u8 = 0x03;

/// Snapshot of an [`EbspReader`] cursor.
///
/// Obtained with [`EbspReader::state`] and handed back to
/// [`EbspReader::restore`]; only meaningful for the reader it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderState {
    /// Raw bytes consumed, escapes included.
    pos: usize,
    /// Bits loaded but not yet delivered, right-aligned.
    acc: u64,
    buffered: u8,
    /// Consecutive zero bytes delivered.
    zero_run: u8,
    escapes: usize,
    fault: Option<BitstreamError>,
}

/// Bit reader over one escaped NAL unit.
#[derive(Debug, Clone)]
pub struct EbspReader<'a> {
    data: &'a [u8],
    st: ReaderState,
}

impl<'a> EbspReader<'a> {
    /// Create a reader positioned on the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            st: ReaderState {
                pos: 0,
                acc: 0,
                buffered: 0,
                zero_run: 0,
                escapes: 0,
                fault: None,
            },
        }
    }

    /// The raw bytes being read.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Capture the cursor.
    pub fn state(&self) -> ReaderState {
        self.st
    }

    /// Return to a captured cursor, fault included.
    pub fn restore(&mut self, state: ReaderState) {
        self.st = state;
    }

    /// The fault that stopped this reader, if any.
    pub fn fault(&self) -> Option<BitstreamError> {
        self.st.fault
    }

    /// Forget a recorded fault so reading can resume.
    pub fn clear_fault(&mut self) {
        self.st.fault = None;
    }

    /// Raw bytes consumed, emulation prevention bytes included.
    ///
    /// A byte counts as consumed as soon as any of its bits has been read.
    pub fn bytes_read(&self) -> usize {
        self.st.pos
    }

    /// Bits already taken from the current byte (0..=7).
    pub fn bits_read_in_current_byte(&self) -> u8 {
        if self.st.buffered == 0 {
            0
        } else {
            8 - self.st.buffered
        }
    }

    /// Emulation prevention bytes skipped so far.
    pub fn escapes_removed(&self) -> usize {
        self.st.escapes
    }

    /// Check whether every bit of the unit has been delivered.
    pub fn is_exhausted(&self) -> bool {
        self.st.buffered == 0 && self.st.pos >= self.data.len()
    }

    /// Whether syntax data remains before `rbsp_trailing_bits`.
    ///
    /// Looks ahead for a one bit past the next one bit; the cursor is left
    /// untouched and end of data is not reported as an error. A faulted
    /// reader has no more data.
    pub fn more_rbsp_data(&mut self) -> bool {
        if self.st.fault.is_some() {
            return false;
        }
        let snapshot = self.st;
        let more = match self.read_bits(1) {
            Ok(0) => true,
            Ok(_) => loop {
                match self.read_bits(1) {
                    Ok(0) => continue,
                    Ok(_) => break true,
                    Err(_) => break false,
                }
            },
            Err(_) => false,
        };
        self.st = snapshot;
        more
    }

    /// Consume `rbsp_trailing_bits`: a one bit, then zeros up to the end of
    /// the unit.
    ///
    /// On success the reader is exhausted, so a further read fails with
    /// [`BitstreamError::UnexpectedEnd`].
    pub fn read_rbsp_trailing_bits(&mut self) -> BitResult<()> {
        if self.read_bits(1)? != 1 {
            return Err(self.fail(BitstreamError::InvalidTrailingBits));
        }
        while !self.is_exhausted() {
            if self.read_bits(1)? != 0 {
                return Err(self.fail(BitstreamError::InvalidTrailingBits));
            }
        }
        Ok(())
    }

    /// Next decoded byte; a following escape byte is consumed eagerly.
    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.st.pos)?;
        self.st.pos += 1;
        if byte == 0 {
            self.st.zero_run = self.st.zero_run.saturating_add(1);
        } else {
            self.st.zero_run = 0;
        }
        if self.st.zero_run == ESCAPE_ZERO_RUN && self.data.get(self.st.pos) == Some(&ESCAPE_BYTE) {
            self.st.pos += 1;
            self.st.escapes += 1;
            self.st.zero_run = 0;
        }
        Some(byte)
    }
}

impl ReadBits for EbspReader<'_> {
    fn read_bits(&mut self, n: u8) -> BitResult<u32> {
        if let Some(fault) = self.st.fault {
            return Err(fault);
        }
        if n > 32 {
            return Err(self.fail(BitstreamError::InvalidBitCount(n)));
        }
        if n == 0 {
            return Ok(0);
        }

        let before = self.st;
        while self.st.buffered < n {
            match self.next_byte() {
                Some(byte) => {
                    self.st.acc = (self.st.acc << 8) | u64::from(byte);
                    self.st.buffered += 8;
                }
                None => {
                    self.st = before;
                    return Err(self.fail(BitstreamError::UnexpectedEnd));
                }
            }
        }

        self.st.buffered -= n;
        let value = (self.st.acc >> self.st.buffered) & low_mask(n);
        self.st.acc &= low_mask(self.st.buffered);
        Ok(value as u32)
    }

    fn bit_position(&self) -> u64 {
        (self.st.pos - self.st.escapes) as u64 * 8 - u64::from(self.st.buffered)
    }

    fn bits_left(&self) -> u64 {
        (self.data.len() - self.st.pos) as u64 * 8 + u64::from(self.st.buffered)
    }

    fn fail(&mut self, error: BitstreamError) -> BitstreamError {
        *self.st.fault.get_or_insert(error)
    }
}

/// Bit writer producing an escaped NAL unit.
#[derive(Debug, Clone, Default)]
pub struct EbspWriter {
    out: Vec<u8>,
    acc: u64,
    buffered: u8,
    zero_run: u8,
    bytes_emitted: u64,
    escapes: usize,
}

impl EbspWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `bytes` output bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            out: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    /// Bits not yet flushed to a whole byte (0..=7).
    pub fn bits_in_buffer(&self) -> u8 {
        self.buffered
    }

    /// Escaped bytes flushed so far.
    pub fn data(&self) -> &[u8] {
        &self.out
    }

    /// Emulation prevention bytes inserted so far.
    pub fn escapes_inserted(&self) -> usize {
        self.escapes
    }

    /// Zero-pad a partial last byte and return the escaped unit.
    pub fn finish(mut self) -> Vec<u8> {
        if self.buffered > 0 {
            let byte = (self.acc << (8 - self.buffered)) as u8;
            self.buffered = 0;
            self.emit(byte);
        }
        self.out
    }

    fn emit(&mut self, byte: u8) {
        if self.zero_run == ESCAPE_ZERO_RUN && byte <= ESCAPE_BYTE {
            self.out.push(ESCAPE_BYTE);
            self.escapes += 1;
            self.zero_run = 0;
        }
        self.out.push(byte);
        self.bytes_emitted += 1;
        if byte == 0 {
            self.zero_run = self.zero_run.saturating_add(1);
        } else {
            self.zero_run = 0;
        }
    }
}

impl WriteBits for EbspWriter {
    fn write_bits(&mut self, value: u32, n: u8) -> BitResult<()> {
        if n > 32 {
            return Err(BitstreamError::InvalidBitCount(n));
        }
        self.acc = (self.acc << n) | (u64::from(value) & low_mask(n));
        self.buffered += n;
        while self.buffered >= 8 {
            self.buffered -= 8;
            let byte = (self.acc >> self.buffered) as u8;
            self.acc &= low_mask(self.buffered);
            self.emit(byte);
        }
        Ok(())
    }

    fn bits_written(&self) -> u64 {
        self.bytes_emitted * 8 + u64::from(self.buffered)
    }
}
