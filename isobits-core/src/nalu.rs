//! NAL unit framing: Annex B byte streams, length-prefixed samples and
//! escape byte conversion.

use crate::error::{Error, Result};

const START_CODE: [u8; 4] = [0, 0, 0, 1];
const STRUCTURE: &str = "NAL sample";

/// Find the next start code at or after `from`.
///
/// Start codes are 0x000001 or 0x00000001 sequences. Returns the offset of
/// the first zero byte and the start code length.
pub fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let tail = data.get(from..)?;
    tail.windows(3).position(|w| w == [0, 0, 1]).map(|i| {
        let at = from + i;
        if at > from && data[at - 1] == 0 {
            (at - 1, 4)
        } else {
            (at, 3)
        }
    })
}

/// Split an Annex B byte stream into NAL units.
///
/// Start codes are stripped and trailing zero bytes (`trailing_zero_8bits`)
/// are trimmed from each unit. Bytes before the first start code are
/// ignored; empty units are skipped.
pub fn split_annex_b(data: &[u8]) -> Vec<&[u8]> {
    let mut units = Vec::new();
    let Some((first, len)) = find_start_code(data, 0) else {
        return units;
    };

    let mut start = first + len;
    while start <= data.len() {
        let (end, next) = match find_start_code(data, start) {
            Some((at, len)) => (at, Some(at + len)),
            None => (data.len(), None),
        };
        let mut unit = &data[start..end];
        while let [rest @ .., 0] = unit {
            unit = rest;
        }
        if !unit.is_empty() {
            units.push(unit);
        }
        match next {
            Some(n) => start = n,
            None => break,
        }
    }
    units
}

/// Split a sample whose NAL units are prefixed by big-endian lengths of
/// `length_size` bytes (1, 2 or 4).
pub fn split_length_prefixed(sample: &[u8], length_size: usize) -> Result<Vec<&[u8]>> {
    if !matches!(length_size, 1 | 2 | 4) {
        return Err(Error::format(
            STRUCTURE,
            format!("invalid NAL length size {length_size}"),
        ));
    }

    let mut units = Vec::new();
    let mut rest = sample;
    while !rest.is_empty() {
        if rest.len() < length_size {
            return Err(Error::format(STRUCTURE, "truncated NAL length field"));
        }
        let (len_bytes, body) = rest.split_at(length_size);
        let len = len_bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        if len > body.len() {
            return Err(Error::format(
                STRUCTURE,
                format!("NAL length {len} exceeds remaining {} bytes", body.len()),
            ));
        }
        let (unit, tail) = body.split_at(len);
        units.push(unit);
        rest = tail;
    }
    Ok(units)
}

/// Convert an Annex B byte stream into a length-prefixed sample.
pub fn annex_b_to_length_prefixed(data: &[u8], length_size: usize) -> Result<Vec<u8>> {
    if !matches!(length_size, 1 | 2 | 4) {
        return Err(Error::format(
            STRUCTURE,
            format!("invalid NAL length size {length_size}"),
        ));
    }

    let units = split_annex_b(data);
    let mut out = Vec::with_capacity(data.len() + units.len() * length_size);
    for unit in units {
        let len = unit.len() as u64;
        if len >> (8 * length_size) != 0 {
            return Err(Error::format(
                STRUCTURE,
                format!("NAL unit of {len} bytes does not fit a {length_size}-byte length"),
            ));
        }
        out.extend_from_slice(&len.to_be_bytes()[8 - length_size..]);
        out.extend_from_slice(unit);
    }
    Ok(out)
}

/// Convert a length-prefixed sample into an Annex B byte stream with
/// four-byte start codes.
pub fn length_prefixed_to_annex_b(sample: &[u8], length_size: usize) -> Result<Vec<u8>> {
    let units = split_length_prefixed(sample, length_size)?;
    let mut out = Vec::with_capacity(sample.len() + units.len() * 4);
    for unit in units {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(unit);
    }
    Ok(out)
}

/// Remove emulation prevention bytes, turning EBSP into RBSP.
pub fn remove_escapes(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut zeros = 0u8;
    let mut removed = 0usize;

    for &byte in data {
        if zeros == 2 && byte == 0x03 {
            zeros = 0;
            removed += 1;
            continue;
        }
        result.push(byte);
        if byte == 0 {
            zeros = zeros.saturating_add(1);
        } else {
            zeros = 0;
        }
    }

    tracing::trace!(removed, len = data.len(), "Removed emulation prevention bytes");
    result
}

/// Add emulation prevention bytes, turning RBSP into EBSP.
pub fn insert_escapes(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() + data.len() / 100);
    let mut zeros = 0u8;

    for &byte in data {
        if zeros == 2 && byte <= 0x03 {
            result.push(0x03);
            zeros = 0;
        }
        result.push(byte);
        if byte == 0 {
            zeros += 1;
        } else {
            zeros = 0;
        }
    }

    result
}

/// Count the emulation prevention bytes in an escaped payload.
pub fn count_escapes(data: &[u8]) -> usize {
    data.len() - remove_escapes(data).len()
}
