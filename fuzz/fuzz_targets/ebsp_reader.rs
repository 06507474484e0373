#![no_main]

//! Fuzz target for the emulation-prevention reader and writer.
//!
//! Drives an `EbspReader` through arbitrary operations, including
//! speculative reads that are rolled back, and checks that every escaped
//! stream the writer produces reads back to the same bits.

use arbitrary::Arbitrary;
use isobits_core::{EbspReader, EbspWriter, ExpGolombRead, ExpGolombWrite, ReadBits, WriteBits};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct EbspInput {
    data: Vec<u8>,
    operations: Vec<ReadOperation>,
    values: Vec<(u32, u8)>,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum ReadOperation {
    ReadBits(u8),
    ReadBitsU64(u8),
    ReadUe,
    ReadSe,
    Skip(u16),
    ByteAlign,
    MoreRbspData,
    TrailingBits,
    /// Read `n` bits, then roll the reader back.
    Lookahead(u8),
}

fuzz_target!(|input: EbspInput| {
    if input.data.len() > 64 * 1024 || input.operations.len() > 4096 {
        return;
    }

    let mut reader = EbspReader::new(&input.data);
    for op in &input.operations {
        let before = reader.bit_position();
        match *op {
            ReadOperation::ReadBits(n) => {
                let _ = reader.read_bits(n % 33);
            }
            ReadOperation::ReadBitsU64(n) => {
                let _ = reader.read_bits_u64(n % 65);
            }
            ReadOperation::ReadUe => {
                let _ = reader.read_ue();
            }
            ReadOperation::ReadSe => {
                let _ = reader.read_se();
            }
            ReadOperation::Skip(n) => {
                let _ = reader.skip_bits(u64::from(n));
            }
            ReadOperation::ByteAlign => {
                let _ = reader.byte_align();
            }
            ReadOperation::MoreRbspData => {
                let position = reader.bit_position();
                let _ = reader.more_rbsp_data();
                assert_eq!(reader.bit_position(), position);
            }
            ReadOperation::TrailingBits => {
                let _ = reader.read_rbsp_trailing_bits();
            }
            ReadOperation::Lookahead(n) => {
                let state = reader.state();
                let _ = reader.read_bits(n % 33);
                reader.restore(state);
                assert_eq!(reader.bit_position(), before);
            }
        }
        assert!(reader.bit_position() >= before);
        assert!(reader.bytes_read() <= input.data.len());
    }

    // Writer round trip.
    let mut writer = EbspWriter::new();
    let mut written = Vec::new();
    for &(value, n) in input.values.iter().take(1024) {
        let n = n % 33;
        let value = if n == 32 { value } else { value & ((1u32 << n) - 1) };
        if n % 2 == 0 {
            writer.write_bits(value, n).unwrap();
            written.push((value, n, false));
        } else {
            writer.write_ue(value).unwrap();
            written.push((value, n, true));
        }
    }
    writer.write_rbsp_trailing_bits().unwrap();
    let escaped = writer.finish();
    assert!(!escaped.windows(3).any(|w| w[0] == 0 && w[1] == 0 && w[2] <= 2));

    let mut reader = EbspReader::new(&escaped);
    for (value, n, golomb) in written {
        if golomb {
            assert_eq!(reader.read_ue().unwrap(), value);
        } else {
            assert_eq!(reader.read_bits(n).unwrap(), value);
        }
    }
    reader.read_rbsp_trailing_bits().unwrap();
});
