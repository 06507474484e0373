//! Bitstream engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use isobits_core::golomb::{ExpGolombRead, ExpGolombWrite};
use isobits_core::nalu::{insert_escapes, remove_escapes, split_annex_b};
use isobits_core::{EbspReader, EbspWriter, ReadBits};

/// 64 KiB payload with a zero run every 64 bytes, so escapes are exercised.
fn payload() -> Vec<u8> {
    (0..65536u32)
        .map(|i| if i % 64 < 3 { 0 } else { (i * 31 % 251) as u8 })
        .collect()
}

fn bench_read_bits(c: &mut Criterion) {
    let data = insert_escapes(&payload());
    let mut group = c.benchmark_group("ebsp_reader");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("read_bits_8", |b| {
        b.iter(|| {
            let mut reader = EbspReader::new(black_box(&data));
            let mut sum = 0u64;
            while let Ok(v) = reader.read_bits(8) {
                sum += u64::from(v);
            }
            sum
        })
    });

    group.bench_function("read_bits_13", |b| {
        b.iter(|| {
            let mut reader = EbspReader::new(black_box(&data));
            let mut sum = 0u64;
            while let Ok(v) = reader.read_bits(13) {
                sum += u64::from(v);
            }
            sum
        })
    });

    group.finish();
}

fn bench_exp_golomb(c: &mut Criterion) {
    let mut writer = EbspWriter::new();
    for i in 0..20_000u32 {
        writer.write_ue(i % 300).unwrap();
        writer.write_se((i % 61) as i32 - 30).unwrap();
    }
    let data = writer.finish();

    c.bench_function("exp_golomb_decode_40k", |b| {
        b.iter(|| {
            let mut reader = EbspReader::new(black_box(&data));
            for _ in 0..20_000 {
                black_box(reader.read_ue().unwrap());
                black_box(reader.read_se().unwrap());
            }
        })
    });
}

fn bench_escapes(c: &mut Criterion) {
    let rbsp = payload();
    let ebsp = insert_escapes(&rbsp);

    c.bench_function("insert_escapes_64k", |b| {
        b.iter(|| insert_escapes(black_box(&rbsp)))
    });

    c.bench_function("remove_escapes_64k", |b| {
        b.iter(|| remove_escapes(black_box(&ebsp)))
    });
}

fn bench_split_annex_b(c: &mut Criterion) {
    let mut stream = Vec::new();
    for i in 0..1000u32 {
        stream.extend_from_slice(&[0, 0, 0, 1, 0x65]);
        stream.extend((0..200u32).map(|j| ((i + j) % 200 + 4) as u8));
    }

    c.bench_function("split_annex_b_1000_units", |b| {
        b.iter(|| split_annex_b(black_box(&stream)).len())
    });
}

criterion_group!(
    benches,
    bench_read_bits,
    bench_exp_golomb,
    bench_escapes,
    bench_split_annex_b
);
criterion_main!(benches);
