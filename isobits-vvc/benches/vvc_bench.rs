//! VVC SPS parsing benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use isobits_vvc::{NalUnitHeader, Sps};

const SPS_1080P: &str = "0079000d02438000000f02004391a9";

fn bench_nal_header(c: &mut Criterion) {
    let nalu = hex::decode(SPS_1080P).unwrap();
    c.bench_function("vvc_nal_header_parse", |b| {
        b.iter(|| NalUnitHeader::from_nalu(black_box(&nalu)).unwrap())
    });
}

fn bench_sps(c: &mut Criterion) {
    let nalu = hex::decode(SPS_1080P).unwrap();
    c.bench_function("vvc_sps_parse_1080p", |b| {
        b.iter(|| {
            Sps::parse(black_box(&nalu))
                .unwrap_err()
                .into_partial()
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_nal_header, bench_sps);
criterion_main!(benches);
