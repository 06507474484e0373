//! AVC parameter-set and slice-header parsing benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use isobits_avc::{PictureParameterSet, PpsMap, SequenceParameterSet, SliceHeader, SpsMap};

const SPS_720P: &str =
    "67640020accac05005bb0169e0000003002000000c9c4c000432380008647c12401cb1c31380";
const PPS_720P: &str = "68e84332c8b0";
const IDR_SLICE_720P: &str = "25888040ffde08e47a7bff05ab";

fn bench_sps(c: &mut Criterion) {
    let nalu = hex::decode(SPS_720P).unwrap();
    c.bench_function("avc_sps_parse_720p", |b| {
        b.iter(|| SequenceParameterSet::parse(black_box(&nalu)).unwrap())
    });
}

fn bench_slice_header(c: &mut Criterion) {
    let sps = SequenceParameterSet::parse(&hex::decode(SPS_720P).unwrap()).unwrap();
    let mut sps_map = SpsMap::new();
    sps_map.insert(sps.sps_id, sps);
    let pps = PictureParameterSet::parse(&hex::decode(PPS_720P).unwrap(), &sps_map).unwrap();
    let mut pps_map = PpsMap::new();
    pps_map.insert(pps.pps_id, pps);
    let nalu = hex::decode(IDR_SLICE_720P).unwrap();

    c.bench_function("avc_slice_header_parse", |b| {
        b.iter(|| SliceHeader::parse(black_box(&nalu), &sps_map, &pps_map).unwrap())
    });
}

criterion_group!(benches, bench_sps, bench_slice_header);
criterion_main!(benches);
