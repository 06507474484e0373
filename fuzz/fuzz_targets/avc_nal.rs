#![no_main]

//! Fuzz target for H.264 parameter-set and slice-header parsing.
//!
//! Splits the input as an Annex B stream, feeds parameter sets to a store
//! and parses every slice header against it.

use arbitrary::Arbitrary;
use isobits_avc::{codec_string, slice_type_of, NalUnitType, ParameterSets, SequenceParameterSet};
use isobits_core::nalu::split_annex_b;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct AvcInput {
    data: Vec<u8>,
    mode: Mode,
}

#[derive(Arbitrary, Debug)]
enum Mode {
    /// Input is a single SPS NAL unit.
    Sps,
    /// Input is an Annex B stream.
    AnnexB,
}

fuzz_target!(|input: AvcInput| {
    if input.data.len() > 1024 * 1024 {
        return;
    }

    match input.mode {
        Mode::Sps => {
            if let Ok(sps) = SequenceParameterSet::parse(&input.data) {
                let _ = sps.width();
                let _ = sps.height();
                let _ = sps.frame_rate();
                let _ = sps.sar();
                let _ = sps.max_dpb_frames();
                let _ = codec_string(&sps);
            }
        }
        Mode::AnnexB => {
            let mut store = ParameterSets::new();
            for nalu in split_annex_b(&input.data) {
                let Ok(nal_type) = store.add_nalu(nalu) else {
                    continue;
                };
                if nal_type.has_slice_header() {
                    let _ = slice_type_of(nalu);
                    if let Ok(header) = store.parse_slice_header(nalu) {
                        if let Some(pps) = store.pps(header.pps_id) {
                            let _ = header.qp(pps);
                        }
                    }
                } else if nal_type == NalUnitType::Sps {
                    let _ = store.active_sps().map(|sps| sps.width());
                }
            }
        }
    }
});
