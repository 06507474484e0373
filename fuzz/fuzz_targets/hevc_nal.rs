#![no_main]

//! Fuzz target for HEVC/H.265 NAL unit parsing.
//!
//! Tests the NAL header, VPS, SPS and PPS parsers on raw input, and a full
//! store-driven pass over an Annex B stream including slice segment headers.

use arbitrary::Arbitrary;
use isobits_core::nalu::split_annex_b;
use isobits_hevc::{slice_type_of, NalUnitHeader, ParameterSets, Pps, Sps, Vps};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct HevcNalInput {
    data: Vec<u8>,
    parse_type: HevcParseType,
}

#[derive(Arbitrary, Debug)]
enum HevcParseType {
    NalHeader,
    Vps,
    Sps,
    Pps,
    AnnexB,
}

fuzz_target!(|input: HevcNalInput| {
    if input.data.len() > 1024 * 1024 {
        return;
    }

    match input.parse_type {
        HevcParseType::NalHeader => {
            if let Ok(header) = NalUnitHeader::from_nalu(&input.data) {
                let _ = header.nal_unit_type.is_vcl();
                let _ = header.nal_unit_type.is_irap();
                let _ = header.nal_unit_type.is_reference();
                let _ = header.temporal_id();
            }
        }
        HevcParseType::Vps => {
            if let Ok(vps) = Vps::parse(&input.data) {
                let _ = vps.frame_rate();
                let _ = vps.profile_tier_level.codec_string("hvc1");
            }
        }
        HevcParseType::Sps => {
            // A partial SPS must be as safe to query as a complete one.
            let sps = match Sps::parse(&input.data) {
                Ok(sps) => sps,
                Err(e) => match e.into_partial() {
                    Some(sps) => sps,
                    None => return,
                },
            };
            let _ = sps.width();
            let _ = sps.height();
            let _ = sps.pic_size_in_ctbs();
            let _ = sps.min_tb_size();
            let _ = sps.max_tb_size();
            let _ = sps.frame_rate();
            let _ = isobits_hevc::codec_string(&sps);
        }
        HevcParseType::Pps => {
            if let Ok(pps) = Pps::parse(&input.data) {
                let _ = pps.init_qp();
                let _ = pps.chroma_qp_offset_list_enabled_flag();
                let _ = pps.tiles.as_ref().map(|t| t.num_tiles());
            }
        }
        HevcParseType::AnnexB => {
            let mut store = ParameterSets::new();
            for nalu in split_annex_b(&input.data) {
                let Ok(nal_type) = store.add_nalu(nalu) else {
                    continue;
                };
                if !nal_type.has_slice_header() {
                    continue;
                }
                let _ = slice_type_of(nalu, store.sps_map(), store.pps_map());
                if let Ok(header) = store.parse_slice_header(nalu) {
                    let _ = header.entry_point_offsets().count();
                    if let Some(sps) = store.sps_map().values().next() {
                        let _ = header.short_term_ref_pic_set(sps);
                    }
                    if let Some(pps) = store.pps(header.slice_pic_parameter_set_id) {
                        let _ = header.qp(pps);
                    }
                }
            }
        }
    }
});
