//! Integration tests for the HEVC parsers.
//!
//! The VPS/SPS/PPS vectors come from a 1920x1080 Main profile stream; the
//! slice segments are coded against those parameter sets.

use isobits_core::nalu::{annex_b_to_length_prefixed, split_annex_b, split_length_prefixed};
use isobits_core::{EbspWriter, Error, ExpGolombWrite, ParseError, WriteBits};
use isobits_hevc::{
    codec_string, slice_type_of, HevcLevel, HevcProfile, HevcTier, NalUnitHeader, NalUnitType,
    ParameterSets, Pps, PpsMap, SliceSegmentHeader, SliceType, Sps, SpsMap, Vps,
};
use pretty_assertions::assert_eq;

const VPS_1080P: &str = "40010c01ffff016000000300900000030000030078959809";
const SPS_1080P: &str =
    "420101016000000300900000030000030078a003c08010e596566924cae010000003001000000301e080";
const PPS_1080P: &str = "4401c172b46240";
const IDR_SLICE: &str = "2601af298a7cebc8af12";
const P_SLICE: &str = "020143c814fada4772612408d33780";
/// A P slice whose 32-bit entry point offset forces an emulation prevention
/// byte into the header.
const ESCAPED_P_SLICE: &str = "0201400800b866408000000300021234";

fn maps() -> (SpsMap, PpsMap) {
    let sps = Sps::parse(&hex::decode(SPS_1080P).unwrap()).unwrap();
    let pps = Pps::parse(&hex::decode(PPS_1080P).unwrap()).unwrap();
    let mut sps_map = SpsMap::new();
    sps_map.insert(0, sps);
    let mut pps_map = PpsMap::new();
    pps_map.insert(0, pps);
    (sps_map, pps_map)
}

// ============================================================================
// Parameter Set Tests
// ============================================================================

#[test]
fn test_vps_1080p() {
    let vps = Vps::parse(&hex::decode(VPS_1080P).unwrap()).unwrap();
    assert_eq!(vps.vps_video_parameter_set_id, 0);
    assert_eq!(vps.vps_max_sub_layers_minus1, 0);
    assert_eq!(vps.profile_tier_level.profile(), Some(HevcProfile::Main));
    assert_eq!(vps.profile_tier_level.level(), HevcLevel::from_idc(120));
}

#[test]
fn test_sps_1080p() {
    let (sps_map, _) = maps();
    let sps = &sps_map[&0];
    assert_eq!(sps.profile(), Some(HevcProfile::Main));
    assert_eq!(sps.tier(), HevcTier::Main);
    assert_eq!(sps.level().to_string(), "4.0");
    assert!(sps.profile_tier_level.general_profile.is_compatible_with(2));
    assert_eq!((sps.width(), sps.height()), (1920, 1080));
    assert_eq!(sps.ctb_size(), 64);
    assert_eq!(sps.sar(), None);
    assert_eq!(sps.frame_rate(), Some((30, 1)));
    assert_eq!(codec_string(sps), "hvc1.1.6.L120.90");
    assert_eq!(
        sps.profile_tier_level.codec_string("hev1"),
        "hev1.1.6.L120.90"
    );
}

#[test]
fn test_sps_every_prefix_fails_cleanly() {
    let data = hex::decode(SPS_1080P).unwrap();
    for len in 0..data.len() {
        match Sps::parse(&data[..len]) {
            Err(ParseError::Failed(e)) => assert!(
                e.is_truncation() || matches!(e, Error::Format { .. }),
                "prefix {len}: {e}"
            ),
            other => panic!("prefix {len}: {other:?}"),
        }
    }
}

#[test]
fn test_pps_1080p() {
    let pps = Pps::parse(&hex::decode(PPS_1080P).unwrap()).unwrap();
    assert_eq!(pps.pps_pic_parameter_set_id, 0);
    assert!(pps.entropy_coding_sync_enabled_flag);
    assert!(pps.weighted_pred_flag);
    assert_eq!(pps.init_qp(), 26);
}

// ============================================================================
// Slice Segment Header Tests
// ============================================================================

#[test]
fn test_slice_headers_against_stream_parameter_sets() {
    let (sps_map, pps_map) = maps();

    let idr = SliceSegmentHeader::parse(&hex::decode(IDR_SLICE).unwrap(), &sps_map, &pps_map)
        .unwrap();
    assert_eq!(idr.slice_type, Some(SliceType::I));
    assert_eq!(idr.entry_point_offset_minus1, vec![499, 700]);

    let p = SliceSegmentHeader::parse(&hex::decode(P_SLICE).unwrap(), &sps_map, &pps_map)
        .unwrap();
    assert_eq!(p.slice_type, Some(SliceType::P));
    assert_eq!(p.num_pic_total_curr, 2);
    assert!(p.pred_weight_table.is_some());
}

#[test]
fn test_slice_header_with_emulation_prevention() {
    let (sps_map, pps_map) = maps();
    let nalu = hex::decode(ESCAPED_P_SLICE).unwrap();
    let sh = SliceSegmentHeader::parse(&nalu, &sps_map, &pps_map).unwrap();
    assert_eq!(sh.slice_type, Some(SliceType::P));
    assert_eq!(sh.slice_pic_order_cnt_lsb, 0);
    assert_eq!(sh.short_term_ref_pic_set_size_bits, 6);
    assert_eq!(sh.offset_len_minus1, 31);
    assert_eq!(sh.entry_point_offset_minus1, vec![0]);
    // Bit counts exclude the escape; the byte offset includes it.
    assert_eq!(sh.size_bits, 88);
    assert_eq!(sh.data_offset, 14);
    assert_eq!(&nalu[sh.data_offset..], &[0x12, 0x34]);
}

#[test]
fn test_slice_type_without_full_parse() {
    let (sps_map, pps_map) = maps();
    let p = hex::decode(P_SLICE).unwrap();
    assert_eq!(
        slice_type_of(&p, &sps_map, &pps_map).unwrap(),
        Some(SliceType::P)
    );
    let err = slice_type_of(&p, &sps_map, &PpsMap::new()).unwrap_err();
    assert!(err.is_missing_reference());
}

// ============================================================================
// Store Tests
// ============================================================================

fn annex_b_stream() -> Vec<u8> {
    hex::decode(format!(
        "00000001{VPS_1080P}00000001{SPS_1080P}00000001{PPS_1080P}000001{IDR_SLICE}000001{P_SLICE}"
    ))
    .unwrap()
}

#[test]
fn test_store_from_annex_b_stream() {
    let stream = annex_b_stream();
    let mut store = ParameterSets::new();
    let mut slices = Vec::new();
    for nalu in split_annex_b(&stream) {
        let nal_type = store.add_nalu(nalu).unwrap();
        if nal_type.has_slice_header() {
            slices.push(store.parse_slice_header(nalu).unwrap());
        }
    }

    assert!(store.vps(0).is_some());
    assert_eq!(store.active_sps().map(|s| (s.width(), s.height())), Some((1920, 1080)));
    assert!(store.pps(0).is_some());
    let types: Vec<_> = slices.iter().map(|s| s.slice_type).collect();
    assert_eq!(types, vec![Some(SliceType::I), Some(SliceType::P)]);
    assert_eq!(slices[0].nal_unit_type, NalUnitType::IdrWRadl);
    assert_eq!(slices[1].nal_unit_type, NalUnitType::TrailR);
}

#[test]
fn test_store_from_length_prefixed_sample() {
    let sample = annex_b_to_length_prefixed(&annex_b_stream(), 4).unwrap();
    let nalus = split_length_prefixed(&sample, 4).unwrap();
    assert_eq!(nalus.len(), 5);

    let headers: Vec<_> = nalus
        .iter()
        .map(|n| NalUnitHeader::from_nalu(n).unwrap().nal_unit_type)
        .collect();
    assert_eq!(
        headers,
        vec![
            NalUnitType::VpsNut,
            NalUnitType::SpsNut,
            NalUnitType::PpsNut,
            NalUnitType::IdrWRadl,
            NalUnitType::TrailR,
        ]
    );

    let mut store = ParameterSets::new();
    for nalu in &nalus[..3] {
        store.add_nalu(nalu).unwrap();
    }
    let sh = store.parse_slice_header(nalus[4]).unwrap();
    assert_eq!(sh.slice_segment_address, 30);
}

#[test]
fn test_slice_before_parameter_sets() {
    let store = ParameterSets::new();
    let err = store
        .parse_slice_header(&hex::decode(IDR_SLICE).unwrap())
        .unwrap_err();
    assert_eq!(err, Error::missing("slice segment header", "PPS", 0));
}

// ============================================================================
// Parameter Set Extension Tests
// ============================================================================

/// The stream PPS with `pps_cb_qp_offset` replaced, followed by whatever
/// `extension` writes from `pps_extension_present_flag` on.
fn stream_pps_with(cb_qp_offset: i32, extension: impl FnOnce(&mut EbspWriter)) -> Vec<u8> {
    let mut w = EbspWriter::new();
    w.write_bits(0x4401, 16).unwrap();
    w.write_ue(0).unwrap();
    w.write_ue(0).unwrap();
    w.write_bits(0, 5).unwrap();
    w.write_flag(true).unwrap(); // sign_data_hiding_enabled_flag
    w.write_flag(false).unwrap();
    w.write_ue(0).unwrap();
    w.write_ue(0).unwrap();
    w.write_se(0).unwrap();
    w.write_bits(0, 2).unwrap();
    w.write_flag(true).unwrap(); // cu_qp_delta_enabled_flag
    w.write_ue(1).unwrap();
    w.write_se(cb_qp_offset).unwrap();
    w.write_se(0).unwrap();
    w.write_flag(false).unwrap();
    w.write_flag(true).unwrap(); // weighted_pred_flag
    w.write_bits(0, 3).unwrap();
    w.write_flag(true).unwrap(); // entropy_coding_sync_enabled_flag
    w.write_flag(true).unwrap(); // pps_loop_filter_across_slices_enabled_flag
    w.write_bits(0, 3).unwrap();
    w.write_ue(0).unwrap();
    w.write_flag(false).unwrap();
    extension(&mut w);
    w.write_rbsp_trailing_bits().unwrap();
    w.finish()
}

fn no_extension(w: &mut EbspWriter) {
    w.write_flag(false).unwrap();
}

/// An IDR slice segment against the stream parameter sets; `tail` writes the
/// fields between `slice_qp_delta` and the loop filter flag.
fn idr_slice_with(tail: impl FnOnce(&mut EbspWriter)) -> Vec<u8> {
    let mut w = EbspWriter::new();
    w.write_bits(0x2601, 16).unwrap();
    w.write_flag(true).unwrap();
    w.write_flag(false).unwrap();
    w.write_ue(0).unwrap();
    w.write_ue(2).unwrap();
    w.write_flag(true).unwrap();
    w.write_flag(true).unwrap();
    w.write_se(-2).unwrap();
    tail(&mut w);
    w.write_flag(false).unwrap();
    w.write_ue(0).unwrap();
    w.write_rbsp_trailing_bits().unwrap();
    w.write_bits(0xCD, 8).unwrap();
    w.finish()
}

#[test]
fn test_stream_pps_rebuilt() {
    assert_eq!(hex::encode(stream_pps_with(0, no_extension)), PPS_1080P);
}

#[test]
fn test_range_extension_pps_then_slice() {
    let pps = stream_pps_with(0, |w| {
        w.write_flag(true).unwrap(); // pps_extension_present_flag
        w.write_bits(0b1000_0000, 8).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(true).unwrap(); // chroma_qp_offset_list_enabled_flag
        w.write_ue(0).unwrap();
        w.write_ue(0).unwrap();
        w.write_se(3).unwrap();
        w.write_se(-3).unwrap();
        w.write_ue(0).unwrap();
        w.write_ue(0).unwrap();
    });
    let mut store = ParameterSets::new();
    store.add_sps(&hex::decode(SPS_1080P).unwrap()).unwrap();
    assert_eq!(store.add_pps(&pps).unwrap(), 0);
    let ext = store.pps(0).unwrap().pps_range_extension.as_ref().unwrap();
    assert_eq!(ext.cb_qp_offset_list, vec![3]);
    assert_eq!(ext.cr_qp_offset_list, vec![-3]);

    let nalu = idr_slice_with(|w| w.write_flag(true).unwrap());
    let sh = store.parse_slice_header(&nalu).unwrap();
    assert_eq!(sh.slice_type, Some(SliceType::I));
    assert!(sh.cu_chroma_qp_offset_enabled_flag);
    assert_eq!(sh.slice_qp_delta, -2);
    assert_eq!(&nalu[sh.data_offset..], &[0xCD]);
}

#[test]
fn test_scc_pps_slice_is_unsupported() {
    let pps = stream_pps_with(0, |w| {
        w.write_flag(true).unwrap();
        w.write_bits(0b0001_0000, 8).unwrap();
        w.write_bits(0x5A, 8).unwrap();
    });
    assert!(matches!(Pps::parse(&pps), Err(ParseError::Incomplete { .. })));

    let mut store = ParameterSets::new();
    store.add_sps(&hex::decode(SPS_1080P).unwrap()).unwrap();
    store.add_pps(&pps).unwrap();
    let nalu = idr_slice_with(|_| {});
    let err = store.parse_slice_header(&nalu).unwrap_err();
    assert!(err.is_unsupported(), "{err}");
    assert_eq!(
        slice_type_of(&nalu, store.sps_map(), store.pps_map()).unwrap(),
        Some(SliceType::I)
    );
}

#[test]
fn test_out_of_range_qp_offset_is_kept() {
    let pps = Pps::parse(&stream_pps_with(13, no_extension)).unwrap();
    assert_eq!(pps.pps_cb_qp_offset, 13);

    let mut store = ParameterSets::new();
    store.add_sps(&hex::decode(SPS_1080P).unwrap()).unwrap();
    store.add_pps(&stream_pps_with(-40, no_extension)).unwrap();
    assert_eq!(store.pps(0).map(|p| p.pps_cb_qp_offset), Some(-40));
    let sh = store.parse_slice_header(&idr_slice_with(|_| {})).unwrap();
    assert_eq!(sh.qp(store.pps(0).unwrap()), 24);
}
