#![no_main]

//! Fuzz target for VVC/H.266 NAL header and SPS prefix parsing.

use isobits_core::nalu::split_annex_b;
use isobits_vvc::{nalu_type, NalUnitType, Sps};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    for nalu in split_annex_b(data).into_iter().chain(std::iter::once(data)) {
        if nalu_type(nalu) != Some(NalUnitType::SpsNut) {
            continue;
        }
        let sps = match Sps::parse(nalu) {
            Ok(sps) => sps,
            Err(e) => match e.into_partial() {
                Some(sps) => sps,
                None => continue,
            },
        };
        let _ = sps.width();
        let _ = sps.height();
        let _ = sps.pic_width_max_in_ctus();
        let _ = sps.pic_height_max_in_ctus();
        let _ = sps.bit_depth();
        let _ = sps.level().map(|l| l.to_string());
        if let Some(gci) = sps
            .profile_tier_level
            .as_ref()
            .and_then(|p| p.general_constraints_info.as_ref())
        {
            let _ = gci.max_bit_depth();
        }
    }
});
