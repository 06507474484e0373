//! HEVC (H.265) parameter-set and slice-header parsing.
//!
//! This crate provides:
//! - NAL unit header and type classification
//! - Profile, tier and level with RFC 6381 codec strings
//! - VPS, SPS (VUI, HRD, scaling lists, reference picture sets) and PPS
//! - Slice segment header parsing against caller-held parameter sets
//! - A parameter-set store

use std::collections::HashMap;

pub mod nal;
pub mod pps;
pub mod ptl;
pub mod rps;
pub mod scaling;
pub mod slice;
pub mod sps;
pub mod store;
pub mod vps;
pub mod vui;

pub use nal::{NalUnitHeader, NalUnitType};
pub use pps::{DeblockingControl, Pps, PpsExtensionFlags, PpsRangeExtension, TileLayout};
pub use ptl::{HevcLevel, HevcProfile, HevcTier, ProfileInfo, ProfileTierLevel};
pub use rps::ShortTermRefPicSet;
pub use scaling::{ScalingList, ScalingListData};
pub use slice::{slice_type_of, LongTermRef, PredWeightTable, SliceSegmentHeader, SliceType};
pub use sps::{PcmParameters, Sps, SpsExtensionFlags};
pub use store::{ParameterSets, StoreConfig};
pub use vps::{SubLayerOrdering, Vps};
pub use vui::{HrdParameters, TimingInfo, VuiParameters, Window};

/// VPS entries keyed by `vps_video_parameter_set_id`.
pub type VpsMap = HashMap<u32, Vps>;

/// SPS entries keyed by `sps_seq_parameter_set_id`.
pub type SpsMap = HashMap<u32, Sps>;

/// PPS entries keyed by `pps_pic_parameter_set_id`.
pub type PpsMap = HashMap<u32, Pps>;

/// RFC 6381 codec string for an `hvc1` sample entry, e.g. `hvc1.1.6.L93.B0`.
pub fn codec_string(sps: &Sps) -> String {
    sps.profile_tier_level.codec_string("hvc1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_string_1080p() {
        let sps = Sps::parse(
            &hex::decode(
                "420101016000000300900000030000030078a003c08010e596566924cae010000003001000000301e080",
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(codec_string(&sps), "hvc1.1.6.L120.90");
    }
}
