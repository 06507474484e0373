//! AVC (H.264) parameter-set and slice-header parsing.
//!
//! This crate provides:
//! - NAL unit header and type classification
//! - SPS parsing with VUI, HRD and scaling lists
//! - PPS parsing including slice groups
//! - Slice header parsing against caller-held parameter sets
//! - A parameter-set store and RFC 6381 codec strings

use std::collections::HashMap;
use std::fmt;

pub mod nal;
pub mod pps;
pub mod slice;
pub mod sps;
pub mod store;

pub use nal::{NalHeader, NalUnitType};
pub use pps::{PictureParameterSet, SliceGroupMap};
pub use slice::{slice_type_of, DecRefPicMarking, SliceHeader, SliceType};
pub use sps::{HrdParameters, ScalingList, SequenceParameterSet, VuiParameters};
pub use store::{ParameterSets, StoreConfig};

/// SPS entries keyed by `seq_parameter_set_id`.
pub type SpsMap = HashMap<u32, SequenceParameterSet>;

/// PPS entries keyed by `pic_parameter_set_id`.
pub type PpsMap = HashMap<u32, PictureParameterSet>;

/// H.264 profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AvcProfile {
    /// Baseline profile (no B-frames, CAVLC only).
    Baseline = 66,
    /// Main profile.
    Main = 77,
    /// Extended profile.
    Extended = 88,
    /// High profile.
    High = 100,
    /// High 10 profile (10-bit).
    High10 = 110,
    /// High 4:2:2 profile.
    High422 = 122,
    /// High 4:4:4 Predictive profile.
    High444 = 244,
    /// CAVLC 4:4:4 Intra profile.
    Cavlc444 = 44,
    /// Scalable Baseline (SVC).
    ScalableBaseline = 83,
    /// Scalable High (SVC).
    ScalableHigh = 86,
    /// Multiview High (MVC).
    MultiviewHigh = 118,
    /// Stereo High (MVC).
    StereoHigh = 128,
}

impl AvcProfile {
    /// Create from profile_idc value.
    pub fn from_idc(idc: u8) -> Option<Self> {
        match idc {
            66 => Some(Self::Baseline),
            77 => Some(Self::Main),
            88 => Some(Self::Extended),
            100 => Some(Self::High),
            110 => Some(Self::High10),
            122 => Some(Self::High422),
            244 => Some(Self::High444),
            44 => Some(Self::Cavlc444),
            83 => Some(Self::ScalableBaseline),
            86 => Some(Self::ScalableHigh),
            118 => Some(Self::MultiviewHigh),
            128 => Some(Self::StereoHigh),
            _ => None,
        }
    }

    /// The profile_idc value.
    pub fn idc(self) -> u8 {
        self as u8
    }

    /// Check if B-frames are allowed in this profile.
    pub fn allows_b_frames(self) -> bool {
        !matches!(self, Self::Baseline | Self::ScalableBaseline | Self::Cavlc444)
    }

    /// Check if CABAC is allowed in this profile.
    pub fn allows_cabac(self) -> bool {
        !matches!(
            self,
            Self::Baseline | Self::Extended | Self::ScalableBaseline | Self::Cavlc444
        )
    }
}

/// H.264 level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AvcLevel {
    /// Level value (e.g., 31 = 3.1, 40 = 4.0).
    pub value: u8,
}

impl AvcLevel {
    /// Create a level from the level_idc value.
    pub fn from_idc(idc: u8) -> Self {
        Self { value: idc }
    }

    /// Get the maximum macroblocks per second for this level.
    pub fn max_mbps(&self) -> u32 {
        match self.value {
            9 | 10 => 1485,
            11 => 3000,
            12 => 6000,
            13 | 20 => 11880,
            21 => 19800,
            22 => 20250,
            30 => 40500,
            31 => 108000,
            32 => 216000,
            40 | 41 => 245760,
            42 => 522240,
            50 => 589824,
            51 => 983040,
            52 => 2073600,
            60 | 61 => 4177920,
            62 => 8355840,
            _ => 245760,
        }
    }

    /// Get the maximum frame size in macroblocks for this level.
    pub fn max_fs(&self) -> u32 {
        match self.value {
            9 | 10 => 99,
            11..=20 => 396,
            21 => 792,
            22 | 30 => 1620,
            31 => 3600,
            32 => 5120,
            40 | 41 => 8192,
            42 => 8704,
            50 => 22080,
            51 | 52 => 36864,
            60..=62 => 139264,
            _ => 8192,
        }
    }

    /// Get the maximum decoded picture buffer size in macroblocks.
    pub fn max_dpb_mbs(&self) -> u32 {
        match self.value {
            9 | 10 => 396,
            11 => 900,
            12 | 13 | 20 => 2376,
            21 => 4752,
            22 | 30 => 8100,
            31 => 18000,
            32 => 20480,
            40 | 41 => 32768,
            42 => 34816,
            50 => 110400,
            51 | 52 => 184320,
            60..=62 => 696320,
            _ => 32768,
        }
    }
}

impl fmt::Display for AvcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            9 => write!(f, "1b"),
            v => write!(f, "{}.{}", v / 10, v % 10),
        }
    }
}

/// RFC 6381 codec string, e.g. `avc1.640020`.
pub fn codec_string(sps: &SequenceParameterSet) -> String {
    format!(
        "avc1.{:02x}{:02x}{:02x}",
        sps.profile_idc, sps.constraint_set_flags, sps.level_idc
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile() {
        assert_eq!(AvcProfile::from_idc(100), Some(AvcProfile::High));
        assert_eq!(AvcProfile::High.idc(), 100);
        assert!(!AvcProfile::Baseline.allows_b_frames());
        assert!(AvcProfile::Main.allows_cabac());
        assert_eq!(AvcProfile::from_idc(1), None);
    }

    #[test]
    fn test_level() {
        let level = AvcLevel::from_idc(31);
        assert_eq!(level.to_string(), "3.1");
        assert_eq!(level.max_fs(), 3600);
        assert_eq!(AvcLevel::from_idc(9).to_string(), "1b");
        assert_eq!(AvcLevel::from_idc(40).max_dpb_mbs(), 32768);
    }
}
