//! `profile_tier_level()`, `general_constraints_info()` and the profile,
//! tier and level types.

use std::fmt;

use isobits_core::{BitResult, ReadBits, Result, ResultExt};

/// VVC profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VvcProfile {
    /// Main 10 profile.
    Main10 = 1,
    /// Main 10 4:4:4 profile.
    Main10_444 = 33,
    /// Main 10 Still Picture profile.
    Main10StillPicture = 65,
    /// Main 10 4:4:4 Still Picture profile.
    Main10_444StillPicture = 97,
    /// Multilayer Main 10 profile.
    MultilayerMain10 = 17,
    /// Multilayer Main 10 4:4:4 profile.
    MultilayerMain10_444 = 49,
    /// Main 12 profile.
    Main12 = 2,
    /// Main 12 Intra profile.
    Main12Intra = 10,
    /// Main 12 4:4:4 profile.
    Main12_444 = 34,
    /// Main 12 4:4:4 Intra profile.
    Main12_444Intra = 42,
    /// Main 16 4:4:4 profile.
    Main16_444 = 36,
    /// Main 16 4:4:4 Intra profile.
    Main16_444Intra = 44,
}

impl VvcProfile {
    /// Create from general_profile_idc.
    pub fn from_idc(idc: u8) -> Option<Self> {
        match idc {
            1 => Some(Self::Main10),
            33 => Some(Self::Main10_444),
            65 => Some(Self::Main10StillPicture),
            97 => Some(Self::Main10_444StillPicture),
            17 => Some(Self::MultilayerMain10),
            49 => Some(Self::MultilayerMain10_444),
            2 => Some(Self::Main12),
            10 => Some(Self::Main12Intra),
            34 => Some(Self::Main12_444),
            42 => Some(Self::Main12_444Intra),
            36 => Some(Self::Main16_444),
            44 => Some(Self::Main16_444Intra),
            _ => None,
        }
    }

    /// The profile_idc value.
    pub fn idc(self) -> u8 {
        self as u8
    }

    /// Check if this is a 4:4:4 profile.
    pub fn is_444(self) -> bool {
        self.idc() & 0x20 != 0
    }

    /// Check if this is a still picture profile.
    pub fn is_still_picture(self) -> bool {
        self.idc() & 0x40 != 0
    }

    /// Check if this is a multilayer profile.
    pub fn is_multilayer(self) -> bool {
        matches!(self, Self::MultilayerMain10 | Self::MultilayerMain10_444)
    }
}

/// VVC tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VvcTier {
    /// Main tier.
    #[default]
    Main,
    /// High tier.
    High,
}

impl VvcTier {
    /// Create from general_tier_flag.
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            Self::High
        } else {
            Self::Main
        }
    }
}

impl fmt::Display for VvcTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "Main"),
            Self::High => write!(f, "High"),
        }
    }
}

/// VVC level; `level_idc` is `16 * major + 3 * minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VvcLevel {
    /// Level value (e.g. 83 for level 5.1).
    pub level_idc: u8,
}

impl VvcLevel {
    /// Level 4.1.
    pub const L4_1: Self = Self { level_idc: 67 };
    /// Level 5.1.
    pub const L5_1: Self = Self { level_idc: 83 };
    /// Level 15.5, no level limits apply.
    pub const L15_5: Self = Self { level_idc: 255 };

    /// Create a level from the IDC value.
    pub fn from_idc(idc: u8) -> Self {
        Self { level_idc: idc }
    }

    /// Get the major level number.
    pub fn major(&self) -> u8 {
        self.level_idc / 16
    }

    /// Get the minor level number.
    pub fn minor(&self) -> u8 {
        (self.level_idc % 16) / 3
    }

    /// MaxLumaPs from Table A.1; `None` for an unknown level.
    pub fn max_luma_picture_size(&self) -> Option<u32> {
        match self.level_idc {
            16 => Some(36_864),
            32 => Some(122_880),
            35 => Some(245_760),
            48 => Some(552_960),
            51 => Some(983_040),
            64 | 67 => Some(2_228_224),
            80 | 83 | 86 => Some(8_912_896),
            96 | 99 | 102 => Some(35_651_584),
            _ => None,
        }
    }
}

impl fmt::Display for VvcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

/// Single-bit constraint flags after the chroma format constraint.
const GCI_OTHER_FLAGS: u8 = 62;

/// Decoded `general_constraints_info()` when `gci_present_flag` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneralConstraintsInfo {
    pub gci_intra_only_constraint_flag: bool,
    pub gci_all_layers_independent_constraint_flag: bool,
    pub gci_one_au_only_constraint_flag: bool,
    /// Upper bound on bit depth is `16 - idc` (0-8).
    pub gci_sixteen_minus_max_bitdepth_constraint_idc: u8,
    /// Upper bound on `sps_chroma_format_idc` is `3 - idc`.
    pub gci_three_minus_max_chroma_format_constraint_idc: u8,
    /// The remaining 62 constraint flags, first flag in bit 61.
    pub gci_constraint_flags: u64,
    /// `gci_reserved_bit[i]` values, first bit first.
    pub gci_additional_bits: Vec<bool>,
}

impl GeneralConstraintsInfo {
    fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> BitResult<Self> {
        let gci_intra_only_constraint_flag = reader.read_flag()?;
        let gci_all_layers_independent_constraint_flag = reader.read_flag()?;
        let gci_one_au_only_constraint_flag = reader.read_flag()?;
        let gci_sixteen_minus_max_bitdepth_constraint_idc = reader.read_bits(4)? as u8;
        let gci_three_minus_max_chroma_format_constraint_idc = reader.read_bits(2)? as u8;
        let gci_constraint_flags = reader.read_bits_u64(GCI_OTHER_FLAGS)?;

        let gci_num_additional_bits = reader.read_u8()?;
        let mut gci_additional_bits = Vec::with_capacity(usize::from(gci_num_additional_bits));
        for _ in 0..gci_num_additional_bits {
            gci_additional_bits.push(reader.read_flag()?);
        }
        Ok(Self {
            gci_intra_only_constraint_flag,
            gci_all_layers_independent_constraint_flag,
            gci_one_au_only_constraint_flag,
            gci_sixteen_minus_max_bitdepth_constraint_idc,
            gci_three_minus_max_chroma_format_constraint_idc,
            gci_constraint_flags,
            gci_additional_bits,
        })
    }

    /// Largest bit depth the bitstream may use.
    pub fn max_bit_depth(&self) -> u8 {
        16u8.saturating_sub(self.gci_sixteen_minus_max_bitdepth_constraint_idc)
    }

    /// Largest `sps_chroma_format_idc` the bitstream may use.
    pub fn max_chroma_format_idc(&self) -> u8 {
        3u8.saturating_sub(self.gci_three_minus_max_chroma_format_constraint_idc)
    }
}

/// Profile, tier and level information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileTierLevel {
    /// General profile IDC (zero when the profile is not coded).
    pub general_profile_idc: u8,
    /// General tier flag.
    pub general_tier_flag: bool,
    /// General level IDC.
    pub general_level_idc: u8,
    pub ptl_frame_only_constraint_flag: bool,
    pub ptl_multilayer_enabled_flag: bool,
    /// Present when the profile is coded and `gci_present_flag` is set.
    pub general_constraints_info: Option<GeneralConstraintsInfo>,
    /// `ptl_sublayer_level_present_flag[i]`, indexed by sub-layer.
    pub ptl_sublayer_level_present_flag: Vec<bool>,
    /// `sublayer_level_idc[i]`, indexed by sub-layer. Values that were not
    /// coded are inferred from the next higher sub-layer.
    pub sublayer_level_idc: Vec<u8>,
    /// `general_sub_profile_idc[i]`.
    pub general_sub_profile_idc: Vec<u32>,
}

impl ProfileTierLevel {
    /// Parse `profile_tier_level(profileTierPresentFlag, MaxNumSubLayersMinus1)`.
    pub fn parse<R: ReadBits + ?Sized>(
        reader: &mut R,
        profile_tier_present_flag: bool,
        max_num_sub_layers_minus1: u8,
    ) -> Result<Self> {
        Self::parse_fields(reader, profile_tier_present_flag, max_num_sub_layers_minus1)
            .within("profile_tier_level", reader.bit_position())
    }

    fn parse_fields<R: ReadBits + ?Sized>(
        reader: &mut R,
        profile_tier_present_flag: bool,
        max_num_sub_layers_minus1: u8,
    ) -> BitResult<Self> {
        let mut ptl = Self::default();
        if profile_tier_present_flag {
            ptl.general_profile_idc = reader.read_bits(7)? as u8;
            ptl.general_tier_flag = reader.read_flag()?;
        }
        ptl.general_level_idc = reader.read_u8()?;
        ptl.ptl_frame_only_constraint_flag = reader.read_flag()?;
        ptl.ptl_multilayer_enabled_flag = reader.read_flag()?;

        if profile_tier_present_flag {
            if reader.read_flag()? {
                ptl.general_constraints_info = Some(GeneralConstraintsInfo::parse(reader)?);
            }
            reader.byte_align()?; // gci_alignment_zero_bit
        }

        let sub_layers = usize::from(max_num_sub_layers_minus1);
        ptl.ptl_sublayer_level_present_flag = vec![false; sub_layers];
        for i in (0..sub_layers).rev() {
            ptl.ptl_sublayer_level_present_flag[i] = reader.read_flag()?;
        }
        reader.byte_align()?; // ptl_reserved_zero_bit

        ptl.sublayer_level_idc = vec![0; sub_layers];
        let mut higher = ptl.general_level_idc;
        for i in (0..sub_layers).rev() {
            if ptl.ptl_sublayer_level_present_flag[i] {
                higher = reader.read_u8()?;
            }
            ptl.sublayer_level_idc[i] = higher;
        }

        if profile_tier_present_flag {
            let ptl_num_sub_profiles = reader.read_u8()?;
            ptl.general_sub_profile_idc =
                Vec::with_capacity(reader.capacity_for(u64::from(ptl_num_sub_profiles), 32));
            for _ in 0..ptl_num_sub_profiles {
                ptl.general_sub_profile_idc.push(reader.read_bits(32)?);
            }
        }
        Ok(ptl)
    }

    /// Get the profile.
    pub fn profile(&self) -> Option<VvcProfile> {
        VvcProfile::from_idc(self.general_profile_idc)
    }

    /// Get the tier.
    pub fn tier(&self) -> VvcTier {
        VvcTier::from_flag(self.general_tier_flag)
    }

    /// Get the level.
    pub fn level(&self) -> VvcLevel {
        VvcLevel::from_idc(self.general_level_idc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobits_core::{BitReader, BitWriter, Error, WriteBits};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_and_level() {
        assert_eq!(VvcProfile::from_idc(1), Some(VvcProfile::Main10));
        assert_eq!(VvcProfile::Main10_444StillPicture.idc(), 97);
        assert!(VvcProfile::Main10_444StillPicture.is_444());
        assert!(VvcProfile::Main10_444StillPicture.is_still_picture());
        assert!(!VvcProfile::Main12.is_444());
        assert!(VvcProfile::MultilayerMain10.is_multilayer());
        assert_eq!(VvcProfile::from_idc(3), None);

        assert_eq!(VvcLevel::L5_1.to_string(), "5.1");
        assert_eq!(VvcLevel::from_idc(16).to_string(), "1.0");
        assert_eq!(VvcLevel::L15_5.to_string(), "15.5");
        assert_eq!(VvcLevel::L4_1.max_luma_picture_size(), Some(2_228_224));
        assert_eq!(VvcLevel::L15_5.max_luma_picture_size(), None);
        assert_eq!(VvcTier::from_flag(true), VvcTier::High);
    }

    #[test]
    fn test_parse_without_gci() {
        let mut w = BitWriter::new();
        w.write_bits(1, 7).unwrap();
        w.write_flag(false).unwrap();
        w.write_bits(67, 8).unwrap();
        w.write_flag(true).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(false).unwrap(); // gci_present_flag
        w.write_bits(0, 5).unwrap();
        w.write_bits(0, 8).unwrap();
        let data = w.into_data();

        let mut reader = BitReader::new(&data);
        let ptl = ProfileTierLevel::parse(&mut reader, true, 0).unwrap();
        assert_eq!(reader.position(), 32);
        assert_eq!(ptl.profile(), Some(VvcProfile::Main10));
        assert_eq!(ptl.tier(), VvcTier::Main);
        assert_eq!(ptl.level(), VvcLevel::L4_1);
        assert!(ptl.ptl_frame_only_constraint_flag);
        assert!(ptl.general_constraints_info.is_none());
        assert!(ptl.sublayer_level_idc.is_empty());
        assert!(ptl.general_sub_profile_idc.is_empty());
    }

    #[test]
    fn test_parse_gci_sub_layers_and_sub_profiles() {
        let mut w = BitWriter::new();
        w.write_bits(33, 7).unwrap();
        w.write_flag(true).unwrap();
        w.write_bits(83, 8).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(true).unwrap();
        w.write_flag(true).unwrap(); // gci_present_flag
        w.write_flag(true).unwrap(); // intra only
        w.write_flag(false).unwrap();
        w.write_flag(false).unwrap();
        w.write_bits(6, 4).unwrap(); // max bit depth 10
        w.write_bits(1, 2).unwrap(); // max chroma 4:2:2
        w.write_bits_u64((1 << 61) | 1, 62).unwrap();
        w.write_bits(3, 8).unwrap();
        w.write_bits(0b101, 3).unwrap();
        w.stuff_to_byte_with_zeros().unwrap();
        // Three sub-layers below the highest: flags for i = 2, 1, 0.
        w.write_flag(false).unwrap();
        w.write_flag(true).unwrap();
        w.write_flag(false).unwrap();
        w.stuff_to_byte_with_zeros().unwrap();
        w.write_bits(51, 8).unwrap(); // sublayer_level_idc[1]
        w.write_bits(2, 8).unwrap();
        w.write_bits(0x1234_5678, 32).unwrap();
        w.write_bits(0xDEAD_BEEF, 32).unwrap();
        let data = w.into_data();

        let mut reader = BitReader::new(&data);
        let ptl = ProfileTierLevel::parse(&mut reader, true, 3).unwrap();
        assert_eq!(reader.position(), reader.total_bits());
        assert_eq!(ptl.profile(), Some(VvcProfile::Main10_444));
        assert_eq!(ptl.tier(), VvcTier::High);
        assert!(ptl.ptl_multilayer_enabled_flag);

        let gci = ptl.general_constraints_info.as_ref().unwrap();
        assert!(gci.gci_intra_only_constraint_flag);
        assert_eq!(gci.max_bit_depth(), 10);
        assert_eq!(gci.max_chroma_format_idc(), 2);
        assert_eq!(gci.gci_constraint_flags, (1 << 61) | 1);
        assert_eq!(gci.gci_additional_bits, vec![true, false, true]);

        assert_eq!(ptl.ptl_sublayer_level_present_flag, vec![false, true, false]);
        assert_eq!(ptl.sublayer_level_idc, vec![51, 51, 83]);
        assert_eq!(ptl.general_sub_profile_idc, vec![0x1234_5678, 0xDEAD_BEEF]);
    }

    #[test]
    fn test_parse_level_only() {
        // profileTierPresentFlag = 0: level, two flags, one sub-layer flag,
        // then alignment.
        let data = [83, 0b0110_0000, 80];
        let mut reader = BitReader::new(&data);
        let ptl = ProfileTierLevel::parse(&mut reader, false, 1).unwrap();
        assert_eq!(ptl.general_profile_idc, 0);
        assert!(ptl.ptl_multilayer_enabled_flag);
        assert_eq!(ptl.sublayer_level_idc, vec![80]);
        assert_eq!(reader.position(), 24);
    }

    #[test]
    fn test_truncated() {
        let err = ProfileTierLevel::parse(&mut BitReader::new(&[0x02, 0x43]), true, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                structure: "profile_tier_level",
                ..
            }
        ));
    }
}
