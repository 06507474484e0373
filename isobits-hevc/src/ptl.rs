//! `profile_tier_level()` and the profile, tier and level enums.

use std::fmt;

use isobits_core::{BitResult, ReadBits, Result, ResultExt};

/// HEVC profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HevcProfile {
    /// Main profile (8-bit 4:2:0).
    Main = 1,
    /// Main 10 profile (10-bit 4:2:0).
    Main10 = 2,
    /// Main Still Picture profile.
    MainStillPicture = 3,
    /// Format range extensions profiles.
    RangeExtensions = 4,
    /// High throughput 4:4:4 profiles.
    HighThroughput = 5,
    /// Multiview Main.
    MultiviewMain = 6,
    /// Scalable Main.
    ScalableMain = 7,
    /// 3D Main.
    ThreeDMain = 8,
    /// Screen content coding extensions.
    ScreenContentCoding = 9,
    /// Scalable format range extensions.
    ScalableRangeExtensions = 10,
    /// High throughput screen content coding extensions.
    HighThroughputScreenContent = 11,
}

impl HevcProfile {
    /// Create from general_profile_idc.
    pub fn from_idc(idc: u8) -> Option<Self> {
        match idc {
            1 => Some(Self::Main),
            2 => Some(Self::Main10),
            3 => Some(Self::MainStillPicture),
            4 => Some(Self::RangeExtensions),
            5 => Some(Self::HighThroughput),
            6 => Some(Self::MultiviewMain),
            7 => Some(Self::ScalableMain),
            8 => Some(Self::ThreeDMain),
            9 => Some(Self::ScreenContentCoding),
            10 => Some(Self::ScalableRangeExtensions),
            11 => Some(Self::HighThroughputScreenContent),
            _ => None,
        }
    }

    /// The profile_idc value.
    pub fn idc(self) -> u8 {
        self as u8
    }

    /// Check if this profile allows bit depths above 8.
    pub fn supports_10bit(self) -> bool {
        !matches!(self, Self::Main | Self::MainStillPicture)
    }
}

impl fmt::Display for HevcProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Main => "Main",
            Self::Main10 => "Main 10",
            Self::MainStillPicture => "Main Still Picture",
            Self::RangeExtensions => "Range Extensions",
            Self::HighThroughput => "High Throughput",
            Self::MultiviewMain => "Multiview Main",
            Self::ScalableMain => "Scalable Main",
            Self::ThreeDMain => "3D Main",
            Self::ScreenContentCoding => "Screen Content Coding",
            Self::ScalableRangeExtensions => "Scalable Range Extensions",
            Self::HighThroughputScreenContent => "High Throughput Screen Content",
        };
        f.write_str(name)
    }
}

/// HEVC tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HevcTier {
    /// Main tier.
    #[default]
    Main,
    /// High tier.
    High,
}

impl HevcTier {
    /// Tier letter used in codec strings.
    pub fn letter(self) -> char {
        match self {
            Self::Main => 'L',
            Self::High => 'H',
        }
    }
}

impl fmt::Display for HevcTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "Main"),
            Self::High => write!(f, "High"),
        }
    }
}

/// HEVC level; `level_idc` is 30 times the level number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HevcLevel {
    /// Level value (e.g. 153 for level 5.1).
    pub level_idc: u8,
}

impl HevcLevel {
    /// Level 3.1.
    pub const L3_1: Self = Self { level_idc: 93 };
    /// Level 4.1.
    pub const L4_1: Self = Self { level_idc: 123 };
    /// Level 5.1.
    pub const L5_1: Self = Self { level_idc: 153 };

    /// Create a level from the IDC value.
    pub fn from_idc(idc: u8) -> Self {
        Self { level_idc: idc }
    }

    /// Get the major level number.
    pub fn major(&self) -> u8 {
        self.level_idc / 30
    }

    /// Get the minor level number.
    pub fn minor(&self) -> u8 {
        (self.level_idc % 30) / 3
    }

    /// MaxLumaPs from Table A.8; `None` for an unknown level.
    pub fn max_luma_picture_size(&self) -> Option<u32> {
        match self.level_idc {
            30 => Some(36_864),
            60 => Some(122_880),
            63 => Some(245_760),
            90 => Some(552_960),
            93 => Some(983_040),
            120 | 123 => Some(2_228_224),
            150 | 153 | 156 => Some(8_912_896),
            180 | 183 | 186 => Some(35_651_584),
            _ => None,
        }
    }
}

impl fmt::Display for HevcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

/// One 88-bit profile block: space, tier, IDC, compatibility flags and the
/// 48 constraint indicator bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileInfo {
    /// Profile space (0-3).
    pub profile_space: u8,
    /// Tier flag.
    pub tier_flag: bool,
    /// Profile IDC.
    pub profile_idc: u8,
    /// `profile_compatibility_flag[j]` in bit `31 - j`.
    pub profile_compatibility_flags: u32,
    /// The 48 bits from `progressive_source_flag` (bit 47) onwards, as
    /// stored in an `hvcC` box.
    pub constraint_indicator_flags: u64,
}

impl ProfileInfo {
    fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> BitResult<Self> {
        Ok(Self {
            profile_space: reader.read_bits(2)? as u8,
            tier_flag: reader.read_flag()?,
            profile_idc: reader.read_bits(5)? as u8,
            profile_compatibility_flags: reader.read_bits(32)?,
            constraint_indicator_flags: reader.read_bits_u64(48)?,
        })
    }

    /// Check `profile_compatibility_flag[idc]`.
    pub fn is_compatible_with(&self, idc: u8) -> bool {
        idc < 32 && (self.profile_compatibility_flags & (1 << (31 - u32::from(idc)))) != 0
    }

    /// Source scan type is progressive.
    pub fn progressive_source_flag(&self) -> bool {
        (self.constraint_indicator_flags >> 47) & 1 == 1
    }

    /// Source scan type is interlaced.
    pub fn interlaced_source_flag(&self) -> bool {
        (self.constraint_indicator_flags >> 46) & 1 == 1
    }

    /// No frame packing arrangement SEI is present.
    pub fn non_packed_constraint_flag(&self) -> bool {
        (self.constraint_indicator_flags >> 45) & 1 == 1
    }

    /// No field pictures are present.
    pub fn frame_only_constraint_flag(&self) -> bool {
        (self.constraint_indicator_flags >> 44) & 1 == 1
    }

    /// Known profile, if any.
    pub fn profile(&self) -> Option<HevcProfile> {
        HevcProfile::from_idc(self.profile_idc)
    }

    /// Tier.
    pub fn tier(&self) -> HevcTier {
        if self.tier_flag {
            HevcTier::High
        } else {
            HevcTier::Main
        }
    }
}

/// Per-sub-layer profile and level, when signalled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubLayerProfileTierLevel {
    /// Sub-layer profile block.
    pub profile: Option<ProfileInfo>,
    /// Sub-layer level IDC.
    pub level_idc: Option<u8>,
}

/// Profile, tier and level information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileTierLevel {
    /// Whether the general profile block was coded.
    pub profile_present_flag: bool,
    /// General profile block (all zero when not coded).
    pub general_profile: ProfileInfo,
    /// General level IDC.
    pub general_level_idc: u8,
    /// Sub-layers 0 to `max_sub_layers_minus1 - 1`.
    pub sub_layers: Vec<SubLayerProfileTierLevel>,
}

impl ProfileTierLevel {
    /// Parse `profile_tier_level(profilePresentFlag, maxNumSubLayersMinus1)`.
    pub fn parse<R: ReadBits + ?Sized>(
        reader: &mut R,
        profile_present_flag: bool,
        max_sub_layers_minus1: u8,
    ) -> Result<Self> {
        Self::parse_fields(reader, profile_present_flag, max_sub_layers_minus1)
            .within("profile_tier_level", reader.bit_position())
    }

    fn parse_fields<R: ReadBits + ?Sized>(
        reader: &mut R,
        profile_present_flag: bool,
        max_sub_layers_minus1: u8,
    ) -> BitResult<Self> {
        let general_profile = if profile_present_flag {
            ProfileInfo::parse(reader)?
        } else {
            ProfileInfo::default()
        };
        let general_level_idc = reader.read_u8()?;

        let mut present = Vec::with_capacity(usize::from(max_sub_layers_minus1));
        for _ in 0..max_sub_layers_minus1 {
            let profile_present = reader.read_flag()?;
            let level_present = reader.read_flag()?;
            present.push((profile_present, level_present));
        }
        if max_sub_layers_minus1 > 0 {
            for _ in max_sub_layers_minus1..8 {
                reader.read_bits(2)?; // reserved_zero_2bits
            }
        }

        let mut sub_layers = Vec::with_capacity(present.len());
        for (profile_present, level_present) in present {
            let profile = if profile_present {
                Some(ProfileInfo::parse(reader)?)
            } else {
                None
            };
            let level_idc = if level_present {
                Some(reader.read_u8()?)
            } else {
                None
            };
            sub_layers.push(SubLayerProfileTierLevel { profile, level_idc });
        }

        Ok(Self {
            profile_present_flag,
            general_profile,
            general_level_idc,
            sub_layers,
        })
    }

    /// Get the profile.
    pub fn profile(&self) -> Option<HevcProfile> {
        self.general_profile.profile()
    }

    /// Get the tier.
    pub fn tier(&self) -> HevcTier {
        self.general_profile.tier()
    }

    /// Get the level.
    pub fn level(&self) -> HevcLevel {
        HevcLevel::from_idc(self.general_level_idc)
    }

    /// RFC 6381 codec string for `sample_entry` (`hvc1` or `hev1`), e.g.
    /// `hvc1.1.6.L93.B0`.
    pub fn codec_string(&self, sample_entry: &str) -> String {
        let p = &self.general_profile;
        let space = match p.profile_space {
            1 => "A",
            2 => "B",
            3 => "C",
            _ => "",
        };
        let mut s = format!(
            "{sample_entry}.{space}{}.{:X}.{}{}",
            p.profile_idc,
            p.profile_compatibility_flags.reverse_bits(),
            self.tier().letter(),
            self.general_level_idc
        );

        let bytes = p.constraint_indicator_flags.to_be_bytes();
        // The low six bytes hold the flags; trailing zero bytes are dropped.
        let flags = &bytes[2..];
        let used = flags.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        for b in &flags[..used] {
            s.push_str(&format!(".{b:X}"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobits_core::{BitReader, BitWriter, WriteBits};

    fn write_profile(w: &mut BitWriter, idc: u8, compat: u32, constraints: u64) {
        w.write_bits(0, 2).unwrap();
        w.write_flag(false).unwrap();
        w.write_bits(u32::from(idc), 5).unwrap();
        w.write_bits(compat, 32).unwrap();
        w.write_bits_u64(constraints, 48).unwrap();
    }

    #[test]
    fn test_profile_and_level() {
        assert_eq!(HevcProfile::from_idc(2), Some(HevcProfile::Main10));
        assert_eq!(HevcProfile::Main10.idc(), 2);
        assert!(HevcProfile::Main10.supports_10bit());
        assert!(!HevcProfile::Main.supports_10bit());
        assert_eq!(HevcProfile::from_idc(0), None);

        assert_eq!(HevcLevel::L5_1.to_string(), "5.1");
        assert_eq!(HevcLevel::from_idc(120).to_string(), "4.0");
        assert_eq!(HevcLevel::L3_1.max_luma_picture_size(), Some(983_040));
        assert_eq!(HevcLevel::from_idc(1).max_luma_picture_size(), None);
    }

    #[test]
    fn test_parse_general_only() {
        let mut w = BitWriter::new();
        write_profile(&mut w, 1, 0x6000_0000, 0xB000_0000_0000);
        w.write_bits(93, 8).unwrap();
        let data = w.into_data();

        let ptl = ProfileTierLevel::parse(&mut BitReader::new(&data), true, 0).unwrap();
        assert_eq!(ptl.profile(), Some(HevcProfile::Main));
        assert_eq!(ptl.tier(), HevcTier::Main);
        assert_eq!(ptl.level(), HevcLevel::L3_1);
        assert!(ptl.general_profile.is_compatible_with(1));
        assert!(ptl.general_profile.is_compatible_with(2));
        assert!(!ptl.general_profile.is_compatible_with(3));
        assert!(ptl.general_profile.progressive_source_flag());
        assert!(!ptl.general_profile.interlaced_source_flag());
        assert!(ptl.general_profile.non_packed_constraint_flag());
        assert!(ptl.general_profile.frame_only_constraint_flag());
        assert!(ptl.sub_layers.is_empty());
        assert_eq!(ptl.codec_string("hvc1"), "hvc1.1.6.L93.B0");
    }

    #[test]
    fn test_parse_sub_layers() {
        let mut w = BitWriter::new();
        write_profile(&mut w, 2, 0x2000_0000, 0);
        w.write_bits(120, 8).unwrap();
        // Two sub-layer entries: profile only, then level only.
        w.write_flag(true).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(true).unwrap();
        for _ in 2..8 {
            w.write_bits(0, 2).unwrap();
        }
        write_profile(&mut w, 1, 0x4000_0000, 0x1_0000);
        w.write_bits(90, 8).unwrap();
        let data = w.into_data();

        let mut reader = BitReader::new(&data);
        let ptl = ProfileTierLevel::parse(&mut reader, true, 2).unwrap();
        assert_eq!(reader.position(), 88 + 8 + 16 + 88 + 8);
        assert_eq!(ptl.sub_layers.len(), 2);
        let first = ptl.sub_layers[0].profile.unwrap();
        assert_eq!(first.profile_idc, 1);
        assert_eq!(first.constraint_indicator_flags, 0x1_0000);
        assert_eq!(ptl.sub_layers[0].level_idc, None);
        assert_eq!(ptl.sub_layers[1].profile, None);
        assert_eq!(ptl.sub_layers[1].level_idc, Some(90));
        assert_eq!(ptl.codec_string("hev1"), "hev1.2.4.L120");
    }

    #[test]
    fn test_codec_string_keeps_inner_zero_bytes() {
        let ptl = ProfileTierLevel {
            profile_present_flag: true,
            general_profile: ProfileInfo {
                profile_space: 1,
                tier_flag: true,
                profile_idc: 4,
                profile_compatibility_flags: 0x0800_0000,
                constraint_indicator_flags: 0x9000_0800_0000,
            },
            general_level_idc: 153,
            sub_layers: Vec::new(),
        };
        assert_eq!(ptl.codec_string("hvc1"), "hvc1.A4.10.H153.90.0.8");
    }

    #[test]
    fn test_truncated() {
        let err = ProfileTierLevel::parse(&mut BitReader::new(&[0x01, 0x60]), true, 0).unwrap_err();
        assert!(matches!(
            err,
            isobits_core::Error::Truncated {
                structure: "profile_tier_level",
                ..
            }
        ));
    }
}
