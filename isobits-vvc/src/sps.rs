//! Sequence Parameter Set (SPS) prefix parsing.
//!
//! Only the leading fields are decoded, through `sps_bitdepth_minus8`: IDs,
//! sub-layer count, chroma format, CTU size, profile/tier/level, GDR and
//! resampling flags, maximum picture size and the conformance window.
//!
//! The SPS is never read to its end, so a successful parse is always
//! [`ParseError::Incomplete`] with an [`Error::Unsupported`]. The feature it
//! names tells the two stopping points apart: [`STOP_AFTER_BIT_DEPTH`] after
//! `sps_bitdepth_minus8`, [`STOP_AT_SUBPIC_INFO`] when the SPS signals a
//! subpicture layout and the bit depth was never reached.

use isobits_core::{
    EbspReader, Error, ExpGolombRead, ParseError, ParseResult, ReadBits, Result, ResultExt,
};

use crate::nal::{NalUnitHeader, NalUnitType};
use crate::ptl::{ProfileTierLevel, VvcLevel, VvcProfile, VvcTier};

const STRUCTURE: &str = "SPS";

/// Unsupported feature named when parsing stops after `sps_bitdepth_minus8`.
pub const STOP_AFTER_BIT_DEPTH: &str = "fields after sps_bitdepth_minus8";

/// Unsupported feature named when parsing stops at the subpicture info.
pub const STOP_AT_SUBPIC_INFO: &str = "subpicture info";

/// Largest `sps_max_sublayers_minus1`.
const MAX_SUBLAYERS_MINUS1: u32 = 6;

/// Conformance cropping window in chroma sample units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConformanceWindow {
    pub sps_conf_win_left_offset: u32,
    pub sps_conf_win_right_offset: u32,
    pub sps_conf_win_top_offset: u32,
    pub sps_conf_win_bottom_offset: u32,
}

/// Leading fields of a VVC Sequence Parameter Set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sps {
    /// SPS ID (0-15).
    pub sps_seq_parameter_set_id: u8,
    /// VPS ID; zero when the SPS does not refer to a VPS.
    pub sps_video_parameter_set_id: u8,
    /// Maximum temporal sub-layers minus 1 (0-6).
    pub sps_max_sublayers_minus1: u8,
    /// Chroma format IDC (0=mono, 1=4:2:0, 2=4:2:2, 3=4:4:4).
    pub sps_chroma_format_idc: u8,
    /// CTU size is `1 << (sps_log2_ctu_size_minus5 + 5)`.
    pub sps_log2_ctu_size_minus5: u8,
    pub sps_ptl_dpb_hrd_params_present_flag: bool,
    /// Present when `sps_ptl_dpb_hrd_params_present_flag` is set.
    pub profile_tier_level: Option<ProfileTierLevel>,
    pub sps_gdr_enabled_flag: bool,
    pub sps_ref_pic_resampling_enabled_flag: bool,
    pub sps_res_change_in_clvs_allowed_flag: bool,
    pub sps_pic_width_max_in_luma_samples: u32,
    pub sps_pic_height_max_in_luma_samples: u32,
    pub conformance_window: Option<ConformanceWindow>,
    pub sps_subpic_info_present_flag: bool,
    /// `None` in a partial result that stopped at the subpicture info.
    pub sps_bitdepth_minus8: Option<u8>,
}

impl Sps {
    /// Parse the SPS prefix from a complete NAL unit, header included.
    ///
    /// Returns [`ParseError::Incomplete`] holding the prefix on success and
    /// [`ParseError::Failed`] for a wrong NAL type, truncation or a format
    /// error.
    pub fn parse(nalu: &[u8]) -> ParseResult<Self> {
        let mut reader = EbspReader::new(nalu);
        let header = NalUnitHeader::parse(&mut reader)?;
        if header.nal_unit_type != NalUnitType::SpsNut {
            return Err(Error::wrong_nal_type(STRUCTURE, header.nal_unit_type.to_u8()).into());
        }
        let sps = Self::parse_from_reader(&mut reader).within(STRUCTURE, reader.bit_position())?;
        if sps.sps_subpic_info_present_flag {
            tracing::warn!(
                sps_id = sps.sps_seq_parameter_set_id,
                bit_offset = reader.bit_position(),
                "SPS subpicture info not decoded"
            );
            return Err(ParseError::stopped(
                sps,
                Error::unsupported(STRUCTURE, STOP_AT_SUBPIC_INFO),
            ));
        }
        tracing::debug!(
            sps_id = sps.sps_seq_parameter_set_id,
            bit_offset = reader.bit_position(),
            "SPS decoded through sps_bitdepth_minus8"
        );
        Err(ParseError::stopped(sps, Error::unsupported(STRUCTURE, STOP_AFTER_BIT_DEPTH)))
    }

    /// Parse the SPS prefix from a reader positioned after the NAL header.
    ///
    /// Reading stops after `sps_subpic_info_present_flag` when it is set,
    /// and after `sps_bitdepth_minus8` otherwise.
    pub fn parse_from_reader(reader: &mut EbspReader<'_>) -> Result<Self> {
        let mut sps = Self {
            sps_seq_parameter_set_id: reader.read_bits(4)? as u8,
            sps_video_parameter_set_id: reader.read_bits(4)? as u8,
            ..Self::default()
        };
        let max_sublayers_minus1 = reader.read_bits(3)?;
        if max_sublayers_minus1 > MAX_SUBLAYERS_MINUS1 {
            return Err(Error::format(
                STRUCTURE,
                format!("sps_max_sublayers_minus1 {max_sublayers_minus1} out of range"),
            ));
        }
        sps.sps_max_sublayers_minus1 = max_sublayers_minus1 as u8;
        sps.sps_chroma_format_idc = reader.read_bits(2)? as u8;
        sps.sps_log2_ctu_size_minus5 = reader.read_bits(2)? as u8;
        if sps.sps_log2_ctu_size_minus5 > 2 {
            return Err(Error::format(STRUCTURE, "sps_log2_ctu_size_minus5 is reserved value 3"));
        }

        sps.sps_ptl_dpb_hrd_params_present_flag = reader.read_flag()?;
        if sps.sps_ptl_dpb_hrd_params_present_flag {
            sps.profile_tier_level =
                Some(ProfileTierLevel::parse(reader, true, sps.sps_max_sublayers_minus1)?);
        }

        sps.sps_gdr_enabled_flag = reader.read_flag()?;
        sps.sps_ref_pic_resampling_enabled_flag = reader.read_flag()?;
        sps.sps_res_change_in_clvs_allowed_flag =
            sps.sps_ref_pic_resampling_enabled_flag && reader.read_flag()?;

        sps.sps_pic_width_max_in_luma_samples = reader.read_ue()?;
        sps.sps_pic_height_max_in_luma_samples = reader.read_ue()?;
        if sps.sps_pic_width_max_in_luma_samples == 0 || sps.sps_pic_height_max_in_luma_samples == 0
        {
            return Err(Error::format(STRUCTURE, "zero maximum picture size"));
        }
        if reader.read_flag()? {
            sps.conformance_window = Some(ConformanceWindow {
                sps_conf_win_left_offset: reader.read_ue()?,
                sps_conf_win_right_offset: reader.read_ue()?,
                sps_conf_win_top_offset: reader.read_ue()?,
                sps_conf_win_bottom_offset: reader.read_ue()?,
            });
        }

        sps.sps_subpic_info_present_flag = reader.read_flag()?;
        if sps.sps_subpic_info_present_flag {
            return Ok(sps);
        }

        let bitdepth_minus8 = reader.read_ue()?;
        if bitdepth_minus8 > 8 {
            return Err(Error::format(
                STRUCTURE,
                format!("sps_bitdepth_minus8 {bitdepth_minus8} out of range"),
            ));
        }
        sps.sps_bitdepth_minus8 = Some(bitdepth_minus8 as u8);
        Ok(sps)
    }

    /// Get the profile, when the PTL is present and the IDC is known.
    pub fn profile(&self) -> Option<VvcProfile> {
        self.profile_tier_level.as_ref().and_then(|p| p.profile())
    }

    /// Get the tier.
    pub fn tier(&self) -> Option<VvcTier> {
        self.profile_tier_level.as_ref().map(|p| p.tier())
    }

    /// Get the level.
    pub fn level(&self) -> Option<VvcLevel> {
        self.profile_tier_level.as_ref().map(|p| p.level())
    }

    /// Number of temporal sub-layers.
    pub fn max_sublayers(&self) -> u8 {
        self.sps_max_sublayers_minus1 + 1
    }

    /// CtbLog2SizeY.
    pub fn log2_ctu_size(&self) -> u8 {
        self.sps_log2_ctu_size_minus5 + 5
    }

    /// CtbSizeY.
    pub fn ctu_size(&self) -> u32 {
        1 << self.log2_ctu_size()
    }

    /// Width of the largest picture in CTUs.
    pub fn pic_width_max_in_ctus(&self) -> u32 {
        self.sps_pic_width_max_in_luma_samples.div_ceil(self.ctu_size())
    }

    /// Height of the largest picture in CTUs.
    pub fn pic_height_max_in_ctus(&self) -> u32 {
        self.sps_pic_height_max_in_luma_samples.div_ceil(self.ctu_size())
    }

    /// SubWidthC.
    pub fn sub_width_c(&self) -> u32 {
        match self.sps_chroma_format_idc {
            1 | 2 => 2,
            _ => 1,
        }
    }

    /// SubHeightC.
    pub fn sub_height_c(&self) -> u32 {
        match self.sps_chroma_format_idc {
            1 => 2,
            _ => 1,
        }
    }

    /// Maximum picture width after conformance window cropping.
    pub fn width(&self) -> u32 {
        let crop = self.conformance_window.map_or(0, |w| {
            w.sps_conf_win_left_offset
                .saturating_add(w.sps_conf_win_right_offset)
                .saturating_mul(self.sub_width_c())
        });
        self.sps_pic_width_max_in_luma_samples.saturating_sub(crop)
    }

    /// Maximum picture height after conformance window cropping.
    pub fn height(&self) -> u32 {
        let crop = self.conformance_window.map_or(0, |w| {
            w.sps_conf_win_top_offset
                .saturating_add(w.sps_conf_win_bottom_offset)
                .saturating_mul(self.sub_height_c())
        });
        self.sps_pic_height_max_in_luma_samples.saturating_sub(crop)
    }

    /// Bit depth of luma and chroma samples, when it was read.
    pub fn bit_depth(&self) -> Option<u8> {
        self.sps_bitdepth_minus8.map(|d| d + 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobits_core::{EbspWriter, ExpGolombWrite, WriteBits};
    use pretty_assertions::assert_eq;

    /// Main 10, level 4.1, 1920x1080, 4:2:0, 10-bit, 128x128 CTUs.
    const SPS_1080P: &str = "0079000d02438000000f02004391a9";

    /// Parse an SPS that reaches `sps_bitdepth_minus8`.
    fn parse_prefix(nalu: &[u8]) -> Sps {
        let err = Sps::parse(nalu).unwrap_err();
        assert_eq!(
            err.error(),
            &Error::unsupported(STRUCTURE, STOP_AFTER_BIT_DEPTH)
        );
        err.into_partial().unwrap()
    }

    #[test]
    fn test_parse_1080p() {
        let sps = parse_prefix(&hex::decode(SPS_1080P).unwrap());
        assert_eq!(sps.sps_seq_parameter_set_id, 0);
        assert_eq!(sps.max_sublayers(), 1);
        assert_eq!(sps.sps_chroma_format_idc, 1);
        assert_eq!(sps.ctu_size(), 128);
        assert_eq!(sps.profile(), Some(VvcProfile::Main10));
        assert_eq!(sps.tier(), Some(VvcTier::Main));
        assert_eq!(sps.level().map(|l| l.to_string()), Some("4.1".into()));
        let ptl = sps.profile_tier_level.as_ref().unwrap();
        assert!(ptl.ptl_frame_only_constraint_flag);
        assert!(ptl.general_constraints_info.is_none());
        assert!(!sps.sps_gdr_enabled_flag);
        assert!(!sps.sps_ref_pic_resampling_enabled_flag);
        assert_eq!(sps.width(), 1920);
        assert_eq!(sps.height(), 1080);
        assert_eq!(sps.pic_width_max_in_ctus(), 15);
        assert_eq!(sps.pic_height_max_in_ctus(), 9);
        assert_eq!(sps.bit_depth(), Some(10));
    }

    #[test]
    fn test_wrong_nal_type() {
        // PPS header
        let err = Sps::parse(&[0x00, 0x81, 0x00]).unwrap_err();
        assert!(matches!(
            err.error(),
            Error::Format { structure: "SPS", .. }
        ));
    }

    #[test]
    fn test_truncated_prefixes_fail() {
        let data = hex::decode(SPS_1080P).unwrap();
        // sps_bitdepth_minus8 ends in the last byte.
        for len in 0..data.len() {
            match Sps::parse(&data[..len]) {
                Err(ParseError::Failed(e)) => assert!(e.is_truncation(), "len {len}: {e}"),
                other => panic!("len {len}: expected truncation, got {other:?}"),
            }
        }
    }

    struct Options {
        ptl: bool,
        subpic: bool,
        ctu_minus5: u32,
    }

    fn build(opts: Options) -> Vec<u8> {
        let mut w = EbspWriter::new();
        w.write_bits(0x0079, 16).unwrap();
        w.write_bits(3, 4).unwrap(); // sps id
        w.write_bits(1, 4).unwrap(); // vps id
        w.write_bits(2, 3).unwrap(); // three sub-layers
        w.write_bits(2, 2).unwrap(); // 4:2:2
        w.write_bits(opts.ctu_minus5, 2).unwrap();
        w.write_flag(opts.ptl).unwrap();
        if opts.ptl {
            w.write_bits(1, 7).unwrap();
            w.write_flag(true).unwrap();
            w.write_bits(83, 8).unwrap();
            w.write_bits(0, 2).unwrap();
            w.write_flag(false).unwrap();
            w.stuff_to_byte_with_zeros().unwrap();
            w.write_bits(0b01, 2).unwrap();
            w.stuff_to_byte_with_zeros().unwrap();
            w.write_bits(80, 8).unwrap(); // sublayer_level_idc[0]
            w.write_bits(0, 8).unwrap();
        }
        w.write_flag(true).unwrap(); // gdr
        w.write_flag(true).unwrap(); // rpr
        w.write_flag(true).unwrap(); // res change
        w.write_ue(1280).unwrap();
        w.write_ue(720).unwrap();
        w.write_flag(true).unwrap();
        for v in [4, 4, 0, 8] {
            w.write_ue(v).unwrap();
        }
        w.write_flag(opts.subpic).unwrap();
        if opts.subpic {
            w.write_ue(3).unwrap(); // sps_num_subpics_minus1
        } else {
            w.write_ue(0).unwrap();
        }
        w.write_rbsp_trailing_bits().unwrap();
        w.finish()
    }

    #[test]
    fn test_parse_with_sub_layers_and_cropping() {
        let sps = parse_prefix(&build(Options {
            ptl: true,
            subpic: false,
            ctu_minus5: 1,
        }));
        assert_eq!(sps.sps_seq_parameter_set_id, 3);
        assert_eq!(sps.sps_video_parameter_set_id, 1);
        assert_eq!(sps.max_sublayers(), 3);
        assert_eq!(sps.tier(), Some(VvcTier::High));
        let ptl = sps.profile_tier_level.as_ref().unwrap();
        assert_eq!(ptl.ptl_sublayer_level_present_flag, vec![true, false]);
        assert_eq!(ptl.sublayer_level_idc, vec![80, 83]);
        assert!(sps.sps_gdr_enabled_flag);
        assert!(sps.sps_res_change_in_clvs_allowed_flag);
        // 4:2:2 crops horizontally by two samples per offset unit.
        assert_eq!(sps.width(), 1280 - 16);
        assert_eq!(sps.height(), 720 - 8);
        assert_eq!(sps.ctu_size(), 64);
        assert_eq!(sps.bit_depth(), Some(8));
    }

    #[test]
    fn test_without_ptl() {
        let sps = parse_prefix(&build(Options {
            ptl: false,
            subpic: false,
            ctu_minus5: 0,
        }));
        assert!(sps.profile_tier_level.is_none());
        assert_eq!(sps.profile(), None);
        assert_eq!(sps.level(), None);
        assert_eq!(sps.pic_width_max_in_ctus(), 40);
    }

    #[test]
    fn test_subpic_info_returns_partial() {
        let err = Sps::parse(&build(Options {
            ptl: true,
            subpic: true,
            ctu_minus5: 2,
        }))
        .unwrap_err();
        assert_eq!(
            err.error(),
            &Error::unsupported(STRUCTURE, STOP_AT_SUBPIC_INFO)
        );
        let partial = err.into_partial().unwrap();
        assert!(partial.sps_subpic_info_present_flag);
        assert_eq!(partial.sps_bitdepth_minus8, None);
        assert_eq!(partial.bit_depth(), None);
        assert_eq!(partial.width(), 1264);
        assert_eq!(partial.level(), Some(VvcLevel::L5_1));
    }

    #[test]
    fn test_reserved_ctu_size() {
        let err = Sps::parse(&build(Options {
            ptl: false,
            subpic: false,
            ctu_minus5: 3,
        }))
        .unwrap_err();
        assert!(matches!(err, ParseError::Failed(Error::Format { .. })));
    }

    #[test]
    fn test_bit_depth_out_of_range() {
        let mut w = EbspWriter::new();
        w.write_bits(0x0079, 16).unwrap();
        w.write_bits(0, 16).unwrap(); // ids, one sub-layer, mono, 32x32, no PTL
        w.write_bits(0, 2).unwrap();
        w.write_ue(64).unwrap();
        w.write_ue(64).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(false).unwrap();
        w.write_ue(9).unwrap();
        w.write_rbsp_trailing_bits().unwrap();
        let err = Sps::parse(&w.finish()).unwrap_err();
        assert_eq!(
            err.into_error(),
            Error::format("SPS", "sps_bitdepth_minus8 9 out of range")
        );
    }
}
