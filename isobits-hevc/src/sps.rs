//! Sequence Parameter Set (SPS) parsing.
//!
//! Everything up to the extension flags is decoded: profile/tier/level,
//! picture geometry, coding block and transform sizes, scaling lists, PCM,
//! short- and long-term reference picture sets and the VUI. When a range,
//! multilayer, 3D or SCC extension is signalled the parser returns the
//! populated prefix as [`ParseError::Incomplete`].

use isobits_core::{
    EbspReader, Error, ExpGolombRead, ParseError, ParseResult, ReadBits, Result, ResultExt,
};

use crate::nal::{NalUnitHeader, NalUnitType};
use crate::ptl::{HevcLevel, HevcProfile, HevcTier, ProfileTierLevel};
use crate::rps::ShortTermRefPicSet;
use crate::scaling::ScalingListData;
use crate::vps::{read_sub_layer_ordering, SubLayerOrdering};
use crate::vui::{VuiParameters, Window};

const STRUCTURE: &str = "SPS";

/// Largest `num_short_term_ref_pic_sets`.
const MAX_SHORT_TERM_REF_PIC_SETS: u32 = 64;

/// Largest `num_long_term_ref_pics_sps`.
const MAX_LONG_TERM_REF_PICS_SPS: u32 = 32;

/// PCM sample parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcmParameters {
    pub pcm_sample_bit_depth_luma_minus1: u8,
    pub pcm_sample_bit_depth_chroma_minus1: u8,
    pub log2_min_pcm_luma_coding_block_size_minus3: u32,
    pub log2_diff_max_min_pcm_luma_coding_block_size: u32,
    pub pcm_loop_filter_disabled_flag: bool,
}

/// Which SPS extensions are signalled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpsExtensionFlags {
    pub sps_range_extension_flag: bool,
    pub sps_multilayer_extension_flag: bool,
    pub sps_3d_extension_flag: bool,
    pub sps_scc_extension_flag: bool,
    pub sps_extension_4bits: u8,
}

impl SpsExtensionFlags {
    /// Check if any extension payload follows.
    pub fn any(&self) -> bool {
        self.sps_range_extension_flag
            || self.sps_multilayer_extension_flag
            || self.sps_3d_extension_flag
            || self.sps_scc_extension_flag
            || self.sps_extension_4bits != 0
    }
}

/// Sequence Parameter Set (SPS).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sps {
    /// VPS ID.
    pub sps_video_parameter_set_id: u8,
    /// Maximum sub-layers minus 1.
    pub sps_max_sub_layers_minus1: u8,
    /// Temporal ID nesting flag.
    pub sps_temporal_id_nesting_flag: bool,
    /// Profile, tier, level info.
    pub profile_tier_level: ProfileTierLevel,
    /// SPS ID (0-15).
    pub sps_seq_parameter_set_id: u32,
    /// Chroma format IDC (0=mono, 1=4:2:0, 2=4:2:2, 3=4:4:4).
    pub chroma_format_idc: u8,
    /// Separate color plane flag.
    pub separate_colour_plane_flag: bool,
    /// Picture width in luma samples.
    pub pic_width_in_luma_samples: u32,
    /// Picture height in luma samples.
    pub pic_height_in_luma_samples: u32,
    /// Conformance window, in chroma sample units.
    pub conformance_window: Option<Window>,
    /// Bit depth luma minus 8.
    pub bit_depth_luma_minus8: u8,
    /// Bit depth chroma minus 8.
    pub bit_depth_chroma_minus8: u8,
    /// Log2 max POC LSB minus 4.
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub sps_sub_layer_ordering_info_present_flag: bool,
    /// One entry per sub-layer, inferred entries filled in.
    pub sub_layer_ordering: Vec<SubLayerOrdering>,
    pub log2_min_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_luma_coding_block_size: u8,
    pub log2_min_luma_transform_block_size_minus2: u8,
    pub log2_diff_max_min_luma_transform_block_size: u8,
    pub max_transform_hierarchy_depth_inter: u32,
    pub max_transform_hierarchy_depth_intra: u32,
    pub scaling_list_enabled_flag: bool,
    /// Explicit lists; `None` with `scaling_list_enabled_flag` means the
    /// default lists apply.
    pub scaling_list_data: Option<ScalingListData>,
    pub amp_enabled_flag: bool,
    pub sample_adaptive_offset_enabled_flag: bool,
    pub pcm: Option<PcmParameters>,
    /// Short-term reference picture sets, inter-predicted ones expanded.
    pub st_ref_pic_sets: Vec<ShortTermRefPicSet>,
    pub long_term_ref_pics_present_flag: bool,
    pub lt_ref_pic_poc_lsb_sps: Vec<u32>,
    pub used_by_curr_pic_lt_sps_flag: Vec<bool>,
    pub sps_temporal_mvp_enabled_flag: bool,
    pub strong_intra_smoothing_enabled_flag: bool,
    pub vui: Option<VuiParameters>,
    pub extensions: SpsExtensionFlags,
}

fn check(value: u32, max: u32, field: &'static str) -> Result<u8> {
    if value > max {
        return Err(Error::format(STRUCTURE, format!("{field} {value} out of range")));
    }
    Ok(value as u8)
}

impl Sps {
    /// Parse an SPS NAL unit.
    ///
    /// A signalled extension stops the parse with
    /// [`ParseError::Incomplete`] holding every field read so far.
    pub fn parse(nalu: &[u8]) -> ParseResult<Self> {
        let mut reader = EbspReader::new(nalu);
        let header = NalUnitHeader::parse(&mut reader)?;
        if header.nal_unit_type != NalUnitType::SpsNut {
            return Err(Error::wrong_nal_type(STRUCTURE, header.nal_unit_type.to_u8()).into());
        }
        let sps = Self::parse_from_reader(&mut reader).within(STRUCTURE, reader.bit_position())?;
        if sps.extensions.any() {
            tracing::warn!(
                sps_id = sps.sps_seq_parameter_set_id,
                bit_offset = reader.bit_position(),
                "SPS extension not decoded"
            );
            return Err(ParseError::stopped(sps, Error::unsupported(STRUCTURE, "SPS extensions")));
        }
        reader
            .read_rbsp_trailing_bits()
            .within(STRUCTURE, reader.bit_position())?;
        Ok(sps)
    }

    /// Parse the SPS RBSP through the extension flags from a reader
    /// positioned after the NAL header.
    pub fn parse_from_reader(reader: &mut EbspReader<'_>) -> Result<Self> {
        let sps_video_parameter_set_id = reader.read_bits(4)? as u8;
        let sps_max_sub_layers_minus1 = reader.read_bits(3)? as u8;
        let sps_temporal_id_nesting_flag = reader.read_flag()?;

        let profile_tier_level = ProfileTierLevel::parse(reader, true, sps_max_sub_layers_minus1)?;

        let sps_seq_parameter_set_id = reader.read_ue()?;
        check(sps_seq_parameter_set_id, 15, "sps_seq_parameter_set_id")?;
        let chroma_format_idc = check(reader.read_ue()?, 3, "chroma_format_idc")?;
        let separate_colour_plane_flag = chroma_format_idc == 3 && reader.read_flag()?;

        let pic_width_in_luma_samples = reader.read_ue()?;
        let pic_height_in_luma_samples = reader.read_ue()?;
        let conformance_window = if reader.read_flag()? {
            Some(Window::parse(reader)?)
        } else {
            None
        };

        let bit_depth_luma_minus8 = check(reader.read_ue()?, 8, "bit_depth_luma_minus8")?;
        let bit_depth_chroma_minus8 = check(reader.read_ue()?, 8, "bit_depth_chroma_minus8")?;
        let log2_max_pic_order_cnt_lsb_minus4 =
            check(reader.read_ue()?, 12, "log2_max_pic_order_cnt_lsb_minus4")?;

        let sps_sub_layer_ordering_info_present_flag = reader.read_flag()?;
        let sub_layer_ordering = read_sub_layer_ordering(
            reader,
            sps_sub_layer_ordering_info_present_flag,
            sps_max_sub_layers_minus1,
        )?;

        let log2_min_luma_coding_block_size_minus3 =
            check(reader.read_ue()?, 3, "log2_min_luma_coding_block_size_minus3")?;
        let log2_diff_max_min_luma_coding_block_size = check(
            reader.read_ue()?,
            3 - u32::from(log2_min_luma_coding_block_size_minus3),
            "log2_diff_max_min_luma_coding_block_size",
        )?;
        let log2_min_luma_transform_block_size_minus2 =
            check(reader.read_ue()?, 3, "log2_min_luma_transform_block_size_minus2")?;
        let log2_diff_max_min_luma_transform_block_size = check(
            reader.read_ue()?,
            3 - u32::from(log2_min_luma_transform_block_size_minus2),
            "log2_diff_max_min_luma_transform_block_size",
        )?;
        let max_transform_hierarchy_depth_inter = reader.read_ue()?;
        let max_transform_hierarchy_depth_intra = reader.read_ue()?;

        let scaling_list_enabled_flag = reader.read_flag()?;
        let scaling_list_data = if scaling_list_enabled_flag && reader.read_flag()? {
            Some(ScalingListData::parse(reader)?)
        } else {
            None
        };

        let amp_enabled_flag = reader.read_flag()?;
        let sample_adaptive_offset_enabled_flag = reader.read_flag()?;

        let pcm = if reader.read_flag()? {
            Some(PcmParameters {
                pcm_sample_bit_depth_luma_minus1: reader.read_bits(4)? as u8,
                pcm_sample_bit_depth_chroma_minus1: reader.read_bits(4)? as u8,
                log2_min_pcm_luma_coding_block_size_minus3: reader.read_ue()?,
                log2_diff_max_min_pcm_luma_coding_block_size: reader.read_ue()?,
                pcm_loop_filter_disabled_flag: reader.read_flag()?,
            })
        } else {
            None
        };

        let num_short_term_ref_pic_sets = usize::from(check(
            reader.read_ue()?,
            MAX_SHORT_TERM_REF_PIC_SETS,
            "num_short_term_ref_pic_sets",
        )?);
        let mut st_ref_pic_sets = Vec::with_capacity(num_short_term_ref_pic_sets);
        for i in 0..num_short_term_ref_pic_sets {
            let set = ShortTermRefPicSet::parse(
                reader,
                i,
                num_short_term_ref_pic_sets,
                &st_ref_pic_sets,
            )?;
            st_ref_pic_sets.push(set);
        }

        let long_term_ref_pics_present_flag = reader.read_flag()?;
        let mut lt_ref_pic_poc_lsb_sps = Vec::new();
        let mut used_by_curr_pic_lt_sps_flag = Vec::new();
        if long_term_ref_pics_present_flag {
            let count = check(
                reader.read_ue()?,
                MAX_LONG_TERM_REF_PICS_SPS,
                "num_long_term_ref_pics_sps",
            )?;
            let lsb_bits = log2_max_pic_order_cnt_lsb_minus4 + 4;
            for _ in 0..count {
                lt_ref_pic_poc_lsb_sps.push(reader.read_bits(lsb_bits)?);
                used_by_curr_pic_lt_sps_flag.push(reader.read_flag()?);
            }
        }

        let sps_temporal_mvp_enabled_flag = reader.read_flag()?;
        let strong_intra_smoothing_enabled_flag = reader.read_flag()?;
        let vui = if reader.read_flag()? {
            Some(VuiParameters::parse(reader, sps_max_sub_layers_minus1)?)
        } else {
            None
        };

        let extensions = if reader.read_flag()? {
            SpsExtensionFlags {
                sps_range_extension_flag: reader.read_flag()?,
                sps_multilayer_extension_flag: reader.read_flag()?,
                sps_3d_extension_flag: reader.read_flag()?,
                sps_scc_extension_flag: reader.read_flag()?,
                sps_extension_4bits: reader.read_bits(4)? as u8,
            }
        } else {
            SpsExtensionFlags::default()
        };

        Ok(Self {
            sps_video_parameter_set_id,
            sps_max_sub_layers_minus1,
            sps_temporal_id_nesting_flag,
            profile_tier_level,
            sps_seq_parameter_set_id,
            chroma_format_idc,
            separate_colour_plane_flag,
            pic_width_in_luma_samples,
            pic_height_in_luma_samples,
            conformance_window,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            log2_max_pic_order_cnt_lsb_minus4,
            sps_sub_layer_ordering_info_present_flag,
            sub_layer_ordering,
            log2_min_luma_coding_block_size_minus3,
            log2_diff_max_min_luma_coding_block_size,
            log2_min_luma_transform_block_size_minus2,
            log2_diff_max_min_luma_transform_block_size,
            max_transform_hierarchy_depth_inter,
            max_transform_hierarchy_depth_intra,
            scaling_list_enabled_flag,
            scaling_list_data,
            amp_enabled_flag,
            sample_adaptive_offset_enabled_flag,
            pcm,
            st_ref_pic_sets,
            long_term_ref_pics_present_flag,
            lt_ref_pic_poc_lsb_sps,
            used_by_curr_pic_lt_sps_flag,
            sps_temporal_mvp_enabled_flag,
            strong_intra_smoothing_enabled_flag,
            vui,
            extensions,
        })
    }

    /// Get the profile.
    pub fn profile(&self) -> Option<HevcProfile> {
        self.profile_tier_level.profile()
    }

    /// Get the tier.
    pub fn tier(&self) -> HevcTier {
        self.profile_tier_level.tier()
    }

    /// Get the level.
    pub fn level(&self) -> HevcLevel {
        self.profile_tier_level.level()
    }

    /// ChromaArrayType: 0 when colour planes are coded separately.
    pub fn chroma_array_type(&self) -> u8 {
        if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        }
    }

    /// Get chroma subsampling width factor.
    pub fn sub_width_c(&self) -> u32 {
        match self.chroma_array_type() {
            1 | 2 => 2,
            _ => 1,
        }
    }

    /// Get chroma subsampling height factor.
    pub fn sub_height_c(&self) -> u32 {
        match self.chroma_array_type() {
            1 => 2,
            _ => 1,
        }
    }

    /// Get the picture width after conformance window cropping.
    pub fn width(&self) -> u32 {
        let crop = self.conformance_window.map_or(0, |w| {
            w.left_offset.saturating_add(w.right_offset).saturating_mul(self.sub_width_c())
        });
        self.pic_width_in_luma_samples.saturating_sub(crop)
    }

    /// Get the picture height after conformance window cropping.
    pub fn height(&self) -> u32 {
        let crop = self.conformance_window.map_or(0, |w| {
            w.top_offset.saturating_add(w.bottom_offset).saturating_mul(self.sub_height_c())
        });
        self.pic_height_in_luma_samples.saturating_sub(crop)
    }

    /// Get bit depth for luma.
    pub fn bit_depth_luma(&self) -> u8 {
        8 + self.bit_depth_luma_minus8
    }

    /// Get bit depth for chroma.
    pub fn bit_depth_chroma(&self) -> u8 {
        8 + self.bit_depth_chroma_minus8
    }

    /// Width in bits of `slice_pic_order_cnt_lsb`.
    pub fn log2_max_pic_order_cnt_lsb(&self) -> u8 {
        self.log2_max_pic_order_cnt_lsb_minus4 + 4
    }

    /// Get the log2 of the minimum coding block size.
    pub fn log2_min_cb_size(&self) -> u8 {
        self.log2_min_luma_coding_block_size_minus3 + 3
    }

    /// CtbLog2SizeY.
    pub fn log2_ctb_size(&self) -> u8 {
        self.log2_min_cb_size() + self.log2_diff_max_min_luma_coding_block_size
    }

    /// CtbSizeY.
    pub fn ctb_size(&self) -> u32 {
        1 << self.log2_ctb_size()
    }

    /// PicWidthInCtbsY.
    pub fn pic_width_in_ctbs(&self) -> u32 {
        self.pic_width_in_luma_samples.div_ceil(self.ctb_size())
    }

    /// PicHeightInCtbsY.
    pub fn pic_height_in_ctbs(&self) -> u32 {
        self.pic_height_in_luma_samples.div_ceil(self.ctb_size())
    }

    /// PicSizeInCtbsY.
    pub fn pic_size_in_ctbs(&self) -> u32 {
        self.pic_width_in_ctbs().saturating_mul(self.pic_height_in_ctbs())
    }

    /// Get the minimum transform block size.
    pub fn min_tb_size(&self) -> u32 {
        1 << (self.log2_min_luma_transform_block_size_minus2 + 2)
    }

    /// Get the maximum transform block size.
    pub fn max_tb_size(&self) -> u32 {
        self.min_tb_size() << self.log2_diff_max_min_luma_transform_block_size
    }

    /// DPB size of the highest sub-layer, in pictures.
    pub fn max_dec_pic_buffering(&self) -> u32 {
        self.sub_layer_ordering
            .last()
            .map_or(1, |o| o.max_dec_pic_buffering_minus1.saturating_add(1))
    }

    /// Sample aspect ratio from the VUI, if signalled.
    pub fn sar(&self) -> Option<(u16, u16)> {
        self.vui
            .as_ref()
            .filter(|vui| vui.aspect_ratio_info_present_flag && vui.sar_width != 0)
            .map(|vui| (vui.sar_width, vui.sar_height))
    }

    /// Pictures per second as `(time_scale, num_units_in_tick)`.
    pub fn frame_rate(&self) -> Option<(u32, u32)> {
        self.vui
            .as_ref()
            .and_then(|vui| vui.timing_info.as_ref())
            .and_then(|t| t.frame_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobits_core::{EbspWriter, ExpGolombWrite, WriteBits};

    /// A Main profile 1920x1080 SPS with VUI timing.
    const SPS_1080P: &str =
        "420101016000000300900000030000030078a003c08010e596566924cae010000003001000000301e080";

    fn sps_1080p() -> Vec<u8> {
        hex::decode(SPS_1080P).unwrap()
    }

    #[test]
    fn test_parse_1080p() {
        let sps = Sps::parse(&sps_1080p()).unwrap();
        assert_eq!(sps.sps_seq_parameter_set_id, 0);
        assert_eq!(sps.profile(), Some(HevcProfile::Main));
        assert_eq!(sps.level(), HevcLevel::from_idc(120));
        assert_eq!(sps.chroma_format_idc, 1);
        assert_eq!((sps.width(), sps.height()), (1920, 1080));
        assert_eq!(sps.bit_depth_luma(), 8);
        assert_eq!(sps.log2_max_pic_order_cnt_lsb(), 8);
        assert_eq!(sps.log2_ctb_size(), 6);
        assert_eq!(sps.pic_width_in_ctbs(), 30);
        assert_eq!(sps.pic_height_in_ctbs(), 17);
        assert_eq!(sps.pic_size_in_ctbs(), 510);
        assert_eq!(sps.max_tb_size(), 32);
        assert_eq!(sps.max_dec_pic_buffering(), 5);
        assert!(sps.sample_adaptive_offset_enabled_flag);
        assert!(!sps.amp_enabled_flag);
        assert!(sps.st_ref_pic_sets.is_empty());
        assert!(sps.sps_temporal_mvp_enabled_flag);
        assert_eq!(sps.frame_rate(), Some((30, 1)));
        assert!(!sps.extensions.any());
    }

    #[test]
    fn test_wrong_nal_type() {
        let mut data = sps_1080p();
        data[0] = 0x44;
        let err = Sps::parse(&data).unwrap_err();
        assert!(err.partial().is_none());
        assert_eq!(err.into_error(), Error::wrong_nal_type(STRUCTURE, 34));
    }

    #[test]
    fn test_truncated_prefixes_fail_cleanly() {
        let data = sps_1080p();
        for len in 0..data.len() - 1 {
            let err = Sps::parse(&data[..len]).unwrap_err();
            assert!(err.partial().is_none(), "prefix {len}");
        }
    }

    /// A 4:2:2 10-bit SPS with cropping, PCM, two reference picture sets
    /// and long-term pictures. `extension` sets sps_range_extension_flag.
    fn rich_sps(extension: bool) -> Vec<u8> {
        let mut w = EbspWriter::new();
        w.write_bits(0x4201, 16).unwrap();
        w.write_bits(1, 4).unwrap(); // vps id
        w.write_bits(0, 3).unwrap();
        w.write_flag(true).unwrap();
        w.write_bits(4, 8).unwrap(); // profile_idc 4
        w.write_bits(0x0800_0000, 32).unwrap();
        w.write_bits_u64(0x8000_0000_0000, 48).unwrap();
        w.write_bits(153, 8).unwrap();
        w.write_ue(2).unwrap(); // sps id
        w.write_ue(2).unwrap(); // 4:2:2
        w.write_ue(1280).unwrap();
        w.write_ue(720).unwrap();
        w.write_flag(true).unwrap();
        for v in [2, 2, 0, 4] {
            w.write_ue(v).unwrap();
        }
        w.write_ue(2).unwrap();
        w.write_ue(2).unwrap();
        w.write_ue(4).unwrap(); // log2_max_pic_order_cnt_lsb_minus4
        w.write_flag(true).unwrap();
        w.write_ue(3).unwrap();
        w.write_ue(1).unwrap();
        w.write_ue(0).unwrap();
        w.write_ue(0).unwrap(); // min cb 8
        w.write_ue(2).unwrap(); // ctb 32
        w.write_ue(0).unwrap();
        w.write_ue(3).unwrap();
        w.write_ue(1).unwrap();
        w.write_ue(1).unwrap();
        w.write_flag(false).unwrap(); // scaling_list_enabled_flag
        w.write_flag(true).unwrap(); // amp
        w.write_flag(false).unwrap(); // sao
        w.write_flag(true).unwrap(); // pcm_enabled_flag
        w.write_bits(7, 4).unwrap();
        w.write_bits(7, 4).unwrap();
        w.write_ue(0).unwrap();
        w.write_ue(1).unwrap();
        w.write_flag(true).unwrap();
        w.write_ue(2).unwrap(); // num_short_term_ref_pic_sets
        w.write_ue(1).unwrap(); // set 0: {-1}
        w.write_ue(0).unwrap();
        w.write_ue(0).unwrap();
        w.write_flag(true).unwrap();
        w.write_flag(true).unwrap(); // set 1 predicted, deltaRps = -1
        w.write_flag(true).unwrap();
        w.write_ue(0).unwrap();
        w.write_flag(true).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(true).unwrap(); // use_delta_flag
        w.write_flag(true).unwrap(); // long_term_ref_pics_present_flag
        w.write_ue(2).unwrap();
        w.write_bits(17, 8).unwrap();
        w.write_flag(true).unwrap();
        w.write_bits(200, 8).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(true).unwrap(); // sps_temporal_mvp_enabled_flag
        w.write_flag(false).unwrap();
        w.write_flag(false).unwrap(); // vui_parameters_present_flag
        w.write_flag(extension).unwrap();
        if extension {
            w.write_flag(true).unwrap();
            w.write_bits(0, 7).unwrap();
            w.write_bits(0xAB, 8).unwrap(); // range extension payload
        }
        w.write_rbsp_trailing_bits().unwrap();
        w.finish()
    }

    #[test]
    fn test_rich_sps() {
        let sps = Sps::parse(&rich_sps(false)).unwrap();
        assert_eq!(sps.sps_video_parameter_set_id, 1);
        assert_eq!(sps.sps_seq_parameter_set_id, 2);
        assert_eq!(sps.profile(), Some(HevcProfile::RangeExtensions));
        assert!(sps.profile_tier_level.general_profile.progressive_source_flag());
        assert_eq!(sps.sub_width_c(), 2);
        assert_eq!(sps.sub_height_c(), 1);
        assert_eq!(sps.width(), 1280 - 8);
        assert_eq!(sps.height(), 720 - 4);
        assert_eq!(sps.bit_depth_chroma(), 10);
        assert_eq!(sps.ctb_size(), 32);
        assert_eq!(sps.pic_size_in_ctbs(), 40 * 23);
        assert_eq!(sps.pcm.map(|p| p.pcm_sample_bit_depth_luma_minus1), Some(7));
        assert_eq!(sps.st_ref_pic_sets.len(), 2);
        assert_eq!(sps.st_ref_pic_sets[1].delta_poc_s0, vec![-1, -2]);
        assert_eq!(sps.st_ref_pic_sets[1].used_by_curr_pic_s0, vec![false, true]);
        assert_eq!(sps.lt_ref_pic_poc_lsb_sps, vec![17, 200]);
        assert_eq!(sps.used_by_curr_pic_lt_sps_flag, vec![true, false]);
    }

    #[test]
    fn test_extension_returns_partial() {
        let err = Sps::parse(&rich_sps(true)).unwrap_err();
        assert!(err.error().is_unsupported());
        let partial = err.into_partial().unwrap();
        assert!(partial.extensions.sps_range_extension_flag);
        assert_eq!(partial.width(), 1272);
        assert_eq!(crate::codec_string(&partial), "hvc1.4.10.L153.80");
    }

    #[test]
    fn test_out_of_range_id() {
        let mut w = EbspWriter::new();
        w.write_bits(0x4201, 16).unwrap();
        w.write_bits(0, 8).unwrap();
        w.write_bits(1, 8).unwrap();
        w.write_bits(0, 32).unwrap();
        w.write_bits_u64(0, 48).unwrap();
        w.write_bits(93, 8).unwrap();
        w.write_ue(16).unwrap();
        w.write_rbsp_trailing_bits().unwrap();
        let err = Sps::parse(&w.finish()).unwrap_err().into_error();
        assert!(matches!(err, Error::Format { structure: "SPS", .. }));
    }
}
