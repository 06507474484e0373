//! Sequence Parameter Set (SPS) parsing.
//!
//! The SPS contains essential parameters about the video sequence:
//! profile and level, chroma format and bit depth, frame numbering, picture
//! size and cropping, plus the optional VUI block with timing and HRD data.

use isobits_core::vui::sample_aspect_ratio;
use isobits_core::{BitResult, EbspReader, Error, ExpGolombRead, ReadBits, Result, ResultExt};

use crate::nal::{NalHeader, NalUnitType};
use crate::{AvcLevel, AvcProfile};

pub use isobits_core::vui::EXTENDED_SAR;

const STRUCTURE: &str = "SPS";

/// profile_idc values whose SPS carries the chroma/bit-depth block.
const HIGH_PROFILE_IDCS: [u8; 13] = [
    100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135,
];

/// Sequence Parameter Set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceParameterSet {
    /// Profile IDC.
    pub profile_idc: u8,
    /// Constraint set flags (constraint_set0_flag in the MSB) and reserved bits.
    pub constraint_set_flags: u8,
    /// Level IDC.
    pub level_idc: u8,
    /// SPS ID (0-31).
    pub sps_id: u32,
    /// Chroma format IDC (0=mono, 1=4:2:0, 2=4:2:2, 3=4:4:4).
    pub chroma_format_idc: u32,
    /// Separate color plane flag.
    pub separate_colour_plane_flag: bool,
    /// Luma bit depth minus 8 (0-6).
    pub bit_depth_luma_minus8: u32,
    /// Chroma bit depth minus 8 (0-6).
    pub bit_depth_chroma_minus8: u32,
    /// Lossless transform bypass for QP'Y 0.
    pub qpprime_y_zero_transform_bypass_flag: bool,
    /// Sequence scaling matrix present.
    pub seq_scaling_matrix_present_flag: bool,
    /// Sequence scaling lists, 4x4 lists first (empty when not present).
    pub seq_scaling_lists: Vec<ScalingList>,
    /// Log2 of max frame number minus 4.
    pub log2_max_frame_num_minus4: u32,
    /// Picture order count type (0-2).
    pub pic_order_cnt_type: u32,
    /// Log2 of max POC LSB minus 4.
    pub log2_max_pic_order_cnt_lsb_minus4: u32,
    /// Delta POC always zero flag.
    pub delta_pic_order_always_zero_flag: bool,
    /// Offset for non-reference pictures.
    pub offset_for_non_ref_pic: i32,
    /// Offset for top to bottom field.
    pub offset_for_top_to_bottom_field: i32,
    /// Expected POC deltas of the reference frames in one POC cycle.
    pub offset_for_ref_frame: Vec<i32>,
    /// Maximum number of reference frames.
    pub max_num_ref_frames: u32,
    /// Gaps in frame number allowed.
    pub gaps_in_frame_num_value_allowed_flag: bool,
    /// Picture width in macroblocks minus 1.
    pub pic_width_in_mbs_minus1: u32,
    /// Picture height in map units minus 1.
    pub pic_height_in_map_units_minus1: u32,
    /// Frame MBS only flag.
    pub frame_mbs_only_flag: bool,
    /// MB adaptive frame field flag.
    pub mb_adaptive_frame_field_flag: bool,
    /// Direct 8x8 inference flag.
    pub direct_8x8_inference_flag: bool,
    /// Frame cropping flag.
    pub frame_cropping_flag: bool,
    /// Frame crop left offset.
    pub frame_crop_left_offset: u32,
    /// Frame crop right offset.
    pub frame_crop_right_offset: u32,
    /// Frame crop top offset.
    pub frame_crop_top_offset: u32,
    /// Frame crop bottom offset.
    pub frame_crop_bottom_offset: u32,
    /// VUI parameters present flag.
    pub vui_parameters_present_flag: bool,
    /// VUI parameters.
    pub vui: Option<VuiParameters>,
    /// Raw bytes read, header included, once `vui_parameters_present_flag`
    /// was consumed.
    pub nr_bytes_before_vui: usize,
    /// Raw bytes read, header included, at the end of the VUI.
    pub nr_bytes_read: usize,
}

impl SequenceParameterSet {
    /// Parse an SPS NAL unit, header byte included.
    pub fn parse(nalu: &[u8]) -> Result<Self> {
        let mut reader = EbspReader::new(nalu);
        let header = NalHeader::parse(&mut reader).within(STRUCTURE, 0)?;
        if header.nal_unit_type != NalUnitType::Sps {
            return Err(Error::wrong_nal_type(STRUCTURE, header.nal_unit_type.to_u8()));
        }

        let sps = Self::parse_from_reader(&mut reader).within(STRUCTURE, reader.bit_position())?;
        reader
            .read_rbsp_trailing_bits()
            .within(STRUCTURE, reader.bit_position())?;
        Ok(sps)
    }

    /// Parse `seq_parameter_set_data()` from a reader positioned after the
    /// NAL header.
    pub fn parse_from_reader(reader: &mut EbspReader<'_>) -> Result<Self> {
        let profile_idc = reader.read_u8()?;
        let constraint_set_flags = reader.read_u8()?;
        let level_idc = reader.read_u8()?;
        let sps_id = reader.read_ue()?;

        // High profile extensions
        let (
            chroma_format_idc,
            separate_colour_plane_flag,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            qpprime_y_zero_transform_bypass_flag,
            seq_scaling_matrix_present_flag,
            seq_scaling_lists,
        ) = if HIGH_PROFILE_IDCS.contains(&profile_idc) {
            let chroma_format_idc = reader.read_ue()?;
            if chroma_format_idc > 3 {
                return Err(Error::format(
                    STRUCTURE,
                    format!("chroma_format_idc {chroma_format_idc} out of range"),
                ));
            }
            let separate_colour_plane_flag = if chroma_format_idc == 3 {
                reader.read_flag()?
            } else {
                false
            };
            let bit_depth_luma_minus8 = reader.read_ue()?;
            let bit_depth_chroma_minus8 = reader.read_ue()?;
            let bypass = reader.read_flag()?;
            let matrix_present = reader.read_flag()?;
            let lists = if matrix_present {
                let count = if chroma_format_idc != 3 { 8 } else { 12 };
                read_scaling_lists(reader, count)?
            } else {
                Vec::new()
            };
            (
                chroma_format_idc,
                separate_colour_plane_flag,
                bit_depth_luma_minus8,
                bit_depth_chroma_minus8,
                bypass,
                matrix_present,
                lists,
            )
        } else {
            (1, false, 0, 0, false, false, Vec::new()) // Default: 4:2:0, 8-bit
        };

        let log2_max_frame_num_minus4 = reader.read_ue()?;
        let pic_order_cnt_type = reader.read_ue()?;

        let mut log2_max_pic_order_cnt_lsb_minus4 = 0;
        let mut delta_pic_order_always_zero_flag = false;
        let mut offset_for_non_ref_pic = 0;
        let mut offset_for_top_to_bottom_field = 0;
        let mut offset_for_ref_frame = Vec::new();
        match pic_order_cnt_type {
            0 => log2_max_pic_order_cnt_lsb_minus4 = reader.read_ue()?,
            1 => {
                delta_pic_order_always_zero_flag = reader.read_flag()?;
                offset_for_non_ref_pic = reader.read_se()?;
                offset_for_top_to_bottom_field = reader.read_se()?;
                let count = reader.read_ue()?;
                // Each entry takes at least one bit; EOF ends a bogus count.
                for _ in 0..count {
                    offset_for_ref_frame.push(reader.read_se()?);
                }
            }
            _ => {}
        }

        let max_num_ref_frames = reader.read_ue()?;
        let gaps_in_frame_num_value_allowed_flag = reader.read_flag()?;
        let pic_width_in_mbs_minus1 = reader.read_ue()?;
        let pic_height_in_map_units_minus1 = reader.read_ue()?;
        let frame_mbs_only_flag = reader.read_flag()?;
        let mb_adaptive_frame_field_flag = if !frame_mbs_only_flag {
            reader.read_flag()?
        } else {
            false
        };
        let direct_8x8_inference_flag = reader.read_flag()?;

        let (
            frame_cropping_flag,
            frame_crop_left_offset,
            frame_crop_right_offset,
            frame_crop_top_offset,
            frame_crop_bottom_offset,
        ) = if reader.read_flag()? {
            (
                true,
                reader.read_ue()?,
                reader.read_ue()?,
                reader.read_ue()?,
                reader.read_ue()?,
            )
        } else {
            (false, 0, 0, 0, 0)
        };

        let vui_parameters_present_flag = reader.read_flag()?;
        let nr_bytes_before_vui = reader.bytes_read();
        let vui = if vui_parameters_present_flag {
            Some(VuiParameters::parse(reader)?)
        } else {
            None
        };
        let nr_bytes_read = reader.bytes_read();

        Ok(Self {
            profile_idc,
            constraint_set_flags,
            level_idc,
            sps_id,
            chroma_format_idc,
            separate_colour_plane_flag,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            qpprime_y_zero_transform_bypass_flag,
            seq_scaling_matrix_present_flag,
            seq_scaling_lists,
            log2_max_frame_num_minus4,
            pic_order_cnt_type,
            log2_max_pic_order_cnt_lsb_minus4,
            delta_pic_order_always_zero_flag,
            offset_for_non_ref_pic,
            offset_for_top_to_bottom_field,
            offset_for_ref_frame,
            max_num_ref_frames,
            gaps_in_frame_num_value_allowed_flag,
            pic_width_in_mbs_minus1,
            pic_height_in_map_units_minus1,
            frame_mbs_only_flag,
            mb_adaptive_frame_field_flag,
            direct_8x8_inference_flag,
            frame_cropping_flag,
            frame_crop_left_offset,
            frame_crop_right_offset,
            frame_crop_top_offset,
            frame_crop_bottom_offset,
            vui_parameters_present_flag,
            vui,
            nr_bytes_before_vui,
            nr_bytes_read,
        })
    }

    /// Get the profile.
    pub fn profile(&self) -> Option<AvcProfile> {
        AvcProfile::from_idc(self.profile_idc)
    }

    /// Get the level.
    pub fn level(&self) -> AvcLevel {
        AvcLevel::from_idc(self.level_idc)
    }

    /// Check constraint_setN_flag (N in 0..=5).
    pub fn constraint_set_flag(&self, n: u8) -> bool {
        n < 8 && self.constraint_set_flags & (0x80 >> n) != 0
    }

    /// ChromaArrayType: 0 when the colour planes are coded separately.
    pub fn chroma_array_type(&self) -> u32 {
        if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        }
    }

    /// SubWidthC from Table 6-1 (1 for monochrome and 4:4:4).
    pub fn sub_width_c(&self) -> u32 {
        match self.chroma_format_idc {
            1 | 2 => 2,
            _ => 1,
        }
    }

    /// SubHeightC from Table 6-1.
    pub fn sub_height_c(&self) -> u32 {
        match self.chroma_format_idc {
            1 => 2,
            _ => 1,
        }
    }

    /// Horizontal crop unit in luma samples (eq. 7-19, 7-21).
    pub fn crop_unit_x(&self) -> u32 {
        if self.chroma_array_type() == 0 {
            1
        } else {
            self.sub_width_c()
        }
    }

    /// Vertical crop unit in luma samples (eq. 7-20, 7-22).
    pub fn crop_unit_y(&self) -> u32 {
        let field_factor = 2 - u32::from(self.frame_mbs_only_flag);
        if self.chroma_array_type() == 0 {
            field_factor
        } else {
            self.sub_height_c() * field_factor
        }
    }

    /// PicWidthInMbs.
    pub fn pic_width_in_mbs(&self) -> u32 {
        self.pic_width_in_mbs_minus1.saturating_add(1)
    }

    /// FrameHeightInMbs.
    pub fn frame_height_in_mbs(&self) -> u32 {
        let map_units = self.pic_height_in_map_units_minus1.saturating_add(1);
        map_units.saturating_mul(2 - u32::from(self.frame_mbs_only_flag))
    }

    /// PicSizeInMapUnits.
    pub fn pic_size_in_map_units(&self) -> u32 {
        self.pic_width_in_mbs()
            .saturating_mul(self.pic_height_in_map_units_minus1.saturating_add(1))
    }

    /// Get the picture width in pixels.
    /// Uses saturating arithmetic to prevent overflow from malformed data.
    pub fn width(&self) -> u32 {
        let width = self.pic_width_in_mbs().saturating_mul(16);
        if self.frame_cropping_flag {
            let crop = self
                .frame_crop_left_offset
                .saturating_add(self.frame_crop_right_offset);
            width.saturating_sub(self.crop_unit_x().saturating_mul(crop))
        } else {
            width
        }
    }

    /// Get the picture height in pixels.
    /// Uses saturating arithmetic to prevent overflow from malformed data.
    pub fn height(&self) -> u32 {
        let height = self.frame_height_in_mbs().saturating_mul(16);
        if self.frame_cropping_flag {
            let crop = self
                .frame_crop_top_offset
                .saturating_add(self.frame_crop_bottom_offset);
            height.saturating_sub(self.crop_unit_y().saturating_mul(crop))
        } else {
            height
        }
    }

    /// Luma bit depth.
    pub fn bit_depth_luma(&self) -> u32 {
        self.bit_depth_luma_minus8.saturating_add(8)
    }

    /// Chroma bit depth.
    pub fn bit_depth_chroma(&self) -> u32 {
        self.bit_depth_chroma_minus8.saturating_add(8)
    }

    /// Width in bits of `frame_num`.
    pub fn log2_max_frame_num(&self) -> u32 {
        self.log2_max_frame_num_minus4.saturating_add(4)
    }

    /// Width in bits of `pic_order_cnt_lsb`.
    pub fn log2_max_pic_order_cnt_lsb(&self) -> u32 {
        self.log2_max_pic_order_cnt_lsb_minus4.saturating_add(4)
    }

    /// MaxFrameNum, or `None` if the signalled width is out of range.
    pub fn max_frame_num(&self) -> Option<u32> {
        1u32.checked_shl(self.log2_max_frame_num())
    }

    /// Sample aspect ratio from the VUI, if signalled.
    pub fn sar(&self) -> Option<(u16, u16)> {
        self.vui
            .as_ref()
            .filter(|vui| vui.aspect_ratio_info_present_flag && vui.sar_width != 0)
            .map(|vui| (vui.sar_width, vui.sar_height))
    }

    /// Get the frame rate if available from VUI.
    pub fn frame_rate(&self) -> Option<(u32, u32)> {
        self.vui.as_ref().and_then(|vui| {
            if vui.timing_info_present_flag && vui.num_units_in_tick != 0 {
                Some((vui.time_scale, vui.num_units_in_tick.saturating_mul(2)))
            } else {
                None
            }
        })
    }

    /// Get the maximum number of frames in the DPB.
    pub fn max_dpb_frames(&self) -> u32 {
        let frame_size = self
            .pic_width_in_mbs()
            .saturating_mul(self.frame_height_in_mbs());
        if frame_size == 0 {
            return 1;
        }
        (self.level().max_dpb_mbs() / frame_size).clamp(1, 16)
    }
}

/// One coded scaling list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalingList {
    /// Not transmitted; the fall-back rule applies.
    NotPresent,
    /// Transmitted as "use the default matrix".
    UseDefault,
    /// Explicit weights in zig-zag scan order.
    Explicit(Vec<u8>),
}

/// Read `count` scaling-list slots; the first six are 4x4, the rest 8x8.
pub(crate) fn read_scaling_lists<R: ReadBits + ?Sized>(
    reader: &mut R,
    count: usize,
) -> BitResult<Vec<ScalingList>> {
    let mut lists = Vec::with_capacity(count);
    for i in 0..count {
        let present = reader.read_flag()?;
        lists.push(if present {
            read_scaling_list(reader, if i < 6 { 16 } else { 64 })?
        } else {
            ScalingList::NotPresent
        });
    }
    Ok(lists)
}

/// `scaling_list(scalingList, sizeOfScalingList, useDefaultScalingMatrixFlag)`.
fn read_scaling_list<R: ReadBits + ?Sized>(reader: &mut R, size: usize) -> BitResult<ScalingList> {
    let mut list = Vec::with_capacity(size);
    let mut last_scale = 8i64;
    let mut next_scale = 8i64;

    for j in 0..size {
        if next_scale != 0 {
            let delta_scale = i64::from(reader.read_se()?);
            next_scale = (last_scale + delta_scale).rem_euclid(256);
            if j == 0 && next_scale == 0 {
                return Ok(ScalingList::UseDefault);
            }
        }
        let scale = if next_scale == 0 { last_scale } else { next_scale };
        list.push(scale as u8);
        last_scale = scale;
    }

    Ok(ScalingList::Explicit(list))
}

/// VUI (Video Usability Information) parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VuiParameters {
    /// Aspect ratio info present.
    pub aspect_ratio_info_present_flag: bool,
    /// Aspect ratio IDC.
    pub aspect_ratio_idc: u8,
    /// Sample aspect ratio width, from Table E-1 or explicit.
    pub sar_width: u16,
    /// Sample aspect ratio height, from Table E-1 or explicit.
    pub sar_height: u16,
    /// Overscan info present.
    pub overscan_info_present_flag: bool,
    /// Overscan appropriate.
    pub overscan_appropriate_flag: bool,
    /// Video signal type present.
    pub video_signal_type_present_flag: bool,
    /// Video format.
    pub video_format: u8,
    /// Video full range flag.
    pub video_full_range_flag: bool,
    /// Color description present.
    pub colour_description_present_flag: bool,
    /// Color primaries.
    pub colour_primaries: u8,
    /// Transfer characteristics.
    pub transfer_characteristics: u8,
    /// Matrix coefficients.
    pub matrix_coefficients: u8,
    /// Chroma loc info present.
    pub chroma_loc_info_present_flag: bool,
    /// Chroma sample location, top field.
    pub chroma_sample_loc_type_top_field: u32,
    /// Chroma sample location, bottom field.
    pub chroma_sample_loc_type_bottom_field: u32,
    /// Timing info present.
    pub timing_info_present_flag: bool,
    /// Number of units in tick.
    pub num_units_in_tick: u32,
    /// Time scale.
    pub time_scale: u32,
    /// Fixed frame rate flag.
    pub fixed_frame_rate_flag: bool,
    /// NAL HRD parameters.
    pub nal_hrd: Option<HrdParameters>,
    /// VCL HRD parameters.
    pub vcl_hrd: Option<HrdParameters>,
    /// Low delay HRD flag (only coded with HRD parameters).
    pub low_delay_hrd_flag: bool,
    /// Picture structure present in picture timing SEI.
    pub pic_struct_present_flag: bool,
    /// Bitstream restriction.
    pub bitstream_restriction: Option<BitstreamRestriction>,
}

impl VuiParameters {
    /// Parse VUI parameters from a bit reader.
    pub fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        Self::parse_fields(reader).within("VUI", reader.bit_position())
    }

    fn parse_fields<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut vui = Self {
            aspect_ratio_info_present_flag: reader.read_flag()?,
            ..Self::default()
        };

        if vui.aspect_ratio_info_present_flag {
            vui.aspect_ratio_idc = reader.read_u8()?;
            if vui.aspect_ratio_idc == EXTENDED_SAR {
                vui.sar_width = reader.read_u16()?;
                vui.sar_height = reader.read_u16()?;
            } else if let Some((w, h)) = sample_aspect_ratio(vui.aspect_ratio_idc) {
                vui.sar_width = w;
                vui.sar_height = h;
            }
        }

        vui.overscan_info_present_flag = reader.read_flag()?;
        if vui.overscan_info_present_flag {
            vui.overscan_appropriate_flag = reader.read_flag()?;
        }

        vui.video_signal_type_present_flag = reader.read_flag()?;
        if vui.video_signal_type_present_flag {
            vui.video_format = reader.read_bits(3)? as u8;
            vui.video_full_range_flag = reader.read_flag()?;
            vui.colour_description_present_flag = reader.read_flag()?;
            if vui.colour_description_present_flag {
                vui.colour_primaries = reader.read_u8()?;
                vui.transfer_characteristics = reader.read_u8()?;
                vui.matrix_coefficients = reader.read_u8()?;
            }
        }

        vui.chroma_loc_info_present_flag = reader.read_flag()?;
        if vui.chroma_loc_info_present_flag {
            vui.chroma_sample_loc_type_top_field = reader.read_ue()?;
            vui.chroma_sample_loc_type_bottom_field = reader.read_ue()?;
        }

        vui.timing_info_present_flag = reader.read_flag()?;
        if vui.timing_info_present_flag {
            vui.num_units_in_tick = reader.read_bits(32)?;
            vui.time_scale = reader.read_bits(32)?;
            vui.fixed_frame_rate_flag = reader.read_flag()?;
        }

        if reader.read_flag()? {
            vui.nal_hrd = Some(HrdParameters::parse(reader)?);
        }
        if reader.read_flag()? {
            vui.vcl_hrd = Some(HrdParameters::parse(reader)?);
        }
        if vui.nal_hrd.is_some() || vui.vcl_hrd.is_some() {
            vui.low_delay_hrd_flag = reader.read_flag()?;
        }
        vui.pic_struct_present_flag = reader.read_flag()?;

        if reader.read_flag()? {
            vui.bitstream_restriction = Some(BitstreamRestriction {
                motion_vectors_over_pic_boundaries_flag: reader.read_flag()?,
                max_bytes_per_pic_denom: reader.read_ue()?,
                max_bits_per_mb_denom: reader.read_ue()?,
                log2_max_mv_length_horizontal: reader.read_ue()?,
                log2_max_mv_length_vertical: reader.read_ue()?,
                max_num_reorder_frames: reader.read_ue()?,
                max_dec_frame_buffering: reader.read_ue()?,
            });
        }

        Ok(vui)
    }
}

/// Hypothetical reference decoder parameters (Annex E.1.2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HrdParameters {
    /// Number of CPB specifications minus 1.
    pub cpb_cnt_minus1: u32,
    /// Bit rate scale.
    pub bit_rate_scale: u8,
    /// CPB size scale.
    pub cpb_size_scale: u8,
    /// Per-CPB specifications.
    pub cpb: Vec<CpbSpec>,
    /// Length of initial_cpb_removal_delay minus 1.
    pub initial_cpb_removal_delay_length_minus1: u8,
    /// Length of cpb_removal_delay minus 1.
    pub cpb_removal_delay_length_minus1: u8,
    /// Length of dpb_output_delay minus 1.
    pub dpb_output_delay_length_minus1: u8,
    /// Length of time_offset.
    pub time_offset_length: u8,
}

/// One CPB specification inside [`HrdParameters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpbSpec {
    pub bit_rate_value_minus1: u32,
    pub cpb_size_value_minus1: u32,
    pub cbr_flag: bool,
}

impl HrdParameters {
    /// Parse `hrd_parameters()`.
    pub fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        Self::parse_fields(reader).within("HRD", reader.bit_position())
    }

    fn parse_fields<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        let cpb_cnt_minus1 = reader.read_ue()?;
        let bit_rate_scale = reader.read_bits(4)? as u8;
        let cpb_size_scale = reader.read_bits(4)? as u8;

        let mut cpb = Vec::new();
        for _ in 0..=cpb_cnt_minus1 {
            cpb.push(CpbSpec {
                bit_rate_value_minus1: reader.read_ue()?,
                cpb_size_value_minus1: reader.read_ue()?,
                cbr_flag: reader.read_flag()?,
            });
        }

        Ok(Self {
            cpb_cnt_minus1,
            bit_rate_scale,
            cpb_size_scale,
            cpb,
            initial_cpb_removal_delay_length_minus1: reader.read_bits(5)? as u8,
            cpb_removal_delay_length_minus1: reader.read_bits(5)? as u8,
            dpb_output_delay_length_minus1: reader.read_bits(5)? as u8,
            time_offset_length: reader.read_bits(5)? as u8,
        })
    }
}

/// VUI bitstream restriction fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitstreamRestriction {
    pub motion_vectors_over_pic_boundaries_flag: bool,
    pub max_bytes_per_pic_denom: u32,
    pub max_bits_per_mb_denom: u32,
    pub log2_max_mv_length_horizontal: u32,
    pub log2_max_mv_length_vertical: u32,
    pub max_num_reorder_frames: u32,
    pub max_dec_frame_buffering: u32,
}
