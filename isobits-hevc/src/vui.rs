//! VUI and HRD syntax (H.265 Annex E).

use isobits_core::vui::{sample_aspect_ratio, EXTENDED_SAR};
use isobits_core::{Error, ExpGolombRead, ReadBits, Result, ResultExt};

/// Upper bound on `cpb_cnt_minus1`.
const MAX_CPB_CNT_MINUS1: u32 = 31;

/// VUI (Video Usability Information) parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VuiParameters {
    pub aspect_ratio_info_present_flag: bool,
    pub aspect_ratio_idc: u8,
    /// Sample aspect ratio width, from Table E-1 or explicit.
    pub sar_width: u16,
    /// Sample aspect ratio height, from Table E-1 or explicit.
    pub sar_height: u16,
    pub overscan_info_present_flag: bool,
    pub overscan_appropriate_flag: bool,
    pub video_signal_type_present_flag: bool,
    pub video_format: u8,
    pub video_full_range_flag: bool,
    pub colour_description_present_flag: bool,
    pub colour_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coeffs: u8,
    pub chroma_loc_info_present_flag: bool,
    pub chroma_sample_loc_type_top_field: u32,
    pub chroma_sample_loc_type_bottom_field: u32,
    pub neutral_chroma_indication_flag: bool,
    pub field_seq_flag: bool,
    pub frame_field_info_present_flag: bool,
    /// Default display window offsets, in chroma-scaled luma units.
    pub default_display_window: Option<Window>,
    pub timing_info: Option<TimingInfo>,
    pub hrd: Option<HrdParameters>,
    pub bitstream_restriction: Option<BitstreamRestriction>,
}

/// A window given as four offsets, as in the conformance window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Window {
    pub left_offset: u32,
    pub right_offset: u32,
    pub top_offset: u32,
    pub bottom_offset: u32,
}

impl Window {
    pub(crate) fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            left_offset: reader.read_ue()?,
            right_offset: reader.read_ue()?,
            top_offset: reader.read_ue()?,
            bottom_offset: reader.read_ue()?,
        })
    }
}

/// Timing information shared by the VPS and the VUI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingInfo {
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub poc_proportional_to_timing_flag: bool,
    /// Present when `poc_proportional_to_timing_flag` is set.
    pub num_ticks_poc_diff_one_minus1: Option<u32>,
}

impl TimingInfo {
    pub(crate) fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        let num_units_in_tick = reader.read_bits(32)?;
        let time_scale = reader.read_bits(32)?;
        let poc_proportional_to_timing_flag = reader.read_flag()?;
        let num_ticks_poc_diff_one_minus1 = if poc_proportional_to_timing_flag {
            Some(reader.read_ue()?)
        } else {
            None
        };
        Ok(Self {
            num_units_in_tick,
            time_scale,
            poc_proportional_to_timing_flag,
            num_ticks_poc_diff_one_minus1,
        })
    }

    /// Pictures per second as `(time_scale, num_units_in_tick)`.
    pub fn frame_rate(&self) -> Option<(u32, u32)> {
        (self.num_units_in_tick != 0).then_some((self.time_scale, self.num_units_in_tick))
    }
}

/// VUI bitstream restriction fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitstreamRestriction {
    pub tiles_fixed_structure_flag: bool,
    pub motion_vectors_over_pic_boundaries_flag: bool,
    pub restricted_ref_pic_lists_flag: bool,
    pub min_spatial_segmentation_idc: u32,
    pub max_bytes_per_pic_denom: u32,
    pub max_bits_per_min_cu_denom: u32,
    pub log2_max_mv_length_horizontal: u32,
    pub log2_max_mv_length_vertical: u32,
}

impl VuiParameters {
    /// Parse `vui_parameters()` for an SPS with `sps_max_sub_layers_minus1`.
    pub fn parse<R: ReadBits + ?Sized>(reader: &mut R, max_sub_layers_minus1: u8) -> Result<Self> {
        Self::parse_fields(reader, max_sub_layers_minus1).within("VUI", reader.bit_position())
    }

    fn parse_fields<R: ReadBits + ?Sized>(
        reader: &mut R,
        max_sub_layers_minus1: u8,
    ) -> Result<Self> {
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
                vui.matrix_coeffs = reader.read_u8()?;
            }
        }

        vui.chroma_loc_info_present_flag = reader.read_flag()?;
        if vui.chroma_loc_info_present_flag {
            vui.chroma_sample_loc_type_top_field = reader.read_ue()?;
            vui.chroma_sample_loc_type_bottom_field = reader.read_ue()?;
        }

        vui.neutral_chroma_indication_flag = reader.read_flag()?;
        vui.field_seq_flag = reader.read_flag()?;
        vui.frame_field_info_present_flag = reader.read_flag()?;

        if reader.read_flag()? {
            vui.default_display_window = Some(Window::parse(reader)?);
        }

        if reader.read_flag()? {
            vui.timing_info = Some(TimingInfo::parse(reader)?);
            if reader.read_flag()? {
                vui.hrd = Some(HrdParameters::parse(reader, true, max_sub_layers_minus1)?);
            }
        }

        if reader.read_flag()? {
            vui.bitstream_restriction = Some(BitstreamRestriction {
                tiles_fixed_structure_flag: reader.read_flag()?,
                motion_vectors_over_pic_boundaries_flag: reader.read_flag()?,
                restricted_ref_pic_lists_flag: reader.read_flag()?,
                min_spatial_segmentation_idc: reader.read_ue()?,
                max_bytes_per_pic_denom: reader.read_ue()?,
                max_bits_per_min_cu_denom: reader.read_ue()?,
                log2_max_mv_length_horizontal: reader.read_ue()?,
                log2_max_mv_length_vertical: reader.read_ue()?,
            });
        }

        Ok(vui)
    }
}

/// Hypothetical reference decoder parameters (E.2.2).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HrdParameters {
    pub nal_hrd_parameters_present_flag: bool,
    pub vcl_hrd_parameters_present_flag: bool,
    pub sub_pic_hrd_params_present_flag: bool,
    pub tick_divisor_minus2: u8,
    pub du_cpb_removal_delay_increment_length_minus1: u8,
    pub sub_pic_cpb_params_in_pic_timing_sei_flag: bool,
    pub dpb_output_delay_du_length_minus1: u8,
    pub bit_rate_scale: u8,
    pub cpb_size_scale: u8,
    pub cpb_size_du_scale: u8,
    /// Inferred as 23 when the common information is absent.
    pub initial_cpb_removal_delay_length_minus1: u8,
    /// Inferred as 23 when the common information is absent.
    pub au_cpb_removal_delay_length_minus1: u8,
    /// Inferred as 23 when the common information is absent.
    pub dpb_output_delay_length_minus1: u8,
    /// One entry per temporal sub-layer.
    pub sub_layers: Vec<SubLayerHrd>,
}

impl Default for HrdParameters {
    fn default() -> Self {
        Self {
            nal_hrd_parameters_present_flag: false,
            vcl_hrd_parameters_present_flag: false,
            sub_pic_hrd_params_present_flag: false,
            tick_divisor_minus2: 0,
            du_cpb_removal_delay_increment_length_minus1: 0,
            sub_pic_cpb_params_in_pic_timing_sei_flag: false,
            dpb_output_delay_du_length_minus1: 0,
            bit_rate_scale: 0,
            cpb_size_scale: 0,
            cpb_size_du_scale: 0,
            initial_cpb_removal_delay_length_minus1: 23,
            au_cpb_removal_delay_length_minus1: 23,
            dpb_output_delay_length_minus1: 23,
            sub_layers: Vec::new(),
        }
    }
}

/// HRD timing and CPB specifications of one sub-layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubLayerHrd {
    pub fixed_pic_rate_general_flag: bool,
    pub fixed_pic_rate_within_cvs_flag: bool,
    pub elemental_duration_in_tc_minus1: u32,
    pub low_delay_hrd_flag: bool,
    pub cpb_cnt_minus1: u32,
    pub nal: Vec<CpbSpec>,
    pub vcl: Vec<CpbSpec>,
}

/// One CPB specification from `sub_layer_hrd_parameters()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpbSpec {
    pub bit_rate_value_minus1: u32,
    pub cpb_size_value_minus1: u32,
    /// Zero unless `sub_pic_hrd_params_present_flag`.
    pub cpb_size_du_value_minus1: u32,
    /// Zero unless `sub_pic_hrd_params_present_flag`.
    pub bit_rate_du_value_minus1: u32,
    pub cbr_flag: bool,
}

impl HrdParameters {
    /// Parse `hrd_parameters(commonInfPresentFlag, maxNumSubLayersMinus1)`.
    pub fn parse<R: ReadBits + ?Sized>(
        reader: &mut R,
        common_inf_present_flag: bool,
        max_sub_layers_minus1: u8,
    ) -> Result<Self> {
        Self::parse_fields(reader, common_inf_present_flag, max_sub_layers_minus1)
            .within("HRD", reader.bit_position())
    }

    fn parse_fields<R: ReadBits + ?Sized>(
        reader: &mut R,
        common_inf_present_flag: bool,
        max_sub_layers_minus1: u8,
    ) -> Result<Self> {
        let mut hrd = Self::default();

        if common_inf_present_flag {
            hrd.nal_hrd_parameters_present_flag = reader.read_flag()?;
            hrd.vcl_hrd_parameters_present_flag = reader.read_flag()?;
            if hrd.nal_hrd_parameters_present_flag || hrd.vcl_hrd_parameters_present_flag {
                hrd.sub_pic_hrd_params_present_flag = reader.read_flag()?;
                if hrd.sub_pic_hrd_params_present_flag {
                    hrd.tick_divisor_minus2 = reader.read_u8()?;
                    hrd.du_cpb_removal_delay_increment_length_minus1 = reader.read_bits(5)? as u8;
                    hrd.sub_pic_cpb_params_in_pic_timing_sei_flag = reader.read_flag()?;
                    hrd.dpb_output_delay_du_length_minus1 = reader.read_bits(5)? as u8;
                }
                hrd.bit_rate_scale = reader.read_bits(4)? as u8;
                hrd.cpb_size_scale = reader.read_bits(4)? as u8;
                if hrd.sub_pic_hrd_params_present_flag {
                    hrd.cpb_size_du_scale = reader.read_bits(4)? as u8;
                }
                hrd.initial_cpb_removal_delay_length_minus1 = reader.read_bits(5)? as u8;
                hrd.au_cpb_removal_delay_length_minus1 = reader.read_bits(5)? as u8;
                hrd.dpb_output_delay_length_minus1 = reader.read_bits(5)? as u8;
            }
        }

        for _ in 0..=max_sub_layers_minus1 {
            let mut sub = SubLayerHrd {
                fixed_pic_rate_general_flag: reader.read_flag()?,
                ..SubLayerHrd::default()
            };
            sub.fixed_pic_rate_within_cvs_flag = if sub.fixed_pic_rate_general_flag {
                true
            } else {
                reader.read_flag()?
            };
            if sub.fixed_pic_rate_within_cvs_flag {
                sub.elemental_duration_in_tc_minus1 = reader.read_ue()?;
            } else {
                sub.low_delay_hrd_flag = reader.read_flag()?;
            }
            if !sub.low_delay_hrd_flag {
                sub.cpb_cnt_minus1 = reader.read_ue()?;
                if sub.cpb_cnt_minus1 > MAX_CPB_CNT_MINUS1 {
                    return Err(Error::format(
                        "HRD",
                        format!("cpb_cnt_minus1 {} out of range", sub.cpb_cnt_minus1),
                    ));
                }
            }
            if hrd.nal_hrd_parameters_present_flag {
                sub.nal = hrd.read_cpb_specs(reader, sub.cpb_cnt_minus1)?;
            }
            if hrd.vcl_hrd_parameters_present_flag {
                sub.vcl = hrd.read_cpb_specs(reader, sub.cpb_cnt_minus1)?;
            }
            hrd.sub_layers.push(sub);
        }

        Ok(hrd)
    }

    /// `sub_layer_hrd_parameters()`.
    fn read_cpb_specs<R: ReadBits + ?Sized>(
        &self,
        reader: &mut R,
        cpb_cnt_minus1: u32,
    ) -> Result<Vec<CpbSpec>> {
        let mut specs = Vec::with_capacity(cpb_cnt_minus1 as usize + 1);
        for _ in 0..=cpb_cnt_minus1 {
            let mut spec = CpbSpec {
                bit_rate_value_minus1: reader.read_ue()?,
                cpb_size_value_minus1: reader.read_ue()?,
                ..CpbSpec::default()
            };
            if self.sub_pic_hrd_params_present_flag {
                spec.cpb_size_du_value_minus1 = reader.read_ue()?;
                spec.bit_rate_du_value_minus1 = reader.read_ue()?;
            }
            spec.cbr_flag = reader.read_flag()?;
            specs.push(spec);
        }
        Ok(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobits_core::{BitReader, BitWriter, ExpGolombWrite, WriteBits};

    #[test]
    fn test_hrd_with_nal_parameters() {
        let mut w = BitWriter::new();
        w.write_flag(true).unwrap(); // nal_hrd_parameters_present_flag
        w.write_flag(false).unwrap(); // vcl
        w.write_flag(false).unwrap(); // sub_pic_hrd_params_present_flag
        w.write_bits(2, 4).unwrap();
        w.write_bits(3, 4).unwrap();
        w.write_bits(22, 5).unwrap();
        w.write_bits(21, 5).unwrap();
        w.write_bits(20, 5).unwrap();
        // Sub-layer 0
        w.write_flag(true).unwrap(); // fixed_pic_rate_general_flag
        w.write_ue(0).unwrap(); // elemental_duration_in_tc_minus1
        w.write_ue(1).unwrap(); // cpb_cnt_minus1
        for rate in [1000, 2000] {
            w.write_ue(rate).unwrap();
            w.write_ue(rate * 2).unwrap();
            w.write_flag(rate == 2000).unwrap();
        }
        w.write_rbsp_trailing_bits().unwrap();
        let data = w.into_data();

        let hrd = HrdParameters::parse(&mut BitReader::new(&data), true, 0).unwrap();
        assert!(hrd.nal_hrd_parameters_present_flag);
        assert_eq!(hrd.bit_rate_scale, 2);
        assert_eq!(hrd.cpb_size_scale, 3);
        assert_eq!(hrd.au_cpb_removal_delay_length_minus1, 21);
        assert_eq!(hrd.sub_layers.len(), 1);
        let sub = &hrd.sub_layers[0];
        assert!(sub.fixed_pic_rate_within_cvs_flag);
        assert_eq!(sub.cpb_cnt_minus1, 1);
        assert_eq!(sub.nal.len(), 2);
        assert_eq!(sub.nal[1].cpb_size_value_minus1, 4000);
        assert!(sub.nal[1].cbr_flag);
        assert!(sub.vcl.is_empty());
    }

    #[test]
    fn test_hrd_without_common_info() {
        let mut w = BitWriter::new();
        for _ in 0..2 {
            w.write_flag(false).unwrap(); // fixed_pic_rate_general_flag
            w.write_flag(false).unwrap(); // fixed_pic_rate_within_cvs_flag
            w.write_flag(true).unwrap(); // low_delay_hrd_flag
        }
        let data = w.into_data();

        let hrd = HrdParameters::parse(&mut BitReader::new(&data), false, 1).unwrap();
        assert_eq!(hrd.initial_cpb_removal_delay_length_minus1, 23);
        assert_eq!(hrd.sub_layers.len(), 2);
        assert!(hrd.sub_layers.iter().all(|s| s.low_delay_hrd_flag));
    }

    #[test]
    fn test_hrd_rejects_large_cpb_count() {
        let mut w = BitWriter::new();
        w.write_flag(false).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(true).unwrap(); // fixed_pic_rate_general_flag
        w.write_ue(0).unwrap();
        w.write_ue(32).unwrap();
        w.write_rbsp_trailing_bits().unwrap();
        let data = w.into_data();

        let err = HrdParameters::parse(&mut BitReader::new(&data), true, 0).unwrap_err();
        assert!(matches!(err, Error::Format { structure: "HRD", .. }));
    }

    #[test]
    fn test_vui_timing_and_window() {
        let mut w = BitWriter::new();
        w.write_flag(true).unwrap();
        w.write_bits(1, 8).unwrap(); // aspect_ratio_idc 1:1
        w.write_flag(false).unwrap(); // overscan
        w.write_flag(true).unwrap(); // video_signal_type_present_flag
        w.write_bits(5, 3).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(true).unwrap();
        w.write_bits(9, 8).unwrap();
        w.write_bits(16, 8).unwrap();
        w.write_bits(9, 8).unwrap();
        w.write_flag(false).unwrap(); // chroma_loc_info_present_flag
        w.write_bits(0, 3).unwrap(); // neutral_chroma, field_seq, frame_field_info
        w.write_flag(true).unwrap(); // default_display_window_flag
        for v in [0, 0, 4, 4] {
            w.write_ue(v).unwrap();
        }
        w.write_flag(true).unwrap(); // vui_timing_info_present_flag
        w.write_bits(1001, 32).unwrap();
        w.write_bits(60000, 32).unwrap();
        w.write_flag(false).unwrap(); // poc_proportional_to_timing_flag
        w.write_flag(false).unwrap(); // vui_hrd_parameters_present_flag
        w.write_flag(false).unwrap(); // bitstream_restriction_flag
        w.write_rbsp_trailing_bits().unwrap();
        let data = w.into_data();

        let vui = VuiParameters::parse(&mut BitReader::new(&data), 0).unwrap();
        assert_eq!((vui.sar_width, vui.sar_height), (1, 1));
        assert_eq!(vui.transfer_characteristics, 16);
        assert_eq!(vui.default_display_window.map(|w| w.top_offset), Some(4));
        let timing = vui.timing_info.unwrap();
        assert_eq!(timing.frame_rate(), Some((60000, 1001)));
        assert!(vui.hrd.is_none());
    }
}
