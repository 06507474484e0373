//! Picture Parameter Set (PPS) parsing.

use isobits_core::{
    ceil_log2, EbspReader, Error, ExpGolombRead, ReadBits, Result, ResultExt,
};

use crate::nal::{NalHeader, NalUnitType};
use crate::sps::{read_scaling_lists, ScalingList};
use crate::SpsMap;

const STRUCTURE: &str = "PPS";

/// Slice group map, present when `num_slice_groups_minus1 > 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SliceGroupMap {
    /// Type 0: interleaved runs, one per slice group.
    Interleaved { run_length_minus1: Vec<u32> },
    /// Type 1: dispersed.
    Dispersed,
    /// Type 2: foreground rectangles with a left-over background.
    Foreground {
        top_left: Vec<u32>,
        bottom_right: Vec<u32>,
    },
    /// Types 3 to 5: box-out, raster scan and wipe evolving maps.
    Changing {
        map_type: u32,
        change_direction_flag: bool,
        change_rate_minus1: u32,
    },
    /// Type 6: explicit slice group per map unit.
    Explicit { slice_group_id: Vec<u32> },
}

impl SliceGroupMap {
    /// `slice_group_map_type`.
    pub fn map_type(&self) -> u32 {
        match self {
            Self::Interleaved { .. } => 0,
            Self::Dispersed => 1,
            Self::Foreground { .. } => 2,
            Self::Changing { map_type, .. } => *map_type,
            Self::Explicit { .. } => 6,
        }
    }

    /// SliceGroupChangeRate, for the evolving map types.
    pub fn change_rate(&self) -> Option<u32> {
        match self {
            Self::Changing {
                change_rate_minus1, ..
            } => Some(change_rate_minus1.saturating_add(1)),
            _ => None,
        }
    }

    fn parse<R: ReadBits + ?Sized>(reader: &mut R, num_slice_groups_minus1: u32) -> Result<Self> {
        let map_type = reader.read_ue()?;
        let map = match map_type {
            0 => {
                let mut run_length_minus1 = Vec::new();
                for _ in 0..=num_slice_groups_minus1 {
                    run_length_minus1.push(reader.read_ue()?);
                }
                Self::Interleaved { run_length_minus1 }
            }
            1 => Self::Dispersed,
            2 => {
                let mut top_left = Vec::new();
                let mut bottom_right = Vec::new();
                for _ in 0..num_slice_groups_minus1 {
                    top_left.push(reader.read_ue()?);
                    bottom_right.push(reader.read_ue()?);
                }
                Self::Foreground {
                    top_left,
                    bottom_right,
                }
            }
            3..=5 => Self::Changing {
                map_type,
                change_direction_flag: reader.read_flag()?,
                change_rate_minus1: reader.read_ue()?,
            },
            6 => {
                let pic_size_in_map_units_minus1 = reader.read_ue()?;
                let bits = ceil_log2(num_slice_groups_minus1.saturating_add(1)) as u8;
                let mut slice_group_id = Vec::new();
                for _ in 0..=pic_size_in_map_units_minus1 {
                    slice_group_id.push(reader.read_bits(bits)?);
                }
                Self::Explicit { slice_group_id }
            }
            other => {
                return Err(Error::format(
                    STRUCTURE,
                    format!("slice_group_map_type {other} out of range"),
                ))
            }
        };
        Ok(map)
    }
}

/// Picture Parameter Set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PictureParameterSet {
    /// PPS ID (0-255).
    pub pps_id: u32,
    /// Referenced SPS ID.
    pub sps_id: u32,
    /// Entropy coding mode (false=CAVLC, true=CABAC).
    pub entropy_coding_mode_flag: bool,
    /// Bottom field POC present.
    pub bottom_field_pic_order_in_frame_present_flag: bool,
    /// Number of slice groups minus 1.
    pub num_slice_groups_minus1: u32,
    /// Slice group map.
    pub slice_group_map: Option<SliceGroupMap>,
    /// Number of reference indices for L0.
    pub num_ref_idx_l0_default_active_minus1: u32,
    /// Number of reference indices for L1.
    pub num_ref_idx_l1_default_active_minus1: u32,
    /// Weighted prediction flag.
    pub weighted_pred_flag: bool,
    /// Weighted bipred IDC.
    pub weighted_bipred_idc: u8,
    /// Initial QP.
    pub pic_init_qp_minus26: i32,
    /// Initial QS.
    pub pic_init_qs_minus26: i32,
    /// Chroma QP offset.
    pub chroma_qp_index_offset: i32,
    /// Deblocking filter control present.
    pub deblocking_filter_control_present_flag: bool,
    /// Constrained intra prediction.
    pub constrained_intra_pred_flag: bool,
    /// Redundant pic count present.
    pub redundant_pic_cnt_present_flag: bool,
    /// Transform 8x8 mode flag.
    pub transform_8x8_mode_flag: bool,
    /// Picture scaling matrix present.
    pub pic_scaling_matrix_present_flag: bool,
    /// Picture scaling lists (empty when not present).
    pub pic_scaling_lists: Vec<ScalingList>,
    /// Second chroma QP offset; equals `chroma_qp_index_offset` when absent.
    pub second_chroma_qp_index_offset: i32,
}

impl PictureParameterSet {
    /// Parse a PPS NAL unit.
    ///
    /// `sps_map` is only consulted when a scaling matrix is present, since
    /// the number of lists depends on the referenced SPS's chroma format.
    pub fn parse(nalu: &[u8], sps_map: &SpsMap) -> Result<Self> {
        let mut reader = EbspReader::new(nalu);
        let header = NalHeader::parse(&mut reader).within(STRUCTURE, 0)?;
        if header.nal_unit_type != NalUnitType::Pps {
            return Err(Error::wrong_nal_type(STRUCTURE, header.nal_unit_type.to_u8()));
        }

        let pps = Self::parse_from_reader(&mut reader, sps_map)
            .within(STRUCTURE, reader.bit_position())?;
        reader
            .read_rbsp_trailing_bits()
            .within(STRUCTURE, reader.bit_position())?;
        Ok(pps)
    }

    /// Parse `pic_parameter_set_rbsp()` fields after the NAL header.
    pub fn parse_from_reader(reader: &mut EbspReader<'_>, sps_map: &SpsMap) -> Result<Self> {
        let pps_id = reader.read_ue()?;
        let sps_id = reader.read_ue()?;
        let entropy_coding_mode_flag = reader.read_flag()?;
        let bottom_field_pic_order_in_frame_present_flag = reader.read_flag()?;

        let num_slice_groups_minus1 = reader.read_ue()?;
        let slice_group_map = if num_slice_groups_minus1 > 0 {
            Some(SliceGroupMap::parse(reader, num_slice_groups_minus1)?)
        } else {
            None
        };

        let num_ref_idx_l0_default_active_minus1 = reader.read_ue()?;
        let num_ref_idx_l1_default_active_minus1 = reader.read_ue()?;
        let weighted_pred_flag = reader.read_flag()?;
        let weighted_bipred_idc = reader.read_bits(2)? as u8;
        let pic_init_qp_minus26 = reader.read_se()?;
        let pic_init_qs_minus26 = reader.read_se()?;
        let chroma_qp_index_offset = reader.read_se()?;
        let deblocking_filter_control_present_flag = reader.read_flag()?;
        let constrained_intra_pred_flag = reader.read_flag()?;
        let redundant_pic_cnt_present_flag = reader.read_flag()?;

        // Check for more RBSP data (High profile extensions)
        let (
            transform_8x8_mode_flag,
            pic_scaling_matrix_present_flag,
            pic_scaling_lists,
            second_chroma_qp_index_offset,
        ) = if reader.more_rbsp_data() {
            let t8x8 = reader.read_flag()?;
            let matrix_present = reader.read_flag()?;
            let lists = if matrix_present {
                let sps = sps_map
                    .get(&sps_id)
                    .ok_or_else(|| Error::missing(STRUCTURE, "SPS", sps_id))?;
                let per_8x8 = if sps.chroma_format_idc != 3 { 2 } else { 6 };
                let count = 6 + if t8x8 { per_8x8 } else { 0 };
                read_scaling_lists(reader, count)?
            } else {
                Vec::new()
            };
            (t8x8, matrix_present, lists, reader.read_se()?)
        } else {
            (false, false, Vec::new(), chroma_qp_index_offset)
        };

        Ok(Self {
            pps_id,
            sps_id,
            entropy_coding_mode_flag,
            bottom_field_pic_order_in_frame_present_flag,
            num_slice_groups_minus1,
            slice_group_map,
            num_ref_idx_l0_default_active_minus1,
            num_ref_idx_l1_default_active_minus1,
            weighted_pred_flag,
            weighted_bipred_idc,
            pic_init_qp_minus26,
            pic_init_qs_minus26,
            chroma_qp_index_offset,
            deblocking_filter_control_present_flag,
            constrained_intra_pred_flag,
            redundant_pic_cnt_present_flag,
            transform_8x8_mode_flag,
            pic_scaling_matrix_present_flag,
            pic_scaling_lists,
            second_chroma_qp_index_offset,
        })
    }

    /// Check if CABAC entropy coding is used.
    pub fn uses_cabac(&self) -> bool {
        self.entropy_coding_mode_flag
    }

    /// Initial luma QP (SliceQPY before `slice_qp_delta`).
    pub fn pic_init_qp(&self) -> i32 {
        self.pic_init_qp_minus26.saturating_add(26)
    }
}
