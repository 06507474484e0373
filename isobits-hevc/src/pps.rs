//! Picture Parameter Set (PPS) parsing.

use isobits_core::{
    EbspReader, Error, ExpGolombRead, ParseError, ParseResult, ReadBits, Result, ResultExt,
};

use crate::nal::{NalUnitHeader, NalUnitType};
use crate::scaling::ScalingListData;

const STRUCTURE: &str = "PPS";

/// Upper bound on tile columns or rows; no conforming picture comes close.
const MAX_TILE_DIMENSION: u32 = 1024;

/// Tile partitioning, present when `tiles_enabled_flag` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileLayout {
    pub num_tile_columns_minus1: u32,
    pub num_tile_rows_minus1: u32,
    pub uniform_spacing_flag: bool,
    /// Explicit widths in CTBs, all but the last column.
    pub column_width_minus1: Vec<u32>,
    /// Explicit heights in CTBs, all but the last row.
    pub row_height_minus1: Vec<u32>,
    pub loop_filter_across_tiles_enabled_flag: bool,
}

impl TileLayout {
    fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        let num_tile_columns_minus1 = reader.read_ue()?;
        let num_tile_rows_minus1 = reader.read_ue()?;
        if num_tile_columns_minus1 >= MAX_TILE_DIMENSION
            || num_tile_rows_minus1 >= MAX_TILE_DIMENSION
        {
            return Err(Error::format(
                STRUCTURE,
                format!("{num_tile_columns_minus1}x{num_tile_rows_minus1} tile grid out of range"),
            ));
        }
        let uniform_spacing_flag = reader.read_flag()?;
        let mut column_width_minus1 = Vec::new();
        let mut row_height_minus1 = Vec::new();
        if !uniform_spacing_flag {
            column_width_minus1
                .reserve(reader.capacity_for(u64::from(num_tile_columns_minus1), 1));
            for _ in 0..num_tile_columns_minus1 {
                column_width_minus1.push(reader.read_ue()?);
            }
            row_height_minus1.reserve(reader.capacity_for(u64::from(num_tile_rows_minus1), 1));
            for _ in 0..num_tile_rows_minus1 {
                row_height_minus1.push(reader.read_ue()?);
            }
        }
        let loop_filter_across_tiles_enabled_flag = reader.read_flag()?;
        Ok(Self {
            num_tile_columns_minus1,
            num_tile_rows_minus1,
            uniform_spacing_flag,
            column_width_minus1,
            row_height_minus1,
            loop_filter_across_tiles_enabled_flag,
        })
    }

    /// Number of tiles in the picture.
    pub fn num_tiles(&self) -> u32 {
        (self.num_tile_columns_minus1 + 1) * (self.num_tile_rows_minus1 + 1)
    }
}

/// Deblocking filter control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeblockingControl {
    pub deblocking_filter_override_enabled_flag: bool,
    pub pps_deblocking_filter_disabled_flag: bool,
    pub pps_beta_offset_div2: i32,
    pub pps_tc_offset_div2: i32,
}

/// Upper bound on `chroma_qp_offset_list_len_minus1`.
const MAX_CHROMA_QP_OFFSET_LIST_LEN_MINUS1: u32 = 5;

/// `pps_range_extension()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PpsRangeExtension {
    /// Only coded when `transform_skip_enabled_flag` is set.
    pub log2_max_transform_skip_block_size_minus2: u32,
    pub cross_component_prediction_enabled_flag: bool,
    /// Enables `cu_chroma_qp_offset_enabled_flag` in slice headers.
    pub chroma_qp_offset_list_enabled_flag: bool,
    pub diff_cu_chroma_qp_offset_depth: u32,
    pub chroma_qp_offset_list_len_minus1: u32,
    pub cb_qp_offset_list: Vec<i32>,
    pub cr_qp_offset_list: Vec<i32>,
    pub log2_sao_offset_scale_luma: u32,
    pub log2_sao_offset_scale_chroma: u32,
}

impl PpsRangeExtension {
    fn parse<R: ReadBits + ?Sized>(
        reader: &mut R,
        transform_skip_enabled_flag: bool,
    ) -> Result<Self> {
        let mut ext = Self::default();
        if transform_skip_enabled_flag {
            ext.log2_max_transform_skip_block_size_minus2 = reader.read_ue()?;
        }
        ext.cross_component_prediction_enabled_flag = reader.read_flag()?;
        ext.chroma_qp_offset_list_enabled_flag = reader.read_flag()?;
        if ext.chroma_qp_offset_list_enabled_flag {
            ext.diff_cu_chroma_qp_offset_depth = reader.read_ue()?;
            ext.chroma_qp_offset_list_len_minus1 = reader.read_ue()?;
            if ext.chroma_qp_offset_list_len_minus1 > MAX_CHROMA_QP_OFFSET_LIST_LEN_MINUS1 {
                return Err(Error::format(
                    STRUCTURE,
                    format!(
                        "chroma_qp_offset_list_len_minus1 {} out of range",
                        ext.chroma_qp_offset_list_len_minus1
                    ),
                ));
            }
            for _ in 0..=ext.chroma_qp_offset_list_len_minus1 {
                ext.cb_qp_offset_list.push(reader.read_se()?);
                ext.cr_qp_offset_list.push(reader.read_se()?);
            }
        }
        ext.log2_sao_offset_scale_luma = reader.read_ue()?;
        ext.log2_sao_offset_scale_chroma = reader.read_ue()?;
        Ok(ext)
    }
}

/// Which PPS extensions are signalled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PpsExtensionFlags {
    pub pps_range_extension_flag: bool,
    pub pps_multilayer_extension_flag: bool,
    pub pps_3d_extension_flag: bool,
    pub pps_scc_extension_flag: bool,
    pub pps_extension_4bits: u8,
}

impl PpsExtensionFlags {
    /// Check if any extension payload follows.
    pub fn any(&self) -> bool {
        self.pps_range_extension_flag
            || self.pps_multilayer_extension_flag
            || self.pps_3d_extension_flag
            || self.pps_scc_extension_flag
            || self.pps_extension_4bits != 0
    }

    /// Check if an extension other than the range extension follows.
    pub fn undecoded(&self) -> bool {
        self.pps_multilayer_extension_flag
            || self.pps_3d_extension_flag
            || self.pps_scc_extension_flag
            || self.pps_extension_4bits != 0
    }
}

/// Picture Parameter Set (PPS).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pps {
    /// PPS ID (0-63).
    pub pps_pic_parameter_set_id: u32,
    /// SPS ID (0-15).
    pub pps_seq_parameter_set_id: u32,
    pub dependent_slice_segments_enabled_flag: bool,
    pub output_flag_present_flag: bool,
    /// Reserved flags at the start of every slice header.
    pub num_extra_slice_header_bits: u8,
    pub sign_data_hiding_enabled_flag: bool,
    pub cabac_init_present_flag: bool,
    pub num_ref_idx_l0_default_active_minus1: u8,
    pub num_ref_idx_l1_default_active_minus1: u8,
    pub init_qp_minus26: i32,
    pub constrained_intra_pred_flag: bool,
    pub transform_skip_enabled_flag: bool,
    pub cu_qp_delta_enabled_flag: bool,
    pub diff_cu_qp_delta_depth: u8,
    pub pps_cb_qp_offset: i32,
    pub pps_cr_qp_offset: i32,
    pub pps_slice_chroma_qp_offsets_present_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_flag: bool,
    pub transquant_bypass_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,
    pub tiles: Option<TileLayout>,
    pub pps_loop_filter_across_slices_enabled_flag: bool,
    pub deblocking: Option<DeblockingControl>,
    pub pps_scaling_list_data: Option<ScalingListData>,
    pub lists_modification_present_flag: bool,
    pub log2_parallel_merge_level_minus2: u8,
    pub slice_segment_header_extension_present_flag: bool,
    pub extensions: PpsExtensionFlags,
    pub pps_range_extension: Option<PpsRangeExtension>,
}

fn bounded(value: u32, max: u32, field: &'static str) -> Result<u8> {
    if value > max {
        return Err(Error::format(STRUCTURE, format!("{field} {value} out of range")));
    }
    Ok(value as u8)
}

impl Pps {
    /// Parse a PPS NAL unit.
    ///
    /// HEVC PPS syntax does not depend on the SPS, so no map is needed.
    /// The range extension is decoded. Multilayer, 3D, SCC and unknown
    /// extensions are not; when one is signalled the result is
    /// [`ParseError::Incomplete`].
    pub fn parse(nalu: &[u8]) -> ParseResult<Self> {
        let mut reader = EbspReader::new(nalu);
        let header = NalUnitHeader::parse(&mut reader)?;
        if header.nal_unit_type != NalUnitType::PpsNut {
            return Err(Error::wrong_nal_type(STRUCTURE, header.nal_unit_type.to_u8()).into());
        }
        let pps = Self::parse_from_reader(&mut reader).within(STRUCTURE, reader.bit_position())?;
        if pps.extensions.undecoded() {
            tracing::warn!(
                pps_id = pps.pps_pic_parameter_set_id,
                bit_offset = reader.bit_position(),
                "PPS extension not decoded"
            );
            return Err(ParseError::stopped(pps, Error::unsupported(STRUCTURE, "PPS extensions")));
        }
        reader
            .read_rbsp_trailing_bits()
            .within(STRUCTURE, reader.bit_position())?;
        Ok(pps)
    }

    /// Parse the PPS RBSP through the range extension.
    pub fn parse_from_reader(reader: &mut EbspReader<'_>) -> Result<Self> {
        let pps_pic_parameter_set_id = reader.read_ue()?;
        bounded(pps_pic_parameter_set_id, 63, "pps_pic_parameter_set_id")?;
        let pps_seq_parameter_set_id = reader.read_ue()?;
        bounded(pps_seq_parameter_set_id, 15, "pps_seq_parameter_set_id")?;

        let dependent_slice_segments_enabled_flag = reader.read_flag()?;
        let output_flag_present_flag = reader.read_flag()?;
        let num_extra_slice_header_bits = reader.read_bits(3)? as u8;
        let sign_data_hiding_enabled_flag = reader.read_flag()?;
        let cabac_init_present_flag = reader.read_flag()?;
        let num_ref_idx_l0_default_active_minus1 =
            bounded(reader.read_ue()?, 14, "num_ref_idx_l0_default_active_minus1")?;
        let num_ref_idx_l1_default_active_minus1 =
            bounded(reader.read_ue()?, 14, "num_ref_idx_l1_default_active_minus1")?;
        let init_qp_minus26 = reader.read_se()?;
        let constrained_intra_pred_flag = reader.read_flag()?;
        let transform_skip_enabled_flag = reader.read_flag()?;

        let cu_qp_delta_enabled_flag = reader.read_flag()?;
        let diff_cu_qp_delta_depth = if cu_qp_delta_enabled_flag {
            bounded(reader.read_ue()?, 3, "diff_cu_qp_delta_depth")?
        } else {
            0
        };

        let pps_cb_qp_offset = reader.read_se()?;
        let pps_cr_qp_offset = reader.read_se()?;
        let pps_slice_chroma_qp_offsets_present_flag = reader.read_flag()?;
        let weighted_pred_flag = reader.read_flag()?;
        let weighted_bipred_flag = reader.read_flag()?;
        let transquant_bypass_enabled_flag = reader.read_flag()?;
        let tiles_enabled_flag = reader.read_flag()?;
        let entropy_coding_sync_enabled_flag = reader.read_flag()?;

        let tiles = if tiles_enabled_flag {
            Some(TileLayout::parse(reader)?)
        } else {
            None
        };

        let pps_loop_filter_across_slices_enabled_flag = reader.read_flag()?;

        let deblocking = if reader.read_flag()? {
            let deblocking_filter_override_enabled_flag = reader.read_flag()?;
            let pps_deblocking_filter_disabled_flag = reader.read_flag()?;
            let (pps_beta_offset_div2, pps_tc_offset_div2) = if pps_deblocking_filter_disabled_flag
            {
                (0, 0)
            } else {
                (reader.read_se()?, reader.read_se()?)
            };
            Some(DeblockingControl {
                deblocking_filter_override_enabled_flag,
                pps_deblocking_filter_disabled_flag,
                pps_beta_offset_div2,
                pps_tc_offset_div2,
            })
        } else {
            None
        };

        let pps_scaling_list_data = if reader.read_flag()? {
            Some(ScalingListData::parse(reader)?)
        } else {
            None
        };

        let lists_modification_present_flag = reader.read_flag()?;
        let log2_parallel_merge_level_minus2 =
            bounded(reader.read_ue()?, 4, "log2_parallel_merge_level_minus2")?;
        let slice_segment_header_extension_present_flag = reader.read_flag()?;

        let extensions = if reader.read_flag()? {
            PpsExtensionFlags {
                pps_range_extension_flag: reader.read_flag()?,
                pps_multilayer_extension_flag: reader.read_flag()?,
                pps_3d_extension_flag: reader.read_flag()?,
                pps_scc_extension_flag: reader.read_flag()?,
                pps_extension_4bits: reader.read_bits(4)? as u8,
            }
        } else {
            PpsExtensionFlags::default()
        };
        let pps_range_extension = if extensions.pps_range_extension_flag {
            Some(PpsRangeExtension::parse(reader, transform_skip_enabled_flag)?)
        } else {
            None
        };

        Ok(Self {
            pps_pic_parameter_set_id,
            pps_seq_parameter_set_id,
            dependent_slice_segments_enabled_flag,
            output_flag_present_flag,
            num_extra_slice_header_bits,
            sign_data_hiding_enabled_flag,
            cabac_init_present_flag,
            num_ref_idx_l0_default_active_minus1,
            num_ref_idx_l1_default_active_minus1,
            init_qp_minus26,
            constrained_intra_pred_flag,
            transform_skip_enabled_flag,
            cu_qp_delta_enabled_flag,
            diff_cu_qp_delta_depth,
            pps_cb_qp_offset,
            pps_cr_qp_offset,
            pps_slice_chroma_qp_offsets_present_flag,
            weighted_pred_flag,
            weighted_bipred_flag,
            transquant_bypass_enabled_flag,
            entropy_coding_sync_enabled_flag,
            tiles,
            pps_loop_filter_across_slices_enabled_flag,
            deblocking,
            pps_scaling_list_data,
            lists_modification_present_flag,
            log2_parallel_merge_level_minus2,
            slice_segment_header_extension_present_flag,
            extensions,
            pps_range_extension,
        })
    }

    /// Initial slice QP (26 + init_qp_minus26).
    pub fn init_qp(&self) -> i32 {
        self.init_qp_minus26.saturating_add(26)
    }

    /// Check if slice headers carry `cu_chroma_qp_offset_enabled_flag`.
    pub fn chroma_qp_offset_list_enabled_flag(&self) -> bool {
        self.pps_range_extension
            .as_ref()
            .is_some_and(|ext| ext.chroma_qp_offset_list_enabled_flag)
    }

    pub fn tiles_enabled_flag(&self) -> bool {
        self.tiles.is_some()
    }

    pub fn deblocking_filter_override_enabled_flag(&self) -> bool {
        self.deblocking
            .is_some_and(|d| d.deblocking_filter_override_enabled_flag)
    }

    pub fn pps_deblocking_filter_disabled_flag(&self) -> bool {
        self.deblocking
            .is_some_and(|d| d.pps_deblocking_filter_disabled_flag)
    }

    /// Log2ParMrgLevel.
    pub fn log2_parallel_merge_level(&self) -> u8 {
        self.log2_parallel_merge_level_minus2 + 2
    }
}
