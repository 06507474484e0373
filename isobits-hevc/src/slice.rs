//! Slice segment header parsing.

use isobits_core::{ceil_log2, EbspReader, Error, ExpGolombRead, ReadBits, Result, ResultExt};

use crate::nal::{NalUnitHeader, NalUnitType};
use crate::pps::Pps;
use crate::rps::ShortTermRefPicSet;
use crate::sps::Sps;
use crate::{PpsMap, SpsMap};

const STRUCTURE: &str = "slice segment header";

/// Largest `num_ref_idx_l*_active_minus1`.
const MAX_NUM_REF_IDX_MINUS1: u32 = 14;

/// Largest number of long-term entries one header can list.
const MAX_LONG_TERM_PICS: u32 = 32;

/// Largest `slice_segment_header_extension_length`.
const MAX_HEADER_EXTENSION_LENGTH: u32 = 256;

/// Slice type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SliceType {
    /// B slice (bidirectional).
    B = 0,
    /// P slice (predictive).
    P = 1,
    /// I slice (intra).
    I = 2,
}

impl SliceType {
    /// Create from a `slice_type` value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::B),
            1 => Some(Self::P),
            2 => Some(Self::I),
            _ => None,
        }
    }

    /// Check if this is an intra slice.
    pub fn is_intra(self) -> bool {
        self == Self::I
    }

    /// Check if this slice type uses bidirectional prediction.
    pub fn is_bidirectional(self) -> bool {
        self == Self::B
    }
}

/// One long-term reference picture entry of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LongTermRef {
    /// Index into the SPS candidate list, for entries taken from the SPS.
    pub lt_idx_sps: Option<u32>,
    /// PocLsbLt.
    pub poc_lsb_lt: u32,
    /// UsedByCurrPicLt.
    pub used_by_curr_pic_lt_flag: bool,
    /// `delta_poc_msb_cycle_lt` when `delta_poc_msb_present_flag` is set.
    pub delta_poc_msb_cycle_lt: Option<u32>,
}

/// `ref_pic_lists_modification()`; `None` entries mean no modification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefPicListsModification {
    pub list_entry_l0: Option<Vec<u32>>,
    pub list_entry_l1: Option<Vec<u32>>,
}

/// Explicit weights for one reference index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredWeight {
    /// `(delta_luma_weight, luma_offset)` when `luma_weight_flag` is set.
    pub luma: Option<(i32, i32)>,
    /// `(delta_chroma_weight, delta_chroma_offset)` for Cb and Cr when
    /// `chroma_weight_flag` is set.
    pub chroma: Option<[(i32, i32); 2]>,
}

/// `pred_weight_table()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredWeightTable {
    pub luma_log2_weight_denom: u32,
    /// ChromaLog2WeightDenom; equal to the luma denominator for monochrome.
    pub chroma_log2_weight_denom: i64,
    pub l0: Vec<PredWeight>,
    pub l1: Vec<PredWeight>,
}

/// Slice segment header.
///
/// A dependent slice segment only codes its address; every other field
/// holds its default and `slice_type` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceSegmentHeader {
    pub nal_unit_type: NalUnitType,
    pub temporal_id: u8,
    pub first_slice_segment_in_pic_flag: bool,
    /// Only coded for IRAP pictures.
    pub no_output_of_prior_pics_flag: bool,
    pub slice_pic_parameter_set_id: u32,
    pub dependent_slice_segment_flag: bool,
    /// First CTB of the segment, in tile scan.
    pub slice_segment_address: u32,
    /// `slice_reserved_flag` values, first flag in the most significant bit.
    pub slice_reserved_flags: u8,
    /// `None` for dependent slice segments.
    pub slice_type: Option<SliceType>,
    pub pic_output_flag: bool,
    pub colour_plane_id: u8,
    pub slice_pic_order_cnt_lsb: u32,
    pub short_term_ref_pic_set_sps_flag: bool,
    /// Set coded in the header itself.
    pub short_term_ref_pic_set: Option<ShortTermRefPicSet>,
    /// Size in bits of the header's `st_ref_pic_set()`.
    pub short_term_ref_pic_set_size_bits: u64,
    pub short_term_ref_pic_set_idx: u32,
    pub num_long_term_sps: u32,
    pub num_long_term_pics: u32,
    pub long_term_refs: Vec<LongTermRef>,
    pub slice_temporal_mvp_enabled_flag: bool,
    pub slice_sao_luma_flag: bool,
    pub slice_sao_chroma_flag: bool,
    pub num_ref_idx_active_override_flag: bool,
    pub num_ref_idx_l0_active_minus1: u32,
    pub num_ref_idx_l1_active_minus1: u32,
    /// NumPicTotalCurr.
    pub num_pic_total_curr: u32,
    pub ref_pic_lists_modification: Option<RefPicListsModification>,
    pub mvd_l1_zero_flag: bool,
    pub cabac_init_flag: bool,
    pub collocated_from_l0_flag: bool,
    pub collocated_ref_idx: u32,
    pub pred_weight_table: Option<PredWeightTable>,
    pub five_minus_max_num_merge_cand: u32,
    pub slice_qp_delta: i32,
    pub slice_cb_qp_offset: i32,
    pub slice_cr_qp_offset: i32,
    /// Only coded when the PPS range extension enables chroma QP offset lists.
    pub cu_chroma_qp_offset_enabled_flag: bool,
    pub deblocking_filter_override_flag: bool,
    pub slice_deblocking_filter_disabled_flag: bool,
    pub slice_beta_offset_div2: i32,
    pub slice_tc_offset_div2: i32,
    pub slice_loop_filter_across_slices_enabled_flag: bool,
    pub offset_len_minus1: u32,
    pub entry_point_offset_minus1: Vec<u32>,
    pub slice_segment_header_extension_data: Vec<u8>,
    /// Header size in bits, NAL header excluded, `byte_alignment()` included.
    pub size_bits: u64,
    /// Byte offset of the slice data within the escaped NAL unit.
    pub data_offset: usize,
}

/// Fields up to and including `slice_type`.
struct Prefix<'a> {
    first_slice_segment_in_pic_flag: bool,
    no_output_of_prior_pics_flag: bool,
    slice_pic_parameter_set_id: u32,
    dependent_slice_segment_flag: bool,
    slice_segment_address: u32,
    slice_reserved_flags: u8,
    slice_type: Option<SliceType>,
    sps: &'a Sps,
    pps: &'a Pps,
}

fn read_prefix<'a>(
    reader: &mut EbspReader<'_>,
    nal_type: NalUnitType,
    sps_map: &'a SpsMap,
    pps_map: &'a PpsMap,
) -> Result<Prefix<'a>> {
    let first_slice_segment_in_pic_flag = reader.read_flag()?;
    let no_output_of_prior_pics_flag = nal_type.is_irap() && reader.read_flag()?;

    let slice_pic_parameter_set_id = reader.read_ue()?;
    let pps = pps_map
        .get(&slice_pic_parameter_set_id)
        .ok_or_else(|| Error::missing(STRUCTURE, "PPS", slice_pic_parameter_set_id))?;
    let sps = sps_map
        .get(&pps.pps_seq_parameter_set_id)
        .ok_or_else(|| Error::missing(STRUCTURE, "SPS", pps.pps_seq_parameter_set_id))?;

    let mut dependent_slice_segment_flag = false;
    let mut slice_segment_address = 0;
    if !first_slice_segment_in_pic_flag {
        if pps.dependent_slice_segments_enabled_flag {
            dependent_slice_segment_flag = reader.read_flag()?;
        }
        let pic_size = sps.pic_size_in_ctbs();
        slice_segment_address = reader.read_bits(ceil_log2(pic_size) as u8)?;
        if slice_segment_address >= pic_size {
            return Err(Error::format(
                STRUCTURE,
                format!("slice_segment_address {slice_segment_address} outside {pic_size} CTBs"),
            ));
        }
    }

    let mut slice_reserved_flags = 0;
    let mut slice_type = None;
    if !dependent_slice_segment_flag {
        slice_reserved_flags = reader.read_bits(pps.num_extra_slice_header_bits)? as u8;
        let value = reader.read_ue()?;
        slice_type = Some(
            SliceType::from_value(value)
                .ok_or_else(|| Error::format(STRUCTURE, format!("invalid slice type {value}")))?,
        );
    }

    Ok(Prefix {
        first_slice_segment_in_pic_flag,
        no_output_of_prior_pics_flag,
        slice_pic_parameter_set_id,
        dependent_slice_segment_flag,
        slice_segment_address,
        slice_reserved_flags,
        slice_type,
        sps,
        pps,
    })
}

fn read_slice_nal_header(reader: &mut EbspReader<'_>) -> Result<NalUnitHeader> {
    let header = NalUnitHeader::parse(reader)?;
    if !header.nal_unit_type.has_slice_header() {
        return Err(Error::wrong_nal_type(STRUCTURE, header.nal_unit_type.to_u8()));
    }
    if header.nuh_layer_id != 0 {
        return Err(Error::unsupported(STRUCTURE, "multi-layer slices"));
    }
    Ok(header)
}

fn ref_idx(value: u32, field: &'static str) -> Result<u32> {
    if value > MAX_NUM_REF_IDX_MINUS1 {
        return Err(Error::format(STRUCTURE, format!("{field} {value} out of range")));
    }
    Ok(value)
}

/// Fail when the header grammar depends on parameter-set extension data
/// that was not decoded.
fn check_extensions(sps: &Sps, pps: &Pps) -> Result<()> {
    if pps.extensions.undecoded() {
        return Err(Error::unsupported(STRUCTURE, "PPS extensions"));
    }
    if sps.extensions.sps_scc_extension_flag {
        return Err(Error::unsupported(STRUCTURE, "SPS screen content coding extension"));
    }
    Ok(())
}

impl SliceSegmentHeader {
    /// Parse the header of a slice segment NAL unit.
    ///
    /// The PPS is resolved by `slice_pic_parameter_set_id` and the SPS
    /// through the PPS; either missing is an [`Error::MissingReference`].
    /// A PPS stored with undecoded multilayer, 3D or SCC extensions, or an
    /// SPS with an SCC extension, gives [`Error::Unsupported`].
    pub fn parse(nalu: &[u8], sps_map: &SpsMap, pps_map: &PpsMap) -> Result<Self> {
        let mut reader = EbspReader::new(nalu);
        let header = read_slice_nal_header(&mut reader)?;
        Self::parse_from_reader(&mut reader, header, sps_map, pps_map)
            .within(STRUCTURE, reader.bit_position())
    }

    /// Parse `slice_segment_header()` after the NAL header.
    pub fn parse_from_reader(
        reader: &mut EbspReader<'_>,
        header: NalUnitHeader,
        sps_map: &SpsMap,
        pps_map: &PpsMap,
    ) -> Result<Self> {
        let nal_type = header.nal_unit_type;
        let start = reader.bit_position();
        let prefix = read_prefix(reader, nal_type, sps_map, pps_map)?;
        let (sps, pps) = (prefix.sps, prefix.pps);
        if let Err(e) = check_extensions(sps, pps) {
            tracing::warn!(
                pps_id = prefix.slice_pic_parameter_set_id,
                error = %e,
                "Slice references undecoded parameter-set extensions"
            );
            return Err(e);
        }

        let mut sh = Self {
            nal_unit_type: nal_type,
            temporal_id: header.temporal_id(),
            first_slice_segment_in_pic_flag: prefix.first_slice_segment_in_pic_flag,
            no_output_of_prior_pics_flag: prefix.no_output_of_prior_pics_flag,
            slice_pic_parameter_set_id: prefix.slice_pic_parameter_set_id,
            dependent_slice_segment_flag: prefix.dependent_slice_segment_flag,
            slice_segment_address: prefix.slice_segment_address,
            slice_reserved_flags: prefix.slice_reserved_flags,
            slice_type: prefix.slice_type,
            pic_output_flag: true,
            colour_plane_id: 0,
            slice_pic_order_cnt_lsb: 0,
            short_term_ref_pic_set_sps_flag: false,
            short_term_ref_pic_set: None,
            short_term_ref_pic_set_size_bits: 0,
            short_term_ref_pic_set_idx: 0,
            num_long_term_sps: 0,
            num_long_term_pics: 0,
            long_term_refs: Vec::new(),
            slice_temporal_mvp_enabled_flag: false,
            slice_sao_luma_flag: false,
            slice_sao_chroma_flag: false,
            num_ref_idx_active_override_flag: false,
            num_ref_idx_l0_active_minus1: u32::from(pps.num_ref_idx_l0_default_active_minus1),
            num_ref_idx_l1_active_minus1: u32::from(pps.num_ref_idx_l1_default_active_minus1),
            num_pic_total_curr: 0,
            ref_pic_lists_modification: None,
            mvd_l1_zero_flag: false,
            cabac_init_flag: false,
            collocated_from_l0_flag: true,
            collocated_ref_idx: 0,
            pred_weight_table: None,
            five_minus_max_num_merge_cand: 0,
            slice_qp_delta: 0,
            slice_cb_qp_offset: 0,
            slice_cr_qp_offset: 0,
            cu_chroma_qp_offset_enabled_flag: false,
            deblocking_filter_override_flag: false,
            slice_deblocking_filter_disabled_flag: pps.pps_deblocking_filter_disabled_flag(),
            slice_beta_offset_div2: pps.deblocking.map_or(0, |d| d.pps_beta_offset_div2),
            slice_tc_offset_div2: pps.deblocking.map_or(0, |d| d.pps_tc_offset_div2),
            slice_loop_filter_across_slices_enabled_flag: pps
                .pps_loop_filter_across_slices_enabled_flag,
            offset_len_minus1: 0,
            entry_point_offset_minus1: Vec::new(),
            slice_segment_header_extension_data: Vec::new(),
            size_bits: 0,
            data_offset: 0,
        };

        if let Some(slice_type) = sh.slice_type {
            sh.read_independent_fields(reader, slice_type, sps, pps)?;
        }

        if pps.tiles_enabled_flag() || pps.entropy_coding_sync_enabled_flag {
            sh.read_entry_points(reader, sps)?;
        }

        if pps.slice_segment_header_extension_present_flag {
            let length = reader.read_ue()?;
            if length > MAX_HEADER_EXTENSION_LENGTH {
                return Err(Error::format(
                    STRUCTURE,
                    format!("slice_segment_header_extension_length {length} out of range"),
                ));
            }
            let mut data = Vec::with_capacity(reader.capacity_for(u64::from(length), 8));
            for _ in 0..length {
                data.push(reader.read_u8()?);
            }
            sh.slice_segment_header_extension_data = data;
        }

        read_byte_alignment(reader)?;
        sh.size_bits = reader.bit_position() - start;
        sh.data_offset = reader.bytes_read();
        Ok(sh)
    }

    fn read_independent_fields(
        &mut self,
        reader: &mut EbspReader<'_>,
        slice_type: SliceType,
        sps: &Sps,
        pps: &Pps,
    ) -> Result<()> {
        if pps.output_flag_present_flag {
            self.pic_output_flag = reader.read_flag()?;
        }
        if sps.separate_colour_plane_flag {
            self.colour_plane_id = reader.read_bits(2)? as u8;
        }

        if !self.nal_unit_type.is_idr() {
            self.slice_pic_order_cnt_lsb = reader.read_bits(sps.log2_max_pic_order_cnt_lsb())?;
            self.read_short_term_rps(reader, sps)?;
            if sps.long_term_ref_pics_present_flag {
                self.read_long_term_refs(reader, sps)?;
            }
            if sps.sps_temporal_mvp_enabled_flag {
                self.slice_temporal_mvp_enabled_flag = reader.read_flag()?;
            }
        }

        if sps.sample_adaptive_offset_enabled_flag {
            self.slice_sao_luma_flag = reader.read_flag()?;
            if sps.chroma_array_type() != 0 {
                self.slice_sao_chroma_flag = reader.read_flag()?;
            }
        }

        self.num_pic_total_curr = self.compute_num_pic_total_curr(sps);

        if !slice_type.is_intra() {
            self.read_inter_fields(reader, slice_type, sps, pps)?;
        }

        self.slice_qp_delta = reader.read_se()?;
        if pps.pps_slice_chroma_qp_offsets_present_flag {
            self.slice_cb_qp_offset = reader.read_se()?;
            self.slice_cr_qp_offset = reader.read_se()?;
        }
        if pps.chroma_qp_offset_list_enabled_flag() {
            self.cu_chroma_qp_offset_enabled_flag = reader.read_flag()?;
        }

        if pps.deblocking_filter_override_enabled_flag() {
            self.deblocking_filter_override_flag = reader.read_flag()?;
        }
        if self.deblocking_filter_override_flag {
            self.slice_deblocking_filter_disabled_flag = reader.read_flag()?;
            if !self.slice_deblocking_filter_disabled_flag {
                self.slice_beta_offset_div2 = reader.read_se()?;
                self.slice_tc_offset_div2 = reader.read_se()?;
            }
        }

        if pps.pps_loop_filter_across_slices_enabled_flag
            && (self.slice_sao_luma_flag
                || self.slice_sao_chroma_flag
                || !self.slice_deblocking_filter_disabled_flag)
        {
            self.slice_loop_filter_across_slices_enabled_flag = reader.read_flag()?;
        }
        Ok(())
    }

    fn read_short_term_rps(&mut self, reader: &mut EbspReader<'_>, sps: &Sps) -> Result<()> {
        let num_sets = sps.st_ref_pic_sets.len();
        self.short_term_ref_pic_set_sps_flag = reader.read_flag()?;
        if !self.short_term_ref_pic_set_sps_flag {
            let before = reader.bit_position();
            let set = ShortTermRefPicSet::parse(reader, num_sets, num_sets, &sps.st_ref_pic_sets)?;
            self.short_term_ref_pic_set_size_bits = reader.bit_position() - before;
            self.short_term_ref_pic_set = Some(set);
            return Ok(());
        }
        if num_sets == 0 {
            return Err(Error::format(
                STRUCTURE,
                "short_term_ref_pic_set_sps_flag set without SPS sets",
            ));
        }
        if num_sets > 1 {
            let idx = reader.read_bits(ceil_log2(num_sets as u32) as u8)?;
            if idx as usize >= num_sets {
                return Err(Error::format(
                    STRUCTURE,
                    format!("short_term_ref_pic_set_idx {idx} out of range"),
                ));
            }
            self.short_term_ref_pic_set_idx = idx;
        }
        Ok(())
    }

    fn read_long_term_refs(&mut self, reader: &mut EbspReader<'_>, sps: &Sps) -> Result<()> {
        let num_candidates = sps.lt_ref_pic_poc_lsb_sps.len() as u32;
        if num_candidates > 0 {
            self.num_long_term_sps = reader.read_ue()?;
            if self.num_long_term_sps > num_candidates {
                return Err(Error::format(
                    STRUCTURE,
                    format!("num_long_term_sps {} out of range", self.num_long_term_sps),
                ));
            }
        }
        self.num_long_term_pics = reader.read_ue()?;
        if self.num_long_term_pics > MAX_LONG_TERM_PICS - self.num_long_term_sps {
            return Err(Error::format(
                STRUCTURE,
                format!("num_long_term_pics {} out of range", self.num_long_term_pics),
            ));
        }

        let lsb_bits = sps.log2_max_pic_order_cnt_lsb();
        let idx_bits = ceil_log2(num_candidates) as u8;
        for i in 0..self.num_long_term_sps + self.num_long_term_pics {
            let mut entry = if i < self.num_long_term_sps {
                let idx = if num_candidates > 1 {
                    reader.read_bits(idx_bits)?
                } else {
                    0
                };
                let k = idx as usize;
                match (
                    sps.lt_ref_pic_poc_lsb_sps.get(k),
                    sps.used_by_curr_pic_lt_sps_flag.get(k),
                ) {
                    (Some(&poc_lsb_lt), Some(&used)) => LongTermRef {
                        lt_idx_sps: Some(idx),
                        poc_lsb_lt,
                        used_by_curr_pic_lt_flag: used,
                        delta_poc_msb_cycle_lt: None,
                    },
                    _ => {
                        return Err(Error::format(
                            STRUCTURE,
                            format!("lt_idx_sps {idx} out of range"),
                        ))
                    }
                }
            } else {
                LongTermRef {
                    lt_idx_sps: None,
                    poc_lsb_lt: reader.read_bits(lsb_bits)?,
                    used_by_curr_pic_lt_flag: reader.read_flag()?,
                    delta_poc_msb_cycle_lt: None,
                }
            };
            if reader.read_flag()? {
                entry.delta_poc_msb_cycle_lt = Some(reader.read_ue()?);
            }
            self.long_term_refs.push(entry);
        }
        Ok(())
    }

    fn compute_num_pic_total_curr(&self, sps: &Sps) -> u32 {
        let short_term = self
            .short_term_ref_pic_set(sps)
            .map_or(0, ShortTermRefPicSet::num_used_by_curr_pic);
        let long_term = self
            .long_term_refs
            .iter()
            .filter(|lt| lt.used_by_curr_pic_lt_flag)
            .count();
        (short_term + long_term) as u32
    }

    fn read_inter_fields(
        &mut self,
        reader: &mut EbspReader<'_>,
        slice_type: SliceType,
        sps: &Sps,
        pps: &Pps,
    ) -> Result<()> {
        let bidirectional = slice_type.is_bidirectional();
        self.num_ref_idx_active_override_flag = reader.read_flag()?;
        if self.num_ref_idx_active_override_flag {
            self.num_ref_idx_l0_active_minus1 =
                ref_idx(reader.read_ue()?, "num_ref_idx_l0_active_minus1")?;
            if bidirectional {
                self.num_ref_idx_l1_active_minus1 =
                    ref_idx(reader.read_ue()?, "num_ref_idx_l1_active_minus1")?;
            }
        }

        if pps.lists_modification_present_flag && self.num_pic_total_curr > 1 {
            let bits = ceil_log2(self.num_pic_total_curr) as u8;
            let mut modification = RefPicListsModification {
                list_entry_l0: read_list_entries(reader, self.num_ref_idx_l0_active_minus1, bits)?,
                list_entry_l1: None,
            };
            if bidirectional {
                modification.list_entry_l1 =
                    read_list_entries(reader, self.num_ref_idx_l1_active_minus1, bits)?;
            }
            self.ref_pic_lists_modification = Some(modification);
        }

        if bidirectional {
            self.mvd_l1_zero_flag = reader.read_flag()?;
        }
        if pps.cabac_init_present_flag {
            self.cabac_init_flag = reader.read_flag()?;
        }

        if self.slice_temporal_mvp_enabled_flag {
            if bidirectional {
                self.collocated_from_l0_flag = reader.read_flag()?;
            }
            let active_minus1 = if self.collocated_from_l0_flag {
                self.num_ref_idx_l0_active_minus1
            } else {
                self.num_ref_idx_l1_active_minus1
            };
            if active_minus1 > 0 {
                self.collocated_ref_idx = reader.read_ue()?;
            }
        }

        if (pps.weighted_pred_flag && slice_type == SliceType::P)
            || (pps.weighted_bipred_flag && bidirectional)
        {
            self.pred_weight_table = Some(self.read_pred_weight_table(reader, slice_type, sps)?);
        }

        self.five_minus_max_num_merge_cand = reader.read_ue()?;
        Ok(())
    }

    fn read_pred_weight_table(
        &self,
        reader: &mut EbspReader<'_>,
        slice_type: SliceType,
        sps: &Sps,
    ) -> Result<PredWeightTable> {
        let chroma = sps.chroma_array_type() != 0;
        let luma_log2_weight_denom = reader.read_ue()?;
        let chroma_log2_weight_denom = if chroma {
            i64::from(luma_log2_weight_denom) + i64::from(reader.read_se()?)
        } else {
            i64::from(luma_log2_weight_denom)
        };

        let mut table = PredWeightTable {
            luma_log2_weight_denom,
            chroma_log2_weight_denom,
            l0: read_pred_weights(reader, self.num_ref_idx_l0_active_minus1, chroma)?,
            l1: Vec::new(),
        };
        if slice_type.is_bidirectional() {
            table.l1 = read_pred_weights(reader, self.num_ref_idx_l1_active_minus1, chroma)?;
        }
        Ok(table)
    }

    fn read_entry_points(&mut self, reader: &mut EbspReader<'_>, sps: &Sps) -> Result<()> {
        let count = reader.read_ue()?;
        // At most one entry point per CTB beyond the first.
        if count >= sps.pic_size_in_ctbs().max(1) {
            return Err(Error::format(
                STRUCTURE,
                format!("num_entry_point_offsets {count} out of range"),
            ));
        }
        if count == 0 {
            return Ok(());
        }
        self.offset_len_minus1 = reader.read_ue()?;
        if self.offset_len_minus1 > 31 {
            return Err(Error::format(
                STRUCTURE,
                format!("offset_len_minus1 {} out of range", self.offset_len_minus1),
            ));
        }
        let bits = self.offset_len_minus1 as u8 + 1;
        let mut offsets =
            Vec::with_capacity(reader.capacity_for(u64::from(count), u64::from(bits)));
        for _ in 0..count {
            offsets.push(reader.read_bits(bits)?);
        }
        self.entry_point_offset_minus1 = offsets;
        Ok(())
    }

    /// Check if this is an intra slice; `false` for dependent segments.
    pub fn is_intra(&self) -> bool {
        self.slice_type.is_some_and(SliceType::is_intra)
    }

    /// The short-term RPS in effect: the header's own set or the SPS set
    /// chosen by `short_term_ref_pic_set_idx`. `None` for IDR pictures and
    /// dependent segments.
    pub fn short_term_ref_pic_set<'a>(&'a self, sps: &'a Sps) -> Option<&'a ShortTermRefPicSet> {
        if self.short_term_ref_pic_set_sps_flag {
            sps.st_ref_pic_sets
                .get(self.short_term_ref_pic_set_idx as usize)
        } else {
            self.short_term_ref_pic_set.as_ref()
        }
    }

    /// Entry point offsets in bytes.
    pub fn entry_point_offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.entry_point_offset_minus1
            .iter()
            .map(|&o| u64::from(o) + 1)
    }

    /// MaxNumMergeCand; zero when `five_minus_max_num_merge_cand` exceeds 5.
    pub fn max_num_merge_cand(&self) -> u32 {
        5u32.saturating_sub(self.five_minus_max_num_merge_cand)
    }

    /// SliceQpY.
    pub fn qp(&self, pps: &Pps) -> i32 {
        pps.init_qp().saturating_add(self.slice_qp_delta)
    }
}

/// Slice type of a slice segment NAL unit.
///
/// Reads only through `slice_type`; the parameter sets are needed for the
/// field widths before it. `None` for a dependent slice segment, which
/// takes its type from the preceding independent segment.
pub fn slice_type_of(nalu: &[u8], sps_map: &SpsMap, pps_map: &PpsMap) -> Result<Option<SliceType>> {
    let mut reader = EbspReader::new(nalu);
    let header = read_slice_nal_header(&mut reader)?;
    let prefix = read_prefix(&mut reader, header.nal_unit_type, sps_map, pps_map)
        .within(STRUCTURE, reader.bit_position())?;
    Ok(prefix.slice_type)
}

fn read_list_entries<R: ReadBits + ?Sized>(
    reader: &mut R,
    num_ref_idx_active_minus1: u32,
    bits: u8,
) -> Result<Option<Vec<u32>>> {
    if !reader.read_flag()? {
        return Ok(None);
    }
    let mut entries = Vec::with_capacity(num_ref_idx_active_minus1 as usize + 1);
    for _ in 0..=num_ref_idx_active_minus1 {
        entries.push(reader.read_bits(bits)?);
    }
    Ok(Some(entries))
}

fn read_pred_weights<R: ReadBits + ?Sized>(
    reader: &mut R,
    num_ref_idx_active_minus1: u32,
    chroma: bool,
) -> Result<Vec<PredWeight>> {
    let count = num_ref_idx_active_minus1 as usize + 1;
    let mut luma_flags = Vec::with_capacity(count);
    for _ in 0..count {
        luma_flags.push(reader.read_flag()?);
    }
    let mut chroma_flags = vec![false; count];
    if chroma {
        for flag in &mut chroma_flags {
            *flag = reader.read_flag()?;
        }
    }

    let mut weights = Vec::with_capacity(count);
    for (luma_flag, chroma_flag) in luma_flags.into_iter().zip(chroma_flags) {
        let luma = if luma_flag {
            Some((reader.read_se()?, reader.read_se()?))
        } else {
            None
        };
        let chroma = if chroma_flag {
            let mut pair = [(0, 0); 2];
            for entry in &mut pair {
                *entry = (reader.read_se()?, reader.read_se()?);
            }
            Some(pair)
        } else {
            None
        };
        weights.push(PredWeight { luma, chroma });
    }
    Ok(weights)
}

/// `byte_alignment()`: a one bit, then zero bits to the byte boundary.
fn read_byte_alignment<R: ReadBits + ?Sized>(reader: &mut R) -> Result<()> {
    if !reader.read_flag()? {
        return Err(Error::format(STRUCTURE, "alignment_bit_equal_to_one is zero"));
    }
    while !reader.is_byte_aligned() {
        if reader.read_flag()? {
            return Err(Error::format(STRUCTURE, "alignment_bit_equal_to_zero is one"));
        }
    }
    Ok(())
}
