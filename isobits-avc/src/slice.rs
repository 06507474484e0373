//! Slice header parsing.

use isobits_core::{
    ceil_log2, EbspReader, Error, ExpGolombRead, ReadBits, Result, ResultExt,
};

use crate::nal::{NalHeader, NalUnitType};
use crate::pps::PictureParameterSet;
use crate::sps::SequenceParameterSet;
use crate::{PpsMap, SpsMap};

const STRUCTURE: &str = "slice header";

/// Slice type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SliceType {
    /// P slice (predictive).
    P = 0,
    /// B slice (bidirectional).
    B = 1,
    /// I slice (intra).
    I = 2,
    /// SP slice (switching P).
    Sp = 3,
    /// SI slice (switching I).
    Si = 4,
}

impl SliceType {
    /// Create from a `slice_type` value (0-9; 5-9 repeat 0-4).
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 | 5 => Some(Self::P),
            1 | 6 => Some(Self::B),
            2 | 7 => Some(Self::I),
            3 | 8 => Some(Self::Sp),
            4 | 9 => Some(Self::Si),
            _ => None,
        }
    }

    /// Check if all macroblocks in this slice type are intra.
    pub fn is_intra(self) -> bool {
        matches!(self, Self::I | Self::Si)
    }

    /// Check if this slice type uses bidirectional prediction.
    pub fn is_bidirectional(self) -> bool {
        self == Self::B
    }

    /// Check if the slice carries reference list 0 (P, SP and B).
    pub fn uses_list0(self) -> bool {
        matches!(self, Self::P | Self::Sp | Self::B)
    }
}

/// One `modification_of_pic_nums_idc` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefPicListModification {
    /// idc 0: subtract `abs_diff_pic_num_minus1 + 1` from the predicted pic num.
    Subtract { abs_diff_pic_num_minus1: u32 },
    /// idc 1: add `abs_diff_pic_num_minus1 + 1`.
    Add { abs_diff_pic_num_minus1: u32 },
    /// idc 2: long-term picture.
    LongTerm { long_term_pic_num: u32 },
}

/// Explicit weights for one reference index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredWeight {
    /// `(luma_weight, luma_offset)` when `luma_weight_flag` is set.
    pub luma: Option<(i32, i32)>,
    /// `(weight, offset)` for Cb and Cr when `chroma_weight_flag` is set.
    pub chroma: Option<[(i32, i32); 2]>,
}

/// `pred_weight_table()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredWeightTable {
    pub luma_log2_weight_denom: u32,
    /// Only coded when ChromaArrayType is not 0.
    pub chroma_log2_weight_denom: u32,
    pub l0: Vec<PredWeight>,
    pub l1: Vec<PredWeight>,
}

/// Memory management control operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mmco {
    /// 1: mark a short-term picture unused.
    ShortTermUnused { difference_of_pic_nums_minus1: u32 },
    /// 2: mark a long-term picture unused.
    LongTermUnused { long_term_pic_num: u32 },
    /// 3: convert a short-term picture to long-term.
    ShortTermToLongTerm {
        difference_of_pic_nums_minus1: u32,
        long_term_frame_idx: u32,
    },
    /// 4: set the maximum long-term frame index.
    MaxLongTermFrameIdx { max_long_term_frame_idx_plus1: u32 },
    /// 5: mark all pictures unused.
    ClearAll,
    /// 6: mark the current picture long-term.
    CurrentToLongTerm { long_term_frame_idx: u32 },
}

/// `dec_ref_pic_marking()`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecRefPicMarking {
    /// IDR pictures.
    Idr {
        no_output_of_prior_pics_flag: bool,
        long_term_reference_flag: bool,
    },
    /// Sliding window (`adaptive_ref_pic_marking_mode_flag` = 0).
    SlidingWindow,
    /// Adaptive marking with explicit operations.
    Adaptive(Vec<Mmco>),
}

/// Slice header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceHeader {
    /// NAL unit type of the slice (1, 2 or 5).
    pub nal_unit_type: NalUnitType,
    /// NAL reference IDC.
    pub nal_ref_idc: u8,
    /// First macroblock address in slice.
    pub first_mb_in_slice: u32,
    /// Raw `slice_type` (0-9).
    pub slice_type_value: u32,
    /// Slice type.
    pub slice_type: SliceType,
    /// PPS ID.
    pub pps_id: u32,
    /// Color plane ID (for separate color plane).
    pub colour_plane_id: u8,
    /// Frame number.
    pub frame_num: u32,
    /// Field pic flag.
    pub field_pic_flag: bool,
    /// Bottom field flag.
    pub bottom_field_flag: bool,
    /// IDR picture ID.
    pub idr_pic_id: u32,
    /// Picture order count LSB.
    pub pic_order_cnt_lsb: u32,
    /// Delta POC bottom.
    pub delta_pic_order_cnt_bottom: i32,
    /// Delta POC [0].
    pub delta_pic_order_cnt_0: i32,
    /// Delta POC [1].
    pub delta_pic_order_cnt_1: i32,
    /// Redundant picture count.
    pub redundant_pic_cnt: u32,
    /// Direct spatial MV pred flag.
    pub direct_spatial_mv_pred_flag: bool,
    /// Override of the PPS reference index counts.
    pub num_ref_idx_active_override_flag: bool,
    /// Number of reference indices for L0.
    pub num_ref_idx_l0_active_minus1: u32,
    /// Number of reference indices for L1.
    pub num_ref_idx_l1_active_minus1: u32,
    /// List 0 modifications; `None` when not signalled.
    pub ref_pic_list_modification_l0: Option<Vec<RefPicListModification>>,
    /// List 1 modifications; `None` when not signalled.
    pub ref_pic_list_modification_l1: Option<Vec<RefPicListModification>>,
    /// Explicit weighted prediction table.
    pub pred_weight_table: Option<PredWeightTable>,
    /// Reference marking, present for reference pictures.
    pub dec_ref_pic_marking: Option<DecRefPicMarking>,
    /// CABAC init IDC.
    pub cabac_init_idc: u32,
    /// Slice QP delta.
    pub slice_qp_delta: i32,
    /// SP for switch flag.
    pub sp_for_switch_flag: bool,
    /// Slice QS delta.
    pub slice_qs_delta: i32,
    /// Disable deblocking filter IDC.
    pub disable_deblocking_filter_idc: u32,
    /// Slice alpha C0 offset div 2.
    pub slice_alpha_c0_offset_div2: i32,
    /// Slice beta offset div 2.
    pub slice_beta_offset_div2: i32,
    /// Slice group change cycle.
    pub slice_group_change_cycle: u32,
    /// Header size in bits, NAL header byte excluded.
    pub size_bits: u64,
}

impl SliceHeader {
    /// Parse the header of a slice NAL unit.
    ///
    /// The PPS is resolved by `pic_parameter_set_id` and the SPS through the
    /// PPS; either missing is an [`Error::MissingReference`].
    pub fn parse(nalu: &[u8], sps_map: &SpsMap, pps_map: &PpsMap) -> Result<Self> {
        let mut reader = EbspReader::new(nalu);
        let header = NalHeader::parse(&mut reader).within(STRUCTURE, 0)?;
        match header.nal_unit_type {
            t if t.has_slice_header() => {}
            NalUnitType::SliceExt | NalUnitType::SliceExtDepth => {
                return Err(Error::unsupported(STRUCTURE, "MVC/SVC slice extension"))
            }
            t => return Err(Error::wrong_nal_type(STRUCTURE, t.to_u8())),
        }

        Self::parse_from_reader(&mut reader, header, sps_map, pps_map)
            .within(STRUCTURE, reader.bit_position())
    }

    /// Parse `slice_header()` after the NAL header.
    pub fn parse_from_reader(
        reader: &mut EbspReader<'_>,
        header: NalHeader,
        sps_map: &SpsMap,
        pps_map: &PpsMap,
    ) -> Result<Self> {
        let nal_type = header.nal_unit_type;
        let idr = nal_type == NalUnitType::IdrSlice;
        let start = reader.bit_position();

        let first_mb_in_slice = reader.read_ue()?;
        let slice_type_value = reader.read_ue()?;
        let slice_type = SliceType::from_value(slice_type_value).ok_or_else(|| {
            Error::format(STRUCTURE, format!("invalid slice type {slice_type_value}"))
        })?;

        let pps_id = reader.read_ue()?;
        let pps = pps_map
            .get(&pps_id)
            .ok_or_else(|| Error::missing(STRUCTURE, "PPS", pps_id))?;
        let sps = sps_map
            .get(&pps.sps_id)
            .ok_or_else(|| Error::missing(STRUCTURE, "SPS", pps.sps_id))?;

        let colour_plane_id = if sps.separate_colour_plane_flag {
            reader.read_bits(2)? as u8
        } else {
            0
        };

        let frame_num = reader.read_bits(field_width(sps.log2_max_frame_num(), "frame_num")?)?;

        let (field_pic_flag, bottom_field_flag) = if !sps.frame_mbs_only_flag {
            let fpf = reader.read_flag()?;
            let bff = if fpf { reader.read_flag()? } else { false };
            (fpf, bff)
        } else {
            (false, false)
        };

        let idr_pic_id = if idr { reader.read_ue()? } else { 0 };

        let bottom_present = pps.bottom_field_pic_order_in_frame_present_flag && !field_pic_flag;
        let (
            pic_order_cnt_lsb,
            delta_pic_order_cnt_bottom,
            delta_pic_order_cnt_0,
            delta_pic_order_cnt_1,
        ) = match sps.pic_order_cnt_type {
            0 => {
                let width = field_width(sps.log2_max_pic_order_cnt_lsb(), "pic_order_cnt_lsb")?;
                let lsb = reader.read_bits(width)?;
                let bottom = if bottom_present { reader.read_se()? } else { 0 };
                (lsb, bottom, 0, 0)
            }
            1 if !sps.delta_pic_order_always_zero_flag => {
                let d0 = reader.read_se()?;
                let d1 = if bottom_present { reader.read_se()? } else { 0 };
                (0, 0, d0, d1)
            }
            _ => (0, 0, 0, 0),
        };

        let redundant_pic_cnt = if pps.redundant_pic_cnt_present_flag {
            reader.read_ue()?
        } else {
            0
        };

        let direct_spatial_mv_pred_flag = if slice_type == SliceType::B {
            reader.read_flag()?
        } else {
            false
        };

        let (
            num_ref_idx_active_override_flag,
            num_ref_idx_l0_active_minus1,
            num_ref_idx_l1_active_minus1,
        ) = if slice_type.uses_list0() && reader.read_flag()? {
            let l0 = reader.read_ue()?;
            let l1 = if slice_type == SliceType::B {
                reader.read_ue()?
            } else {
                pps.num_ref_idx_l1_default_active_minus1
            };
            (true, l0, l1)
        } else {
            (
                false,
                pps.num_ref_idx_l0_default_active_minus1,
                pps.num_ref_idx_l1_default_active_minus1,
            )
        };

        let (ref_pic_list_modification_l0, ref_pic_list_modification_l1) =
            if slice_type.is_intra() {
                (None, None)
            } else {
                let l0 = read_ref_pic_list_modification(reader)?;
                let l1 = if slice_type == SliceType::B {
                    read_ref_pic_list_modification(reader)?
                } else {
                    None
                };
                (l0, l1)
            };

        let pred_weight_table = if (pps.weighted_pred_flag
            && matches!(slice_type, SliceType::P | SliceType::Sp))
            || (pps.weighted_bipred_idc == 1 && slice_type == SliceType::B)
        {
            Some(read_pred_weight_table(
                reader,
                sps,
                slice_type,
                num_ref_idx_l0_active_minus1,
                num_ref_idx_l1_active_minus1,
            )?)
        } else {
            None
        };

        let dec_ref_pic_marking = if header.nal_ref_idc != 0 {
            Some(read_dec_ref_pic_marking(reader, idr)?)
        } else {
            None
        };

        let cabac_init_idc = if pps.entropy_coding_mode_flag && !slice_type.is_intra() {
            reader.read_ue()?
        } else {
            0
        };

        let slice_qp_delta = reader.read_se()?;

        let (sp_for_switch_flag, slice_qs_delta) =
            if matches!(slice_type, SliceType::Sp | SliceType::Si) {
                let spf = if slice_type == SliceType::Sp {
                    reader.read_flag()?
                } else {
                    false
                };
                (spf, reader.read_se()?)
            } else {
                (false, 0)
            };

        let (disable_deblocking_filter_idc, slice_alpha_c0_offset_div2, slice_beta_offset_div2) =
            if pps.deblocking_filter_control_present_flag {
                let idc = reader.read_ue()?;
                if idc != 1 {
                    (idc, reader.read_se()?, reader.read_se()?)
                } else {
                    (idc, 0, 0)
                }
            } else {
                (0, 0, 0)
            };

        let change_rate = pps.slice_group_map.as_ref().and_then(|m| m.change_rate());
        let slice_group_change_cycle = match change_rate {
            Some(rate) if pps.num_slice_groups_minus1 > 0 => {
                let bits = slice_group_change_cycle_bits(sps, rate);
                reader.read_bits(field_width(bits, "slice_group_change_cycle")?)?
            }
            _ => 0,
        };

        Ok(Self {
            nal_unit_type: nal_type,
            nal_ref_idc: header.nal_ref_idc,
            first_mb_in_slice,
            slice_type_value,
            slice_type,
            pps_id,
            colour_plane_id,
            frame_num,
            field_pic_flag,
            bottom_field_flag,
            idr_pic_id,
            pic_order_cnt_lsb,
            delta_pic_order_cnt_bottom,
            delta_pic_order_cnt_0,
            delta_pic_order_cnt_1,
            redundant_pic_cnt,
            direct_spatial_mv_pred_flag,
            num_ref_idx_active_override_flag,
            num_ref_idx_l0_active_minus1,
            num_ref_idx_l1_active_minus1,
            ref_pic_list_modification_l0,
            ref_pic_list_modification_l1,
            pred_weight_table,
            dec_ref_pic_marking,
            cabac_init_idc,
            slice_qp_delta,
            sp_for_switch_flag,
            slice_qs_delta,
            disable_deblocking_filter_idc,
            slice_alpha_c0_offset_div2,
            slice_beta_offset_div2,
            slice_group_change_cycle,
            size_bits: reader.bit_position() - start,
        })
    }

    /// Calculate the slice QP.
    pub fn qp(&self, pps: &PictureParameterSet) -> i32 {
        pps.pic_init_qp().saturating_add(self.slice_qp_delta)
    }

    /// Check if `slice_type` promises the same type for every slice of the
    /// picture (values 5-9).
    pub fn all_slices_same_type(&self) -> bool {
        self.slice_type_value >= 5
    }

    /// Check if this slice belongs to a reference picture.
    pub fn is_reference(&self) -> bool {
        self.nal_ref_idc != 0
    }
}

/// Slice type of a slice NAL unit, read without any parameter set.
pub fn slice_type_of(nalu: &[u8]) -> Result<SliceType> {
    let mut reader = EbspReader::new(nalu);
    let header = NalHeader::parse(&mut reader).within(STRUCTURE, 0)?;
    if !header.nal_unit_type.has_slice_header() {
        return Err(Error::wrong_nal_type(STRUCTURE, header.nal_unit_type.to_u8()));
    }
    let _first_mb_in_slice = reader.read_ue().within(STRUCTURE, reader.bit_position())?;
    let value = reader.read_ue().within(STRUCTURE, reader.bit_position())?;
    SliceType::from_value(value)
        .ok_or_else(|| Error::format(STRUCTURE, format!("invalid slice type {value}")))
}

fn field_width(bits: u32, field: &str) -> Result<u8> {
    if bits > 32 {
        return Err(Error::format(
            STRUCTURE,
            format!("{field} width {bits} exceeds 32 bits"),
        ));
    }
    Ok(bits as u8)
}

/// Ceil(Log2(PicSizeInMapUnits ÷ SliceGroupChangeRate + 1)).
fn slice_group_change_cycle_bits(sps: &SequenceParameterSet, rate: u32) -> u32 {
    let units = sps.pic_size_in_map_units();
    ceil_log2(units.div_ceil(rate.max(1)).saturating_add(1))
}

fn read_ref_pic_list_modification<R: ReadBits + ?Sized>(
    reader: &mut R,
) -> Result<Option<Vec<RefPicListModification>>> {
    if !reader.read_flag()? {
        return Ok(None);
    }
    let mut ops = Vec::new();
    loop {
        let op = match reader.read_ue()? {
            0 => RefPicListModification::Subtract {
                abs_diff_pic_num_minus1: reader.read_ue()?,
            },
            1 => RefPicListModification::Add {
                abs_diff_pic_num_minus1: reader.read_ue()?,
            },
            2 => RefPicListModification::LongTerm {
                long_term_pic_num: reader.read_ue()?,
            },
            3 => break,
            other => {
                return Err(Error::format(
                    STRUCTURE,
                    format!("modification_of_pic_nums_idc {other} out of range"),
                ))
            }
        };
        ops.push(op);
    }
    Ok(Some(ops))
}

fn read_pred_weight_table<R: ReadBits + ?Sized>(
    reader: &mut R,
    sps: &SequenceParameterSet,
    slice_type: SliceType,
    num_ref_l0_minus1: u32,
    num_ref_l1_minus1: u32,
) -> Result<PredWeightTable> {
    let chroma = sps.chroma_array_type() != 0;
    let mut table = PredWeightTable {
        luma_log2_weight_denom: reader.read_ue()?,
        ..PredWeightTable::default()
    };
    if chroma {
        table.chroma_log2_weight_denom = reader.read_ue()?;
    }

    table.l0 = read_pred_weights(reader, num_ref_l0_minus1, chroma)?;
    if slice_type == SliceType::B {
        table.l1 = read_pred_weights(reader, num_ref_l1_minus1, chroma)?;
    }
    Ok(table)
}

fn read_pred_weights<R: ReadBits + ?Sized>(
    reader: &mut R,
    num_ref_minus1: u32,
    chroma: bool,
) -> Result<Vec<PredWeight>> {
    let mut weights = Vec::new();
    for _ in 0..=num_ref_minus1 {
        let luma = if reader.read_flag()? {
            Some((reader.read_se()?, reader.read_se()?))
        } else {
            None
        };
        let chroma = if chroma && reader.read_flag()? {
            Some([
                (reader.read_se()?, reader.read_se()?),
                (reader.read_se()?, reader.read_se()?),
            ])
        } else {
            None
        };
        weights.push(PredWeight { luma, chroma });
    }
    Ok(weights)
}

fn read_dec_ref_pic_marking<R: ReadBits + ?Sized>(
    reader: &mut R,
    idr: bool,
) -> Result<DecRefPicMarking> {
    if idr {
        return Ok(DecRefPicMarking::Idr {
            no_output_of_prior_pics_flag: reader.read_flag()?,
            long_term_reference_flag: reader.read_flag()?,
        });
    }
    if !reader.read_flag()? {
        return Ok(DecRefPicMarking::SlidingWindow);
    }

    let mut ops = Vec::new();
    loop {
        let op = match reader.read_ue()? {
            0 => break,
            1 => Mmco::ShortTermUnused {
                difference_of_pic_nums_minus1: reader.read_ue()?,
            },
            2 => Mmco::LongTermUnused {
                long_term_pic_num: reader.read_ue()?,
            },
            3 => Mmco::ShortTermToLongTerm {
                difference_of_pic_nums_minus1: reader.read_ue()?,
                long_term_frame_idx: reader.read_ue()?,
            },
            4 => Mmco::MaxLongTermFrameIdx {
                max_long_term_frame_idx_plus1: reader.read_ue()?,
            },
            5 => Mmco::ClearAll,
            6 => Mmco::CurrentToLongTerm {
                long_term_frame_idx: reader.read_ue()?,
            },
            other => {
                return Err(Error::format(
                    STRUCTURE,
                    format!("memory_management_control_operation {other} out of range"),
                ))
            }
        };
        ops.push(op);
    }
    Ok(DecRefPicMarking::Adaptive(ops))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_type_from_value() {
        assert_eq!(SliceType::from_value(0), Some(SliceType::P));
        assert_eq!(SliceType::from_value(7), Some(SliceType::I));
        assert_eq!(SliceType::from_value(9), Some(SliceType::Si));
        assert_eq!(SliceType::from_value(10), None);
        assert!(SliceType::I.is_intra());
        assert!(SliceType::B.is_bidirectional());
        assert!(!SliceType::Si.uses_list0());
    }

    #[test]
    fn test_slice_type_of() {
        // IDR, first_mb 0, slice_type 7
        assert_eq!(slice_type_of(&[0x25, 0x88, 0x80]).unwrap(), SliceType::I);
        // non-IDR, first_mb 0, slice_type 5
        assert_eq!(slice_type_of(&[0x41, 0x9A]).unwrap(), SliceType::P);
        assert!(slice_type_of(&[0x67, 0x88]).is_err());
        assert!(slice_type_of(&[0x25]).unwrap_err().is_truncation());
    }

    #[test]
    fn test_extension_slices_unsupported() {
        let err = SliceHeader::parse(&[0x74, 0x80], &SpsMap::new(), &PpsMap::new()).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_missing_pps() {
        let err =
            SliceHeader::parse(&[0x25, 0x88, 0x84], &SpsMap::new(), &PpsMap::new()).unwrap_err();
        assert_eq!(err, Error::missing("slice header", "PPS", 0));
    }

    #[test]
    fn test_change_cycle_bits() {
        let mut sps =
            SequenceParameterSet::parse(&[0x67, 0x42, 0x00, 0x1E, 0xDA, 0x05, 0x82, 0x59])
                .unwrap();
        // 22x18 = 396 map units
        assert_eq!(sps.pic_size_in_map_units(), 396);
        assert_eq!(slice_group_change_cycle_bits(&sps, 1), 9);
        assert_eq!(slice_group_change_cycle_bits(&sps, 396), 1);
        assert_eq!(slice_group_change_cycle_bits(&sps, 100), 3);
        sps.pic_width_in_mbs_minus1 = 0;
        sps.pic_height_in_map_units_minus1 = 0;
        assert_eq!(slice_group_change_cycle_bits(&sps, 1), 1);
    }
}
