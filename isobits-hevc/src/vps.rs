//! Video Parameter Set (VPS) parsing.

use isobits_core::{EbspReader, Error, ExpGolombRead, ReadBits, Result, ResultExt};

use crate::nal::{NalUnitHeader, NalUnitType};
use crate::ptl::ProfileTierLevel;
use crate::vui::{HrdParameters, TimingInfo};

const STRUCTURE: &str = "VPS";

/// Largest `vps_num_layer_sets_minus1`.
const MAX_LAYER_SETS_MINUS1: u32 = 1023;

/// DPB sizing for one temporal sub-layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubLayerOrdering {
    pub max_dec_pic_buffering_minus1: u32,
    pub max_num_reorder_pics: u32,
    pub max_latency_increase_plus1: u32,
}

/// Read the sub-layer ordering loop shared by the VPS and SPS.
///
/// Returns one entry per sub-layer. When only the highest sub-layer is
/// coded, the lower ones take its values.
pub(crate) fn read_sub_layer_ordering<R: ReadBits + ?Sized>(
    reader: &mut R,
    info_present_flag: bool,
    max_sub_layers_minus1: u8,
) -> Result<Vec<SubLayerOrdering>> {
    let count = usize::from(max_sub_layers_minus1) + 1;
    let first = if info_present_flag { 0 } else { count - 1 };
    let mut ordering = vec![SubLayerOrdering::default(); count];
    for entry in &mut ordering[first..] {
        *entry = SubLayerOrdering {
            max_dec_pic_buffering_minus1: reader.read_ue()?,
            max_num_reorder_pics: reader.read_ue()?,
            max_latency_increase_plus1: reader.read_ue()?,
        };
    }
    let top = ordering[count - 1];
    for entry in &mut ordering[..first] {
        *entry = top;
    }
    Ok(ordering)
}

/// One `hrd_parameters()` entry of the VPS.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VpsHrd {
    /// Layer set the parameters apply to.
    pub hrd_layer_set_idx: u32,
    /// Whether the common HRD information was coded.
    pub cprms_present_flag: bool,
    pub hrd: HrdParameters,
}

/// Video Parameter Set (VPS).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vps {
    /// VPS ID (0-15).
    pub vps_video_parameter_set_id: u8,
    pub vps_base_layer_internal_flag: bool,
    pub vps_base_layer_available_flag: bool,
    pub vps_max_layers_minus1: u8,
    pub vps_max_sub_layers_minus1: u8,
    pub vps_temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    pub vps_sub_layer_ordering_info_present_flag: bool,
    /// One entry per sub-layer, inferred entries filled in.
    pub sub_layer_ordering: Vec<SubLayerOrdering>,
    pub vps_max_layer_id: u8,
    pub vps_num_layer_sets_minus1: u32,
    /// `layer_id_included_flag[i][j]` as bit `j`, for layer sets 1 and up.
    pub layer_id_included: Vec<u64>,
    pub timing_info: Option<TimingInfo>,
    pub hrd: Vec<VpsHrd>,
    /// VPS extension data follows; it is not decoded.
    pub vps_extension_flag: bool,
}

impl Vps {
    /// Parse a VPS NAL unit.
    ///
    /// `vps_extension()` is left unread; `rbsp_trailing_bits` are checked
    /// only when no extension is signalled.
    pub fn parse(nalu: &[u8]) -> Result<Self> {
        let mut reader = EbspReader::new(nalu);
        let header = NalUnitHeader::parse(&mut reader)?;
        if header.nal_unit_type != NalUnitType::VpsNut {
            return Err(Error::wrong_nal_type(STRUCTURE, header.nal_unit_type.to_u8()));
        }
        let vps = Self::parse_from_reader(&mut reader).within(STRUCTURE, reader.bit_position())?;
        if !vps.vps_extension_flag {
            reader
                .read_rbsp_trailing_bits()
                .within(STRUCTURE, reader.bit_position())?;
        }
        Ok(vps)
    }

    /// Parse the VPS RBSP from a reader positioned after the NAL header.
    pub fn parse_from_reader(reader: &mut EbspReader<'_>) -> Result<Self> {
        let vps_video_parameter_set_id = reader.read_bits(4)? as u8;
        let vps_base_layer_internal_flag = reader.read_flag()?;
        let vps_base_layer_available_flag = reader.read_flag()?;
        let vps_max_layers_minus1 = reader.read_bits(6)? as u8;
        let vps_max_sub_layers_minus1 = reader.read_bits(3)? as u8;
        let vps_temporal_id_nesting_flag = reader.read_flag()?;
        if reader.read_u16()? != 0xFFFF {
            return Err(Error::format(STRUCTURE, "vps_reserved_0xffff_16bits mismatch"));
        }

        let profile_tier_level = ProfileTierLevel::parse(reader, true, vps_max_sub_layers_minus1)?;

        let vps_sub_layer_ordering_info_present_flag = reader.read_flag()?;
        let sub_layer_ordering = read_sub_layer_ordering(
            reader,
            vps_sub_layer_ordering_info_present_flag,
            vps_max_sub_layers_minus1,
        )?;

        let vps_max_layer_id = reader.read_bits(6)? as u8;
        let vps_num_layer_sets_minus1 = reader.read_ue()?;
        if vps_num_layer_sets_minus1 > MAX_LAYER_SETS_MINUS1 {
            return Err(Error::format(
                STRUCTURE,
                format!("vps_num_layer_sets_minus1 {vps_num_layer_sets_minus1} out of range"),
            ));
        }
        let mut layer_id_included = Vec::with_capacity(reader.capacity_for(
            u64::from(vps_num_layer_sets_minus1),
            u64::from(vps_max_layer_id) + 1,
        ));
        for _ in 1..=vps_num_layer_sets_minus1 {
            let mut mask = 0u64;
            for j in 0..=vps_max_layer_id {
                if reader.read_flag()? {
                    mask |= 1 << j;
                }
            }
            layer_id_included.push(mask);
        }

        let mut timing_info = None;
        let mut hrd = Vec::new();
        if reader.read_flag()? {
            timing_info = Some(TimingInfo::parse(reader)?);
            let vps_num_hrd_parameters = reader.read_ue()?;
            if vps_num_hrd_parameters > vps_num_layer_sets_minus1 + 1 {
                return Err(Error::format(
                    STRUCTURE,
                    format!("vps_num_hrd_parameters {vps_num_hrd_parameters} exceeds layer sets"),
                ));
            }
            for i in 0..vps_num_hrd_parameters {
                let hrd_layer_set_idx = reader.read_ue()?;
                let cprms_present_flag = i == 0 || reader.read_flag()?;
                hrd.push(VpsHrd {
                    hrd_layer_set_idx,
                    cprms_present_flag,
                    hrd: HrdParameters::parse(
                        reader,
                        cprms_present_flag,
                        vps_max_sub_layers_minus1,
                    )?,
                });
            }
        }

        let vps_extension_flag = reader.read_flag()?;

        Ok(Self {
            vps_video_parameter_set_id,
            vps_base_layer_internal_flag,
            vps_base_layer_available_flag,
            vps_max_layers_minus1,
            vps_max_sub_layers_minus1,
            vps_temporal_id_nesting_flag,
            profile_tier_level,
            vps_sub_layer_ordering_info_present_flag,
            sub_layer_ordering,
            vps_max_layer_id,
            vps_num_layer_sets_minus1,
            layer_id_included,
            timing_info,
            hrd,
            vps_extension_flag,
        })
    }

    /// Pictures per second as `(time_scale, num_units_in_tick)`.
    pub fn frame_rate(&self) -> Option<(u32, u32)> {
        self.timing_info.as_ref().and_then(TimingInfo::frame_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobits_core::{EbspWriter, ExpGolombWrite, WriteBits};

    /// VPS from a 1080p Main profile stream (x265).
    const VPS_1080P: [u8; 24] = [
        0x40, 0x01, 0x0C, 0x01, 0xFF, 0xFF, 0x01, 0x60, 0x00, 0x00, 0x03, 0x00, 0x90, 0x00, 0x00,
        0x03, 0x00, 0x00, 0x03, 0x00, 0x78, 0x95, 0x98, 0x09,
    ];

    #[test]
    fn test_parse_vps() {
        let vps = Vps::parse(&VPS_1080P).unwrap();
        assert_eq!(vps.vps_video_parameter_set_id, 0);
        assert!(vps.vps_base_layer_internal_flag);
        assert!(vps.vps_base_layer_available_flag);
        assert_eq!(vps.vps_max_sub_layers_minus1, 0);
        assert!(vps.vps_temporal_id_nesting_flag);
        assert_eq!(vps.profile_tier_level.general_profile.profile_idc, 1);
        assert_eq!(vps.profile_tier_level.general_level_idc, 120);
        assert_eq!(
            vps.sub_layer_ordering,
            vec![SubLayerOrdering {
                max_dec_pic_buffering_minus1: 4,
                max_num_reorder_pics: 2,
                max_latency_increase_plus1: 5,
            }]
        );
        assert_eq!(vps.vps_num_layer_sets_minus1, 0);
        assert!(vps.timing_info.is_none());
        assert!(!vps.vps_extension_flag);
    }

    #[test]
    fn test_wrong_nal_type() {
        let mut data = VPS_1080P;
        data[0] = 0x42;
        let err = Vps::parse(&data).unwrap_err();
        assert_eq!(err, Error::wrong_nal_type(STRUCTURE, 33));
    }

    #[test]
    fn test_truncated() {
        let err = Vps::parse(&VPS_1080P[..12]).unwrap_err();
        assert!(err.is_truncation());
    }

    fn vps_with_timing(num_sub_layers_minus1: u8) -> Vec<u8> {
        let mut w = EbspWriter::new();
        w.write_bits(0x4001, 16).unwrap();
        w.write_bits(3, 4).unwrap(); // vps id
        w.write_bits(0b11, 2).unwrap();
        w.write_bits(0, 6).unwrap();
        w.write_bits(u32::from(num_sub_layers_minus1), 3).unwrap();
        w.write_flag(false).unwrap();
        w.write_bits(0xFFFF, 16).unwrap();
        // profile_tier_level
        w.write_bits(1, 8).unwrap(); // space 0, tier 0, idc 1
        w.write_bits(0x6000_0000, 32).unwrap();
        w.write_bits_u64(0, 48).unwrap();
        w.write_bits(93, 8).unwrap();
        for _ in 0..num_sub_layers_minus1 {
            w.write_bits(0, 2).unwrap();
        }
        if num_sub_layers_minus1 > 0 {
            for _ in num_sub_layers_minus1..8 {
                w.write_bits(0, 2).unwrap();
            }
        }
        w.write_flag(false).unwrap(); // only the top sub-layer ordering
        w.write_ue(4).unwrap();
        w.write_ue(2).unwrap();
        w.write_ue(0).unwrap();
        w.write_bits(1, 6).unwrap(); // vps_max_layer_id
        w.write_ue(1).unwrap(); // vps_num_layer_sets_minus1
        w.write_bits(0b10, 2).unwrap(); // layer set 1 includes layer 0
        w.write_flag(true).unwrap(); // vps_timing_info_present_flag
        w.write_bits(1, 32).unwrap();
        w.write_bits(25, 32).unwrap();
        w.write_flag(false).unwrap();
        w.write_ue(1).unwrap(); // vps_num_hrd_parameters
        w.write_ue(0).unwrap(); // hrd_layer_set_idx
        w.write_flag(false).unwrap(); // nal_hrd_parameters_present_flag
        w.write_flag(false).unwrap(); // vcl_hrd_parameters_present_flag
        for _ in 0..=num_sub_layers_minus1 {
            w.write_flag(true).unwrap(); // fixed_pic_rate_general_flag
            w.write_ue(0).unwrap();
            w.write_ue(0).unwrap(); // cpb_cnt_minus1
        }
        w.write_flag(false).unwrap(); // vps_extension_flag
        w.write_rbsp_trailing_bits().unwrap();
        w.finish()
    }

    #[test]
    fn test_timing_hrd_and_inferred_ordering() {
        let vps = Vps::parse(&vps_with_timing(2)).unwrap();
        assert_eq!(vps.vps_video_parameter_set_id, 3);
        assert_eq!(vps.sub_layer_ordering.len(), 3);
        assert!(vps
            .sub_layer_ordering
            .iter()
            .all(|o| o.max_dec_pic_buffering_minus1 == 4 && o.max_num_reorder_pics == 2));
        assert_eq!(vps.layer_id_included, vec![0b01]);
        assert_eq!(vps.frame_rate(), Some((25, 1)));
        assert_eq!(vps.hrd.len(), 1);
        assert!(vps.hrd[0].cprms_present_flag);
        assert_eq!(vps.hrd[0].hrd.sub_layers.len(), 3);
    }
}
