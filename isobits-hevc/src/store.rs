//! Parameter-set store keyed by ID.

use std::collections::HashMap;

use isobits_core::{Error, ParseError, ParseResult, Result};

use crate::nal::{nalu_type, NalUnitType};
use crate::pps::Pps;
use crate::slice::SliceSegmentHeader;
use crate::sps::Sps;
use crate::vps::Vps;
use crate::{PpsMap, SpsMap, VpsMap};

/// Limits on the number of distinct parameter sets a store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum distinct VPS IDs.
    pub max_vps: usize,
    /// Maximum distinct SPS IDs.
    pub max_sps: usize,
    /// Maximum distinct PPS IDs.
    pub max_pps: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_vps: 16,
            max_sps: 16,
            max_pps: 64,
        }
    }
}

/// Keep the value of an `Incomplete` parse, fail on anything else.
fn accept_partial<T>(result: ParseResult<T>, kind: &'static str) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(ParseError::Incomplete { partial, error }) => {
            tracing::warn!(error = %error, "Storing partially parsed {kind}");
            Ok(*partial)
        }
        Err(ParseError::Failed(e)) => {
            tracing::warn!(error = %e, "Rejected {kind}");
            Err(e)
        }
    }
}

fn check_limit<T>(map: &HashMap<u32, T>, id: u32, limit: usize, kind: &str) -> Result<()> {
    if !map.contains_key(&id) && map.len() >= limit {
        tracing::warn!(id, limit, "{kind} count limit exceeded");
        return Err(Error::ResourceExhausted(format!("{kind} count limit exceeded")));
    }
    Ok(())
}

/// VPS, SPS and PPS seen so far in a stream, latest version per ID.
///
/// Parameter sets whose extensions are not decoded are kept with the
/// fields read before the extension. Slice headers that reference such a
/// set fail with [`Error::Unsupported`] when their grammar depends on the
/// missing data.
#[derive(Debug, Clone, Default)]
pub struct ParameterSets {
    config: StoreConfig,
    vps_map: VpsMap,
    sps_map: SpsMap,
    pps_map: PpsMap,
    active_sps: Option<u32>,
    active_pps: Option<u32>,
}

impl ParameterSets {
    /// Create an empty store with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given limits.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Parse and store a VPS, replacing any VPS with the same ID.
    pub fn add_vps(&mut self, nalu: &[u8]) -> Result<u32> {
        let vps = Vps::parse(nalu).map_err(|e| {
            tracing::warn!(error = %e, "Rejected VPS");
            e
        })?;
        let vps_id = u32::from(vps.vps_video_parameter_set_id);
        check_limit(&self.vps_map, vps_id, self.config.max_vps, "VPS")?;
        tracing::debug!(vps_id, max_sub_layers = vps.vps_max_sub_layers_minus1 + 1, "Parsed VPS");
        self.vps_map.insert(vps_id, vps);
        Ok(vps_id)
    }

    /// Parse and store an SPS, replacing any SPS with the same ID.
    pub fn add_sps(&mut self, nalu: &[u8]) -> Result<u32> {
        let sps = accept_partial(Sps::parse(nalu), "SPS")?;
        let sps_id = sps.sps_seq_parameter_set_id;
        check_limit(&self.sps_map, sps_id, self.config.max_sps, "SPS")?;
        tracing::debug!(
            sps_id,
            profile_idc = sps.profile_tier_level.general_profile.profile_idc,
            level_idc = sps.profile_tier_level.general_level_idc,
            width = sps.width(),
            height = sps.height(),
            "Parsed SPS"
        );
        self.sps_map.insert(sps_id, sps);
        self.active_sps = Some(sps_id);
        Ok(sps_id)
    }

    /// Parse and store a PPS, replacing any PPS with the same ID.
    pub fn add_pps(&mut self, nalu: &[u8]) -> Result<u32> {
        let pps = accept_partial(Pps::parse(nalu), "PPS")?;
        let pps_id = pps.pps_pic_parameter_set_id;
        check_limit(&self.pps_map, pps_id, self.config.max_pps, "PPS")?;
        tracing::debug!(pps_id, sps_id = pps.pps_seq_parameter_set_id, "Parsed PPS");
        self.pps_map.insert(pps_id, pps);
        self.active_pps = Some(pps_id);
        Ok(pps_id)
    }

    /// Store the NAL unit if it is a VPS, SPS or PPS; other types are
    /// ignored.
    ///
    /// Returns the NAL unit type.
    pub fn add_nalu(&mut self, nalu: &[u8]) -> Result<NalUnitType> {
        let nal_type = nalu_type(nalu)
            .ok_or_else(|| Error::format("NAL unit header", "empty NAL unit"))?;
        match nal_type {
            NalUnitType::VpsNut => {
                self.add_vps(nalu)?;
            }
            NalUnitType::SpsNut => {
                self.add_sps(nalu)?;
            }
            NalUnitType::PpsNut => {
                self.add_pps(nalu)?;
            }
            _ => {}
        }
        Ok(nal_type)
    }

    /// Parse a slice segment header against the stored parameter sets.
    pub fn parse_slice_header(&self, nalu: &[u8]) -> Result<SliceSegmentHeader> {
        SliceSegmentHeader::parse(nalu, &self.sps_map, &self.pps_map)
    }

    /// Get a VPS by ID.
    pub fn vps(&self, id: u32) -> Option<&Vps> {
        self.vps_map.get(&id)
    }

    /// Get an SPS by ID.
    pub fn sps(&self, id: u32) -> Option<&Sps> {
        self.sps_map.get(&id)
    }

    /// Get a PPS by ID.
    pub fn pps(&self, id: u32) -> Option<&Pps> {
        self.pps_map.get(&id)
    }

    pub fn vps_map(&self) -> &VpsMap {
        &self.vps_map
    }

    pub fn sps_map(&self) -> &SpsMap {
        &self.sps_map
    }

    pub fn pps_map(&self) -> &PpsMap {
        &self.pps_map
    }

    /// The most recently stored SPS.
    pub fn active_sps(&self) -> Option<&Sps> {
        self.active_sps.and_then(|id| self.sps_map.get(&id))
    }

    /// The most recently stored PPS.
    pub fn active_pps(&self) -> Option<&Pps> {
        self.active_pps.and_then(|id| self.pps_map.get(&id))
    }

    /// Forget every parameter set.
    pub fn clear(&mut self) {
        self.vps_map.clear();
        self.sps_map.clear();
        self.pps_map.clear();
        self.active_sps = None;
        self.active_pps = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobits_core::{EbspWriter, ExpGolombWrite, WriteBits};

    const SPS_1080P: &str =
        "420101016000000300900000030000030078a003c08010e596566924cae010000003001000000301e080";

    /// A PPS with the given IDs and every optional tool off.
    fn minimal_pps(pps_id: u32, extension: bool) -> Vec<u8> {
        let mut w = EbspWriter::new();
        w.write_bits(0x4401, 16).unwrap();
        w.write_ue(pps_id).unwrap();
        w.write_ue(0).unwrap();
        w.write_bits(0, 7).unwrap();
        w.write_ue(0).unwrap();
        w.write_ue(0).unwrap();
        w.write_se(0).unwrap();
        w.write_bits(0, 3).unwrap();
        w.write_se(0).unwrap();
        w.write_se(0).unwrap();
        w.write_bits(0, 8).unwrap(); // through loop filter and deblocking control
        w.write_flag(false).unwrap(); // pps_scaling_list_data_present_flag
        w.write_flag(false).unwrap();
        w.write_ue(0).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(extension).unwrap();
        if extension {
            w.write_bits(0b0001_0000, 8).unwrap(); // scc
        }
        w.write_rbsp_trailing_bits().unwrap();
        w.finish()
    }

    #[test]
    fn test_store_replaces_same_id() {
        let mut store = ParameterSets::new();
        let sps = hex::decode(SPS_1080P).unwrap();
        assert_eq!(store.add_sps(&sps).unwrap(), 0);
        assert_eq!(store.add_sps(&sps).unwrap(), 0);
        assert_eq!(store.sps_map().len(), 1);
        assert_eq!(store.active_sps().map(|s| s.width()), Some(1920));
    }

    #[test]
    fn test_store_limit() {
        let mut store = ParameterSets::with_config(StoreConfig {
            max_vps: 1,
            max_sps: 1,
            max_pps: 2,
        });
        store.add_pps(&minimal_pps(0, false)).unwrap();
        store.add_pps(&minimal_pps(1, false)).unwrap();
        let err = store.add_pps(&minimal_pps(2, false)).unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted(_)));
        // Replacing an existing ID is still allowed.
        store.add_pps(&minimal_pps(1, false)).unwrap();
    }

    #[test]
    fn test_partial_pps_is_kept() {
        let mut store = ParameterSets::new();
        assert_eq!(store.add_pps(&minimal_pps(7, true)).unwrap(), 7);
        assert!(store.pps(7).unwrap().extensions.pps_scc_extension_flag);
        assert_eq!(store.active_pps().map(|p| p.pps_pic_parameter_set_id), Some(7));
    }

    #[test]
    fn test_add_nalu_routes_by_type() {
        let mut store = ParameterSets::new();
        let sps = hex::decode(SPS_1080P).unwrap();
        assert_eq!(store.add_nalu(&sps).unwrap(), NalUnitType::SpsNut);
        assert_eq!(store.add_nalu(&[0x46, 0x01, 0x10]).unwrap(), NalUnitType::AudNut);
        assert!(store.sps(0).is_some());
        assert!(store.add_nalu(&[]).is_err());
        assert!(store.add_nalu(&sps[..10]).is_err());

        store.clear();
        assert!(store.sps(0).is_none());
        assert!(store.active_sps().is_none());
    }
}
