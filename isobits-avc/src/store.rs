//! Parameter-set store keyed by ID.

use isobits_core::{Error, Result};

use crate::nal::{nalu_type, NalUnitType};
use crate::pps::PictureParameterSet;
use crate::slice::SliceHeader;
use crate::sps::SequenceParameterSet;
use crate::{PpsMap, SpsMap};

/// Limits on the number of distinct parameter sets a store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum distinct SPS IDs.
    pub max_sps: usize,
    /// Maximum distinct PPS IDs.
    pub max_pps: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sps: 32,
            max_pps: 256,
        }
    }
}

/// SPS and PPS seen so far in a stream, latest version per ID.
#[derive(Debug, Clone, Default)]
pub struct ParameterSets {
    config: StoreConfig,
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

    /// Parse and store an SPS, replacing any SPS with the same ID.
    pub fn add_sps(&mut self, nalu: &[u8]) -> Result<u32> {
        let sps = SequenceParameterSet::parse(nalu).map_err(|e| {
            tracing::warn!(error = %e, "Rejected SPS");
            e
        })?;
        let sps_id = sps.sps_id;
        // Enforce SPS count limit to prevent DoS via parameter set flooding
        if !self.sps_map.contains_key(&sps_id) && self.sps_map.len() >= self.config.max_sps {
            tracing::warn!(sps_id, limit = self.config.max_sps, "SPS count limit exceeded");
            return Err(Error::ResourceExhausted("SPS count limit exceeded".into()));
        }
        tracing::debug!(
            sps_id,
            profile_idc = sps.profile_idc,
            level_idc = sps.level_idc,
            width = sps.width(),
            height = sps.height(),
            "Parsed SPS"
        );
        self.sps_map.insert(sps_id, sps);
        self.active_sps = Some(sps_id);
        Ok(sps_id)
    }

    /// Parse and store a PPS against the SPS entries seen so far.
    pub fn add_pps(&mut self, nalu: &[u8]) -> Result<u32> {
        let pps = PictureParameterSet::parse(nalu, &self.sps_map).map_err(|e| {
            tracing::warn!(error = %e, "Rejected PPS");
            e
        })?;
        let pps_id = pps.pps_id;
        // Enforce PPS count limit to prevent DoS via parameter set flooding
        if !self.pps_map.contains_key(&pps_id) && self.pps_map.len() >= self.config.max_pps {
            tracing::warn!(pps_id, limit = self.config.max_pps, "PPS count limit exceeded");
            return Err(Error::ResourceExhausted("PPS count limit exceeded".into()));
        }
        tracing::debug!(pps_id, sps_id = pps.sps_id, "Parsed PPS");
        self.pps_map.insert(pps_id, pps);
        self.active_pps = Some(pps_id);
        Ok(pps_id)
    }

    /// Store the NAL unit if it is an SPS or PPS; other types are ignored.
    ///
    /// Returns the NAL unit type.
    pub fn add_nalu(&mut self, nalu: &[u8]) -> Result<NalUnitType> {
        let nal_type = nalu_type(nalu)
            .ok_or_else(|| Error::format("NAL unit header", "empty NAL unit"))?;
        match nal_type {
            NalUnitType::Sps => {
                self.add_sps(nalu)?;
            }
            NalUnitType::Pps => {
                self.add_pps(nalu)?;
            }
            _ => {}
        }
        Ok(nal_type)
    }

    /// Parse a slice header against the stored parameter sets.
    pub fn parse_slice_header(&self, nalu: &[u8]) -> Result<SliceHeader> {
        SliceHeader::parse(nalu, &self.sps_map, &self.pps_map)
    }

    /// Get an SPS by ID.
    pub fn sps(&self, id: u32) -> Option<&SequenceParameterSet> {
        self.sps_map.get(&id)
    }

    /// Get a PPS by ID.
    pub fn pps(&self, id: u32) -> Option<&PictureParameterSet> {
        self.pps_map.get(&id)
    }

    /// All stored SPS entries.
    pub fn sps_map(&self) -> &SpsMap {
        &self.sps_map
    }

    /// All stored PPS entries.
    pub fn pps_map(&self) -> &PpsMap {
        &self.pps_map
    }

    /// The most recently stored SPS.
    pub fn active_sps(&self) -> Option<&SequenceParameterSet> {
        self.active_sps.and_then(|id| self.sps_map.get(&id))
    }

    /// The most recently stored PPS.
    pub fn active_pps(&self) -> Option<&PictureParameterSet> {
        self.active_pps.and_then(|id| self.pps_map.get(&id))
    }

    /// Forget every parameter set.
    pub fn clear(&mut self) {
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

    fn minimal_sps(sps_id: u32) -> Vec<u8> {
        let mut w = EbspWriter::new();
        w.write_bits(0x67, 8).unwrap();
        w.write_bits(66, 8).unwrap();
        w.write_bits(0, 8).unwrap();
        w.write_bits(30, 8).unwrap();
        w.write_ue(sps_id).unwrap();
        w.write_ue(0).unwrap(); // log2_max_frame_num_minus4
        w.write_ue(2).unwrap(); // pic_order_cnt_type
        w.write_ue(1).unwrap();
        w.write_flag(false).unwrap();
        w.write_ue(10).unwrap();
        w.write_ue(8).unwrap();
        w.write_flag(true).unwrap();
        w.write_flag(true).unwrap();
        w.write_flag(false).unwrap();
        w.write_flag(false).unwrap();
        w.write_rbsp_trailing_bits().unwrap();
        w.finish()
    }

    #[test]
    fn test_store_replaces_same_id() {
        let mut store = ParameterSets::new();
        assert_eq!(store.add_sps(&minimal_sps(1)).unwrap(), 1);
        assert_eq!(store.add_sps(&minimal_sps(1)).unwrap(), 1);
        assert_eq!(store.sps_map().len(), 1);
        assert_eq!(store.active_sps().map(|s| s.width()), Some(176));
    }

    #[test]
    fn test_store_limit() {
        let mut store = ParameterSets::with_config(StoreConfig {
            max_sps: 2,
            max_pps: 2,
        });
        store.add_sps(&minimal_sps(0)).unwrap();
        store.add_sps(&minimal_sps(1)).unwrap();
        let err = store.add_sps(&minimal_sps(2)).unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted(_)));
        // Replacing an existing ID is still allowed.
        store.add_sps(&minimal_sps(0)).unwrap();
    }

    #[test]
    fn test_add_nalu_routes_by_type() {
        let mut store = ParameterSets::new();
        assert_eq!(store.add_nalu(&minimal_sps(4)).unwrap(), NalUnitType::Sps);
        assert_eq!(store.add_nalu(&[0x09, 0xF0]).unwrap(), NalUnitType::Aud);
        assert!(store.sps(4).is_some());
        assert!(store.add_nalu(&[]).is_err());

        store.clear();
        assert!(store.sps(4).is_none());
        assert!(store.active_sps().is_none());
    }
}
