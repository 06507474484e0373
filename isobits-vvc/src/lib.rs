//! VVC (H.266) NAL unit and sequence parameter set parsing.
//!
//! This crate provides:
//! - NAL unit header and type classification
//! - Profile, tier and level including general constraints info
//! - The leading fields of the SPS, through the sample bit depth

pub mod nal;
pub mod ptl;
pub mod sps;

pub use nal::{nalu_type, NalUnitHeader, NalUnitType};
pub use ptl::{GeneralConstraintsInfo, ProfileTierLevel, VvcLevel, VvcProfile, VvcTier};
pub use sps::{ConformanceWindow, Sps, STOP_AFTER_BIT_DEPTH, STOP_AT_SUBPIC_INFO};
