//! NAL (Network Abstraction Layer) unit headers and sample helpers.
//!
//! An AVC NAL unit starts with one header byte: `forbidden_zero_bit`,
//! two bits of `nal_ref_idc` and five bits of `nal_unit_type`.

use isobits_core::{BitResult, Error, ReadBits, Result};

/// NAL unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NalUnitType {
    /// Unspecified.
    Unspecified,
    /// Non-IDR slice.
    Slice,
    /// Slice data partition A.
    SliceDataA,
    /// Slice data partition B.
    SliceDataB,
    /// Slice data partition C.
    SliceDataC,
    /// IDR slice.
    IdrSlice,
    /// Supplemental enhancement information (SEI).
    Sei,
    /// Sequence parameter set (SPS).
    Sps,
    /// Picture parameter set (PPS).
    Pps,
    /// Access unit delimiter.
    Aud,
    /// End of sequence.
    EndOfSequence,
    /// End of stream.
    EndOfStream,
    /// Filler data.
    Filler,
    /// SPS extension.
    SpsExt,
    /// Prefix NAL unit.
    Prefix,
    /// Subset SPS.
    SubsetSps,
    /// Depth parameter set.
    Dps,
    /// Coded slice of an auxiliary coded picture.
    SliceAux,
    /// Coded slice extension (SVC/MVC).
    SliceExt,
    /// Coded slice extension for depth view.
    SliceExtDepth,
    /// Reserved or unspecified type.
    Unknown(u8),
}

impl NalUnitType {
    /// Create from raw NAL unit type value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unspecified,
            1 => Self::Slice,
            2 => Self::SliceDataA,
            3 => Self::SliceDataB,
            4 => Self::SliceDataC,
            5 => Self::IdrSlice,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::Filler,
            13 => Self::SpsExt,
            14 => Self::Prefix,
            15 => Self::SubsetSps,
            16 => Self::Dps,
            19 => Self::SliceAux,
            20 => Self::SliceExt,
            21 => Self::SliceExtDepth,
            n => Self::Unknown(n),
        }
    }

    /// Get the raw value.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::Slice => 1,
            Self::SliceDataA => 2,
            Self::SliceDataB => 3,
            Self::SliceDataC => 4,
            Self::IdrSlice => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::Filler => 12,
            Self::SpsExt => 13,
            Self::Prefix => 14,
            Self::SubsetSps => 15,
            Self::Dps => 16,
            Self::SliceAux => 19,
            Self::SliceExt => 20,
            Self::SliceExtDepth => 21,
            Self::Unknown(n) => n,
        }
    }

    /// Check if this is a VCL (Video Coding Layer) NAL unit.
    pub fn is_vcl(self) -> bool {
        matches!(
            self,
            Self::Slice
                | Self::SliceDataA
                | Self::SliceDataB
                | Self::SliceDataC
                | Self::IdrSlice
                | Self::SliceAux
                | Self::SliceExt
                | Self::SliceExtDepth
        )
    }

    /// Check if this NAL unit carries a `slice_header()`.
    pub fn has_slice_header(self) -> bool {
        matches!(self, Self::Slice | Self::SliceDataA | Self::IdrSlice)
    }

    /// Check if this is an IDR slice.
    pub fn is_idr(self) -> bool {
        self == Self::IdrSlice
    }

    /// Check if this is an SPS or PPS.
    pub fn is_parameter_set(self) -> bool {
        matches!(self, Self::Sps | Self::Pps)
    }
}

impl std::fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(n) => write!(f, "Unknown({n})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// The one-byte NAL unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NalHeader {
    /// NAL reference IDC (0-3).
    pub nal_ref_idc: u8,
    /// NAL unit type.
    pub nal_unit_type: NalUnitType,
}

impl NalHeader {
    /// Read the header from the start of a NAL unit.
    ///
    /// `forbidden_zero_bit` is read but not enforced.
    pub fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> BitResult<Self> {
        let _forbidden_zero_bit = reader.read_bits(1)?;
        let nal_ref_idc = reader.read_bits(2)? as u8;
        let nal_unit_type = NalUnitType::from_u8(reader.read_bits(5)? as u8);
        Ok(Self {
            nal_ref_idc,
            nal_unit_type,
        })
    }

    /// Decode the header byte of `nalu`.
    pub fn from_nalu(nalu: &[u8]) -> Result<Self> {
        match nalu.first() {
            Some(&b) => Ok(Self::from_byte(b)),
            None => Err(Error::format("NAL unit header", "empty NAL unit")),
        }
    }

    /// Decode a header byte.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            nal_ref_idc: (byte >> 5) & 0x03,
            nal_unit_type: NalUnitType::from_u8(byte & 0x1F),
        }
    }

    /// Encode as a header byte.
    pub fn to_byte(self) -> u8 {
        (self.nal_ref_idc & 0x03) << 5 | (self.nal_unit_type.to_u8() & 0x1F)
    }
}

/// Type of a NAL unit; `None` for an empty slice.
pub fn nalu_type(nalu: &[u8]) -> Option<NalUnitType> {
    nalu.first().map(|&b| NalUnitType::from_u8(b & 0x1F))
}

/// Types of the NAL units in a length-prefixed sample, in order.
pub fn nalu_types(sample: &[u8], length_size: usize) -> Result<Vec<NalUnitType>> {
    let units = isobits_core::nalu::split_length_prefixed(sample, length_size)?;
    Ok(units.into_iter().filter_map(nalu_type).collect())
}

/// Check whether a length-prefixed sample holds a NAL unit of type `wanted`.
pub fn contains_nalu_type(sample: &[u8], length_size: usize, wanted: NalUnitType) -> Result<bool> {
    Ok(nalu_types(sample, length_size)?.contains(&wanted))
}

/// Check whether a length-prefixed sample holds an IDR slice.
pub fn is_idr_sample(sample: &[u8], length_size: usize) -> Result<bool> {
    contains_nalu_type(sample, length_size, NalUnitType::IdrSlice)
}

/// SPS and PPS NAL units found in a length-prefixed sample.
pub fn parameter_sets_in_sample(
    sample: &[u8],
    length_size: usize,
) -> Result<(Vec<&[u8]>, Vec<&[u8]>)> {
    let mut sps = Vec::new();
    let mut pps = Vec::new();
    for unit in isobits_core::nalu::split_length_prefixed(sample, length_size)? {
        match nalu_type(unit) {
            Some(NalUnitType::Sps) => sps.push(unit),
            Some(NalUnitType::Pps) => pps.push(unit),
            _ => {}
        }
    }
    Ok((sps, pps))
}
