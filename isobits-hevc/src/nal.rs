//! HEVC NAL unit types and the two-byte NAL unit header.

use std::fmt;

use isobits_core::{Error, ReadBits, Result, ResultExt, WriteBits};

const STRUCTURE: &str = "NAL unit header";

/// HEVC NAL unit types.
///
/// Reserved and unspecified values keep their raw number so a round trip
/// through [`NalUnitType::from_u8`] and [`NalUnitType::to_u8`] is lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NalUnitType {
    /// Trailing picture, non-reference.
    TrailN,
    /// Trailing picture, reference.
    TrailR,
    /// Temporal sub-layer access, non-reference.
    TsaN,
    /// Temporal sub-layer access, reference.
    TsaR,
    /// Stepwise temporal sub-layer access, non-reference.
    StsaN,
    /// Stepwise temporal sub-layer access, reference.
    StsaR,
    /// Random access decodable leading, non-reference.
    RadlN,
    /// Random access decodable leading, reference.
    RadlR,
    /// Random access skipped leading, non-reference.
    RaslN,
    /// Random access skipped leading, reference.
    RaslR,
    /// Broken link access, may have leading pictures.
    BlaWLp,
    /// Broken link access, RADL pictures only.
    BlaWRadl,
    /// Broken link access, no leading pictures.
    BlaNLp,
    /// Instantaneous decoder refresh, RADL pictures allowed.
    IdrWRadl,
    /// Instantaneous decoder refresh, no leading pictures.
    IdrNLp,
    /// Clean random access.
    CraNut,
    /// Video parameter set.
    VpsNut,
    /// Sequence parameter set.
    SpsNut,
    /// Picture parameter set.
    PpsNut,
    /// Access unit delimiter.
    AudNut,
    /// End of sequence.
    EosNut,
    /// End of bitstream.
    EobNut,
    /// Filler data.
    FdNut,
    /// Prefix SEI.
    PrefixSeiNut,
    /// Suffix SEI.
    SuffixSeiNut,
    /// Reserved (10-15, 22-31 and 41-47).
    Reserved(u8),
    /// Unspecified (48-63).
    Unspecified(u8),
}

impl NalUnitType {
    /// Create from the raw 6-bit value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::TrailN,
            1 => Self::TrailR,
            2 => Self::TsaN,
            3 => Self::TsaR,
            4 => Self::StsaN,
            5 => Self::StsaR,
            6 => Self::RadlN,
            7 => Self::RadlR,
            8 => Self::RaslN,
            9 => Self::RaslR,
            16 => Self::BlaWLp,
            17 => Self::BlaWRadl,
            18 => Self::BlaNLp,
            19 => Self::IdrWRadl,
            20 => Self::IdrNLp,
            21 => Self::CraNut,
            32 => Self::VpsNut,
            33 => Self::SpsNut,
            34 => Self::PpsNut,
            35 => Self::AudNut,
            36 => Self::EosNut,
            37 => Self::EobNut,
            38 => Self::FdNut,
            39 => Self::PrefixSeiNut,
            40 => Self::SuffixSeiNut,
            n if n >= 48 => Self::Unspecified(n),
            n => Self::Reserved(n),
        }
    }

    /// Get the raw value.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::TrailN => 0,
            Self::TrailR => 1,
            Self::TsaN => 2,
            Self::TsaR => 3,
            Self::StsaN => 4,
            Self::StsaR => 5,
            Self::RadlN => 6,
            Self::RadlR => 7,
            Self::RaslN => 8,
            Self::RaslR => 9,
            Self::BlaWLp => 16,
            Self::BlaWRadl => 17,
            Self::BlaNLp => 18,
            Self::IdrWRadl => 19,
            Self::IdrNLp => 20,
            Self::CraNut => 21,
            Self::VpsNut => 32,
            Self::SpsNut => 33,
            Self::PpsNut => 34,
            Self::AudNut => 35,
            Self::EosNut => 36,
            Self::EobNut => 37,
            Self::FdNut => 38,
            Self::PrefixSeiNut => 39,
            Self::SuffixSeiNut => 40,
            Self::Reserved(n) | Self::Unspecified(n) => n,
        }
    }

    /// Check if this is a VCL (Video Coding Layer) NAL unit.
    pub fn is_vcl(self) -> bool {
        self.to_u8() < 32
    }

    /// Check if this is an IRAP picture, reserved IRAP types 22 and 23
    /// included.
    pub fn is_irap(self) -> bool {
        (16..=23).contains(&self.to_u8())
    }

    /// Check if this is an IDR picture.
    pub fn is_idr(self) -> bool {
        matches!(self, Self::IdrWRadl | Self::IdrNLp)
    }

    /// Check if this is a BLA (Broken Link Access) picture.
    pub fn is_bla(self) -> bool {
        matches!(self, Self::BlaWLp | Self::BlaWRadl | Self::BlaNLp)
    }

    /// Check if this is a CRA (Clean Random Access) picture.
    pub fn is_cra(self) -> bool {
        self == Self::CraNut
    }

    /// Check if this is a leading picture.
    pub fn is_leading(self) -> bool {
        matches!(self, Self::RadlN | Self::RadlR | Self::RaslN | Self::RaslR)
    }

    /// Check if this is a trailing picture.
    pub fn is_trailing(self) -> bool {
        matches!(self, Self::TrailN | Self::TrailR)
    }

    /// Check if this is a sub-layer reference picture.
    pub fn is_reference(self) -> bool {
        let raw = self.to_u8();
        // Odd VCL types below 16 are references; every IRAP type is one too.
        raw < 32 && (raw % 2 == 1 || (16..=23).contains(&raw))
    }

    /// Check if this is a VPS, SPS or PPS.
    pub fn is_parameter_set(self) -> bool {
        matches!(self, Self::VpsNut | Self::SpsNut | Self::PpsNut)
    }

    /// Check if a NAL unit of this type carries a `slice_segment_header()`.
    pub fn has_slice_header(self) -> bool {
        matches!(self.to_u8(), 0..=9 | 16..=21)
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrailN => write!(f, "TRAIL_N"),
            Self::TrailR => write!(f, "TRAIL_R"),
            Self::TsaN => write!(f, "TSA_N"),
            Self::TsaR => write!(f, "TSA_R"),
            Self::StsaN => write!(f, "STSA_N"),
            Self::StsaR => write!(f, "STSA_R"),
            Self::RadlN => write!(f, "RADL_N"),
            Self::RadlR => write!(f, "RADL_R"),
            Self::RaslN => write!(f, "RASL_N"),
            Self::RaslR => write!(f, "RASL_R"),
            Self::BlaWLp => write!(f, "BLA_W_LP"),
            Self::BlaWRadl => write!(f, "BLA_W_RADL"),
            Self::BlaNLp => write!(f, "BLA_N_LP"),
            Self::IdrWRadl => write!(f, "IDR_W_RADL"),
            Self::IdrNLp => write!(f, "IDR_N_LP"),
            Self::CraNut => write!(f, "CRA_NUT"),
            Self::VpsNut => write!(f, "VPS_NUT"),
            Self::SpsNut => write!(f, "SPS_NUT"),
            Self::PpsNut => write!(f, "PPS_NUT"),
            Self::AudNut => write!(f, "AUD_NUT"),
            Self::EosNut => write!(f, "EOS_NUT"),
            Self::EobNut => write!(f, "EOB_NUT"),
            Self::FdNut => write!(f, "FD_NUT"),
            Self::PrefixSeiNut => write!(f, "PREFIX_SEI_NUT"),
            Self::SuffixSeiNut => write!(f, "SUFFIX_SEI_NUT"),
            Self::Reserved(v) => write!(f, "RESERVED({v})"),
            Self::Unspecified(v) => write!(f, "UNSPECIFIED({v})"),
        }
    }
}

/// HEVC NAL unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NalUnitHeader {
    /// NAL unit type.
    pub nal_unit_type: NalUnitType,
    /// Layer ID (for scalable/multiview extensions).
    pub nuh_layer_id: u8,
    /// Temporal ID plus 1.
    pub nuh_temporal_id_plus1: u8,
}

impl NalUnitHeader {
    /// Read the header from the start of a NAL unit.
    ///
    /// A set `forbidden_zero_bit` or a zero `nuh_temporal_id_plus1` is a
    /// format error.
    pub fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        let forbidden_zero_bit = reader.read_flag().within(STRUCTURE, 0)?;
        if forbidden_zero_bit {
            return Err(Error::format(STRUCTURE, "forbidden_zero_bit is set"));
        }
        let nal_unit_type = NalUnitType::from_u8(reader.read_bits(6).within(STRUCTURE, 1)? as u8);
        let nuh_layer_id = reader.read_bits(6).within(STRUCTURE, 7)? as u8;
        let nuh_temporal_id_plus1 = reader.read_bits(3).within(STRUCTURE, 13)? as u8;
        if nuh_temporal_id_plus1 == 0 {
            return Err(Error::format(STRUCTURE, "nuh_temporal_id_plus1 is zero"));
        }
        Ok(Self {
            nal_unit_type,
            nuh_layer_id,
            nuh_temporal_id_plus1,
        })
    }

    /// Decode the first two bytes of `nalu`.
    pub fn from_nalu(nalu: &[u8]) -> Result<Self> {
        Self::parse(&mut isobits_core::BitReader::new(nalu))
    }

    /// Write the header.
    pub fn write<W: WriteBits + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_flag(false)?;
        writer.write_bits(u32::from(self.nal_unit_type.to_u8()), 6)?;
        writer.write_bits(u32::from(self.nuh_layer_id), 6)?;
        writer.write_bits(u32::from(self.nuh_temporal_id_plus1), 3)?;
        Ok(())
    }

    /// Get the temporal ID (0-based).
    pub fn temporal_id(&self) -> u8 {
        self.nuh_temporal_id_plus1.saturating_sub(1)
    }
}

/// Type of a NAL unit; `None` for an empty slice.
pub fn nalu_type(nalu: &[u8]) -> Option<NalUnitType> {
    nalu.first().map(|&b| NalUnitType::from_u8((b >> 1) & 0x3F))
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobits_core::BitWriter;

    #[test]
    fn test_nal_unit_type() {
        assert_eq!(NalUnitType::from_u8(32), NalUnitType::VpsNut);
        assert_eq!(NalUnitType::from_u8(33), NalUnitType::SpsNut);
        assert_eq!(NalUnitType::from_u8(34), NalUnitType::PpsNut);
        assert_eq!(NalUnitType::from_u8(19), NalUnitType::IdrWRadl);
        assert_eq!(NalUnitType::from_u8(12), NalUnitType::Reserved(12));
        assert_eq!(NalUnitType::from_u8(50), NalUnitType::Unspecified(50));
        for v in 0..64u8 {
            assert_eq!(NalUnitType::from_u8(v).to_u8(), v);
        }
    }

    #[test]
    fn test_nal_unit_type_classification() {
        assert!(NalUnitType::TrailR.is_vcl());
        assert!(!NalUnitType::VpsNut.is_vcl());
        assert!(NalUnitType::IdrWRadl.is_irap());
        assert!(NalUnitType::CraNut.is_irap());
        assert!(NalUnitType::from_u8(23).is_irap());
        assert!(!NalUnitType::TrailR.is_irap());
        assert!(NalUnitType::IdrNLp.is_idr());
        assert!(NalUnitType::BlaNLp.is_bla());
        assert!(NalUnitType::RaslN.is_leading());
        assert!(NalUnitType::TrailN.is_trailing());
        assert!(NalUnitType::TrailR.is_reference());
        assert!(!NalUnitType::TrailN.is_reference());
        assert!(NalUnitType::IdrNLp.is_reference());
        assert!(NalUnitType::CraNut.has_slice_header());
        assert!(!NalUnitType::from_u8(22).has_slice_header());
    }

    #[test]
    fn test_display() {
        assert_eq!(NalUnitType::IdrWRadl.to_string(), "IDR_W_RADL");
        assert_eq!(NalUnitType::Reserved(41).to_string(), "RESERVED(41)");
    }

    #[test]
    fn test_header_parse() {
        // VPS: 0x40 0x01
        let header = NalUnitHeader::from_nalu(&[0x40, 0x01]).unwrap();
        assert_eq!(header.nal_unit_type, NalUnitType::VpsNut);
        assert_eq!(header.nuh_layer_id, 0);
        assert_eq!(header.temporal_id(), 0);

        // IDR_W_RADL, layer 1, temporal id 2
        let header = NalUnitHeader::from_nalu(&[0x26, 0x0B]).unwrap();
        assert_eq!(header.nal_unit_type, NalUnitType::IdrWRadl);
        assert_eq!(header.nuh_layer_id, 1);
        assert_eq!(header.nuh_temporal_id_plus1, 3);
    }

    #[test]
    fn test_header_rejects_invalid() {
        let err = NalUnitHeader::from_nalu(&[0xC0, 0x01]).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
        let err = NalUnitHeader::from_nalu(&[0x40, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
        let err = NalUnitHeader::from_nalu(&[0x40]).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_header_write() {
        let header = NalUnitHeader {
            nal_unit_type: NalUnitType::SpsNut,
            nuh_layer_id: 0,
            nuh_temporal_id_plus1: 1,
        };
        let mut w = BitWriter::new();
        header.write(&mut w).unwrap();
        assert_eq!(w.data(), &[0x42, 0x01]);
        assert_eq!(nalu_type(w.data()), Some(NalUnitType::SpsNut));
    }
}
