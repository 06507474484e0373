//! VVC NAL unit types and the two-byte NAL unit header.

use std::fmt;

use isobits_core::{Error, ReadBits, Result, ResultExt, WriteBits};

const STRUCTURE: &str = "NAL unit header";

/// VVC NAL unit types (5 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NalUnitType {
    /// Trailing picture.
    TrailNut,
    /// Step-wise temporal sub-layer access.
    StsaNut,
    /// Random access decodable leading picture.
    RadlNut,
    /// Random access skipped leading picture.
    RaslNut,
    /// IDR that may have RADL pictures.
    IdrWRadl,
    /// IDR without leading pictures.
    IdrNLp,
    /// Clean random access.
    CraNut,
    /// Gradual decoding refresh.
    GdrNut,
    /// Operating point information.
    OpiNut,
    /// Decoding capability information.
    DciNut,
    /// Video parameter set.
    VpsNut,
    /// Sequence parameter set.
    SpsNut,
    /// Picture parameter set.
    PpsNut,
    /// Prefix adaptation parameter set.
    PrefixApsNut,
    /// Suffix adaptation parameter set.
    SuffixApsNut,
    /// Picture header.
    PhNut,
    /// Access unit delimiter.
    AudNut,
    /// End of sequence.
    EosNut,
    /// End of bitstream.
    EobNut,
    /// Prefix SEI.
    PrefixSeiNut,
    /// Suffix SEI.
    SuffixSeiNut,
    /// Filler data.
    FdNut,
    /// Reserved (4-6, 11, 26 and 27).
    Reserved(u8),
    /// Unspecified (28-31).
    Unspecified(u8),
}

impl NalUnitType {
    /// Create from the raw 5-bit value; higher bits are ignored.
    pub fn from_u8(value: u8) -> Self {
        match value & 0x1F {
            0 => Self::TrailNut,
            1 => Self::StsaNut,
            2 => Self::RadlNut,
            3 => Self::RaslNut,
            7 => Self::IdrWRadl,
            8 => Self::IdrNLp,
            9 => Self::CraNut,
            10 => Self::GdrNut,
            12 => Self::OpiNut,
            13 => Self::DciNut,
            14 => Self::VpsNut,
            15 => Self::SpsNut,
            16 => Self::PpsNut,
            17 => Self::PrefixApsNut,
            18 => Self::SuffixApsNut,
            19 => Self::PhNut,
            20 => Self::AudNut,
            21 => Self::EosNut,
            22 => Self::EobNut,
            23 => Self::PrefixSeiNut,
            24 => Self::SuffixSeiNut,
            25 => Self::FdNut,
            n if n >= 28 => Self::Unspecified(n),
            n => Self::Reserved(n),
        }
    }

    /// Get the raw value.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::TrailNut => 0,
            Self::StsaNut => 1,
            Self::RadlNut => 2,
            Self::RaslNut => 3,
            Self::IdrWRadl => 7,
            Self::IdrNLp => 8,
            Self::CraNut => 9,
            Self::GdrNut => 10,
            Self::OpiNut => 12,
            Self::DciNut => 13,
            Self::VpsNut => 14,
            Self::SpsNut => 15,
            Self::PpsNut => 16,
            Self::PrefixApsNut => 17,
            Self::SuffixApsNut => 18,
            Self::PhNut => 19,
            Self::AudNut => 20,
            Self::EosNut => 21,
            Self::EobNut => 22,
            Self::PrefixSeiNut => 23,
            Self::SuffixSeiNut => 24,
            Self::FdNut => 25,
            Self::Reserved(n) | Self::Unspecified(n) => n,
        }
    }

    /// Check if this is a VCL NAL unit, reserved VCL types included.
    pub fn is_vcl(self) -> bool {
        self.to_u8() <= 11
    }

    /// Check if this is an IRAP picture (IDR or CRA, plus reserved type 11).
    pub fn is_irap(self) -> bool {
        (7..=11).contains(&self.to_u8())
    }

    /// Check if this is an IDR picture.
    pub fn is_idr(self) -> bool {
        matches!(self, Self::IdrWRadl | Self::IdrNLp)
    }

    /// Check if this is a leading picture.
    pub fn is_leading(self) -> bool {
        matches!(self, Self::RadlNut | Self::RaslNut)
    }

    /// Check if this is a VPS, SPS or PPS.
    pub fn is_parameter_set(self) -> bool {
        matches!(self, Self::VpsNut | Self::SpsNut | Self::PpsNut)
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TrailNut => "TRAIL_NUT",
            Self::StsaNut => "STSA_NUT",
            Self::RadlNut => "RADL_NUT",
            Self::RaslNut => "RASL_NUT",
            Self::IdrWRadl => "IDR_W_RADL",
            Self::IdrNLp => "IDR_N_LP",
            Self::CraNut => "CRA_NUT",
            Self::GdrNut => "GDR_NUT",
            Self::OpiNut => "OPI_NUT",
            Self::DciNut => "DCI_NUT",
            Self::VpsNut => "VPS_NUT",
            Self::SpsNut => "SPS_NUT",
            Self::PpsNut => "PPS_NUT",
            Self::PrefixApsNut => "PREFIX_APS_NUT",
            Self::SuffixApsNut => "SUFFIX_APS_NUT",
            Self::PhNut => "PH_NUT",
            Self::AudNut => "AUD_NUT",
            Self::EosNut => "EOS_NUT",
            Self::EobNut => "EOB_NUT",
            Self::PrefixSeiNut => "PREFIX_SEI_NUT",
            Self::SuffixSeiNut => "SUFFIX_SEI_NUT",
            Self::FdNut => "FD_NUT",
            Self::Reserved(v) => return write!(f, "RESERVED({v})"),
            Self::Unspecified(v) => return write!(f, "UNSPECIFIED({v})"),
        };
        f.write_str(name)
    }
}

/// VVC NAL unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NalUnitHeader {
    /// Layer ID.
    pub nuh_layer_id: u8,
    /// NAL unit type.
    pub nal_unit_type: NalUnitType,
    /// Temporal ID plus 1.
    pub nuh_temporal_id_plus1: u8,
}

impl NalUnitHeader {
    /// Read the header from the start of a NAL unit.
    ///
    /// `forbidden_zero_bit`, `nuh_reserved_zero_bit` and a zero
    /// `nuh_temporal_id_plus1` are format errors.
    pub fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        if reader.read_flag().within(STRUCTURE, 0)? {
            return Err(Error::format(STRUCTURE, "forbidden_zero_bit is set"));
        }
        if reader.read_flag().within(STRUCTURE, 1)? {
            return Err(Error::format(STRUCTURE, "nuh_reserved_zero_bit is set"));
        }
        let nuh_layer_id = reader.read_bits(6).within(STRUCTURE, 2)? as u8;
        let nal_unit_type = NalUnitType::from_u8(reader.read_bits(5).within(STRUCTURE, 8)? as u8);
        let nuh_temporal_id_plus1 = reader.read_bits(3).within(STRUCTURE, 13)? as u8;
        if nuh_temporal_id_plus1 == 0 {
            return Err(Error::format(STRUCTURE, "nuh_temporal_id_plus1 is zero"));
        }
        Ok(Self {
            nuh_layer_id,
            nal_unit_type,
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
        writer.write_flag(false)?;
        writer.write_bits(u32::from(self.nuh_layer_id), 6)?;
        writer.write_bits(u32::from(self.nal_unit_type.to_u8()), 5)?;
        writer.write_bits(u32::from(self.nuh_temporal_id_plus1), 3)?;
        Ok(())
    }

    /// Get the temporal ID (0-based).
    pub fn temporal_id(&self) -> u8 {
        self.nuh_temporal_id_plus1.saturating_sub(1)
    }
}

/// Type of a NAL unit; `None` when fewer than two bytes are present.
pub fn nalu_type(nalu: &[u8]) -> Option<NalUnitType> {
    nalu.get(1).map(|&b| NalUnitType::from_u8(b >> 3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobits_core::BitWriter;

    #[test]
    fn test_nal_unit_type() {
        assert_eq!(NalUnitType::from_u8(7), NalUnitType::IdrWRadl);
        assert_eq!(NalUnitType::from_u8(8), NalUnitType::IdrNLp);
        assert_eq!(NalUnitType::from_u8(15), NalUnitType::SpsNut);
        assert_eq!(NalUnitType::from_u8(19), NalUnitType::PhNut);
        assert_eq!(NalUnitType::from_u8(5), NalUnitType::Reserved(5));
        assert_eq!(NalUnitType::from_u8(30), NalUnitType::Unspecified(30));
        for v in 0..32u8 {
            assert_eq!(NalUnitType::from_u8(v).to_u8(), v);
        }
    }

    #[test]
    fn test_classification() {
        assert!(NalUnitType::TrailNut.is_vcl());
        assert!(NalUnitType::Reserved(11).is_vcl());
        assert!(!NalUnitType::OpiNut.is_vcl());
        assert!(NalUnitType::CraNut.is_irap());
        assert!(!NalUnitType::GdrNut.is_idr());
        assert!(NalUnitType::IdrNLp.is_idr());
        assert!(NalUnitType::RaslNut.is_leading());
        assert!(NalUnitType::PpsNut.is_parameter_set());
        assert!(!NalUnitType::PrefixApsNut.is_parameter_set());
        assert_eq!(NalUnitType::SuffixApsNut.to_string(), "SUFFIX_APS_NUT");
        assert_eq!(NalUnitType::Reserved(26).to_string(), "RESERVED(26)");
    }

    #[test]
    fn test_header_parse() {
        let header = NalUnitHeader::from_nalu(&[0x00, 0x79]).unwrap();
        assert_eq!(header.nal_unit_type, NalUnitType::SpsNut);
        assert_eq!(header.nuh_layer_id, 0);
        assert_eq!(header.temporal_id(), 0);

        // IDR_W_RADL, layer 2, temporal id 1
        let header = NalUnitHeader::from_nalu(&[0x02, 0x3A]).unwrap();
        assert_eq!(header.nal_unit_type, NalUnitType::IdrWRadl);
        assert_eq!(header.nuh_layer_id, 2);
        assert_eq!(header.temporal_id(), 1);
        assert_eq!(nalu_type(&[0x02, 0x3A]), Some(NalUnitType::IdrWRadl));
        assert_eq!(nalu_type(&[0x02]), None);
    }

    #[test]
    fn test_header_rejects_invalid() {
        for bytes in [[0x80, 0x79], [0x40, 0x79], [0x00, 0x78]] {
            let err = NalUnitHeader::from_nalu(&bytes).unwrap_err();
            assert!(matches!(err, Error::Format { .. }), "{bytes:02x?}");
        }
        assert!(NalUnitHeader::from_nalu(&[0x00]).unwrap_err().is_truncation());
    }

    #[test]
    fn test_header_write() {
        let header = NalUnitHeader {
            nuh_layer_id: 0,
            nal_unit_type: NalUnitType::PpsNut,
            nuh_temporal_id_plus1: 1,
        };
        let mut w = BitWriter::new();
        header.write(&mut w).unwrap();
        assert_eq!(w.data(), &[0x00, 0x81]);
    }
}
