//! Error types for the isobits crates.
//!
//! Two layers: [`BitstreamError`] is what a bit reader or writer reports, and
//! [`Error`] is what a syntax-structure parser hands back to its caller, with
//! the structure name and bit offset attached.

use std::fmt;

use thiserror::Error;

/// Low-level bitstream faults raised by readers and writers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitstreamError {
    /// A read requested more bits than remained in the buffer.
    #[error("Unexpected end of bitstream")]
    UnexpectedEnd,

    /// A read or write asked for a bit count outside the supported range.
    #[error("Invalid bit count: {0}")]
    InvalidBitCount(u8),

    /// An Exp-Golomb code whose value does not fit the target integer.
    #[error("Exp-Golomb decoding error: value too large")]
    ExpGolombOverflow,

    /// `rbsp_trailing_bits` was not a single one bit followed by zero padding.
    #[error("Invalid RBSP trailing bits")]
    InvalidTrailingBits,
}

/// Main error type for parameter-set and slice-header parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A reader fault that has not yet been attributed to a structure.
    #[error("Bitstream error: {0}")]
    Bitstream(#[from] BitstreamError),

    /// The structure ended before all of its fields were read.
    #[error("{structure}: truncated at bit {bit_offset}")]
    Truncated {
        structure: &'static str,
        bit_offset: u64,
    },

    /// A structural invariant was violated.
    #[error("{structure}: {message}")]
    Format {
        structure: &'static str,
        message: String,
    },

    /// A parameter set referenced by ID is not in the caller's map.
    #[error("{structure}: referenced {kind} {id} not found")]
    MissingReference {
        structure: &'static str,
        kind: &'static str,
        id: u32,
    },

    /// The parser intentionally stops at this construct.
    #[error("{structure}: cannot parse further, {feature} not supported")]
    Unsupported {
        structure: &'static str,
        feature: &'static str,
    },

    /// A configured limit was reached.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for raw reader/writer operations.
pub type BitResult<T> = std::result::Result<T, BitstreamError>;

impl Error {
    /// Create a format error.
    pub fn format(structure: &'static str, message: impl Into<String>) -> Self {
        Error::Format {
            structure,
            message: message.into(),
        }
    }

    /// The error every parser returns when handed the wrong NAL unit.
    pub fn wrong_nal_type(structure: &'static str, nal_unit_type: u8) -> Self {
        Error::format(structure, format!("wrong NAL unit type {nal_unit_type}"))
    }

    /// Create a missing-reference error.
    pub fn missing(structure: &'static str, kind: &'static str, id: u32) -> Self {
        Error::MissingReference {
            structure,
            kind,
            id,
        }
    }

    /// Create an unsupported-construct error.
    pub fn unsupported(structure: &'static str, feature: &'static str) -> Self {
        Error::Unsupported { structure, feature }
    }

    /// Attribute an unlocated reader fault to `structure`.
    ///
    /// End-of-data becomes [`Error::Truncated`]; any other reader fault
    /// becomes [`Error::Format`]. Errors that already name a structure are
    /// returned unchanged, so the innermost structure wins.
    #[must_use]
    pub fn locate(self, structure: &'static str, bit_offset: u64) -> Self {
        match self {
            Error::Bitstream(BitstreamError::UnexpectedEnd) => Error::Truncated {
                structure,
                bit_offset,
            },
            Error::Bitstream(e) => Error::Format {
                structure,
                message: format!("{e} at bit {bit_offset}"),
            },
            other => other,
        }
    }

    /// Check if the input ended too early.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            Error::Truncated { .. } | Error::Bitstream(BitstreamError::UnexpectedEnd)
        )
    }

    /// Check if the parser stopped at an undecoded construct.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }

    /// Check if a referenced parameter set was absent.
    #[must_use]
    pub fn is_missing_reference(&self) -> bool {
        matches!(self, Error::MissingReference { .. })
    }
}

/// Attach a structure name and bit offset to a failed step.
pub trait ResultExt<T> {
    /// See [`Error::locate`].
    fn within(self, structure: &'static str, bit_offset: u64) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn within(self, structure: &'static str, bit_offset: u64) -> Result<T> {
        self.map_err(|e| e.into().locate(structure, bit_offset))
    }
}

/// Outcome of a parse that may stop partway through a structure.
///
/// `Incomplete` carries every field read before the parser hit a construct
/// it does not decode. Callers that only need the leading fields (profile,
/// level, picture size) can keep using the partial value.
#[derive(Error)]
pub enum ParseError<T> {
    /// Nothing usable was produced.
    #[error(transparent)]
    Failed(#[from] Error),

    /// The leading fields were read; parsing stopped at `error`.
    #[error("incomplete: {error}")]
    Incomplete { partial: Box<T>, error: Error },
}

/// Result type alias for parsers that can return a partial value.
pub type ParseResult<T> = std::result::Result<T, ParseError<T>>;

impl<T> ParseError<T> {
    /// Wrap `error`, keeping `partial` only when the parser stopped on
    /// purpose.
    pub fn stopped(partial: T, error: Error) -> Self {
        if error.is_unsupported() {
            ParseError::Incomplete {
                partial: Box::new(partial),
                error,
            }
        } else {
            ParseError::Failed(error)
        }
    }

    /// The underlying error.
    pub fn error(&self) -> &Error {
        match self {
            ParseError::Failed(e) => e,
            ParseError::Incomplete { error, .. } => error,
        }
    }

    /// The partially populated value, if any.
    pub fn partial(&self) -> Option<&T> {
        match self {
            ParseError::Failed(_) => None,
            ParseError::Incomplete { partial, .. } => Some(partial),
        }
    }

    /// Take the partially populated value, if any.
    pub fn into_partial(self) -> Option<T> {
        match self {
            ParseError::Failed(_) => None,
            ParseError::Incomplete { partial, .. } => Some(*partial),
        }
    }

    /// Drop the partial value.
    pub fn into_error(self) -> Error {
        match self {
            ParseError::Failed(e) => e,
            ParseError::Incomplete { error, .. } => error,
        }
    }
}

impl<T> fmt::Debug for ParseError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            ParseError::Incomplete { error, .. } => f
                .debug_struct("Incomplete")
                .field("error", error)
                .finish_non_exhaustive(),
        }
    }
}

impl<T> From<ParseError<T>> for Error {
    fn from(e: ParseError<T>) -> Self {
        e.into_error()
    }
}

impl<T> From<BitstreamError> for ParseError<T> {
    fn from(e: BitstreamError) -> Self {
        ParseError::Failed(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::missing("PPS", "SPS", 3);
        assert_eq!(err.to_string(), "PPS: referenced SPS 3 not found");

        let err = Error::wrong_nal_type("SPS", 8);
        assert_eq!(err.to_string(), "SPS: wrong NAL unit type 8");
    }

    #[test]
    fn test_locate_end_of_data() {
        let err = Error::from(BitstreamError::UnexpectedEnd).locate("SPS", 42);
        assert_eq!(
            err,
            Error::Truncated {
                structure: "SPS",
                bit_offset: 42
            }
        );
        assert!(err.is_truncation());
    }

    #[test]
    fn test_locate_keeps_innermost() {
        let inner = Error::from(BitstreamError::UnexpectedEnd).locate("HRD", 10);
        let outer = inner.clone().locate("SPS", 99);
        assert_eq!(inner, outer);
    }

    #[test]
    fn test_locate_other_fault_is_format() {
        let err = Error::from(BitstreamError::ExpGolombOverflow).locate("PPS", 7);
        assert!(matches!(err, Error::Format { structure: "PPS", .. }));
    }

    #[test]
    fn test_within() {
        let r: BitResult<u32> = Err(BitstreamError::UnexpectedEnd);
        let err = r.within("slice header", 5).unwrap_err();
        assert!(err.is_truncation());
        assert!(!err.is_missing_reference());
    }

    #[test]
    fn test_parse_error_stopped() {
        let e: ParseError<u8> = ParseError::stopped(7, Error::unsupported("SPS", "extension"));
        assert_eq!(e.partial(), Some(&7));
        assert!(e.error().is_unsupported());
        assert_eq!(e.into_partial(), Some(7));

        let e: ParseError<u8> = ParseError::stopped(7, Error::missing("PPS", "SPS", 0));
        assert!(e.partial().is_none());
        assert!(e.into_error().is_missing_reference());
    }
}
