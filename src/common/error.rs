use std::fmt::{Debug, Display, Error, Formatter};

// Error
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum BarcodeError {
    // Builder
    EmptyData,
    DataTooLong,
    InvalidChar,
    InvalidLength,
    InvalidCheckDigit,
    InvalidNumberSystem,
    InvalidECLevel,
    InvalidVersion,
    InvalidDimensions,
    UnsupportedCharset,
    UnsupportedFormat,

    // Reader
    SingularMatrix,
    PointAtInfinity,
    SymbolNotFound,
    TooManyError,
    InvalidInfo,
    InvalidFormatInfo,
    InvalidVersionInfo,
    InvalidChecksum,
    InvalidCodeword,
    OutOfBounds,
}

impl Display for BarcodeError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let msg = match *self {
            // Builder
            Self::EmptyData => "Empty data",
            Self::DataTooLong => "Data too long for the symbology",
            Self::InvalidChar => "Data contains a character the symbology cannot encode",
            Self::InvalidLength => "Data length not allowed by the symbology",
            Self::InvalidCheckDigit => "Check digit does not match the data",
            Self::InvalidNumberSystem => "Invalid number system digit",
            Self::InvalidECLevel => "Invalid error correction level",
            Self::InvalidVersion => "Invalid version",
            Self::InvalidDimensions => "Width and height must be positive",
            Self::UnsupportedCharset => "Unsupported character set",
            Self::UnsupportedFormat => "Format not supported by this encoder",

            // Reader
            Self::SingularMatrix => "Cannot compute homography",
            Self::PointAtInfinity => "Projected point is at infinity",
            Self::SymbolNotFound => "Symbol not found",
            Self::TooManyError => "Too many errors to correct successfully",
            Self::InvalidInfo => "Invalid info",
            Self::InvalidFormatInfo => "Invalid format info detected",
            Self::InvalidVersionInfo => "Invalid version info detected",
            Self::InvalidChecksum => "Checksum mismatch",
            Self::InvalidCodeword => "Invalid codeword sequence",
            Self::OutOfBounds => "Sample point outside the image",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for BarcodeError {}

pub type BarcodeResult<T> = Result<T, BarcodeError>;
