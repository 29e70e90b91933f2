//! Barcode reading. A [`Decoder`] binarizes the image once and tries every candidate
//! symbology in a fixed order, returning the first that decodes.

mod binarize;

pub use binarize::binarize;

use std::fmt::{Display, Formatter};

use image::{DynamicImage, GrayImage};
use serde::Serialize;
use tracing::{debug, trace};

use crate::common::charset::Charset;
use crate::common::{BarcodeResult, BitMatrix};
use crate::oned::{self, LinearOptions};
use crate::symbology::BarcodeFormat;
use crate::{aztec, datamatrix, pdf417, qr};

// Matrix symbologies are tried first, in this order
const MATRIX_ORDER: [BarcodeFormat; 4] =
    [BarcodeFormat::QrCode, BarcodeFormat::DataMatrix, BarcodeFormat::Aztec, BarcodeFormat::Pdf417];

// Decode hints
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeHints {
    /// Candidate formats; empty means all.
    pub possible_formats: Vec<BarcodeFormat>,
    /// More scan lines, rotated linear scans and looser finder tolerances.
    pub try_harder: bool,
    /// Character set for byte data that carries no ECI.
    pub character_set: Option<Charset>,
    /// Image holds nothing but an unrotated symbol.
    pub pure_barcode: bool,
    /// Decode Code 39 full ASCII shift pairs.
    pub code39_full_ascii: bool,
}

impl DecodeHints {
    fn wants(&self, format: BarcodeFormat) -> bool {
        self.possible_formats.is_empty() || self.possible_formats.contains(&format)
    }
}

// Results
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedResult {
    pub text: String,
    pub format: BarcodeFormat,
    /// Milliseconds since the Unix epoch when the symbol was decoded.
    pub timestamp_millis: i64,
}

impl DecodedResult {
    fn now(text: String, format: BarcodeFormat) -> Self {
        Self { text, format, timestamp_millis: chrono::Utc::now().timestamp_millis() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Bytes are not an image the codec recognises.
    InvalidImage(String),
    /// Image decoded but no symbol was found.
    NotFound,
}

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidImage(cause) => write!(f, "invalid image. {cause}"),
            Self::NotFound => f.write_str("No barcode found in image"),
        }
    }
}

impl std::error::Error for ReadError {}

// Decoder
//------------------------------------------------------------------------------

pub struct Decoder {
    hints: DecodeHints,
}

impl Decoder {
    pub fn new(hints: DecodeHints) -> Self {
        Self { hints }
    }

    fn decode_matrix(&self, format: BarcodeFormat, bits: &BitMatrix) -> BarcodeResult<String> {
        let cs = self.hints.character_set;
        match format {
            BarcodeFormat::QrCode => qr::decode(bits, self.hints.try_harder, cs),
            BarcodeFormat::DataMatrix => datamatrix::decode(bits, cs),
            BarcodeFormat::Aztec => aztec::decode(bits, cs),
            _ => pdf417::decode(bits),
        }
    }

    /// Decodes a binarized image.
    pub fn decode_bits(&self, bits: &BitMatrix) -> Result<DecodedResult, ReadError> {
        for format in MATRIX_ORDER.into_iter().filter(|&f| self.hints.wants(f)) {
            match self.decode_matrix(format, bits) {
                Ok(text) => {
                    debug!(%format, "Decoded symbol");
                    return Ok(DecodedResult::now(text, format));
                }
                Err(e) => trace!(%format, error = %e, "Candidate failed"),
            }
        }

        let linear: Vec<BarcodeFormat> =
            BarcodeFormat::ALL.into_iter().filter(|f| !f.is_matrix() && self.hints.wants(*f)).collect();
        if !linear.is_empty() {
            let opts =
                LinearOptions { try_harder: self.hints.try_harder, code39_full_ascii: self.hints.code39_full_ascii };
            match oned::decode(bits, &linear, opts) {
                Ok((format, text)) => {
                    debug!(%format, "Decoded symbol");
                    return Ok(DecodedResult::now(text, format));
                }
                Err(e) => trace!(error = %e, "Linear candidates failed"),
            }
        }
        Err(ReadError::NotFound)
    }

    pub fn decode(&self, img: &GrayImage) -> Result<DecodedResult, ReadError> {
        self.decode_bits(&binarize(img))
    }

    /// Converts to luma first.
    pub fn decode_dynamic(&self, img: &DynamicImage) -> Result<DecodedResult, ReadError> {
        self.decode(&img.to_luma8())
    }
}

pub fn decode(img: &GrayImage, hints: DecodeHints) -> Result<DecodedResult, ReadError> {
    Decoder::new(hints).decode(img)
}

#[cfg(test)]
mod reader_tests {
    use super::*;
    use crate::builder::{encode, EncodeHints};
    use crate::symbology::{resolve, Symbology};
    use image::Luma;
    use test_case::test_case;

    #[test]
    fn test_blank_not_found() {
        let img = GrayImage::from_pixel(200, 200, Luma([255]));
        assert_eq!(decode(&img, DecodeHints::default()), Err(ReadError::NotFound));
    }

    #[test_case("qr", "Hello, QR!")]
    #[test_case("dataMatrix", "Data Matrix 2024")]
    #[test_case("aztec", "Aztec reads")]
    #[test_case("code128", "CODE-128 read")]
    #[test_case("ean-13", "4006381333931")]
    fn test_decode_generated(key: &str, data: &str) {
        let s = resolve(key).unwrap();
        let (w, h) = if s.format().is_matrix() { (300, 300) } else { (400, 120) };
        let img = encode(data, s, w, h, EncodeHints::default()).unwrap();
        let res = decode(&img, DecodeHints::default()).unwrap();
        assert_eq!((res.text.as_str(), res.format), (data, s.format()));
        assert!(res.timestamp_millis > 0);
    }

    #[test]
    fn test_possible_formats_restrict() {
        let s = resolve("qr").unwrap();
        let img = encode("ONLY QR", s, 300, 300, EncodeHints::default()).unwrap();
        let hints = DecodeHints { possible_formats: vec![BarcodeFormat::Code128], ..Default::default() };
        assert_eq!(decode(&img, hints), Err(ReadError::NotFound));
        let hints = DecodeHints { possible_formats: vec![BarcodeFormat::QrCode], ..Default::default() };
        assert_eq!(decode(&img, hints).unwrap().text, "ONLY QR");
    }

    #[test]
    fn test_leading_zero_ean13_reads_as_upca() {
        let img = encode("0012345678905", Symbology::for_format(BarcodeFormat::Ean13), 400, 120, EncodeHints::default())
            .unwrap();
        let res = decode(&img, DecodeHints::default()).unwrap();
        assert_eq!((res.text.as_str(), res.format), ("012345678905", BarcodeFormat::UpcA));
    }

    #[test]
    fn test_character_set_fallback() {
        let bits = {
            let s = resolve("qr").unwrap();
            let hints = EncodeHints { charset: Some(Charset::Latin1), ..Default::default() };
            binarize(&encode("café", s, 300, 300, hints).unwrap())
        };
        // Latin-1 with its ECI decodes the same with or without a fallback
        let hints = DecodeHints { character_set: Some(Charset::Utf8), ..Default::default() };
        assert_eq!(Decoder::new(hints).decode_bits(&bits).unwrap().text, "café");
    }

    #[test]
    fn test_read_error_messages() {
        assert_eq!(ReadError::InvalidImage("bad header".into()).to_string(), "invalid image. bad header");
        assert_eq!(ReadError::NotFound.to_string(), "No barcode found in image");
    }
}
