//! QR Code model 2 symbols, versions 1 to 40.

mod codec;
mod detect;
mod finder;
mod mask;
mod matrix;
mod version;

pub use version::ECLevel;

use crate::common::charset::Charset;
use crate::common::{BarcodeResult, BitMatrix};

/// Encodes text into the module grid of the smallest version that holds it.
pub fn encode(data: &str, ecl: ECLevel, charset: Option<Charset>) -> BarcodeResult<BitMatrix> {
    let (version, codewords) = codec::encode_data(data, ecl, charset)?;
    Ok(matrix::build(&codewords, version, ecl).into_modules())
}

/// Locates and decodes a symbol in a binarized image.
pub fn decode(img: &BitMatrix, try_harder: bool, charset: Option<Charset>) -> BarcodeResult<String> {
    detect::decode(img, try_harder, charset)
}

#[cfg(test)]
mod qr_tests {
    use super::*;
    use crate::common::BarcodeError;

    fn render(modules: &BitMatrix, scale: usize, quiet: usize) -> BitMatrix {
        let w = modules.width();
        let mut img = BitMatrix::square((w + 2 * quiet) * scale);
        for y in 0..w {
            for x in 0..w {
                if modules.get(x, y) {
                    img.fill_rect((x + quiet) * scale, (y + quiet) * scale, scale, scale, true);
                }
            }
        }
        img
    }

    #[test]
    fn test_version_1_size() {
        let m = encode("hello QR", ECLevel::L, None).unwrap();
        assert_eq!(m.width(), 21);
    }

    #[test]
    fn test_unicode_roundtrip() {
        let text = "Grüße, 世界";
        let m = encode(text, ECLevel::M, None).unwrap();
        assert_eq!(decode(&render(&m, 4, 4), false, None).unwrap(), text);
    }

    #[test]
    fn test_latin1_hint_roundtrip() {
        let text = "café";
        let m = encode(text, ECLevel::L, Some(Charset::Latin1)).unwrap();
        assert_eq!(decode(&render(&m, 4, 4), false, None).unwrap(), text);
    }

    #[test]
    fn test_empty() {
        assert_eq!(encode("", ECLevel::L, None).unwrap_err(), BarcodeError::EmptyData);
    }

    #[test]
    fn test_deterministic() {
        let a = encode("same input", ECLevel::Q, None).unwrap();
        let b = encode("same input", ECLevel::Q, None).unwrap();
        assert_eq!(a, b);
    }
}
