//! Aztec codes, compact and full range.

mod decoder;
mod detect;
mod encoder;
mod layout;

use crate::common::charset::Charset;
use crate::common::{BarcodeError, BarcodeResult, BitMatrix, BitStream};

pub use encoder::{encode, DEFAULT_EC_PERCENT};

pub fn decode(img: &BitMatrix, fallback: Option<Charset>) -> BarcodeResult<String> {
    let found = detect::detect(img)?;
    let mut raw = BitStream::with_capacity(found.layout.total_bits());
    for (x, y) in found.layout.data_positions() {
        raw.push(found.grid.get(x, y));
    }
    let bits = decoder::correct_bits(&raw, &found.layout, found.data_words)?;
    let text = decoder::decode_bits(&bits, fallback)?;
    if text.is_empty() {
        return Err(BarcodeError::EmptyData);
    }
    Ok(text)
}

#[cfg(test)]
mod aztec_tests {
    use super::*;
    use test_case::test_case;

    fn render(grid: &BitMatrix, scale: usize) -> BitMatrix {
        let q = 3;
        let mut img = BitMatrix::square((grid.width() + 2 * q) * scale);
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                if grid.get(x, y) {
                    img.fill_rect((x + q) * scale, (y + q) * scale, scale, scale, true);
                }
            }
        }
        img
    }

    #[test_case("HELLO"; "compact")]
    #[test_case("Aztec Code 2D!"; "mixed case")]
    #[test_case("ünïcödé"; "utf8")]
    fn test_image_roundtrip(text: &str) {
        let grid = encode(text, DEFAULT_EC_PERCENT, None).unwrap();
        let img = render(&grid, 3);
        assert_eq!(decode(&img, None).unwrap(), text);
    }

    #[test]
    fn test_full_range_roundtrip() {
        let text = "The quick brown fox jumps over the lazy dog 0123456789. ".repeat(4);
        let grid = encode(&text, DEFAULT_EC_PERCENT, None).unwrap();
        assert!(grid.width() > 27);
        assert_eq!(decode(&render(&grid, 2), None).unwrap(), text);
    }

    #[test]
    fn test_rotations() {
        let grid = encode("turned around", DEFAULT_EC_PERCENT, None).unwrap();
        let mut img = render(&grid, 4);
        for _ in 0..4 {
            assert_eq!(decode(&img, None).unwrap(), "turned around");
            img = img.rotate90();
        }
    }

    #[test]
    fn test_corrects_damage() {
        let mut grid = encode("damaged but readable", DEFAULT_EC_PERCENT, None).unwrap();
        grid.flip(0, 0);
        grid.flip(1, 0);
        grid.flip(0, 1);
        assert_eq!(decode(&render(&grid, 3), None).unwrap(), "damaged but readable");
    }

    #[test]
    fn test_latin1_hint() {
        let grid = encode("café", DEFAULT_EC_PERCENT, Some(Charset::Latin1)).unwrap();
        assert_eq!(decode(&render(&grid, 3), None).unwrap(), "café");
    }
}
