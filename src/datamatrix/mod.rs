//! Data Matrix ECC 200, square symbols from 10x10 to 144x144.

mod codec;
mod detect;
mod placement;
mod version;

use tracing::debug;

use crate::common::charset::Charset;
use crate::common::ec::{data_matrix_field, ec_bytes, rectify_bytes};
use crate::common::{BarcodeError, BarcodeResult, BitMatrix};
use placement::placement;
use version::SymbolSize;

// Error correction blocks
//------------------------------------------------------------------------------

// Codeword i belongs to block i % blocks, for data and parity alike
fn add_ec(data: &[u8], size: &SymbolSize) -> Vec<u8> {
    let (blocks, ec_len) = (size.blocks, size.ec_per_block());
    let mut res = data.to_vec();
    res.resize(size.total_codewords(), 0);
    for j in 0..blocks {
        let blk: Vec<u8> = data.iter().skip(j).step_by(blocks).copied().collect();
        for (k, e) in ec_bytes(data_matrix_field(), &blk, ec_len).into_iter().enumerate() {
            res[data.len() + k * blocks + j] = e;
        }
    }
    res
}

fn correct(codewords: &mut [u8], size: &SymbolSize) -> BarcodeResult<()> {
    let (blocks, ec_len, dlen) = (size.blocks, size.ec_per_block(), size.data_codewords);
    for j in 0..blocks {
        let data_idx: Vec<usize> = (j..dlen).step_by(blocks).collect();
        let idx: Vec<usize> = data_idx.iter().copied().chain((0..ec_len).map(|k| dlen + k * blocks + j)).collect();
        let mut blk: Vec<u8> = idx.iter().map(|&i| codewords[i]).collect();
        rectify_bytes(data_matrix_field(), &mut blk, ec_len)?;
        for (&i, b) in idx.iter().zip(blk) {
            codewords[i] = b;
        }
    }
    Ok(())
}

// Symbol layout
//------------------------------------------------------------------------------

// Symbol coordinates of a mapping matrix cell, skipping finder and clock tracks
fn to_symbol(r: usize, c: usize, region: usize) -> (usize, usize) {
    (c + 2 * (c / region) + 1, r + 2 * (r / region) + 1)
}

fn draw(codewords: &[u8], size: &SymbolSize) -> BitMatrix {
    let (dim, region, m) = (size.size, size.region_size(), size.mapping_size());
    let mut grid = BitMatrix::square(dim);

    // Finder L on the left and bottom, clock tracks on the top and right of each region
    let step = region + 2;
    for ry in 0..size.regions {
        for rx in 0..size.regions {
            let (x0, y0) = (rx * step, ry * step);
            for i in 0..step {
                grid.set(x0, y0 + i, true);
                grid.set(x0 + i, y0 + step - 1, true);
                if i % 2 == 0 {
                    grid.set(x0 + i, y0, true);
                } else {
                    grid.set(x0 + step - 1, y0 + i, true);
                }
            }
        }
    }

    for (i, slot) in placement(m, m).into_iter().enumerate() {
        let (r, c) = (i / m, i % m);
        let dark = match slot {
            Some((cw, bit)) => (codewords[cw] >> (7 - bit)) & 1 != 0,
            // Unused corner of the mapping matrix is a fixed checker
            None => (r == m - 1 && c == m - 1) || (r == m - 2 && c == m - 2),
        };
        let (x, y) = to_symbol(r, c, region);
        grid.set(x, y, dark);
    }
    grid
}

fn read_codewords(grid: &BitMatrix, size: &SymbolSize) -> Vec<u8> {
    let (region, m) = (size.region_size(), size.mapping_size());
    let mut res = vec![0u8; size.total_codewords()];
    for (i, slot) in placement(m, m).into_iter().enumerate() {
        if let Some((cw, bit)) = slot {
            let (x, y) = to_symbol(i / m, i % m, region);
            if grid.get(x, y) {
                res[cw] |= 0x80 >> bit;
            }
        }
    }
    res
}

// Public api
//------------------------------------------------------------------------------

pub fn encode(data: &str, charset: Option<Charset>) -> BarcodeResult<BitMatrix> {
    let mut codewords = codec::encode_data(data, charset)?;
    let size = SymbolSize::for_data_len(codewords.len())?;
    debug!(size = size.size, data_len = codewords.len(), "Encoding DataMatrix");
    codec::pad(&mut codewords, size.data_codewords);
    Ok(draw(&add_ec(&codewords, &size), &size))
}

// Decodes an upright module grid
fn decode_grid(grid: &BitMatrix, fallback: Option<Charset>) -> BarcodeResult<String> {
    let size = SymbolSize::for_size(grid.width())?;
    let mut codewords = read_codewords(grid, &size);
    correct(&mut codewords, &size)?;
    codec::decode_data(&codewords[..size.data_codewords], fallback)
}

pub fn decode(img: &BitMatrix, fallback: Option<Charset>) -> BarcodeResult<String> {
    let grid = detect::detect(img)?;
    decode_grid(&grid, fallback).map_err(|e| match e {
        BarcodeError::InvalidVersion => BarcodeError::SymbolNotFound,
        e => e,
    })
}

#[cfg(test)]
mod datamatrix_tests {
    use super::*;
    use test_case::test_case;

    fn render(grid: &BitMatrix, scale: usize) -> BitMatrix {
        let q = 2;
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

    #[test]
    fn test_reference_codewords() {
        // "123456" in a 10x10 symbol
        let size = SymbolSize::for_size(10).unwrap();
        let all = add_ec(&[142, 164, 186], &size);
        assert_eq!(all, vec![142, 164, 186, 114, 25, 5, 88, 102]);
    }

    #[test]
    fn test_finder_layout() {
        let grid = encode("A", None).unwrap();
        assert_eq!(grid.width(), 10);
        assert!((0..10).all(|y| grid.get(0, y)));
        assert!((0..10).all(|x| grid.get(x, 9)));
        assert!(grid.get(0, 0) && !grid.get(1, 0) && grid.get(2, 0));
        assert!(!grid.get(9, 0) && grid.get(9, 1));
    }

    #[test_case("123456"; "digits")]
    #[test_case("Hello, World!"; "ascii")]
    #[test_case("Größe 42 €"; "utf8")]
    fn test_grid_roundtrip(text: &str) {
        let grid = encode(text, None).unwrap();
        assert_eq!(decode_grid(&grid, None).unwrap(), text);
    }

    #[test]
    fn test_multi_block_roundtrip() {
        // 52x52 and above interleave several blocks
        let text: String = (0..300).map(|i| (b'A' + (i % 26) as u8) as char).collect();
        let grid = encode(&text, None).unwrap();
        assert!(grid.width() >= 52);
        assert_eq!(decode_grid(&grid, None).unwrap(), text);
    }

    #[test]
    fn test_image_roundtrip() {
        let grid = encode("DataMatrix via image", None).unwrap();
        let img = render(&grid, 4);
        assert_eq!(decode(&img, None).unwrap(), "DataMatrix via image");
        assert_eq!(decode(&img.rotate90(), None).unwrap(), "DataMatrix via image");
    }

    #[test]
    fn test_corrects_damage() {
        let mut grid = encode("error correction", None).unwrap();
        grid.flip(5, 5);
        grid.flip(6, 5);
        assert_eq!(decode_grid(&grid, None).unwrap(), "error correction");
    }

    #[test]
    fn test_too_long() {
        let text = "x".repeat(3200);
        assert_eq!(encode(&text, None), Err(BarcodeError::DataTooLong));
    }
}
