//! PDF417 stacked symbols, backed by `rxing`.

use rxing::{BarcodeFormat, MultiFormatWriter, Writer};
use tracing::{debug, trace};

use crate::common::{BarcodeError, BarcodeResult, BitMatrix};

// The writer renders one pixel per module column and several pixels per row inside a
// white border. Cropping to the dark bounding box leaves the bare symbol.
pub fn encode(data: &str) -> BarcodeResult<BitMatrix> {
    if data.is_empty() {
        return Err(BarcodeError::EmptyData);
    }
    let bits = MultiFormatWriter
        .encode(data, &BarcodeFormat::PDF_417, 0, 0)
        .map_err(|e| {
            debug!(%e, "PDF417 writer rejected data");
            BarcodeError::DataTooLong
        })?;

    let (w, h) = (bits.getWidth() as usize, bits.getHeight() as usize);
    let mut full = BitMatrix::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if bits.get(x as u32, y as u32) {
                full.set(x, y, true);
            }
        }
    }
    let (l, t, r, b) = full.bounding_box().ok_or(BarcodeError::EmptyData)?;
    let mut res = BitMatrix::new(r - l + 1, b - t + 1);
    for y in t..=b {
        for x in l..=r {
            if full.get(x, y) {
                res.set(x - l, y - t, true);
            }
        }
    }
    trace!(width = res.width(), height = res.height(), "Encoded PDF417");
    Ok(res)
}

fn detect(img: &BitMatrix) -> BarcodeResult<String> {
    let (w, h) = (img.width(), img.height());
    let luma: Vec<u8> =
        (0..h).flat_map(|y| (0..w).map(move |x| (x, y))).map(|(x, y)| if img.get(x, y) { 0 } else { 255 }).collect();
    let res = rxing::helpers::detect_in_luma(luma, w as u32, h as u32, Some(BarcodeFormat::PDF_417))
        .map_err(|_| BarcodeError::SymbolNotFound)?;
    Ok(res.getText().to_string())
}

pub fn decode(img: &BitMatrix) -> BarcodeResult<String> {
    if img.width() == 0 || img.height() == 0 {
        return Err(BarcodeError::SymbolNotFound);
    }
    detect(img)
}
