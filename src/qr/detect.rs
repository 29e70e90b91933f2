use tracing::{debug, trace};

use super::codec::decode_data;
use super::finder::{locate_finders, select_triples, FinderTriple};
use super::mask::MaskPattern;
use super::matrix::{deinterleave, format_positions, QrGrid};
use super::version::{parse_format_info, valid_format_infos, valid_version_infos, ECLevel, Version};
use crate::common::charset::Charset;
use crate::common::ec::{qr_field, rectify_bytes, rectify_info};
use crate::common::{BarcodeError, BarcodeResult, BitMatrix, Homography, Point};

// Alignment pattern
//------------------------------------------------------------------------------

// Looks for a light-dark-light 1:1:1 run around the estimate, confirmed vertically
fn find_alignment(img: &BitMatrix, est: Point, module: f64, allowance: f64) -> Option<Point> {
    let radius = (allowance * module).ceil() as i32;
    let (ex, ey) = est.round();
    let tol = module / 2.0 + 1.0;
    let fits = |run: u32| (run as f64 - module).abs() <= tol;

    let mut best: Option<(f64, Point)> = None;
    // Rows ordered outwards from the estimate
    for dy in (0..=2 * radius).map(|i| if i & 1 == 0 { i / 2 } else { -(i + 1) / 2 }) {
        let y = ey + dy;
        if y < 0 || y as usize >= img.height() {
            continue;
        }
        let mut x = (ex - radius).max(0);
        let end = (ex + radius).min(img.width() as i32 - 1);
        while x <= end {
            // Dark run start preceded by light
            if img.get_i(x, y) && !img.get_i(x - 1, y) {
                let start = x;
                while x <= end + radius && img.get_i(x, y) {
                    x += 1;
                }
                let dark = (x - start) as u32;
                let left = light_run(img, start - 1, y, -1, 0);
                let right = light_run(img, x, y, 1, 0);
                if fits(dark) && fits(left) && fits(right) {
                    let cx = start as f64 + dark as f64 / 2.0;
                    if let Some(cy) = vertical_center(img, cx as i32, y, module, tol) {
                        let p = Point::new(cx, cy);
                        let d = p.dist(&est);
                        if best.as_ref().map_or(true, |(bd, _)| d < *bd) {
                            best = Some((d, p));
                        }
                    }
                }
            } else {
                x += 1;
            }
        }
        if best.is_some() && dy.abs() as f64 > module * 2.0 {
            break;
        }
    }
    best.map(|(_, p)| p)
}

fn light_run(img: &BitMatrix, x: i32, y: i32, dx: i32, dy: i32) -> u32 {
    let (mut x, mut y, mut n) = (x, y, 0);
    let inside = |x: i32, y: i32| x >= 0 && y >= 0 && (x as usize) < img.width() && (y as usize) < img.height();
    while inside(x, y) && !img.get_i(x, y) && n < 64 {
        n += 1;
        x += dx;
        y += dy;
    }
    n
}

fn vertical_center(img: &BitMatrix, x: i32, y: i32, module: f64, tol: f64) -> Option<f64> {
    let mut top = y;
    while img.get_i(x, top - 1) {
        top -= 1;
    }
    let mut bottom = y;
    while img.get_i(x, bottom + 1) {
        bottom += 1;
    }
    let dark = (bottom - top + 1) as f64;
    let above = light_run(img, x, top - 1, 0, -1) as f64;
    let below = light_run(img, x, bottom + 1, 0, 1) as f64;
    let fits = |run: f64| (run - module).abs() <= tol;
    (fits(dark) && fits(above) && fits(below)).then_some(top as f64 + dark / 2.0)
}

// Sampling
//------------------------------------------------------------------------------

fn projection(img: &BitMatrix, triple: &FinderTriple, dim: usize) -> BarcodeResult<Homography> {
    let d = dim as f64;
    let FinderTriple { tl, tr, bl } = *triple;
    let module = triple.module();
    let br_est = Point::new(tr.center.x - tl.center.x + bl.center.x, tr.center.y - tl.center.y + bl.center.y);

    let version = Version::from_width(dim)?;
    if *version >= 2 {
        // Bottom right alignment centre sits three modules in from the corner finder position
        let corr = 1.0 - 3.0 / (d - 7.0);
        let est = Point::new(
            tl.center.x + corr * (br_est.x - tl.center.x),
            tl.center.y + corr * (br_est.y - tl.center.y),
        );
        for allowance in [4.0, 8.0, 16.0] {
            if let Some(align) = find_alignment(img, est, module, allowance) {
                trace!(x = align.x, y = align.y, "Found alignment pattern");
                let src = [
                    Point::new(3.5, 3.5),
                    Point::new(d - 3.5, 3.5),
                    Point::new(3.5, d - 3.5),
                    Point::new(d - 6.5, d - 6.5),
                ];
                return Homography::compute(src, [tl.center, tr.center, bl.center, align]);
            }
        }
    }

    let src = [Point::new(3.5, 3.5), Point::new(d - 3.5, 3.5), Point::new(3.5, d - 3.5), Point::new(d - 3.5, d - 3.5)];
    Homography::compute(src, [tl.center, tr.center, bl.center, br_est])
}

fn sample(img: &BitMatrix, h: &Homography, dim: usize) -> BarcodeResult<BitMatrix> {
    let (w, ht) = (img.width() as f64, img.height() as f64);
    let mut res = BitMatrix::square(dim);
    for y in 0..dim {
        for x in 0..dim {
            let p = h.map(x as f64 + 0.5, y as f64 + 0.5)?;
            if p.x < -1.0 || p.y < -1.0 || p.x > w + 1.0 || p.y > ht + 1.0 {
                return Err(BarcodeError::OutOfBounds);
            }
            let px = (p.x.floor().max(0.0) as usize).min(img.width() - 1);
            let py = (p.y.floor().max(0.0) as usize).min(img.height() - 1);
            res.set(x, y, img.get(px, py));
        }
    }
    Ok(res)
}

// Infos
//------------------------------------------------------------------------------

fn read_format(grid: &BitMatrix) -> BarcodeResult<(ECLevel, MaskPattern)> {
    let valid = valid_format_infos();
    let (first, second) = format_positions(grid.width());
    for copy in [first, second] {
        let raw = copy.iter().enumerate().fold(0u32, |acc, (i, &(x, y))| acc | ((grid.get(x, y) as u32) << i));
        if let Ok(info) = rectify_info(raw, &valid, 3) {
            let (ecl, mask) = parse_format_info(info);
            return Ok((ecl, MaskPattern::new(mask)));
        }
    }
    Err(BarcodeError::InvalidFormatInfo)
}

fn read_version(grid: &BitMatrix) -> BarcodeResult<Version> {
    let w = grid.width();
    let valid = valid_version_infos();
    for transpose in [false, true] {
        let mut raw = 0u32;
        for i in 0..18 {
            let (a, b) = (w - 11 + i % 3, i / 3);
            let dark = if transpose { grid.get(b, a) } else { grid.get(a, b) };
            raw |= (dark as u32) << i;
        }
        if let Ok(info) = rectify_info(raw, &valid, 3) {
            return Ok(Version::new((info >> 12) as u8));
        }
    }
    Err(BarcodeError::InvalidVersionInfo)
}

// Decode
//------------------------------------------------------------------------------

fn decode_grid(grid: BitMatrix, version: Version, fallback: Option<Charset>) -> BarcodeResult<String> {
    let (ecl, mask) = read_format(&grid)?;
    debug!(version = *version, ecl = %ecl, mask = *mask, "Read QR format info");

    let mut qr = QrGrid::from_modules(version, grid);
    qr.apply_mask(mask);
    let codewords = qr.read_codewords();

    let ec_len = version.ec_per_block(ecl);
    let mut data = Vec::with_capacity(version.data_codewords(ecl));
    for (dlen, mut blk) in deinterleave(&codewords, version, ecl) {
        rectify_bytes(qr_field(), &mut blk, ec_len)?;
        data.extend_from_slice(&blk[..dlen]);
    }

    decode_data(&data, version, fallback)
}

fn decode_triple(img: &BitMatrix, triple: &FinderTriple, fallback: Option<Charset>) -> BarcodeResult<String> {
    let mut dim = triple.dimension().ok_or(BarcodeError::SymbolNotFound)?;
    let h = projection(img, triple, dim)?;
    let mut grid = sample(img, &h, dim)?;

    let mut version = Version::from_width(dim)?;
    if *version >= 7 {
        let read = read_version(&grid)?;
        if read != version {
            trace!(estimated = *version, read = *read, "Version info disagrees with finder spacing");
            version = read;
            dim = version.width();
            let h = projection(img, triple, dim)?;
            grid = sample(img, &h, dim)?;
        }
    }

    decode_grid(grid, version, fallback)
}

/// Locates and decodes a QR symbol in a binarized image.
pub fn decode(img: &BitMatrix, try_harder: bool, fallback: Option<Charset>) -> BarcodeResult<String> {
    let finders = locate_finders(img, try_harder);
    let triples = select_triples(&finders, try_harder);
    let mut err = BarcodeError::SymbolNotFound;
    for triple in triples.iter().take(if try_harder { 16 } else { 6 }) {
        match decode_triple(img, triple, fallback) {
            Ok(text) => return Ok(text),
            Err(e) => {
                trace!(error = %e, "QR candidate rejected");
                err = e;
            }
        }
    }
    Err(err)
}

#[cfg(test)]
mod detect_tests {
    use super::*;
    use crate::qr::codec::encode_data;
    use crate::qr::matrix::build;

    // Renders modules at `scale` pixels with a four module quiet zone
    fn render(modules: &BitMatrix, scale: usize) -> BitMatrix {
        let w = modules.width();
        let size = (w + 8) * scale;
        let mut img = BitMatrix::square(size);
        for y in 0..w {
            for x in 0..w {
                if modules.get(x, y) {
                    img.fill_rect((x + 4) * scale, (y + 4) * scale, scale, scale, true);
                }
            }
        }
        img
    }

    fn encode(text: &str, ecl: ECLevel) -> BitMatrix {
        let (v, data) = encode_data(text, ecl, None).unwrap();
        build(&data, v, ecl).into_modules()
    }

    #[test]
    fn test_decode_grid() {
        let modules = encode("hello QR", ECLevel::M);
        let v = Version::from_width(modules.width()).unwrap();
        assert_eq!(decode_grid(modules, v, None).unwrap(), "hello QR");
    }

    #[test]
    fn test_decode_grid_with_errors() {
        let mut modules = encode("Reed-Solomon keeps this readable", ECLevel::H);
        let v = Version::from_width(modules.width()).unwrap();
        for i in 0..6 {
            modules.flip(10 + i, 12);
        }
        assert_eq!(decode_grid(modules, v, None).unwrap(), "Reed-Solomon keeps this readable");
    }

    #[test]
    fn test_decode_image() {
        let modules = encode("HELLO WORLD", ECLevel::Q);
        let img = render(&modules, 4);
        assert_eq!(decode(&img, false, None).unwrap(), "HELLO WORLD");
    }

    #[test]
    fn test_decode_large_version() {
        let text = "x".repeat(300);
        let modules = encode(&text, ECLevel::L);
        assert!(modules.width() >= 45, "Expected version info to be present");
        let img = render(&modules, 3);
        assert_eq!(decode(&img, false, None).unwrap(), text);
    }

    #[test]
    fn test_decode_rotated() {
        let modules = encode("rotated", ECLevel::M);
        let img = render(&modules, 5).rotate90();
        assert_eq!(decode(&img, false, None).unwrap(), "rotated");
    }

    #[test]
    fn test_blank() {
        let img = BitMatrix::square(100);
        assert_eq!(decode(&img, true, None).unwrap_err(), BarcodeError::SymbolNotFound);
    }
}
