//! Linear symbologies. Encoders produce one row of modules, decoders work on the run
//! lengths of a single scan line.

mod codabar;
mod code128;
mod code39;
mod code93;
mod itf;
mod upc_ean;

use tracing::trace;

use crate::common::{BarcodeError, BarcodeResult, BitMatrix};
use crate::symbology::BarcodeFormat;

// Module rows
//------------------------------------------------------------------------------

// Element width of a wide bar or space in the two-width symbologies
const WIDE: u8 = 3;

#[derive(Debug, Default)]
struct Bars(Vec<bool>);

impl Bars {
    // Appends alternating elements, the first one dark if `dark`
    fn push(&mut self, widths: &[u8], mut dark: bool) {
        for &w in widths {
            self.0.extend(std::iter::repeat(dark).take(w as usize));
            dark = !dark;
        }
    }

    // Appends a narrow/wide pattern, most significant of `len` bits first
    fn push_narrow_wide(&mut self, bits: u16, len: usize) {
        let widths: Vec<u8> = (0..len).map(|i| if bits >> (len - 1 - i) & 1 == 1 { WIDE } else { 1 }).collect();
        self.push(&widths, true);
    }

    fn gap(&mut self) {
        self.0.push(false);
    }
}

// Run lengths
//------------------------------------------------------------------------------

/// Run lengths of a row. The first run is always light, possibly empty, so dark runs
/// sit at odd indices.
pub fn runs(row: &[bool]) -> Vec<usize> {
    let mut res = vec![0usize];
    let mut dark = false;
    for &c in row {
        if c != dark {
            res.push(0);
            dark = c;
        }
        if let Some(last) = res.last_mut() {
            *last += 1;
        }
    }
    res
}

// Average variance of run lengths against a module pattern, scaled by total width.
// Returns infinity when a single element strays beyond `max_individual` modules.
fn variance(counters: &[usize], pattern: &[u8], max_individual: f32) -> f32 {
    let total: usize = counters.iter().sum();
    let modules: usize = pattern.iter().map(|&p| p as usize).sum();
    if total < modules || counters.len() != pattern.len() {
        return f32::INFINITY;
    }
    let unit = total as f32 / modules as f32;
    let max_individual = max_individual * unit;
    let mut sum = 0.0;
    for (&c, &p) in counters.iter().zip(pattern) {
        let v = (c as f32 - p as f32 * unit).abs();
        if v > max_individual {
            return f32::INFINITY;
        }
        sum += v;
    }
    sum / total as f32
}

fn best_match<P: AsRef<[u8]>>(counters: &[usize], patterns: &[P], max_avg: f32, max_individual: f32) -> Option<usize> {
    let (mut best, mut best_var) = (None, max_avg);
    for (i, p) in patterns.iter().enumerate() {
        let v = variance(counters, p.as_ref(), max_individual);
        if v < best_var {
            best = Some(i);
            best_var = v;
        }
    }
    best
}

// Reads elements as narrow or wide around the midpoint of the narrowest and widest,
// most significant bit first
fn narrow_wide(counters: &[usize]) -> Option<u16> {
    let min = *counters.iter().min()?;
    let max = *counters.iter().max()?;
    if min == 0 || max * 2 < min * 3 {
        return None;
    }
    let threshold = (min + max) as f32 / 2.0;
    Some(counters.iter().fold(0u16, |p, &c| (p << 1) | (c as f32 > threshold) as u16))
}

// Light run before the dark run at `i` is at least `min` pixels wide
fn quiet_before(runs: &[usize], i: usize, min: f32) -> bool {
    i >= 1 && runs[i - 1] as f32 >= min
}

// Light run after the element ending at `i` is wide enough, or the row ends there
fn quiet_after(runs: &[usize], i: usize, min: f32) -> bool {
    i >= runs.len() || runs[i] as f32 >= min
}

// Encoding
//------------------------------------------------------------------------------

/// Encodes text into a single row of modules.
pub fn encode(data: &str, format: BarcodeFormat) -> BarcodeResult<Vec<bool>> {
    if data.is_empty() {
        return Err(BarcodeError::EmptyData);
    }
    match format {
        BarcodeFormat::Code39 => code39::encode(data),
        BarcodeFormat::Code93 => code93::encode(data),
        BarcodeFormat::Code128 => code128::encode(data),
        BarcodeFormat::Codabar => codabar::encode(data),
        BarcodeFormat::Itf => itf::encode(data),
        BarcodeFormat::UpcA | BarcodeFormat::UpcE | BarcodeFormat::Ean8 | BarcodeFormat::Ean13 => {
            upc_ean::encode(data, format)
        }
        _ => Err(BarcodeError::UnsupportedFormat),
    }
}

// Decoding
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearOptions {
    pub try_harder: bool,
    pub code39_full_ascii: bool,
}

fn decode_runs(runs: &[usize], formats: &[BarcodeFormat], opts: LinearOptions) -> Option<(BarcodeFormat, String)> {
    let wants = |f: BarcodeFormat| formats.contains(&f);
    let upc_ean = [BarcodeFormat::UpcA, BarcodeFormat::UpcE, BarcodeFormat::Ean8, BarcodeFormat::Ean13];
    if upc_ean.iter().any(|&f| wants(f)) {
        if let Some(res) = upc_ean::decode(runs, formats) {
            return Some(res);
        }
    }
    const ORDER: [BarcodeFormat; 5] =
        [BarcodeFormat::Code39, BarcodeFormat::Code93, BarcodeFormat::Code128, BarcodeFormat::Itf, BarcodeFormat::Codabar];
    ORDER.into_iter().filter(|&f| wants(f)).find_map(|f| {
        let text = match f {
            BarcodeFormat::Code39 => code39::decode(runs, opts.code39_full_ascii),
            BarcodeFormat::Code93 => code93::decode(runs),
            BarcodeFormat::Code128 => code128::decode(runs),
            BarcodeFormat::Itf => itf::decode(runs),
            _ => codabar::decode(runs),
        }?;
        Some((f, text))
    })
}

fn scan(img: &BitMatrix, formats: &[BarcodeFormat], opts: LinearOptions) -> Option<(BarcodeFormat, String)> {
    let h = img.height();
    if h == 0 || img.width() == 0 {
        return None;
    }
    let step = (h >> if opts.try_harder { 8 } else { 5 }).max(1);
    let max_lines = if opts.try_harder { h } else { 15 };
    let middle = h / 2;

    // Rows alternate above and below the middle, moving outwards
    for i in 0..max_lines {
        let offset = (i + 1) / 2 * step;
        let y = if i % 2 == 0 { middle.checked_add(offset) } else { middle.checked_sub(offset) };
        let Some(y) = y.filter(|&y| y < h) else { break };

        let row = img.row(y);
        if let Some(res) = decode_runs(&runs(row), formats, opts) {
            trace!(y, format = %res.0, "Decoded linear symbol");
            return Some(res);
        }
        let reversed: Vec<bool> = row.iter().rev().copied().collect();
        if let Some(res) = decode_runs(&runs(&reversed), formats, opts) {
            trace!(y, format = %res.0, "Decoded reversed linear symbol");
            return Some(res);
        }
    }
    None
}

/// Scans rows of a binarized image for any of the linear `formats`. Trying harder scans
/// every row and then the image turned a quarter.
pub fn decode(img: &BitMatrix, formats: &[BarcodeFormat], opts: LinearOptions) -> BarcodeResult<(BarcodeFormat, String)> {
    if let Some(res) = scan(img, formats, opts) {
        return Ok(res);
    }
    if opts.try_harder {
        if let Some(res) = scan(&img.rotate90(), formats, opts) {
            return Ok(res);
        }
    }
    Err(BarcodeError::SymbolNotFound)
}

#[cfg(test)]
pub(crate) mod oned_tests {
    use super::*;
    use test_case::test_case;

    /// Draws a module row `scale` pixels per module with a quiet zone, `height` rows tall.
    pub(crate) fn render(modules: &[bool], scale: usize, height: usize) -> BitMatrix {
        let quiet = 12;
        let mut img = BitMatrix::new((modules.len() + 2 * quiet) * scale, height);
        for (i, &dark) in modules.iter().enumerate() {
            if dark {
                img.fill_rect((i + quiet) * scale, 0, scale, height, true);
            }
        }
        img
    }

    #[test]
    fn test_runs() {
        assert_eq!(runs(&[true, true, false, true]), vec![0, 2, 1, 1]);
        assert_eq!(runs(&[false, false, true]), vec![2, 1]);
        assert_eq!(runs(&[]), vec![0]);
    }

    #[test]
    fn test_variance() {
        assert_eq!(variance(&[2, 4, 2], &[1, 2, 1], 0.7), 0.0);
        assert!(variance(&[2, 2, 2], &[1, 2, 1], 0.7) > 0.0);
        assert_eq!(variance(&[1, 8, 1], &[1, 2, 1], 0.7), f32::INFINITY);
    }

    #[test]
    fn test_narrow_wide() {
        assert_eq!(narrow_wide(&[2, 6, 2, 2, 6]), Some(0b01001));
        assert_eq!(narrow_wide(&[3, 3, 3]), None);
    }

    #[test_case("CODE39 TEST", BarcodeFormat::Code39)]
    #[test_case("Code 93 mixed", BarcodeFormat::Code93)]
    #[test_case("Code128 ABC-0123456789", BarcodeFormat::Code128)]
    #[test_case("A40156B", BarcodeFormat::Codabar)]
    #[test_case("12345678", BarcodeFormat::Itf)]
    #[test_case("4006381333931", BarcodeFormat::Ean13)]
    #[test_case("96385074", BarcodeFormat::Ean8)]
    #[test_case("012345678905", BarcodeFormat::UpcA)]
    #[test_case("01234565", BarcodeFormat::UpcE)]
    fn test_image_roundtrip(text: &str, format: BarcodeFormat) {
        let modules = encode(text, format).unwrap();
        let img = render(&modules, 2, 20);
        let expected = if format == BarcodeFormat::Codabar { &text[1..text.len() - 1] } else { text };
        assert_eq!(decode(&img, &BarcodeFormat::ALL, LinearOptions::default()).unwrap(), (format, expected.to_string()));
    }

    #[test]
    fn test_reversed_and_rotated() {
        let modules = encode("REVERSED", BarcodeFormat::Code128).unwrap();
        let mut img = render(&modules, 3, 30);
        img = img.rotate90().rotate90();
        assert_eq!(decode(&img, &[BarcodeFormat::Code128], LinearOptions::default()).unwrap().1, "REVERSED");

        let turned = img.rotate90();
        assert!(decode(&turned, &[BarcodeFormat::Code128], LinearOptions::default()).is_err());
        let opts = LinearOptions { try_harder: true, ..Default::default() };
        assert_eq!(decode(&turned, &[BarcodeFormat::Code128], opts).unwrap().1, "REVERSED");
    }

    #[test]
    fn test_blank() {
        let img = BitMatrix::new(200, 200);
        assert_eq!(decode(&img, &BarcodeFormat::ALL, LinearOptions::default()), Err(BarcodeError::SymbolNotFound));
    }
}
