use tracing::{debug, trace};

use super::layout::{orientation_marks, Layout};
use crate::common::ec::{aztec_param_field, rectify};
use crate::common::{BarcodeError, BarcodeResult, BitMatrix, BitStream};

// Bullseye search
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Run {
    dark: bool,
    start: usize,
    len: usize,
}

fn runs(cells: impl Iterator<Item = bool>) -> Vec<Run> {
    let mut res: Vec<Run> = Vec::new();
    for (i, c) in cells.enumerate() {
        match res.last_mut() {
            Some(r) if r.dark == c => r.len += 1,
            _ => res.push(Run { dark: c, start: i, len: 1 }),
        }
    }
    res
}

// Looks for light, dark, light, dark, light, dark, light runs of equal width centred
// on run `i`, framed by the dark fourth ring. Returns centre and module width.
fn bullseye_at(rs: &[Run], i: usize) -> Option<(f64, f64)> {
    if i < 4 || i + 4 >= rs.len() || !rs[i].dark {
        return None;
    }
    let inner = &rs[i - 3..=i + 3];
    let avg = inner.iter().map(|r| r.len).sum::<usize>() as f64 / 7.0;
    let even = |len: usize| (len as f64) >= avg * 0.5 && (len as f64) <= avg * 1.5;
    if !inner.iter().all(|r| even(r.len)) || (rs[i - 4].len as f64) < avg * 0.5 || (rs[i + 4].len as f64) < avg * 0.5 {
        return None;
    }
    Some((rs[i].start as f64 + rs[i].len as f64 / 2.0, avg))
}

fn bullseye_through(rs: &[Run], pos: usize) -> Option<(f64, f64)> {
    let i = rs.iter().position(|r| pos >= r.start && pos < r.start + r.len)?;
    bullseye_at(rs, i)
}

#[derive(Debug, Clone, Copy)]
struct Centre {
    x: f64,
    y: f64,
    mx: f64,
    my: f64,
}

fn find_centres(img: &BitMatrix) -> Vec<Centre> {
    let (w, h) = (img.width(), img.height());
    let mut res: Vec<Centre> = Vec::new();
    for y in 0..h {
        let row = runs((0..w).map(|x| img.get(x, y)));
        for i in 0..row.len() {
            let Some((x, _)) = bullseye_at(&row, i) else { continue };
            let col = runs((0..h).map(|yy| img.get(x as usize, yy)));
            let Some((cy, my)) = bullseye_through(&col, y) else { continue };
            let row = runs((0..w).map(|xx| img.get(xx, cy as usize)));
            let Some((cx, mx)) = bullseye_through(&row, x as usize) else { continue };

            let seen = res.iter().any(|c| (c.x - cx).abs() < 2.0 * mx && (c.y - cy).abs() < 2.0 * my);
            if !seen {
                trace!(cx, cy, mx, my, "Bullseye candidate");
                res.push(Centre { x: cx, y: cy, mx, my });
            }
        }
    }
    res
}

// Sampling around a centre
//------------------------------------------------------------------------------

struct Sampler<'a> {
    img: &'a BitMatrix,
    centre: Centre,
    // Quarter turns clockwise from symbol to image
    turns: usize,
}

impl Sampler<'_> {
    fn at(&self, dx: i32, dy: i32) -> Option<bool> {
        let (mut x, mut y) = (dx, dy);
        for _ in 0..self.turns {
            (x, y) = (-y, x);
        }
        let px = (self.centre.x + x as f64 * self.centre.mx).floor();
        let py = (self.centre.y + y as f64 * self.centre.my).floor();
        if px < 0.0 || py < 0.0 || px >= self.img.width() as f64 || py >= self.img.height() as f64 {
            return None;
        }
        Some(self.img.get(px as usize, py as usize))
    }

    // Count of ring modules at distance `d` that differ from `dark`
    fn ring_mismatches(&self, d: i32, dark: bool) -> Option<usize> {
        let mut miss = 0;
        for i in -d..d {
            for (x, y) in [(i, -d), (d, i), (-i, d), (-d, -i)] {
                if self.at(x, y)? != dark {
                    miss += 1;
                }
            }
        }
        Some(miss)
    }

    fn orientation_mismatches(&self, r: i32) -> Option<usize> {
        let mut miss = 0;
        for ((x, y), dark) in orientation_marks(r) {
            if self.at(x, y)? != dark {
                miss += 1;
            }
        }
        Some(miss)
    }
}

fn is_ring(s: &Sampler, d: i32, dark: bool) -> bool {
    s.ring_mismatches(d, dark).is_some_and(|m| m <= d as usize)
}

// Mode message
//------------------------------------------------------------------------------

fn read_mode(s: &Sampler, compact: bool) -> BarcodeResult<(usize, usize)> {
    let mut bits = BitStream::new();
    for (x, y) in Layout::new(compact, 1).mode_positions() {
        bits.push(s.at(x, y).ok_or(BarcodeError::OutOfBounds)?);
    }
    let mut words = bits.words(4);
    let data = if compact { 2 } else { 4 };
    let ec_len = words.len() - data;
    rectify(aztec_param_field(), &mut words, ec_len)?;
    let v = words[..data].iter().fold(0usize, |v, &w| (v << 4) | w as usize);
    Ok(if compact { ((v >> 6) + 1, (v & 0x3F) + 1) } else { ((v >> 11) + 1, (v & 0x7FF) + 1) })
}

// Detector
//------------------------------------------------------------------------------

/// Detected symbol: the module grid in upright orientation plus its geometry.
pub struct Detected {
    pub layout: Layout,
    pub data_words: usize,
    pub grid: BitMatrix,
}

fn detect_at(img: &BitMatrix, centre: Centre) -> BarcodeResult<Detected> {
    let mut s = Sampler { img, centre, turns: 0 };
    if !(1..=4).all(|d| is_ring(&s, d, d % 2 == 0)) {
        return Err(BarcodeError::SymbolNotFound);
    }
    let compact = !(is_ring(&s, 5, false) && is_ring(&s, 6, true));
    let layout = Layout::new(compact, 1);
    let r = layout.core_radius() as i32;

    let turns = (0..4)
        .filter_map(|k| {
            s.turns = k;
            s.orientation_mismatches(r).map(|m| (m, k))
        })
        .min()
        .filter(|&(m, _)| m <= 2)
        .map(|(_, k)| k)
        .ok_or(BarcodeError::SymbolNotFound)?;
    s.turns = turns;

    let (layers, data_words) = read_mode(&s, compact)?;
    let layout = Layout::new(compact, layers);
    debug!(compact, layers, data_words, turns, "Found Aztec symbol");

    let size = layout.size();
    let c = (size / 2) as i32;
    let mut grid = BitMatrix::square(size);
    for y in 0..size {
        for x in 0..size {
            let dark = s.at(x as i32 - c, y as i32 - c).ok_or(BarcodeError::OutOfBounds)?;
            grid.set(x, y, dark);
        }
    }
    Ok(Detected { layout, data_words, grid })
}

/// Locates a bullseye, reads the mode message and samples the upright module grid.
/// Handles axis aligned symbols in any of the four quarter turns.
pub fn detect(img: &BitMatrix) -> BarcodeResult<Detected> {
    let mut err = BarcodeError::SymbolNotFound;
    for centre in find_centres(img) {
        match detect_at(img, centre) {
            Ok(d) => return Ok(d),
            Err(e) => {
                trace!(?e, "Rejected bullseye candidate");
                if e != BarcodeError::SymbolNotFound {
                    err = e;
                }
            }
        }
    }
    Err(err)
}

#[cfg(test)]
mod detect_tests {
    use super::*;

    #[test]
    fn test_runs() {
        let rs = runs([true, true, false, true].into_iter());
        assert_eq!(rs.len(), 3);
        assert_eq!((rs[1].start, rs[1].len, rs[1].dark), (2, 1, false));
    }

    #[test]
    fn test_bullseye_row() {
        // Ring 4 dark through ring 0 and back, two pixels per module
        let cells: Vec<bool> =
            (0..9).flat_map(|i: i32| [(i - 4).abs() % 2 == 0; 2]).chain([false; 4]).collect();
        let rs = runs(cells.into_iter());
        assert_eq!(bullseye_at(&rs, 4), Some((9.0, 2.0)));
        assert_eq!(bullseye_at(&rs, 2), None);
    }

    #[test]
    fn test_blank() {
        assert!(matches!(detect(&BitMatrix::square(60)), Err(BarcodeError::SymbolNotFound)));
    }
}
