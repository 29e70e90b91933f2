use tracing::trace;

use super::version::SymbolSize;
use crate::common::{BarcodeError, BarcodeResult, BitMatrix};

// Edge classification
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Solid,
    Clock,
    Other,
}

fn classify(cells: impl Iterator<Item = bool>) -> (Edge, usize) {
    let (mut dark, mut total, mut runs, mut prev) = (0usize, 0usize, 0usize, false);
    for c in cells {
        total += 1;
        if c {
            dark += 1;
            if !prev {
                runs += 1;
            }
        }
        prev = c;
    }
    if total == 0 {
        return (Edge::Other, 0);
    }
    let edge = if dark * 20 >= total * 19 {
        Edge::Solid
    } else if dark * 10 >= total * 3 && dark * 10 <= total * 7 && runs >= 5 {
        Edge::Clock
    } else {
        Edge::Other
    };
    (edge, runs)
}

fn crop(img: &BitMatrix, l: usize, t: usize, r: usize, b: usize) -> BitMatrix {
    let mut res = BitMatrix::new(r - l + 1, b - t + 1);
    for y in t..=b {
        for x in l..=r {
            if img.get(x, y) {
                res.set(x - l, y - t, true);
            }
        }
    }
    res
}

// Detector
//------------------------------------------------------------------------------

/// Finds the symbol by its bounding box, turns it so the solid L sits on the left and
/// bottom, reads the dimension off the top clock track and samples module centres.
pub fn detect(img: &BitMatrix) -> BarcodeResult<BitMatrix> {
    let (l, t, r, b) = img.bounding_box().ok_or(BarcodeError::SymbolNotFound)?;
    if r - l < 9 || b - t < 9 {
        return Err(BarcodeError::SymbolNotFound);
    }

    let mut sym = crop(img, l, t, r, b);
    for turn in 0..4 {
        let (w, h) = (sym.width(), sym.height());
        let (left, _) = classify((0..h).map(|y| sym.get(0, y)));
        let (bottom, _) = classify((0..w).map(|x| sym.get(x, h - 1)));
        let (top, top_runs) = classify((0..w).map(|x| sym.get(x, 0)));
        let (right, right_runs) = classify((0..h).map(|y| sym.get(w - 1, y)));

        if left == Edge::Solid && bottom == Edge::Solid && top == Edge::Clock && right == Edge::Clock {
            // Every other module of a clock track is dark
            let dim = 2 * top_runs;
            if top_runs != right_runs {
                trace!(top_runs, right_runs, "Clock tracks disagree");
                return Err(BarcodeError::SymbolNotFound);
            }
            trace!(dim, turn, "Found DataMatrix finder");
            let size = SymbolSize::for_size(dim).map_err(|_| BarcodeError::SymbolNotFound)?;
            return sample(&sym, &size);
        }
        sym = sym.rotate90();
    }
    Err(BarcodeError::SymbolNotFound)
}

fn sample(sym: &BitMatrix, size: &SymbolSize) -> BarcodeResult<BitMatrix> {
    let dim = size.size;
    let (mw, mh) = (sym.width() as f64 / dim as f64, sym.height() as f64 / dim as f64);
    if mw < 1.0 || mh < 1.0 {
        return Err(BarcodeError::SymbolNotFound);
    }
    let mut grid = BitMatrix::square(dim);
    for y in 0..dim {
        let py = ((y as f64 + 0.5) * mh) as usize;
        for x in 0..dim {
            let px = ((x as f64 + 0.5) * mw) as usize;
            grid.set(x, y, sym.get(px.min(sym.width() - 1), py.min(sym.height() - 1)));
        }
    }
    Ok(grid)
}

#[cfg(test)]
mod detect_tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify([true; 12].into_iter()).0, Edge::Solid);
        let clock: Vec<bool> = (0..12).map(|i| i % 2 == 0).collect();
        assert_eq!(classify(clock.into_iter()), (Edge::Clock, 6));
        assert_eq!(classify([false; 12].into_iter()).0, Edge::Other);
    }

    #[test]
    fn test_blank() {
        assert_eq!(detect(&BitMatrix::square(50)), Err(BarcodeError::SymbolNotFound));
    }
}
