use tracing::trace;

use crate::common::{BitMatrix, Point};

// Finder candidate
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Finder {
    pub center: Point,
    pub module: f64,
    pub count: u32,
}

impl Finder {
    fn about_equals(&self, center: &Point, module: f64) -> bool {
        (center.x - self.center.x).abs() <= module
            && (center.y - self.center.y).abs() <= module
            && (module - self.module).abs() <= 1.0f64.max(self.module * 0.5)
    }

    fn combine(&mut self, center: &Point, module: f64) {
        let n = self.count as f64;
        self.center.x = (self.center.x * n + center.x) / (n + 1.0);
        self.center.y = (self.center.y * n + center.y) / (n + 1.0);
        self.module = (self.module * n + module) / (n + 1.0);
        self.count += 1;
    }
}

// Line scanner to detect finder line
//------------------------------------------------------------------------------

// **   ******   **  <- Finder line, run lengths in 1:1:3:1:1
#[derive(Debug, Clone, Copy)]
struct LineScanner {
    buffer: [u32; 6], // Run length of each transition, last slot is the current run
    prev: Option<bool>,
    flips: u32,
}

impl LineScanner {
    fn new() -> Self {
        Self { buffer: [0; 6], prev: None, flips: 0 }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    // Returns the run lengths of a finder line that ended just before this pixel
    fn advance(&mut self, dark: bool, tol: f64) -> Option<[u32; 5]> {
        if self.prev == Some(dark) {
            self.buffer[5] += 1;
            return None;
        }

        let ended_dark = self.prev == Some(true);
        self.buffer.rotate_left(1);
        self.buffer[5] = 1;
        self.prev = Some(dark);
        self.flips += 1;

        let mut runs = [0; 5];
        runs.copy_from_slice(&self.buffer[..5]);
        (ended_dark && self.flips > 5 && is_finder_ratio(&runs, tol)).then_some(runs)
    }
}

// Validates whether run lengths are in the 1:1:3:1:1 ratio, tol in modules
fn is_finder_ratio(runs: &[u32; 5], tol: f64) -> bool {
    if runs.iter().any(|&r| r == 0) {
        return false;
    }
    let avg = runs.iter().sum::<u32>() as f64 / 7.0;
    if avg < 1.0 {
        return false;
    }
    let slack = avg * tol;

    let ratio: [f64; 5] = [1.0, 1.0, 3.0, 1.0, 1.0];
    ratio.iter().zip(runs.iter()).all(|(r, &rl)| {
        let rl = rl as f64;
        let allowed = if *r > 1.0 { slack * 2.0 } else { slack };
        (rl - r * avg).abs() <= allowed
    })
}

// Cross check
//------------------------------------------------------------------------------

// Counts the 1:1:3:1:1 runs through (x, y) along one axis and returns the
// refined centre coordinate on that axis with the pattern length
fn cross_check(img: &BitMatrix, x: i32, y: i32, vertical: bool, max_count: u32, tol: f64) -> Option<(f64, u32)> {
    let get = |d: i32| if vertical { img.get_i(x, y + d) } else { img.get_i(x + d, y) };
    let limit = if vertical { img.height() as i32 } else { img.width() as i32 };
    let origin = if vertical { y } else { x };
    let in_range = |d: i32| origin + d >= 0 && origin + d < limit;

    if !get(0) {
        return None;
    }

    let mut runs = [0u32; 5];
    // Backwards: centre, inner ring, outer ring
    let mut d = 0;
    while in_range(d) && get(d) {
        runs[2] += 1;
        d -= 1;
    }
    while in_range(d) && !get(d) && runs[1] <= max_count {
        runs[1] += 1;
        d -= 1;
    }
    while in_range(d) && get(d) && runs[0] <= max_count {
        runs[0] += 1;
        d -= 1;
    }

    // Forwards
    let mut d = 1;
    while in_range(d) && get(d) {
        runs[2] += 1;
        d += 1;
    }
    while in_range(d) && !get(d) && runs[3] <= max_count {
        runs[3] += 1;
        d += 1;
    }
    while in_range(d) && get(d) && runs[4] <= max_count {
        runs[4] += 1;
        d += 1;
    }

    if !is_finder_ratio(&runs, tol) {
        return None;
    }
    let end = (origin + d) as f64;
    let centre = end - runs[4] as f64 - runs[3] as f64 - runs[2] as f64 / 2.0;
    Some((centre, runs.iter().sum()))
}

// Locate finders
//------------------------------------------------------------------------------

/// Scans every row for 1:1:3:1:1 runs and confirms them along the column and the row
/// through the refined centre. Returns merged candidates, most confirmed first.
pub fn locate_finders(img: &BitMatrix, try_harder: bool) -> Vec<Finder> {
    let tol = if try_harder { 0.75 } else { 0.5 };
    let (w, h) = (img.width(), img.height());
    let mut finders: Vec<Finder> = Vec::new();
    let mut scanner = LineScanner::new();

    for y in 0..h {
        scanner.reset();
        // A trailing light pixel flushes symbols touching the right edge
        for x in 0..=w {
            let dark = x < w && img.get(x, y);
            let runs = match scanner.advance(dark, tol) {
                Some(r) => r,
                None => continue,
            };
            if let Some((center, module)) = verify_finder(img, x, y, &runs, tol) {
                match finders.iter_mut().find(|f| f.about_equals(&center, module)) {
                    Some(f) => f.combine(&center, module),
                    None => finders.push(Finder { center, module, count: 1 }),
                }
            }
        }
    }

    finders.sort_by(|a, b| b.count.cmp(&a.count));
    trace!(candidates = finders.len(), "Located finder candidates");
    finders
}

fn verify_finder(img: &BitMatrix, end_x: usize, y: usize, runs: &[u32; 5], tol: f64) -> Option<(Point, f64)> {
    let total: u32 = runs.iter().sum();
    let cx = end_x as f64 - runs[4] as f64 - runs[3] as f64 - runs[2] as f64 / 2.0;

    let (cy, v_total) = cross_check(img, cx as i32, y as i32, true, runs[2], tol)?;
    if 5 * v_total.abs_diff(total) >= 2 * total {
        return None;
    }
    let (cx, h_total) = cross_check(img, cx as i32, cy as i32, false, runs[2], tol)?;
    if 5 * h_total.abs_diff(total) >= 2 * total {
        return None;
    }

    let module = (v_total + h_total) as f64 / 14.0;
    Some((Point::new(cx, cy), module))
}

// Triple selection
//------------------------------------------------------------------------------

/// Finder triple ordered as (top left, top right, bottom left).
#[derive(Debug, Clone, Copy)]
pub struct FinderTriple {
    pub tl: Finder,
    pub tr: Finder,
    pub bl: Finder,
}

impl FinderTriple {
    pub fn module(&self) -> f64 {
        (self.tl.module + self.tr.module + self.bl.module) / 3.0
    }

    // Symbol width in modules implied by the finder spacing, snapped to 17 + 4v
    pub fn dimension(&self) -> Option<usize> {
        let m = self.module();
        let tltr = (self.tl.center.dist(&self.tr.center) / m).round();
        let tlbl = (self.tl.center.dist(&self.bl.center) / m).round();
        let mut dim = ((tltr + tlbl) / 2.0).round() as i64 + 7;
        match dim & 0b11 {
            0 => dim += 1,
            2 => dim -= 1,
            3 => dim += 2,
            _ => {}
        }
        (21..=177).contains(&dim).then_some(dim as usize)
    }
}

/// Candidate triples that plausibly form a symbol, best fit first.
pub fn select_triples(finders: &[Finder], try_harder: bool) -> Vec<FinderTriple> {
    let top = &finders[..finders.len().min(if try_harder { 12 } else { 8 })];
    let leg_tol = if try_harder { 0.4 } else { 0.25 };
    let mut scored = Vec::new();

    for i in 0..top.len() {
        for j in i + 1..top.len() {
            for k in j + 1..top.len() {
                let (a, b, c) = (top[i], top[j], top[k]);
                let sizes = [a.module, b.module, c.module];
                let max = sizes.iter().cloned().fold(f64::MIN, f64::max);
                let min = sizes.iter().cloned().fold(f64::MAX, f64::min);
                if max > min * 1.5 {
                    continue;
                }

                // Corner opposite the longest side is the top left
                let (dab, dbc, dac) = (a.center.dist(&b.center), b.center.dist(&c.center), a.center.dist(&c.center));
                let (tl, p, q, hyp) = if dbc >= dab && dbc >= dac {
                    (a, b, c, dbc)
                } else if dac >= dab && dac >= dbc {
                    (b, a, c, dac)
                } else {
                    (c, a, b, dab)
                };
                let (l1, l2) = (tl.center.dist(&p.center), tl.center.dist(&q.center));
                let leg_err = (l1 - l2).abs() / l1.max(l2);
                let hyp_err = ((l1 * l1 + l2 * l2).sqrt() - hyp).abs() / hyp;
                if leg_err > leg_tol || hyp_err > 0.15 || l1.min(l2) < 10.0 * min {
                    continue;
                }

                // Top right sits clockwise from top left in image coordinates
                let (tr, bl) = if Point::cross(&tl.center, &p.center, &q.center) > 0.0 { (p, q) } else { (q, p) };
                let triple = FinderTriple { tl, tr, bl };
                if triple.dimension().is_none() {
                    continue;
                }
                let size_err = (max - min) / max;
                scored.push((leg_err + hyp_err + size_err, triple));
            }
        }
    }

    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().map(|(_, t)| t).collect()
}

#[cfg(test)]
mod finder_tests {
    use super::*;

    // Draws a 7x7 finder of `m` pixel modules with its top left at (x, y)
    fn draw_finder(img: &mut BitMatrix, x: usize, y: usize, m: usize) {
        img.fill_rect(x, y, 7 * m, 7 * m, true);
        img.fill_rect(x + m, y + m, 5 * m, 5 * m, false);
        img.fill_rect(x + 2 * m, y + 2 * m, 3 * m, 3 * m, true);
    }

    #[test]
    fn test_finder_ratio() {
        assert!(is_finder_ratio(&[4, 4, 12, 4, 4], 0.5));
        assert!(is_finder_ratio(&[3, 5, 11, 4, 4], 0.5));
        assert!(!is_finder_ratio(&[4, 4, 4, 4, 4], 0.5));
        assert!(!is_finder_ratio(&[0, 4, 12, 4, 4], 0.5));
    }

    #[test]
    fn test_locate_single() {
        let mut img = BitMatrix::square(60);
        draw_finder(&mut img, 10, 20, 4);
        let finders = locate_finders(&img, false);
        assert_eq!(finders.len(), 1);
        let f = finders[0];
        assert!((f.center.x - 24.0).abs() < 1.0 && (f.center.y - 34.0).abs() < 1.0, "Centre {f:?}");
        assert!((f.module - 4.0).abs() < 0.5);
    }

    #[test]
    fn test_select_triple() {
        let mut img = BitMatrix::square(200);
        // Finders of a 25 module symbol at 5 px per module
        draw_finder(&mut img, 20, 20, 5);
        draw_finder(&mut img, 20 + 18 * 5, 20, 5);
        draw_finder(&mut img, 20, 20 + 18 * 5, 5);
        let finders = locate_finders(&img, false);
        assert_eq!(finders.len(), 3);
        let triples = select_triples(&finders, false);
        let t = triples.first().unwrap();
        assert!(t.tl.center.x < t.tr.center.x && t.tl.center.y < t.bl.center.y);
        assert_eq!(t.dimension(), Some(25));
    }

    #[test]
    fn test_finder_at_edge() {
        let mut img = BitMatrix::square(40);
        draw_finder(&mut img, 0, 0, 3);
        assert_eq!(locate_finders(&img, false).len(), 1);
    }
}
