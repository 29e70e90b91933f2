use std::ops::Deref;

use crate::common::BitMatrix;

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord)]
pub struct MaskPattern(u8);

impl MaskPattern {
    pub fn new(pattern: u8) -> Self {
        debug_assert!(pattern < 8, "Invalid masking pattern");
        Self(pattern & 0b111)
    }

    pub fn all() -> impl Iterator<Item = MaskPattern> {
        (0..8).map(MaskPattern)
    }
}

impl Deref for MaskPattern {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

mod mask_functions {
    pub fn checkerboard(x: usize, y: usize) -> bool {
        (x + y) & 1 == 0
    }

    pub fn horizontal_lines(_: usize, y: usize) -> bool {
        y & 1 == 0
    }

    pub fn vertical_lines(x: usize, _: usize) -> bool {
        x % 3 == 0
    }

    pub fn diagonal_lines(x: usize, y: usize) -> bool {
        (x + y) % 3 == 0
    }

    pub fn large_checkerboard(x: usize, y: usize) -> bool {
        ((y >> 1) + (x / 3)) & 1 == 0
    }

    pub fn fields(x: usize, y: usize) -> bool {
        ((x * y) & 1) + ((x * y) % 3) == 0
    }

    pub fn diamonds(x: usize, y: usize) -> bool {
        (((x * y) & 1) + ((x * y) % 3)) & 1 == 0
    }

    pub fn meadow(x: usize, y: usize) -> bool {
        (((x + y) & 1) + ((x * y) % 3)) & 1 == 0
    }
}

impl MaskPattern {
    // x is the column, y the row
    pub fn mask_function(self) -> fn(usize, usize) -> bool {
        match *self {
            0b000 => mask_functions::checkerboard,
            0b001 => mask_functions::horizontal_lines,
            0b010 => mask_functions::vertical_lines,
            0b011 => mask_functions::diagonal_lines,
            0b100 => mask_functions::large_checkerboard,
            0b101 => mask_functions::fields,
            0b110 => mask_functions::diamonds,
            _ => mask_functions::meadow,
        }
    }
}

// Penalty
//------------------------------------------------------------------------------

pub fn compute_total_penalty(m: &BitMatrix) -> u32 {
    let adj_pen = compute_adjacent_penalty(m);
    let blk_pen = compute_block_penalty(m);
    let fp_pen_h = compute_finder_pattern_penalty(m, true);
    let fp_pen_v = compute_finder_pattern_penalty(m, false);
    let bal_pen = compute_balance_penalty(m);
    adj_pen + blk_pen + fp_pen_h + fp_pen_v + bal_pen
}

// Runs of five or more same coloured modules in a row or column
fn compute_adjacent_penalty(m: &BitMatrix) -> u32 {
    let w = m.width();
    let mut pen = 0;
    for is_hor in [true, false] {
        for i in 0..w {
            let mut last = None;
            let mut run = 0;
            for j in 0..w {
                let clr = if is_hor { m.get(j, i) } else { m.get(i, j) };
                if last == Some(clr) {
                    run += 1;
                } else {
                    last = Some(clr);
                    run = 1;
                }
                if run == 5 {
                    pen += 3;
                } else if run > 5 {
                    pen += 1;
                }
            }
        }
    }
    pen
}

fn compute_block_penalty(m: &BitMatrix) -> u32 {
    let mut pen = 0;
    let w = m.width();
    for y in 0..w - 1 {
        for x in 0..w - 1 {
            let clr = m.get(x, y);
            if clr == m.get(x + 1, y) && clr == m.get(x, y + 1) && clr == m.get(x + 1, y + 1) {
                pen += 3;
            }
        }
    }
    pen
}

fn compute_finder_pattern_penalty(m: &BitMatrix, is_hor: bool) -> u32 {
    static PATTERN: [bool; 7] = [true, false, true, true, true, false, true];
    let mut pen = 0;
    let w = m.width() as i32;
    for i in 0..w {
        let get = |j: i32| -> bool {
            if j < 0 || j >= w {
                return false;
            }
            if is_hor {
                m.get(j as usize, i as usize)
            } else {
                m.get(i as usize, j as usize)
            }
        };
        for j in 0..w - 6 {
            if !(j..j + 7).map(get).eq(PATTERN.iter().copied()) {
                continue;
            }
            // Four light modules on either side, the quiet zone counts as light
            if (j - 4..j).all(|k| !get(k)) || (j + 7..j + 11).all(|k| !get(k)) {
                pen += 40;
            }
        }
    }
    pen
}

fn compute_balance_penalty(m: &BitMatrix) -> u32 {
    let dark_cnt = m.count_dark();
    let w = m.width();
    let tot = w * w;
    // Every 5% away from an even split costs 10
    let ratio = dark_cnt * 20 / tot;
    let dev = if ratio < 10 { 10 - ratio - 1 } else { ratio - 10 };
    dev as u32 * 10
}

#[cfg(test)]
mod mask_tests {
    use super::*;

    #[test]
    fn test_mask_functions() {
        assert!(MaskPattern::new(0).mask_function()(0, 0));
        assert!(!MaskPattern::new(0).mask_function()(1, 0));
        assert!(MaskPattern::new(1).mask_function()(5, 2));
        assert!(MaskPattern::new(2).mask_function()(3, 7));
        assert!(!MaskPattern::new(4).mask_function()(3, 0));
    }

    #[test]
    fn test_adjacent_penalty() {
        let mut m = BitMatrix::square(7);
        // Every row and column of an all light 7x7 grid scores 3 + 2
        assert_eq!(compute_adjacent_penalty(&m), 14 * 5);
        m.fill_rect(0, 0, 7, 7, true);
        assert_eq!(compute_adjacent_penalty(&m), 14 * 5);
    }

    #[test]
    fn test_finder_penalty() {
        let mut m = BitMatrix::new(11, 11);
        for (x, &d) in [true, false, true, true, true, false, true].iter().enumerate() {
            m.set(x, 5, d);
        }
        assert_eq!(compute_finder_pattern_penalty(&m, true), 40);
        assert_eq!(compute_finder_pattern_penalty(&m, false), 0);
    }

    #[test]
    fn test_balance_penalty() {
        let mut m = BitMatrix::square(10);
        m.fill_rect(0, 0, 10, 5, true);
        assert_eq!(compute_balance_penalty(&m), 0);
        m.fill_rect(0, 5, 10, 5, true);
        assert_eq!(compute_balance_penalty(&m), 100);
    }
}
