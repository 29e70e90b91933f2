use crate::common::ec::{aztec_data_10_field, aztec_data_12_field, aztec_data_6_field, data_matrix_field, GaloisField};

// Symbol geometry
// Compact symbols have 1 to 4 layers around a 5 ring bullseye, full range symbols 1 to 32
// layers around a 7 ring bullseye with reference grid lines every 16 modules.
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub compact: bool,
    pub layers: usize,
}

impl Layout {
    pub fn new(compact: bool, layers: usize) -> Self {
        Self { compact, layers }
    }

    pub fn total_bits(&self) -> usize {
        ((if self.compact { 88 } else { 112 }) + 16 * self.layers) * self.layers
    }

    pub fn word_size(&self) -> usize {
        match self.layers {
            0..=2 => 6,
            3..=8 => 8,
            9..=22 => 10,
            _ => 12,
        }
    }

    // Side length without reference grid lines
    pub fn base_size(&self) -> usize {
        (if self.compact { 11 } else { 14 }) + self.layers * 4
    }

    pub fn size(&self) -> usize {
        let base = self.base_size();
        if self.compact {
            base
        } else {
            base + 1 + 2 * ((base / 2 - 1) / 15)
        }
    }

    // Bullseye radius, the orientation ring sits at this distance from the centre
    pub fn core_radius(&self) -> usize {
        if self.compact {
            5
        } else {
            7
        }
    }

    // Maps base coordinates to matrix coordinates, stepping over grid lines
    fn alignment_map(&self) -> Vec<usize> {
        let base = self.base_size();
        if self.compact {
            return (0..base).collect();
        }
        let mut map = vec![0; base];
        let (orig_center, center) = (base / 2, self.size() / 2);
        for i in 0..orig_center {
            let off = i + i / 15;
            map[orig_center - i - 1] = center - off - 1;
            map[orig_center + i] = center + off + 1;
        }
        map
    }

    /// Module (x, y) of every data bit, in message order. Layers are read from the
    /// outside in, each as four sides of two module wide dominoes.
    pub fn data_positions(&self) -> Vec<(usize, usize)> {
        let map = self.alignment_map();
        let base = self.base_size();
        let mut res = vec![(0, 0); self.total_bits()];
        let mut row_off = 0;
        for i in 0..self.layers {
            let row_size = (self.layers - i) * 4 + if self.compact { 9 } else { 12 };
            let (low, high) = (i * 2, base - 1 - i * 2);
            for j in 0..row_size {
                let col_off = j * 2;
                for k in 0..2 {
                    res[row_off + col_off + k] = (map[low + k], map[low + j]);
                    res[row_off + 2 * row_size + col_off + k] = (map[low + j], map[high - k]);
                    res[row_off + 4 * row_size + col_off + k] = (map[high - k], map[high - j]);
                    res[row_off + 6 * row_size + col_off + k] = (map[high - j], map[low + k]);
                }
            }
            row_off += row_size * 8;
        }
        res
    }

    /// Mode message module positions relative to the centre, bit 0 first.
    pub fn mode_positions(&self) -> Vec<(i32, i32)> {
        let r = self.core_radius() as i32;
        let per_side: i32 = if self.compact { 7 } else { 10 };
        let total = (per_side * 4) as usize;
        let mut res = vec![(0, 0); total];
        for i in 0..per_side {
            let off = if self.compact { i - 3 } else { i - 5 + i / 5 };
            res[i as usize] = (off, -r);
            res[(i + per_side) as usize] = (r, off);
            res[(3 * per_side - 1 - i) as usize] = (off, r);
            res[(4 * per_side - 1 - i) as usize] = (-r, off);
        }
        res
    }
}

/// Orientation marks around the bullseye relative to the centre, with their colour.
pub fn orientation_marks(r: i32) -> [((i32, i32), bool); 12] {
    [
        ((-r, -r), true),
        ((-r + 1, -r), true),
        ((-r, -r + 1), true),
        ((r, -r), true),
        ((r - 1, -r), false),
        ((r, -r + 1), true),
        ((r, r), false),
        ((r, r - 1), true),
        ((r - 1, r), false),
        ((-r, r), false),
        ((-r + 1, r), false),
        ((-r, r - 1), false),
    ]
}

pub fn field(word_size: usize) -> &'static GaloisField {
    match word_size {
        6 => aztec_data_6_field(),
        8 => data_matrix_field(),
        10 => aztec_data_10_field(),
        _ => aztec_data_12_field(),
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test_case(true, 1, 15)]
    #[test_case(true, 4, 27)]
    #[test_case(false, 1, 19)]
    #[test_case(false, 4, 31)]
    #[test_case(false, 5, 37)]
    #[test_case(false, 32, 151)]
    fn test_size(compact: bool, layers: usize, size: usize) {
        assert_eq!(Layout::new(compact, layers).size(), size);
    }

    #[test_case(true, 3)]
    #[test_case(false, 2)]
    #[test_case(false, 12)]
    #[test_case(false, 32)]
    fn test_data_positions_disjoint(compact: bool, layers: usize) {
        let layout = Layout::new(compact, layers);
        let pos = layout.data_positions();
        let unique: HashSet<_> = pos.iter().collect();
        assert_eq!(unique.len(), layout.total_bits());

        // Nothing lands on the core or the reference grid
        let c = (layout.size() / 2) as i32;
        let r = layout.core_radius() as i32;
        for &(x, y) in pos.iter() {
            let (dx, dy) = (x as i32 - c, y as i32 - c);
            assert!(dx.abs() > r || dy.abs() > r);
            if !compact {
                assert!(dx % 16 != 0 && dy % 16 != 0);
            }
        }
    }

    #[test]
    fn test_mode_positions_on_ring() {
        for compact in [true, false] {
            let layout = Layout::new(compact, 1);
            let r = layout.core_radius() as i32;
            let pos = layout.mode_positions();
            let unique: HashSet<_> = pos.iter().collect();
            assert_eq!(unique.len(), pos.len());
            assert!(pos.iter().all(|&(x, y)| x.abs().max(y.abs()) == r && x.abs().min(y.abs()) < r - 1));
        }
    }
}
