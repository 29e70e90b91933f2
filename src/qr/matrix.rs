use tracing::debug;

use super::mask::{compute_total_penalty, MaskPattern};
use super::version::{format_info, ECLevel, Version};
use crate::common::ec::{ec_bytes, qr_field};
use crate::common::BitMatrix;

// QR grid
// Module grid together with the map of function modules that data placement skips.
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct QrGrid {
    version: Version,
    modules: BitMatrix,
    reserved: BitMatrix,
}

impl QrGrid {
    pub fn new(version: Version) -> Self {
        let w = version.width();
        let mut grid = Self { version, modules: BitMatrix::square(w), reserved: BitMatrix::square(w) };
        grid.draw_function_patterns();
        grid
    }

    pub fn width(&self) -> usize {
        self.modules.width()
    }

    pub fn into_modules(self) -> BitMatrix {
        self.modules
    }

    fn set_function(&mut self, x: usize, y: usize, dark: bool) {
        self.modules.set(x, y, dark);
        self.reserved.set(x, y, true);
    }

    fn draw_function_patterns(&mut self) {
        let w = self.width();

        // Timing patterns
        for i in 0..w {
            self.set_function(6, i, i & 1 == 0);
            self.set_function(i, 6, i & 1 == 0);
        }

        // Finders with separators
        self.draw_finder(3, 3);
        self.draw_finder(w - 4, 3);
        self.draw_finder(3, w - 4);

        // Alignment patterns, skipping the three finder corners
        let pos = self.version.alignment_positions();
        let n = pos.len();
        for (i, &ay) in pos.iter().enumerate() {
            for (j, &ax) in pos.iter().enumerate() {
                let at_finder = (i == 0 && j == 0) || (i == 0 && j == n - 1) || (i == n - 1 && j == 0);
                if !at_finder {
                    self.draw_alignment(ax, ay);
                }
            }
        }

        // Reserve format areas, real bits are drawn after masking
        self.draw_format_bits(0);
        self.draw_version();
    }

    fn draw_finder(&mut self, cx: usize, cy: usize) {
        let w = self.width() as i32;
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                let (x, y) = (cx as i32 + dx, cy as i32 + dy);
                if x < 0 || y < 0 || x >= w || y >= w {
                    continue;
                }
                let dist = dx.abs().max(dy.abs());
                self.set_function(x as usize, y as usize, dist != 2 && dist != 4);
            }
        }
    }

    fn draw_alignment(&mut self, cx: usize, cy: usize) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let dark = dx.abs().max(dy.abs()) != 1;
                self.set_function((cx as i32 + dx) as usize, (cy as i32 + dy) as usize, dark);
            }
        }
    }

    pub(super) fn draw_format_bits(&mut self, bits: u32) {
        let w = self.width();
        let bit = |i: usize| (bits >> i) & 1 != 0;
        for (i, (x, y)) in format_positions(w).0.into_iter().enumerate() {
            self.set_function(x, y, bit(i));
        }
        for (i, (x, y)) in format_positions(w).1.into_iter().enumerate() {
            self.set_function(x, y, bit(i));
        }
        // Always dark
        self.set_function(8, w - 8, true);
    }

    fn draw_version(&mut self) {
        if *self.version < 7 {
            return;
        }
        let bits = self.version.info();
        let w = self.width();
        for i in 0..18 {
            let dark = (bits >> i) & 1 != 0;
            let (a, b) = (w - 11 + i % 3, i / 3);
            self.set_function(a, b, dark);
            self.set_function(b, a, dark);
        }
    }

    // Data module coordinates in zigzag placement order
    pub fn data_positions(&self) -> Vec<(usize, usize)> {
        let w = self.width();
        let mut res = Vec::with_capacity(self.version.raw_data_modules());
        let mut right = w - 1;
        loop {
            if right == 6 {
                right = 5;
            }
            let upward = (right + 1) & 2 == 0;
            for vert in 0..w {
                let y = if upward { w - 1 - vert } else { vert };
                for j in 0..2 {
                    let x = right - j;
                    if !self.reserved.get(x, y) {
                        res.push((x, y));
                    }
                }
            }
            if right < 2 {
                break;
            }
            right -= 2;
        }
        res
    }

    pub fn draw_codewords(&mut self, codewords: &[u8]) {
        let total_bits = codewords.len() * 8;
        for (i, (x, y)) in self.data_positions().into_iter().enumerate() {
            let dark = i < total_bits && (codewords[i >> 3] >> (7 - (i & 7))) & 1 != 0;
            self.modules.set(x, y, dark);
        }
    }

    // XOR is its own inverse, so this both applies and removes a mask
    pub fn apply_mask(&mut self, mask: MaskPattern) {
        let f = mask.mask_function();
        let w = self.width();
        for y in 0..w {
            for x in 0..w {
                if !self.reserved.get(x, y) && f(x, y) {
                    self.modules.flip(x, y);
                }
            }
        }
    }

    pub fn apply_best_mask(&mut self, ecl: ECLevel) -> MaskPattern {
        let best = MaskPattern::all()
            .min_by_key(|&m| {
                let mut grid = self.clone();
                grid.apply_mask(m);
                grid.draw_format_bits(format_info(ecl, *m));
                compute_total_penalty(&grid.modules)
            })
            .unwrap_or(MaskPattern::new(0));
        self.apply_mask(best);
        self.draw_format_bits(format_info(ecl, *best));
        best
    }

    // Reads modules back in placement order as codewords
    pub fn read_codewords(&self) -> Vec<u8> {
        let mut res = vec![0u8; self.version.total_codewords()];
        let total_bits = res.len() * 8;
        for (i, (x, y)) in self.data_positions().into_iter().enumerate().take(total_bits) {
            if self.modules.get(x, y) {
                res[i >> 3] |= 0x80 >> (i & 7);
            }
        }
        res
    }
}

impl QrGrid {
    /// Wraps sampled modules so data can be read with the function map of `version`.
    pub fn from_modules(version: Version, modules: BitMatrix) -> Self {
        let mut grid = Self::new(version);
        grid.modules = modules;
        grid
    }
}

// Format info module positions for both copies, bit 0 first
pub fn format_positions(w: usize) -> ([(usize, usize); 15], [(usize, usize); 15]) {
    let mut first = [(0, 0); 15];
    let mut second = [(0, 0); 15];
    for i in 0..15 {
        first[i] = match i {
            0..=5 => (8, i),
            6 => (8, 7),
            7 => (8, 8),
            8 => (7, 8),
            _ => (14 - i, 8),
        };
        second[i] = if i < 8 { (w - 1 - i, 8) } else { (8, w - 15 + i) };
    }
    (first, second)
}

// Blocks
//------------------------------------------------------------------------------

/// Splits data into blocks, appends parity and interleaves.
pub fn add_ec_and_interleave(data: &[u8], version: Version, ecl: ECLevel) -> Vec<u8> {
    let num_blocks = version.num_blocks(ecl);
    let ec_len = version.ec_per_block(ecl);
    let raw = version.total_codewords();
    let num_short = num_blocks - raw % num_blocks;
    let short_len = raw / num_blocks;

    let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(num_blocks);
    let mut k = 0;
    for i in 0..num_blocks {
        let dlen = short_len - ec_len + if i < num_short { 0 } else { 1 };
        let dat = &data[k..k + dlen];
        k += dlen;
        let mut blk = dat.to_vec();
        let ecc = ec_bytes(qr_field(), dat, ec_len);
        if i < num_short {
            // Placeholder keeps short blocks aligned with long ones
            blk.push(0);
        }
        blk.extend(ecc);
        blocks.push(blk);
    }

    let mut res = Vec::with_capacity(raw);
    for i in 0..blocks[0].len() {
        for (j, blk) in blocks.iter().enumerate() {
            if i != short_len - ec_len || j >= num_short {
                res.push(blk[i]);
            }
        }
    }
    res
}

/// Inverse of [`add_ec_and_interleave`]. Yields (data length, block with parity) per block.
pub fn deinterleave(codewords: &[u8], version: Version, ecl: ECLevel) -> Vec<(usize, Vec<u8>)> {
    let num_blocks = version.num_blocks(ecl);
    let ec_len = version.ec_per_block(ecl);
    let raw = version.total_codewords();
    let num_short = num_blocks - raw % num_blocks;
    let short_len = raw / num_blocks;

    let mut blocks = vec![Vec::with_capacity(short_len + 1); num_blocks];
    let mut it = codewords.iter();
    for i in 0..=short_len {
        for (j, blk) in blocks.iter_mut().enumerate() {
            if i == short_len - ec_len && j < num_short {
                continue;
            }
            if let Some(&b) = it.next() {
                blk.push(b);
            }
        }
    }

    blocks
        .into_iter()
        .enumerate()
        .map(|(j, blk)| (short_len - ec_len + if j < num_short { 0 } else { 1 }, blk))
        .collect()
}

/// Builds the final masked grid for data codewords.
pub fn build(data: &[u8], version: Version, ecl: ECLevel) -> QrGrid {
    let codewords = add_ec_and_interleave(data, version, ecl);
    let mut grid = QrGrid::new(version);
    grid.draw_codewords(&codewords);
    let mask = grid.apply_best_mask(ecl);
    debug!(version = *version, ecl = %ecl, mask = *mask, "Built QR grid");
    grid
}

#[cfg(test)]
mod matrix_tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1)]
    #[test_case(2)]
    #[test_case(7)]
    #[test_case(14)]
    #[test_case(40)]
    fn test_data_module_count(v: u8) {
        let version = Version::new(v);
        let grid = QrGrid::new(version);
        assert_eq!(grid.data_positions().len(), version.raw_data_modules());
    }

    #[test_case(5, ECLevel::Q)]
    #[test_case(10, ECLevel::H)]
    #[test_case(1, ECLevel::L)]
    fn test_interleave_roundtrip(v: u8, ecl: ECLevel) {
        let version = Version::new(v);
        let data: Vec<u8> = (0..version.data_codewords(ecl)).map(|i| (i * 7) as u8).collect();
        let all = add_ec_and_interleave(&data, version, ecl);
        assert_eq!(all.len(), version.total_codewords());
        let blocks = deinterleave(&all, version, ecl);
        let joined: Vec<u8> = blocks.iter().flat_map(|(dlen, b)| b[..*dlen].to_vec()).collect();
        assert_eq!(joined, data);
    }

    #[test]
    fn test_codewords_roundtrip() {
        let version = Version::new(3);
        let cw: Vec<u8> = (0..version.total_codewords()).map(|i| (i * 31 % 256) as u8).collect();
        let mut grid = QrGrid::new(version);
        grid.draw_codewords(&cw);
        grid.apply_mask(MaskPattern::new(5));
        grid.apply_mask(MaskPattern::new(5));
        assert_eq!(grid.read_codewords(), cw);
    }

    #[test]
    fn test_finder_drawn() {
        let m = QrGrid::new(Version::new(1)).into_modules();
        assert!(m.get(0, 0) && m.get(6, 0) && m.get(3, 3));
        assert!(!m.get(1, 1) && !m.get(7, 0));
        assert!(m.get(20, 0) && m.get(0, 20));
        assert!(m.get(8, 13), "Dark module missing");
    }
}
