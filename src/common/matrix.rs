// Bit matrix
// Row-major grid of dark (true) and light (false) cells. Used both for symbol
// module grids and for binarized images.
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    w: usize,
    h: usize,
    bits: Vec<bool>,
}

impl BitMatrix {
    pub fn new(w: usize, h: usize) -> Self {
        Self { w, h, bits: vec![false; w * h] }
    }

    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    pub fn from_row(row: &[bool]) -> Self {
        Self { w: row.len(), h: 1, bits: row.to_vec() }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        debug_assert!(x < self.w && y < self.h, "Cell out of bounds: ({x}, {y})");
        self.bits[y * self.w + x]
    }

    // Signed lookup, cells outside the grid read as light
    #[inline]
    pub fn get_i(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
            return false;
        }
        self.bits[y as usize * self.w + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, dark: bool) {
        debug_assert!(x < self.w && y < self.h, "Cell out of bounds: ({x}, {y})");
        self.bits[y * self.w + x] = dark;
    }

    pub fn flip(&mut self, x: usize, y: usize) {
        let i = y * self.w + x;
        self.bits[i] = !self.bits[i];
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, dark: bool) {
        for j in y..(y + h).min(self.h) {
            for i in x..(x + w).min(self.w) {
                self.set(i, j, dark);
            }
        }
    }

    pub fn row(&self, y: usize) -> &[bool] {
        &self.bits[y * self.w..(y + 1) * self.w]
    }

    pub fn column(&self, x: usize) -> Vec<bool> {
        (0..self.h).map(|y| self.get(x, y)).collect()
    }

    pub fn count_dark(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    // Clockwise rotation by 90 degrees
    pub fn rotate90(&self) -> Self {
        let mut res = Self::new(self.h, self.w);
        for y in 0..self.h {
            for x in 0..self.w {
                res.set(self.h - 1 - y, x, self.get(x, y));
            }
        }
        res
    }

    // Smallest rectangle holding every dark cell as (left, top, right, bottom), inclusive
    pub fn bounding_box(&self) -> Option<(usize, usize, usize, usize)> {
        let mut left = self.w;
        let mut top = self.h;
        let mut right = 0;
        let mut bottom = 0;
        let mut found = false;
        for y in 0..self.h {
            for x in 0..self.w {
                if self.get(x, y) {
                    found = true;
                    left = left.min(x);
                    right = right.max(x);
                    top = top.min(y);
                    bottom = bottom.max(y);
                }
            }
        }
        found.then_some((left, top, right, bottom))
    }
}

#[cfg(test)]
mod bit_matrix_tests {
    use super::BitMatrix;

    #[test]
    fn test_rotate90() {
        let mut m = BitMatrix::new(3, 2);
        m.set(0, 0, true);
        m.set(2, 1, true);
        let r = m.rotate90();
        assert_eq!((r.width(), r.height()), (2, 3));
        assert!(r.get(1, 0));
        assert!(r.get(0, 2));
        assert_eq!(r.count_dark(), 2);
    }

    #[test]
    fn test_bounding_box() {
        let mut m = BitMatrix::square(10);
        assert_eq!(m.bounding_box(), None);
        m.fill_rect(2, 3, 4, 2, true);
        assert_eq!(m.bounding_box(), Some((2, 3, 5, 4)));
    }

    #[test]
    fn test_signed_lookup() {
        let mut m = BitMatrix::square(2);
        m.set(1, 1, true);
        assert!(m.get_i(1, 1));
        assert!(!m.get_i(-1, 0));
        assert!(!m.get_i(2, 1));
    }
}
