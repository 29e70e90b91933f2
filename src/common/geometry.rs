use std::ops::{Index, IndexMut};

use super::error::{BarcodeError, BarcodeResult};

// Point
//------------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist(&self, other: &Point) -> f64 {
        let (dx, dy) = (self.x - other.x, self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    // z component of (b - a) x (c - a)
    pub fn cross(a: &Point, b: &Point, c: &Point) -> f64 {
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    }

    pub fn round(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

// Homographic projection matrix to map a logical symbol grid onto the image
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Clone)]
pub struct Homography(pub [f64; 8]);

impl Index<usize> for Homography {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Homography {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl Homography {
    /// Computes the projection taking `src[i]` to `dst[i]` for four point pairs.
    pub fn compute(src: [Point; 4], dst: [Point; 4]) -> BarcodeResult<Self> {
        // Two rows per point pair, unknowns h11..h32 (h33 fixed at 1)
        let mut a = [[0.0_f64; 8]; 8];
        let mut b = [0.0_f64; 8];

        for i in 0..4 {
            let Point { x, y } = src[i];
            let Point { x: xp, y: yp } = dst[i];

            a[2 * i] = [-x, -y, -1.0, 0.0, 0.0, 0.0, xp * x, xp * y];
            b[2 * i] = -xp;

            a[2 * i + 1] = [0.0, 0.0, 0.0, -x, -y, -1.0, yp * x, yp * y];
            b[2 * i + 1] = -yp;
        }

        let h = Self::solve_linear_system(a, b)?;

        Ok(Self(h))
    }

    /// Solve 8x8 linear system Ax = b by Gaussian elimination
    fn solve_linear_system(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> BarcodeResult<[f64; 8]> {
        // Forward elimination
        for i in 0..8 {
            // Partial pivot
            let mut max_row = i;
            let mut max_val = a[i][i].abs();
            #[allow(clippy::needless_range_loop)]
            for r in (i + 1)..8 {
                if a[r][i].abs() > max_val {
                    max_val = a[r][i].abs();
                    max_row = r;
                }
            }
            if max_row != i {
                a.swap(i, max_row);
                b.swap(i, max_row);
            }

            if a[i][i].abs() < f64::EPSILON {
                return Err(BarcodeError::SingularMatrix);
            }

            let pivot = a[i][i];
            for c in i..8 {
                a[i][c] /= pivot;
            }
            b[i] /= pivot;

            for r in (i + 1)..8 {
                let factor = a[r][i];
                for c in i..8 {
                    a[r][c] -= factor * a[i][c];
                }
                b[r] -= factor * b[i];
            }
        }

        // Back substitution
        let mut x = [0.0; 8];
        for r in (0..8).rev() {
            let mut sum = 0.0;
            #[allow(clippy::needless_range_loop)]
            for c in (r + 1)..8 {
                sum += a[r][c] * x[c];
            }
            x[r] = (b[r] - sum) / a[r][r];
        }
        Ok(x)
    }

    /// Projects a point through the homography
    pub fn map(&self, x: f64, y: f64) -> BarcodeResult<Point> {
        let xp = self[0] * x + self[1] * y + self[2];
        let yp = self[3] * x + self[4] * y + self[5];
        let w = self[6] * x + self[7] * y + 1.0;

        if w.abs() <= f64::EPSILON {
            return Err(BarcodeError::PointAtInfinity);
        }

        Ok(Point::new(xp / w, yp / w))
    }
}

#[cfg(test)]
mod homography_tests {
    use super::{Homography, Point};

    fn approx(p: Point, x: f64, y: f64) -> bool {
        (p.x - x).abs() < 1e-6 && (p.y - y).abs() < 1e-6
    }

    #[test]
    fn test_identity() {
        let pts = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0), Point::new(0.0, 1.0)];
        let h = Homography::compute(pts, pts).unwrap();
        let p = h.map(0.5, 0.25).unwrap();
        assert!(approx(p, 0.5, 0.25), "Unexpected mapping {p:?}");
    }

    #[test]
    fn test_scale_translate() {
        let src = [Point::new(0.0, 0.0), Point::new(21.0, 0.0), Point::new(21.0, 21.0), Point::new(0.0, 21.0)];
        let dst = [
            Point::new(10.0, 20.0),
            Point::new(52.0, 20.0),
            Point::new(52.0, 62.0),
            Point::new(10.0, 62.0),
        ];
        let h = Homography::compute(src, dst).unwrap();
        assert!(approx(h.map(10.5, 10.5).unwrap(), 31.0, 41.0));
    }

    #[test]
    fn test_degenerate() {
        let p = Point::new(1.0, 1.0);
        assert!(Homography::compute([p; 4], [p; 4]).is_err());
    }
}
