// Module placement
// Walks the mapping matrix diagonally and assigns each module to a codeword bit.
// Each cell holds (codeword index, bit) where bit 0 is the most significant.
//------------------------------------------------------------------------------

pub type Slot = Option<(usize, u8)>;

struct Placer {
    nrow: i32,
    ncol: i32,
    slots: Vec<Slot>,
}

impl Placer {
    fn assigned(&self, r: i32, c: i32) -> bool {
        self.slots[(r * self.ncol + c) as usize].is_some()
    }

    fn module(&mut self, mut r: i32, mut c: i32, cw: usize, bit: u8) {
        if r < 0 {
            r += self.nrow;
            c += 4 - ((self.nrow + 4) % 8);
        }
        if c < 0 {
            c += self.ncol;
            r += 4 - ((self.ncol + 4) % 8);
        }
        self.slots[(r * self.ncol + c) as usize] = Some((cw, bit));
    }

    // The standard L shaped codeword layout anchored at its bottom right module
    fn utah(&mut self, r: i32, c: i32, cw: usize) {
        const SHAPE: [(i32, i32); 8] = [(-2, -2), (-2, -1), (-1, -2), (-1, -1), (-1, 0), (0, -2), (0, -1), (0, 0)];
        for (bit, (dr, dc)) in SHAPE.iter().enumerate() {
            self.module(r + dr, c + dc, cw, bit as u8);
        }
    }

    fn corner(&mut self, shape: [(i32, i32); 8], cw: usize) {
        for (bit, (r, c)) in shape.into_iter().enumerate() {
            self.module(r, c, cw, bit as u8);
        }
    }
}

/// Slot map for an `nrow` x `ncol` mapping matrix, row-major.
pub fn placement(nrow: usize, ncol: usize) -> Vec<Slot> {
    let (nr, nc) = (nrow as i32, ncol as i32);
    let mut p = Placer { nrow: nr, ncol: nc, slots: vec![None; nrow * ncol] };
    let (mut row, mut col, mut cw) = (4i32, 0i32, 0usize);

    loop {
        if row == nr && col == 0 {
            p.corner([(nr - 1, 0), (nr - 1, 1), (nr - 1, 2), (0, nc - 2), (0, nc - 1), (1, nc - 1), (2, nc - 1), (3, nc - 1)], cw);
            cw += 1;
        }
        if row == nr - 2 && col == 0 && nc % 4 != 0 {
            p.corner([(nr - 3, 0), (nr - 2, 0), (nr - 1, 0), (0, nc - 4), (0, nc - 3), (0, nc - 2), (0, nc - 1), (1, nc - 1)], cw);
            cw += 1;
        }
        if row == nr - 2 && col == 0 && nc % 8 == 4 {
            p.corner([(nr - 3, 0), (nr - 2, 0), (nr - 1, 0), (0, nc - 2), (0, nc - 1), (1, nc - 1), (2, nc - 1), (3, nc - 1)], cw);
            cw += 1;
        }
        if row == nr + 4 && col == 2 && nc % 8 == 0 {
            p.corner([(nr - 1, 0), (nr - 1, nc - 1), (0, nc - 3), (0, nc - 2), (0, nc - 1), (1, nc - 3), (1, nc - 2), (1, nc - 1)], cw);
            cw += 1;
        }

        // Up and to the right
        loop {
            if row < nr && col >= 0 && !p.assigned(row, col) {
                p.utah(row, col, cw);
                cw += 1;
            }
            row -= 2;
            col += 2;
            if row < 0 || col >= nc {
                break;
            }
        }
        row += 1;
        col += 3;

        // Down and to the left
        loop {
            if row >= 0 && col < nc && !p.assigned(row, col) {
                p.utah(row, col, cw);
                cw += 1;
            }
            row += 2;
            col -= 2;
            if row >= nr || col < 0 {
                break;
            }
        }
        row += 3;
        col += 1;

        if row >= nr && col >= nc {
            break;
        }
    }
    p.slots
}

#[cfg(test)]
mod placement_tests {
    use super::placement;
    use test_case::test_case;

    #[test_case(8, 8)]
    #[test_case(10, 10)]
    #[test_case(14, 14)]
    #[test_case(28, 28)]
    #[test_case(132, 132)]
    fn test_every_codeword_bit_once(nrow: usize, ncol: usize) {
        let slots = placement(nrow, ncol);
        let total = nrow * ncol / 8;
        let mut seen = vec![0u8; total];
        for (cw, bit) in slots.iter().flatten() {
            seen[*cw] |= 1 << bit;
        }
        assert!(seen.iter().all(|&s| s == 0xFF));
        assert_eq!(slots.iter().filter(|s| s.is_none()).count(), nrow * ncol % 8);
    }

    #[test]
    fn test_first_codeword() {
        // Codeword 0 sits with its last bit at row 4, column 0 wrapped around the left edge
        let slots = placement(8, 8);
        assert_eq!(slots[4 * 8], Some((0, 7)));
        assert_eq!(slots[2 * 8 + 6], Some((0, 0)));
    }
}
