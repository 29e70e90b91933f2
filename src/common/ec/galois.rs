use std::sync::OnceLock;

// Galois field GF(2^m)
// Elements are stored as u16 so the same tables serve 4 bit Aztec mode
// messages up to 12 bit Aztec data words.
//------------------------------------------------------------------------------

#[derive(Debug)]
pub struct GaloisField {
    exp: Vec<u16>,
    log: Vec<u16>,
    size: usize,
    // First consecutive root of the generator polynomial
    gen_base: usize,
}

impl GaloisField {
    fn new(primitive: u32, size: usize, gen_base: usize) -> Self {
        let order = size - 1;
        let mut exp = vec![0u16; order * 2];
        let mut log = vec![0u16; size];
        let mut x = 1u32;
        for i in 0..order {
            exp[i] = x as u16;
            log[x as usize] = i as u16;
            x <<= 1;
            if x as usize >= size {
                x ^= primitive;
            }
        }
        for i in order..order * 2 {
            exp[i] = exp[i - order];
        }
        Self { exp, log, size, gen_base }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn gen_base(&self) -> usize {
        self.gen_base
    }

    #[inline]
    pub fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
    }

    #[inline]
    pub fn inv(&self, a: u16) -> u16 {
        debug_assert!(a != 0, "Zero has no inverse");
        self.exp[self.size - 1 - self.log[a as usize] as usize]
    }

    #[inline]
    pub fn div(&self, a: u16, b: u16) -> u16 {
        self.mul(a, self.inv(b))
    }

    // Alpha raised to i
    #[inline]
    pub fn alpha_pow(&self, i: usize) -> u16 {
        self.exp[i % (self.size - 1)]
    }

    #[inline]
    pub fn log(&self, a: u16) -> usize {
        debug_assert!(a != 0, "Log of zero is undefined");
        self.log[a as usize] as usize
    }

    // Evaluates a polynomial with coefficients in ascending degree order
    pub fn eval_poly(&self, poly: &[u16], x: u16) -> u16 {
        poly.iter().rev().fold(0, |acc, &c| self.mul(acc, x) ^ c)
    }
}

// Fields
//------------------------------------------------------------------------------

static QR_FIELD: OnceLock<GaloisField> = OnceLock::new();
static DATA_MATRIX_FIELD: OnceLock<GaloisField> = OnceLock::new();
static AZTEC_PARAM_FIELD: OnceLock<GaloisField> = OnceLock::new();
static AZTEC_DATA_6_FIELD: OnceLock<GaloisField> = OnceLock::new();
static AZTEC_DATA_10_FIELD: OnceLock<GaloisField> = OnceLock::new();
static AZTEC_DATA_12_FIELD: OnceLock<GaloisField> = OnceLock::new();

/// x^8 + x^4 + x^3 + x^2 + 1, generator roots start at alpha^0
pub fn qr_field() -> &'static GaloisField {
    QR_FIELD.get_or_init(|| GaloisField::new(0x011D, 256, 0))
}

/// x^8 + x^5 + x^3 + x^2 + 1, generator roots start at alpha^1. Aztec 8 bit
/// words use the same field.
pub fn data_matrix_field() -> &'static GaloisField {
    DATA_MATRIX_FIELD.get_or_init(|| GaloisField::new(0x012D, 256, 1))
}

pub fn aztec_param_field() -> &'static GaloisField {
    AZTEC_PARAM_FIELD.get_or_init(|| GaloisField::new(0x13, 16, 1))
}

pub fn aztec_data_6_field() -> &'static GaloisField {
    AZTEC_DATA_6_FIELD.get_or_init(|| GaloisField::new(0x43, 64, 1))
}

pub fn aztec_data_10_field() -> &'static GaloisField {
    AZTEC_DATA_10_FIELD.get_or_init(|| GaloisField::new(0x409, 1024, 1))
}

pub fn aztec_data_12_field() -> &'static GaloisField {
    AZTEC_DATA_12_FIELD.get_or_init(|| GaloisField::new(0x1069, 4096, 1))
}

#[cfg(test)]
mod galois_tests {
    use super::*;
    use test_case::test_case;

    #[test_case(qr_field())]
    #[test_case(data_matrix_field())]
    #[test_case(aztec_param_field())]
    #[test_case(aztec_data_6_field())]
    #[test_case(aztec_data_10_field())]
    #[test_case(aztec_data_12_field())]
    fn test_inverse(gf: &'static GaloisField) {
        for a in 1..gf.size() as u16 {
            assert_eq!(gf.mul(a, gf.inv(a)), 1, "Inverse failed for {a}");
        }
    }

    #[test]
    fn test_qr_generator() {
        let gf = qr_field();
        assert_eq!(gf.alpha_pow(8), 0x1D);
        assert_eq!(gf.alpha_pow(255), 1);
        assert_eq!(gf.mul(2, 0x80), 0x1D);
    }

    #[test]
    fn test_eval_poly() {
        let gf = qr_field();
        // 3 + 2x evaluated at 1
        assert_eq!(gf.eval_poly(&[3, 2], 1), 1);
        assert_eq!(gf.eval_poly(&[7], 99), 7);
    }
}
