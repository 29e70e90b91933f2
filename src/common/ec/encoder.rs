use super::galois::GaloisField;

// Generator polynomial
//------------------------------------------------------------------------------

// Coefficients in descending degree order, leading coefficient 1
fn generator_poly(gf: &GaloisField, ec_len: usize) -> Vec<u16> {
    let mut g = vec![1u16];
    for i in 0..ec_len {
        let root = gf.alpha_pow(gf.gen_base() + i);
        let mut next = vec![0u16; g.len() + 1];
        for (j, &c) in g.iter().enumerate() {
            next[j] ^= c;
            next[j + 1] ^= gf.mul(c, root);
        }
        g = next;
    }
    g
}

// Error correction codewords
//------------------------------------------------------------------------------

/// Reed-Solomon parity for `data`, which is read highest degree first.
pub fn ec_codewords(gf: &GaloisField, data: &[u16], ec_len: usize) -> Vec<u16> {
    if ec_len == 0 {
        return Vec::new();
    }

    let gen = generator_poly(gf, ec_len);
    let mut rem = vec![0u16; ec_len];
    for &d in data {
        let factor = d ^ rem[0];
        rem.rotate_left(1);
        rem[ec_len - 1] = 0;
        for (r, &g) in rem.iter_mut().zip(gen[1..].iter()) {
            *r ^= gf.mul(g, factor);
        }
    }
    rem
}

pub fn ec_bytes(gf: &GaloisField, data: &[u8], ec_len: usize) -> Vec<u8> {
    let words: Vec<u16> = data.iter().map(|&b| b as u16).collect();
    ec_codewords(gf, &words, ec_len).into_iter().map(|w| w as u8).collect()
}

#[cfg(test)]
mod ec_encoder_tests {
    use super::{ec_bytes, generator_poly};
    use crate::common::ec::galois::qr_field;

    #[test]
    fn test_generator_poly() {
        // x^2 + 3x + 2 over the QR field
        assert_eq!(generator_poly(qr_field(), 2), vec![1, 3, 2]);
    }

    #[test]
    fn test_qr_version1_m() {
        // "HELLO WORLD" alphanumeric, 1-M
        let data = [32, 91, 11, 120, 209, 114, 220, 77, 67, 64, 236, 17, 236, 17, 236, 17];
        let ecc = ec_bytes(qr_field(), &data, 10);
        assert_eq!(ecc, vec![196, 35, 39, 119, 235, 215, 231, 226, 93, 23]);
    }
}
