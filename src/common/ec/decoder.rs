use super::galois::GaloisField;
use crate::common::error::{BarcodeError, BarcodeResult};

// Rectifier
//------------------------------------------------------------------------------

/// Corrects `codewords` (data followed by `ec_len` parity words) in place.
/// Returns the number of corrected words.
pub fn rectify(gf: &GaloisField, codewords: &mut [u16], ec_len: usize) -> BarcodeResult<usize> {
    let n = codewords.len();
    if ec_len == 0 || n >= gf.size() {
        return Err(BarcodeError::TooManyError);
    }

    // Compute syndromes
    let synd = match syndromes(gf, codewords, ec_len) {
        None => return Ok(0),
        Some(s) => s,
    };

    // Error locator polynomial
    let (sig, l) = berlekamp_massey(gf, &synd);
    let err_loc = chien_search(gf, &sig, n);
    if err_loc.len() != l {
        return Err(BarcodeError::TooManyError);
    }

    // Error evaluator
    let omg = omega(gf, &synd, &sig);

    // Sigma derivative, only odd powers survive in characteristic 2
    let dsig: Vec<u16> =
        sig.iter().enumerate().map(|(i, &s)| if i & 1 == 1 { s } else { 0 }).skip(1).collect();

    // Error magnitude via Forney
    debug_assert!(gf.gen_base() <= 1, "Unsupported generator base");
    for &deg in err_loc.iter() {
        let x = gf.alpha_pow(deg);
        let xinv = gf.inv(x);
        let den = gf.eval_poly(&dsig, xinv);
        if den == 0 {
            return Err(BarcodeError::TooManyError);
        }
        let mut mag = gf.div(gf.eval_poly(&omg, xinv), den);
        // Scale by X^(1 - gen_base)
        if gf.gen_base() == 0 {
            mag = gf.mul(mag, x);
        }
        codewords[n - 1 - deg] ^= mag;
    }

    match syndromes(gf, codewords, ec_len) {
        None => Ok(err_loc.len()),
        Some(_) => Err(BarcodeError::TooManyError),
    }
}

pub fn rectify_bytes(gf: &GaloisField, codewords: &mut [u8], ec_len: usize) -> BarcodeResult<usize> {
    let mut words: Vec<u16> = codewords.iter().map(|&b| b as u16).collect();
    let res = rectify(gf, &mut words, ec_len)?;
    for (b, w) in codewords.iter_mut().zip(words) {
        *b = w as u8;
    }
    Ok(res)
}

// Rectifier for short BCH protected infos, picks the nearest valid number
pub fn rectify_info(info: u32, valid_numbers: &[u32], err_capacity: u32) -> BarcodeResult<u32> {
    let res = valid_numbers
        .iter()
        .copied()
        .min_by_key(|&n| (info ^ n).count_ones())
        .ok_or(BarcodeError::InvalidInfo)?;

    if (info ^ res).count_ones() <= err_capacity {
        Ok(res)
    } else {
        Err(BarcodeError::InvalidInfo)
    }
}

fn syndromes(gf: &GaloisField, codewords: &[u16], ec_len: usize) -> Option<Vec<u16>> {
    let synd: Vec<u16> = (0..ec_len)
        .map(|i| {
            let x = gf.alpha_pow(gf.gen_base() + i);
            codewords.iter().fold(0, |acc, &c| gf.mul(acc, x) ^ c)
        })
        .collect();

    if synd.iter().all(|&s| s == 0) {
        None
    } else {
        Some(synd)
    }
}

// Sigma polynomial in ascending degree order, with its degree
fn berlekamp_massey(gf: &GaloisField, synd: &[u16]) -> (Vec<u16>, usize) {
    let len = synd.len() + 1;
    let mut l = 0usize;
    let mut m = 1usize;
    let mut b = 1u16;
    let mut cx = vec![0u16; len];
    let mut bx = vec![0u16; len];
    cx[0] = 1;
    bx[0] = 1;

    for n in 0..synd.len() {
        // Calculate discrepancy
        let mut d = synd[n];
        for i in 1..=l {
            d ^= gf.mul(cx[i], synd[n - i]);
        }

        if d == 0 {
            m += 1;
            continue;
        }

        let tx = cx.clone();
        let scale = gf.div(d, b);
        for i in 0..len - m {
            cx[i + m] ^= gf.mul(scale, bx[i]);
        }

        if 2 * l <= n {
            bx = tx;
            l = n + 1 - l;
            b = d;
            m = 1;
        } else {
            m += 1;
        }
    }

    cx.truncate(l + 1);
    (cx, l)
}

// Degrees of the erroneous positions, counted from the last codeword
fn chien_search(gf: &GaloisField, sig: &[u16], n: usize) -> Vec<usize> {
    let order = gf.size() - 1;
    (0..n).filter(|&deg| gf.eval_poly(sig, gf.alpha_pow(order - deg % order)) == 0).collect()
}

// Error evaluator polynomial, S(x) * sigma(x) mod x^ec_len
fn omega(gf: &GaloisField, synd: &[u16], sig: &[u16]) -> Vec<u16> {
    let t = synd.len();
    let mut omg = vec![0u16; t];
    for (i, &s) in synd.iter().enumerate() {
        for (j, &c) in sig.iter().enumerate().take(t - i) {
            omg[i + j] ^= gf.mul(s, c);
        }
    }
    omg
}
