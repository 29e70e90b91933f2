use super::{best_match, quiet_after, quiet_before, variance, Bars};
use crate::common::{BarcodeError, BarcodeResult};
use crate::symbology::BarcodeFormat;

// Digit widths, space first for the left half. The first ten are the odd parity L set,
// the rest their mirror images, the even parity G set. Right half digits use the L
// widths starting with a bar.
static LG_PATTERNS: [[u8; 4]; 20] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
    [1, 1, 2, 3],
    [1, 2, 2, 2],
    [2, 2, 1, 2],
    [1, 1, 4, 1],
    [2, 3, 1, 1],
    [1, 3, 2, 1],
    [4, 1, 1, 1],
    [2, 1, 3, 1],
    [3, 1, 2, 1],
    [2, 1, 1, 3],
];

// Parity of the six left digits of EAN-13 by the implied first digit, a set bit marks G
static FIRST_DIGIT: [u8; 10] = [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

// UPC-E parity by number system then check digit
static UPCE_PARITY: [[u8; 10]; 2] = [
    [0x38, 0x34, 0x32, 0x31, 0x2C, 0x26, 0x23, 0x2A, 0x29, 0x25],
    [0x07, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A],
];

static START: [u8; 3] = [1, 1, 1];
static MIDDLE: [u8; 5] = [1, 1, 1, 1, 1];
static END: [u8; 3] = [1, 1, 1];
static UPCE_END: [u8; 6] = [1, 1, 1, 1, 1, 1];

const MAX_AVG_VARIANCE: f32 = 0.48;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

// Digits
//------------------------------------------------------------------------------

fn to_digits(data: &str) -> BarcodeResult<Vec<u8>> {
    data.bytes().map(|c| if c.is_ascii_digit() { Ok(c - b'0') } else { Err(BarcodeError::InvalidChar) }).collect()
}

fn to_text(digits: &[u8]) -> String {
    digits.iter().map(|&d| char::from(b'0' + d)).collect()
}

/// Mod 10 check digit with weight 3 on the rightmost payload digit and alternating.
pub fn check_digit(payload: &[u8]) -> u8 {
    let sum: u32 = payload.iter().rev().enumerate().map(|(i, &d)| d as u32 * if i % 2 == 0 { 3 } else { 1 }).sum();
    ((10 - sum % 10) % 10) as u8
}

// Appends the check digit to `len - 1` digits, or verifies the one given
fn with_check(mut digits: Vec<u8>, len: usize) -> BarcodeResult<Vec<u8>> {
    if digits.len() + 1 == len {
        digits.push(check_digit(&digits));
        Ok(digits)
    } else if digits.len() == len {
        if check_digit(&digits[..len - 1]) != digits[len - 1] {
            return Err(BarcodeError::InvalidCheckDigit);
        }
        Ok(digits)
    } else {
        Err(BarcodeError::InvalidLength)
    }
}

/// Expands number system and six UPC-E digits to the eleven digit UPC-A payload.
pub fn expand_upce(d: &[u8]) -> [u8; 11] {
    let (ns, m) = (d[0], &d[1..7]);
    match m[5] {
        0..=2 => [ns, m[0], m[1], m[5], 0, 0, 0, 0, m[2], m[3], m[4]],
        3 => [ns, m[0], m[1], m[2], 0, 0, 0, 0, 0, m[3], m[4]],
        4 => [ns, m[0], m[1], m[2], m[3], 0, 0, 0, 0, 0, m[4]],
        _ => [ns, m[0], m[1], m[2], m[3], m[4], 0, 0, 0, 0, m[5]],
    }
}

fn upce_with_check(mut digits: Vec<u8>) -> BarcodeResult<Vec<u8>> {
    if digits.len() != 7 && digits.len() != 8 {
        return Err(BarcodeError::InvalidLength);
    }
    if digits[0] > 1 {
        return Err(BarcodeError::InvalidNumberSystem);
    }
    let check = check_digit(&expand_upce(&digits));
    match digits.get(7) {
        Some(&c) if c != check => Err(BarcodeError::InvalidCheckDigit),
        Some(_) => Ok(digits),
        None => {
            digits.push(check);
            Ok(digits)
        }
    }
}

// Encoding
//------------------------------------------------------------------------------

fn push_left(bars: &mut Bars, digit: u8, even: bool) {
    let i = digit as usize + if even { 10 } else { 0 };
    bars.push(&LG_PATTERNS[i], false);
}

fn push_right(bars: &mut Bars, digit: u8) {
    bars.push(&LG_PATTERNS[digit as usize], true);
}

fn draw_ean13(d: &[u8]) -> Vec<bool> {
    let parity = FIRST_DIGIT[d[0] as usize];
    let mut bars = Bars::default();
    bars.push(&START, true);
    for (i, &x) in d[1..7].iter().enumerate() {
        push_left(&mut bars, x, parity >> (5 - i) & 1 == 1);
    }
    bars.push(&MIDDLE, false);
    for &x in &d[7..13] {
        push_right(&mut bars, x);
    }
    bars.push(&END, true);
    bars.0
}

fn draw_ean8(d: &[u8]) -> Vec<bool> {
    let mut bars = Bars::default();
    bars.push(&START, true);
    for &x in &d[..4] {
        push_left(&mut bars, x, false);
    }
    bars.push(&MIDDLE, false);
    for &x in &d[4..8] {
        push_right(&mut bars, x);
    }
    bars.push(&END, true);
    bars.0
}

fn draw_upce(d: &[u8]) -> Vec<bool> {
    let parity = UPCE_PARITY[d[0] as usize][d[7] as usize];
    let mut bars = Bars::default();
    bars.push(&START, true);
    for (i, &x) in d[1..7].iter().enumerate() {
        push_left(&mut bars, x, parity >> (5 - i) & 1 == 1);
    }
    bars.push(&UPCE_END, false);
    bars.0
}

/// EAN-13, EAN-8, UPC-A and UPC-E. The check digit is computed when left off and
/// verified when given. UPC-A is drawn as EAN-13 with a leading zero.
pub fn encode(data: &str, format: BarcodeFormat) -> BarcodeResult<Vec<bool>> {
    let digits = to_digits(data)?;
    match format {
        BarcodeFormat::Ean13 => Ok(draw_ean13(&with_check(digits, 13)?)),
        BarcodeFormat::UpcA => {
            let mut d = vec![0];
            d.extend(with_check(digits, 12)?);
            Ok(draw_ean13(&d))
        }
        BarcodeFormat::Ean8 => Ok(draw_ean8(&with_check(digits, 8)?)),
        BarcodeFormat::UpcE => Ok(draw_upce(&upce_with_check(digits)?)),
        _ => Err(BarcodeError::UnsupportedFormat),
    }
}

// Decoding
//------------------------------------------------------------------------------

fn guard(runs: &[usize], at: usize, pattern: &[u8]) -> bool {
    at + pattern.len() <= runs.len()
        && variance(&runs[at..at + pattern.len()], pattern, MAX_INDIVIDUAL_VARIANCE) <= MAX_AVG_VARIANCE
}

// Reads `n` digits of four runs each, returning indices into `patterns`
fn read_digits(runs: &[usize], at: usize, n: usize, patterns: &[[u8; 4]]) -> Option<Vec<usize>> {
    if at + 4 * n > runs.len() {
        return None;
    }
    (0..n)
        .map(|k| best_match(&runs[at + 4 * k..at + 4 * k + 4], patterns, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE))
        .collect()
}

fn parity_of(indices: &[usize]) -> u8 {
    indices.iter().fold(0u8, |acc, &i| acc << 1 | (i >= 10) as u8)
}

fn read_ean13(runs: &[usize], p: usize, quiet: f32) -> Option<Vec<u8>> {
    let left = read_digits(runs, p, 6, &LG_PATTERNS)?;
    if !guard(runs, p + 24, &MIDDLE) {
        return None;
    }
    let right = read_digits(runs, p + 29, 6, &LG_PATTERNS[..10])?;
    if !guard(runs, p + 53, &END) || !quiet_after(runs, p + 56, quiet) {
        return None;
    }
    let first = FIRST_DIGIT.iter().position(|&f| f == parity_of(&left))? as u8;
    let digits: Vec<u8> =
        std::iter::once(first).chain(left.iter().chain(&right).map(|&i| (i % 10) as u8)).collect();
    (check_digit(&digits[..12]) == digits[12]).then_some(digits)
}

fn read_ean8(runs: &[usize], p: usize, quiet: f32) -> Option<Vec<u8>> {
    let left = read_digits(runs, p, 4, &LG_PATTERNS[..10])?;
    if !guard(runs, p + 16, &MIDDLE) {
        return None;
    }
    let right = read_digits(runs, p + 21, 4, &LG_PATTERNS[..10])?;
    if !guard(runs, p + 37, &END) || !quiet_after(runs, p + 40, quiet) {
        return None;
    }
    let digits: Vec<u8> = left.iter().chain(&right).map(|&i| i as u8).collect();
    (check_digit(&digits[..7]) == digits[7]).then_some(digits)
}

fn read_upce(runs: &[usize], p: usize, quiet: f32) -> Option<Vec<u8>> {
    let middle = read_digits(runs, p, 6, &LG_PATTERNS)?;
    if !guard(runs, p + 24, &UPCE_END) || !quiet_after(runs, p + 30, quiet) {
        return None;
    }
    let parity = parity_of(&middle);
    let (ns, check) = UPCE_PARITY
        .iter()
        .enumerate()
        .find_map(|(ns, table)| table.iter().position(|&t| t == parity).map(|c| (ns as u8, c as u8)))?;
    let mut digits = vec![ns];
    digits.extend(middle.iter().map(|&i| (i % 10) as u8));
    digits.push(check);
    (check_digit(&expand_upce(&digits)) == check).then_some(digits)
}

fn decode_at(runs: &[usize], start: usize, formats: &[BarcodeFormat]) -> Option<(BarcodeFormat, String)> {
    if !guard(runs, start, &START) {
        return None;
    }
    // Quiet zones at least as wide as the start guard
    let quiet = runs[start..start + 3].iter().sum::<usize>() as f32;
    if !quiet_before(runs, start, quiet) {
        return None;
    }
    let wants = |f: BarcodeFormat| formats.contains(&f);
    let p = start + 3;

    if wants(BarcodeFormat::Ean13) || wants(BarcodeFormat::UpcA) {
        if let Some(d) = read_ean13(runs, p, quiet) {
            if d[0] == 0 && wants(BarcodeFormat::UpcA) {
                return Some((BarcodeFormat::UpcA, to_text(&d[1..])));
            }
            return wants(BarcodeFormat::Ean13).then(|| (BarcodeFormat::Ean13, to_text(&d)));
        }
    }
    if wants(BarcodeFormat::Ean8) {
        if let Some(d) = read_ean8(runs, p, quiet) {
            return Some((BarcodeFormat::Ean8, to_text(&d)));
        }
    }
    if wants(BarcodeFormat::UpcE) {
        if let Some(d) = read_upce(runs, p, quiet) {
            return Some((BarcodeFormat::UpcE, to_text(&d)));
        }
    }
    None
}

/// Finds a UPC or EAN symbol among the allowed `formats`. An EAN-13 starting with zero
/// is reported as UPC-A when that is allowed.
pub fn decode(runs: &[usize], formats: &[BarcodeFormat]) -> Option<(BarcodeFormat, String)> {
    (1..runs.len().saturating_sub(3)).step_by(2).find_map(|i| decode_at(runs, i, formats))
}
