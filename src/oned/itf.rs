use super::{best_match, quiet_after, quiet_before, variance, Bars, WIDE};
use crate::common::{BarcodeError, BarcodeResult};

const N: u8 = 1;
const W: u8 = WIDE;

static PATTERNS: [[u8; 5]; 10] = [
    [N, N, W, W, N], // 0
    [W, N, N, N, W], // 1
    [N, W, N, N, W], // 2
    [W, W, N, N, N], // 3
    [N, N, W, N, W], // 4
    [W, N, W, N, N], // 5
    [N, W, W, N, N], // 6
    [N, N, N, W, W], // 7
    [W, N, N, W, N], // 8
    [N, W, N, W, N], // 9
];

static START: [u8; 4] = [N, N, N, N];
static END: [u8; 3] = [W, N, N];

const MAX_AVG_VARIANCE: f32 = 0.38;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.5;

// Narrow widths of quiet zone required on either side
const QUIET_NARROW: f32 = 5.0;

/// Interleaved 2 of 5. Digits are paired, the first drawn in the bars and the second in
/// the spaces, so the length must be even.
pub fn encode(data: &str) -> BarcodeResult<Vec<bool>> {
    if !data.bytes().all(|c| c.is_ascii_digit()) {
        return Err(BarcodeError::InvalidChar);
    }
    if data.len() % 2 != 0 {
        return Err(BarcodeError::InvalidLength);
    }

    let mut bars = Bars::default();
    bars.push(&START, true);
    for pair in data.as_bytes().chunks(2) {
        let (a, b) = (&PATTERNS[(pair[0] - b'0') as usize], &PATTERNS[(pair[1] - b'0') as usize]);
        let widths: Vec<u8> = a.iter().zip(b).flat_map(|(&x, &y)| [x, y]).collect();
        bars.push(&widths, true);
    }
    bars.push(&END, true);
    Ok(bars.0)
}

fn decode_at(runs: &[usize], start: usize) -> Option<String> {
    if variance(&runs[start..start + 4], &START, MAX_INDIVIDUAL_VARIANCE) > MAX_AVG_VARIANCE {
        return None;
    }
    let narrow = runs[start..start + 4].iter().sum::<usize>() as f32 / 4.0;
    if !quiet_before(runs, start, narrow * QUIET_NARROW) {
        return None;
    }

    let mut text = String::new();
    let mut pos = start + 4;
    loop {
        let end = pos + 3;
        if end <= runs.len()
            && variance(&runs[pos..end], &END, MAX_INDIVIDUAL_VARIANCE) <= MAX_AVG_VARIANCE
            && quiet_after(runs, end, narrow * QUIET_NARROW)
        {
            break;
        }
        if pos + 10 > runs.len() {
            return None;
        }
        let bars: Vec<usize> = runs[pos..pos + 10].iter().step_by(2).copied().collect();
        let spaces: Vec<usize> = runs[pos + 1..pos + 10].iter().step_by(2).copied().collect();
        let a = best_match(&bars, &PATTERNS, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
        let b = best_match(&spaces, &PATTERNS, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
        text.push(char::from(b'0' + a as u8));
        text.push(char::from(b'0' + b as u8));
        pos += 10;
    }
    (!text.is_empty()).then_some(text)
}

pub fn decode(runs: &[usize]) -> Option<String> {
    (1..runs.len().saturating_sub(4)).step_by(2).find_map(|i| decode_at(runs, i))
}

#[cfg(test)]
mod itf_tests {
    use super::*;
    use crate::oned::runs;
    use test_case::test_case;

    fn read(bars: &[bool]) -> Option<String> {
        let mut row = vec![false; 20];
        row.extend_from_slice(bars);
        row.extend(std::iter::repeat(false).take(20));
        decode(&runs(&row))
    }

    #[test_case("00"; "zeros")]
    #[test_case("1234567890"; "all digits")]
    #[test_case("30712345000010"; "fourteen digits")]
    fn test_roundtrip(text: &str) {
        assert_eq!(read(&encode(text).unwrap()).as_deref(), Some(text));
    }

    #[test]
    fn test_patterns_have_two_wide() {
        for p in PATTERNS {
            assert_eq!(p.iter().filter(|&&w| w == W).count(), 2);
        }
    }

    #[test_case("123", BarcodeError::InvalidLength; "odd length")]
    #[test_case("12a4", BarcodeError::InvalidChar; "letter")]
    fn test_invalid(data: &str, err: BarcodeError) {
        assert_eq!(encode(data), Err(err));
    }

    #[test]
    fn test_needs_quiet_zone() {
        let mut row = vec![true; 3];
        row.extend_from_slice(&encode("1234").unwrap());
        row.extend(std::iter::repeat(false).take(20));
        assert_eq!(decode(&runs(&row)), None);
    }
}
