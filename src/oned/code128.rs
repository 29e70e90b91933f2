use super::{best_match, quiet_after, quiet_before, variance, Bars};
use crate::common::{BarcodeError, BarcodeResult};

// Symbol values 0..=102 plus the three start codes, six elements each starting with a bar
static PATTERNS: [[u8; 6]; 106] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3], [1, 2, 1, 3, 2, 2],
    [1, 3, 1, 2, 2, 2], [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2], [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3],
    [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2], [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1],
    [1, 1, 3, 2, 2, 2], [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1], [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1], [3, 1, 1, 2, 2, 2],
    [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2], [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1],
    [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1], [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3],
    [1, 3, 1, 3, 2, 1], [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1], [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1], [1, 3, 2, 1, 3, 1],
    [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1], [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1],
    [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3], [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1], [3, 1, 1, 1, 2, 3],
    [3, 1, 1, 3, 2, 1], [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4], [1, 1, 1, 4, 2, 2],
    [1, 2, 1, 1, 2, 4], [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2], [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4],
    [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4], [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1],
    [2, 4, 1, 2, 1, 1], [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1], [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2], [1, 2, 4, 1, 1, 2],
    [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2], [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1],
    [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1], [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1],
    [1, 1, 4, 1, 1, 3], [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1], [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2], [2, 1, 1, 2, 1, 4],
    [2, 1, 1, 2, 3, 2],
];

static STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;
const FNC1: u8 = 102;
const START_A: u8 = 103;
const SHIFT: u8 = 98;

const MAX_AVG_VARIANCE: f32 = 0.25;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    fn start(self) -> u8 {
        START_A + self as u8
    }

    // Value switching to this set from another one
    fn latch(self) -> u8 {
        match self {
            Self::A => CODE_A,
            Self::B => CODE_B,
            Self::C => CODE_C,
        }
    }

    fn value(self, b: u8) -> Option<u8> {
        match (self, b) {
            (Self::A, 0..=31) => Some(b + 64),
            (Self::A, 32..=95) | (Self::B, 32..=127) => Some(b - 32),
            _ => None,
        }
    }
}

// Encoding
//------------------------------------------------------------------------------

fn choose_set(current: Option<CodeSet>, rest: &[u8]) -> CodeSet {
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    let whole_even = digits == rest.len() && digits % 2 == 0;
    if digits >= 4 || (digits >= 2 && (current == Some(CodeSet::C) || (current.is_none() && whole_even))) {
        return CodeSet::C;
    }
    match (current, rest[0]) {
        (Some(set @ (CodeSet::A | CodeSet::B)), b) if set.value(b).is_some() => set,
        (_, 0..=31) => CodeSet::A,
        _ => CodeSet::B,
    }
}

/// Code 128 picking code set C for digit runs and A or B for everything else.
pub fn encode(data: &str) -> BarcodeResult<Vec<bool>> {
    let bytes = data.as_bytes();
    if !data.is_ascii() {
        return Err(BarcodeError::InvalidChar);
    }

    let mut values: Vec<u8> = Vec::with_capacity(bytes.len() + 3);
    let mut set: Option<CodeSet> = None;
    let mut i = 0;
    while i < bytes.len() {
        let next = choose_set(set, &bytes[i..]);
        if set != Some(next) {
            values.push(if set.is_none() { next.start() } else { next.latch() });
            set = Some(next);
        }
        if next == CodeSet::C {
            values.push((bytes[i] - b'0') * 10 + bytes[i + 1] - b'0');
            i += 2;
        } else {
            values.push(next.value(bytes[i]).ok_or(BarcodeError::InvalidChar)?);
            i += 1;
        }
    }

    let check = values.iter().enumerate().skip(1).fold(values[0] as usize, |s, (i, &v)| s + i * v as usize) % 103;
    values.push(check as u8);

    let mut bars = Bars::default();
    for &v in values.iter() {
        bars.push(&PATTERNS[v as usize], true);
    }
    bars.push(&STOP, true);
    Ok(bars.0)
}

// Decoding
//------------------------------------------------------------------------------

fn to_text(values: &[u8], start: CodeSet) -> Option<String> {
    let mut out = String::new();
    let mut set = start;
    let mut shifted = false;
    for (i, &v) in values.iter().enumerate() {
        let cur = match (shifted, set) {
            (true, CodeSet::A) => CodeSet::B,
            (true, CodeSet::B) => CodeSet::A,
            (_, s) => s,
        };
        shifted = false;
        match (cur, v) {
            (CodeSet::C, 0..=99) => {
                out.push(char::from(b'0' + v / 10));
                out.push(char::from(b'0' + v % 10));
            }
            (CodeSet::A, 0..=63) => out.push(char::from(v + 32)),
            (CodeSet::A, 64..=95) => out.push(char::from(v - 64)),
            (CodeSet::B, 0..=95) => out.push(char::from(v + 32)),
            // Leading FNC1 flags GS1 data, later ones separate fields
            (_, FNC1) => {
                if i > 0 {
                    out.push('\u{1d}');
                }
            }
            (CodeSet::A | CodeSet::B, SHIFT) => shifted = true,
            (_, CODE_A) if cur != CodeSet::A => set = CodeSet::A,
            (_, CODE_B) if cur != CodeSet::B => set = CodeSet::B,
            (_, CODE_C) => set = CodeSet::C,
            // FNC2, FNC3 and FNC4 carry no text
            (CodeSet::A | CodeSet::B, 96..=101) => {}
            _ => return None,
        }
    }
    Some(out)
}

fn decode_at(runs: &[usize], start: usize) -> Option<String> {
    let sym = &runs[start..start + 6];
    let width: usize = sym.iter().sum();
    if !quiet_before(runs, start, width as f32 / 2.0) {
        return None;
    }
    let set = match best_match(sym, &PATTERNS[103..], MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)? {
        0 => CodeSet::A,
        1 => CodeSet::B,
        _ => CodeSet::C,
    };

    let mut values = vec![set.start()];
    let mut pos = start + 6;
    loop {
        if pos + 7 <= runs.len() && variance(&runs[pos..pos + 7], &STOP, MAX_INDIVIDUAL_VARIANCE) < MAX_AVG_VARIANCE {
            break;
        }
        if pos + 6 > runs.len() {
            return None;
        }
        let v = best_match(&runs[pos..pos + 6], &PATTERNS[..103], MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
        values.push(v as u8);
        pos += 6;
    }
    if values.len() < 3 || !quiet_after(runs, pos + 7, width as f32 / 2.0) {
        return None;
    }

    let (check, data) = values.split_last()?;
    let sum = data.iter().enumerate().skip(1).fold(data[0] as usize, |s, (i, &v)| s + i * v as usize);
    if sum % 103 != *check as usize {
        return None;
    }
    to_text(&data[1..], set).filter(|t| !t.is_empty())
}

pub fn decode(runs: &[usize]) -> Option<String> {
    (1..runs.len().saturating_sub(6)).step_by(2).find_map(|i| decode_at(runs, i))
}

#[cfg(test)]
mod code128_tests {
    use super::*;
    use crate::oned::runs;
    use test_case::test_case;

    fn with_quiet(bars: &[bool]) -> Vec<bool> {
        let pad = [false; 10];
        pad.iter().chain(bars).chain(pad.iter()).copied().collect()
    }

    fn values_of(data: &str) -> Vec<u8> {
        let bars = encode(data).unwrap();
        let rs = runs(&bars);
        (1..rs.len() - 7).step_by(6).map(|i| best_match(&rs[i..i + 6], &PATTERNS, 0.1, 0.5).unwrap() as u8).collect()
    }

    #[test]
    fn test_code_sets() {
        // Start B, "AB", check
        assert_eq!(values_of("AB"), vec![104, 33, 34, 102]);
        // Start C, 12 34
        assert_eq!(values_of("1234"), vec![105, 12, 34, 82]);
        // Start A for a control character
        assert_eq!(values_of("\tA")[..3], [103, 73, 33]);
    }

    #[test]
    fn test_switches_to_c_for_digit_runs() {
        let v = values_of("AB123456");
        assert_eq!(v[..4], [104, 33, 34, CODE_C]);
        assert_eq!(v[4..7], [12, 34, 56]);
    }

    #[test_case("Hello, World!")]
    #[test_case("0123456789")]
    #[test_case("abc\tdef")]
    #[test_case("X1234Y")]
    #[test_case("12345")]
    fn test_roundtrip(text: &str) {
        let rs = runs(&with_quiet(&encode(text).unwrap()));
        assert_eq!(decode(&rs).as_deref(), Some(text));
    }

    #[test]
    fn test_rejects_non_ascii() {
        assert_eq!(encode("é"), Err(BarcodeError::InvalidChar));
    }

    #[test]
    fn test_bad_checksum() {
        let symbol = |values: &[u8]| {
            let mut bars = Bars::default();
            for &v in values {
                bars.push(&PATTERNS[v as usize], true);
            }
            bars.push(&STOP, true);
            with_quiet(&bars.0)
        };
        // Start B, "CD", check (104 + 35 + 2 * 36) % 103 = 5
        assert_eq!(decode(&runs(&symbol(&[104, 35, 36, 5]))).as_deref(), Some("CD"));
        assert_eq!(decode(&runs(&symbol(&[104, 35, 36, 6]))), None);
    }
}
