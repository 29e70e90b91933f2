use super::{narrow_wide, quiet_after, quiet_before, Bars};
use crate::common::{BarcodeError, BarcodeResult};

static ALPHABET: &[u8; 20] = b"0123456789-$:/.+ABCD";

// Seven elements per character, a set bit marks a wide element
static ENCODINGS: [u16; 20] = [
    0x003, 0x006, 0x009, 0x060, 0x012, 0x042, 0x021, 0x024, 0x030, 0x048, // 0-9
    0x00C, 0x018, 0x045, 0x051, 0x054, 0x015, // - $ : / . +
    0x01A, 0x029, 0x00B, 0x00E, // A B C D
];

const DEFAULT_GUARD: u8 = b'A';

fn is_guard(c: u8) -> bool {
    matches!(c, b'A'..=b'D')
}

/// Codabar. Data without its own start and stop characters is framed with `A`.
pub fn encode(data: &str) -> BarcodeResult<Vec<bool>> {
    let upper = data.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let starts = bytes.first().is_some_and(|&c| is_guard(c));
    let stops = bytes.last().is_some_and(|&c| is_guard(c));
    let framed: Vec<u8> = match (starts, stops) {
        (true, true) if bytes.len() >= 2 => bytes.to_vec(),
        (false, false) => {
            let mut framed = Vec::with_capacity(bytes.len() + 2);
            framed.push(DEFAULT_GUARD);
            framed.extend_from_slice(bytes);
            framed.push(DEFAULT_GUARD);
            framed
        }
        _ => return Err(BarcodeError::InvalidChar),
    };
    let body = &framed[1..framed.len() - 1];
    if body.iter().any(|&c| is_guard(c)) {
        return Err(BarcodeError::InvalidChar);
    }

    let mut bars = Bars::default();
    for (n, &c) in framed.iter().enumerate() {
        let i = ALPHABET.iter().position(|&a| a == c).ok_or(BarcodeError::InvalidChar)?;
        if n > 0 {
            bars.gap();
        }
        bars.push_narrow_wide(ENCODINGS[i], 7);
    }
    Ok(bars.0)
}

fn lookup(counters: &[usize]) -> Option<u8> {
    let pattern = narrow_wide(counters)?;
    ENCODINGS.iter().position(|&e| e == pattern).map(|i| ALPHABET[i])
}

fn decode_at(runs: &[usize], start: usize) -> Option<String> {
    let width: usize = runs[start..start + 7].iter().sum();
    if !is_guard(lookup(&runs[start..start + 7])?) || !quiet_before(runs, start, width as f32 / 2.0) {
        return None;
    }

    let mut body = String::new();
    let mut pos = start + 8;
    loop {
        if pos + 7 > runs.len() {
            return None;
        }
        let c = lookup(&runs[pos..pos + 7])?;
        if is_guard(c) {
            break;
        }
        body.push(char::from(c));
        pos += 8;
    }
    (!body.is_empty() && quiet_after(runs, pos + 7, width as f32 / 2.0)).then_some(body)
}

/// Returns the data between the start and stop characters.
pub fn decode(runs: &[usize]) -> Option<String> {
    (1..runs.len().saturating_sub(7)).step_by(2).find_map(|i| decode_at(runs, i))
}

#[cfg(test)]
mod codabar_tests {
    use super::*;
    use crate::oned::runs;
    use test_case::test_case;

    fn read(bars: &[bool]) -> Option<String> {
        let mut row = vec![false; 20];
        row.extend_from_slice(bars);
        row.extend(std::iter::repeat(false).take(20));
        decode(&runs(&row))
    }

    #[test_case("1234-5678", "1234-5678"; "framed by default")]
    #[test_case("B$3.14+C", "$3.14+"; "own guards")]
    #[test_case("d31117013206d", "31117013206"; "lower case guards")]
    fn test_roundtrip(data: &str, text: &str) {
        assert_eq!(read(&encode(data).unwrap()).as_deref(), Some(text));
    }

    #[test_case("A123"; "missing stop")]
    #[test_case("12E4"; "letter in body")]
    #[test_case("A1B2A"; "guard in body")]
    fn test_invalid(data: &str) {
        assert_eq!(encode(data), Err(BarcodeError::InvalidChar));
    }

    #[test]
    fn test_default_guards() {
        let bars = encode("7").unwrap();
        // A, gap, 7, gap, A with three wide elements in each guard
        assert_eq!(bars.len(), 2 * (4 + 3 * 3) + (5 + 2 * 3) + 2);
    }
}
