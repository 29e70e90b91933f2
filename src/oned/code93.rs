use super::{quiet_after, quiet_before, Bars};
use crate::common::{BarcodeError, BarcodeResult};

// The four shift characters are represented by lower case a to d
static ALPHABET: &[u8; 48] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%abcd*";

// Nine modules per character, most significant bit first, three bars and three spaces
static ENCODINGS: [u16; 48] = [
    0x114, 0x148, 0x144, 0x142, 0x128, 0x124, 0x122, 0x150, 0x112, 0x10A, // 0-9
    0x1A8, 0x1A4, 0x1A2, 0x194, 0x192, 0x18A, 0x168, 0x164, 0x162, 0x134, // A-J
    0x11A, 0x158, 0x14C, 0x146, 0x12C, 0x116, 0x1B4, 0x1B2, 0x1AC, 0x1A6, // K-T
    0x196, 0x19A, 0x16C, 0x166, 0x136, 0x13A, // U-Z
    0x12E, 0x1D4, 0x1D2, 0x1CA, 0x16E, 0x176, 0x1AE, // - . space $ / + %
    0x126, 0x1DA, 0x1D6, 0x132, 0x15E, // shifts and *
];

const ASTERISK: usize = 47;

// Full ASCII
//------------------------------------------------------------------------------

fn to_extended(data: &str) -> BarcodeResult<Vec<u8>> {
    let mut res = Vec::with_capacity(data.len() * 2);
    for &c in data.as_bytes() {
        match c {
            0 => res.extend_from_slice(b"bU"),
            1..=26 => res.extend_from_slice(&[b'a', b'A' + c - 1]),
            27..=31 => res.extend_from_slice(&[b'b', b'A' + c - 27]),
            b' ' | b'$' | b'%' | b'+' | b'-' | b'.' | b'/' | b'0'..=b'9' | b'A'..=b'Z' => res.push(c),
            b'!'..=b',' => res.extend_from_slice(&[b'c', b'A' + c - b'!']),
            b':' => res.extend_from_slice(b"cZ"),
            b';'..=b'?' => res.extend_from_slice(&[b'b', b'F' + c - b';']),
            b'@' => res.extend_from_slice(b"bV"),
            b'['..=b'_' => res.extend_from_slice(&[b'b', b'K' + c - b'[']),
            b'`' => res.extend_from_slice(b"bW"),
            b'a'..=b'z' => res.extend_from_slice(&[b'd', b'A' + c - b'a']),
            b'{'..=127 => res.extend_from_slice(&[b'b', b'P' + c - b'{']),
            _ => return Err(BarcodeError::InvalidChar),
        }
    }
    Ok(res)
}

fn from_extended(encoded: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(encoded.len());
    let mut it = encoded.iter().copied();
    while let Some(c) = it.next() {
        if !(b'a'..=b'd').contains(&c) {
            out.push(char::from(c));
            continue;
        }
        let next = it.next()?;
        let decoded = match (c, next) {
            (b'd', b'A'..=b'Z') => next + 32,
            (b'a', b'A'..=b'Z') => next - 64,
            (b'b', b'A'..=b'E') => next - 38,
            (b'b', b'F'..=b'J') => next - 11,
            (b'b', b'K'..=b'O') => next + 16,
            (b'b', b'P'..=b'T') => next + 43,
            (b'b', b'U') => 0,
            (b'b', b'V') => b'@',
            (b'b', b'W') => b'`',
            (b'b', b'X'..=b'Z') => 127,
            (b'c', b'A'..=b'O') => next - 32,
            (b'c', b'Z') => b':',
            _ => return None,
        };
        out.push(char::from(decoded));
    }
    Some(out)
}

// Weighted mod 47 sum, weights counting up from the last character and wrapping
fn checksum(indices: &[usize], max_weight: usize) -> usize {
    indices.iter().rev().enumerate().map(|(i, &v)| v * (i % max_weight + 1)).sum::<usize>() % 47
}

fn index_of(c: u8) -> Option<usize> {
    ALPHABET.iter().position(|&a| a == c)
}

// Encoding
//------------------------------------------------------------------------------

/// Code 93 with full ASCII shifts and the two C and K check characters.
pub fn encode(data: &str) -> BarcodeResult<Vec<bool>> {
    let mut indices: Vec<usize> =
        to_extended(data)?.into_iter().map(|c| index_of(c).ok_or(BarcodeError::InvalidChar)).collect::<Result<_, _>>()?;
    indices.push(checksum(&indices, 20));
    indices.push(checksum(&indices, 15));

    let mut bars = Bars::default();
    for i in std::iter::once(ASTERISK).chain(indices).chain(std::iter::once(ASTERISK)) {
        let e = ENCODINGS[i];
        bars.0.extend((0..9).rev().map(|b| e >> b & 1 == 1));
    }
    // Termination bar
    bars.0.push(true);
    Ok(bars.0)
}

// Decoding
//------------------------------------------------------------------------------

// Rounds six runs to module widths and packs them into a nine module pattern
fn to_pattern(counters: &[usize]) -> Option<u16> {
    let total: usize = counters.iter().sum();
    if total == 0 {
        return None;
    }
    let mut pattern = 0u16;
    let mut modules = 0;
    for (i, &c) in counters.iter().enumerate() {
        let w = ((c * 9) as f32 / total as f32).round() as usize;
        if !(1..=4).contains(&w) {
            return None;
        }
        modules += w;
        for _ in 0..w {
            pattern = (pattern << 1) | (i % 2 == 0) as u16;
        }
    }
    (modules == 9).then_some(pattern)
}

fn decode_at(runs: &[usize], start: usize) -> Option<String> {
    let width: usize = runs[start..start + 6].iter().sum();
    if to_pattern(&runs[start..start + 6])? != ENCODINGS[ASTERISK] || !quiet_before(runs, start, width as f32 / 2.0) {
        return None;
    }

    let mut indices = Vec::new();
    let mut pos = start + 6;
    loop {
        if pos + 7 > runs.len() {
            return None;
        }
        let pattern = to_pattern(&runs[pos..pos + 6])?;
        let i = ENCODINGS.iter().position(|&e| e == pattern)?;
        pos += 6;
        if i == ASTERISK {
            break;
        }
        indices.push(i);
    }
    // Termination bar then quiet zone
    if indices.len() < 3 || !quiet_after(runs, pos + 1, width as f32 / 2.0) {
        return None;
    }

    let n = indices.len();
    if checksum(&indices[..n - 2], 20) != indices[n - 2] || checksum(&indices[..n - 1], 15) != indices[n - 1] {
        return None;
    }
    let text: Vec<u8> = indices[..n - 2].iter().map(|&i| ALPHABET[i]).collect();
    from_extended(&text)
}

pub fn decode(runs: &[usize]) -> Option<String> {
    (1..runs.len().saturating_sub(6)).step_by(2).find_map(|i| decode_at(runs, i))
}

#[cfg(test)]
mod code93_tests {
    use super::*;
    use crate::oned::runs;
    use test_case::test_case;

    fn read(bars: &[bool]) -> Option<String> {
        let mut row = vec![false; 20];
        row.extend_from_slice(bars);
        row.extend(std::iter::repeat(false).take(20));
        decode(&runs(&row))
    }

    #[test]
    fn test_encodings_shape() {
        for e in ENCODINGS {
            assert_eq!(e >> 8, 1, "starts with a bar");
            assert_eq!(e & 1, 0, "ends with a space");
        }
    }

    #[test]
    fn test_check_characters() {
        // "TEST93" checks as C = '+', K = '6'
        let idx: Vec<usize> = b"TEST93".iter().map(|&c| index_of(c).unwrap()).collect();
        let c = checksum(&idx, 20);
        let mut with_c = idx.clone();
        with_c.push(c);
        assert_eq!((c, checksum(&with_c, 15)), (index_of(b'+').unwrap(), index_of(b'6').unwrap()));
    }

    #[test_case("CODE93"; "basic")]
    #[test_case("Code 93 lower"; "shifted")]
    #[test_case("tab\there{}"; "controls and braces")]
    fn test_roundtrip(text: &str) {
        assert_eq!(read(&encode(text).unwrap()).as_deref(), Some(text));
    }

    #[test]
    fn test_extended_table() {
        for c in 0u8..128 {
            let s = (c as char).to_string();
            assert_eq!(from_extended(&to_extended(&s).unwrap()).as_deref(), Some(s.as_str()), "char {c}");
        }
    }
}
