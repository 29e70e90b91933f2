use super::{narrow_wide, quiet_after, quiet_before, Bars};
use crate::common::{BarcodeError, BarcodeResult};

static ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

// Nine elements per character, a set bit marks one of the three wide elements
static ENCODINGS: [u16; 43] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, // U-Z
    0x085, 0x184, 0x0C4, 0x0A8, 0x0A2, 0x08A, 0x02A, // - . space $ / + %
];

const ASTERISK: u16 = 0x094;

// Full ASCII
//------------------------------------------------------------------------------

// Shift pair standing in for an ASCII character outside the basic alphabet
fn extended(c: u8) -> Option<[u8; 2]> {
    let pair = match c {
        0 => [b'%', b'U'],
        1..=26 => [b'$', b'A' + c - 1],
        27..=31 => [b'%', b'A' + c - 27],
        b'!'..=b',' | b'/' | b':' => [b'/', b'A' + c - b'!'],
        b';'..=b'?' => [b'%', b'F' + c - b';'],
        b'@' => [b'%', b'V'],
        b'['..=b'_' => [b'%', b'K' + c - b'['],
        b'`' => [b'%', b'W'],
        b'a'..=b'z' => [b'+', b'A' + c - b'a'],
        b'{'..=127 => [b'%', b'P' + c - b'{'],
        _ => return None,
    };
    Some(pair)
}

fn to_full_ascii(data: &str) -> BarcodeResult<Vec<u8>> {
    let mut res = Vec::with_capacity(data.len() * 2);
    for &c in data.as_bytes() {
        if c == b' ' || c == b'-' || c == b'.' || c.is_ascii_digit() || c.is_ascii_uppercase() {
            res.push(c);
        } else {
            res.extend_from_slice(&extended(c).ok_or(BarcodeError::InvalidChar)?);
        }
    }
    Ok(res)
}

fn from_full_ascii(encoded: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(encoded.len());
    let mut it = encoded.iter().copied();
    while let Some(c) = it.next() {
        if !matches!(c, b'+' | b'$' | b'%' | b'/') {
            out.push(char::from(c));
            continue;
        }
        let next = it.next()?;
        let decoded = match (c, next) {
            (b'+', b'A'..=b'Z') => next + 32,
            (b'$', b'A'..=b'Z') => next - 64,
            (b'%', b'A'..=b'E') => next - 38,
            (b'%', b'F'..=b'J') => next - 11,
            (b'%', b'K'..=b'O') => next + 16,
            (b'%', b'P'..=b'T') => next + 43,
            (b'%', b'U') => 0,
            (b'%', b'V') => b'@',
            (b'%', b'W') => b'`',
            (b'%', b'X'..=b'Z') => 127,
            (b'/', b'A'..=b'O') => next - 32,
            (b'/', b'Z') => b':',
            _ => return None,
        };
        out.push(char::from(decoded));
    }
    Some(out)
}

// Encoding
//------------------------------------------------------------------------------

/// Code 39 framed by asterisks. Characters outside the basic alphabet switch the whole
/// message to full ASCII shift pairs.
pub fn encode(data: &str) -> BarcodeResult<Vec<bool>> {
    let basic = data.bytes().all(|c| ALPHABET.contains(&c));
    let text = if basic { data.as_bytes().to_vec() } else { to_full_ascii(data)? };

    let mut bars = Bars::default();
    bars.push_narrow_wide(ASTERISK, 9);
    for c in text {
        let i = ALPHABET.iter().position(|&a| a == c).ok_or(BarcodeError::InvalidChar)?;
        bars.gap();
        bars.push_narrow_wide(ENCODINGS[i], 9);
    }
    bars.gap();
    bars.push_narrow_wide(ASTERISK, 9);
    Ok(bars.0)
}

// Decoding
//------------------------------------------------------------------------------

fn decode_at(runs: &[usize], start: usize, full_ascii: bool) -> Option<String> {
    let width: usize = runs[start..start + 9].iter().sum();
    if narrow_wide(&runs[start..start + 9])? != ASTERISK || !quiet_before(runs, start, width as f32 / 2.0) {
        return None;
    }

    let mut text = Vec::new();
    // Each character is followed by a one element gap
    let mut pos = start + 10;
    loop {
        if pos + 9 > runs.len() {
            return None;
        }
        let pattern = narrow_wide(&runs[pos..pos + 9])?;
        if pattern == ASTERISK {
            break;
        }
        let i = ENCODINGS.iter().position(|&e| e == pattern)?;
        text.push(ALPHABET[i]);
        pos += 10;
    }
    if text.is_empty() || !quiet_after(runs, pos + 9, width as f32 / 2.0) {
        return None;
    }

    if full_ascii {
        from_full_ascii(&text)
    } else {
        String::from_utf8(text).ok()
    }
}

pub fn decode(runs: &[usize], full_ascii: bool) -> Option<String> {
    (1..runs.len().saturating_sub(9)).step_by(2).find_map(|i| decode_at(runs, i, full_ascii))
}
