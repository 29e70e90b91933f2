use tracing::trace;

use crate::common::charset::{guess_decode, Charset};
use crate::common::{BarcodeError, BarcodeResult};

const PAD: u8 = 129;
const LATCH_C40: u8 = 230;
const LATCH_BASE256: u8 = 231;
const FNC1: u8 = 232;
const STRUCTURED_APPEND: u8 = 233;
const READER_PROGRAMMING: u8 = 234;
const UPPER_SHIFT: u8 = 235;
const MACRO_05: u8 = 236;
const MACRO_06: u8 = 237;
const LATCH_X12: u8 = 238;
const LATCH_TEXT: u8 = 239;
const LATCH_EDIFACT: u8 = 240;
const ECI: u8 = 241;
const UNLATCH: u16 = 254;

// Encoder
//------------------------------------------------------------------------------

/// ASCII encodation with digit pairs and upper shift for bytes above 127.
/// Text outside ASCII is written in the hinted charset (UTF-8 by default) after an ECI.
pub fn encode_data(data: &str, charset: Option<Charset>) -> BarcodeResult<Vec<u8>> {
    if data.is_empty() {
        return Err(BarcodeError::EmptyData);
    }

    let mut res = Vec::with_capacity(data.len() + 2);
    let bytes = if data.is_ascii() {
        data.as_bytes().to_vec()
    } else {
        let cs = charset.unwrap_or(Charset::Utf8);
        let eci = cs.eci().ok_or(BarcodeError::UnsupportedCharset)?;
        push_eci(&mut res, eci);
        cs.encode(data)?
    };

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match bytes.get(i + 1) {
            Some(&n) if b.is_ascii_digit() && n.is_ascii_digit() => {
                res.push(130 + (b - b'0') * 10 + (n - b'0'));
                i += 2;
                continue;
            }
            _ => {}
        }
        if b < 128 {
            res.push(b + 1);
        } else {
            res.push(UPPER_SHIFT);
            res.push(b - 128 + 1);
        }
        i += 1;
    }
    Ok(res)
}

fn push_eci(res: &mut Vec<u8>, eci: u32) {
    res.push(ECI);
    match eci {
        0..=126 => res.push(eci as u8 + 1),
        127..=16382 => {
            let v = eci - 127;
            res.push((v / 254 + 128) as u8);
            res.push((v % 254 + 1) as u8);
        }
        _ => {
            let v = eci - 16383;
            res.push((v / 64516 + 192) as u8);
            res.push(((v / 254) % 254 + 1) as u8);
            res.push((v % 254 + 1) as u8);
        }
    }
}

/// Fills the remaining capacity with pad codewords, every pad after the first randomized.
pub fn pad(data: &mut Vec<u8>, capacity: usize) {
    if data.len() < capacity {
        data.push(PAD);
    }
    while data.len() < capacity {
        let pos = data.len() + 1;
        let pseudo = ((149 * pos) % 253) + 1;
        let v = PAD as usize + pseudo;
        data.push(if v <= 254 { v as u8 } else { (v - 254) as u8 });
    }
}

// Decoder
//------------------------------------------------------------------------------

// Collects bytes and flushes them to text whenever the charset changes
struct TextSink {
    out: String,
    bytes: Vec<u8>,
    charset: Option<Charset>,
    fallback: Option<Charset>,
    trailer: Option<&'static str>,
}

impl TextSink {
    fn new(fallback: Option<Charset>) -> Self {
        Self { out: String::new(), bytes: Vec::new(), charset: None, fallback, trailer: None }
    }

    fn push(&mut self, b: u8) {
        self.bytes.push(b);
    }

    fn push_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
    }

    fn flush(&mut self) {
        if self.bytes.is_empty() {
            return;
        }
        let text = match self.charset {
            Some(cs) => cs.decode(&self.bytes),
            None => guess_decode(&self.bytes, self.fallback),
        };
        self.out.push_str(&text);
        self.bytes.clear();
    }

    fn set_eci(&mut self, eci: u32) -> BarcodeResult<()> {
        self.flush();
        self.charset = Some(Charset::for_eci(eci).ok_or(BarcodeError::UnsupportedCharset)?);
        Ok(())
    }

    fn finish(mut self) -> String {
        self.flush();
        if let Some(t) = self.trailer {
            self.out.push_str(t);
        }
        self.out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encodation {
    Ascii,
    C40,
    Text,
    X12,
    Edifact,
    Base256,
}

/// Decodes corrected data codewords into text.
pub fn decode_data(data: &[u8], fallback: Option<Charset>) -> BarcodeResult<String> {
    let mut sink = TextSink::new(fallback);
    let mut pos = 0;
    let mut mode = Encodation::Ascii;

    while pos < data.len() {
        mode = match mode {
            Encodation::Ascii => match decode_ascii(data, &mut pos, &mut sink)? {
                Some(next) => next,
                None => break,
            },
            Encodation::C40 | Encodation::Text => {
                decode_c40_text(data, &mut pos, mode == Encodation::Text, &mut sink)?;
                Encodation::Ascii
            }
            Encodation::X12 => {
                decode_x12(data, &mut pos, &mut sink)?;
                Encodation::Ascii
            }
            Encodation::Edifact => {
                decode_edifact(data, &mut pos, &mut sink);
                Encodation::Ascii
            }
            Encodation::Base256 => {
                decode_base256(data, &mut pos, &mut sink)?;
                Encodation::Ascii
            }
        };
    }

    let text = sink.finish();
    trace!(len = text.len(), "Decoded DataMatrix data codewords");
    Ok(text)
}

// Returns the next encodation, or None once padding is reached
fn decode_ascii(data: &[u8], pos: &mut usize, sink: &mut TextSink) -> BarcodeResult<Option<Encodation>> {
    let mut upper = false;
    while *pos < data.len() {
        let c = data[*pos];
        *pos += 1;
        match c {
            0 => return Err(BarcodeError::InvalidCodeword),
            1..=128 => {
                let v = c - 1;
                sink.push(if upper { v + 128 } else { v });
                upper = false;
            }
            PAD => return Ok(None),
            130..=229 => sink.push_str(&format!("{:02}", c - 130)),
            LATCH_C40 => return Ok(Some(Encodation::C40)),
            LATCH_BASE256 => return Ok(Some(Encodation::Base256)),
            FNC1 => {
                // Leading FNC1 flags GS1 data, elsewhere it separates fields
                if *pos > 1 {
                    sink.push(0x1D);
                }
            }
            STRUCTURED_APPEND => *pos += 3,
            READER_PROGRAMMING => {}
            UPPER_SHIFT => upper = true,
            MACRO_05 | MACRO_06 => {
                sink.push_str(if c == MACRO_05 { "[)>\u{1E}05\u{1D}" } else { "[)>\u{1E}06\u{1D}" });
                sink.trailer = Some("\u{1E}\u{04}");
            }
            LATCH_X12 => return Ok(Some(Encodation::X12)),
            LATCH_TEXT => return Ok(Some(Encodation::Text)),
            LATCH_EDIFACT => return Ok(Some(Encodation::Edifact)),
            ECI => {
                let eci = read_eci(data, pos)?;
                sink.set_eci(eci)?;
            }
            _ => return Err(BarcodeError::InvalidCodeword),
        }
    }
    Ok(None)
}

fn read_eci(data: &[u8], pos: &mut usize) -> BarcodeResult<u32> {
    let mut next = || {
        let c = *data.get(*pos).ok_or(BarcodeError::InvalidCodeword)? as u32;
        *pos += 1;
        Ok::<u32, BarcodeError>(c)
    };
    let c1 = next()?;
    match c1 {
        1..=127 => Ok(c1 - 1),
        128..=191 => Ok((c1 - 128) * 254 + next()? - 1 + 127),
        192..=254 => {
            let c2 = next()?;
            let c3 = next()?;
            Ok((c1 - 192) * 64516 + (c2 - 1) * 254 + c3 - 1 + 16383)
        }
        _ => Err(BarcodeError::InvalidCodeword),
    }
}

// Reads codeword pairs as three base 40 values, None on unlatch or end of data
fn read_triplet(data: &[u8], pos: &mut usize) -> Option<[u8; 3]> {
    if *pos + 1 >= data.len() || data[*pos] as u16 == UNLATCH {
        if *pos < data.len() {
            *pos += 1;
        }
        return None;
    }
    let v = (data[*pos] as u16) * 256 + data[*pos + 1] as u16 - 1;
    *pos += 2;
    Some([(v / 1600) as u8, ((v / 40) % 40) as u8, (v % 40) as u8])
}

fn decode_c40_text(data: &[u8], pos: &mut usize, text: bool, sink: &mut TextSink) -> BarcodeResult<()> {
    let mut shift = 0u8;
    let mut upper = false;
    let emit = |v: u8, sink: &mut TextSink, upper: &mut bool| {
        sink.push(if *upper { v.wrapping_add(128) } else { v });
        *upper = false;
    };

    while let Some(vals) = read_triplet(data, pos) {
        for v in vals {
            match shift {
                0 => match v {
                    0..=2 => shift = v + 1,
                    3 => emit(b' ', sink, &mut upper),
                    4..=13 => emit(b'0' + v - 4, sink, &mut upper),
                    14..=39 => emit(if text { b'a' } else { b'A' } + v - 14, sink, &mut upper),
                    _ => return Err(BarcodeError::InvalidCodeword),
                },
                1 => {
                    emit(v, sink, &mut upper);
                    shift = 0;
                }
                2 => {
                    match v {
                        0..=14 => emit(b'!' + v, sink, &mut upper),
                        15..=21 => emit(b':' + v - 15, sink, &mut upper),
                        22..=26 => emit(b'[' + v - 22, sink, &mut upper),
                        27 => sink.push(0x1D),
                        30 => upper = true,
                        _ => return Err(BarcodeError::InvalidCodeword),
                    }
                    shift = 0;
                }
                _ => {
                    let c = if !text {
                        b'`' + v
                    } else {
                        match v {
                            0 => b'`',
                            1..=26 => b'A' + v - 1,
                            27..=31 => b'{' + v - 27,
                            _ => return Err(BarcodeError::InvalidCodeword),
                        }
                    };
                    emit(c, sink, &mut upper);
                    shift = 0;
                }
            }
        }
    }
    Ok(())
}

fn decode_x12(data: &[u8], pos: &mut usize, sink: &mut TextSink) -> BarcodeResult<()> {
    while let Some(vals) = read_triplet(data, pos) {
        for v in vals {
            sink.push(match v {
                0 => b'\r',
                1 => b'*',
                2 => b'>',
                3 => b' ',
                4..=13 => b'0' + v - 4,
                14..=39 => b'A' + v - 14,
                _ => return Err(BarcodeError::InvalidCodeword),
            });
        }
    }
    Ok(())
}

fn decode_edifact(data: &[u8], pos: &mut usize, sink: &mut TextSink) {
    while *pos + 2 < data.len() {
        let bits = (data[*pos] as u32) << 16 | (data[*pos + 1] as u32) << 8 | data[*pos + 2] as u32;
        *pos += 3;
        for i in 0..4 {
            let v = ((bits >> (18 - 6 * i)) & 0x3F) as u8;
            if v == 0x1F {
                // Unlatch, the rest of this triple is padding
                return;
            }
            sink.push(if v & 0x20 == 0 { v | 0x40 } else { v });
        }
    }
    *pos = data.len();
}

// 255-state unrandomizing, `cw_pos` is the 1-based codeword position
fn unrandomize_255(c: u8, cw_pos: usize) -> u8 {
    let pseudo = ((149 * cw_pos) % 255 + 1) as i32;
    let v = c as i32 - pseudo;
    (if v >= 0 { v } else { v + 256 }) as u8
}

fn decode_base256(data: &[u8], pos: &mut usize, sink: &mut TextSink) -> BarcodeResult<()> {
    let next = |pos: &mut usize| -> BarcodeResult<u8> {
        let c = *data.get(*pos).ok_or(BarcodeError::InvalidCodeword)?;
        *pos += 1;
        Ok(unrandomize_255(c, *pos))
    };

    let d1 = next(pos)? as usize;
    let len = match d1 {
        0 => data.len() - *pos,
        1..=249 => d1,
        _ => 250 * (d1 - 249) + next(pos)? as usize,
    };
    for _ in 0..len {
        let b = next(pos)?;
        sink.push(b);
    }
    Ok(())
}

#[cfg(test)]
mod codec_tests {
    use super::*;

    #[test]
    fn test_digit_pairs() {
        assert_eq!(encode_data("123456", None).unwrap(), vec![142, 164, 186]);
        assert_eq!(encode_data("12A", None).unwrap(), vec![142, 66]);
    }

    #[test]
    fn test_pad_sequence() {
        let mut data = vec![142, 164];
        pad(&mut data, 5);
        assert_eq!(data[2], 129);
        // 253-state randomized pads
        assert_eq!(data[3], 220);
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn test_ascii_roundtrip() {
        let mut data = encode_data("Hello, DataMatrix 2024!", None).unwrap();
        let capacity = data.len() + 4;
        pad(&mut data, capacity);
        assert_eq!(decode_data(&data, None).unwrap(), "Hello, DataMatrix 2024!");
    }

    #[test]
    fn test_eci_roundtrip() {
        let data = encode_data("naïve €", None).unwrap();
        assert_eq!(&data[..2], &[ECI, 27]);
        assert_eq!(decode_data(&data, None).unwrap(), "naïve €");
    }

    #[test]
    fn test_latin1_upper_shift() {
        let data = encode_data("é", Some(Charset::Latin1)).unwrap();
        assert_eq!(data, vec![ECI, 4, UPPER_SHIFT, 0xE9 - 127]);
        assert_eq!(decode_data(&data, None).unwrap(), "é");
    }

    #[test]
    fn test_c40() {
        // "AIM" in C40: (1600 * 14 + 40 * 22 + 26 + 1) = 23307 -> 91, 11
        let data = [LATCH_C40, 91, 11, 254, 129];
        assert_eq!(decode_data(&data, None).unwrap(), "AIM");
    }

    #[test]
    fn test_text() {
        let data = [LATCH_TEXT, 91, 11];
        assert_eq!(decode_data(&data, None).unwrap(), "aim");
    }

    #[test]
    fn test_base256() {
        // Length 2 then "hi", each randomized by position
        let raw = [2u8, b'h', b'i'];
        let mut data = vec![LATCH_BASE256];
        for (i, &b) in raw.iter().enumerate() {
            let pos = i + 2;
            data.push(((b as usize + (149 * pos) % 255 + 1) % 256) as u8);
        }
        assert_eq!(decode_data(&data, None).unwrap(), "hi");
    }

    #[test]
    fn test_invalid_codeword() {
        assert_eq!(decode_data(&[0], None), Err(BarcodeError::InvalidCodeword));
    }
}
