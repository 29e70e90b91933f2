use tracing::trace;

use super::layout::{field, Layout};
use crate::common::charset::{guess_decode, Charset};
use crate::common::ec::rectify;
use crate::common::{BarcodeError, BarcodeResult, BitReader, BitStream};

// Error correction
//------------------------------------------------------------------------------

/// Corrects the raw layer bits and removes stuffing, returning the message bits.
pub fn correct_bits(raw: &BitStream, layout: &Layout, data_words: usize) -> BarcodeResult<BitStream> {
    let ws = layout.word_size();
    let total_words = raw.len() / ws;
    if data_words == 0 || data_words >= total_words {
        return Err(BarcodeError::InvalidInfo);
    }

    let offset = raw.len() % ws;
    let mut words: Vec<u16> = (0..total_words)
        .map(|i| (0..ws).fold(0u16, |w, j| (w << 1) | raw.get(offset + i * ws + j) as u16))
        .collect();
    let fixed = rectify(field(ws), &mut words, total_words - data_words)?;
    trace!(fixed, "Corrected Aztec data words");

    let mask = (1u16 << ws) - 1;
    let mut out = BitStream::with_capacity(data_words * ws);
    for &w in words[..data_words].iter() {
        if w == 0 || w == mask {
            return Err(BarcodeError::InvalidCodeword);
        }
        if w == 1 || w == mask - 1 {
            for _ in 0..ws - 1 {
                out.push(w > 1);
            }
        } else {
            out.push_bits(w, ws);
        }
    }
    Ok(out)
}

// High level decoding
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Upper,
    Lower,
    Mixed,
    Punct,
    Digit,
    Binary,
}

#[derive(Debug, Clone, Copy)]
enum Sym {
    Byte(u8),
    Pair(&'static str),
    Latch(Table),
    Shift(Table),
    Flg,
}

fn lookup(table: Table, code: u32) -> Sym {
    let c = code as u8;
    match (table, c) {
        (Table::Punct, 0) => Sym::Flg,
        (Table::Punct, 1) => Sym::Byte(b'\r'),
        (Table::Punct, 2) => Sym::Pair("\r\n"),
        (Table::Punct, 3) => Sym::Pair(". "),
        (Table::Punct, 4) => Sym::Pair(", "),
        (Table::Punct, 5) => Sym::Pair(": "),
        (Table::Punct, 6..=30) => Sym::Byte(b"!\"#$%&'()*+,-./:;<=>?[]{}"[c as usize - 6]),
        (Table::Punct, _) => Sym::Latch(Table::Upper),

        (_, 0) => Sym::Shift(Table::Punct),
        (_, 1) => Sym::Byte(b' '),

        (Table::Digit, 2..=11) => Sym::Byte(b'0' + c - 2),
        (Table::Digit, 12) => Sym::Byte(b','),
        (Table::Digit, 13) => Sym::Byte(b'.'),
        (Table::Digit, 14) => Sym::Latch(Table::Upper),
        (Table::Digit, _) => Sym::Shift(Table::Upper),

        (Table::Upper, 2..=27) => Sym::Byte(b'A' + c - 2),
        (Table::Lower, 2..=27) => Sym::Byte(b'a' + c - 2),
        (Table::Upper, 28) => Sym::Latch(Table::Lower),
        (Table::Lower, 28) => Sym::Shift(Table::Upper),
        (Table::Upper | Table::Lower, 29) => Sym::Latch(Table::Mixed),
        (Table::Upper | Table::Lower, 30) => Sym::Latch(Table::Digit),

        (Table::Mixed, 2..=14) => Sym::Byte(c - 1),
        (Table::Mixed, 15..=19) => Sym::Byte(c + 12),
        (Table::Mixed, 20..=27) => Sym::Byte(b"@\\^_`|~\x7f"[c as usize - 20]),
        (Table::Mixed, 28) => Sym::Latch(Table::Lower),
        (Table::Mixed, 29) => Sym::Latch(Table::Upper),
        (Table::Mixed, 30) => Sym::Latch(Table::Punct),

        _ => Sym::Shift(Table::Binary),
    }
}

/// Interprets message bits as text, honouring ECI switches.
pub fn decode_bits(bits: &BitStream, fallback: Option<Charset>) -> BarcodeResult<String> {
    let data = bits.data();
    let mut rd = BitReader::with_len(data, bits.len());
    let mut out = String::new();
    let mut buf: Vec<u8> = Vec::new();
    let mut charset: Option<Charset> = None;
    let flush = |buf: &mut Vec<u8>, out: &mut String, cs: Option<Charset>| {
        if !buf.is_empty() {
            out.push_str(&match cs {
                Some(cs) => cs.decode(buf),
                None => guess_decode(buf, fallback),
            });
            buf.clear();
        }
    };

    let (mut latch, mut shift) = (Table::Upper, Table::Upper);
    loop {
        if shift == Table::Binary {
            let Some(mut len) = rd.read(5) else { break };
            if len == 0 {
                let Some(long) = rd.read(11) else { break };
                len = long + 31;
            }
            for _ in 0..len {
                match rd.read(8) {
                    Some(b) => buf.push(b as u8),
                    None => break,
                }
            }
            shift = latch;
            continue;
        }

        let size = if shift == Table::Digit { 4 } else { 5 };
        let Some(code) = rd.read(size) else { break };
        match lookup(shift, code) {
            Sym::Byte(b) => {
                buf.push(b);
                shift = latch;
            }
            Sym::Pair(s) => {
                buf.extend_from_slice(s.as_bytes());
                shift = latch;
            }
            Sym::Latch(t) => {
                latch = t;
                shift = t;
            }
            Sym::Shift(t) => {
                latch = shift;
                shift = t;
            }
            Sym::Flg => {
                let n = rd.read(3).ok_or(BarcodeError::InvalidCodeword)?;
                match n {
                    0 => buf.push(0x1D),
                    7 => return Err(BarcodeError::InvalidCodeword),
                    _ => {
                        let mut eci = 0u32;
                        for _ in 0..n {
                            let d = rd.read(4).ok_or(BarcodeError::InvalidCodeword)?;
                            if !(2..=11).contains(&d) {
                                return Err(BarcodeError::InvalidCodeword);
                            }
                            eci = eci * 10 + d - 2;
                        }
                        flush(&mut buf, &mut out, charset);
                        charset = Some(Charset::for_eci(eci).ok_or(BarcodeError::UnsupportedCharset)?);
                    }
                }
                shift = latch;
            }
        }
    }

    flush(&mut buf, &mut out, charset);
    Ok(out)
}

#[cfg(test)]
mod decoder_tests {
    use super::*;
    use crate::aztec::encoder::{encode_text, stuff_bits};
    use proptest::prelude::*;

    #[test]
    fn test_mixed_and_punct_tables() {
        // M/L, '@', P/L, '$', U/L, 'Z'
        let mut s = BitStream::new();
        for code in [29u8, 20, 30, 9, 31, 27] {
            s.push_bits(code, 5);
        }
        assert_eq!(decode_bits(&s, None).unwrap(), "@$Z");
    }

    #[test]
    fn test_punct_pairs() {
        let mut s = BitStream::new();
        // P/S ". " then 'A'
        s.push_bits(0u8, 5);
        s.push_bits(3u8, 5);
        s.push_bits(2u8, 5);
        assert_eq!(decode_bits(&s, None).unwrap(), ". A");
    }

    #[test]
    fn test_layer_bits_roundtrip() {
        let layout = Layout::new(true, 1);
        let bits = encode_text("STUFFING", None).unwrap();
        let stuffed = stuff_bits(&bits, 6);
        let data_words = stuffed.len() / 6;

        let matrix = crate::aztec::encoder::encode("STUFFING", 33, None).unwrap();
        let raw = {
            let mut raw = BitStream::new();
            for (x, y) in layout.data_positions() {
                raw.push(matrix.get(x, y));
            }
            raw
        };
        let out = correct_bits(&raw, &layout, data_words).unwrap();
        assert_eq!(decode_bits(&out, None).unwrap(), "STUFFING");
    }

    proptest! {
        #[test]
        fn proptest_text_roundtrip(text in "[ -~]{1,60}") {
            let bits = encode_text(&text, None).unwrap();
            prop_assert_eq!(decode_bits(&bits, None).unwrap(), text);
        }

        #[test]
        fn proptest_unicode_roundtrip(text in "\\PC{1,20}") {
            let bits = encode_text(&text, None).unwrap();
            prop_assert_eq!(decode_bits(&bits, None).unwrap(), text);
        }
    }
}
