use tracing::trace;

use super::version::{ECLevel, Version};
use crate::common::charset::{guess_decode, Charset};
use crate::common::{BarcodeError, BarcodeResult, BitReader, BitStream};

// Mode
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
    Kanji,
    Eci,
}

impl Mode {
    pub fn indicator(self) -> u8 {
        match self {
            Self::Numeric => 0b0001,
            Self::Alphanumeric => 0b0010,
            Self::Byte => 0b0100,
            Self::Kanji => 0b1000,
            Self::Eci => 0b0111,
        }
    }

    pub fn char_count_bits(self, version: Version) -> usize {
        let i = match *version {
            1..=9 => 0,
            10..=26 => 1,
            _ => 2,
        };
        match self {
            Self::Numeric => [10, 12, 14][i],
            Self::Alphanumeric => [9, 11, 13][i],
            Self::Byte => [8, 16, 16][i],
            Self::Kanji => [8, 10, 12][i],
            Self::Eci => 0,
        }
    }
}

static ALPHANUMERIC: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

fn alnum_value(c: u8) -> Option<u16> {
    ALPHANUMERIC.iter().position(|&a| a == c).map(|p| p as u16)
}

// Segment
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Segment {
    mode: Mode,
    num_chars: usize,
    bits: BitStream,
}

impl Segment {
    fn numeric(digits: &[u8]) -> Self {
        let mut bits = BitStream::with_capacity(digits.len() * 10 / 3 + 1);
        for chunk in digits.chunks(3) {
            let val = chunk.iter().fold(0u16, |acc, &d| acc * 10 + (d - b'0') as u16);
            bits.push_bits(val, chunk.len() * 3 + 1);
        }
        Self { mode: Mode::Numeric, num_chars: digits.len(), bits }
    }

    fn alphanumeric(text: &[u8]) -> Self {
        let mut bits = BitStream::with_capacity(text.len() * 11 / 2 + 6);
        for chunk in text.chunks(2) {
            let vals: Vec<u16> = chunk.iter().filter_map(|&c| alnum_value(c)).collect();
            match vals.as_slice() {
                [a, b] => bits.push_bits(a * 45 + b, 11),
                [a] => bits.push_bits(*a, 6),
                _ => unreachable!("Chunk holds one or two alphanumeric characters"),
            }
        }
        Self { mode: Mode::Alphanumeric, num_chars: text.len(), bits }
    }

    fn bytes(data: &[u8]) -> Self {
        let mut bits = BitStream::with_capacity(data.len() * 8);
        for &b in data {
            bits.push_bits(b, 8);
        }
        Self { mode: Mode::Byte, num_chars: data.len(), bits }
    }

    fn eci(value: u32) -> Self {
        let mut bits = BitStream::new();
        if value < (1 << 7) {
            bits.push_bits(value, 8);
        } else if value < (1 << 14) {
            bits.push_bits(0b10u8, 2);
            bits.push_bits(value, 14);
        } else {
            bits.push_bits(0b110u8, 3);
            bits.push_bits(value, 21);
        }
        Self { mode: Mode::Eci, num_chars: 0, bits }
    }

    fn bit_len(&self, version: Version) -> Option<usize> {
        let cc_bits = self.mode.char_count_bits(version);
        if self.mode != Mode::Eci && self.num_chars >= 1 << cc_bits {
            return None;
        }
        Some(4 + cc_bits + self.bits.len())
    }
}

/// Splits text into segments using the densest single mode that covers all of it.
/// Non-ASCII text goes out as bytes behind an ECI header for its character set.
pub fn make_segments(data: &str, charset: Option<Charset>) -> BarcodeResult<Vec<Segment>> {
    let bytes = data.as_bytes();
    if bytes.iter().all(u8::is_ascii_digit) {
        return Ok(vec![Segment::numeric(bytes)]);
    }
    if bytes.iter().all(|&c| alnum_value(c).is_some()) {
        return Ok(vec![Segment::alphanumeric(bytes)]);
    }
    if data.is_ascii() {
        return Ok(vec![Segment::bytes(bytes)]);
    }

    let charset = charset.unwrap_or(Charset::Utf8);
    let eci = charset.eci().ok_or(BarcodeError::UnsupportedCharset)?;
    let encoded = charset.encode(data)?;
    Ok(vec![Segment::eci(eci), Segment::bytes(&encoded)])
}

fn total_bits(segments: &[Segment], version: Version) -> Option<usize> {
    segments.iter().map(|s| s.bit_len(version)).sum()
}

/// Picks the smallest version that fits and returns it with the padded data codewords.
pub fn encode_data(data: &str, ecl: ECLevel, charset: Option<Charset>) -> BarcodeResult<(Version, Vec<u8>)> {
    if data.is_empty() {
        return Err(BarcodeError::EmptyData);
    }

    let segments = make_segments(data, charset)?;
    let version = Version::all()
        .find(|&v| total_bits(&segments, v).is_some_and(|b| b <= v.data_bit_capacity(ecl)))
        .ok_or(BarcodeError::DataTooLong)?;
    let capacity = version.data_bit_capacity(ecl);

    let mut bs = BitStream::with_capacity(capacity);
    for seg in segments.iter() {
        bs.push_bits(seg.mode.indicator(), 4);
        bs.push_bits(seg.num_chars, seg.mode.char_count_bits(version));
        bs.extend(&seg.bits);
    }

    // Terminator, byte alignment and alternating pad codewords
    let term = (capacity - bs.len()).min(4);
    bs.push_bits(0u8, term);
    while bs.len() & 7 != 0 {
        bs.push(false);
    }
    for pad in [0xECu8, 0x11].iter().cycle() {
        if bs.len() >= capacity {
            break;
        }
        bs.push_bits(*pad, 8);
    }

    trace!(version = *version, ecl = %ecl, bits = bs.len(), "Encoded QR data codewords");
    Ok((version, bs.data().to_vec()))
}

// Decoder
//------------------------------------------------------------------------------

/// Parses corrected data codewords into text.
pub fn decode_data(data: &[u8], version: Version, fallback: Option<Charset>) -> BarcodeResult<String> {
    let mut rd = BitReader::new(data);
    let mut res = String::new();
    let mut charset: Option<Charset> = None;

    loop {
        if rd.available() < 4 {
            break;
        }
        let mode = rd.read(4).ok_or(BarcodeError::InvalidCodeword)?;
        match mode {
            0b0000 => break,
            0b0001 => {
                let n = read_count(&mut rd, Mode::Numeric, version)?;
                decode_numeric(&mut rd, n, &mut res)?;
            }
            0b0010 => {
                let n = read_count(&mut rd, Mode::Alphanumeric, version)?;
                decode_alphanumeric(&mut rd, n, &mut res)?;
            }
            0b0100 => {
                let n = read_count(&mut rd, Mode::Byte, version)?;
                let bytes = read_bytes(&mut rd, n)?;
                match charset {
                    Some(cs) => res.push_str(&cs.decode(&bytes)),
                    None => res.push_str(&guess_decode(&bytes, fallback)),
                }
            }
            0b1000 => {
                let n = read_count(&mut rd, Mode::Kanji, version)?;
                decode_kanji(&mut rd, n, &mut res)?;
            }
            0b0111 => {
                let eci = read_eci(&mut rd)?;
                charset = Some(Charset::for_eci(eci).ok_or(BarcodeError::UnsupportedCharset)?);
            }
            // Structured append carries sequence info only
            0b0011 => {
                rd.read(16).ok_or(BarcodeError::InvalidCodeword)?;
            }
            // FNC1 first position and second position
            0b0101 => {}
            0b1001 => {
                rd.read(8).ok_or(BarcodeError::InvalidCodeword)?;
            }
            _ => return Err(BarcodeError::InvalidCodeword),
        }
    }
    Ok(res)
}

fn read_count(rd: &mut BitReader, mode: Mode, version: Version) -> BarcodeResult<usize> {
    rd.read(mode.char_count_bits(version)).map(|n| n as usize).ok_or(BarcodeError::InvalidCodeword)
}

fn read_bytes(rd: &mut BitReader, n: usize) -> BarcodeResult<Vec<u8>> {
    (0..n).map(|_| rd.read(8).map(|b| b as u8).ok_or(BarcodeError::InvalidCodeword)).collect()
}

fn read_eci(rd: &mut BitReader) -> BarcodeResult<u32> {
    let first = rd.read(8).ok_or(BarcodeError::InvalidCodeword)?;
    if first & 0x80 == 0 {
        return Ok(first);
    }
    if first & 0xC0 == 0x80 {
        let second = rd.read(8).ok_or(BarcodeError::InvalidCodeword)?;
        return Ok(((first & 0x3F) << 8) | second);
    }
    if first & 0xE0 == 0xC0 {
        let rest = rd.read(16).ok_or(BarcodeError::InvalidCodeword)?;
        return Ok(((first & 0x1F) << 16) | rest);
    }
    Err(BarcodeError::InvalidCodeword)
}

fn decode_numeric(rd: &mut BitReader, mut n: usize, res: &mut String) -> BarcodeResult<()> {
    while n > 0 {
        let digits = n.min(3);
        let val = rd.read(digits * 3 + 1).ok_or(BarcodeError::InvalidCodeword)?;
        if val >= 10u32.pow(digits as u32) {
            return Err(BarcodeError::InvalidCodeword);
        }
        res.push_str(&format!("{val:0digits$}"));
        n -= digits;
    }
    Ok(())
}

fn decode_alphanumeric(rd: &mut BitReader, mut n: usize, res: &mut String) -> BarcodeResult<()> {
    while n > 0 {
        if n >= 2 {
            let val = rd.read(11).ok_or(BarcodeError::InvalidCodeword)? as usize;
            if val >= 45 * 45 {
                return Err(BarcodeError::InvalidCodeword);
            }
            res.push(ALPHANUMERIC[val / 45] as char);
            res.push(ALPHANUMERIC[val % 45] as char);
            n -= 2;
        } else {
            let val = rd.read(6).ok_or(BarcodeError::InvalidCodeword)? as usize;
            if val >= 45 {
                return Err(BarcodeError::InvalidCodeword);
            }
            res.push(ALPHANUMERIC[val] as char);
            n -= 1;
        }
    }
    Ok(())
}

fn decode_kanji(rd: &mut BitReader, n: usize, res: &mut String) -> BarcodeResult<()> {
    let mut sjis = Vec::with_capacity(n * 2);
    for _ in 0..n {
        let val = rd.read(13).ok_or(BarcodeError::InvalidCodeword)?;
        let mut assembled = ((val / 0xC0) << 8) | (val % 0xC0);
        assembled += if assembled < 0x1F00 { 0x8140 } else { 0xC140 };
        sjis.push((assembled >> 8) as u8);
        sjis.push(assembled as u8);
    }
    let (text, _, _) = encoding_rs::SHIFT_JIS.decode(&sjis);
    res.push_str(&text);
    Ok(())
}

#[cfg(test)]
mod codec_tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_hello_world_codewords() {
        let (v, data) = encode_data("HELLO WORLD", ECLevel::M, None).unwrap();
        assert_eq!(v, Version::new(1));
        assert_eq!(data, vec![32, 91, 11, 120, 209, 114, 220, 77, 67, 64, 236, 17, 236, 17, 236, 17]);
    }

    #[test_case("01234567")]
    #[test_case("HELLO WORLD")]
    #[test_case("hello QR")]
    #[test_case("https://example.com/?q=1&r=2")]
    #[test_case("Grüße aus Köln")]
    #[test_case("日本語のテキスト")]
    fn test_roundtrip(text: &str) {
        for ecl in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
            let (v, data) = encode_data(text, ecl, None).unwrap();
            assert_eq!(data.len(), v.data_codewords(ecl));
            assert_eq!(decode_data(&data, v, None).unwrap(), text);
        }
    }

    #[test]
    fn test_latin1_eci() {
        let (v, data) = encode_data("café", ECLevel::L, Some(Charset::Latin1)).unwrap();
        // ECI header announcing ISO-8859-1
        assert_eq!(data[0] >> 4, 0b0111);
        assert_eq!(decode_data(&data, v, None).unwrap(), "café");
    }

    #[test]
    fn test_capacity() {
        let max = "1".repeat(7089);
        let (v, _) = encode_data(&max, ECLevel::L, None).unwrap();
        assert_eq!(v, Version::MAX);
        assert_eq!(encode_data(&"1".repeat(7090), ECLevel::L, None).unwrap_err(), BarcodeError::DataTooLong);
        assert_eq!(encode_data("", ECLevel::L, None).unwrap_err(), BarcodeError::EmptyData);
    }

    #[test]
    fn test_kanji() {
        // Mode 1000, count 2, then two 13 bit kanji values for "点茗"
        let mut bs = BitStream::new();
        bs.push_bits(0b1000u8, 4);
        bs.push_bits(2u8, 8);
        bs.push_bits(0x0D9Fu16, 13);
        bs.push_bits(0x1AAAu16, 13);
        bs.push_bits(0u8, 4);
        while bs.len() & 7 != 0 {
            bs.push(false);
        }
        assert_eq!(decode_data(bs.data(), Version::new(1), None).unwrap(), "点茗");
    }
}
