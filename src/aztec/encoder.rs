use tracing::debug;

use super::layout::{field, orientation_marks, Layout};
use crate::common::charset::Charset;
use crate::common::ec::{aztec_param_field, ec_codewords};
use crate::common::{BarcodeError, BarcodeResult, BitMatrix, BitStream};

pub const DEFAULT_EC_PERCENT: usize = 33;

// Binary shift carries at most 31 + 2047 bytes
const MAX_BINARY_RUN: usize = 2078;

// High level encoding
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Upper,
    Lower,
    Digit,
}

impl Mode {
    fn bits(self) -> usize {
        if self == Self::Digit {
            4
        } else {
            5
        }
    }

    fn code(self, b: u8) -> Option<u8> {
        match (self, b) {
            (_, b' ') => Some(1),
            (Self::Upper, b'A'..=b'Z') => Some(b - b'A' + 2),
            (Self::Lower, b'a'..=b'z') => Some(b - b'a' + 2),
            (Self::Digit, b'0'..=b'9') => Some(b - b'0' + 2),
            (Self::Digit, b',') => Some(12),
            (Self::Digit, b'.') => Some(13),
            _ => None,
        }
    }

    fn home(b: u8) -> Option<Self> {
        match b {
            b'A'..=b'Z' => Some(Self::Upper),
            b'a'..=b'z' => Some(Self::Lower),
            b'0'..=b'9' => Some(Self::Digit),
            _ => None,
        }
    }
}

fn punct_code(b: u8) -> Option<u8> {
    static SINGLES: &[u8; 25] = b"!\"#$%&'()*+,-./:;<=>?[]{}";
    if b == b'\r' {
        return Some(1);
    }
    SINGLES.iter().position(|&p| p == b).map(|i| i as u8 + 6)
}

struct HighLevel {
    bits: BitStream,
    mode: Mode,
}

impl HighLevel {
    fn push(&mut self, code: u8, size: usize) {
        self.bits.push_bits(code, size);
    }

    fn latch(&mut self, to: Mode) {
        match (self.mode, to) {
            (Mode::Upper, Mode::Lower) => self.push(28, 5),
            (Mode::Upper, Mode::Digit) | (Mode::Lower, Mode::Digit) => self.push(30, 5),
            (Mode::Lower, Mode::Upper) => {
                self.push(30, 5);
                self.push(14, 4);
            }
            (Mode::Digit, Mode::Upper) => self.push(14, 4),
            (Mode::Digit, Mode::Lower) => {
                self.push(14, 4);
                self.push(28, 5);
            }
            _ => {}
        }
        self.mode = to;
    }

    fn eci(&mut self, eci: u32) {
        let digits = eci.to_string();
        // P/S then FLG(n)
        self.push(0, self.mode.bits());
        self.push(0, 5);
        self.push(digits.len() as u8, 3);
        for d in digits.bytes() {
            self.push(d - b'0' + 2, 4);
        }
    }

    fn binary(&mut self, bytes: &[u8]) {
        if self.mode == Mode::Digit {
            self.latch(Mode::Upper);
        }
        for chunk in bytes.chunks(MAX_BINARY_RUN) {
            self.push(31, 5);
            if chunk.len() <= 31 {
                self.push(chunk.len() as u8, 5);
            } else {
                self.push(0, 5);
                self.bits.push_bits((chunk.len() - 31) as u16, 11);
            }
            for &b in chunk {
                self.push(b, 8);
            }
        }
    }
}

fn needs_binary(b: u8) -> bool {
    b != b' ' && Mode::home(b).is_none() && punct_code(b).is_none()
}

/// Text to message bits using Upper, Lower and Digit modes with punctuation and
/// upper case shifts. Anything else travels in binary shift runs.
pub fn encode_text(data: &str, charset: Option<Charset>) -> BarcodeResult<BitStream> {
    if data.is_empty() {
        return Err(BarcodeError::EmptyData);
    }

    let mut hl = HighLevel { bits: BitStream::new(), mode: Mode::Upper };
    let bytes = if data.is_ascii() {
        data.as_bytes().to_vec()
    } else {
        let cs = charset.unwrap_or(Charset::Utf8);
        hl.eci(cs.eci().ok_or(BarcodeError::UnsupportedCharset)?);
        cs.encode(data)?
    };

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(code) = hl.mode.code(b) {
            hl.push(code, hl.mode.bits());
            i += 1;
            continue;
        }
        if let Some(code) = punct_code(b) {
            hl.push(0, hl.mode.bits());
            hl.push(code, 5);
            i += 1;
            continue;
        }
        if let Some(home) = Mode::home(b) {
            let next_upper = bytes.get(i + 1).is_some_and(|n| n.is_ascii_uppercase());
            if home == Mode::Upper && hl.mode != Mode::Upper && !next_upper {
                // U/S for a lone capital
                hl.push(if hl.mode == Mode::Digit { 15 } else { 28 }, hl.mode.bits());
                hl.push(b - b'A' + 2, 5);
            } else {
                hl.latch(home);
                let code = home.code(b).ok_or(BarcodeError::InvalidChar)?;
                hl.push(code, hl.mode.bits());
            }
            i += 1;
            continue;
        }

        let end = (i..bytes.len()).find(|&j| !needs_binary(bytes[j])).unwrap_or(bytes.len());
        hl.binary(&bytes[i..end]);
        i = end;
    }
    Ok(hl.bits)
}

// Bit stuffing
// Words of all zeros or all ones are reserved, so a word whose first size-1 bits are
// uniform gets its last bit forced to the complement and the bit is carried over.
//------------------------------------------------------------------------------

pub fn stuff_bits(bits: &BitStream, word_size: usize) -> BitStream {
    let n = bits.len();
    let mask = (1u16 << word_size) - 2;
    let mut out = BitStream::with_capacity(n + n / word_size + word_size);
    let mut i = 0;
    while i < n {
        let mut word = 0u16;
        for j in 0..word_size {
            if i + j >= n || bits.get(i + j) {
                word |= 1 << (word_size - 1 - j);
            }
        }
        if word & mask == mask {
            out.push_bits(word & mask, word_size);
            i += word_size - 1;
        } else if word & mask == 0 {
            out.push_bits(word | 1, word_size);
            i += word_size - 1;
        } else {
            out.push_bits(word, word_size);
            i += word_size;
        }
    }
    out
}

// Symbol construction
//------------------------------------------------------------------------------

fn choose_layout(bits: &BitStream, ec_percent: usize) -> BarcodeResult<(Layout, BitStream)> {
    let ecc_bits = bits.len() * ec_percent / 100 + 11;
    let total_size_bits = bits.len() + ecc_bits;

    let candidates = (1..=4).map(|l| Layout::new(true, l)).chain((4..=32).map(|l| Layout::new(false, l)));
    let mut stuffed: Option<(usize, BitStream)> = None;
    for layout in candidates {
        let total = layout.total_bits();
        if total_size_bits > total {
            continue;
        }
        let ws = layout.word_size();
        let sb = match stuffed.take() {
            Some((size, sb)) if size == ws => sb,
            _ => stuff_bits(bits, ws),
        };
        let usable = total - total % ws;
        let fits = !(layout.compact && sb.len() > ws * 64) && sb.len() + ecc_bits <= usable;
        if fits {
            return Ok((layout, sb));
        }
        stuffed = Some((ws, sb));
    }
    Err(BarcodeError::DataTooLong)
}

// Data words followed by parity, left padded with zeros to fill `total_bits`
fn add_check_words(data: &BitStream, total_bits: usize, word_size: usize) -> BitStream {
    let gf = if word_size == 4 { aztec_param_field() } else { field(word_size) };
    let words = data.words(word_size);
    let total_words = total_bits / word_size;
    let ec = ec_codewords(gf, &words, total_words - words.len());

    let mut res = BitStream::with_capacity(total_bits);
    res.push_bits(0u8, total_bits % word_size);
    for w in words.iter().chain(ec.iter()) {
        res.push_bits(*w, word_size);
    }
    res
}

pub fn mode_message(layout: &Layout, data_words: usize) -> BitStream {
    let mut bits = BitStream::new();
    if layout.compact {
        bits.push_bits(layout.layers - 1, 2);
        bits.push_bits(data_words - 1, 6);
        add_check_words(&bits, 28, 4)
    } else {
        bits.push_bits(layout.layers - 1, 5);
        bits.push_bits(data_words - 1, 11);
        add_check_words(&bits, 40, 4)
    }
}

fn draw_core(matrix: &mut BitMatrix, layout: &Layout) {
    let size = layout.size();
    let c = (size / 2) as i32;
    let r = layout.core_radius() as i32;

    // Reference grid, every other module along lines 16 apart through the centre
    if !layout.compact {
        let lines = (layout.base_size() / 2 - 1).div_ceil(15);
        for j in (0..lines).map(|i| i as i32 * 16) {
            for k in ((c as usize & 1)..size).step_by(2) {
                matrix.set((c - j) as usize, k, true);
                matrix.set((c + j) as usize, k, true);
                matrix.set(k, (c - j) as usize, true);
                matrix.set(k, (c + j) as usize, true);
            }
        }
    }

    // Bullseye rings, dark on even distances
    for y in -r + 1..r {
        for x in -r + 1..r {
            let ring = x.abs().max(y.abs());
            matrix.set((c + x) as usize, (c + y) as usize, ring % 2 == 0);
        }
    }

    for ((x, y), dark) in orientation_marks(r) {
        matrix.set((c + x) as usize, (c + y) as usize, dark);
    }
}

/// Encodes text into an Aztec module grid with at least `ec_percent` error correction.
pub fn encode(data: &str, ec_percent: usize, charset: Option<Charset>) -> BarcodeResult<BitMatrix> {
    let bits = encode_text(data, charset)?;
    let (layout, stuffed) = choose_layout(&bits, ec_percent.min(100))?;
    let ws = layout.word_size();
    let data_words = stuffed.len() / ws;
    debug!(compact = layout.compact, layers = layout.layers, data_words, "Encoding Aztec");

    let message = add_check_words(&stuffed, layout.total_bits(), ws);
    let size = layout.size();
    let mut matrix = BitMatrix::square(size);
    for (i, (x, y)) in layout.data_positions().into_iter().enumerate() {
        if message.get(i) {
            matrix.set(x, y, true);
        }
    }

    draw_core(&mut matrix, &layout);

    let c = (size / 2) as i32;
    let mode = mode_message(&layout, data_words);
    for (i, (dx, dy)) in layout.mode_positions().into_iter().enumerate() {
        matrix.set((c + dx) as usize, (c + dy) as usize, mode.get(i));
    }
    Ok(matrix)
}

#[cfg(test)]
mod encoder_tests {
    use super::*;

    fn bits_of(bs: &BitStream) -> String {
        (0..bs.len()).map(|i| if bs.get(i) { '1' } else { '0' }).collect()
    }

    #[test]
    fn test_upper_text() {
        // 'A' = 2, ' ' = 1, 'B' = 3 in Upper mode
        let bs = encode_text("A B", None).unwrap();
        assert_eq!(bits_of(&bs), "000100000100011");
    }

    #[test]
    fn test_lower_latch_and_shift() {
        // L/L, 'a', U/S, 'B', 'c'
        let bs = encode_text("aBc", None).unwrap();
        assert_eq!(bits_of(&bs), "1110000010111000001100100");
    }

    #[test]
    fn test_digits_and_punct() {
        // D/L, '1', '2', P/S, '!'
        let bs = encode_text("12!", None).unwrap();
        assert_eq!(bits_of(&bs), "1111000110100000000110");
    }

    #[test]
    fn test_binary_shift() {
        let bs = encode_text("A\u{1}", None).unwrap();
        // 'A', B/S, length 1, byte 0x01
        assert_eq!(bits_of(&bs), "00010111110000100000001");
    }

    #[test]
    fn test_stuffing() {
        let mut bs = BitStream::new();
        bs.push_bits(0b111111u8, 6);
        bs.push_bits(0b000000u8, 6);
        let st = stuff_bits(&bs, 6);
        // 11111 -> 111110, then 100000 as is, then the last 0 padded with ones
        assert_eq!(bits_of(&st), "111110100000011111");
    }

    #[test]
    fn test_compact_symbol_size() {
        let m = encode("HELLO", DEFAULT_EC_PERCENT, None).unwrap();
        assert_eq!(m.width(), 15);
        // Bullseye centre and orientation corner
        assert!(m.get(7, 7) && !m.get(8, 7) && m.get(9, 7));
        assert!(m.get(2, 2) && m.get(3, 2) && m.get(2, 3));
    }

    #[test]
    fn test_too_long() {
        let data = "\u{1}".repeat(3000);
        assert_eq!(encode(&data, DEFAULT_EC_PERCENT, None).unwrap_err(), BarcodeError::DataTooLong);
    }
}
