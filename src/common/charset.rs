use encoding_rs::Encoding;

use super::error::{BarcodeError, BarcodeResult};

// Character sets
// ISO-8859-1 is handled by hand, encoding_rs maps that label to windows-1252.
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Latin1,
    Utf8,
    Other(&'static Encoding),
}

// ECI assignment numbers with their labels
static ECI_TABLE: [(u32, &str); 27] = [
    (0, "IBM437"),
    (1, "ISO-8859-1"),
    (2, "IBM437"),
    (3, "ISO-8859-1"),
    (4, "ISO-8859-2"),
    (5, "ISO-8859-3"),
    (6, "ISO-8859-4"),
    (7, "ISO-8859-5"),
    (8, "ISO-8859-6"),
    (9, "ISO-8859-7"),
    (10, "ISO-8859-8"),
    (11, "ISO-8859-9"),
    (12, "ISO-8859-10"),
    (13, "ISO-8859-11"),
    (15, "ISO-8859-13"),
    (16, "ISO-8859-14"),
    (17, "ISO-8859-15"),
    (18, "ISO-8859-16"),
    (20, "Shift_JIS"),
    (21, "windows-1250"),
    (22, "windows-1251"),
    (23, "windows-1252"),
    (24, "windows-1256"),
    (25, "UTF-16BE"),
    (26, "UTF-8"),
    (28, "Big5"),
    (29, "GB18030"),
];

impl Charset {
    pub fn for_label(label: &str) -> BarcodeResult<Self> {
        let label = label.trim();
        let is_latin1 = ["ISO-8859-1", "ISO8859_1", "ISO_8859_1", "LATIN1", "L1"]
            .iter()
            .any(|l| l.eq_ignore_ascii_case(label));
        if is_latin1 {
            return Ok(Self::Latin1);
        }
        match Encoding::for_label(label.as_bytes()) {
            Some(enc) if enc == encoding_rs::UTF_8 => Ok(Self::Utf8),
            Some(enc) => Ok(Self::Other(enc)),
            None => Err(BarcodeError::UnsupportedCharset),
        }
    }

    pub fn for_eci(eci: u32) -> Option<Self> {
        // US-ASCII decodes as Latin-1 without loss
        if eci == 27 || eci == 170 {
            return Some(Self::Latin1);
        }
        let (_, label) = ECI_TABLE.iter().find(|(v, _)| *v == eci)?;
        Self::for_label(label).ok()
    }

    pub fn eci(&self) -> Option<u32> {
        match self {
            Self::Latin1 => Some(3),
            Self::Utf8 => Some(26),
            Self::Other(enc) => ECI_TABLE
                .iter()
                .find(|(v, l)| *v > 3 && Encoding::for_label(l.as_bytes()) == Some(*enc))
                .map(|(v, _)| *v),
        }
    }

    pub fn encode(&self, text: &str) -> BarcodeResult<Vec<u8>> {
        match self {
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(c as u32).map_err(|_| BarcodeError::InvalidChar))
                .collect(),
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Other(enc) => {
                let (bytes, _, had_errors) = enc.encode(text);
                if had_errors || enc.output_encoding() != *enc {
                    return Err(BarcodeError::InvalidChar);
                }
                Ok(bytes.into_owned())
            }
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Other(enc) => enc.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }
}

/// Text of a byte segment that carried no ECI: UTF-8 when valid, else Latin-1.
pub fn guess_decode(bytes: &[u8], fallback: Option<Charset>) -> String {
    if let Some(cs) = fallback {
        return cs.decode(bytes);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => Charset::Latin1.decode(bytes),
    }
}

#[cfg(test)]
mod charset_tests {
    use super::{guess_decode, Charset};
    use test_case::test_case;

    #[test_case("UTF-8", Some(26))]
    #[test_case("utf8", Some(26))]
    #[test_case("ISO-8859-1", Some(3))]
    #[test_case("Shift_JIS", Some(20))]
    #[test_case("windows-1251", Some(22))]
    fn test_eci(label: &str, eci: Option<u32>) {
        assert_eq!(Charset::for_label(label).unwrap().eci(), eci);
    }

    #[test]
    fn test_unknown_label() {
        assert!(Charset::for_label("klingon").is_err());
    }

    #[test]
    fn test_latin1_roundtrip() {
        let cs = Charset::Latin1;
        let bytes = cs.encode("café").unwrap();
        assert_eq!(bytes, vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(cs.decode(&bytes), "café");
        assert!(cs.encode("日本").is_err());
    }

    #[test]
    fn test_shift_jis() {
        let cs = Charset::for_eci(20).unwrap();
        let bytes = cs.encode("日本").unwrap();
        assert_eq!(cs.decode(&bytes), "日本");
    }

    #[test]
    fn test_guess() {
        assert_eq!(guess_decode("über".as_bytes(), None), "über");
        assert_eq!(guess_decode(&[0xFC, b'b'], None), "üb");
    }
}
