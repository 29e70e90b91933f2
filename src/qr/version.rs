use std::fmt::{Display, Formatter};
use std::ops::Deref;

use crate::common::{BarcodeError, BarcodeResult};

// Error correction level
//------------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ECLevel {
    #[default]
    L = 0,
    M = 1,
    Q = 2,
    H = 3,
}

impl ECLevel {
    // Two bit value stored in the format info
    pub fn format_bits(self) -> u32 {
        match self {
            Self::L => 1,
            Self::M => 0,
            Self::Q => 3,
            Self::H => 2,
        }
    }

    pub fn from_format_bits(bits: u32) -> Self {
        match bits & 0b11 {
            1 => Self::L,
            0 => Self::M,
            3 => Self::Q,
            _ => Self::H,
        }
    }

    pub fn parse(s: &str) -> BarcodeResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" | "0" => Ok(Self::L),
            "M" | "1" => Ok(Self::M),
            "Q" | "2" => Ok(Self::Q),
            "H" | "3" => Ok(Self::H),
            _ => Err(BarcodeError::InvalidECLevel),
        }
    }
}

impl Display for ECLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(s)
    }
}

// Version
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(u8);

impl Deref for Version {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    pub fn new(v: u8) -> Self {
        debug_assert!((Self::MIN.0..=Self::MAX.0).contains(&v), "Invalid version: {v}");
        Self(v)
    }

    pub fn from_width(width: usize) -> BarcodeResult<Self> {
        if width < 21 || width > 177 || (width - 17) % 4 != 0 {
            return Err(BarcodeError::InvalidVersion);
        }
        Ok(Self(((width - 17) / 4) as u8))
    }

    pub fn all() -> impl Iterator<Item = Version> {
        (Self::MIN.0..=Self::MAX.0).map(Version)
    }

    pub fn width(self) -> usize {
        self.0 as usize * 4 + 17
    }

    // Modules available for data and ec codewords, remainder bits included
    pub fn raw_data_modules(self) -> usize {
        let v = self.0 as usize;
        let mut res = (16 * v + 128) * v + 64;
        if v >= 2 {
            let num_align = v / 7 + 2;
            res -= (25 * num_align - 10) * num_align - 55;
            if v >= 7 {
                res -= 36;
            }
        }
        res
    }

    pub fn total_codewords(self) -> usize {
        self.raw_data_modules() / 8
    }

    pub fn ec_per_block(self, ecl: ECLevel) -> usize {
        ECC_CODEWORDS_PER_BLOCK[ecl as usize][self.0 as usize - 1] as usize
    }

    pub fn num_blocks(self, ecl: ECLevel) -> usize {
        NUM_EC_BLOCKS[ecl as usize][self.0 as usize - 1] as usize
    }

    pub fn data_codewords(self, ecl: ECLevel) -> usize {
        self.total_codewords() - self.ec_per_block(ecl) * self.num_blocks(ecl)
    }

    pub fn data_bit_capacity(self, ecl: ECLevel) -> usize {
        self.data_codewords(ecl) * 8
    }

    // Centre coordinates of alignment patterns along one axis, ascending
    pub fn alignment_positions(self) -> Vec<usize> {
        let v = self.0 as usize;
        if v == 1 {
            return Vec::new();
        }
        let num_align = v / 7 + 2;
        let step = if v == 32 { 26 } else { (v * 4 + num_align * 2 + 1) / (num_align * 2 - 2) * 2 };
        let mut res: Vec<usize> = (0..num_align - 1).map(|i| v * 4 + 10 - i * step).collect();
        res.push(6);
        res.reverse();
        res
    }

    // Version info with BCH(18, 6) protection
    pub fn info(self) -> u32 {
        debug_assert!(self.0 >= 7, "Version info only exists from version 7");
        let v = self.0 as u32;
        let mut rem = v;
        for _ in 0..12 {
            rem = (rem << 1) ^ ((rem >> 11) * 0x1F25);
        }
        (v << 12) | rem
    }
}

pub fn valid_version_infos() -> Vec<u32> {
    (7..=40).map(|v| Version(v).info()).collect()
}

// Format info
//------------------------------------------------------------------------------

pub fn format_info(ecl: ECLevel, mask: u8) -> u32 {
    let data = (ecl.format_bits() << 3) | mask as u32;
    let mut rem = data;
    for _ in 0..10 {
        rem = (rem << 1) ^ ((rem >> 9) * 0x537);
    }
    ((data << 10) | rem) ^ 0x5412
}

pub fn valid_format_infos() -> Vec<u32> {
    let mut res = Vec::with_capacity(32);
    for ecl in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
        for mask in 0..8 {
            res.push(format_info(ecl, mask));
        }
    }
    res
}

// Returns (ec level, mask) for a corrected format info
pub fn parse_format_info(info: u32) -> (ECLevel, u8) {
    let data = (info ^ 0x5412) >> 10;
    (ECLevel::from_format_bits(data >> 3), (data & 0b111) as u8)
}

// Tables
//------------------------------------------------------------------------------

static ECC_CODEWORDS_PER_BLOCK: [[u8; 40]; 4] = [
    [
        7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    [
        10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ],
    [
        13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    [
        17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
];

static NUM_EC_BLOCKS: [[u8; 40]; 4] = [
    [
        1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13, 14,
        15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ],
    [
        1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23,
        25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ],
    [
        1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29, 34,
        34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ],
    [
        1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ],
];

#[cfg(test)]
mod version_tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, ECLevel::L, 19)]
    #[test_case(1, ECLevel::M, 16)]
    #[test_case(1, ECLevel::H, 9)]
    #[test_case(40, ECLevel::L, 2956)]
    #[test_case(40, ECLevel::H, 1276)]
    fn test_data_codewords(v: u8, ecl: ECLevel, exp: usize) {
        assert_eq!(Version::new(v).data_codewords(ecl), exp);
    }

    #[test_case(1, &[])]
    #[test_case(2, &[6, 18])]
    #[test_case(7, &[6, 22, 38])]
    #[test_case(32, &[6, 34, 60, 86, 112, 138])]
    #[test_case(40, &[6, 30, 58, 86, 114, 142, 170])]
    fn test_alignment_positions(v: u8, exp: &[usize]) {
        assert_eq!(Version::new(v).alignment_positions(), exp);
    }

    #[test]
    fn test_version_info() {
        assert_eq!(Version::new(7).info(), 0x07C94);
        assert_eq!(Version::new(40).info(), 0x28C69);
    }

    #[test]
    fn test_format_info() {
        // M with mask 0 is the first entry of the ISO table
        assert_eq!(format_info(ECLevel::M, 0), 0x5412);
        assert_eq!(format_info(ECLevel::L, 4), 0x662F);
        assert_eq!(parse_format_info(0x662F), (ECLevel::L, 4));
    }

    #[test]
    fn test_from_width() {
        assert_eq!(Version::from_width(21).unwrap(), Version::new(1));
        assert_eq!(Version::from_width(177).unwrap(), Version::new(40));
        assert!(Version::from_width(22).is_err());
    }
}
