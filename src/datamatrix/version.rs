use crate::common::{BarcodeError, BarcodeResult};

// Square ECC 200 symbol sizes
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSize {
    // Modules per side including finder and clock tracks
    pub size: usize,
    // Data regions per side
    pub regions: usize,
    pub data_codewords: usize,
    pub ec_codewords: usize,
    pub blocks: usize,
}

const fn sym(size: usize, regions: usize, data_codewords: usize, ec_codewords: usize, blocks: usize) -> SymbolSize {
    SymbolSize { size, regions, data_codewords, ec_codewords, blocks }
}

static SIZES: [SymbolSize; 24] = [
    sym(10, 1, 3, 5, 1),
    sym(12, 1, 5, 7, 1),
    sym(14, 1, 8, 10, 1),
    sym(16, 1, 12, 12, 1),
    sym(18, 1, 18, 14, 1),
    sym(20, 1, 22, 18, 1),
    sym(22, 1, 30, 20, 1),
    sym(24, 1, 36, 24, 1),
    sym(26, 1, 44, 28, 1),
    sym(32, 2, 62, 36, 1),
    sym(36, 2, 86, 42, 1),
    sym(40, 2, 114, 48, 1),
    sym(44, 2, 144, 56, 1),
    sym(48, 2, 174, 68, 1),
    sym(52, 2, 204, 84, 2),
    sym(64, 4, 280, 112, 2),
    sym(72, 4, 368, 144, 4),
    sym(80, 4, 456, 192, 4),
    sym(88, 4, 576, 224, 4),
    sym(96, 4, 696, 272, 4),
    sym(104, 4, 816, 336, 6),
    sym(120, 6, 1050, 408, 6),
    sym(132, 6, 1304, 496, 8),
    sym(144, 6, 1558, 620, 10),
];

impl SymbolSize {
    /// Smallest symbol holding `len` data codewords.
    pub fn for_data_len(len: usize) -> BarcodeResult<Self> {
        SIZES.iter().find(|s| s.data_codewords >= len).copied().ok_or(BarcodeError::DataTooLong)
    }

    pub fn for_size(size: usize) -> BarcodeResult<Self> {
        SIZES.iter().find(|s| s.size == size).copied().ok_or(BarcodeError::InvalidVersion)
    }

    // Side of one data region in modules
    pub fn region_size(&self) -> usize {
        self.size / self.regions - 2
    }

    // Side of the mapping matrix with finder and clock tracks removed
    pub fn mapping_size(&self) -> usize {
        self.region_size() * self.regions
    }

    pub fn total_codewords(&self) -> usize {
        self.data_codewords + self.ec_codewords
    }

    pub fn ec_per_block(&self) -> usize {
        self.ec_codewords / self.blocks
    }
}

#[cfg(test)]
mod version_tests {
    use super::*;

    #[test]
    fn test_codeword_totals() {
        for s in SIZES.iter() {
            let m = s.mapping_size();
            assert_eq!(m * m / 8, s.total_codewords(), "Size {}", s.size);
            assert_eq!(s.ec_codewords % s.blocks, 0);
        }
    }

    #[test]
    fn test_for_data_len() {
        assert_eq!(SymbolSize::for_data_len(3).unwrap().size, 10);
        assert_eq!(SymbolSize::for_data_len(4).unwrap().size, 12);
        assert_eq!(SymbolSize::for_data_len(1558).unwrap().size, 144);
        assert_eq!(SymbolSize::for_data_len(1559), Err(BarcodeError::DataTooLong));
    }
}
