use std::fmt::Display;
use std::mem;

use num_traits::PrimInt;

// Bit stream
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitStream {
    data: Vec<u8>,
    // Bit length
    len: usize,
}

impl BitStream {
    pub fn new() -> Self {
        Self { data: Vec::new(), len: 0 }
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self { data: Vec::with_capacity((bits + 7) >> 3), len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len, "Bit index out of range: Index {i}, Length {}", self.len);
        self.data[i >> 3] & (0b1000_0000 >> (i & 7)) != 0
    }

    pub fn push(&mut self, bit: bool) {
        let offset = self.len & 7;
        if offset == 0 {
            self.data.push(0);
        }
        if bit {
            let pos = self.len >> 3;
            self.data[pos] |= 0b1000_0000 >> offset;
        }
        self.len += 1;
    }

    // Pushes the lowest `size` bits of `bits`, most significant first
    pub fn push_bits<T>(&mut self, bits: T, size: usize)
    where
        T: PrimInt + Display,
    {
        let max_bits = mem::size_of::<T>() * 8;
        debug_assert!(size <= max_bits, "Bit count exceeds type width: Size {size}");
        debug_assert!(
            size >= max_bits - bits.leading_zeros() as usize,
            "Bit count shouldn't exceed bit length: Length {size}, Bits {bits}"
        );

        for i in (0..size).rev() {
            let bit = (bits >> i) & T::one() == T::one();
            self.push(bit);
        }
    }

    pub fn extend(&mut self, other: &BitStream) {
        for i in 0..other.len {
            self.push(other.get(i));
        }
    }

    // Groups bits into words of `size` bits, zero padding the tail
    pub fn words(&self, size: usize) -> Vec<u16> {
        let mut res = Vec::with_capacity(self.len.div_ceil(size));
        let mut i = 0;
        while i < self.len {
            let mut word = 0u16;
            for j in 0..size {
                word <<= 1;
                if i + j < self.len && self.get(i + j) {
                    word |= 1;
                }
            }
            res.push(word);
            i += size;
        }
        res
    }
}

// Bit reader
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    len: usize,
    cursor: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, len: data.len() << 3, cursor: 0 }
    }

    pub fn with_len(data: &'a [u8], len: usize) -> Self {
        debug_assert!(len <= data.len() << 3, "Bit length exceeds buffer");
        Self { data, len, cursor: 0 }
    }

    pub fn available(&self) -> usize {
        self.len - self.cursor
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn read(&mut self, size: usize) -> Option<u32> {
        debug_assert!(size <= 32, "Cannot read more than 32 bits at once");
        if size > self.available() {
            return None;
        }
        let mut res = 0u32;
        for _ in 0..size {
            let bit = self.data[self.cursor >> 3] & (0b1000_0000 >> (self.cursor & 7)) != 0;
            res = (res << 1) | bit as u32;
            self.cursor += 1;
        }
        Some(res)
    }
}

#[cfg(test)]
mod bit_stream_tests {
    use super::{BitReader, BitStream};

    #[test]
    fn test_len() {
        let mut bs = BitStream::new();
        assert_eq!(bs.len(), 0);
        bs.push_bits(0u8, 0);
        assert_eq!(bs.len(), 0);
        bs.push_bits(0b101u8, 3);
        assert_eq!(bs.len(), 3);
        bs.push_bits(0x3FFu16, 10);
        assert_eq!(bs.len(), 13);
        assert_eq!(bs.data().len(), 2);
    }

    #[test]
    fn test_push_bits() {
        let mut bs = BitStream::new();
        bs.push_bits(0b0001u8, 4);
        bs.push_bits(0b0000_0000_1010u16, 12);
        bs.push(true);
        assert_eq!(bs.data(), &[0b0001_0000, 0b0000_1010, 0b1000_0000]);
    }

    #[test]
    fn test_words() {
        let mut bs = BitStream::new();
        bs.push_bits(0b110011u8, 6);
        bs.push_bits(0b11u8, 2);
        assert_eq!(bs.words(4), vec![0b1100, 0b1111]);
        assert_eq!(bs.words(6), vec![0b110011, 0b110000]);
    }

    #[test]
    fn test_reader() {
        let data = [0b1010_1100, 0b0101_0000];
        let mut rd = BitReader::with_len(&data, 12);
        assert_eq!(rd.read(3), Some(0b101));
        assert_eq!(rd.read(5), Some(0b01100));
        assert_eq!(rd.available(), 4);
        assert_eq!(rd.read(5), None);
        assert_eq!(rd.read(4), Some(0b0101));
        assert_eq!(rd.available(), 0);
    }
}
