//! Reed-Solomon error correction, block splitting and interleaving.

use crate::qrcode::{EcLevel, Version};
use crate::segment::BitBuffer;

/// One error-correction block: its slice of the data codewords and the
/// Reed-Solomon remainder computed over them.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Block {
    pub data: Vec<u8>,
    pub ecc: Vec<u8>,
}

/// Block structure mandated for a (version, level) pair. Blocks come in at
/// most two sizes; the longer ones hold one extra data codeword.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockLayout {
    pub num_blocks: usize,
    pub num_short_blocks: usize,
    pub short_block_data_len: usize,
    pub ecc_len: usize,
}

impl BlockLayout {
    pub fn new(ver: Version, ecl: EcLevel) -> Self {
        let num_blocks = table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl);
        let ecc_len = table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl);
        let rawcodewords = num_raw_data_modules(ver) / 8;
        Self {
            num_blocks,
            num_short_blocks: num_blocks - rawcodewords % num_blocks,
            short_block_data_len: rawcodewords / num_blocks - ecc_len,
            ecc_len,
        }
    }

    /// Data codewords held by block `i`.
    pub fn data_len(&self, i: usize) -> usize {
        self.short_block_data_len + usize::from(i >= self.num_short_blocks)
    }
}

/// Computes the correction codewords for `bitstream` and returns every
/// codeword of the symbol in transmission order.
///
/// # Panics
///
/// Panics if the bitstream is not exactly the data capacity of
/// (`version`, `ecl`); [`crate::segment::encode`] guarantees that.
pub fn correct(bitstream: &BitBuffer, version: Version, ecl: EcLevel) -> Vec<u8> {
    let blocks = split_into_blocks(bitstream.as_bytes(), version, ecl);
    interleave(&blocks)
}

/// Splits `data` into the blocks of (`ver`, `ecl`) and attaches each block's
/// Reed-Solomon remainder.
///
/// # Panics
///
/// Panics if `data.len()` is not the data capacity of (`ver`, `ecl`).
pub fn split_into_blocks(data: &[u8], ver: Version, ecl: EcLevel) -> Vec<Block> {
    assert_eq!(data.len(), num_data_codewords(ver, ecl), "Illegal argument");
    let layout = BlockLayout::new(ver, ecl);
    let rs = ReedSolomonGenerator::new(layout.ecc_len);
    let mut dat: &[u8] = data;
    let mut blocks = Vec::with_capacity(layout.num_blocks);
    for i in 0..layout.num_blocks {
        let (head, rest) = dat.split_at(layout.data_len(i));
        blocks.push(Block {
            data: head.to_vec(),
            ecc: rs.compute_remainder(head),
        });
        dat = rest;
    }
    debug_assert!(dat.is_empty());
    blocks
}

/// Column-wise interleave: codeword 0 of every block, then codeword 1, and so
/// on, skipping blocks already exhausted; correction codewords follow in the
/// same order.
pub fn interleave(blocks: &[Block]) -> Vec<u8> {
    let total: usize = blocks.iter().map(|b| b.data.len() + b.ecc.len()).sum();
    let mut result = Vec::with_capacity(total);
    let maxdata = blocks.iter().map(|b| b.data.len()).max().unwrap_or(0);
    for j in 0..maxdata {
        result.extend(blocks.iter().filter_map(|b| b.data.get(j)));
    }
    let maxecc = blocks.iter().map(|b| b.ecc.len()).max().unwrap_or(0);
    for j in 0..maxecc {
        result.extend(blocks.iter().filter_map(|b| b.ecc.get(j)));
    }
    result
}

/// Number of modules available for data and correction codewords, remainder
/// bits included.
pub fn num_raw_data_modules(ver: Version) -> usize {
    let ver = usize::from(ver.value());
    let mut result: usize = (16 * ver + 128) * ver + 64;
    if ver >= 2 {
        let numalign: usize = ver / 7 + 2;
        result -= (25 * numalign - 10) * numalign - 55;
        if ver >= 7 {
            result -= 36;
        }
    }
    result
}

/// Number of 8-bit data codewords a symbol of (`ver`, `ecl`) holds.
pub fn num_data_codewords(ver: Version, ecl: EcLevel) -> usize {
    num_raw_data_modules(ver) / 8
        - table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl)
            * table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl)
}

fn table_get(table: &'static [[i8; 41]; 4], ver: Version, ecl: EcLevel) -> usize {
    table[ecl.ordinal()][usize::from(ver.value())] as usize
}

/// Generator polynomial for a fixed number of correction codewords, over
/// GF(2^8) with modulus 0x11D.
pub struct ReedSolomonGenerator {
    divisor: [u8; 30],
    degree: usize,
}

impl ReedSolomonGenerator {
    /// # Panics
    ///
    /// Panics if `degree` is not in 1..=30.
    pub fn new(degree: usize) -> Self {
        let mut result = Self {
            divisor: [0u8; 30],
            degree,
        };
        assert!((1..=result.divisor.len()).contains(&degree), "Degree out of range");
        let divisor: &mut [u8] = &mut result.divisor[..degree];
        divisor[degree - 1] = 1;
        // Multiply by (x - r^i) for i in 0..degree, r = 0x02
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                divisor[j] = Self::multiply(divisor[j], root);
                if j + 1 < degree {
                    divisor[j] ^= divisor[j + 1];
                }
            }
            root = Self::multiply(root, 0x02);
        }
        result
    }

    /// Remainder of `data` (as a polynomial) divided by the generator.
    pub fn compute_remainder(&self, data: &[u8]) -> Vec<u8> {
        let mut result = vec![0u8; self.degree];
        for b in data {
            let factor: u8 = b ^ result[0];
            result.copy_within(1.., 0);
            result[self.degree - 1] = 0;
            for (x, &y) in result.iter_mut().zip(self.divisor.iter()) {
                *x ^= Self::multiply(y, factor);
            }
        }
        result
    }

    fn multiply(x: u8, y: u8) -> u8 {
        let mut z: u8 = 0;
        for i in (0..8).rev() {
            z = (z << 1) ^ ((z >> 7) * 0x1d);
            z ^= ((y >> i) & 1) * x;
        }
        z
    }
}

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u8) -> Version {
        Version::new(n.into()).unwrap()
    }

    #[test]
    fn test_hello_world_remainder() {
        let data = [32, 91, 11, 120, 209, 114, 220, 77, 67, 64, 236, 17, 236, 17, 236, 17];
        let blocks = split_into_blocks(&data, v(1), EcLevel::Medium);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].ecc, vec![196, 35, 39, 119, 235, 215, 231, 226, 93, 23]);
    }

    #[test]
    fn test_capacity_table() {
        assert_eq!(num_data_codewords(v(1), EcLevel::Low), 19);
        assert_eq!(num_data_codewords(v(1), EcLevel::High), 9);
        assert_eq!(num_data_codewords(v(5), EcLevel::Quartile), 62);
        assert_eq!(num_data_codewords(v(40), EcLevel::Low), 2956);
        assert_eq!(num_data_codewords(v(40), EcLevel::High), 1276);
        assert_eq!(num_raw_data_modules(v(1)), 208);
        assert_eq!(num_raw_data_modules(v(40)), 29648);
    }

    #[test]
    fn test_two_block_groups() {
        // 5-Q: 2 blocks of 15 and 2 blocks of 16 data codewords, 18 EC each
        let layout = BlockLayout::new(v(5), EcLevel::Quartile);
        assert_eq!(layout.num_blocks, 4);
        assert_eq!(layout.num_short_blocks, 2);
        assert_eq!(layout.short_block_data_len, 15);
        assert_eq!(layout.ecc_len, 18);
        assert_eq!((0..4).map(|i| layout.data_len(i)).collect::<Vec<_>>(), vec![15, 15, 16, 16]);
    }

    #[test]
    fn test_interleave_skips_exhausted_blocks() {
        let data: Vec<u8> = (0..62).collect();
        let blocks = split_into_blocks(&data, v(5), EcLevel::Quartile);
        let out = interleave(&blocks);
        assert_eq!(out.len(), num_raw_data_modules(v(5)) / 8);
        // Block starts: 0, 15, 30, 46
        assert_eq!(&out[..8], &[0, 15, 30, 46, 1, 16, 31, 47]);
        // Column 15 exists only in the two long blocks
        assert_eq!(&out[60..62], &[45, 61]);
        // Correction codewords start right after the data
        assert_eq!(out[62], blocks[0].ecc[0]);
        assert_eq!(out[63], blocks[1].ecc[0]);
        assert_eq!(*out.last().unwrap(), blocks[3].ecc[17]);
    }

    #[test]
    fn test_remainder_of_codeword_is_zero() {
        // A full codeword (data followed by its remainder) is divisible by
        // the generator.
        let rs = ReedSolomonGenerator::new(10);
        let data = b"remainder check";
        let mut codeword = data.to_vec();
        codeword.extend(rs.compute_remainder(data));
        assert!(rs.compute_remainder(&codeword).iter().all(|&b| b == 0));
    }
}
