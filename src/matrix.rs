//! Function-pattern layout and zig-zag codeword placement.

use crate::mask::Mask;
use crate::qrcode::{EcLevel, Version};

/// BCH(15,5) generator for the format information.
const FORMAT_GENERATOR: u32 = 0x537;
/// XOR mask applied to the format information so it is never all light.
const FORMAT_MASK: u32 = 0x5412;
/// BCH(18,6) generator for the version information.
const VERSION_GENERATOR: u32 = 0x1F25;

/// A square grid of modules together with a map of which modules belong to
/// function patterns.
///
/// Function modules are drawn when the matrix is created and are never
/// touched by codeword placement or masking.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ModuleMatrix {
    version: Version,
    ec_level: EcLevel,
    size: usize,
    modules: Vec<bool>,
    function: Vec<bool>,
}

impl ModuleMatrix {
    /// A matrix with every function pattern drawn and all data modules
    /// light. The format area is reserved but left light.
    pub fn new(version: Version, ec_level: EcLevel) -> Self {
        let size = version.size();
        let mut result = Self {
            version,
            ec_level,
            size,
            modules: vec![false; size * size],
            function: vec![false; size * size],
        };
        result.draw_function_patterns();
        result
    }

    /// Lays out the function patterns, then fills the data area with
    /// `codewords` in placement order.
    ///
    /// # Panics
    ///
    /// Panics if `codewords` does not hold exactly the raw codeword capacity
    /// of `version`.
    pub fn build(codewords: &[u8], version: Version, ec_level: EcLevel) -> Self {
        let mut result = Self::new(version, ec_level);
        result.draw_codewords(codewords);
        result
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn ec_level(&self) -> EcLevel {
        self.ec_level
    }

    /// Side length in modules.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Color of the module at column `x`, row `y`; `true` is dark.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the matrix.
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.modules[self.index(x, y)]
    }

    /// Whether the module at column `x`, row `y` is part of a function pattern.
    pub fn is_function(&self, x: usize, y: usize) -> bool {
        self.function[self.index(x, y)]
    }

    pub fn dark_count(&self) -> usize {
        self.modules.iter().filter(|&&m| m).count()
    }

    /// Rows of modules, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> + '_ {
        self.modules.chunks_exact(self.size)
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(x < self.size && y < self.size, "module out of bounds");
        y * self.size + x
    }

    /// Inverts a data module. Function modules are left alone.
    pub(crate) fn flip(&mut self, x: usize, y: usize) {
        let i = self.index(x, y);
        if !self.function[i] {
            self.modules[i] = !self.modules[i];
        }
    }

    fn set_function(&mut self, x: usize, y: usize, isdark: bool) {
        let i = self.index(x, y);
        self.modules[i] = isdark;
        self.function[i] = true;
    }

    fn set_function_unbounded(&mut self, x: i32, y: i32, isdark: bool) {
        let range = 0..self.size as i32;
        if range.contains(&x) && range.contains(&y) {
            self.set_function(x as usize, y as usize, isdark);
        }
    }

    fn draw_function_patterns(&mut self) {
        let size = self.size;
        for i in 0..size {
            self.set_function(6, i, i % 2 == 0);
            self.set_function(i, 6, i % 2 == 0);
        }

        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(size - 4, 3);
        self.draw_finder_pattern(3, size - 4);

        let alignpatpos = alignment_pattern_positions(self.version);
        let last = alignpatpos.len().saturating_sub(1);
        for (i, &pos0) in alignpatpos.iter().enumerate() {
            for (j, &pos1) in alignpatpos.iter().enumerate() {
                // The three corners already hold finder patterns
                if (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0) {
                    continue;
                }
                self.draw_alignment_pattern(pos0, pos1);
            }
        }

        self.draw_format_raw(0);
        self.draw_version();
    }

    /// 7x7 finder centered at (x, y) plus its light separator ring.
    fn draw_finder_pattern(&mut self, x: usize, y: usize) {
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                let dist = dx.abs().max(dy.abs());
                self.set_function_unbounded(x as i32 + dx, y as i32 + dy, dist != 2 && dist != 4);
            }
        }
    }

    fn draw_alignment_pattern(&mut self, x: usize, y: usize) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let dist = dx.abs().max(dy.abs());
                self.set_function_unbounded(x as i32 + dx, y as i32 + dy, dist != 1);
            }
        }
    }

    /// Writes the level and mask into both copies of the format area.
    pub(crate) fn draw_format_bits(&mut self, mask: Mask) {
        let data = u32::from((self.ec_level.format_bits() << 3) | mask.value());
        let mut rem: u32 = data;
        for _ in 0..10 {
            rem = (rem << 1) ^ ((rem >> 9) * FORMAT_GENERATOR);
        }
        self.draw_format_raw(((data << 10) | rem) ^ FORMAT_MASK);
    }

    fn draw_format_raw(&mut self, bits: u32) {
        // First copy, around the top-left finder
        for i in 0..6 {
            self.set_function(8, i, get_bit(bits, i as u8));
        }
        self.set_function(8, 7, get_bit(bits, 6));
        self.set_function(8, 8, get_bit(bits, 7));
        self.set_function(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function(14 - i, 8, get_bit(bits, i as u8));
        }

        // Second copy, split between the other two finders
        let size = self.size;
        for i in 0..8 {
            self.set_function(size - 1 - i, 8, get_bit(bits, i as u8));
        }
        for i in 8..15 {
            self.set_function(8, size - 15 + i, get_bit(bits, i as u8));
        }
        self.set_function(8, size - 8, true); // Always dark
    }

    fn draw_version(&mut self) {
        let ver = u32::from(self.version.value());
        if ver < 7 {
            return;
        }
        let mut rem: u32 = ver;
        for _ in 0..12 {
            rem = (rem << 1) ^ ((rem >> 11) * VERSION_GENERATOR);
        }
        let bits = (ver << 12) | rem;
        let size = self.size;
        for i in 0..18usize {
            let bit = get_bit(bits, i as u8);
            let a = size - 11 + i % 3;
            let b = i / 3;
            self.set_function(a, b, bit);
            self.set_function(b, a, bit);
        }
    }

    /// Places codeword bits in two-column strips from the right edge,
    /// alternating upward and downward, skipping the vertical timing column.
    fn draw_codewords(&mut self, data: &[u8]) {
        assert_eq!(
            data.len(),
            crate::ecc::num_raw_data_modules(self.version) / 8,
            "Illegal argument"
        );
        let size = self.size;
        let mut i: usize = 0;
        let mut right: usize = size - 1;
        loop {
            if right == 6 {
                right = 5;
            }
            let upward = ((right + 1) & 2) == 0;
            for vert in 0..size {
                let y = if upward { size - 1 - vert } else { vert };
                for j in 0..2 {
                    let x = right - j;
                    let idx = self.index(x, y);
                    if !self.function[idx] && i < data.len() * 8 {
                        self.modules[idx] = get_bit(data[i >> 3].into(), 7 - (i & 7) as u8);
                        i += 1;
                    }
                    // Remainder bits stay light
                }
            }
            if right < 3 {
                break;
            }
            right -= 2;
        }
        debug_assert_eq!(i, data.len() * 8);
    }

    /// The 15 raw format bits as stored in the copy around the top-left finder.
    pub fn read_format_bits(&self) -> u32 {
        let mut bits = 0u32;
        let mut put = |i: u32, dark: bool| bits |= u32::from(dark) << i;
        for i in 0..6 {
            put(i, self.get(8, i as usize));
        }
        put(6, self.get(8, 7));
        put(7, self.get(8, 8));
        put(8, self.get(7, 8));
        for i in 9..15 {
            put(i, self.get(14 - i as usize, 8));
        }
        bits
    }

    /// Error correction level recorded in the format information.
    pub fn read_error_correction_level(&self) -> EcLevel {
        let data = (self.read_format_bits() ^ FORMAT_MASK) >> 10;
        EcLevel::from_format_bits((data >> 3) as u8)
    }

    /// Mask recorded in the format information.
    pub fn read_mask(&self) -> Mask {
        let data = (self.read_format_bits() ^ FORMAT_MASK) >> 10;
        Mask::new((data & 7) as u8)
    }
}

/// Center coordinates of the alignment patterns along one axis, ascending.
/// Empty for version 1.
pub fn alignment_pattern_positions(version: Version) -> Vec<usize> {
    let ver = usize::from(version.value());
    if ver == 1 {
        return Vec::new();
    }
    let numalign = ver / 7 + 2;
    let step = if ver == 32 {
        26
    } else {
        (ver * 4 + numalign * 2 + 1) / (numalign * 2 - 2) * 2
    };
    let size = version.size();
    let mut result: Vec<usize> = (0..numalign - 1).map(|i| size - 7 - i * step).collect();
    result.push(6);
    result.reverse();
    result
}

fn get_bit(x: u32, i: u8) -> bool {
    ((x >> i) & 1) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u32) -> Version {
        Version::new(n).unwrap()
    }

    #[test]
    fn test_alignment_positions() {
        assert!(alignment_pattern_positions(v(1)).is_empty());
        assert_eq!(alignment_pattern_positions(v(2)), vec![6, 18]);
        assert_eq!(alignment_pattern_positions(v(7)), vec![6, 22, 38]);
        assert_eq!(alignment_pattern_positions(v(32)), vec![6, 34, 60, 86, 112, 138]);
        assert_eq!(alignment_pattern_positions(v(40)), vec![6, 30, 58, 86, 114, 142, 170]);
    }

    #[test]
    fn test_data_module_count_matches_capacity() {
        for n in [1, 2, 6, 7, 14, 32, 40] {
            let m = ModuleMatrix::new(v(n), EcLevel::Low);
            let free = (0..m.size())
                .flat_map(|y| (0..m.size()).map(move |x| (x, y)))
                .filter(|&(x, y)| !m.is_function(x, y))
                .count();
            assert_eq!(free, crate::ecc::num_raw_data_modules(v(n)), "version {n}");
        }
    }

    #[test]
    fn test_finder_and_timing() {
        let m = ModuleMatrix::new(v(1), EcLevel::Low);
        // Finder ring and center
        assert!(m.get(0, 0) && m.get(6, 0) && m.get(0, 6));
        assert!(!m.get(1, 1) && m.get(2, 2) && m.get(4, 4));
        // Separator
        assert!(!m.get(7, 0) && !m.get(0, 7) && !m.get(13, 0));
        // Timing row alternates between the finders
        for x in 8..13 {
            assert_eq!(m.get(x, 6), x % 2 == 0);
            assert_eq!(m.get(6, x), x % 2 == 0);
        }
        // Dark module
        assert!(m.get(8, m.size() - 8));
    }

    #[test]
    fn test_version_information_block() {
        // Version 7 information is 000111 110010 010100
        let m = ModuleMatrix::new(v(7), EcLevel::Low);
        let size = m.size();
        let mut bits = 0u32;
        for i in 0..18 {
            let a = size - 11 + i % 3;
            let b = i / 3;
            assert_eq!(m.get(a, b), m.get(b, a));
            bits |= u32::from(m.get(a, b)) << i;
        }
        assert_eq!(bits, 0x07C94);
    }

    #[test]
    fn test_format_bits_written_twice() {
        let mut m = ModuleMatrix::new(v(1), EcLevel::Medium);
        m.draw_format_bits(Mask::new(5));
        // M + mask 5 is 100000011001110 on the wire
        assert_eq!(m.read_format_bits(), 0b100_0000_1100_1110);
        let size = m.size();
        let mut second = 0u32;
        for i in 0..8 {
            second |= u32::from(m.get(size - 1 - i, 8)) << i;
        }
        for i in 8..15 {
            second |= u32::from(m.get(8, size - 15 + i)) << i;
        }
        assert_eq!(second, m.read_format_bits());
        assert_eq!(m.read_mask(), Mask::new(5));
        assert_eq!(m.read_error_correction_level(), EcLevel::Medium);
    }
}
