//! Mode selection and bit packing of the payload into the data bitstream.

use tracing::debug;

use crate::charset::Charset;
use crate::ecc;
use crate::error::{QrError, Result};
use crate::qrcode::{EcLevel, Version};

static ALPHANUMERIC_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Encoding mode of a segment.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SegmentMode {
    Numeric,
    Alphanumeric,
    Byte,
    Kanji,
    Eci,
}

impl SegmentMode {
    /// The 4-bit mode indicator.
    pub fn mode_bits(self) -> u32 {
        use SegmentMode::*;
        match self {
            Numeric => 0x1,
            Alphanumeric => 0x2,
            Byte => 0x4,
            Kanji => 0x8,
            Eci => 0x7,
        }
    }

    /// Width of the character count indicator at the given version.
    pub fn num_char_count_bits(self, ver: Version) -> u8 {
        use SegmentMode::*;
        (match self {
            Numeric => [10, 12, 14],
            Alphanumeric => [9, 11, 13],
            Byte => [8, 16, 16],
            Kanji => [8, 10, 12],
            Eci => [0, 0, 0],
        })[usize::from((ver.value() + 7) / 17)]
    }
}

/// A growable sequence of bits, packed big-endian into bytes.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct BitBuffer {
    data: Vec<u8>,
    length: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits appended so far.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends the low `len` bits of `val`, most significant first.
    ///
    /// # Panics
    ///
    /// Panics if `len > 31` or `val` does not fit in `len` bits.
    pub fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0, "value does not fit in bit length");
        for i in (0..len).rev() {
            if self.length % 8 == 0 {
                self.data.push(0);
            }
            let shift = 7 - (self.length & 7);
            let bit = ((val >> i) & 1) as u8;
            let last = self.data.len() - 1;
            self.data[last] |= bit << shift;
            self.length += 1;
        }
    }

    /// Returns bit `i`, counting from the first bit appended.
    pub fn get(&self, i: usize) -> bool {
        (self.data[i >> 3] >> (7 - (i & 7))) & 1 != 0
    }

    fn append_buffer(&mut self, other: &BitBuffer) {
        for i in 0..other.length {
            self.append_bits(u32::from(other.get(i)), 1);
        }
    }

    /// The packed bytes; the last byte is zero-padded if the length is not
    /// a multiple of 8.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// One run of data encoded in a single mode.
#[derive(Clone, Debug)]
pub struct Segment {
    mode: SegmentMode,
    num_chars: usize,
    bits: BitBuffer,
}

impl Segment {
    /// Byte mode, 8 bits per byte.
    pub fn make_bytes(data: &[u8]) -> Self {
        let mut bb = BitBuffer::new();
        for &b in data {
            bb.append_bits(u32::from(b), 8);
        }
        Self { mode: SegmentMode::Byte, num_chars: data.len(), bits: bb }
    }

    /// Numeric mode: groups of three digits in 10 bits, a trailing pair in 7
    /// and a trailing digit in 4.
    ///
    /// # Panics
    ///
    /// Panics if `digits` contains anything other than ASCII digits.
    pub fn make_numeric(digits: &[u8]) -> Self {
        let mut bb = BitBuffer::new();
        let mut accumdata: u32 = 0;
        let mut accumcount: u8 = 0;
        for &b in digits {
            assert!(b.is_ascii_digit(), "String contains non-numeric characters");
            accumdata = accumdata * 10 + u32::from(b - b'0');
            accumcount += 1;
            if accumcount == 3 {
                bb.append_bits(accumdata, 10);
                accumdata = 0;
                accumcount = 0;
            }
        }
        if accumcount > 0 {
            bb.append_bits(accumdata, accumcount * 3 + 1);
        }
        Self { mode: SegmentMode::Numeric, num_chars: digits.len(), bits: bb }
    }

    /// Alphanumeric mode: pairs in 11 bits, a trailing character in 6.
    ///
    /// # Panics
    ///
    /// Panics if `text` contains characters outside the alphanumeric set.
    pub fn make_alphanumeric(text: &[u8]) -> Self {
        let mut bb = BitBuffer::new();
        let mut accumdata: u32 = 0;
        let mut accumcount: u8 = 0;
        for &c in text {
            let i = ALPHANUMERIC_CHARSET
                .iter()
                .position(|&a| a == c)
                .expect("String contains unencodable characters in alphanumeric mode");
            accumdata = accumdata * 45 + i as u32;
            accumcount += 1;
            if accumcount == 2 {
                bb.append_bits(accumdata, 11);
                accumdata = 0;
                accumcount = 0;
            }
        }
        if accumcount > 0 {
            bb.append_bits(accumdata, 6);
        }
        Self { mode: SegmentMode::Alphanumeric, num_chars: text.len(), bits: bb }
    }

    /// Kanji mode: each Shift_JIS double-byte character in 13 bits.
    ///
    /// # Panics
    ///
    /// Panics if `sjis` is not a sequence of Kanji-range double-byte characters.
    pub fn make_kanji(sjis: &[u8]) -> Self {
        assert!(Self::is_kanji(sjis), "Data is not Shift_JIS double-byte text");
        let mut bb = BitBuffer::new();
        for pair in sjis.chunks_exact(2) {
            let code = u32::from(pair[0]) << 8 | u32::from(pair[1]);
            let sub = if code <= 0x9FFC { code - 0x8140 } else { code - 0xC140 };
            bb.append_bits((sub >> 8) * 0xC0 + (sub & 0xFF), 13);
        }
        Self { mode: SegmentMode::Kanji, num_chars: sjis.len() / 2, bits: bb }
    }

    /// Extended Channel Interpretation designator with the given assignment.
    ///
    /// # Panics
    ///
    /// Panics if `assignval` is not below 1 000 000.
    pub fn make_eci(assignval: u32) -> Self {
        let mut bb = BitBuffer::new();
        if assignval < 1 << 7 {
            bb.append_bits(assignval, 8);
        } else if assignval < 1 << 14 {
            bb.append_bits(0b10, 2);
            bb.append_bits(assignval, 14);
        } else if assignval < 1_000_000 {
            bb.append_bits(0b110, 3);
            bb.append_bits(assignval, 21);
        } else {
            panic!("ECI assignment value out of range");
        }
        Self { mode: SegmentMode::Eci, num_chars: 0, bits: bb }
    }

    pub fn mode(&self) -> SegmentMode {
        self.mode
    }

    pub fn num_chars(&self) -> usize {
        self.num_chars
    }

    /// Payload bits, without mode or count indicator.
    pub fn bits(&self) -> &BitBuffer {
        &self.bits
    }

    pub fn is_numeric(data: &[u8]) -> bool {
        data.iter().all(u8::is_ascii_digit)
    }

    pub fn is_alphanumeric(data: &[u8]) -> bool {
        data.iter().all(|c| ALPHANUMERIC_CHARSET.contains(c))
    }

    /// True if `data` is non-empty and made only of Shift_JIS double-byte
    /// characters in the two Kanji ranges.
    pub fn is_kanji(data: &[u8]) -> bool {
        !data.is_empty()
            && data.len() % 2 == 0
            && data.chunks_exact(2).all(|pair| {
                let code = u16::from(pair[0]) << 8 | u16::from(pair[1]);
                let lo = pair[1];
                ((0x8140..=0x9FFC).contains(&code) || (0xE040..=0xEBBF).contains(&code))
                    && (0x40..=0xFC).contains(&lo)
                    && lo != 0x7F
            })
    }

    /// Total header + payload bits of `segs` at `version`, or `None` if a
    /// character count does not fit its count indicator.
    fn get_total_bits(segs: &[Self], version: Version) -> Option<usize> {
        let mut result: usize = 0;
        for seg in segs {
            let ccbits: u8 = seg.mode.num_char_count_bits(version);
            if let Some(limit) = 1usize.checked_shl(ccbits.into()) {
                if seg.num_chars >= limit {
                    return None;
                }
            }
            result = result.checked_add(4 + usize::from(ccbits))?;
            result = result.checked_add(seg.bits.len())?;
        }
        Some(result)
    }
}

/// Picks the most compact single mode for `data` and, for byte mode, prefixes
/// the charset's ECI designator when it is not the ISO-8859-1 default.
pub fn make_segments(data: &[u8], charset: Charset) -> Vec<Segment> {
    if data.is_empty() {
        return Vec::new();
    }
    if Segment::is_numeric(data) {
        vec![Segment::make_numeric(data)]
    } else if Segment::is_alphanumeric(data) {
        vec![Segment::make_alphanumeric(data)]
    } else if charset == Charset::ShiftJis && Segment::is_kanji(data) {
        vec![Segment::make_kanji(data)]
    } else if charset.needs_eci() {
        vec![Segment::make_eci(charset.eci_assignment()), Segment::make_bytes(data)]
    } else {
        vec![Segment::make_bytes(data)]
    }
}

/// Packs `data` into the complete data bitstream and chooses its version.
///
/// With `requested` set, only that version is tried. The returned buffer is
/// exactly `num_data_codewords(version, ecl) * 8` bits long.
///
/// # Errors
///
/// [`QrError::InvalidCharset`] if `data` is malformed for `charset`, and
/// [`QrError::CapacityExceeded`] if it does not fit at version 40 (or at the
/// requested version).
pub fn encode(
    data: &[u8],
    charset: Charset,
    ecl: EcLevel,
    requested: Option<Version>,
) -> Result<(BitBuffer, Version)> {
    charset.check_bytes(data)?;
    let segs = make_segments(data, charset);
    let (minversion, maxversion) = match requested {
        Some(v) => (v, v),
        None => (Version::MIN, Version::MAX),
    };

    let mut version = minversion;
    let datausedbits: usize = loop {
        let datacapacitybits = ecc::num_data_codewords(version, ecl) * 8;
        let dataused = Segment::get_total_bits(&segs, version);
        match dataused {
            Some(n) if n <= datacapacitybits => break n,
            _ if version >= maxversion => {
                return Err(QrError::CapacityExceeded {
                    needed_bits: dataused.unwrap_or_else(|| uncapped_bits(&segs, version)),
                    capacity_bits: datacapacitybits,
                    version: version.value(),
                });
            }
            _ => version = version.next(),
        }
    };

    let datacapacitybits = ecc::num_data_codewords(version, ecl) * 8;
    let mut bb = BitBuffer::new();
    for seg in &segs {
        bb.append_bits(seg.mode.mode_bits(), 4);
        // get_total_bits already checked the count against its indicator width
        bb.append_bits(seg.num_chars as u32, seg.mode.num_char_count_bits(version));
        bb.append_buffer(&seg.bits);
    }
    debug_assert_eq!(bb.len(), datausedbits);

    // Terminator, then zero bits up to a byte boundary
    let numzerobits = core::cmp::min(4, datacapacitybits - bb.len());
    bb.append_bits(0, numzerobits as u8);
    let numzerobits = bb.len().wrapping_neg() & 7;
    bb.append_bits(0, numzerobits as u8);
    debug_assert_eq!(bb.len() % 8, 0);

    for &padbyte in [0xEC, 0x11].iter().cycle() {
        if bb.len() >= datacapacitybits {
            break;
        }
        bb.append_bits(padbyte, 8);
    }

    debug!(
        version = version.value(),
        ?ecl,
        mode = ?segs.last().map(Segment::mode),
        used_bits = datausedbits,
        capacity_bits = datacapacitybits,
        "encoded data bitstream"
    );
    Ok((bb, version))
}

fn uncapped_bits(segs: &[Segment], version: Version) -> usize {
    segs.iter()
        .map(|s| 4 + usize::from(s.mode.num_char_count_bits(version)) + s.bits.len())
        .sum()
}
