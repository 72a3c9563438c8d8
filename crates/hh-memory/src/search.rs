//! Value search over byte buffers
//!
//! A scan decodes a `width`-byte value at every byte offset of a buffer
//! (stride 1, so windows overlap) and keeps the offsets whose value
//! satisfies a comparison. Width, encoding and operator are small runtime
//! enumerations; each scan is a plain function over slices.

use std::fmt;
use std::str::FromStr;

/// Size of the scanned value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    Bits8 = 1,
    Bits16 = 2,
    Bits24 = 3,
    Bits32 = 4,
}

impl Width {
    /// Number of bytes in a value
    pub fn bytes(&self) -> usize {
        *self as usize
    }
}

impl TryFrom<usize> for Width {
    type Error = usize;

    fn try_from(bytes: usize) -> Result<Self, Self::Error> {
        match bytes {
            1 => Ok(Width::Bits8),
            2 => Ok(Width::Bits16),
            3 => Ok(Width::Bits24),
            4 => Ok(Width::Bits32),
            other => Err(other),
        }
    }
}

/// How the bytes of a value are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Unsigned, lowest byte first
    #[default]
    LittleEndian,
    /// Unsigned, highest byte first
    BigEndian,
    /// Packed BCD, lowest byte first
    BcdLittleEndian,
    /// Packed BCD, highest byte first
    BcdBigEndian,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "le" | "little" | "little-endian" => Ok(Encoding::LittleEndian),
            "be" | "big" | "big-endian" => Ok(Encoding::BigEndian),
            "bcd-le" | "bcd-little" => Ok(Encoding::BcdLittleEndian),
            "bcd-be" | "bcd-big" | "bcd" => Ok(Encoding::BcdBigEndian),
            _ => Err(format!("unknown encoding: {}", s)),
        }
    }
}

/// Comparison applied to each decoded value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl Operator {
    #[inline]
    pub fn apply(&self, lhs: u32, rhs: u32) -> bool {
        match self {
            Operator::LessThan => lhs < rhs,
            Operator::LessEqual => lhs <= rhs,
            Operator::GreaterThan => lhs > rhs,
            Operator::GreaterEqual => lhs >= rhs,
            Operator::Equal => lhs == rhs,
            Operator::NotEqual => lhs != rhs,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::LessThan => "<",
            Operator::LessEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterEqual => ">=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" | "lt" => Ok(Operator::LessThan),
            "<=" | "le" => Ok(Operator::LessEqual),
            ">" | "gt" => Ok(Operator::GreaterThan),
            ">=" | "ge" => Ok(Operator::GreaterEqual),
            "==" | "=" | "eq" => Ok(Operator::Equal),
            "!=" | "ne" => Ok(Operator::NotEqual),
            _ => Err(format!("unknown operator: {}", s)),
        }
    }
}

/// Decode packed BCD, one decimal digit per nibble
///
/// Nibbles above 9 are not rejected; they contribute `nibble * 10^position`
/// like any other digit.
#[inline]
pub fn bcd(raw: u32) -> u32 {
    let mut value = 0u32;
    let mut scale = 1u32;

    for nibble in 0..8 {
        value = value.wrapping_add(((raw >> (nibble * 4)) & 0xF).wrapping_mul(scale));
        scale = scale.wrapping_mul(10);
    }

    value
}

/// Decode one value from exactly `bytes.len()` (1 to 4) bytes
#[inline]
pub fn decode(bytes: &[u8], encoding: Encoding) -> u32 {
    let little = || {
        bytes
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32)
    };
    let big = || bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);

    match encoding {
        Encoding::LittleEndian => little(),
        Encoding::BigEndian => big(),
        Encoding::BcdLittleEndian => bcd(little()),
        Encoding::BcdBigEndian => bcd(big()),
    }
}

/// Offsets in `data` whose value compares true against `constant`
pub fn scan_constant(
    data: &[u8],
    width: Width,
    encoding: Encoding,
    op: Operator,
    constant: u32,
) -> Vec<usize> {
    data.windows(width.bytes())
        .enumerate()
        .filter(|(_, window)| op.apply(decode(window, encoding), constant))
        .map(|(offset, _)| offset)
        .collect()
}

/// Offsets where the value in `current` compares true against the value at
/// the same offset in `previous`
///
/// Both buffers must have the same length; otherwise nothing matches.
pub fn scan_pair(
    current: &[u8],
    previous: &[u8],
    width: Width,
    encoding: Encoding,
    op: Operator,
) -> Vec<usize> {
    if current.len() != previous.len() {
        return Vec::new();
    }

    current
        .windows(width.bytes())
        .zip(previous.windows(width.bytes()))
        .enumerate()
        .filter(|(_, (a, b))| op.apply(decode(a, encoding), decode(b, encoding)))
        .map(|(offset, _)| offset)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_conversion() {
        assert_eq!(Width::try_from(1), Ok(Width::Bits8));
        assert_eq!(Width::try_from(4), Ok(Width::Bits32));
        assert_eq!(Width::try_from(0), Err(0));
        assert_eq!(Width::try_from(5), Err(5));
        assert_eq!(Width::Bits24.bytes(), 3);
    }

    #[test]
    fn test_decode_endianness() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(decode(&bytes, Encoding::LittleEndian), 0x7856_3412);
        assert_eq!(decode(&bytes, Encoding::BigEndian), 0x1234_5678);
        assert_eq!(decode(&bytes[..3], Encoding::LittleEndian), 0x0056_3412);
        assert_eq!(decode(&bytes[..3], Encoding::BigEndian), 0x0012_3456);
        assert_eq!(decode(&bytes[..1], Encoding::BigEndian), 0x12);
    }

    #[test]
    fn test_decode_bcd() {
        assert_eq!(decode(&[0x12], Encoding::BcdBigEndian), 12);
        assert_eq!(decode(&[0x12], Encoding::BcdLittleEndian), 12);
        assert_eq!(decode(&[0x34, 0x12], Encoding::BcdLittleEndian), 1234);
        assert_eq!(decode(&[0x12, 0x34], Encoding::BcdBigEndian), 1234);
        assert_eq!(decode(&[0x99, 0x99, 0x99, 0x99], Encoding::BcdBigEndian), 99_999_999);
    }

    #[test]
    fn test_bcd_out_of_range_nibbles() {
        // 0xA in the tens digit contributes 100
        assert_eq!(bcd(0xA5), 105);
        assert_eq!(bcd(0xFF), 165);
    }

    #[test]
    fn test_operators() {
        assert!(Operator::LessThan.apply(1, 2));
        assert!(!Operator::LessThan.apply(2, 2));
        assert!(Operator::LessEqual.apply(2, 2));
        assert!(Operator::GreaterThan.apply(3, 2));
        assert!(Operator::GreaterEqual.apply(2, 2));
        assert!(Operator::Equal.apply(7, 7));
        assert!(Operator::NotEqual.apply(7, 8));
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!("<=".parse::<Operator>(), Ok(Operator::LessEqual));
        assert_eq!("ne".parse::<Operator>(), Ok(Operator::NotEqual));
        assert!("~".parse::<Operator>().is_err());
        assert_eq!(Operator::GreaterEqual.to_string(), ">=");
    }

    #[test]
    fn test_scan_constant_overlapping() {
        let data = [0x01, 0x01, 0x01];
        let hits = scan_constant(&data, Width::Bits16, Encoding::LittleEndian, Operator::Equal, 0x0101);
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn test_scan_constant_too_short() {
        let data = [0x01, 0x02];
        assert!(scan_constant(&data, Width::Bits32, Encoding::LittleEndian, Operator::NotEqual, 0).is_empty());
        assert!(scan_constant(&[], Width::Bits8, Encoding::LittleEndian, Operator::NotEqual, 1).is_empty());
    }

    #[test]
    fn test_scan_pair() {
        let now = [10, 20, 30, 40];
        let before = [11, 20, 29, 40];
        let hits = scan_pair(&now, &before, Width::Bits8, Encoding::LittleEndian, Operator::LessThan);
        assert_eq!(hits, vec![0]);
        let hits = scan_pair(&now, &before, Width::Bits8, Encoding::LittleEndian, Operator::Equal);
        assert_eq!(hits, vec![1, 3]);
        assert!(scan_pair(&now, &before[..3], Width::Bits8, Encoding::LittleEndian, Operator::Equal).is_empty());
    }
}
