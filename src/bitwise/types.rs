// Primitive type model and decoded values
// Reference: chirp/bitwise.py (type table and DataElement subclasses)

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Endianness for multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

impl Endianness {
    pub fn is_big(&self) -> bool {
        matches!(self, Endianness::Big)
    }

    pub fn is_little(&self) -> bool {
        matches!(self, Endianness::Little)
    }
}

/// Fixed-width two's complement or unsigned integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntType {
    pub bytes: u8,
    pub signed: bool,
    pub endian: Endianness,
}

impl IntType {
    pub const fn unsigned(bytes: u8, endian: Endianness) -> Self {
        Self {
            bytes,
            signed: false,
            endian,
        }
    }

    pub const fn signed(bytes: u8, endian: Endianness) -> Self {
        Self {
            bytes,
            signed: true,
            endian,
        }
    }

    pub fn bits(&self) -> u32 {
        u32::from(self.bytes) * 8
    }

    /// Mask covering every bit of the storage
    pub fn mask(&self) -> u64 {
        if self.bits() >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits()) - 1
        }
    }

    /// Inclusive range of representable values
    pub fn range(&self) -> (i64, i64) {
        let bits = self.bits();
        if self.signed {
            let half = 1i64 << (bits - 1);
            (-half, half - 1)
        } else {
            (0, self.mask() as i64)
        }
    }

    /// Schema spelling, e.g. `ul16` or `i24`
    pub fn name(&self) -> String {
        let sign = if self.signed { 'i' } else { 'u' };
        // Single bytes have no byte order to spell
        let order = if self.endian.is_little() && self.bytes > 1 {
            "l"
        } else {
            ""
        };
        format!("{}{}{}", sign, order, self.bits())
    }
}

/// Bit numbering inside a byte for `bit` / `lbit` arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOrder {
    /// Element 0 is the most significant bit (`bit`)
    MsbFirst,
    /// Element 0 is the least significant bit (`lbit`)
    LsbFirst,
}

/// A sub-byte field carved out of an unsigned storage word.
/// `shift` counts from the least significant bit of the storage value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField {
    pub storage: IntType,
    pub shift: u8,
    pub width: u8,
}

impl BitField {
    pub fn mask(&self) -> u64 {
        let ones = if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        };
        ones << self.shift
    }

    /// Largest value the field can hold
    pub fn max_value(&self) -> u64 {
        self.mask() >> self.shift
    }

    /// Position of the field's first bit counted from the storage MSB
    pub fn msb_offset(&self) -> u64 {
        u64::from(self.storage.bits()) - u64::from(self.shift) - u64::from(self.width)
    }
}

/// Leaf types the schema language can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int(IntType),
    BitField(BitField),
    Bit(BitOrder),
    Char,
    /// Packed BCD; the byte order only matters for arrays
    Bcd(Endianness),
    /// One decimal digit per byte
    UnpackedBcd,
}

impl ScalarKind {
    /// Resolve a schema type name. Bit-fields have no name of their own.
    pub fn from_name(name: &str) -> Option<Self> {
        use Endianness::{Big, Little};
        let kind = match name {
            "u8" => ScalarKind::Int(IntType::unsigned(1, Big)),
            "u16" => ScalarKind::Int(IntType::unsigned(2, Big)),
            "ul16" => ScalarKind::Int(IntType::unsigned(2, Little)),
            "u24" => ScalarKind::Int(IntType::unsigned(3, Big)),
            "ul24" => ScalarKind::Int(IntType::unsigned(3, Little)),
            "u32" => ScalarKind::Int(IntType::unsigned(4, Big)),
            "ul32" => ScalarKind::Int(IntType::unsigned(4, Little)),
            "i8" => ScalarKind::Int(IntType::signed(1, Big)),
            "i16" => ScalarKind::Int(IntType::signed(2, Big)),
            "il16" => ScalarKind::Int(IntType::signed(2, Little)),
            "i24" => ScalarKind::Int(IntType::signed(3, Big)),
            "il24" => ScalarKind::Int(IntType::signed(3, Little)),
            "i32" => ScalarKind::Int(IntType::signed(4, Big)),
            "il32" => ScalarKind::Int(IntType::signed(4, Little)),
            "bit" => ScalarKind::Bit(BitOrder::MsbFirst),
            "lbit" => ScalarKind::Bit(BitOrder::LsbFirst),
            "char" => ScalarKind::Char,
            "bbcd" => ScalarKind::Bcd(Big),
            "lbcd" => ScalarKind::Bcd(Little),
            "ubcd" => ScalarKind::UnpackedBcd,
            _ => return None,
        };
        Some(kind)
    }

    /// Number of bits the value occupies
    pub fn bit_width(&self) -> u64 {
        match self {
            ScalarKind::Int(ty) => u64::from(ty.bits()),
            ScalarKind::BitField(bf) => u64::from(bf.width),
            ScalarKind::Bit(_) => 1,
            ScalarKind::Char | ScalarKind::Bcd(_) | ScalarKind::UnpackedBcd => 8,
        }
    }

    /// Bytes that must be read to decode the value. Bit-fields read their
    /// whole storage word, single bits their containing byte.
    pub fn span_bytes(&self) -> usize {
        match self {
            ScalarKind::Int(ty) => usize::from(ty.bytes),
            ScalarKind::BitField(bf) => usize::from(bf.storage.bytes),
            ScalarKind::Bit(_)
            | ScalarKind::Char
            | ScalarKind::Bcd(_)
            | ScalarKind::UnpackedBcd => 1,
        }
    }

    pub fn name(&self) -> String {
        match self {
            ScalarKind::Int(ty) => ty.name(),
            ScalarKind::BitField(bf) => format!("{}:{}", bf.storage.name(), bf.width),
            ScalarKind::Bit(BitOrder::MsbFirst) => "bit".to_string(),
            ScalarKind::Bit(BitOrder::LsbFirst) => "lbit".to_string(),
            ScalarKind::Char => "char".to_string(),
            ScalarKind::Bcd(Endianness::Big) => "bbcd".to_string(),
            ScalarKind::Bcd(Endianness::Little) => "lbcd".to_string(),
            ScalarKind::UnpackedBcd => "ubcd".to_string(),
        }
    }
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Char(char),
    Str(String),
    /// A BCD field whose nibbles are not all decimal digits
    InvalidBcd,
    List(Vec<Value>),
    /// Members in declaration order
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a struct member by name
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "an integer",
            Value::Char(_) => "a character",
            Value::Str(_) => "a string",
            Value::InvalidBcd => "an invalid BCD marker",
            Value::List(_) => "a list",
            Value::Struct(_) => "a struct",
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32, bool);

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::InvalidBcd => write!(f, "<invalid bcd>"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Struct(members) => {
                write!(f, "{{")?;
                for (i, (name, value)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Structs serialize as maps so dumps read naturally as JSON
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Char(c) => serializer.serialize_char(*c),
            Value::Str(s) => serializer.serialize_str(s),
            Value::InvalidBcd => serializer.serialize_none(),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Struct(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (name, value) in members {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        for name in [
            "u8", "u16", "ul16", "u24", "ul24", "u32", "ul32", "i8", "i16", "il16", "i24",
            "il24", "i32", "il32", "bit", "lbit", "char", "bbcd", "lbcd", "ubcd",
        ] {
            let kind = ScalarKind::from_name(name).unwrap();
            assert_eq!(kind.name(), name);
        }
        assert!(ScalarKind::from_name("u12").is_none());
        assert!(ScalarKind::from_name("struct").is_none());
    }

    #[test]
    fn test_int_ranges() {
        assert_eq!(IntType::unsigned(1, Endianness::Big).range(), (0, 255));
        assert_eq!(
            IntType::signed(3, Endianness::Little).range(),
            (-0x80_0000, 0x7F_FFFF)
        );
        assert_eq!(IntType::unsigned(4, Endianness::Big).mask(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_bitfield_geometry() {
        // u8 a:2, b:3, c:3 -> b sits three bits above the LSB
        let b = BitField {
            storage: IntType::unsigned(1, Endianness::Big),
            shift: 3,
            width: 3,
        };
        assert_eq!(b.mask(), 0b0011_1000);
        assert_eq!(b.max_value(), 7);
        assert_eq!(b.msb_offset(), 2);
    }

    #[test]
    fn test_value_json() {
        let value = Value::Struct(vec![
            ("freq".to_string(), Value::Int(146520000)),
            ("name".to_string(), Value::from("CALL")),
            ("tones".to_string(), Value::List(vec![1.into(), Value::InvalidBcd])),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(
            json,
            r#"{"freq":146520000,"name":"CALL","tones":[1,null]}"#
        );
        assert_eq!(value.member("freq"), Some(&Value::Int(146520000)));
    }
}
