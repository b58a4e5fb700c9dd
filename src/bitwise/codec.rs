// Field codec: raw bytes <-> values for every declared field kind
// Reference: chirp/bitwise.py lines 500-760 (DataElement subclasses)

use super::bcd::{self, BcdError};
use super::error::CodecError;
use super::layout::{ArrayLayout, NodeKind, StructLayout};
use super::options::OverflowPolicy;
use super::types::{BitField, BitOrder, Endianness, IntType, ScalarKind, Value};

pub type Result<T> = std::result::Result<T, CodecError>;

fn need(data: &[u8], expected: usize) -> Result<&[u8]> {
    data.get(..expected).ok_or(CodecError::InsufficientData {
        expected,
        actual: data.len(),
    })
}

fn need_mut(data: &mut [u8], expected: usize) -> Result<&mut [u8]> {
    let actual = data.len();
    data.get_mut(..expected)
        .ok_or(CodecError::InsufficientData { expected, actual })
}

/// Read an unsigned storage word of `ty.bytes` bytes
pub fn read_uint(data: &[u8], ty: IntType) -> Result<u64> {
    let bytes = need(data, usize::from(ty.bytes))?;
    let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
    Ok(match ty.endian {
        Endianness::Big => bytes.iter().fold(0, fold),
        Endianness::Little => bytes.iter().rev().fold(0, fold),
    })
}

/// Write the low `ty.bytes` bytes of `value`
pub fn write_uint(data: &mut [u8], ty: IntType, value: u64) -> Result<()> {
    let n = usize::from(ty.bytes);
    let bytes = need_mut(data, n)?;
    for i in 0..n {
        let byte = (value >> (8 * i)) as u8;
        match ty.endian {
            Endianness::Big => bytes[n - 1 - i] = byte,
            Endianness::Little => bytes[i] = byte,
        }
    }
    Ok(())
}

/// Read an integer, sign-extending signed types
pub fn decode_int(data: &[u8], ty: IntType) -> Result<i64> {
    let raw = read_uint(data, ty)?;
    if ty.signed {
        let shift = 64 - ty.bits();
        Ok(((raw << shift) as i64) >> shift)
    } else {
        Ok(raw as i64)
    }
}

fn check_overflow(in_range: bool, value: i64, kind: &str, policy: OverflowPolicy) -> Result<()> {
    if in_range {
        return Ok(());
    }
    match policy {
        OverflowPolicy::Reject => Err(CodecError::out_of_range(value, kind)),
        OverflowPolicy::Truncate => {
            tracing::trace!("truncating {} to fit {}", value, kind);
            Ok(())
        }
    }
}

pub fn encode_int(data: &mut [u8], ty: IntType, value: i64, policy: OverflowPolicy) -> Result<()> {
    let (min, max) = ty.range();
    check_overflow((min..=max).contains(&value), value, &ty.name(), policy)?;
    write_uint(data, ty, (value as u64) & ty.mask())
}

pub fn decode_bitfield(data: &[u8], field: BitField) -> Result<i64> {
    let storage = read_uint(data, field.storage)?;
    Ok(((storage & field.mask()) >> field.shift) as i64)
}

/// Replace the field's bits inside its storage word, leaving neighbours alone
pub fn encode_bitfield(
    data: &mut [u8],
    field: BitField,
    value: i64,
    policy: OverflowPolicy,
) -> Result<()> {
    let in_range = value >= 0 && (value as u64) <= field.max_value();
    check_overflow(
        in_range,
        value,
        &ScalarKind::BitField(field).name(),
        policy,
    )?;
    let storage = read_uint(data, field.storage)?;
    let merged = (storage & !field.mask()) | (((value as u64) << field.shift) & field.mask());
    write_uint(data, field.storage, merged)
}

fn bit_mask(order: BitOrder, bit: u8) -> u8 {
    match order {
        BitOrder::MsbFirst => 0x80 >> bit,
        BitOrder::LsbFirst => 1 << bit,
    }
}

fn bcd_value(decoded: bcd::Result<u64>) -> Value {
    match decoded.ok().and_then(|v| i64::try_from(v).ok()) {
        Some(v) => Value::Int(v),
        None => Value::InvalidBcd,
    }
}

fn bcd_error(value: impl ToString, kind: &NodeKind) -> impl FnOnce(BcdError) -> CodecError {
    let value = value.to_string();
    let kind = kind.describe();
    move |_| CodecError::OutOfRange { value, kind }
}

fn latin1(c: char) -> Result<u8> {
    u8::try_from(u32::from(c)).map_err(|_| CodecError::out_of_range(format!("{:?}", c), "char"))
}

/// Encode text one byte per character (ISO-8859-1)
pub fn latin1_bytes(text: &str) -> Result<Vec<u8>> {
    text.chars().map(latin1).collect()
}

pub fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn int_of(value: &Value, kind: &ScalarKind) -> Result<i64> {
    value
        .as_int()
        .ok_or_else(|| CodecError::mismatch(kind.name(), value.type_name()))
}

/// Decode the value of `kind` from its raw span. `bit` is the position
/// within the first byte and only matters for `bit`/`lbit` elements.
pub fn decode(kind: &NodeKind, raw: &[u8], bit: u8) -> Result<Value> {
    match kind {
        NodeKind::Scalar(scalar) => decode_scalar(*scalar, raw, bit),
        NodeKind::Array(array) => decode_array(array, raw, bit),
        NodeKind::Struct(layout) => decode_struct(layout, raw),
    }
}

fn decode_scalar(kind: ScalarKind, raw: &[u8], bit: u8) -> Result<Value> {
    Ok(match kind {
        ScalarKind::Int(ty) => Value::Int(decode_int(raw, ty)?),
        ScalarKind::BitField(field) => Value::Int(decode_bitfield(raw, field)?),
        ScalarKind::Bit(order) => {
            let byte = need(raw, 1)?[0];
            Value::Int(i64::from(byte & bit_mask(order, bit) != 0))
        }
        ScalarKind::Char => Value::Char(char::from(need(raw, 1)?[0])),
        ScalarKind::Bcd(_) => bcd_value(bcd::decode_packed(need(raw, 1)?, Endianness::Big)),
        ScalarKind::UnpackedBcd => bcd_value(bcd::decode_unpacked(need(raw, 1)?)),
    })
}

/// Locate element `index` inside an array's raw span
fn element_span(array: &ArrayLayout, bit: u8, index: usize) -> (usize, usize, u8) {
    let rel = u64::from(bit) + index as u64 * array.stride_bits();
    let start = (rel / 8) as usize;
    (start, start + array.element.span_bytes(), (rel % 8) as u8)
}

fn decode_array(array: &ArrayLayout, raw: &[u8], bit: u8) -> Result<Value> {
    match *array.element {
        NodeKind::Scalar(ScalarKind::Char) => Ok(Value::Str(latin1_string(need(raw, array.len)?))),
        NodeKind::Scalar(ScalarKind::Bcd(order)) => {
            Ok(bcd_value(bcd::decode_packed(need(raw, array.len)?, order)))
        }
        NodeKind::Scalar(ScalarKind::UnpackedBcd) => {
            Ok(bcd_value(bcd::decode_unpacked(need(raw, array.len)?)))
        }
        _ => (0..array.len)
            .map(|i| {
                let (start, end, sub) = element_span(array, bit, i);
                let slice = raw.get(start..end).ok_or(CodecError::InsufficientData {
                    expected: end,
                    actual: raw.len(),
                })?;
                decode(&array.element, slice, sub)
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
    }
}

fn decode_struct(layout: &StructLayout, raw: &[u8]) -> Result<Value> {
    layout
        .fields()
        .iter()
        .map(|field| {
            let slice = raw
                .get(field.offset..field.end_byte())
                .ok_or(CodecError::InsufficientData {
                    expected: field.end_byte(),
                    actual: raw.len(),
                })?;
            Ok((field.name.clone(), decode(&field.kind, slice, 0)?))
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::Struct)
}

/// Encode `value` into the raw span of `kind`. On error the span may be
/// partially written, so callers encode into a scratch copy.
pub fn encode(
    kind: &NodeKind,
    raw: &mut [u8],
    bit: u8,
    value: &Value,
    policy: OverflowPolicy,
) -> Result<()> {
    match kind {
        NodeKind::Scalar(scalar) => encode_scalar(*scalar, raw, bit, value, policy),
        NodeKind::Array(array) => encode_array(kind, array, raw, bit, value, policy),
        NodeKind::Struct(layout) => encode_struct(layout, raw, value, policy),
    }
}

fn encode_scalar(
    kind: ScalarKind,
    raw: &mut [u8],
    bit: u8,
    value: &Value,
    policy: OverflowPolicy,
) -> Result<()> {
    match kind {
        ScalarKind::Int(ty) => encode_int(raw, ty, int_of(value, &kind)?, policy),
        ScalarKind::BitField(field) => encode_bitfield(raw, field, int_of(value, &kind)?, policy),
        ScalarKind::Bit(order) => {
            let v = int_of(value, &kind)?;
            check_overflow((0..=1).contains(&v), v, &kind.name(), policy)?;
            let mask = bit_mask(order, bit);
            let byte = &mut need_mut(raw, 1)?[0];
            if v & 1 != 0 {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
            Ok(())
        }
        ScalarKind::Char => {
            let byte = match value {
                Value::Char(c) => latin1(*c)?,
                Value::Int(v) => u8::try_from(*v).map_err(|_| CodecError::out_of_range(v, "char"))?,
                Value::Str(s) if s.chars().count() == 1 => latin1(s.chars().next().unwrap_or('\0'))?,
                other => return Err(CodecError::mismatch("char", other.type_name())),
            };
            need_mut(raw, 1)?[0] = byte;
            Ok(())
        }
        ScalarKind::Bcd(_) => {
            // Never truncated: a clipped frequency digit is worse than an error
            let v = int_of(value, &kind)?;
            if !(0..=99).contains(&v) {
                return Err(CodecError::out_of_range(v, kind.name()));
            }
            let byte = bcd::digits_to_bcd_byte((v / 10) as u8, (v % 10) as u8)
                .map_err(bcd_error(v, &NodeKind::Scalar(kind)))?;
            need_mut(raw, 1)?[0] = byte;
            Ok(())
        }
        ScalarKind::UnpackedBcd => {
            let v = int_of(value, &kind)?;
            if !(0..=9).contains(&v) {
                return Err(CodecError::out_of_range(v, kind.name()));
            }
            need_mut(raw, 1)?[0] = v as u8;
            Ok(())
        }
    }
}

fn encode_array(
    kind: &NodeKind,
    array: &ArrayLayout,
    raw: &mut [u8],
    bit: u8,
    value: &Value,
    policy: OverflowPolicy,
) -> Result<()> {
    let len = array.len;
    let bytes = match (&*array.element, value) {
        (NodeKind::Scalar(ScalarKind::Char), Value::Str(s)) => {
            let bytes = latin1_bytes(s)?;
            if bytes.len() != len {
                return Err(CodecError::LengthMismatch {
                    expected: len,
                    actual: bytes.len(),
                });
            }
            bytes
        }
        (NodeKind::Scalar(ScalarKind::Bcd(order)), Value::Int(v)) => {
            let digits = u64::try_from(*v).map_err(|_| CodecError::out_of_range(v, kind.describe()))?;
            bcd::encode_packed(digits, len, *order).map_err(bcd_error(v, kind))?
        }
        (NodeKind::Scalar(ScalarKind::Bcd(order)), Value::Str(s)) => {
            bcd::encode_digits(s, len, *order).map_err(bcd_error(s, kind))?
        }
        (NodeKind::Scalar(ScalarKind::UnpackedBcd), Value::Int(v)) => {
            if *v < 0 {
                return Err(CodecError::out_of_range(v, kind.describe()));
            }
            bcd::encode_unpacked_digits(&v.to_string(), len).map_err(bcd_error(v, kind))?
        }
        (NodeKind::Scalar(ScalarKind::UnpackedBcd), Value::Str(s)) => {
            bcd::encode_unpacked_digits(s, len).map_err(bcd_error(s, kind))?
        }
        (element, Value::List(items)) => {
            if items.len() != len {
                return Err(CodecError::LengthMismatch {
                    expected: len,
                    actual: items.len(),
                });
            }
            for (i, item) in items.iter().enumerate() {
                let (start, end, sub) = element_span(array, bit, i);
                let actual = raw.len();
                let slice = raw
                    .get_mut(start..end)
                    .ok_or(CodecError::InsufficientData {
                        expected: end,
                        actual,
                    })?;
                encode(element, slice, sub, item, policy)?;
            }
            return Ok(());
        }
        (_, other) => return Err(CodecError::mismatch(kind.describe(), other.type_name())),
    };
    need_mut(raw, len)?.copy_from_slice(&bytes);
    Ok(())
}

fn encode_struct(
    layout: &StructLayout,
    raw: &mut [u8],
    value: &Value,
    policy: OverflowPolicy,
) -> Result<()> {
    let members = match value {
        Value::Struct(members) => members,
        other => return Err(CodecError::mismatch("struct", other.type_name())),
    };
    for (name, member) in members {
        let field = layout
            .field(name)
            .ok_or_else(|| CodecError::UnknownMember(name.clone()))?;
        let actual = raw.len();
        let slice = raw
            .get_mut(field.offset..field.end_byte())
            .ok_or(CodecError::InsufficientData {
                expected: field.end_byte(),
                actual,
            })?;
        encode(&field.kind, slice, 0, member, policy)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitwise::types::Endianness::{Big, Little};

    const TRUNCATE: OverflowPolicy = OverflowPolicy::Truncate;

    fn scalar(name: &str) -> NodeKind {
        NodeKind::Scalar(ScalarKind::from_name(name).unwrap())
    }

    #[test]
    fn test_read_write_uint() {
        let data = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(read_uint(&data, IntType::unsigned(2, Big)).unwrap(), 0x1234);
        assert_eq!(read_uint(&data, IntType::unsigned(2, Little)).unwrap(), 0x3412);
        assert_eq!(read_uint(&data, IntType::unsigned(3, Big)).unwrap(), 0x123456);
        assert_eq!(read_uint(&data, IntType::unsigned(3, Little)).unwrap(), 0x563412);
        assert_eq!(
            read_uint(&data, IntType::unsigned(4, Little)).unwrap(),
            0x78563412
        );

        let mut out = [0u8; 3];
        write_uint(&mut out, IntType::unsigned(3, Little), 0x123456).unwrap();
        assert_eq!(out, [0x56, 0x34, 0x12]);

        assert_eq!(
            read_uint(&data[..1], IntType::unsigned(2, Big)),
            Err(CodecError::InsufficientData {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_signed_ints() {
        assert_eq!(decode_int(&[0xFF], IntType::signed(1, Big)).unwrap(), -1);
        assert_eq!(decode_int(&[0xFE, 0xFF], IntType::signed(2, Little)).unwrap(), -2);
        assert_eq!(
            decode_int(&[0xFF, 0xFF, 0xFD], IntType::signed(3, Big)).unwrap(),
            -3
        );
        assert_eq!(decode_int(&[0x7F, 0xFF], IntType::signed(2, Big)).unwrap(), 0x7FFF);

        let mut out = [0u8; 3];
        encode_int(&mut out, IntType::signed(3, Little), -3, TRUNCATE).unwrap();
        assert_eq!(out, [0xFD, 0xFF, 0xFF]);
    }

    #[test]
    fn test_overflow_policy() {
        let ty = IntType::unsigned(1, Big);
        let mut out = [0u8];
        encode_int(&mut out, ty, 0x1FF, TRUNCATE).unwrap();
        assert_eq!(out, [0xFF]);
        encode_int(&mut out, ty, -1, TRUNCATE).unwrap();
        assert_eq!(out, [0xFF]);

        let mut out = [0u8];
        let err = encode_int(&mut out, ty, 256, OverflowPolicy::Reject).unwrap_err();
        assert!(matches!(err, CodecError::OutOfRange { .. }));
        assert_eq!(out, [0x00]);
    }

    #[test]
    fn test_bitfields_u16() {
        let storage = IntType::unsigned(2, Big);
        let foo = BitField { storage, shift: 12, width: 4 };
        let bar = BitField { storage, shift: 4, width: 8 };
        let baz = BitField { storage, shift: 0, width: 4 };

        let mut data = [0x12, 0x34];
        assert_eq!(decode_bitfield(&data, foo).unwrap(), 1);
        assert_eq!(decode_bitfield(&data, bar).unwrap(), 0x23);
        assert_eq!(decode_bitfield(&data, baz).unwrap(), 4);

        encode_bitfield(&mut data, foo, 2, TRUNCATE).unwrap();
        encode_bitfield(&mut data, bar, 0x11, TRUNCATE).unwrap();
        encode_bitfield(&mut data, baz, 3, TRUNCATE).unwrap();
        assert_eq!(data, [0x21, 0x13]);

        let little = IntType::unsigned(2, Little);
        let mut data = [0u8; 2];
        for (shift, width, v) in [(12, 4, 2), (4, 8, 0x11), (0, 4, 3)] {
            let field = BitField { storage: little, shift, width };
            encode_bitfield(&mut data, field, v, TRUNCATE).unwrap();
        }
        assert_eq!(data, [0x13, 0x21]);
    }

    #[test]
    fn test_bitfields_u24() {
        let storage = IntType::unsigned(3, Big);
        let fields = [
            BitField { storage, shift: 12, width: 12 },
            BitField { storage, shift: 6, width: 6 },
            BitField { storage, shift: 0, width: 6 },
        ];
        let mut data = [0x00, 0x40, 0xC2];
        let values: Vec<i64> = fields
            .iter()
            .map(|f| decode_bitfield(&data, *f).unwrap())
            .collect();
        assert_eq!(values, vec![4, 3, 2]);

        for (field, v) in fields.iter().zip([1, 2, 3]) {
            encode_bitfield(&mut data, *field, v, TRUNCATE).unwrap();
        }
        assert_eq!(data, [0x00, 0x10, 0x83]);
    }

    #[test]
    fn test_bitfield_overflow() {
        let field = BitField {
            storage: IntType::unsigned(1, Big),
            shift: 3,
            width: 3,
        };
        let mut data = [0b1100_0110];
        encode_bitfield(&mut data, field, 0b1_1101, TRUNCATE).unwrap();
        // Only the three field bits change
        assert_eq!(data, [0b1110_1110]);
        assert!(encode_bitfield(&mut data, field, 8, OverflowPolicy::Reject).is_err());
        assert!(encode_bitfield(&mut data, field, -1, OverflowPolicy::Reject).is_err());
        assert_eq!(data, [0b1110_1110]);
    }

    #[test]
    fn test_bits() {
        let msb = scalar("bit");
        let lsb = scalar("lbit");
        assert_eq!(decode(&msb, &[0x80], 0).unwrap(), Value::Int(1));
        assert_eq!(decode(&msb, &[0x80], 7).unwrap(), Value::Int(0));
        assert_eq!(decode(&lsb, &[0x80], 7).unwrap(), Value::Int(1));

        let mut byte = [0u8];
        encode(&msb, &mut byte, 1, &Value::Int(1), TRUNCATE).unwrap();
        assert_eq!(byte, [0x40]);
        encode(&lsb, &mut byte, 1, &Value::Int(1), TRUNCATE).unwrap();
        assert_eq!(byte, [0x42]);
        encode(&msb, &mut byte, 1, &Value::Int(0), TRUNCATE).unwrap();
        assert_eq!(byte, [0x02]);
    }

    #[test]
    fn test_chars() {
        let kind = scalar("char");
        assert_eq!(decode(&kind, &[0x41], 0).unwrap(), Value::Char('A'));
        assert_eq!(decode(&kind, &[0xE9], 0).unwrap(), Value::Char('é'));

        let mut byte = [0u8];
        encode(&kind, &mut byte, 0, &Value::Char('é'), TRUNCATE).unwrap();
        assert_eq!(byte, [0xE9]);
        assert!(encode(&kind, &mut byte, 0, &Value::Char('€'), TRUNCATE).is_err());
        assert!(encode(&kind, &mut byte, 0, &Value::Int(300), TRUNCATE).is_err());
    }

    #[test]
    fn test_single_bcd_byte() {
        let kind = scalar("bbcd");
        assert_eq!(decode(&kind, &[0x42], 0).unwrap(), Value::Int(42));
        assert_eq!(decode(&kind, &[0x4A], 0).unwrap(), Value::InvalidBcd);

        let mut byte = [0u8];
        encode(&kind, &mut byte, 0, &Value::Int(99), TRUNCATE).unwrap();
        assert_eq!(byte, [0x99]);
        assert!(encode(&kind, &mut byte, 0, &Value::Int(100), TRUNCATE).is_err());

        let unpacked = scalar("ubcd");
        assert_eq!(decode(&unpacked, &[0x07], 0).unwrap(), Value::Int(7));
        assert_eq!(decode(&unpacked, &[0x0A], 0).unwrap(), Value::InvalidBcd);
    }

    #[test]
    fn test_type_mismatch() {
        let mut data = [0u8; 2];
        let err = encode(&scalar("u16"), &mut data, 0, &Value::from("x"), TRUNCATE).unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                kind: "u16".to_string(),
                found: "a string".to_string()
            }
        );
    }
}
