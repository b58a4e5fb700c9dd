// Binary-Coded Decimal (BCD) encoding/decoding
// Reference: chirp/bitwise.py (bbcdDataElement, lbcdDataElement)

use super::types::Endianness;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BcdError {
    #[error("Invalid BCD digit: {0:#04x}")]
    InvalidDigit(u8),

    #[error("Not a decimal digit string: {0:?}")]
    InvalidDigits(String),

    #[error("{digits} digits do not fit in {capacity} BCD digits")]
    TooManyDigits { digits: usize, capacity: usize },

    #[error("BCD value does not fit in 64 bits")]
    ValueTooLarge,
}

pub type Result<T> = std::result::Result<T, BcdError>;

/// Convert a BCD byte to its two decimal digits (tens, ones)
/// Example: 0x12 -> (1, 2), 0x95 -> (9, 5)
pub fn bcd_byte_to_digits(byte: u8) -> Result<(u8, u8)> {
    let tens = (byte & 0xF0) >> 4;
    let ones = byte & 0x0F;

    if tens > 9 || ones > 9 {
        return Err(BcdError::InvalidDigit(byte));
    }

    Ok((tens, ones))
}

/// Convert two decimal digits to a BCD byte
/// Example: (1, 2) -> 0x12, (9, 5) -> 0x95
pub fn digits_to_bcd_byte(tens: u8, ones: u8) -> Result<u8> {
    if tens > 9 || ones > 9 {
        return Err(BcdError::InvalidDigit((tens << 4) | ones));
    }

    Ok((tens << 4) | ones)
}

/// Iterate bytes from most to least significant
fn significance_order(bytes: &[u8], order: Endianness) -> Box<dyn Iterator<Item = &u8> + '_> {
    match order {
        Endianness::Big => Box::new(bytes.iter()),
        Endianness::Little => Box::new(bytes.iter().rev()),
    }
}

/// Decode a packed BCD array into its digit string, leading zeros kept.
/// Example: [0x14, 0x65, 0x20, 0x00] (big) -> "14652000"
pub fn decode_digits(bytes: &[u8], order: Endianness) -> Result<String> {
    let mut digits = String::with_capacity(bytes.len() * 2);
    for &byte in significance_order(bytes, order) {
        let (tens, ones) = bcd_byte_to_digits(byte)?;
        digits.push(char::from(b'0' + tens));
        digits.push(char::from(b'0' + ones));
    }
    Ok(digits)
}

/// Decode a packed BCD array into an integer
/// Example: [0x56, 0x34, 0x12] (little) -> 123456
pub fn decode_packed(bytes: &[u8], order: Endianness) -> Result<u64> {
    digits_to_int(&decode_digits(bytes, order)?)
}

fn digits_to_int(digits: &str) -> Result<u64> {
    digits.bytes().try_fold(0u64, |acc, d| {
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(d - b'0')))
            .ok_or(BcdError::ValueTooLarge)
    })
}

/// Left-pad `digits` with zeros to exactly `capacity` digits
fn pad_digits(digits: &str, capacity: usize) -> Result<Vec<u8>> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BcdError::InvalidDigits(digits.to_string()));
    }
    if digits.len() > capacity {
        return Err(BcdError::TooManyDigits {
            digits: digits.len(),
            capacity,
        });
    }
    let mut padded = vec![0u8; capacity - digits.len()];
    padded.extend(digits.bytes().map(|b| b - b'0'));
    Ok(padded)
}

/// Encode a digit string into `num_bytes` of packed BCD. Never truncates.
pub fn encode_digits(digits: &str, num_bytes: usize, order: Endianness) -> Result<Vec<u8>> {
    let padded = pad_digits(digits, num_bytes * 2)?;
    let mut bytes = padded
        .chunks(2)
        .map(|pair| digits_to_bcd_byte(pair[0], pair[1]))
        .collect::<Result<Vec<u8>>>()?;
    if order.is_little() {
        bytes.reverse();
    }
    Ok(bytes)
}

/// Encode an integer into `num_bytes` of packed BCD
/// Example: 42 into 2 bytes -> [0x00, 0x42] (big), [0x42, 0x00] (little)
pub fn encode_packed(value: u64, num_bytes: usize, order: Endianness) -> Result<Vec<u8>> {
    encode_digits(&value.to_string(), num_bytes, order)
}

/// Decode one-digit-per-byte BCD, most significant byte first
pub fn decode_unpacked_digits(bytes: &[u8]) -> Result<String> {
    bytes
        .iter()
        .map(|&b| {
            if b > 9 {
                Err(BcdError::InvalidDigit(b))
            } else {
                Ok(char::from(b'0' + b))
            }
        })
        .collect()
}

pub fn decode_unpacked(bytes: &[u8]) -> Result<u64> {
    digits_to_int(&decode_unpacked_digits(bytes)?)
}

pub fn encode_unpacked_digits(digits: &str, num_bytes: usize) -> Result<Vec<u8>> {
    pad_digits(digits, num_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd_byte_conversion() {
        assert_eq!(bcd_byte_to_digits(0x12).unwrap(), (1, 2));
        assert_eq!(bcd_byte_to_digits(0x95).unwrap(), (9, 5));
        assert_eq!(bcd_byte_to_digits(0x00).unwrap(), (0, 0));

        assert_eq!(bcd_byte_to_digits(0xAB), Err(BcdError::InvalidDigit(0xAB)));
        assert!(bcd_byte_to_digits(0x1A).is_err());

        assert_eq!(digits_to_bcd_byte(1, 2).unwrap(), 0x12);
        assert_eq!(digits_to_bcd_byte(9, 5).unwrap(), 0x95);
    }

    #[test]
    fn test_decode_byte_order() {
        assert_eq!(decode_packed(&[0x12, 0x34], Endianness::Big).unwrap(), 1234);
        assert_eq!(decode_packed(&[0x12, 0x34], Endianness::Little).unwrap(), 3412);
        assert_eq!(
            decode_digits(&[0x00, 0x25, 0x14], Endianness::Little).unwrap(),
            "142500"
        );
    }

    #[test]
    fn test_encode_byte_order() {
        assert_eq!(encode_packed(42, 2, Endianness::Big).unwrap(), vec![0x00, 0x42]);
        assert_eq!(encode_packed(42, 2, Endianness::Little).unwrap(), vec![0x42, 0x00]);
        assert_eq!(
            encode_digits("14652000", 4, Endianness::Big).unwrap(),
            vec![0x14, 0x65, 0x20, 0x00]
        );
    }

    #[test]
    fn test_encode_rejects_overflow() {
        assert_eq!(
            encode_packed(1234567, 3, Endianness::Big),
            Err(BcdError::TooManyDigits {
                digits: 7,
                capacity: 6
            })
        );
        assert!(matches!(
            encode_digits("12a4", 2, Endianness::Big),
            Err(BcdError::InvalidDigits(_))
        ));
        assert!(encode_digits("", 2, Endianness::Big).is_err());
    }

    #[test]
    fn test_decode_overflow() {
        // 20 nines exceed u64 but the digit string still decodes
        let bytes = [0x99u8; 10];
        assert_eq!(
            decode_packed(&bytes, Endianness::Big),
            Err(BcdError::ValueTooLarge)
        );
        assert_eq!(decode_digits(&bytes, Endianness::Big).unwrap().len(), 20);
    }

    #[test]
    fn test_unpacked() {
        assert_eq!(decode_unpacked(&[1, 4, 6]).unwrap(), 146);
        assert_eq!(decode_unpacked_digits(&[0, 7]).unwrap(), "07");
        assert_eq!(decode_unpacked(&[1, 0x0A]), Err(BcdError::InvalidDigit(0x0A)));
        assert_eq!(encode_unpacked_digits("52", 4).unwrap(), vec![0, 0, 5, 2]);
    }

    #[test]
    fn test_frequency_bcd() {
        // UV-5R style: 146.520 MHz stored in units of 10 Hz, lbcd[4]
        let raw = encode_packed(146_520_000 / 10, 4, Endianness::Little).unwrap();
        assert_eq!(raw, vec![0x00, 0x20, 0x65, 0x14]);
        assert_eq!(decode_packed(&raw, Endianness::Little).unwrap() * 10, 146_520_000);
    }
}
