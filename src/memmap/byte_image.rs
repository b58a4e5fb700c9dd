// Fixed-length byte image mirroring a radio's EEPROM
// Reference: chirp/memmap.py

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use thiserror::Error;

/// Raised for any access that would fall outside the image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("access of {len} byte(s) at offset {offset:#06x} exceeds image of {size} bytes")]
pub struct BoundsError {
    pub offset: usize,
    pub len: usize,
    pub size: usize,
}

pub type Result<T> = std::result::Result<T, BoundsError>;

/// One image shared by several views (e.g. two schemas aliasing the same bytes)
pub type SharedImage = Rc<RefCell<ByteImage>>;

/// Linearly addressed, fixed-length memory image
///
/// The length is set at construction and never changes; every access is
/// bounds-checked and fails with [`BoundsError`] rather than clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteImage {
    data: Vec<u8>,
}

impl ByteImage {
    /// Create an image of `length` bytes, every byte set to `fill`
    pub fn new(length: usize, fill: u8) -> Self {
        Self {
            data: vec![fill; length],
        }
    }

    /// Create a zero-filled image
    pub fn zeroed(length: usize) -> Self {
        Self::new(length, 0x00)
    }

    /// Wrap a buffer received from the transport layer (no copy)
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Copy the image out for the transport layer
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Move the image behind a shared handle so several views can alias it
    pub fn into_shared(self) -> SharedImage {
        Rc::new(RefCell::new(self))
    }

    fn span(&self, offset: usize, len: usize) -> Result<Range<usize>> {
        let err = BoundsError {
            offset,
            len,
            size: self.data.len(),
        };
        let end = offset.checked_add(len).ok_or_else(|| err.clone())?;
        if end > self.data.len() {
            return Err(err);
        }
        Ok(offset..end)
    }

    /// Get `len` bytes starting at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.span(offset, len)?;
        Ok(&self.data[range])
    }

    /// Get `len` mutable bytes starting at `offset`
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let range = self.span(offset, len)?;
        Ok(&mut self.data[range])
    }

    /// Overwrite `bytes.len()` bytes starting at `offset`
    pub fn set_slice(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.slice_mut(offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn byte(&self, pos: usize) -> Result<u8> {
        Ok(self.slice(pos, 1)?[0])
    }

    pub fn set_byte(&mut self, pos: usize, value: u8) -> Result<()> {
        self.slice_mut(pos, 1)?[0] = value;
        Ok(())
    }

    /// Set every byte of the image to `value`
    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// Set `len` bytes starting at `offset` to `value`
    pub fn fill_range(&mut self, offset: usize, len: usize, value: u8) -> Result<()> {
        self.slice_mut(offset, len)?.fill(value);
        Ok(())
    }

    /// Hex dump of the whole image, or of `range` when given
    pub fn printable(&self, range: Option<Range<usize>>) -> Result<String> {
        let range = range.unwrap_or(0..self.data.len());
        let len = range.end.saturating_sub(range.start);
        let slice = self.slice(range.start, len)?;
        Ok(hexdump(slice, range.start))
    }
}

impl From<Vec<u8>> for ByteImage {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

impl From<&[u8]> for ByteImage {
    fn from(data: &[u8]) -> Self {
        Self::from_bytes(data.to_vec())
    }
}

impl AsRef<[u8]> for ByteImage {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for ByteImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteImage({} bytes)", self.data.len())
    }
}

/// Hex dump in `hexdump -C` layout, addresses starting at `base`
fn hexdump(data: &[u8], base: usize) -> String {
    let mut output = String::new();

    for (i, chunk) in data.chunks(16).enumerate() {
        output.push_str(&format!("{:08x}  ", base + i * 16));

        for j in 0..16 {
            if j == 8 {
                output.push(' ');
            }
            match chunk.get(j) {
                Some(byte) => output.push_str(&format!("{:02x} ", byte)),
                None => output.push_str("   "),
            }
        }

        output.push_str(" |");
        for &byte in chunk {
            if (0x20..=0x7e).contains(&byte) {
                output.push(byte as char);
            } else {
                output.push('.');
            }
        }
        output.push_str("|\n");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_creation() {
        let image = ByteImage::new(0x10, 0xFF);
        assert_eq!(image.len(), 0x10);
        assert!(image.as_bytes().iter().all(|&b| b == 0xFF));

        let zero = ByteImage::zeroed(4);
        assert_eq!(zero.as_bytes(), &[0, 0, 0, 0]);

        let wrapped = ByteImage::from_bytes(vec![1, 2, 3]);
        assert_eq!(wrapped.to_bytes(), vec![1, 2, 3]);
        assert!(ByteImage::zeroed(0).is_empty());
    }

    #[test]
    fn test_get_set() {
        let mut image = ByteImage::zeroed(10);

        image.set_byte(5, 0x42).unwrap();
        assert_eq!(image.byte(5).unwrap(), 0x42);

        image.set_slice(0, &[1, 2, 3]).unwrap();
        assert_eq!(image.slice(0, 3).unwrap(), &[1, 2, 3]);

        image.fill_range(8, 2, 0xAA).unwrap();
        assert_eq!(image.slice(7, 3).unwrap(), &[0x00, 0xAA, 0xAA]);

        // Zero-length access at the very end is legal
        assert!(image.slice(10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_bounds_checking() {
        let mut image = ByteImage::from_bytes(vec![1, 2, 3]);

        let err = image.slice(2, 5).unwrap_err();
        assert_eq!(
            err,
            BoundsError {
                offset: 2,
                len: 5,
                size: 3
            }
        );
        assert!(image.slice(5, 1).is_err());
        assert!(image.byte(3).is_err());
        assert!(image.slice(usize::MAX, 2).is_err());

        // A failed write must leave the image untouched
        assert!(image.set_slice(2, &[9, 9]).is_err());
        assert_eq!(image.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_shared_image_aliasing() {
        let shared = ByteImage::zeroed(4).into_shared();
        let other = Rc::clone(&shared);
        other.borrow_mut().set_byte(1, 7).unwrap();
        assert_eq!(shared.borrow().byte(1).unwrap(), 7);
    }

    #[test]
    fn test_hexdump() {
        let data: Vec<u8> = (0x00..0x10).chain([0x41, 0x42, 0x43]).collect();
        let image = ByteImage::from_bytes(data);
        let dump = image.printable(None).unwrap();
        assert!(dump.contains("00 01 02 03"));
        assert!(dump.contains("00000010  41 42 43"));
        assert!(dump.contains("|ABC|"));

        let partial = image.printable(Some(0x10..0x13)).unwrap();
        assert!(partial.starts_with("00000010"));
        assert!(image.printable(Some(0x10..0x20)).is_err());
    }
}
