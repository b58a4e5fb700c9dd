// Structured view: typed, path-addressed access to a byte image
// Reference: chirp/bitwise.py (parse, get_path, DataElement accessors)

use super::bcd;
use super::codec;
use super::error::{BitwiseError, CodecError, PathError};
use super::grammar::{parse_path, PathSegment};
use super::layout::{LayoutTree, NodeKind};
use super::options::ViewOptions;
use super::types::{Endianness, ScalarKind, Value};
use crate::memmap::{ByteImage, SharedImage};
use std::cell::Ref;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// A layout tree bound to a byte image. Views never copy the image:
/// every read and write goes straight to the underlying bytes.
pub struct StructuredView {
    image: SharedImage,
    layout: Arc<LayoutTree>,
    options: ViewOptions,
}

impl StructuredView {
    /// Take ownership of `image` and view it through `layout`
    pub fn new(image: ByteImage, layout: Arc<LayoutTree>) -> Self {
        Self::over(image.into_shared(), layout)
    }

    /// View an image that other views may also be bound to
    pub fn over(image: SharedImage, layout: Arc<LayoutTree>) -> Self {
        let image_len = image.borrow().len();
        if layout.size_bytes() > image_len {
            tracing::warn!(
                "layout spans {} bytes but image holds {}; trailing fields will fail to read",
                layout.size_bytes(),
                image_len
            );
        }
        Self {
            image,
            layout,
            options: ViewOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn layout(&self) -> &Arc<LayoutTree> {
        &self.layout
    }

    /// Another handle to the bound image
    pub fn shared_image(&self) -> SharedImage {
        Rc::clone(&self.image)
    }

    pub fn image(&self) -> Ref<'_, ByteImage> {
        self.image.borrow()
    }

    /// Copy of the image for hand-back to the transport layer
    pub fn to_bytes(&self) -> Vec<u8> {
        self.image.borrow().to_bytes()
    }

    /// Release the view, returning the image (copied if still shared)
    pub fn into_image(self) -> ByteImage {
        match Rc::try_unwrap(self.image) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.borrow().clone(),
        }
    }

    pub fn root(&self) -> FieldHandle<'_> {
        FieldHandle {
            view: self,
            kind: self.layout.root_kind(),
            path: String::new(),
            bit_addr: 0,
        }
    }

    /// Top-level field by name
    pub fn field(&self, name: &str) -> Result<FieldHandle<'_>, PathError> {
        self.root().field(name)
    }

    /// Resolve a dotted/indexed path such as `memory[2].freq`
    pub fn path(&self, path: &str) -> Result<FieldHandle<'_>, PathError> {
        self.root().path(path)
    }

    /// Shorthand for `view.path(p)?.get()`
    pub fn get(&self, path: &str) -> Result<Value, BitwiseError> {
        Ok(self.path(path)?.get()?)
    }

    /// Shorthand for `view.path(p)?.set(value)`
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), BitwiseError> {
        Ok(self.path(path)?.set(value)?)
    }
}

impl fmt::Debug for StructuredView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredView")
            .field("image_len", &self.image.borrow().len())
            .field("layout_size", &self.layout.size_bytes())
            .field("options", &self.options)
            .finish()
    }
}

/// A resolved field: its layout node plus absolute position in the image.
/// Handles borrow the view and are cheap to create and discard.
#[derive(Clone)]
pub struct FieldHandle<'v> {
    view: &'v StructuredView,
    kind: &'v NodeKind,
    path: String,
    /// Absolute bit address of the field's first bit (byte * 8 + bit)
    bit_addr: u64,
}

impl<'v> FieldHandle<'v> {
    pub fn kind(&self) -> &'v NodeKind {
        self.kind
    }

    /// Full path from the root, e.g. `memory[2].freq`
    pub fn path_str(&self) -> &str {
        &self.path
    }

    pub fn byte_offset(&self) -> usize {
        (self.bit_addr / 8) as usize
    }

    /// Bit position of the field's first bit, counted MSB-first within
    /// its storage word (bit-fields) or byte (bit arrays), 0 otherwise
    pub fn bit_offset(&self) -> u64 {
        match self.kind {
            NodeKind::Scalar(ScalarKind::BitField(bf)) => bf.msb_offset(),
            _ => self.bit_addr % 8,
        }
    }

    pub fn bit_width(&self) -> u64 {
        self.kind.bit_width()
    }

    /// Bytes covered by `get_raw`
    pub fn size_bytes(&self) -> usize {
        self.kind.span_bytes()
    }

    /// Number of elements when this is an array
    pub fn len(&self) -> Option<usize> {
        self.kind.as_array().map(|a| a.len)
    }

    pub fn is_array(&self) -> bool {
        self.kind.as_array().is_some()
    }

    pub fn is_struct(&self) -> bool {
        self.kind.as_struct().is_some()
    }

    /// Member names in declaration order (empty for non-structs)
    pub fn field_names(&self) -> Vec<&'v str> {
        match self.kind {
            NodeKind::Struct(layout) => layout.field_names().collect(),
            _ => Vec::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind
            .as_struct()
            .is_some_and(|layout| layout.field(name).is_some())
    }

    pub fn field(&self, name: &str) -> Result<FieldHandle<'v>, PathError> {
        let layout = match self.kind {
            NodeKind::Struct(layout) => layout,
            _ => return Err(PathError::not_a_struct(&self.path, name)),
        };
        let node = layout
            .field(name)
            .ok_or_else(|| PathError::unknown_field(&self.path, name))?;
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        };
        Ok(FieldHandle {
            view: self.view,
            kind: &node.kind,
            path,
            bit_addr: self.bit_addr + node.offset as u64 * 8,
        })
    }

    pub fn index(&self, index: usize) -> Result<FieldHandle<'v>, PathError> {
        let array = match self.kind {
            NodeKind::Array(array) => array,
            _ => return Err(PathError::not_an_array(&self.path, index)),
        };
        if index >= array.len {
            return Err(PathError::index_out_of_range(&self.path, index, array.len));
        }
        Ok(FieldHandle {
            view: self.view,
            kind: &array.element,
            path: format!("{}[{}]", self.path, index),
            bit_addr: self.bit_addr + index as u64 * array.stride_bits(),
        })
    }

    /// Resolve a path relative to this field
    pub fn path(&self, path: &str) -> Result<FieldHandle<'v>, PathError> {
        let segments = parse_path(path).ok_or_else(|| PathError::Malformed(path.to_string()))?;
        let mut handle = self.clone();
        for segment in segments {
            handle = match segment {
                PathSegment::Field(name) => handle.field(name)?,
                PathSegment::Index(i) => handle.index(i)?,
            };
        }
        Ok(handle)
    }

    /// Iterate the elements of an array field
    pub fn elements(&self) -> Result<impl Iterator<Item = FieldHandle<'v>> + '_, PathError> {
        let len = self
            .len()
            .ok_or_else(|| PathError::not_an_array(&self.path, 0))?;
        Ok((0..len).filter_map(move |i| self.index(i).ok()))
    }

    fn tag(&self, err: CodecError) -> CodecError {
        err.at(&self.path, self.byte_offset())
    }

    fn read_span(&self) -> Result<Vec<u8>, CodecError> {
        let image = self
            .view
            .image
            .try_borrow()
            .map_err(|_| CodecError::ImageBusy)?;
        Ok(image.slice(self.byte_offset(), self.size_bytes())?.to_vec())
    }

    fn write_span(&self, bytes: &[u8]) -> Result<(), CodecError> {
        let mut image = self
            .view
            .image
            .try_borrow_mut()
            .map_err(|_| CodecError::ImageBusy)?;
        image.set_slice(self.byte_offset(), bytes)?;
        Ok(())
    }

    /// Decode the field's current value
    pub fn get(&self) -> Result<Value, CodecError> {
        let raw = self.read_span().map_err(|e| self.tag(e))?;
        codec::decode(self.kind, &raw, (self.bit_addr % 8) as u8).map_err(|e| self.tag(e))
    }

    /// Encode `value` into the field. Either the whole field is written or,
    /// on error, the image is left untouched.
    pub fn set(&self, value: impl Into<Value>) -> Result<(), CodecError> {
        let value = value.into();
        let result = self.read_span().and_then(|mut raw| {
            codec::encode(
                self.kind,
                &mut raw,
                (self.bit_addr % 8) as u8,
                &value,
                self.view.options.overflow,
            )?;
            self.write_span(&raw)
        });
        result.map_err(|e| self.tag(e))
    }

    pub fn get_int(&self) -> Result<i64, CodecError> {
        match self.get()? {
            Value::Int(v) => Ok(v),
            Value::InvalidBcd => Err(self.tag(CodecError::InvalidBcd)),
            other => Err(self.tag(CodecError::mismatch(
                self.kind.describe(),
                format!("{} read as an integer", other.type_name()),
            ))),
        }
    }

    pub fn set_int(&self, value: i64) -> Result<(), CodecError> {
        self.set(Value::Int(value))
    }

    pub fn get_bool(&self) -> Result<bool, CodecError> {
        Ok(self.get_int()? != 0)
    }

    pub fn set_bool(&self, value: bool) -> Result<(), CodecError> {
        self.set_int(i64::from(value))
    }

    /// Text of a `char` field or array
    pub fn get_str(&self) -> Result<String, CodecError> {
        match self.get()? {
            Value::Str(s) => Ok(s),
            Value::Char(c) => Ok(c.to_string()),
            other => Err(self.tag(CodecError::mismatch(
                self.kind.describe(),
                format!("{} read as text", other.type_name()),
            ))),
        }
    }

    /// Store text whose length must match the array exactly
    pub fn set_str(&self, text: &str) -> Result<(), CodecError> {
        self.set(Value::Str(text.to_string()))
    }

    /// Store text, truncating or right-padding with `pad` to fit
    pub fn set_str_padded(&self, text: &str, pad: u8) -> Result<(), CodecError> {
        let len = match self.kind {
            NodeKind::Array(array) if *array.element == NodeKind::Scalar(ScalarKind::Char) => {
                array.len
            }
            _ => {
                return Err(self.tag(CodecError::mismatch(self.kind.describe(), "padded text")))
            }
        };
        let mut bytes = codec::latin1_bytes(text).map_err(|e| self.tag(e))?;
        bytes.resize(len, pad);
        self.set_raw(&bytes)
    }

    /// BCD value, or `None` when the digits are invalid
    pub fn get_bcd(&self) -> Result<Option<u64>, CodecError> {
        match self.get()? {
            Value::Int(v) if self.is_bcd() => Ok(u64::try_from(v).ok()),
            Value::InvalidBcd => Ok(None),
            other => Err(self.tag(CodecError::mismatch(
                self.kind.describe(),
                format!("{} read as BCD", other.type_name()),
            ))),
        }
    }

    /// Digits of a BCD field with leading zeros kept, e.g. `"14652000"`
    pub fn get_digits(&self) -> Result<String, CodecError> {
        let raw = self.get_raw()?;
        let digits = match self.bcd_kind() {
            Some(ScalarKind::Bcd(order)) => {
                if self.is_array() {
                    bcd::decode_digits(&raw, order)
                } else {
                    bcd::decode_digits(&raw, Endianness::Big)
                }
            }
            Some(_) => bcd::decode_unpacked_digits(&raw),
            None => {
                return Err(self.tag(CodecError::mismatch(self.kind.describe(), "digits")))
            }
        };
        digits.map_err(|_| self.tag(CodecError::InvalidBcd))
    }

    /// Store a decimal digit string into a BCD array
    pub fn set_digits(&self, digits: &str) -> Result<(), CodecError> {
        self.set(Value::Str(digits.to_string()))
    }

    fn bcd_kind(&self) -> Option<ScalarKind> {
        let scalar = match self.kind {
            NodeKind::Array(array) => array.element.as_scalar(),
            other => other.as_scalar(),
        };
        scalar.filter(|s| matches!(s, ScalarKind::Bcd(_) | ScalarKind::UnpackedBcd))
    }

    fn is_bcd(&self) -> bool {
        self.bcd_kind().is_some()
    }

    /// The bytes this field covers, verbatim
    pub fn get_raw(&self) -> Result<Vec<u8>, CodecError> {
        self.read_span().map_err(|e| self.tag(e))
    }

    /// Overwrite the field's bytes; `bytes` must match `size_bytes()`
    pub fn set_raw(&self, bytes: &[u8]) -> Result<(), CodecError> {
        if bytes.len() != self.size_bytes() {
            return Err(self.tag(CodecError::LengthMismatch {
                expected: self.size_bytes(),
                actual: bytes.len(),
            }));
        }
        self.write_span(bytes).map_err(|e| self.tag(e))
    }

    /// Set every byte of the field to `byte`
    pub fn fill_raw(&self, byte: u8) -> Result<(), CodecError> {
        self.set_raw(&vec![byte; self.size_bytes()])
    }

    /// True when every byte of the field equals `byte` (e.g. an erased 0xFF slot)
    pub fn is_filled_with(&self, byte: u8) -> Result<bool, CodecError> {
        Ok(self.get_raw()?.iter().all(|&b| b == byte))
    }
}

impl fmt::Debug for FieldHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHandle")
            .field("path", &self.path)
            .field("kind", &self.kind.describe())
            .field("byte_offset", &self.byte_offset())
            .field("bit_offset", &self.bit_offset())
            .finish()
    }
}
