// Error types for schema compilation, field access and path navigation

use crate::memmap::BoundsError;
use thiserror::Error;

/// Raised when a schema text cannot be compiled into a layout tree.
/// Every variant carries the 1-based source line it was detected on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("line {line}: syntax error near `{near}`")]
    Syntax { line: usize, near: String },

    #[error("line {line}: unknown type `{name}`")]
    UnknownType { line: usize, name: String },

    #[error("line {line}: unknown directive `#{name}`")]
    UnknownDirective { line: usize, name: String },

    #[error("line {line}: unbalanced braces")]
    UnbalancedBraces { line: usize },

    #[error("line {line}: invalid number `{text}`")]
    InvalidNumber { line: usize, text: String },

    #[error("line {line}: bit-fields cannot be stored in `{ty}`")]
    InvalidBitfieldType { line: usize, ty: String },

    #[error("line {line}: bit-field `{name}` has invalid width {width}")]
    InvalidBitWidth { line: usize, name: String, width: u64 },

    #[error("line {line}: bit-fields use {bits} bits but storage holds only {storage_bits}")]
    BitfieldOverflow {
        line: usize,
        bits: u64,
        storage_bits: u64,
    },

    #[error("line {line}: bit-field group of {bits} bits is not a whole number of bytes")]
    BitfieldAlignment { line: usize, bits: u64 },

    #[error("line {line}: bit array of {count} elements is not a multiple of 8")]
    BitArrayLength { line: usize, count: u64 },

    #[error("line {line}: struct type `{name}` is not defined")]
    UndefinedStruct { line: usize, name: String },

    #[error("line {line}: union has no members")]
    EmptyUnion { line: usize },

    #[error("line {line}: union member is {found} bytes, expected {expected}")]
    UnionSizeMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: directives are not allowed inside a union")]
    DirectiveInUnion { line: usize },

    #[error("line {line}: #seekto {target:#06x} is before the enclosing struct at {base:#06x}")]
    SeekBeforeStruct {
        line: usize,
        target: usize,
        base: usize,
    },

    #[error("line {line}: elements of `{name}` would all #seekto the same address")]
    SeekInStructArray { line: usize, name: String },

    #[error("line {line}: layout size overflows the address space")]
    SizeOverflow { line: usize },
}

impl SchemaError {
    /// Source line the error was detected on
    pub fn line(&self) -> usize {
        match self {
            SchemaError::Syntax { line, .. }
            | SchemaError::UnknownType { line, .. }
            | SchemaError::UnknownDirective { line, .. }
            | SchemaError::UnbalancedBraces { line }
            | SchemaError::InvalidNumber { line, .. }
            | SchemaError::InvalidBitfieldType { line, .. }
            | SchemaError::InvalidBitWidth { line, .. }
            | SchemaError::BitfieldOverflow { line, .. }
            | SchemaError::BitfieldAlignment { line, .. }
            | SchemaError::BitArrayLength { line, .. }
            | SchemaError::UndefinedStruct { line, .. }
            | SchemaError::EmptyUnion { line }
            | SchemaError::UnionSizeMismatch { line, .. }
            | SchemaError::SeekBeforeStruct { line, .. }
            | SchemaError::SeekInStructArray { line, .. }
            | SchemaError::DirectiveInUnion { line }
            | SchemaError::SizeOverflow { line } => *line,
        }
    }
}

/// Raised when reading or writing a field fails
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error(transparent)]
    Bounds(#[from] BoundsError),

    #[error("insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("value {value} out of range for {kind}")]
    OutOfRange { value: String, kind: String },

    #[error("expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("cannot use {found} with a {kind} field")]
    TypeMismatch { kind: String, found: String },

    #[error("no member named `{0}`")]
    UnknownMember(String),

    #[error("field holds invalid BCD digits")]
    InvalidBcd,

    #[error("image is already borrowed by another accessor")]
    ImageBusy,

    #[error("{path} @ {offset:#06x}: {source}")]
    AtField {
        path: String,
        offset: usize,
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    /// Tag an error with the field path and byte offset it happened at
    pub fn at(self, path: &str, offset: usize) -> Self {
        match self {
            // Already tagged by a nested accessor
            tagged @ CodecError::AtField { .. } => tagged,
            other => CodecError::AtField {
                path: display_path(path),
                offset,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any field tag stripped
    pub fn root_cause(&self) -> &CodecError {
        match self {
            CodecError::AtField { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn out_of_range(value: impl ToString, kind: impl ToString) -> Self {
        CodecError::OutOfRange {
            value: value.to_string(),
            kind: kind.to_string(),
        }
    }

    pub(crate) fn mismatch(kind: impl ToString, found: impl ToString) -> Self {
        CodecError::TypeMismatch {
            kind: kind.to_string(),
            found: found.to_string(),
        }
    }
}

/// Raised when a field path does not resolve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("{path}: no field named `{segment}`")]
    UnknownField { path: String, segment: String },

    #[error("{path}: index {index} out of range (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("{path}: cannot index a field that is not an array")]
    NotAnArray { path: String, index: usize },

    #[error("{path}: cannot select `{segment}` from a field that is not a struct")]
    NotAStruct { path: String, segment: String },

    #[error("malformed path `{0}`")]
    Malformed(String),
}

impl PathError {
    pub(crate) fn unknown_field(path: &str, segment: &str) -> Self {
        PathError::UnknownField {
            path: display_path(path),
            segment: segment.to_string(),
        }
    }

    pub(crate) fn index_out_of_range(path: &str, index: usize, len: usize) -> Self {
        PathError::IndexOutOfRange {
            path: display_path(path),
            index,
            len,
        }
    }

    pub(crate) fn not_an_array(path: &str, index: usize) -> Self {
        PathError::NotAnArray {
            path: display_path(path),
            index,
        }
    }

    pub(crate) fn not_a_struct(path: &str, segment: &str) -> Self {
        PathError::NotAStruct {
            path: display_path(path),
            segment: segment.to_string(),
        }
    }
}

/// Any failure surfaced by the layout engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitwiseError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("path error: {0}")]
    Path(#[from] PathError),

    #[error("bounds error: {0}")]
    Bounds(#[from] BoundsError),
}

pub type Result<T> = std::result::Result<T, BitwiseError>;

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.to_string()
    }
}
