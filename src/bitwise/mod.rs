// Declarative memory-layout engine: schema text -> layout tree -> typed views
// Rust counterpart of CHIRP's bitwise DSL

pub mod bcd;
pub mod codec;
pub mod error;
mod grammar;
pub mod layout;
pub mod options;
pub mod types;
pub mod view;

pub use error::{BitwiseError, CodecError, PathError, SchemaError};
pub use layout::{compile_schema, compile_schema_with, LayoutNode, LayoutTree, NodeKind, StructLayout};
pub use options::{CompileOptions, OverflowPolicy, ViewOptions};
pub use types::{BitOrder, Endianness, IntType, ScalarKind, Value};
pub use view::{FieldHandle, StructuredView};
