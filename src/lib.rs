// CHIRP-BITWISE: declarative memory layouts for clone-mode radio images
// Copyright 2024 - Licensed under GPLv3

pub mod bitwise;
pub mod core;
pub mod drivers;
pub mod formats;
pub mod memmap;

// Re-export commonly used types
pub use bitwise::{
    compile_schema, compile_schema_with, BitwiseError, CodecError, CompileOptions, FieldHandle,
    LayoutTree, OverflowPolicy, PathError, SchemaError, StructuredView, Value, ViewOptions,
};
pub use crate::core::{constants::*, Memory, PowerLevel};
pub use drivers::{detect_driver, get_driver, list_drivers, CloneModeRadio, Radio, RadioError};
pub use formats::{load_img, save_img, Metadata};
pub use memmap::{BoundsError, ByteImage, SharedImage};

/// Crate version, recorded in saved image metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
