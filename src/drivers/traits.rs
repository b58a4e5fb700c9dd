// Radio driver traits
// Reference: chirp/chirp_common.py lines 1240-1500

use super::config::ModelConfig;
use crate::bitwise::{BitwiseError, CodecError, PathError, SchemaError, StructuredView};
use crate::core::{Memory, MemoryError};
use crate::memmap::ByteImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("Invalid memory location: {0}")]
    InvalidMemory(u32),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Radio error: {0}")]
    Radio(String),

    #[error("No image loaded")]
    NoImage,

    #[error("Image is {actual} bytes, model needs at least {expected}")]
    ImageSize { expected: usize, actual: usize },

    #[error("Layout error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Field access error: {0}")]
    Codec(#[from] CodecError),

    #[error("Field path error: {0}")]
    Path(#[from] PathError),

    #[error("Invalid memory: {0}")]
    Memory(#[from] MemoryError),
}

impl From<BitwiseError> for RadioError {
    fn from(err: BitwiseError) -> Self {
        match err {
            BitwiseError::Schema(e) => RadioError::Schema(e),
            BitwiseError::Codec(e) => RadioError::Codec(e),
            BitwiseError::Path(e) => RadioError::Path(e),
            BitwiseError::Bounds(e) => RadioError::Codec(e.into()),
        }
    }
}

pub type RadioResult<T> = std::result::Result<T, RadioError>;

/// Base trait for all radio drivers
pub trait Radio {
    /// Static description of the model
    fn config(&self) -> &ModelConfig;

    fn vendor(&self) -> &str {
        &self.config().vendor
    }

    fn model(&self) -> &str {
        &self.config().model
    }

    /// Get a printable name for this radio
    fn get_name(&self) -> String {
        format!("{} {}", self.vendor(), self.model())
    }

    /// Get a memory from the radio
    /// Returns None if the memory is empty
    fn get_memory(&self, number: u32) -> RadioResult<Option<Memory>>;

    /// Set a memory in the radio. An `empty` memory erases the slot.
    fn set_memory(&mut self, memory: &Memory) -> RadioResult<()>;

    /// Delete a memory (mark as empty)
    fn delete_memory(&mut self, number: u32) -> RadioResult<()> {
        self.set_memory(&Memory::new_empty(number))
    }

    /// Get all non-empty memories
    fn get_memories(&self) -> RadioResult<Vec<Memory>> {
        let (start, end) = self.config().memory_bounds;
        let mut memories = Vec::new();

        for i in start..=end {
            if let Some(mem) = self.get_memory(i)? {
                memories.push(mem);
            }
        }

        Ok(memories)
    }
}

/// Trait for radios that exchange a full memory image
/// Reference: chirp/chirp_common.py lines 1498-1641
pub trait CloneModeRadio: Radio {
    /// Get the size of the radio's memory image in bytes
    fn get_memsize(&self) -> usize {
        self.config().memsize
    }

    /// Bind an image to the driver's layout, replacing any previous one
    fn load_image(&mut self, image: ByteImage) -> RadioResult<()>;

    /// The bound image, if any
    fn view(&self) -> Option<&StructuredView>;

    /// Copy of the current image bytes, for saving or uploading
    fn image_bytes(&self) -> RadioResult<Vec<u8>> {
        self.view()
            .map(StructuredView::to_bytes)
            .ok_or(RadioError::NoImage)
    }

    /// Check if this driver matches a given file
    fn match_model(data: &[u8], filename: &str) -> bool
    where
        Self: Sized;
}

/// Reject images smaller than the model's memory size
pub(crate) fn check_image_size(config: &ModelConfig, image: &ByteImage) -> RadioResult<()> {
    if image.len() < config.memsize {
        return Err(RadioError::ImageSize {
            expected: config.memsize,
            actual: image.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitwise::compile_schema;

    #[test]
    fn test_bitwise_error_conversion() {
        let err = compile_schema("u8 a; }").unwrap_err();
        let radio: RadioError = BitwiseError::from(err).into();
        assert!(matches!(radio, RadioError::Schema(_)));
    }

    #[test]
    fn test_image_size_check() {
        let config = ModelConfig {
            memsize: 16,
            ..ModelConfig::default()
        };
        assert!(check_image_size(&config, &ByteImage::zeroed(16)).is_ok());
        let err = check_image_size(&config, &ByteImage::zeroed(8)).unwrap_err();
        assert_eq!(err.to_string(), "Image is 8 bytes, model needs at least 16");
    }
}
