// Backing store for radio memory images
pub mod byte_image;

pub use byte_image::{BoundsError, ByteImage, SharedImage};
