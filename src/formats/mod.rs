// File format handlers
pub mod img;
pub mod metadata;

pub use img::{load_img, parse_img, save_img, serialize_img, ImgError};
pub use metadata::Metadata;
