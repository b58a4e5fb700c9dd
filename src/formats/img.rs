// .img file format handler compatible with Python CHIRP
// Reference: chirp/chirp_common.py lines 1560-1629

use super::metadata::Metadata;
use crate::memmap::ByteImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode metadata: {0}")]
    MetadataDecode(String),

    #[error("Failed to parse metadata JSON: {0}")]
    MetadataJson(#[from] serde_json::Error),

    #[error("Failed to decode base64 metadata: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, ImgError>;

/// Magic bytes that separate binary data from metadata in .img files
/// This must match Python CHIRP exactly: b'\x00\xffchirp\xeeimg\x00\x01'
pub const MAGIC: &[u8] = b"\x00\xffchirp\xeeimg\x00\x01";

/// Split file contents into image bytes and metadata
pub fn parse_img(data: &[u8]) -> Result<(ByteImage, Metadata)> {
    match find_magic(data) {
        Some(idx) => {
            let metadata = decode_metadata(&data[idx + MAGIC.len()..])?;
            Ok((ByteImage::from_bytes(data[..idx].to_vec()), metadata))
        }
        None => Ok((ByteImage::from_bytes(data.to_vec()), Metadata::default())),
    }
}

/// File contents for an image and its metadata
pub fn serialize_img(image: &ByteImage, metadata: &Metadata) -> Result<Vec<u8>> {
    let encoded = STANDARD.encode(metadata.to_json()?);
    let mut out = Vec::with_capacity(image.len() + MAGIC.len() + encoded.len());
    out.extend_from_slice(image.as_bytes());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(encoded.as_bytes());
    Ok(out)
}

/// Load a .img file and return the image and metadata
pub fn load_img(filename: impl AsRef<Path>) -> Result<(ByteImage, Metadata)> {
    let mut file = File::open(filename)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    parse_img(&data)
}

/// Save an image and metadata to a .img file
pub fn save_img(filename: impl AsRef<Path>, image: &ByteImage, metadata: &Metadata) -> Result<()> {
    let mut file = File::create(filename)?;
    file.write_all(&serialize_img(image, metadata)?)?;
    Ok(())
}

/// Find the position of MAGIC in the data
fn find_magic(data: &[u8]) -> Option<usize> {
    data.windows(MAGIC.len()).position(|window| window == MAGIC)
}

/// Decode base64-encoded JSON metadata
fn decode_metadata(encoded: &[u8]) -> Result<Metadata> {
    let trimmed = encoded.trim_ascii_end();
    let decoded = STANDARD.decode(trimmed)?;
    let json_str =
        String::from_utf8(decoded).map_err(|e| ImgError::MetadataDecode(e.to_string()))?;
    Ok(Metadata::from_json(&json_str)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_magic_finding() {
        let data = b"hello\x00\xffchirp\xeeimg\x00\x01world";
        assert_eq!(find_magic(data), Some(5));

        let data = b"no magic here";
        assert_eq!(find_magic(data), None);
    }

    #[test]
    fn test_save_load_img() -> Result<()> {
        let tempfile = NamedTempFile::new().unwrap();
        let path = tempfile.path().to_path_buf();

        let image = ByteImage::from_bytes(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let mut metadata = Metadata::new("Baofeng", "UV-5R");
        metadata.rclass = "BaofengUV5R".to_string();

        save_img(&path, &image, &metadata)?;
        let (loaded, loaded_metadata) = load_img(&path)?;

        assert_eq!(loaded, image);
        assert_eq!(loaded_metadata.vendor, "Baofeng");
        assert_eq!(loaded_metadata.model, "UV-5R");
        assert_eq!(loaded_metadata.rclass, "BaofengUV5R");

        Ok(())
    }

    #[test]
    fn test_load_raw_binary() -> Result<()> {
        let mut tempfile = NamedTempFile::new().unwrap();
        tempfile.write_all(&[1, 2, 3, 4, 5]).unwrap();

        let (image, metadata) = load_img(tempfile.path())?;

        assert_eq!(image.as_bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(metadata.vendor, "");

        Ok(())
    }

    #[test]
    fn test_python_compatibility() -> Result<()> {
        // <binary_data><MAGIC><base64(json)>
        let mut data = vec![0xAA, 0xBB, 0xCC, 0xDD];
        data.extend_from_slice(MAGIC);
        let metadata_json = r#"{"vendor":"Icom","model":"IC-T7H","chirp_version":"0.1.0"}"#;
        data.extend_from_slice(STANDARD.encode(metadata_json).as_bytes());
        data.push(b'\n');

        let (image, metadata) = parse_img(&data)?;

        assert_eq!(image.as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(metadata.vendor, "Icom");
        assert_eq!(metadata.model, "IC-T7H");

        Ok(())
    }

    #[test]
    fn test_bad_metadata() {
        let mut data = vec![0u8; 4];
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(b"!!not base64!!");
        assert!(matches!(parse_img(&data), Err(ImgError::Base64Decode(_))));
    }
}
