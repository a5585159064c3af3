//! Upload validation and decoding: size gate, byte-signature sniffing and
//! the immutable record describing the loaded image.

use chrono::{DateTime, Utc};
use image::ImageFormat;
use thiserror::Error;

/// Largest accepted upload, in bytes.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// MIME types accepted after sniffing the file content.
pub const ACCEPTED_MIME_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Everything that can go wrong between receiving file bytes and having a
/// displayable image. `Display` strings are shown to the user verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("File size exceeds 10MB limit")]
    TooLarge,
    #[error("Invalid file type. Only JPG and PNG files are allowed")]
    InvalidType,
    #[error("Failed to validate file type")]
    SniffFailed,
    #[error("Failed to load image")]
    DecodeFailed,
    #[error("Failed to read file")]
    ReadFailed,
}

/// Metadata and pixels of a successfully uploaded image. Immutable once
/// created; a new upload replaces the whole record.
#[derive(Debug)]
pub struct ImageRecord {
    pub name: String,
    pub size: usize,
    /// Type claimed by the file name / browser, e.g. `image/png`.
    pub declared_type: String,
    /// Type detected from the file's magic bytes.
    pub sniffed_type: &'static str,
    pub last_modified: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub pixels: image::RgbaImage,
}

impl ImageRecord {
    /// Natural pixel dimensions of the source image.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// PNG carries the longest signature we accept (8 bytes); anything shorter
// cannot be sniffed at all.
const MIN_SNIFF_LEN: usize = 8;

/// Detect the content type from magic bytes, independent of the file name.
fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, UploadError> {
    if bytes.len() < MIN_SNIFF_LEN {
        return Err(UploadError::SniffFailed);
    }
    match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
        // A recognized-but-disallowed signature and an unrecognized one are
        // the same to the user: not a JPG/PNG.
        Ok(_) | Err(_) => Err(UploadError::InvalidType),
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        _ => "image/png",
    }
}

/// Validate and decode an upload.
///
/// Order matters: the size gate runs before any decoding attempt, and the
/// sniffed signature decides acceptance regardless of `declared_type`.
///
/// # Errors
/// See [`UploadError`]; every variant maps to one user-facing message.
pub fn process_upload(
    name: String,
    declared_type: String,
    last_modified: DateTime<Utc>,
    bytes: &[u8],
) -> Result<ImageRecord, UploadError> {
    if bytes.len() > MAX_FILE_SIZE {
        return Err(UploadError::TooLarge);
    }

    let format = sniff_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|_| UploadError::DecodeFailed)?;
    let pixels = decoded.to_rgba8();
    let (width, height) = pixels.dimensions();

    Ok(ImageRecord {
        name,
        size: bytes.len(),
        declared_type,
        sniffed_type: mime_for(format),
        last_modified,
        width,
        height,
        pixels,
    })
}

/// MIME type implied by a file name's extension. This is the *declared*
/// type; acceptance is decided by sniffing, never by this.
pub fn declared_type_for_name(name: &str) -> String {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_owned(),
        "png" => "image/png".to_owned(),
        _ => "unknown".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn upload(name: &str, bytes: &[u8]) -> Result<ImageRecord, UploadError> {
        process_upload(
            name.to_owned(),
            declared_type_for_name(name),
            Utc::now(),
            bytes,
        )
    }

    #[test]
    fn valid_png_produces_a_record_with_natural_dimensions() {
        let bytes = encoded_png(7, 5);
        let record = upload("shot.png", &bytes).unwrap();
        assert_eq!(record.dimensions(), (7, 5));
        assert_eq!(record.size, bytes.len());
        assert_eq!(record.declared_type, "image/png");
        assert_eq!(record.sniffed_type, "image/png");
    }

    #[test]
    fn oversized_file_is_rejected_before_decoding() {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(MAX_FILE_SIZE + 1, 0);
        assert!(matches!(upload("big.png", &bytes), Err(UploadError::TooLarge)));
    }

    #[test]
    fn size_gate_is_exclusive_at_the_limit() {
        // Exactly 10 MiB passes the gate and fails later, on its content.
        let mut bytes = b"GIF89a".to_vec();
        bytes.resize(MAX_FILE_SIZE, 0);
        assert!(matches!(upload("fine.png", &bytes), Err(UploadError::InvalidType)));
    }

    #[test]
    fn gif_content_is_rejected_despite_png_name() {
        let bytes = b"GIF89a\x01\x00\x01\x00\x00\x00\x00".to_vec();
        assert!(matches!(upload("disguised.png", &bytes), Err(UploadError::InvalidType)));
    }

    #[test]
    fn truncated_header_cannot_be_sniffed() {
        assert!(matches!(upload("stub.png", &PNG_MAGIC[..4]), Err(UploadError::SniffFailed)));
        assert!(matches!(upload("empty.png", &[]), Err(UploadError::SniffFailed)));
    }

    #[test]
    fn corrupt_png_fails_to_decode() {
        // Real signature, garbage body.
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0xAA; 64]);
        assert!(matches!(upload("broken.png", &bytes), Err(UploadError::DecodeFailed)));
    }

    #[test]
    fn error_messages_are_the_user_facing_strings() {
        assert_eq!(UploadError::TooLarge.to_string(), "File size exceeds 10MB limit");
        assert_eq!(
            UploadError::InvalidType.to_string(),
            "Invalid file type. Only JPG and PNG files are allowed"
        );
        assert_eq!(UploadError::SniffFailed.to_string(), "Failed to validate file type");
        assert_eq!(UploadError::DecodeFailed.to_string(), "Failed to load image");
        assert_eq!(UploadError::ReadFailed.to_string(), "Failed to read file");
    }

    #[test]
    fn declared_type_follows_the_extension_only() {
        assert_eq!(declared_type_for_name("a.PNG"), "image/png");
        assert_eq!(declared_type_for_name("b.jpeg"), "image/jpeg");
        assert_eq!(declared_type_for_name("c.jpg"), "image/jpeg");
        assert_eq!(declared_type_for_name("noext"), "unknown");
        assert_eq!(declared_type_for_name("weird.gif"), "unknown");
    }
}
