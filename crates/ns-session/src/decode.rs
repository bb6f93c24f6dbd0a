//! Payload decoding
//!
//! Fetched bytes only count as a successful fetch once they decode as an
//! image. A transport success carrying a corrupt or wrong-typed payload is a
//! failure like any other.

use ns_core::ClassifiedError;

/// Metadata of a decoded image payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// MIME type of the detected format, e.g. `image/png`
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// Validates and decodes fetched payloads
pub trait PayloadDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<ImageInfo, ClassifiedError>;
}

/// Decodes PNG, JPEG, GIF, and WebP payloads with the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl PayloadDecoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ImageInfo, ClassifiedError> {
        if bytes.is_empty() {
            return Err(ClassifiedError::generic("fetched content is empty"));
        }

        let format = image::guess_format(bytes).map_err(|e| {
            ClassifiedError::generic(format!("fetched content is not a recognized image: {}", e))
        })?;

        let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| {
            ClassifiedError::generic(format!(
                "failed to decode {} payload: {}",
                format.to_mime_type(),
                e
            ))
        })?;

        Ok(ImageInfo {
            mime_type: format.to_mime_type().to_string(),
            width: decoded.width(),
            height: decoded.height(),
        })
    }
}

#[cfg(test)]
pub(crate) fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("PNG encoding of an in-memory image cannot fail");
    out.into_inner()
}
