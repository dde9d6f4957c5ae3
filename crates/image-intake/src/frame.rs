//! Raw upload and decoded image types

use image::{ColorType, DynamicImage, ImageFormat, RgbImage};

use crate::essence;

/// Uploaded bytes plus the declared content type
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// Declared MIME type, if the client sent one
    pub content_type: Option<String>,
}

impl RawImage {
    /// Create a new raw upload
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self { bytes, content_type }
    }

    /// Upload size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the upload carries no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Image format named by the declared content type
    pub fn format_hint(&self) -> Option<ImageFormat> {
        let essence = essence(self.content_type.as_deref()?);
        match essence.as_str() {
            // Common non-standard alias
            "image/jpg" => Some(ImageFormat::Jpeg),
            other => ImageFormat::from_mime_type(other),
        }
    }
}

/// Decoded RGB image
///
/// Channel count and sample depth are normalized to 8-bit RGB regardless of
/// what the source file carried.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
    source_color: ColorType,
    codec: &'static str,
}

impl DecodedImage {
    /// Wrap an RGB buffer directly
    pub fn new(pixels: RgbImage) -> Self {
        Self {
            pixels,
            source_color: ColorType::Rgb8,
            codec: "raw",
        }
    }

    /// Normalize a decoded image of any color type
    pub fn from_dynamic(image: DynamicImage, codec: &'static str) -> Self {
        let source_color = image.color();
        let pixels = match image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };
        Self {
            pixels,
            source_color,
            codec,
        }
    }

    /// Image width
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Image height
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Total pixel count
    pub fn pixel_count(&self) -> usize {
        self.pixels.width() as usize * self.pixels.height() as usize
    }

    /// RGB pixel buffer
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Color type of the source before normalization
    pub fn source_color(&self) -> ColorType {
        self.source_color
    }

    /// Name of the codec that produced this image
    pub fn codec(&self) -> &'static str {
        self.codec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    #[test]
    fn test_format_hint() {
        let raw = RawImage::new(vec![1], Some("image/png".to_string()));
        assert_eq!(raw.format_hint(), Some(ImageFormat::Png));

        let raw = RawImage::new(vec![1], Some("image/jpg".to_string()));
        assert_eq!(raw.format_hint(), Some(ImageFormat::Jpeg));

        let raw = RawImage::new(vec![1], Some("application/octet-stream".to_string()));
        assert_eq!(raw.format_hint(), None);

        let raw = RawImage::new(vec![1], None);
        assert_eq!(raw.format_hint(), None);
    }

    #[test]
    fn test_grayscale_normalized_to_rgb() {
        let gray = GrayImage::from_pixel(4, 3, Luma([90]));
        let decoded = DecodedImage::from_dynamic(DynamicImage::ImageLuma8(gray), "test");

        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 3);
        assert_eq!(decoded.pixel_count(), 12);
        assert_eq!(decoded.source_color(), ColorType::L8);
        assert_eq!(decoded.get_pixel(1, 1), Some([90, 90, 90]));
    }

    #[test]
    fn test_get_pixel_out_of_bounds() {
        let decoded = DecodedImage::new(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
        assert_eq!(decoded.get_pixel(1, 1), Some([1, 2, 3]));
        assert_eq!(decoded.get_pixel(2, 0), None);
    }
}
