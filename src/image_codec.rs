//! PNG encoding of rendered symbols and decoding of uploaded images.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};
use tracing::trace;

use crate::reader::ReadError;

pub fn to_png(img: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Decodes any format the image crate recognises from its magic bytes.
pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage, ReadError> {
    let img = image::load_from_memory(bytes).map_err(|e| ReadError::InvalidImage(e.to_string()))?;
    trace!(width = img.width(), height = img.height(), "Loaded image");
    Ok(img)
}

/// Decodes to 8-bit luma.
pub fn gray_from_bytes(bytes: &[u8]) -> Result<GrayImage, ReadError> {
    Ok(from_bytes(bytes)?.to_luma8())
}

#[cfg(test)]
mod image_codec_tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_png_roundtrip() {
        let img = GrayImage::from_fn(17, 9, |x, y| Luma([if (x + y) % 3 == 0 { 0 } else { 255 }]));
        let png = to_png(&img).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(gray_from_bytes(&png).unwrap(), img);
    }

    #[test]
    fn test_not_an_image() {
        match from_bytes(b"not an image") {
            Err(ReadError::InvalidImage(_)) => {}
            other => panic!("expected invalid image, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_png() {
        let png = to_png(&GrayImage::new(40, 40)).unwrap();
        assert!(matches!(from_bytes(&png[..20]), Err(ReadError::InvalidImage(_))));
    }
}
