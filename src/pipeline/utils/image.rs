use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::contrast::equalize_histogram;

use crate::pipeline::module::face_detection::BoundingBox;

/// Decode uploaded bytes into an RGB pixel buffer.
pub fn decode_rgb(im_bytes: &[u8]) -> Result<RgbImage, image::ImageError> {
    let image = image::load_from_memory(im_bytes)?;
    Ok(image.into_rgb8())
}

/// Greyscale with equalized histogram, the detector's input.
pub fn equalized_gray(image: &RgbImage) -> GrayImage {
    let gray = DynamicImage::ImageRgb8(image.clone()).into_luma8();
    equalize_histogram(&gray)
}

/// Crop `bbox` out of `image`, clamped to the image bounds.
pub fn crop(image: &RgbImage, bbox: &BoundingBox) -> RgbImage {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let x0 = (bbox.x as i64).clamp(0, w);
    let y0 = (bbox.y as i64).clamp(0, h);
    let x1 = (bbox.x as i64 + bbox.width as i64).clamp(0, w);
    let y1 = (bbox.y as i64 + bbox.height as i64).clamp(0, h);
    let (x, y) = (x0 as u32, y0 as u32);
    let width = (x1 - x0).max(0) as u32;
    let height = (y1 - y0).max(0) as u32;

    if width == 0 || height == 0 {
        return image.clone();
    }
    image::imageops::crop_imm(image, x, y, width, height).to_image()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb};

    use super::*;

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_rgb() {
        let source = RgbImage::from_pixel(10, 8, Rgb([10, 20, 30]));
        let decoded = decode_rgb(&png_bytes(&source)).unwrap();
        assert_eq!(decoded.dimensions(), (10, 8));
        assert_eq!(decoded.get_pixel(3, 3), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_rgb(b"definitely not an image").is_err());
        assert!(decode_rgb(&[]).is_err());
    }

    #[test]
    fn test_equalized_gray_spreads_range() {
        let mut source = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        source.put_pixel(0, 0, Rgb([110, 110, 110]));
        let gray = equalized_gray(&source);
        assert_eq!(gray.dimensions(), (4, 4));
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
        assert!(gray.get_pixel(1, 1)[0] < 255);
    }

    #[test]
    fn test_crop_is_clamped() {
        let source = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let bbox = BoundingBox { x: 15, y: -5, width: 10, height: 10 };
        assert_eq!(crop(&source, &bbox).dimensions(), (5, 5));

        let outside = BoundingBox { x: 40, y: 40, width: 10, height: 10 };
        assert_eq!(crop(&source, &outside).dimensions(), (20, 20));
    }
}
