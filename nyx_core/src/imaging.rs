//! Image filters applied to attachments and avatars.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Limits, Rgba};

/// Largest accepted input in bytes.
pub const MAX_INPUT_BYTES: usize = 8 * 1024 * 1024;
/// Largest accepted width or height.
pub const MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Filter {
    Invert,
    Grayscale,
    Blur(f32),
    Pixelate(u32),
    /// Upside down.
    Flip,
    /// Left to right.
    Mirror,
    Rotate(Rotation),
    Sepia,
    Deepfry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Quarter,
    Half,
    ThreeQuarters,
}

impl Rotation {
    #[must_use]
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            90 => Some(Rotation::Quarter),
            180 => Some(Rotation::Half),
            270 => Some(Rotation::ThreeQuarters),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ImageError {
    TooLarge(usize),
    Dimensions { width: u32, height: u32 },
    Decode(image::ImageError),
    Encode(image::ImageError),
}

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageError::TooLarge(size) => write!(
                f,
                "Image is {:.1} MiB, the limit is {} MiB.",
                *size as f64 / (1024.0 * 1024.0),
                MAX_INPUT_BYTES / (1024 * 1024)
            ),
            ImageError::Dimensions { width, height } => write!(
                f,
                "Image is {width}x{height}, the limit is {MAX_DIMENSION}px on each side."
            ),
            ImageError::Decode(e) => write!(f, "Could not read that image: {e}"),
            ImageError::Encode(e) => write!(f, "Could not encode the result: {e}"),
        }
    }
}

impl std::error::Error for ImageError {}

#[must_use]
pub fn apply(image: DynamicImage, filter: Filter) -> DynamicImage {
    match filter {
        Filter::Invert => {
            let mut image = image;
            image.invert();
            image
        }
        Filter::Grayscale => image.grayscale(),
        Filter::Blur(sigma) => image.blur(sigma.clamp(0.5, 50.0)),
        Filter::Pixelate(block) => pixelate(&image, block),
        Filter::Flip => image.flipv(),
        Filter::Mirror => image.fliph(),
        Filter::Rotate(Rotation::Quarter) => image.rotate90(),
        Filter::Rotate(Rotation::Half) => image.rotate180(),
        Filter::Rotate(Rotation::ThreeQuarters) => image.rotate270(),
        Filter::Sepia => sepia(&image),
        Filter::Deepfry => deepfry(&image),
    }
}

/// Decodes `bytes`, applies `filter` and encodes the result as PNG.
pub fn process(bytes: &[u8], filter: Filter) -> Result<Vec<u8>, ImageError> {
    if bytes.len() > MAX_INPUT_BYTES {
        return Err(ImageError::TooLarge(bytes.len()));
    }

    encode_png(&apply(decode(bytes)?, filter))
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode(image::ImageError::IoError(e)))
}

/// Decodes `bytes`, rejecting oversized images from their header alone.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    let (width, height) = reader(bytes)?
        .into_dimensions()
        .map_err(ImageError::Decode)?;
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ImageError::Dimensions { width, height });
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);

    let mut reader = reader(bytes)?;
    reader.limits(limits);
    reader.decode().map_err(ImageError::Decode)
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(ImageError::Encode)?;
    Ok(out)
}

fn pixelate(image: &DynamicImage, block: u32) -> DynamicImage {
    let block = block.clamp(2, 64);
    let (width, height) = image.dimensions();
    let small = image.resize_exact(
        (width / block).max(1),
        (height / block).max(1),
        FilterType::Nearest,
    );
    small.resize_exact(width, height, FilterType::Nearest)
}

fn sepia(image: &DynamicImage) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    for Rgba([r, g, b, _]) in rgba.pixels_mut() {
        let (fr, fg, fb) = (f32::from(*r), f32::from(*g), f32::from(*b));
        *r = (0.393 * fr + 0.769 * fg + 0.189 * fb).min(255.0) as u8;
        *g = (0.349 * fr + 0.686 * fg + 0.168 * fb).min(255.0) as u8;
        *b = (0.272 * fr + 0.534 * fg + 0.131 * fb).min(255.0) as u8;
    }
    DynamicImage::ImageRgba8(rgba)
}

fn deepfry(image: &DynamicImage) -> DynamicImage {
    let mut rgb = image.adjust_contrast(60.0).brighten(20).to_rgb8();

    // oversaturate by pushing every channel away from the pixel's mean.
    for pixel in rgb.pixels_mut() {
        let mean = pixel.0.iter().map(|c| i32::from(*c)).sum::<i32>() / 3;
        for channel in &mut pixel.0 {
            let pushed = mean + (i32::from(*channel) - mean) * 2;
            *channel = pushed.clamp(0, 255) as u8;
        }
    }

    // a low quality jpeg pass adds the artifacts.
    let mut jpeg = Vec::new();
    let encoded = JpegEncoder::new_with_quality(&mut jpeg, 12)
        .encode_image(&rgb)
        .is_ok();
    if encoded {
        if let Ok(fried) = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg) {
            return fried;
        }
    }

    DynamicImage::ImageRgb8(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn sample() -> DynamicImage {
        let mut img = RgbaImage::new(8, 4);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 30) as u8, (y * 60) as u8, 200, 255]);
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn invert_flips_channels() {
        let out = apply(sample(), Filter::Invert).to_rgba8();
        assert_eq!(out.get_pixel(1, 1), &Rgba([225, 195, 55, 255]));
    }

    #[test]
    fn grayscale_equalises_channels() {
        let out = apply(sample(), Filter::Grayscale).to_rgba8();
        for Rgba([r, g, b, _]) in out.pixels() {
            assert!(r == g && g == b);
        }
    }

    #[test]
    fn rotation_swaps_dimensions() {
        assert_eq!(apply(sample(), Filter::Rotate(Rotation::Quarter)).dimensions(), (4, 8));
        assert_eq!(apply(sample(), Filter::Rotate(Rotation::Half)).dimensions(), (8, 4));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::ThreeQuarters));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn mirror_moves_left_column_right() {
        let original = sample().to_rgba8();
        let out = apply(sample(), Filter::Mirror).to_rgba8();
        assert_eq!(out.get_pixel(7, 0), original.get_pixel(0, 0));
    }

    #[test]
    fn pixelate_keeps_size_and_blocks() {
        let out = apply(sample(), Filter::Pixelate(4)).to_rgba8();
        assert_eq!(out.dimensions(), (8, 4));
        assert_eq!(out.get_pixel(0, 0), out.get_pixel(3, 3));
    }

    #[test]
    fn deepfry_keeps_size() {
        assert_eq!(apply(sample(), Filter::Deepfry).dimensions(), (8, 4));
    }

    #[test]
    fn process_outputs_png() {
        let input = encode_png(&sample()).unwrap();
        let output = process(&input, Filter::Sepia).unwrap();
        assert_eq!(&output[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn process_rejects_garbage_and_oversized() {
        assert!(matches!(
            process(b"definitely not an image", Filter::Invert),
            Err(ImageError::Decode(_))
        ));
        let huge = vec![0; MAX_INPUT_BYTES + 1];
        assert!(matches!(
            process(&huge, Filter::Invert),
            Err(ImageError::TooLarge(_))
        ));
    }

    #[test]
    fn oversized_dimensions_rejected_from_header() {
        let wide = encode_png(&DynamicImage::new_luma8(MAX_DIMENSION + 1, 1)).unwrap();
        assert!(wide.len() < MAX_INPUT_BYTES);
        assert!(matches!(
            process(&wide, Filter::Invert),
            Err(ImageError::Dimensions { width, height: 1 }) if width == MAX_DIMENSION + 1
        ));

        let tall = encode_png(&DynamicImage::new_luma8(1, 5000)).unwrap();
        assert!(matches!(
            decode(&tall),
            Err(ImageError::Dimensions { width: 1, height: 5000 })
        ));
    }

    #[test]
    fn largest_allowed_side_decodes() {
        let edge = encode_png(&DynamicImage::new_luma8(MAX_DIMENSION, 2)).unwrap();
        assert_eq!(decode(&edge).unwrap().dimensions(), (MAX_DIMENSION, 2));
    }
}
