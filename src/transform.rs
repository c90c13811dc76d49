//! Pixel transform: resize, crop-to-fit, grayscale and re-encode.

use std::io::Cursor;

use image::{
    DynamicImage, ImageFormat, Rgb, RgbImage, codecs::jpeg::JpegEncoder, imageops::FilterType,
};

use crate::descriptor::{RasterFormat, TransformParams};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error("source is not a supported raster format")]
    UnsupportedFormat,

    #[error("requested size {width}x{height} exceeds the {max}px limit")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Encoded result of a transform, with the formats it actually saw and wrote.
#[derive(Clone, Debug)]
pub struct TransformedImage {
    pub bytes: Vec<u8>,
    pub input: RasterFormat,
    pub output: RasterFormat,
}

/// Applies [`TransformParams`] to an encoded source image.
///
/// `declared` is the format named by the source key. Unconverted output is written in that
/// format, so the stored bytes match the destination key and its content type even when the
/// source bytes do not. Implementations are called from a blocking worker thread.
pub trait PixelTransform: Send + Sync {
    fn apply(
        &self,
        source: &[u8],
        params: &TransformParams,
        declared: RasterFormat,
    ) -> Result<TransformedImage, TransformError>;
}

/// [`PixelTransform`] backed by the `image` crate.
#[derive(Clone, Debug)]
pub struct ImageTransform {
    pub jpeg_quality: u8,
    /// Upper bound for either side of the output.
    pub max_dimension: u32,
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl PixelTransform for ImageTransform {
    fn apply(
        &self,
        source: &[u8],
        params: &TransformParams,
        declared: RasterFormat,
    ) -> Result<TransformedImage, TransformError> {
        let format = image::guess_format(source).map_err(|_| TransformError::UnsupportedFormat)?;
        let input = raster_format(format).ok_or(TransformError::UnsupportedFormat)?;
        let img = image::load_from_memory_with_format(source, format)?;

        let (width, height) = target_size(img.width(), img.height(), params.width, params.height);
        if width > self.max_dimension || height > self.max_dimension {
            return Err(TransformError::TooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }

        let mut img = if params.crop && params.width > 0 && params.height > 0 {
            img.resize_to_fill(width, height, FilterType::Lanczos3)
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };
        if params.grayscale {
            img = img.grayscale();
        }

        let output = params.conversion.resolve(declared, input);
        let bytes = match output {
            RasterFormat::Jpeg => {
                let rgb = flatten_on_white(&img);
                let mut buf = Vec::new();
                let encoder = JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality);
                DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;
                buf
            }
            RasterFormat::Png => {
                let mut buf = Vec::new();
                img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
                buf
            }
        };

        tracing::debug!(
            ?declared,
            ?input,
            ?output,
            width,
            height,
            bytes = bytes.len(),
            "transformed image"
        );

        Ok(TransformedImage {
            bytes,
            input,
            output,
        })
    }
}

fn raster_format(format: ImageFormat) -> Option<RasterFormat> {
    match format {
        ImageFormat::Jpeg => Some(RasterFormat::Jpeg),
        ImageFormat::Png => Some(RasterFormat::Png),
        _ => None,
    }
}

/// Output size for a request. A zero side follows the aspect ratio of the source; zero on both
/// keeps the source size.
fn target_size(src_w: u32, src_h: u32, width: u32, height: u32) -> (u32, u32) {
    match (width, height) {
        (0, 0) => (src_w, src_h),
        (0, h) => (scale(src_w, h, src_h), h),
        (w, 0) => (w, scale(src_h, w, src_w)),
        (w, h) => (w, h),
    }
}

/// `side * target / reference`, rounded, at least 1.
fn scale(side: u32, target: u32, reference: u32) -> u32 {
    let reference = u64::from(reference.max(1));
    let scaled = (u64::from(side) * u64::from(target) + reference / 2) / reference;
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// JPEG has no alpha: composite onto white.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        *dst = Rgb([blend(r), blend(g), blend(b)]);
    }
    out
}
