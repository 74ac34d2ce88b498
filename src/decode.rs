//! Decoding of completed images into gray or RGB pixels
//!
//! Dispatches on the image encoding. Standard JPEG streams go straight to
//! `jpeg-decoder`; minimized streams are repaired first. Raw buffers are
//! validated and converted between gray and RGB as requested.
//!
//! # Usage
//!
//! ```rust,ignore
//! use encoded_image_lib::decode::{decode, PixelFormat};
//!
//! if image.add_chunk(&chunk) {
//!     let decoded = decode(&image, PixelFormat::Rgb8)?;
//!     assert_eq!(decoded.data.len(), decoded.width as usize * decoded.height as usize * 3);
//! }
//! ```

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, RgbImage};
use thiserror::Error;

use crate::config::AssemblerConfig;
use crate::encoding::ImageEncoding;
use crate::frame_assembler::EncodedImage;
use crate::mini_jpeg::{mini_color_to_jpeg, mini_gray_to_jpeg, RepairError};
use crate::pixel_conversion::{gray_to_rgb, pad_horizontal, pass_through, rgb_to_gray, ConversionError};

/// Pixel layout of decoded output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel
    Gray8,
    /// Three bytes per pixel, R-G-B order
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> u32 {
        match self {
            Self::Gray8 => 1,
            Self::Rgb8 => 3,
        }
    }
}

/// Decoded pixels of one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Layout of `data`
    pub format: PixelFormat,
    /// Row-major pixel data
    pub data: Vec<u8>,
    /// Timestamp of the source image
    pub timestamp: u64,
}

/// Errors that can occur while decoding an image
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The encoding has no decoder.
    #[error("encoding {0:?} not supported for decoding")]
    UnsupportedEncoding(ImageEncoding),

    /// The minimized stream could not be repaired.
    #[error("minimized JPEG repair failed: {0}")]
    Repair(#[from] RepairError),

    /// The JPEG codec rejected the stream.
    #[error("JPEG decode failed: {0}")]
    Jpeg(#[from] jpeg_decoder::Error),

    /// Raw pixels could not be converted.
    #[error("pixel conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    /// Decoded size differs from the size declared by the chunks.
    #[error("decoded image is {width}x{height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        /// Declared width
        expected_width: u32,
        /// Declared height
        expected_height: u32,
        /// Decoded width
        width: u32,
        /// Decoded height
        height: u32,
    },

    /// The JPEG codec produced a pixel format this crate does not handle.
    #[error("unsupported decoded pixel format {0}")]
    UnsupportedPixelFormat(String),
}

/// Result type for decoding
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Pixels in whatever layout the source produced
struct NativePixels {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl EncodedImage {
    /// Decode this image with the default configuration
    ///
    /// # Errors
    ///
    /// See [`decode`].
    pub fn decode(&self, format: PixelFormat) -> Result<DecodedImage> {
        decode(self, format)
    }
}

/// Decode a completed image into `format`
///
/// # Errors
///
/// Returns `DecodeError` if the encoding is unsupported, the payload is
/// corrupt, or the decoded size does not match the declared size.
pub fn decode(image: &EncodedImage, format: PixelFormat) -> Result<DecodedImage> {
    decode_with_config(image, format, &AssemblerConfig::default())
}

/// Decode a completed image into `format` using `config` for padding
///
/// # Errors
///
/// See [`decode`].
pub fn decode_with_config(
    image: &EncodedImage,
    format: PixelFormat,
    config: &AssemblerConfig,
) -> Result<DecodedImage> {
    let width = u32::from(image.width());
    let height = u32::from(image.height());
    let buffer = image.buffer();

    let native = match image.encoding() {
        ImageEncoding::RawGray => NativePixels {
            width,
            height,
            format: PixelFormat::Gray8,
            data: pass_through(buffer, width, height, 1)?,
        },

        ImageEncoding::RawRgb => NativePixels {
            width,
            height,
            format: PixelFormat::Rgb8,
            data: pass_through(buffer, width, height, 3)?,
        },

        ImageEncoding::JpegGray | ImageEncoding::JpegColor => decode_jpeg(buffer)?,

        ImageEncoding::JpegColorHalfWidth => {
            let decoded = decode_jpeg(buffer)?;
            let pad = config.half_width_padding;
            let padded_width = pad
                .checked_mul(2)
                .and_then(|border| decoded.width.checked_add(border))
                .ok_or_else(|| {
                    ConversionError(format!(
                        "padding {} overflows frame width {}",
                        pad, decoded.width
                    ))
                })?;

            // Check before padding so a bad border never gets allocated
            if padded_width != width || decoded.height != height {
                return Err(size_mismatch(width, height, padded_width, decoded.height));
            }

            let data = pad_horizontal(
                &decoded.data,
                decoded.width,
                decoded.height,
                decoded.format.channels(),
                pad,
                0,
            )?;
            NativePixels {
                width: padded_width,
                data,
                ..decoded
            }
        }

        ImageEncoding::JpegMinimizedGray => {
            let jpeg = mini_gray_to_jpeg(buffer, image.height(), image.width())?;
            decode_jpeg(&jpeg)?
        }

        ImageEncoding::JpegMinimizedColor => {
            // Color frames are sent at half horizontal resolution
            let jpeg = mini_color_to_jpeg(buffer, image.height(), image.width() / 2)?;
            let decoded = decode_jpeg(&jpeg)?;
            resize(decoded, width, height)?
        }

        ImageEncoding::None
        | ImageEncoding::Yuyv
        | ImageEncoding::Yuv420sp
        | ImageEncoding::Bayer => {
            log::error!(
                "EncodedImage.DecodeImage.UnsupportedEncoding: encoding {:?} not supported for decoding image chunks",
                image.encoding()
            );
            return Err(DecodeError::UnsupportedEncoding(image.encoding()));
        }
    };

    if native.width != width || native.height != height {
        return Err(size_mismatch(width, height, native.width, native.height));
    }

    let data = match (native.format, format) {
        (PixelFormat::Gray8, PixelFormat::Gray8) | (PixelFormat::Rgb8, PixelFormat::Rgb8) => {
            native.data
        }
        (PixelFormat::Gray8, PixelFormat::Rgb8) => gray_to_rgb(&native.data, width, height)?,
        (PixelFormat::Rgb8, PixelFormat::Gray8) => rgb_to_gray(&native.data, width, height)?,
    };

    Ok(DecodedImage {
        width,
        height,
        format,
        data,
        timestamp: image.timestamp(),
    })
}

/// Decode a standard JPEG stream into its native pixel layout
fn decode_jpeg(jpeg: &[u8]) -> Result<NativePixels> {
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(jpeg));
    let data = decoder.decode()?;

    let info = decoder
        .info()
        .ok_or_else(|| DecodeError::UnsupportedPixelFormat("missing image info".to_string()))?;

    let format = match info.pixel_format {
        jpeg_decoder::PixelFormat::L8 => PixelFormat::Gray8,
        jpeg_decoder::PixelFormat::RGB24 => PixelFormat::Rgb8,
        other => return Err(DecodeError::UnsupportedPixelFormat(format!("{:?}", other))),
    };

    Ok(NativePixels {
        width: u32::from(info.width),
        height: u32::from(info.height),
        format,
        data,
    })
}

fn size_mismatch(expected_width: u32, expected_height: u32, width: u32, height: u32) -> DecodeError {
    log::error!(
        "EncodedImage.DecodeImage.SizeMismatch: decoded {}x{} image, expected {}x{}",
        width,
        height,
        expected_width,
        expected_height
    );
    DecodeError::DimensionMismatch {
        expected_width,
        expected_height,
        width,
        height,
    }
}

/// Bilinear resize to `width` x `height`
fn resize(pixels: NativePixels, width: u32, height: u32) -> Result<NativePixels> {
    if pixels.width == width && pixels.height == height {
        return Ok(pixels);
    }

    let too_small = || {
        ConversionError(format!(
            "decoded buffer of {} bytes does not hold a {}x{} image",
            pixels.data.len(),
            pixels.width,
            pixels.height
        ))
    };

    let data = match pixels.format {
        PixelFormat::Gray8 => {
            let img: GrayImage = ImageBuffer::from_raw(pixels.width, pixels.height, pixels.data.clone())
                .ok_or_else(too_small)?;
            imageops::resize(&img, width, height, FilterType::Triangle).into_raw()
        }
        PixelFormat::Rgb8 => {
            let img: RgbImage = ImageBuffer::from_raw(pixels.width, pixels.height, pixels.data.clone())
                .ok_or_else(too_small)?;
            imageops::resize(&img, width, height, FilterType::Triangle).into_raw()
        }
    };

    Ok(NativePixels {
        width,
        height,
        format: pixels.format,
        data,
    })
}
