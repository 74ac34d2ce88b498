//! Writing completed images to disk
//!
//! Standard encodings are written verbatim. Minimized gray frames are written
//! as their repaired JPEG; minimized color frames are decoded to full width and
//! re-encoded, since the repaired stream is only half width.

use std::fs;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, RgbImage};
use thiserror::Error;

use crate::config::AssemblerConfig;
use crate::decode::{decode_with_config, DecodeError, PixelFormat};
use crate::encoding::ImageEncoding;
use crate::frame_assembler::EncodedImage;
use crate::mini_jpeg::{mini_gray_to_jpeg, RepairError};

/// Errors that can occur while saving an image
#[derive(Error, Debug)]
pub enum SaveError {
    /// Decoding for re-encode failed.
    #[error("failed to decode image: {0}")]
    Decode(#[from] DecodeError),

    /// Minimized stream repair failed.
    #[error("failed to repair minimized JPEG: {0}")]
    Repair(#[from] RepairError),

    /// JPEG re-encoding failed.
    #[error("failed to encode JPEG: {0}")]
    Encode(#[from] image::ImageError),

    /// Writing the output file failed.
    #[error("failed to write file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Result type for saving
pub type Result<T> = std::result::Result<T, SaveError>;

impl EncodedImage {
    /// Save this image with the default configuration
    ///
    /// # Errors
    ///
    /// See [`save`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save(self, path)
    }
}

/// Write the image to `path`
///
/// # Errors
///
/// Returns `SaveError` if the image cannot be repaired, decoded or encoded,
/// or if the file cannot be written. A failed write may leave a partial file.
pub fn save(image: &EncodedImage, path: impl AsRef<Path>) -> Result<()> {
    save_with_config(image, path, &AssemblerConfig::default())
}

/// Write the image to `path` using `config` for the re-encode quality
///
/// # Errors
///
/// See [`save`].
pub fn save_with_config(
    image: &EncodedImage,
    path: impl AsRef<Path>,
    config: &AssemblerConfig,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = encoded_bytes(image, config)?;

    fs::write(path, &bytes).inspect_err(|e| {
        log::error!(
            "EncodedImage.Save.WriteFailed: could not write {}: {}",
            path.display(),
            e
        );
    })?;

    log::debug!(
        "Saved {:?} image to {} ({} bytes)",
        image.encoding(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Bytes that `save` would write for `image`
///
/// # Errors
///
/// See [`save`].
pub fn encoded_bytes(image: &EncodedImage, config: &AssemblerConfig) -> Result<Vec<u8>> {
    match image.encoding() {
        ImageEncoding::JpegMinimizedGray => {
            Ok(mini_gray_to_jpeg(image.buffer(), image.height(), image.width())?)
        }
        ImageEncoding::JpegMinimizedColor => {
            let decoded = decode_with_config(image, PixelFormat::Rgb8, config)?;
            let img: RgbImage = ImageBuffer::from_raw(decoded.width, decoded.height, decoded.data)
                .ok_or_else(|| {
                    image::ImageError::Parameter(image::error::ParameterError::from_kind(
                        image::error::ParameterErrorKind::DimensionMismatch,
                    ))
                })?;

            let mut jpeg = Vec::new();
            JpegEncoder::new_with_quality(&mut jpeg, config.save_quality).encode_image(&img)?;
            Ok(jpeg)
        }
        ImageEncoding::None
        | ImageEncoding::RawGray
        | ImageEncoding::RawRgb
        | ImageEncoding::Yuyv
        | ImageEncoding::Yuv420sp
        | ImageEncoding::Bayer
        | ImageEncoding::JpegGray
        | ImageEncoding::JpegColor
        | ImageEncoding::JpegColorHalfWidth => Ok(image.buffer().to_vec()),
    }
}
