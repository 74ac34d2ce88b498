//! Image encodings carried by image chunks
//!
//! The set of encodings is closed: every consumer matches on it exhaustively so
//! adding a variant forces a decision at every call site.

use serde::{Deserialize, Serialize};

/// Encoding of the bytes accumulated for one image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageEncoding {
    /// No encoding; never valid on a live frame
    #[default]
    None,
    /// Uncompressed 8-bit gray, `width * height` bytes
    RawGray,
    /// Uncompressed interleaved RGB, `width * height * 3` bytes
    RawRgb,
    /// Packed YUV 4:2:2
    Yuyv,
    /// Semi-planar YUV 4:2:0
    Yuv420sp,
    /// Raw Bayer mosaic
    Bayer,
    /// Standard grayscale JPEG
    JpegGray,
    /// Standard color JPEG
    JpegColor,
    /// Standard color JPEG cropped horizontally by the sensor
    JpegColorHalfWidth,
    /// Vendor minimized JPEG, grayscale
    JpegMinimizedGray,
    /// Vendor minimized JPEG, color at half horizontal resolution
    JpegMinimizedColor,
}

impl ImageEncoding {
    /// All encodings, in wire-code order
    pub const ALL: [ImageEncoding; 11] = [
        Self::None,
        Self::RawGray,
        Self::RawRgb,
        Self::Yuyv,
        Self::Yuv420sp,
        Self::Bayer,
        Self::JpegGray,
        Self::JpegColor,
        Self::JpegColorHalfWidth,
        Self::JpegMinimizedGray,
        Self::JpegMinimizedColor,
    ];

    /// Whether images in this encoding carry color
    ///
    /// `None` should never reach a live frame. It is logged as an internal
    /// consistency failure and treated as gray.
    pub fn is_color(self) -> bool {
        match self {
            Self::None => {
                log::error!("EncodedImage.IsColor.UnsupportedImageEncoding: {:?}", self);
                false
            }
            Self::JpegGray | Self::JpegMinimizedGray | Self::RawGray => false,
            Self::JpegColor
            | Self::JpegMinimizedColor
            | Self::JpegColorHalfWidth
            | Self::RawRgb
            | Self::Yuyv
            | Self::Yuv420sp
            | Self::Bayer => true,
        }
    }

    /// Whether the payload is the vendor minimized JPEG format
    pub fn is_minimized(self) -> bool {
        matches!(self, Self::JpegMinimizedGray | Self::JpegMinimizedColor)
    }

    /// Stable one-byte code used in capture files
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::RawGray => 1,
            Self::RawRgb => 2,
            Self::Yuyv => 3,
            Self::Yuv420sp => 4,
            Self::Bayer => 5,
            Self::JpegGray => 6,
            Self::JpegColor => 7,
            Self::JpegColorHalfWidth => 8,
            Self::JpegMinimizedGray => 9,
            Self::JpegMinimizedColor => 10,
        }
    }

    /// Inverse of [`ImageEncoding::code`]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// Determine the effective encoding of a new image from its first chunk
///
/// Firmware cannot send a distinct encoding for minimized color frames, so a
/// minimized-gray image whose first payload byte is nonzero is really color.
/// This is the only place that quirk is interpreted.
pub fn classify_first_chunk(declared: ImageEncoding, first_payload: &[u8]) -> ImageEncoding {
    match (declared, first_payload.first()) {
        (ImageEncoding::JpegMinimizedGray, Some(&flag)) if flag != 0 => {
            ImageEncoding::JpegMinimizedColor
        }
        _ => declared,
    }
}
