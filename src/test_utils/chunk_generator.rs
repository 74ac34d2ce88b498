//! Synthetic chunk generation for testing
//!
//! Generates image chunk streams with known payloads for every encoding the
//! decoder supports, including minimized JPEG payloads in the firmware layout.
//!
//! # Example
//!
//! ```rust,ignore
//! use encoded_image_lib::test_utils::{ChunkGenerator, Rgb};
//!
//! let mut gen = ChunkGenerator::default();
//!
//! // Chunks for a solid red standard JPEG
//! let chunks = gen.jpeg_color_image(64, 48, Rgb::RED)?;
//!
//! // Chunks for a minimized gray frame
//! let chunks = gen.minimized_gray_image(64, 48);
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, ImageBuffer, ImageResult, RgbImage};

use crate::chunk::{ImageChunk, MAX_CHUNK_SIZE};
use crate::encoding::ImageEncoding;

/// RGB color for test patterns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    /// Red component (0-255)
    pub r: u8,
    /// Green component (0-255)
    pub g: u8,
    /// Blue component (0-255)
    pub b: u8,
}

impl Rgb {
    /// Pure red
    pub const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    /// Pure green
    pub const GREEN: Rgb = Rgb { r: 0, g: 255, b: 0 };
    /// Pure blue
    pub const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };
    /// White
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
    /// Black
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    /// Mid-gray
    pub const GRAY: Rgb = Rgb {
        r: 128,
        g: 128,
        b: 128,
    };

    fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Trailing `0xFF` bytes the firmware leaves after the entropy data
pub const FIRMWARE_PADDING: usize = 3;

/// Bits for one 8x8 block with DC delta 0 and no AC coefficients
///
/// Under the standard luminance Huffman tables DC category 0 is `00` and
/// end-of-block is `1010`.
const FLAT_BLOCK_BITS: [bool; 6] = [false, false, true, false, true, false];

/// Entropy-coded data for `blocks` flat mid-gray blocks, padded with 1 bits
pub fn mid_gray_entropy(blocks: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(blocks * FLAT_BLOCK_BITS.len() / 8 + 1);
    let mut current = 0u8;
    let mut filled = 0;

    for bit in std::iter::repeat(FLAT_BLOCK_BITS).take(blocks).flatten() {
        current = (current << 1) | u8::from(bit);
        filled += 1;
        if filled == 8 {
            bytes.push(current);
            current = 0;
            filled = 0;
        }
    }

    if filled > 0 {
        let pad = 8 - filled;
        bytes.push((current << pad) | ((1u8 << pad) - 1));
    }

    bytes
}

/// Minimized gray payload: quality byte, entropy data, firmware padding
///
/// `quality` is 0 (legacy), 50 or 80; the decoded image is flat mid-gray.
pub fn minimized_gray_payload(width: u16, height: u16, quality: u8) -> Vec<u8> {
    let blocks = (width as usize).div_ceil(8) * (height as usize).div_ceil(8);
    let mut payload = vec![quality];
    payload.extend(mid_gray_entropy(blocks));
    payload.extend(std::iter::repeat(0xFF).take(FIRMWARE_PADDING));
    payload
}

/// Minimized color payload for a frame declared `width` pixels wide
///
/// The entropy data covers the half-width image with 2x1 luma subsampling,
/// four blocks per 16x8 MCU. The first byte is the nonzero color flag.
pub fn minimized_color_payload(width: u16, height: u16) -> Vec<u8> {
    let half_width = (width / 2) as usize;
    let mcus = half_width.div_ceil(16) * (height as usize).div_ceil(8);
    let mut payload = vec![1u8];
    payload.extend(mid_gray_entropy(mcus * 4));
    payload.extend(std::iter::repeat(0xFF).take(FIRMWARE_PADDING));
    payload
}

/// Encode interleaved RGB pixels as a standard JPEG
///
/// # Errors
///
/// Returns an error if the buffer does not match the dimensions or encoding fails.
pub fn encode_rgb_jpeg(width: u32, height: u32, pixels: Vec<u8>, quality: u8) -> ImageResult<Vec<u8>> {
    let img: RgbImage = ImageBuffer::from_raw(width, height, pixels).ok_or_else(size_error)?;
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(&img)?;
    Ok(jpeg)
}

/// Encode 8-bit gray pixels as a standard grayscale JPEG
///
/// # Errors
///
/// Returns an error if the buffer does not match the dimensions or encoding fails.
pub fn encode_gray_jpeg(width: u32, height: u32, pixels: Vec<u8>, quality: u8) -> ImageResult<Vec<u8>> {
    let img: GrayImage = ImageBuffer::from_raw(width, height, pixels).ok_or_else(size_error)?;
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(&img)?;
    Ok(jpeg)
}

fn size_error() -> image::ImageError {
    image::ImageError::Parameter(image::error::ParameterError::from_kind(
        image::error::ParameterErrorKind::DimensionMismatch,
    ))
}

/// Generates synthetic image chunk streams for testing
pub struct ChunkGenerator {
    /// Maximum payload size per chunk
    pub max_chunk_size: usize,
    /// Id assigned to the next generated image
    next_image_id: u32,
    /// Timestamp assigned to the next generated image
    next_timestamp: u64,
    /// Timestamp increment between images
    pub timestamp_step: u64,
}

impl Default for ChunkGenerator {
    fn default() -> Self {
        Self::new(MAX_CHUNK_SIZE)
    }
}

impl ChunkGenerator {
    /// Create a generator splitting payloads into chunks of `max_chunk_size`
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
            next_image_id: 1,
            next_timestamp: 1000,
            timestamp_step: 33,
        }
    }

    /// Split `payload` into chunks of one new image
    ///
    /// Each call assigns the next image id and timestamp. An empty payload
    /// still yields a single empty chunk.
    pub fn chunk_payload(
        &mut self,
        payload: &[u8],
        width: u16,
        height: u16,
        encoding: ImageEncoding,
    ) -> Vec<ImageChunk> {
        let image_id = self.next_image_id;
        let timestamp = self.next_timestamp;
        self.next_image_id = self.next_image_id.wrapping_add(1);
        self.next_timestamp += self.timestamp_step;

        let pieces: Vec<&[u8]> = if payload.is_empty() {
            vec![payload]
        } else {
            payload.chunks(self.max_chunk_size).collect()
        };
        let chunk_count = pieces.len() as u16;

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, data)| ImageChunk {
                image_id,
                chunk_id: i as u16,
                chunk_count,
                width,
                height,
                encoding,
                frame_timestamp: timestamp,
                data: data.to_vec(),
            })
            .collect()
    }

    /// Raw gray frame filled with `value`
    pub fn raw_gray_image(&mut self, width: u16, height: u16, value: u8) -> Vec<ImageChunk> {
        let pixels = vec![value; width as usize * height as usize];
        self.chunk_payload(&pixels, width, height, ImageEncoding::RawGray)
    }

    /// Raw gray horizontal gradient, black on the left to white on the right
    pub fn raw_gray_gradient(&mut self, width: u16, height: u16) -> Vec<ImageChunk> {
        let pixels = gradient(width, height);
        self.chunk_payload(&pixels, width, height, ImageEncoding::RawGray)
    }

    /// Raw RGB frame filled with `color`
    pub fn raw_rgb_image(&mut self, width: u16, height: u16, color: Rgb) -> Vec<ImageChunk> {
        let pixels = solid_rgb(width, height, color);
        self.chunk_payload(&pixels, width, height, ImageEncoding::RawRgb)
    }

    /// Standard color JPEG filled with `color`
    ///
    /// # Errors
    ///
    /// Returns an error if JPEG encoding fails.
    pub fn jpeg_color_image(&mut self, width: u16, height: u16, color: Rgb) -> ImageResult<Vec<ImageChunk>> {
        let jpeg = encode_rgb_jpeg(width.into(), height.into(), solid_rgb(width, height, color), 90)?;
        Ok(self.chunk_payload(&jpeg, width, height, ImageEncoding::JpegColor))
    }

    /// Standard grayscale JPEG of a horizontal gradient
    ///
    /// # Errors
    ///
    /// Returns an error if JPEG encoding fails.
    pub fn jpeg_gray_image(&mut self, width: u16, height: u16) -> ImageResult<Vec<ImageChunk>> {
        let jpeg = encode_gray_jpeg(width.into(), height.into(), gradient(width, height), 90)?;
        Ok(self.chunk_payload(&jpeg, width, height, ImageEncoding::JpegGray))
    }

    /// Half-width color JPEG, declared `padding` pixels wider on each side
    ///
    /// # Errors
    ///
    /// Returns an error if JPEG encoding fails.
    pub fn jpeg_half_width_image(
        &mut self,
        encoded_width: u16,
        height: u16,
        padding: u16,
        color: Rgb,
    ) -> ImageResult<Vec<ImageChunk>> {
        let jpeg = encode_rgb_jpeg(
            encoded_width.into(),
            height.into(),
            solid_rgb(encoded_width, height, color),
            90,
        )?;
        let declared_width = encoded_width + 2 * padding;
        Ok(self.chunk_payload(&jpeg, declared_width, height, ImageEncoding::JpegColorHalfWidth))
    }

    /// Minimized gray frame decoding to flat mid-gray
    ///
    /// Uses the legacy zero quality byte; any other value would read as the
    /// color flag.
    pub fn minimized_gray_image(&mut self, width: u16, height: u16) -> Vec<ImageChunk> {
        let payload = minimized_gray_payload(width, height, 0);
        self.chunk_payload(&payload, width, height, ImageEncoding::JpegMinimizedGray)
    }

    /// Minimized color frame decoding to flat mid-gray
    ///
    /// Declared as minimized gray, the way the firmware sends it; the color
    /// flag in the first byte marks it as color.
    pub fn minimized_color_image(&mut self, width: u16, height: u16) -> Vec<ImageChunk> {
        let payload = minimized_color_payload(width, height);
        self.chunk_payload(&payload, width, height, ImageEncoding::JpegMinimizedGray)
    }
}

fn solid_rgb(width: u16, height: u16, color: Rgb) -> Vec<u8> {
    let pixel = color.to_array();
    std::iter::repeat(pixel)
        .take(width as usize * height as usize)
        .flatten()
        .collect()
}

fn gradient(width: u16, height: u16) -> Vec<u8> {
    let row: Vec<u8> = (0..width as u32)
        .map(|x| (x * 255 / (width.max(2) as u32 - 1)) as u8)
        .collect();
    std::iter::repeat(row).take(height as usize).flatten().collect()
}

/// Check that every pixel of an interleaved RGB buffer is within `tolerance` of `color`
pub fn rgb_matches(pixels: &[u8], color: Rgb, tolerance: u8) -> bool {
    let target = color.to_array();
    pixels.chunks_exact(3).all(|px| {
        px.iter()
            .zip(target)
            .all(|(&a, b)| a.abs_diff(b) <= tolerance)
    })
}
