//! Image chunk records delivered by the transport

use crate::encoding::ImageEncoding;

/// Default maximum payload size of a single image chunk in bytes
pub const MAX_CHUNK_SIZE: usize = 1200;

/// One fragment of an encoded image
///
/// Chunks are produced by the transport already deserialized. The assembler only
/// reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageChunk {
    /// Identifies the logical image this chunk belongs to
    pub image_id: u32,
    /// Zero-based sequence number within the image
    pub chunk_id: u16,
    /// Total number of chunks the image is split into
    pub chunk_count: u16,
    /// Image width in pixels
    pub width: u16,
    /// Image height in pixels
    pub height: u16,
    /// Declared encoding of the image
    pub encoding: ImageEncoding,
    /// Capture time of the frame, in milliseconds
    pub frame_timestamp: u64,
    /// Payload bytes
    pub data: Vec<u8>,
}

impl ImageChunk {
    /// Whether this is the final chunk of its image
    pub fn is_last(&self) -> bool {
        self.chunk_count > 0 && self.chunk_id == self.chunk_count - 1
    }
}
