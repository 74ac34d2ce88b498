//! Image assembly from transport chunks
//!
//! An [`EncodedImage`] is created once and reused across many images. Each chunk
//! either continues the current image or, when its image id differs, starts a
//! new one. Loss and reordering are detected but never repaired: a damaged
//! image is marked invalid and the caller waits for the next one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use encoded_image_lib::frame_assembler::EncodedImage;
//!
//! let mut image = EncodedImage::new();
//!
//! for chunk in chunks {
//!     if image.add_chunk(&chunk) {
//!         // Complete, valid image received
//!         let decoded = image.decode(PixelFormat::Rgb8)?;
//!     }
//! }
//! ```

use thiserror::Error;

use crate::chunk::{ImageChunk, MAX_CHUNK_SIZE};
use crate::config::AssemblerConfig;
use crate::encoding::{classify_first_chunk, ImageEncoding};

/// Assembly progress of the current image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyState {
    /// No chunk received yet
    #[default]
    Empty,
    /// Valid so far, last chunk not yet received
    Accumulating,
    /// All chunks received in order with a monotonic timestamp
    Complete,
    /// Loss, reordering or a timestamp regression was detected
    Invalid,
}

/// Why a chunk was rejected before touching any state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRejection {
    /// Payload exceeds the maximum chunk size.
    #[error("chunk payload of {size} bytes exceeds maximum of {max}")]
    ChunkTooLarge {
        /// Payload size in bytes
        size: usize,
        /// Configured maximum
        max: usize,
    },
}

/// Why the current image is invalid
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The first chunk seen for the image was not chunk 0.
    #[error("image started at chunk {0} instead of 0")]
    MissingFirstChunk(u16),

    /// A chunk arrived with an unexpected sequence number.
    #[error("expected chunk {expected}, got chunk {got}")]
    OutOfOrder {
        /// Next chunk id that was expected
        expected: u16,
        /// Chunk id that arrived
        got: u16,
    },

    /// The last chunk arrived but the number received differs from the declared count.
    #[error("expected {expected} chunks but received {received}")]
    ChunkCountMismatch {
        /// Declared chunk count
        expected: u16,
        /// Chunks actually received
        received: u16,
    },

    /// The completed image is older than the previous one.
    #[error("timestamp {current} is less than previous timestamp {previous}")]
    TimestampNotIncreasing {
        /// Timestamp of the image just completed
        current: u64,
        /// Timestamp of the image completed before it
        previous: u64,
    },

    /// The image was invalidated by an earlier chunk.
    #[error("image was already invalidated")]
    PreviouslyInvalidated,
}

/// Result of processing a single chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Chunk appended, image not complete yet
    Accumulating,
    /// Chunk appended and the image is complete and valid
    Complete,
    /// Chunk dropped without modifying any state
    Rejected(ChunkRejection),
    /// Chunk dropped because the image is invalid
    Invalid(InvalidReason),
}

impl ChunkOutcome {
    /// Whether a complete, valid image is ready for decoding
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// An image reassembled from chunks, plus its metadata
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Accumulated payload of the current image
    buffer: Vec<u8>,
    /// Image id of the current image; `None` until the first chunk
    image_id: Option<u32>,
    /// Image width in pixels
    width: u16,
    /// Image height in pixels
    height: u16,
    /// Effective encoding of the current image
    encoding: ImageEncoding,
    /// Next chunk id expected
    expected_chunk_id: u16,
    /// Chunks counted toward the current image
    chunks_received: u16,
    /// Assembly progress
    state: AssemblyState,
    /// Timestamp of the most recently completed image
    timestamp: u64,
    /// Timestamp of the image completed before that
    prev_timestamp: u64,
    /// Maximum accepted payload size
    max_chunk_size: usize,
}

impl Default for EncodedImage {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodedImage {
    /// Create an empty image accepting chunks up to [`MAX_CHUNK_SIZE`]
    pub fn new() -> Self {
        Self::with_max_chunk_size(MAX_CHUNK_SIZE)
    }

    /// Create an empty image using the chunk limit from `config`
    pub fn with_config(config: &AssemblerConfig) -> Self {
        Self::with_max_chunk_size(config.max_chunk_size)
    }

    /// Create an empty image with a custom maximum chunk size
    pub fn with_max_chunk_size(max_chunk_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            image_id: None,
            width: 0,
            height: 0,
            encoding: ImageEncoding::None,
            expected_chunk_id: 0,
            chunks_received: 0,
            state: AssemblyState::Empty,
            timestamp: 0,
            prev_timestamp: 0,
            max_chunk_size,
        }
    }

    /// Wrap already-decoded gray pixels as a `RawGray` image
    ///
    /// The image is complete if `pixels` is non-empty.
    pub fn from_gray(width: u16, height: u16, pixels: &[u8], timestamp: u64, image_id: u32) -> Self {
        Self::from_raw(ImageEncoding::RawGray, width, height, pixels, timestamp, image_id)
    }

    /// Wrap already-decoded interleaved RGB pixels as a `RawRgb` image
    ///
    /// The image is complete if `pixels` is non-empty.
    pub fn from_rgb(width: u16, height: u16, pixels: &[u8], timestamp: u64, image_id: u32) -> Self {
        Self::from_raw(ImageEncoding::RawRgb, width, height, pixels, timestamp, image_id)
    }

    fn from_raw(
        encoding: ImageEncoding,
        width: u16,
        height: u16,
        pixels: &[u8],
        timestamp: u64,
        image_id: u32,
    ) -> Self {
        let mut image = Self::new();
        image.buffer = pixels.to_vec();
        image.image_id = Some(image_id);
        image.width = width;
        image.height = height;
        image.encoding = encoding;
        image.timestamp = timestamp;
        image.state = if pixels.is_empty() {
            AssemblyState::Invalid
        } else {
            AssemblyState::Complete
        };
        image
    }

    /// Accumulated payload bytes
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Id of the image currently being assembled
    pub fn image_id(&self) -> Option<u32> {
        self.image_id
    }

    /// Width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Effective encoding after the first-chunk classification
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    /// Timestamp of the most recently completed image
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Timestamp of the image completed before the current one
    pub fn prev_timestamp(&self) -> u64 {
        self.prev_timestamp
    }

    /// Current assembly state
    pub fn state(&self) -> AssemblyState {
        self.state
    }

    /// Whether no corruption has been detected for the current image
    pub fn is_valid(&self) -> bool {
        matches!(
            self.state,
            AssemblyState::Accumulating | AssemblyState::Complete
        )
    }

    /// Whether the current image carries color
    pub fn is_color(&self) -> bool {
        self.encoding.is_color()
    }

    /// Chunks counted toward the current image
    pub fn chunks_received(&self) -> u16 {
        self.chunks_received
    }

    /// Next chunk id expected
    pub fn expected_chunk_id(&self) -> u16 {
        self.expected_chunk_id
    }

    /// Maximum accepted payload size
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Add a chunk, returning `true` once a complete, valid image is ready
    ///
    /// Returns `false` for oversize chunks, for chunks of an invalid image
    /// (including its last chunk, which is logged at info level and otherwise
    /// dropped), and for any chunk that is not the last one.
    pub fn add_chunk(&mut self, chunk: &ImageChunk) -> bool {
        self.process_chunk(chunk).is_complete()
    }

    /// Add a chunk and report in detail what happened to it
    pub fn process_chunk(&mut self, chunk: &ImageChunk) -> ChunkOutcome {
        if chunk.data.len() > self.max_chunk_size {
            log::warn!(
                "EncodedImage.AddChunk.ChunkTooBig: expecting chunks of size no more than {}, got {}",
                self.max_chunk_size,
                chunk.data.len()
            );
            return ChunkOutcome::Rejected(ChunkRejection::ChunkTooLarge {
                size: chunk.data.len(),
                max: self.max_chunk_size,
            });
        }

        let mut invalid_reason = None;

        if self.image_id != Some(chunk.image_id) {
            if let Err(reason) = self.start_new_image(chunk) {
                invalid_reason = Some(reason);
            }
        }

        if chunk.chunk_id != self.expected_chunk_id {
            log::warn!(
                "EncodedImage.AddChunk.ChunkOutOfOrder: expected chunk {}, got chunk {}",
                self.expected_chunk_id,
                chunk.chunk_id
            );
            self.invalidate(&mut invalid_reason, InvalidReason::OutOfOrder {
                expected: self.expected_chunk_id,
                got: chunk.chunk_id,
            });
        }

        self.expected_chunk_id = chunk.chunk_id.wrapping_add(1);
        self.chunks_received = self.chunks_received.saturating_add(1);

        let is_last = chunk.is_last();
        if is_last {
            if self.chunks_received != chunk.chunk_count {
                log::warn!(
                    "EncodedImage.AddChunk.UnexpectedNumberOfChunks: got last chunk, expected {} chunks but received {}",
                    chunk.chunk_count,
                    self.chunks_received
                );
                self.invalidate(&mut invalid_reason, InvalidReason::ChunkCountMismatch {
                    expected: chunk.chunk_count,
                    received: self.chunks_received,
                });
            } else {
                self.prev_timestamp = self.timestamp;
                self.timestamp = chunk.frame_timestamp;

                if self.prev_timestamp > self.timestamp {
                    log::warn!(
                        "EncodedImage.AddChunk.TimestampNotIncreasing: current timestamp {} is less than previous timestamp {}",
                        self.timestamp,
                        self.prev_timestamp
                    );
                    self.invalidate(&mut invalid_reason, InvalidReason::TimestampNotIncreasing {
                        current: self.timestamp,
                        previous: self.prev_timestamp,
                    });
                }
            }
        }

        if self.state == AssemblyState::Invalid {
            if is_last {
                log::info!("EncodedImage.AddChunk.IncompleteImage: received last chunk of invalidated image");
            }
            return ChunkOutcome::Invalid(
                invalid_reason.unwrap_or(InvalidReason::PreviouslyInvalidated),
            );
        }

        // Chunks are delivered in order once validity checks pass
        self.buffer.extend_from_slice(&chunk.data);

        if is_last {
            self.state = AssemblyState::Complete;
            log::debug!(
                "Complete {:?} image {}: {} bytes in {} chunks",
                self.encoding,
                chunk.image_id,
                self.buffer.len(),
                self.chunks_received
            );
            ChunkOutcome::Complete
        } else {
            self.state = AssemblyState::Accumulating;
            ChunkOutcome::Accumulating
        }
    }

    /// Reset all per-image state from the first chunk of a new image
    ///
    /// Timestamps survive the reset; they track completed images across ids.
    pub fn start_new_image(&mut self, chunk: &ImageChunk) -> Result<(), InvalidReason> {
        self.image_id = Some(chunk.image_id);
        self.width = chunk.width;
        self.height = chunk.height;
        self.encoding = classify_first_chunk(chunk.encoding, &chunk.data);
        self.expected_chunk_id = 0;
        self.chunks_received = 0;
        self.buffer.clear();

        let pixels = chunk.width as usize * chunk.height as usize;
        let capacity = if chunk.encoding == ImageEncoding::JpegGray {
            pixels
        } else {
            pixels * 3
        };
        self.buffer.reserve(capacity);

        if chunk.chunk_id == 0 {
            self.state = AssemblyState::Accumulating;
            Ok(())
        } else {
            self.state = AssemblyState::Invalid;
            Err(InvalidReason::MissingFirstChunk(chunk.chunk_id))
        }
    }

    /// Mark the image invalid, keeping the first reason seen for this chunk
    fn invalidate(&mut self, reason: &mut Option<InvalidReason>, new_reason: InvalidReason) {
        self.state = AssemblyState::Invalid;
        reason.get_or_insert(new_reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(image_id: u32, chunk_id: u16, chunk_count: u16, data: &[u8]) -> ImageChunk {
        ImageChunk {
            image_id,
            chunk_id,
            chunk_count,
            width: 4,
            height: 2,
            encoding: ImageEncoding::JpegColor,
            frame_timestamp: 100,
            data: data.to_vec(),
        }
    }

    fn with_timestamp(mut chunk: ImageChunk, timestamp: u64) -> ImageChunk {
        chunk.frame_timestamp = timestamp;
        chunk
    }

    /// Image that has already completed one frame at `timestamp`
    fn image_with_previous(timestamp: u64) -> EncodedImage {
        let mut image = EncodedImage::new();
        assert!(image.add_chunk(&with_timestamp(chunk(1, 0, 1, b"x"), timestamp)));
        image
    }

    #[test]
    fn test_new_image_is_empty() {
        let image = EncodedImage::new();
        assert_eq!(image.state(), AssemblyState::Empty);
        assert!(!image.is_valid());
        assert!(image.buffer().is_empty());
        assert_eq!(image.image_id(), None);
        assert_eq!(image.encoding(), ImageEncoding::None);
        assert_eq!(image.max_chunk_size(), MAX_CHUNK_SIZE);

        let config = AssemblerConfig {
            max_chunk_size: 64,
            ..AssemblerConfig::default()
        };
        assert_eq!(EncodedImage::with_config(&config).max_chunk_size(), 64);
    }

    #[test]
    fn test_in_order_chunks_complete() {
        let mut image = image_with_previous(50);

        assert!(!image.add_chunk(&chunk(7, 0, 3, b"aa")));
        assert!(!image.add_chunk(&chunk(7, 1, 3, b"bb")));
        assert!(image.add_chunk(&chunk(7, 2, 3, b"cc")));

        assert!(image.is_valid());
        assert_eq!(image.state(), AssemblyState::Complete);
        assert_eq!(image.buffer(), b"aabbcc");
        assert_eq!(image.timestamp(), 100);
        assert_eq!(image.prev_timestamp(), 50);
        assert_eq!(image.chunks_received(), 3);
        assert_eq!(image.expected_chunk_id(), 3);
    }

    #[test]
    fn test_skipped_chunk_invalidates_image() {
        let mut image = image_with_previous(50);

        assert!(!image.add_chunk(&chunk(7, 0, 3, b"aa")));
        let outcome = image.process_chunk(&chunk(7, 2, 3, b"cc"));
        assert_eq!(
            outcome,
            ChunkOutcome::Invalid(InvalidReason::OutOfOrder {
                expected: 1,
                got: 2
            })
        );
        assert!(!image.is_valid());

        // A late chunk 1 does not restore validity
        let outcome = image.process_chunk(&chunk(7, 1, 3, b"bb"));
        assert!(!outcome.is_complete());
        assert!(!image.is_valid());
        assert_eq!(image.buffer(), b"aa");
    }

    #[test]
    fn test_image_not_starting_at_zero_is_invalid() {
        let mut image = EncodedImage::new();
        let outcome = image.process_chunk(&chunk(3, 1, 3, b"bb"));
        assert_eq!(
            outcome,
            ChunkOutcome::Invalid(InvalidReason::MissingFirstChunk(1))
        );
        assert!(!image.add_chunk(&chunk(3, 2, 3, b"cc")));
        assert_eq!(image.state(), AssemblyState::Invalid);
        assert!(image.buffer().is_empty());
    }

    #[test]
    fn test_chunk_count_mismatch() {
        let mut image = EncodedImage::new();
        assert!(!image.add_chunk(&chunk(1, 0, 4, b"aa")));
        assert!(!image.add_chunk(&chunk(1, 2, 4, b"cc")));

        // Chunk 3 follows chunk 2 in sequence, but only three chunks arrived
        let outcome = image.process_chunk(&chunk(1, 3, 4, b"dd"));
        assert_eq!(
            outcome,
            ChunkOutcome::Invalid(InvalidReason::ChunkCountMismatch {
                expected: 4,
                received: 3
            })
        );
        assert!(!image.is_valid());
    }

    #[test]
    fn test_timestamp_regression_invalidates() {
        let mut image = image_with_previous(200);
        let outcome = image.process_chunk(&with_timestamp(chunk(2, 0, 1, b"a"), 150));
        assert_eq!(
            outcome,
            ChunkOutcome::Invalid(InvalidReason::TimestampNotIncreasing {
                current: 150,
                previous: 200
            })
        );
        assert!(!image.is_valid());
        assert!(image.buffer().is_empty());
        // Timestamps still shift so the next image compares against this one
        assert_eq!(image.timestamp(), 150);
        assert_eq!(image.prev_timestamp(), 200);
    }

    #[test]
    fn test_equal_timestamp_is_accepted() {
        let mut image = image_with_previous(100);
        assert!(image.add_chunk(&with_timestamp(chunk(2, 0, 1, b"a"), 100)));
    }

    #[test]
    fn test_oversize_chunk_rejected_without_mutation() {
        let mut image = EncodedImage::with_max_chunk_size(4);
        assert!(!image.add_chunk(&chunk(1, 0, 2, b"ab")));

        let before = image.clone();
        let outcome = image.process_chunk(&chunk(9, 0, 1, b"too long"));
        assert_eq!(
            outcome,
            ChunkOutcome::Rejected(ChunkRejection::ChunkTooLarge { size: 8, max: 4 })
        );
        assert_eq!(image.image_id(), before.image_id());
        assert_eq!(image.buffer(), before.buffer());
        assert_eq!(image.state(), before.state());
        assert_eq!(image.expected_chunk_id(), before.expected_chunk_id());
    }

    #[test]
    fn test_chunk_at_size_limit_accepted() {
        let mut image = EncodedImage::with_max_chunk_size(4);
        assert_eq!(
            image.process_chunk(&chunk(1, 0, 2, b"abcd")),
            ChunkOutcome::Accumulating
        );
        assert_eq!(image.process_chunk(&chunk(1, 1, 2, b"efgh")), ChunkOutcome::Complete);
        assert_eq!(image.buffer(), b"abcdefgh");
    }

    #[test]
    fn test_new_image_id_resets_state() {
        let mut image = EncodedImage::new();
        assert!(!image.add_chunk(&chunk(1, 0, 3, b"aa")));
        assert!(!image.add_chunk(&chunk(1, 2, 3, b"cc")));
        assert!(!image.is_valid());

        assert!(image.add_chunk(&chunk(2, 0, 1, b"zz")));
        assert!(image.is_valid());
        assert_eq!(image.buffer(), b"zz");
        assert_eq!(image.image_id(), Some(2));
    }

    #[test]
    fn test_minimized_gray_upgrade_to_color() {
        let mut image = EncodedImage::new();
        let first = ImageChunk {
            encoding: ImageEncoding::JpegMinimizedGray,
            ..chunk(1, 0, 2, &[1, 0x10])
        };
        image.add_chunk(&first);
        assert_eq!(image.encoding(), ImageEncoding::JpegMinimizedColor);
        assert!(image.is_color());

        // Only the first chunk is classified
        let second = ImageChunk {
            encoding: ImageEncoding::JpegMinimizedGray,
            ..chunk(1, 1, 2, &[0, 0x10])
        };
        image.add_chunk(&second);
        assert_eq!(image.encoding(), ImageEncoding::JpegMinimizedColor);

        let gray = ImageChunk {
            encoding: ImageEncoding::JpegMinimizedGray,
            ..chunk(2, 0, 1, &[0, 0x10])
        };
        image.add_chunk(&gray);
        assert_eq!(image.encoding(), ImageEncoding::JpegMinimizedGray);
        assert!(!image.is_color());
    }

    #[test]
    fn test_zero_chunk_count_never_completes() {
        let mut image = EncodedImage::new();
        assert_eq!(
            image.process_chunk(&chunk(1, 0, 0, b"aa")),
            ChunkOutcome::Accumulating
        );
        assert_eq!(image.buffer(), b"aa");
    }

    #[test]
    fn test_from_gray_and_rgb() {
        let gray = EncodedImage::from_gray(2, 2, &[1, 2, 3, 4], 10, 5);
        assert_eq!(gray.encoding(), ImageEncoding::RawGray);
        assert_eq!(gray.state(), AssemblyState::Complete);
        assert_eq!(gray.timestamp(), 10);
        assert_eq!(gray.image_id(), Some(5));

        let rgb = EncodedImage::from_rgb(1, 1, &[9, 8, 7], 11, 6);
        assert_eq!(rgb.encoding(), ImageEncoding::RawRgb);
        assert!(rgb.is_color());
        assert_eq!(rgb.buffer(), &[9, 8, 7]);

        let empty = EncodedImage::from_gray(0, 0, &[], 0, 1);
        assert!(!empty.is_valid());
    }

    #[test]
    fn test_start_new_image_reserves_capacity() {
        let mut image = EncodedImage::new();
        let first = ImageChunk {
            width: 32,
            height: 16,
            encoding: ImageEncoding::JpegGray,
            ..chunk(1, 0, 4, b"a")
        };
        image.start_new_image(&first).unwrap();
        assert!(image.buffer.capacity() >= 32 * 16);

        let first = ImageChunk {
            width: 32,
            height: 16,
            encoding: ImageEncoding::RawRgb,
            ..chunk(2, 0, 4, b"a")
        };
        image.start_new_image(&first).unwrap();
        assert!(image.buffer.capacity() >= 32 * 16 * 3);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_chunk() -> impl Strategy<Value = ImageChunk> {
            (
                0u32..4,
                0u16..6,
                0u16..6,
                0u64..1000,
                prop::collection::vec(any::<u8>(), 0..16),
            )
                .prop_map(|(image_id, chunk_id, chunk_count, ts, data)| ImageChunk {
                    image_id,
                    chunk_id,
                    chunk_count,
                    width: 8,
                    height: 8,
                    encoding: ImageEncoding::JpegGray,
                    frame_timestamp: ts,
                    data,
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            /// A chunk with a new image id resets the image to the same state a
            /// fresh assembler would reach, apart from the timestamp history.
            #[test]
            fn prop_new_image_resets_state(
                history in prop::collection::vec(arb_chunk(), 0..20),
                mut first in arb_chunk(),
            ) {
                let mut image = EncodedImage::new();
                for c in &history {
                    image.process_chunk(c);
                }
                first.image_id = 100;
                first.chunk_count = first.chunk_count.max(2);
                first.chunk_id = 0;

                let mut fresh = EncodedImage::new();
                let outcome = image.process_chunk(&first);
                let fresh_outcome = fresh.process_chunk(&first);

                prop_assert_eq!(outcome, fresh_outcome);
                prop_assert_eq!(image.buffer(), fresh.buffer());
                prop_assert_eq!(image.state(), fresh.state());
                prop_assert_eq!(image.encoding(), fresh.encoding());
                prop_assert_eq!(image.expected_chunk_id(), fresh.expected_chunk_id());
                prop_assert_eq!(image.chunks_received(), fresh.chunks_received());
                prop_assert_eq!(image.width(), fresh.width());
                prop_assert_eq!(image.height(), fresh.height());
            }

            /// `add_chunk` returns true exactly when the chunk is the last one and
            /// the image remains valid.
            #[test]
            fn prop_completion_signal(chunks in prop::collection::vec(arb_chunk(), 1..30)) {
                let mut image = EncodedImage::new();
                for c in &chunks {
                    let complete = image.add_chunk(c);
                    prop_assert_eq!(complete, c.is_last() && image.is_valid());
                }
            }

            /// In-order chunks with a monotonic final timestamp concatenate their
            /// payloads into a valid image.
            #[test]
            fn prop_in_order_concatenation(
                payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 1..10),
                ts in 1u64..10_000,
            ) {
                let mut image = EncodedImage::new();
                let count = payloads.len() as u16;
                let mut results = Vec::new();
                for (i, data) in payloads.iter().enumerate() {
                    results.push(image.add_chunk(&ImageChunk {
                        image_id: 42,
                        chunk_id: i as u16,
                        chunk_count: count,
                        width: 8,
                        height: 8,
                        encoding: ImageEncoding::JpegColor,
                        frame_timestamp: ts,
                        data: data.clone(),
                    }));
                }

                let expected = payloads.concat();
                prop_assert!(image.is_valid());
                prop_assert_eq!(image.buffer(), expected.as_slice());
                prop_assert_eq!(results.last(), Some(&true));
                prop_assert!(results[..results.len() - 1].iter().all(|r| !r));
            }
        }
    }
}
