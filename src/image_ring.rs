//! Fixed ring of reassembly slots indexed by completed-image timestamp
//!
//! Chunks always go into the current slot. When that slot completes an image,
//! the image's timestamp is indexed to the slot and the cursor moves on. The
//! slot the cursor lands on is about to be overwritten, so any index entry
//! pointing at it is dropped immediately.
//!
//! # Usage
//!
//! ```rust,ignore
//! use encoded_image_lib::image_ring::ImageRing;
//!
//! let mut ring = ImageRing::new(3);
//! for chunk in chunks {
//!     if let Some(timestamp) = ring.add_chunk(&chunk) {
//!         log::info!("image {} ready", timestamp);
//!     }
//! }
//!
//! // Display the requested frame and forget everything older
//! if let Some(image) = ring.take_through(requested_timestamp) {
//!     show(image.decode(PixelFormat::Rgb8)?);
//! }
//! ```

use std::collections::BTreeMap;

use crate::chunk::{ImageChunk, MAX_CHUNK_SIZE};
use crate::config::AssemblerConfig;
use crate::frame_assembler::EncodedImage;

/// Smallest usable ring: one slot being filled plus one completed image
pub const MIN_CAPACITY: usize = 2;

/// Ring of reusable `EncodedImage` slots
#[derive(Debug, Clone)]
pub struct ImageRing {
    slots: Vec<EncodedImage>,
    cursor: usize,
    /// Completed timestamp to slot index
    index: BTreeMap<u64, usize>,
}

impl ImageRing {
    /// Create a ring with `capacity` slots (at least [`MIN_CAPACITY`])
    pub fn new(capacity: usize) -> Self {
        Self::with_max_chunk_size(capacity, MAX_CHUNK_SIZE)
    }

    /// Create a ring whose slots use the chunk limit from `config`
    pub fn with_config(capacity: usize, config: &AssemblerConfig) -> Self {
        Self::with_max_chunk_size(capacity, config.max_chunk_size)
    }

    fn with_max_chunk_size(capacity: usize, max_chunk_size: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            slots: (0..capacity)
                .map(|_| EncodedImage::with_max_chunk_size(max_chunk_size))
                .collect(),
            cursor: 0,
            index: BTreeMap::new(),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of completed images currently retrievable
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no completed image is retrievable
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Feed a chunk to the current slot
    ///
    /// Returns the timestamp of the image if this chunk completed it.
    pub fn add_chunk(&mut self, chunk: &ImageChunk) -> Option<u64> {
        let slot = &mut self.slots[self.cursor];
        if !slot.add_chunk(chunk) {
            return None;
        }

        let timestamp = slot.timestamp();
        if let Some(previous) = self.index.insert(timestamp, self.cursor) {
            log::warn!(
                "ImageRing.AddChunk.DuplicateTimestamp: t={} replaces image in slot {}",
                timestamp,
                previous
            );
        }

        self.cursor = (self.cursor + 1) % self.slots.len();

        // The new cursor slot is about to be overwritten
        let reused = self.cursor;
        self.index.retain(|_, slot| *slot != reused);

        Some(timestamp)
    }

    /// Completed image with exactly this timestamp
    pub fn get(&self, timestamp: u64) -> Option<&EncodedImage> {
        self.index.get(&timestamp).map(|&slot| &self.slots[slot])
    }

    /// Most recent completed image
    pub fn latest(&self) -> Option<&EncodedImage> {
        self.index
            .last_key_value()
            .map(|(_, &slot)| &self.slots[slot])
    }

    /// Timestamps of all retrievable images, oldest first
    pub fn timestamps(&self) -> impl Iterator<Item = u64> + '_ {
        self.index.keys().copied()
    }

    /// Return the image at `timestamp` and forget it and everything older
    ///
    /// Returns `None` (and forgets nothing) if no image has this timestamp.
    pub fn take_through(&mut self, timestamp: u64) -> Option<EncodedImage> {
        let slot = *self.index.get(&timestamp)?;
        let image = self.slots[slot].clone();

        // Keep only entries strictly newer than `timestamp`
        self.index = match timestamp.checked_add(1) {
            Some(next) => self.index.split_off(&next),
            None => BTreeMap::new(),
        };

        Some(image)
    }
}

impl Default for ImageRing {
    fn default() -> Self {
        Self::new(MIN_CAPACITY)
    }
}
