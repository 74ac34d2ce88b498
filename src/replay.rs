//! Chunk replay for offline testing without a live robot.
//!
//! Replays chunk files written by [`crate::capture`] through an
//! [`EncodedImage`] assembler, yielding every image that completes.
//!
//! Pacing follows the recorded frame timestamps. All chunks of one image share
//! a timestamp, so they are delivered back to back and the delay falls between
//! images.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::path::Path;
//! use encoded_image_lib::replay::ChunkReplay;
//!
//! let mut replay = ChunkReplay::load(Path::new("chunks_12345.bin"))?;
//! let receiver = replay.start()?;
//!
//! while let Ok(image) = receiver.recv() {
//!     image.save(format!("image_{}.jpg", image.timestamp()))?;
//! }
//! ```

use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::capture::{read_chunks, read_metadata, CaptureError, CaptureMetadata};
use crate::chunk::{ImageChunk, MAX_CHUNK_SIZE};
use crate::frame_assembler::EncodedImage;

/// Errors that can occur during chunk replay.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// The capture file could not be read.
    #[error("failed to load capture: {0}")]
    Load(#[from] CaptureError),

    /// Replay is already running.
    #[error("replay is already running")]
    AlreadyRunning,

    /// Replay is not running.
    #[error("replay is not running")]
    NotRunning,
}

/// Result type alias for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Configuration for chunk replay.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed multiplier (1.0 = realtime, 0.0 = as fast as possible).
    pub speed: f64,
    /// Whether to start over when reaching the end.
    pub loop_playback: bool,
    /// Chunk size limit for the assembler.
    pub max_chunk_size: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loop_playback: false,
            max_chunk_size: MAX_CHUNK_SIZE,
        }
    }
}

/// Replays captured chunks on a background thread.
pub struct ChunkReplay {
    chunks: Vec<ImageChunk>,
    metadata: Option<CaptureMetadata>,
    config: ReplayConfig,
    thread_handle: Option<JoinHandle<()>>,
    stop_sender: Option<Sender<()>>,
}

impl ChunkReplay {
    /// Load captured chunks from a file.
    ///
    /// A companion metadata file is picked up when present, either with a
    /// `.json` extension or with the `chunks_` prefix replaced by `metadata_`.
    /// Its `max_chunk_size` overrides the default limit.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::Load` if the file cannot be read or is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let chunks = read_chunks(path)?;
        let metadata = Self::try_load_metadata(path);

        log::info!("Loaded {} chunks from {}", chunks.len(), path.display());

        let mut config = ReplayConfig::default();
        if let Some(ref meta) = metadata {
            log::info!(
                "Metadata: source={:?}, {} images, {} ms",
                meta.source,
                meta.total_images,
                meta.duration_ms
            );
            if meta.max_chunk_size > 0 {
                config.max_chunk_size = meta.max_chunk_size;
            }
        }

        Ok(Self {
            chunks,
            metadata,
            config,
            thread_handle: None,
            stop_sender: None,
        })
    }

    /// Load chunks with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`ChunkReplay::load`].
    pub fn load_with_config(path: &Path, config: ReplayConfig) -> Result<Self> {
        let mut replay = Self::load(path)?;
        replay.config = config;
        Ok(replay)
    }

    fn try_load_metadata(path: &Path) -> Option<CaptureMetadata> {
        let json_path = path.with_extension("json");
        if json_path.exists() {
            if let Ok(meta) = read_metadata(&json_path) {
                return Some(meta);
            }
        }

        let file_name = path.file_name()?.to_str()?;
        let stem = file_name.strip_prefix("chunks_")?;
        let json_path = path.with_file_name(format!(
            "metadata_{}",
            stem.replace(".bin", ".json")
        ));
        read_metadata(&json_path).ok()
    }

    /// Metadata loaded alongside the chunks, if any.
    #[must_use]
    pub fn metadata(&self) -> Option<&CaptureMetadata> {
        self.metadata.as_ref()
    }

    /// Current replay configuration.
    #[must_use]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Number of loaded chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Span between the first and last frame timestamps, in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        match (self.chunks.first(), self.chunks.last()) {
            (Some(first), Some(last)) => last.frame_timestamp.saturating_sub(first.frame_timestamp),
            _ => 0,
        }
    }

    /// Check if replay is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Start replaying on a background thread.
    ///
    /// Returns a receiver yielding a copy of each completed image.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::AlreadyRunning` if replay is already in progress.
    pub fn start(&mut self) -> Result<Receiver<EncodedImage>> {
        if self.is_running() {
            return Err(ReplayError::AlreadyRunning);
        }

        let (image_tx, image_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();

        let chunks = self.chunks.clone();
        let config = self.config.clone();

        let handle = thread::spawn(move || {
            Self::replay_thread(chunks, config, image_tx, stop_rx);
        });

        self.thread_handle = Some(handle);
        self.stop_sender = Some(stop_tx);

        log::info!("Chunk replay started");
        Ok(image_rx)
    }

    /// Stop the replay thread and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::NotRunning` if replay is not in progress.
    pub fn stop(&mut self) -> Result<()> {
        let stop_tx = self.stop_sender.take().ok_or(ReplayError::NotRunning)?;
        let handle = self.thread_handle.take().ok_or(ReplayError::NotRunning)?;

        let _ = stop_tx.send(());
        handle.join().map_err(|_| ReplayError::NotRunning)?;

        log::info!("Chunk replay stopped");
        Ok(())
    }

    fn replay_thread(
        chunks: Vec<ImageChunk>,
        config: ReplayConfig,
        image_tx: Sender<EncodedImage>,
        stop_rx: Receiver<()>,
    ) {
        let Some(base) = chunks.first().map(|c| c.frame_timestamp) else {
            return;
        };

        loop {
            let mut image = EncodedImage::with_max_chunk_size(config.max_chunk_size);
            let replay_start = Instant::now();

            for chunk in &chunks {
                if stop_rx.try_recv().is_ok() {
                    log::debug!("Replay thread received stop signal");
                    return;
                }

                if let Some(expected) = Self::paced_offset(chunk.frame_timestamp, base, config.speed) {
                    if !Self::sleep_until(replay_start, expected, &stop_rx) {
                        return;
                    }
                }

                if image.add_chunk(chunk) && image_tx.send(image.clone()).is_err() {
                    log::debug!("Image receiver dropped, stopping replay");
                    return;
                }
            }

            if config.loop_playback {
                log::debug!("Replay loop completed, restarting");
            } else {
                log::debug!("Replay completed");
                break;
            }
        }
    }

    /// Time after replay start at which a chunk is due
    ///
    /// `None` means no wait: unpaced replay, or an offset too large to represent.
    fn paced_offset(frame_timestamp: u64, base: u64, speed: f64) -> Option<Duration> {
        if speed <= 0.0 {
            return None;
        }
        let offset_ms = frame_timestamp.saturating_sub(base);
        Duration::try_from_secs_f64(offset_ms as f64 / 1000.0 / speed).ok()
    }

    /// Sleep in short steps until `expected` has elapsed since `start`.
    ///
    /// Returns `false` if a stop signal arrived.
    fn sleep_until(start: Instant, expected: Duration, stop_rx: &Receiver<()>) -> bool {
        let step = Duration::from_millis(10);
        loop {
            let elapsed = start.elapsed();
            if elapsed >= expected {
                return true;
            }
            if stop_rx.try_recv().is_ok() {
                return false;
            }
            thread::sleep((expected - elapsed).min(step));
        }
    }
}

impl Drop for ChunkReplay {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

/// Replay a capture file without timing and collect every completed image.
///
/// # Errors
///
/// Returns `ReplayError` if the file cannot be loaded.
pub fn replay_all_images(path: &Path) -> Result<Vec<EncodedImage>> {
    Ok(ImageIterator::new(path)?.collect())
}

/// Lazy iterator over the images completed by a capture file.
pub struct ImageIterator {
    chunks: std::vec::IntoIter<ImageChunk>,
    image: EncodedImage,
}

impl ImageIterator {
    /// Create an iterator over a capture file.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError` if the file cannot be loaded.
    pub fn new(path: &Path) -> Result<Self> {
        let replay = ChunkReplay::load(path)?;
        let max_chunk_size = replay.config.max_chunk_size;
        Ok(Self::from_chunks(replay.chunks.clone(), max_chunk_size))
    }

    /// Create an iterator over chunks already in memory.
    #[must_use]
    pub fn from_chunks(chunks: Vec<ImageChunk>, max_chunk_size: usize) -> Self {
        Self {
            chunks: chunks.into_iter(),
            image: EncodedImage::with_max_chunk_size(max_chunk_size),
        }
    }
}

impl Iterator for ImageIterator {
    type Item = EncodedImage;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let chunk = self.chunks.next()?;
            if self.image.add_chunk(&chunk) {
                return Some(self.image.clone());
            }
        }
    }
}
