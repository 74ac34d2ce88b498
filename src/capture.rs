//! Image chunk capture for testing and debugging.
//!
//! This module provides thread-safe recording of image chunk streams. Captured
//! chunks can be saved to disk for offline analysis and replay testing.
//!
//! # File Format
//!
//! Chunks are stored in a binary format, all integers little-endian:
//! - `chunks_<ts>.bin`: sequence of records
//!   `[u32 image_id][u64 frame_timestamp][u16 width][u16 height][u8 encoding]`
//!   `[u16 chunk_id][u16 chunk_count][u32 len][len bytes]`
//! - `metadata_<ts>.json`: capture information
//!
//! # Example
//!
//! ```ignore
//! let capture = ChunkCapture::new();
//! capture.start_capture(CaptureMetadata {
//!     source: "robot-42".to_string(),
//!     ..Default::default()
//! })?;
//!
//! // In the receive loop:
//! capture.record_chunk(&chunk);
//! if image.add_chunk(&chunk) {
//!     capture.record_image();
//! }
//!
//! // When done:
//! let result = capture.stop_capture(Path::new("/output"))?;
//! ```

use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;

use crate::chunk::ImageChunk;
use crate::encoding::ImageEncoding;

/// Size of the fixed part of a chunk record
pub const RECORD_HEADER_LEN: usize = 4 + 8 + 2 + 2 + 1 + 2 + 2 + 4;

/// Largest chunk payload a capture record may declare
pub const MAX_RECORD_LEN: usize = 1024 * 1024;

/// Errors that can occur during chunk capture operations.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Capture is not currently active when trying to stop.
    #[error("capture is not active")]
    NotActive,

    /// Capture is already active when trying to start.
    #[error("capture is already active")]
    AlreadyActive,

    /// Failed to acquire lock on internal state.
    #[error("failed to acquire lock: {0}")]
    LockError(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Output directory does not exist.
    #[error("output directory does not exist: {0}")]
    DirectoryNotFound(String),

    /// A record in a capture file carries an unknown encoding code.
    #[error("unknown encoding code {code} in record {record}")]
    UnknownEncoding {
        /// Encoding byte found
        code: u8,
        /// Zero-based record index
        record: usize,
    },

    /// A capture file ends in the middle of a record.
    #[error("truncated record {0}")]
    TruncatedRecord(usize),

    /// A record declares a payload larger than [`MAX_RECORD_LEN`].
    #[error("record {record} declares {len} payload bytes, over the 1 MiB limit")]
    OversizeRecord {
        /// Declared payload length
        len: usize,
        /// Zero-based record index
        record: usize,
    },
}

/// Result type alias for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Metadata about the capture session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    /// Where the chunks came from (robot name, address, log file).
    #[serde(default)]
    pub source: String,
    /// Maximum chunk size the source was configured with.
    #[serde(default)]
    pub max_chunk_size: usize,
    /// Total number of chunks captured.
    #[serde(default)]
    pub total_chunks: u64,
    /// Total number of complete images seen during capture.
    #[serde(default)]
    pub total_images: u64,
    /// Capture duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
    /// Total payload bytes captured.
    #[serde(default)]
    pub total_bytes: u64,
    /// Optional description or notes about the capture.
    #[serde(default)]
    pub description: String,
}

/// Result returned when capture stops successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    /// Path to the saved chunk file.
    pub chunks_path: String,
    /// Path to the saved metadata file.
    pub metadata_path: String,
    /// Summary of the capture session.
    pub metadata: CaptureMetadata,
}

/// Thread-safe recorder for image chunks.
///
/// Recording is cheap when capture is inactive, so `record_chunk` can stay in
/// the receive path permanently.
pub struct ChunkCapture {
    /// Whether capture is currently active.
    is_capturing: AtomicBool,
    /// Captured chunks in arrival order.
    chunks: Mutex<Vec<ImageChunk>>,
    /// When the capture started.
    start_time: Mutex<Option<Instant>>,
    /// Metadata about the capture session.
    metadata: Mutex<CaptureMetadata>,
    /// Total chunks recorded (lock-free).
    chunk_count: AtomicU64,
    /// Total payload bytes recorded (lock-free).
    byte_count: AtomicU64,
    /// Completed images reported (lock-free).
    image_count: AtomicU64,
}

impl ChunkCapture {
    /// Creates a new recorder with no active capture.
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_capturing: AtomicBool::new(false),
            chunks: Mutex::new(Vec::new()),
            start_time: Mutex::new(None),
            metadata: Mutex::new(CaptureMetadata::default()),
            chunk_count: AtomicU64::new(0),
            byte_count: AtomicU64::new(0),
            image_count: AtomicU64::new(0),
        }
    }

    /// Returns whether capture is currently active.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::Acquire)
    }

    /// Returns the current chunk count.
    #[must_use]
    pub fn chunk_count(&self) -> u64 {
        self.chunk_count.load(Ordering::Relaxed)
    }

    /// Returns the current payload byte count.
    #[must_use]
    pub fn byte_count(&self) -> u64 {
        self.byte_count.load(Ordering::Relaxed)
    }

    /// Returns the number of completed images reported so far.
    #[must_use]
    pub fn image_count(&self) -> u64 {
        self.image_count.load(Ordering::Relaxed)
    }

    /// Starts a new capture session.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::AlreadyActive` if a capture is already in progress.
    /// Returns `CaptureError::LockError` if the internal mutex cannot be acquired.
    pub fn start_capture(&self, metadata: CaptureMetadata) -> Result<()> {
        if self
            .is_capturing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::AlreadyActive);
        }

        self.chunks
            .lock()
            .map_err(|e| CaptureError::LockError(e.to_string()))?
            .clear();

        self.chunk_count.store(0, Ordering::Release);
        self.byte_count.store(0, Ordering::Release);
        self.image_count.store(0, Ordering::Release);

        *self
            .start_time
            .lock()
            .map_err(|e| CaptureError::LockError(e.to_string()))? = Some(Instant::now());

        *self
            .metadata
            .lock()
            .map_err(|e| CaptureError::LockError(e.to_string()))? = metadata;

        log::info!("Chunk capture started");
        Ok(())
    }

    /// Records a chunk during capture.
    ///
    /// Ignored when capture is not active.
    pub fn record_chunk(&self, chunk: &ImageChunk) {
        if !self.is_capturing.load(Ordering::Acquire) {
            return;
        }

        self.chunk_count.fetch_add(1, Ordering::Relaxed);
        self.byte_count
            .fetch_add(chunk.data.len() as u64, Ordering::Relaxed);

        if let Ok(mut chunks) = self.chunks.lock() {
            chunks.push(chunk.clone());
        } else {
            log::warn!("Failed to acquire lock for chunk recording");
        }
    }

    /// Counts one completed image.
    ///
    /// Call this when the assembler reports a complete image.
    pub fn record_image(&self) {
        if self.is_capturing.load(Ordering::Acquire) {
            self.image_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Stops the capture and saves data to disk.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::NotActive` if no capture is in progress.
    /// Returns `CaptureError::DirectoryNotFound` if the output directory doesn't exist.
    /// Returns `CaptureError::Io` if file operations fail.
    /// Returns `CaptureError::Json` if metadata serialization fails.
    pub fn stop_capture(&self, output_dir: &Path) -> Result<CaptureResult> {
        if self
            .is_capturing
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::NotActive);
        }

        if !output_dir.exists() {
            return Err(CaptureError::DirectoryNotFound(
                output_dir.display().to_string(),
            ));
        }

        let duration_ms = self
            .start_time
            .lock()
            .map_err(|e| CaptureError::LockError(e.to_string()))?
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        let metadata = {
            let mut meta = self
                .metadata
                .lock()
                .map_err(|e| CaptureError::LockError(e.to_string()))?;
            meta.duration_ms = duration_ms;
            meta.total_chunks = self.chunk_count.load(Ordering::Acquire);
            meta.total_bytes = self.byte_count.load(Ordering::Acquire);
            meta.total_images = self.image_count.load(Ordering::Acquire);
            meta.clone()
        };

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let chunks_path = output_dir.join(format!("chunks_{}.bin", timestamp));
        {
            let chunks = self
                .chunks
                .lock()
                .map_err(|e| CaptureError::LockError(e.to_string()))?;
            write_chunks(&chunks_path, &chunks)?;
        }

        let metadata_path = output_dir.join(format!("metadata_{}.json", timestamp));
        write_metadata(&metadata_path, &metadata)?;

        log::info!(
            "Capture stopped: {} chunks, {} images, {} bytes, {} ms",
            metadata.total_chunks,
            metadata.total_images,
            metadata.total_bytes,
            duration_ms
        );

        Ok(CaptureResult {
            chunks_path: chunks_path.display().to_string(),
            metadata_path: metadata_path.display().to_string(),
            metadata,
        })
    }

    /// Cancels the current capture without saving.
    pub fn cancel_capture(&self) {
        self.is_capturing.store(false, Ordering::Release);
        if let Ok(mut chunks) = self.chunks.lock() {
            chunks.clear();
        }
        log::info!("Capture cancelled");
    }
}

impl Default for ChunkCapture {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Record Encoding
// =============================================================================

/// Writes one chunk record.
///
/// # Errors
///
/// Returns `CaptureError::Io` if writing fails.
pub fn write_chunk<W: Write>(writer: &mut W, chunk: &ImageChunk) -> Result<()> {
    writer.write_all(&chunk.image_id.to_le_bytes())?;
    writer.write_all(&chunk.frame_timestamp.to_le_bytes())?;
    writer.write_all(&chunk.width.to_le_bytes())?;
    writer.write_all(&chunk.height.to_le_bytes())?;
    writer.write_all(&[chunk.encoding.code()])?;
    writer.write_all(&chunk.chunk_id.to_le_bytes())?;
    writer.write_all(&chunk.chunk_count.to_le_bytes())?;
    writer.write_all(&(chunk.data.len() as u32).to_le_bytes())?;
    writer.write_all(&chunk.data)?;
    Ok(())
}

/// Reads the next chunk record, or `None` at a clean end of input.
///
/// `record` is the record index, used in error messages.
///
/// # Errors
///
/// Returns `CaptureError::TruncatedRecord` if input ends inside a record.
/// Returns `CaptureError::UnknownEncoding` for an unknown encoding byte.
/// Returns `CaptureError::OversizeRecord` if the declared length exceeds
/// [`MAX_RECORD_LEN`].
pub fn read_chunk<R: Read>(reader: &mut R, record: usize) -> Result<Option<ImageChunk>> {
    let mut header = [0u8; RECORD_HEADER_LEN];

    // Distinguish a clean end of file from a partial header
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CaptureError::Io(e)),
        }
    }
    if filled == 0 {
        return Ok(None);
    }
    if filled < header.len() {
        return Err(CaptureError::TruncatedRecord(record));
    }

    let u16_at = |i: usize| u16::from_le_bytes([header[i], header[i + 1]]);
    let u32_at = |i: usize| u32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]]);

    let image_id = u32_at(0);
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&header[4..12]);
    let frame_timestamp = u64::from_le_bytes(ts);
    let width = u16_at(12);
    let height = u16_at(14);
    let code = header[16];
    let chunk_id = u16_at(17);
    let chunk_count = u16_at(19);
    let len = u32_at(21) as usize;

    let encoding =
        ImageEncoding::from_code(code).ok_or(CaptureError::UnknownEncoding { code, record })?;

    if len > MAX_RECORD_LEN {
        return Err(CaptureError::OversizeRecord { len, record });
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CaptureError::TruncatedRecord(record)
        } else {
            CaptureError::Io(e)
        }
    })?;

    Ok(Some(ImageChunk {
        image_id,
        chunk_id,
        chunk_count,
        width,
        height,
        encoding,
        frame_timestamp,
        data,
    }))
}

/// Writes chunks to a capture file.
///
/// # Errors
///
/// Returns `CaptureError::Io` if file operations fail.
pub fn write_chunks(path: &Path, chunks: &[ImageChunk]) -> Result<()> {
    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    for chunk in chunks {
        write_chunk(&mut writer, chunk)?;
    }
    writer.flush()?;
    log::debug!("Saved {} chunks to {}", chunks.len(), path.display());
    Ok(())
}

/// Saves metadata to a JSON file.
fn write_metadata(path: &Path, metadata: &CaptureMetadata) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(path, json)?;
    log::debug!("Saved metadata to {}", path.display());
    Ok(())
}

// =============================================================================
// File Reading Utilities
// =============================================================================

/// Reads all chunks from a capture file.
///
/// # Errors
///
/// Returns `CaptureError::Io` if file operations fail, or a record error for
/// malformed input.
pub fn read_chunks(path: &Path) -> Result<Vec<ImageChunk>> {
    let mut reader = BufReader::new(std::fs::File::open(path)?);
    let mut chunks = Vec::new();

    while let Some(chunk) = read_chunk(&mut reader, chunks.len())? {
        chunks.push(chunk);
    }

    Ok(chunks)
}

/// Reads capture metadata from a JSON file.
///
/// # Errors
///
/// Returns `CaptureError::Io` if the file cannot be read.
/// Returns `CaptureError::Json` if the JSON is invalid.
pub fn read_metadata(path: &Path) -> Result<CaptureMetadata> {
    let json = std::fs::read_to_string(path)?;
    let metadata: CaptureMetadata = serde_json::from_str(&json)?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ChunkGenerator;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn sample_chunk(image_id: u32, chunk_id: u16, data: &[u8]) -> ImageChunk {
        ImageChunk {
            image_id,
            chunk_id,
            chunk_count: 3,
            width: 320,
            height: 240,
            encoding: ImageEncoding::JpegMinimizedColor,
            frame_timestamp: 0x0102_0304_0506_0708,
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_chunk_capture_new() {
        let capture = ChunkCapture::new();
        assert!(!capture.is_capturing());
        assert_eq!(capture.chunk_count(), 0);
        assert_eq!(capture.byte_count(), 0);
        assert_eq!(capture.image_count(), 0);
    }

    #[test]
    fn test_start_capture_already_active() {
        let capture = ChunkCapture::new();
        capture.start_capture(CaptureMetadata::default()).unwrap();
        let result = capture.start_capture(CaptureMetadata::default());
        assert!(matches!(result, Err(CaptureError::AlreadyActive)));
    }

    #[test]
    fn test_record_chunk_and_image() {
        let capture = ChunkCapture::new();
        capture.start_capture(CaptureMetadata::default()).unwrap();

        capture.record_chunk(&sample_chunk(1, 0, &[1, 2, 3, 4]));
        capture.record_chunk(&sample_chunk(1, 1, &[5, 6, 7, 8, 9]));
        capture.record_image();

        assert_eq!(capture.chunk_count(), 2);
        assert_eq!(capture.byte_count(), 9);
        assert_eq!(capture.image_count(), 1);
    }

    #[test]
    fn test_record_when_not_capturing() {
        let capture = ChunkCapture::new();
        capture.record_chunk(&sample_chunk(1, 0, &[0x00, 0x01]));
        capture.record_image();

        assert_eq!(capture.chunk_count(), 0);
        assert_eq!(capture.image_count(), 0);
    }

    #[test]
    fn test_cancel_capture() {
        let capture = ChunkCapture::new();
        capture.start_capture(CaptureMetadata::default()).unwrap();
        capture.record_chunk(&sample_chunk(1, 0, &[0x00]));

        capture.cancel_capture();
        assert!(!capture.is_capturing());

        capture.start_capture(CaptureMetadata::default()).unwrap();
        assert!(capture.is_capturing());
        assert_eq!(capture.chunk_count(), 0);
    }

    #[test]
    fn test_stop_capture_not_active() {
        let dir = tempdir().unwrap();
        let capture = ChunkCapture::new();
        assert!(matches!(
            capture.stop_capture(dir.path()),
            Err(CaptureError::NotActive)
        ));
    }

    #[test]
    fn test_stop_capture_missing_directory() {
        let dir = tempdir().unwrap();
        let capture = ChunkCapture::new();
        capture.start_capture(CaptureMetadata::default()).unwrap();
        assert!(matches!(
            capture.stop_capture(&dir.path().join("nope")),
            Err(CaptureError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_chunk_recording() {
        let capture = Arc::new(ChunkCapture::new());
        capture.start_capture(CaptureMetadata::default()).unwrap();

        let handles: Vec<_> = (0..10u32)
            .map(|i| {
                let capture = Arc::clone(&capture);
                thread::spawn(move || {
                    for j in 0..100u16 {
                        capture.record_chunk(&sample_chunk(i, j, &[i as u8; 10]));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(capture.chunk_count(), 1000);
        assert_eq!(capture.byte_count(), 10000);
    }

    #[test]
    fn test_record_layout() {
        let mut bytes = Vec::new();
        write_chunk(&mut bytes, &sample_chunk(0xA1B2C3D4, 2, &[0xEE, 0xFF])).unwrap();

        assert_eq!(bytes.len(), RECORD_HEADER_LEN + 2);
        assert_eq!(&bytes[0..4], &[0xD4, 0xC3, 0xB2, 0xA1]);
        assert_eq!(&bytes[4..12], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[12..14], &320u16.to_le_bytes());
        assert_eq!(&bytes[14..16], &240u16.to_le_bytes());
        assert_eq!(bytes[16], ImageEncoding::JpegMinimizedColor.code());
        assert_eq!(&bytes[17..19], &[2, 0]);
        assert_eq!(&bytes[19..21], &[3, 0]);
        assert_eq!(&bytes[21..25], &[2, 0, 0, 0]);
        assert_eq!(&bytes[25..], &[0xEE, 0xFF]);
    }

    #[test]
    fn test_write_and_read_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunks.bin");

        let mut gen = ChunkGenerator::new(10);
        let mut chunks = gen.raw_gray_gradient(8, 4);
        chunks.extend(gen.minimized_color_image(32, 8));
        write_chunks(&path, &chunks).unwrap();

        assert_eq!(read_chunks(&path).unwrap(), chunks);
    }

    #[test]
    fn test_read_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunks.bin");

        let mut bytes = Vec::new();
        write_chunk(&mut bytes, &sample_chunk(1, 0, &[1, 2, 3])).unwrap();
        write_chunk(&mut bytes, &sample_chunk(1, 1, &[4, 5, 6])).unwrap();
        bytes.truncate(bytes.len() - 1);
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            read_chunks(&path),
            Err(CaptureError::TruncatedRecord(1))
        ));

        // Partial header
        std::fs::write(&path, &bytes[..10]).unwrap();
        assert!(matches!(
            read_chunks(&path),
            Err(CaptureError::TruncatedRecord(0))
        ));
    }

    #[test]
    fn test_read_oversize_record() {
        let mut bytes = Vec::new();
        write_chunk(&mut bytes, &sample_chunk(1, 0, &[1, 2, 3])).unwrap();
        // Corrupt the length field; no payload follows
        bytes[21..25].copy_from_slice(&u32::MAX.to_le_bytes());

        assert!(matches!(
            read_chunk(&mut bytes.as_slice(), 0),
            Err(CaptureError::OversizeRecord { len, record: 0 }) if len == u32::MAX as usize
        ));

        // The limit itself is still accepted as far as the header goes
        bytes[21..25].copy_from_slice(&(MAX_RECORD_LEN as u32).to_le_bytes());
        assert!(matches!(
            read_chunk(&mut bytes.as_slice(), 0),
            Err(CaptureError::TruncatedRecord(0))
        ));
    }

    #[test]
    fn test_read_unknown_encoding() {
        let mut bytes = Vec::new();
        write_chunk(&mut bytes, &sample_chunk(1, 0, &[1])).unwrap();
        bytes[16] = 0xEE;

        let result = read_chunk(&mut bytes.as_slice(), 0);
        assert!(matches!(
            result,
            Err(CaptureError::UnknownEncoding { code: 0xEE, record: 0 })
        ));
    }

    #[test]
    fn test_read_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();
        assert!(read_chunks(&path).unwrap().is_empty());
    }

    #[test]
    fn test_full_capture_workflow() {
        let dir = tempdir().unwrap();
        let capture = ChunkCapture::new();

        capture
            .start_capture(CaptureMetadata {
                source: "sim".to_string(),
                max_chunk_size: 16,
                description: "two frames".to_string(),
                ..Default::default()
            })
            .unwrap();

        let mut gen = ChunkGenerator::new(16);
        for chunks in [gen.raw_gray_image(8, 8, 1), gen.raw_gray_image(8, 8, 2)] {
            for chunk in &chunks {
                capture.record_chunk(chunk);
            }
            capture.record_image();
        }

        let result = capture.stop_capture(dir.path()).unwrap();
        assert!(!capture.is_capturing());
        assert_eq!(result.metadata.total_chunks, 8);
        assert_eq!(result.metadata.total_images, 2);
        assert_eq!(result.metadata.total_bytes, 128);
        assert!(result.chunks_path.contains("chunks_"));

        let chunks = read_chunks(Path::new(&result.chunks_path)).unwrap();
        assert_eq!(chunks.len(), 8);

        let meta = read_metadata(Path::new(&result.metadata_path)).unwrap();
        assert_eq!(meta, result.metadata);
        assert_eq!(meta.source, "sim");
    }
}
