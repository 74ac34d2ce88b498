//! `encoded-image` - reassembly of chunked camera images from a robot
//!
//! Images arrive as numbered chunks tagged with an image id, dimensions, an
//! encoding and a frame timestamp. [`EncodedImage`] accumulates the chunks of one
//! image at a time and reports when a complete, valid image is ready. Completed
//! images can be decoded to gray or RGB pixels, or written to disk.
//!
//! Two encodings need repair before a JPEG codec will accept them: minimized
//! gray and minimized color frames carry only entropy-coded data. The
//! [`mini_jpeg`] module rebuilds a full JPEG stream from them.

pub mod capture;
pub mod chunk;
pub mod config;
pub mod decode;
pub mod encoding;
pub mod frame_assembler;
pub mod image_ring;
pub mod mini_jpeg;
pub mod pixel_conversion;
pub mod replay;
pub mod save;
pub mod test_utils;

pub use chunk::{ImageChunk, MAX_CHUNK_SIZE};
pub use config::AssemblerConfig;
pub use decode::{DecodeError, DecodedImage, PixelFormat};
pub use encoding::ImageEncoding;
pub use frame_assembler::{AssemblyState, ChunkOutcome, EncodedImage, InvalidReason};
pub use image_ring::ImageRing;
pub use mini_jpeg::{mini_color_to_jpeg, mini_gray_to_jpeg, RepairError};
pub use save::SaveError;

/// Initialize logging from `RUST_LOG`, defaulting to `info`
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
