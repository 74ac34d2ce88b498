//! Integration tests for the complete chunk pipeline.
//!
//! ```text
//! Chunks → EncodedImage → (repair) → decode / save
//! ```
//!
//! Streams come from `ChunkGenerator`, so no robot is needed.

use encoded_image_lib::decode::decode_with_config;
use encoded_image_lib::test_utils::{rgb_matches, ChunkGenerator, Rgb};
use encoded_image_lib::{
    AssemblerConfig, ChunkOutcome, DecodeError, EncodedImage, ImageChunk, ImageEncoding,
    ImageRing, InvalidReason, PixelFormat,
};
use tempfile::tempdir;

/// Feed chunks and return the image once the last chunk completes it
fn assemble(chunks: &[ImageChunk]) -> Option<EncodedImage> {
    let mut image = EncodedImage::new();
    let mut complete = false;
    for chunk in chunks {
        complete = image.add_chunk(chunk);
    }
    complete.then_some(image)
}

// ============================================================================
// Happy Path: every decodable encoding
// ============================================================================

#[test]
fn test_raw_rgb_pipeline() {
    let mut gen = ChunkGenerator::new(100);
    let chunks = gen.raw_rgb_image(20, 10, Rgb::BLUE);
    assert_eq!(chunks.len(), 6);

    let image = assemble(&chunks).expect("image should complete");
    let rgb = image.decode(PixelFormat::Rgb8).unwrap();
    assert_eq!((rgb.width, rgb.height), (20, 10));
    assert!(rgb_matches(&rgb.data, Rgb::BLUE, 0));

    let gray = image.decode(PixelFormat::Gray8).unwrap();
    assert_eq!(gray.data.len(), 200);
}

#[test]
fn test_raw_gray_pipeline() {
    let mut gen = ChunkGenerator::new(7);
    let image = assemble(&gen.raw_gray_gradient(16, 4)).unwrap();

    let gray = image.decode(PixelFormat::Gray8).unwrap();
    assert_eq!(gray.data[0], 0);
    assert_eq!(gray.data[15], 255);

    let rgb = image.decode(PixelFormat::Rgb8).unwrap();
    assert_eq!(&rgb.data[45..48], &[255, 255, 255]);
}

#[test]
fn test_jpeg_color_pipeline() {
    let mut gen = ChunkGenerator::new(256);
    let chunks = gen.jpeg_color_image(32, 24, Rgb::RED).unwrap();
    assert!(chunks.len() > 1);

    let image = assemble(&chunks).unwrap();
    assert!(image.is_color());

    let decoded = image.decode(PixelFormat::Rgb8).unwrap();
    assert_eq!((decoded.width, decoded.height), (32, 24));
    assert!(rgb_matches(&decoded.data, Rgb::RED, 40));
}

#[test]
fn test_jpeg_gray_pipeline() {
    let mut gen = ChunkGenerator::new(128);
    let image = assemble(&gen.jpeg_gray_image(32, 16).unwrap()).unwrap();
    assert!(!image.is_color());

    let decoded = image.decode(PixelFormat::Gray8).unwrap();
    assert_eq!(decoded.data.len(), 32 * 16);
    // Left edge dark, right edge bright
    assert!(decoded.data[0] < 40);
    assert!(decoded.data[31] > 215);
}

#[test]
fn test_half_width_pipeline_pads_to_declared_width() {
    let config = AssemblerConfig {
        half_width_padding: 8,
        ..AssemblerConfig::default()
    };

    let mut gen = ChunkGenerator::new(512);
    let chunks = gen.jpeg_half_width_image(16, 16, 8, Rgb::WHITE).unwrap();
    let image = assemble(&chunks).unwrap();
    assert_eq!(image.width(), 32);

    let decoded = decode_with_config(&image, PixelFormat::Rgb8, &config).unwrap();
    assert_eq!((decoded.width, decoded.height), (32, 16));

    let row = &decoded.data[..32 * 3];
    assert!(rgb_matches(&row[..8 * 3], Rgb::BLACK, 0));
    assert!(rgb_matches(&row[8 * 3..24 * 3], Rgb::WHITE, 30));
    assert!(rgb_matches(&row[24 * 3..], Rgb::BLACK, 0));
}

#[test]
fn test_minimized_gray_pipeline() {
    let mut gen = ChunkGenerator::new(16);
    let image = assemble(&gen.minimized_gray_image(32, 16)).unwrap();
    assert_eq!(image.encoding(), ImageEncoding::JpegMinimizedGray);

    let decoded = image.decode(PixelFormat::Gray8).unwrap();
    assert_eq!(decoded.data.len(), 32 * 16);
    assert!(decoded.data.iter().all(|&v| v.abs_diff(128) <= 2));
}

#[test]
fn test_minimized_color_pipeline() {
    let mut gen = ChunkGenerator::new(16);
    let image = assemble(&gen.minimized_color_image(64, 16)).unwrap();

    // Declared gray, upgraded by the color flag in the first byte
    assert_eq!(image.encoding(), ImageEncoding::JpegMinimizedColor);
    assert!(image.is_color());

    let decoded = image.decode(PixelFormat::Rgb8).unwrap();
    assert_eq!((decoded.width, decoded.height), (64, 16));
    assert!(rgb_matches(&decoded.data, Rgb::GRAY, 4));
}

#[test]
fn test_unsupported_encoding_fails_decode() {
    let mut gen = ChunkGenerator::new(64);
    let image = assemble(&gen.chunk_payload(&[0u8; 32], 4, 4, ImageEncoding::Yuyv)).unwrap();

    assert!(matches!(
        image.decode(PixelFormat::Rgb8),
        Err(DecodeError::UnsupportedEncoding(ImageEncoding::Yuyv))
    ));
}

// ============================================================================
// Lossy transport
// ============================================================================

#[test]
fn test_lost_chunk_drops_image_and_recovers() {
    let mut gen = ChunkGenerator::new(8);
    let mut first = gen.raw_gray_image(4, 4, 10);
    first.remove(0);
    let second = gen.raw_gray_image(4, 4, 20);

    let mut image = EncodedImage::new();
    let outcomes: Vec<ChunkOutcome> = first.iter().map(|c| image.process_chunk(c)).collect();
    assert_eq!(
        outcomes,
        vec![ChunkOutcome::Invalid(InvalidReason::MissingFirstChunk(1))]
    );

    let completed = second.iter().filter(|c| image.add_chunk(c)).count();
    assert_eq!(completed, 1);
    assert_eq!(image.buffer(), &[20u8; 16][..]);
}

#[test]
fn test_reordered_chunks_drop_image() {
    let mut gen = ChunkGenerator::new(4);
    let mut chunks = gen.raw_gray_gradient(4, 4);
    chunks.swap(1, 2);
    assert!(assemble(&chunks).is_none());
}

#[test]
fn test_interleaved_images_drop_both() {
    let mut gen = ChunkGenerator::new(8);
    let a = gen.raw_gray_image(4, 4, 1);
    let b = gen.raw_gray_image(4, 4, 2);

    // a0 b0 a1 b1: every id switch resets, so a1 and b1 arrive out of order
    let interleaved = vec![a[0].clone(), b[0].clone(), a[1].clone(), b[1].clone()];
    assert!(assemble(&interleaved).is_none());
}

// ============================================================================
// Ring and persistence
// ============================================================================

#[test]
fn test_ring_then_save() {
    let dir = tempdir().unwrap();
    let mut ring = ImageRing::new(3);
    let mut gen = ChunkGenerator::new(64);

    let mut stamps = Vec::new();
    for chunks in [
        gen.jpeg_color_image(16, 16, Rgb::GREEN).unwrap(),
        gen.minimized_gray_image(16, 8),
    ] {
        for chunk in &chunks {
            if let Some(ts) = ring.add_chunk(chunk) {
                stamps.push(ts);
            }
        }
    }
    assert_eq!(stamps.len(), 2);

    let latest = ring.take_through(stamps[1]).unwrap();
    assert!(ring.is_empty());

    let path = dir.path().join("latest.jpg");
    latest.save(&path).unwrap();

    let written = std::fs::read(&path).unwrap();
    assert_eq!(&written[..2], &[0xFF, 0xD8]);
    assert_eq!(&written[written.len() - 2..], &[0xFF, 0xD9]);
}
