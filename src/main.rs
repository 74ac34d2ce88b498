//! `chunk-replay` - reassemble a captured chunk file and save every image
//!
//! Usage: `chunk-replay <chunks.bin> <output_dir>`
//!
//! Standard JPEG and repaired minimized frames are saved as `.jpg`; raw frames
//! are saved as `.raw`. Settings come from the `ENCODED_IMAGE_*` environment
//! variables.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use encoded_image_lib::replay::ImageIterator;
use encoded_image_lib::save::save_with_config;
use encoded_image_lib::{init_logging, AssemblerConfig, EncodedImage, ImageEncoding};

fn extension(encoding: ImageEncoding) -> &'static str {
    match encoding {
        ImageEncoding::JpegGray
        | ImageEncoding::JpegColor
        | ImageEncoding::JpegColorHalfWidth
        | ImageEncoding::JpegMinimizedGray
        | ImageEncoding::JpegMinimizedColor => "jpg",
        _ => "raw",
    }
}

fn output_path(dir: &Path, image: &EncodedImage) -> PathBuf {
    dir.join(format!(
        "image_{}.{}",
        image.timestamp(),
        extension(image.encoding())
    ))
}

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        bail!("usage: {} <chunks.bin> <output_dir>", args[0]);
    }
    let input = Path::new(&args[1]);
    let output_dir = Path::new(&args[2]);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let config = AssemblerConfig::from_env();
    let images = ImageIterator::new(input)
        .with_context(|| format!("loading {}", input.display()))?;

    let mut saved = 0usize;
    let mut failed = 0usize;
    for image in images {
        let path = output_path(output_dir, &image);
        match save_with_config(&image, &path, &config) {
            Ok(()) => saved += 1,
            Err(e) => {
                log::warn!("Skipping image {}: {}", image.timestamp(), e);
                failed += 1;
            }
        }
    }

    log::info!(
        "Saved {} images to {} ({} failed)",
        saved,
        output_dir.display(),
        failed
    );
    Ok(())
}
