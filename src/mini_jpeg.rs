//! Repair of the vendor "minimized" JPEG format
//!
//! Minimized frames carry only JPEG entropy-coded scan data: the JFIF,
//! quantization and Huffman headers are stripped, byte stuffing is removed and
//! the final radio packet is padded with `0xFF`. Byte 0 of the payload is a
//! side-channel byte (quality for gray frames, color flag for color frames) and
//! is not part of the scan.
//!
//! Repair prepends a prebaked header, patches the real dimensions into its SOF0
//! segment, restores byte stuffing and appends an EOI marker.
//!
//! # Example
//!
//! ```rust,ignore
//! use encoded_image_lib::mini_jpeg::mini_gray_to_jpeg;
//!
//! let jpeg = mini_gray_to_jpeg(&payload, 240, 320)?;
//! assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
//! ```

use thiserror::Error;

/// JPEG End Of Image marker
pub const EOI_MARKER: [u8; 2] = [0xFF, 0xD9];

/// Quality byte sent by firmware that predates per-frame quality selection
///
/// Gray frames must keep byte 0 zero (a nonzero byte marks the frame as color),
/// so zero selects the default quality-50 header.
pub const LEGACY_QUALITY: u8 = 0;

/// Errors produced while repairing a minimized JPEG
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepairError {
    /// No prebaked header exists for the embedded quality level.
    #[error("no JPEG header for quality {0}")]
    UnsupportedQuality(u8),

    /// The header template has no SOF0 segment to patch dimensions into.
    #[error("header template has no SOF0 segment")]
    MissingSofMarker,
}

/// Result type alias for repair operations.
pub type Result<T> = std::result::Result<T, RepairError>;

/// Prebaked grayscale JPEG header, quality 50
const GRAY_Q50_HEADER: [u8; 324] = [
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43,
    0x00, 0x10, 0x0B, 0x0C, 0x0E, 0x0C, 0x0A, 0x10, 0x0E, 0x0D, 0x0E, 0x12,
    0x11, 0x10, 0x13, 0x18, 0x28, 0x1A, 0x18, 0x16, 0x16, 0x18, 0x31, 0x23,
    0x25, 0x1D, 0x28, 0x3A, 0x33, 0x3D, 0x3C, 0x39, 0x33, 0x38, 0x37, 0x40,
    0x48, 0x5C, 0x4E, 0x40, 0x44, 0x57, 0x45, 0x37, 0x38, 0x50, 0x6D, 0x51,
    0x57, 0x5F, 0x62, 0x67, 0x68, 0x67, 0x3E, 0x4D, 0x71, 0x79, 0x70, 0x64,
    0x78, 0x5C, 0x65, 0x67, 0x63, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x01, 0x28,
    0x01, 0x90, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00, 0xD2, 0x00, 0x00,
    0x01, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    0x09, 0x0A, 0x0B, 0x10, 0x00, 0x02, 0x01, 0x03, 0x03, 0x02, 0x04, 0x03,
    0x05, 0x05, 0x04, 0x04, 0x00, 0x00, 0x01, 0x7D, 0x01, 0x02, 0x03, 0x00,
    0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1,
    0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16,
    0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35,
    0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65,
    0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94,
    0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA,
    0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4,
    0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6,
    0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00,
];

/// Prebaked grayscale JPEG header, quality 80
const GRAY_Q80_HEADER: [u8; 324] = [
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43,
    0x00, 0x06, 0x04, 0x05, 0x06, 0x05, 0x04, 0x06, 0x06, 0x05, 0x06, 0x07,
    0x07, 0x06, 0x08, 0x0A, 0x10, 0x0A, 0x0A, 0x09, 0x09, 0x0A, 0x14, 0x0E,
    0x0F, 0x0C, 0x10, 0x17, 0x14, 0x18, 0x18, 0x17, 0x14, 0x16, 0x16, 0x1A,
    0x1D, 0x25, 0x1F, 0x1A, 0x1B, 0x23, 0x1C, 0x16, 0x16, 0x20, 0x2C, 0x20,
    0x23, 0x26, 0x27, 0x29, 0x2A, 0x29, 0x19, 0x1F, 0x2D, 0x30, 0x2D, 0x28,
    0x30, 0x25, 0x28, 0x29, 0x28, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0xF0,
    0x01, 0x40, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00, 0xD2, 0x00, 0x00,
    0x01, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    0x09, 0x0A, 0x0B, 0x10, 0x00, 0x02, 0x01, 0x03, 0x03, 0x02, 0x04, 0x03,
    0x05, 0x05, 0x04, 0x04, 0x00, 0x00, 0x01, 0x7D, 0x01, 0x02, 0x03, 0x00,
    0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1,
    0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16,
    0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35,
    0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65,
    0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94,
    0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA,
    0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4,
    0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6,
    0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00,
];

/// Prebaked color JPEG header, quality 50, luma subsampled 2x1
const COLOR_Q50_HEADER: [u8; 334] = [
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43,
    0x00, 0x10, 0x0B, 0x0C, 0x0E, 0x0C, 0x0A, 0x10, 0x0E, 0x0D, 0x0E, 0x12,
    0x11, 0x10, 0x13, 0x18, 0x28, 0x1A, 0x18, 0x16, 0x16, 0x18, 0x31, 0x23,
    0x25, 0x1D, 0x28, 0x3A, 0x33, 0x3D, 0x3C, 0x39, 0x33, 0x38, 0x37, 0x40,
    0x48, 0x5C, 0x4E, 0x40, 0x44, 0x57, 0x45, 0x37, 0x38, 0x50, 0x6D, 0x51,
    0x57, 0x5F, 0x62, 0x67, 0x68, 0x67, 0x3E, 0x4D, 0x71, 0x79, 0x70, 0x64,
    0x78, 0x5C, 0x65, 0x67, 0x63, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0xF0,
    0x01, 0x40, 0x03, 0x01, 0x21, 0x00, 0x02, 0x11, 0x00, 0x03, 0x11, 0x00,
    0xFF, 0xC4, 0x00, 0xD2, 0x00, 0x00, 0x01, 0x05, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02,
    0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x10, 0x00, 0x02,
    0x01, 0x03, 0x03, 0x02, 0x04, 0x03, 0x05, 0x05, 0x04, 0x04, 0x00, 0x00,
    0x01, 0x7D, 0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31,
    0x41, 0x06, 0x13, 0x51, 0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91,
    0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33,
    0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26,
    0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43,
    0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57,
    0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73,
    0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A,
    0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4,
    0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7,
    0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA,
    0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2,
    0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA, 0xFF, 0xDA, 0x00, 0x0C,
    0x03, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x3F, 0x00,
];

/// Select the grayscale header template for an embedded quality byte
///
/// # Errors
///
/// Returns `RepairError::UnsupportedQuality` for anything other than
/// [`LEGACY_QUALITY`], 50 or 80.
pub fn gray_header_for_quality(quality: u8) -> Result<&'static [u8]> {
    match quality {
        LEGACY_QUALITY | 50 => Ok(&GRAY_Q50_HEADER),
        80 => Ok(&GRAY_Q80_HEADER),
        other => Err(RepairError::UnsupportedQuality(other)),
    }
}

/// Convert a fully assembled minimized gray frame into a standard JPEG
///
/// # Errors
///
/// Returns `RepairError::UnsupportedQuality` if byte 0 names a quality with no
/// header template.
pub fn mini_gray_to_jpeg(raw: &[u8], height: u16, width: u16) -> Result<Vec<u8>> {
    let quality = raw.first().copied().unwrap_or(LEGACY_QUALITY);
    let header = gray_header_for_quality(quality).inspect_err(|e| {
        log::error!("EncodedImage.MiniGrayToJpeg: {}", e);
    })?;
    repair_common(raw, height, width, header)
}

/// Convert a fully assembled minimized color frame into a standard JPEG
///
/// `width` is the transmitted width, which is half the nominal image width.
///
/// # Errors
///
/// Only fails if the built-in color template were malformed.
pub fn mini_color_to_jpeg(raw: &[u8], height: u16, width: u16) -> Result<Vec<u8>> {
    repair_common(raw, height, width, &COLOR_Q50_HEADER)
}

/// Locate the big-endian height field of the first SOF segment in a header
///
/// Walks the marker segments after SOI. The width field follows two bytes
/// after the returned offset.
pub fn sof_dimension_offset(header: &[u8]) -> Option<usize> {
    if header.len() < 2 || header[0] != 0xFF || header[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= header.len() {
        if header[pos] != 0xFF {
            return None;
        }
        let marker = header[pos + 1];
        match marker {
            // SOF0..SOF2: [FF Cx][len:2][precision:1][height:2][width:2]
            0xC0..=0xC2 => {
                let offset = pos + 5;
                return (offset + 4 <= header.len()).then_some(offset);
            }
            // Start of scan: no SOF seen before the entropy data
            0xDA => return None,
            _ => {
                let len = u16::from_be_bytes([header[pos + 2], header[pos + 3]]) as usize;
                pos += 2 + len;
            }
        }
    }
    None
}

/// Assemble a JPEG from a header template and minimized scan data
///
/// Trailing `0xFF` padding is trimmed, byte 0 is skipped, every literal `0xFF`
/// is followed by a stuffed `0x00`, and an EOI marker is appended.
///
/// # Errors
///
/// Returns `RepairError::MissingSofMarker` if `header` has no SOF segment.
pub fn repair_common(raw: &[u8], height: u16, width: u16, header: &[u8]) -> Result<Vec<u8>> {
    let offset = sof_dimension_offset(header).ok_or(RepairError::MissingSofMarker)?;

    let mut out = Vec::with_capacity(raw.len() * 2 + header.len() + EOI_MARKER.len());
    out.extend_from_slice(header);
    out[offset..offset + 2].copy_from_slice(&height.to_be_bytes());
    out[offset + 2..offset + 4].copy_from_slice(&width.to_be_bytes());

    let end = raw.iter().rposition(|&b| b != 0xFF).map_or(0, |i| i + 1);
    for &byte in raw.get(1..end).unwrap_or(&[]) {
        out.push(byte);
        if byte == 0xFF {
            out.push(0x00);
        }
    }

    out.extend_from_slice(&EOI_MARKER);
    Ok(out)
}
