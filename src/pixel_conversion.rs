//! Pixel layout conversions between gray and RGB buffers
//!
//! Pure Rust helpers used by the decoder to bring a decoded image into the
//! caller's requested pixel format.
//!
//! # Supported Conversions
//!
//! - **Pass-through**: gray to gray, RGB to RGB (size validated, copied)
//! - **Gray to RGB**: channel replication
//! - **RGB to Gray**: BT.601 luminance
//! - **Horizontal padding**: constant border added to both sides of a frame

/// Error type for conversion failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError(pub String);

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConversionError {}

impl From<String> for ConversionError {
    fn from(s: String) -> Self {
        ConversionError(s)
    }
}

/// Check that `data` holds at least one full frame and return its exact size
fn expected_len(
    data: &[u8],
    width: u32,
    height: u32,
    channels: u32,
    label: &str,
) -> Result<usize, ConversionError> {
    let expected = width as usize * height as usize * channels as usize;
    if data.len() < expected {
        return Err(ConversionError(format!(
            "{} data too small: {} bytes, expected {} for {}x{}",
            label,
            data.len(),
            expected,
            width,
            height
        )));
    }
    Ok(expected)
}

/// Pass through pixel data unchanged
///
/// # Arguments
///
/// * `data` - Raw pixel data
/// * `width` - Frame width in pixels
/// * `height` - Frame height in pixels
/// * `channels` - Bytes per pixel (1 for gray, 3 for RGB)
///
/// # Returns
///
/// A copy of exactly one frame of the input, with trailing bytes dropped
///
/// # Errors
/// Returns `ConversionError` if the input data is too small for the specified dimensions.
pub fn pass_through(
    data: &[u8],
    width: u32,
    height: u32,
    channels: u32,
) -> Result<Vec<u8>, ConversionError> {
    let expected = expected_len(data, width, height, channels, "Pixel")?;
    Ok(data[..expected].to_vec())
}

/// Convert 8-bit gray to interleaved RGB by replicating each sample
///
/// # Errors
/// Returns `ConversionError` if the input data is too small for the specified dimensions.
pub fn gray_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConversionError> {
    let expected = expected_len(data, width, height, 1, "Gray")?;

    let mut rgb = Vec::with_capacity(expected * 3);
    for &y in &data[..expected] {
        rgb.extend_from_slice(&[y, y, y]);
    }

    Ok(rgb)
}

/// Convert interleaved RGB to 8-bit gray
///
/// Uses BT.601 luma weights scaled by 256 for integer math:
/// Y = (77 * R + 150 * G + 29 * B + 128) >> 8
///
/// # Errors
/// Returns `ConversionError` if the input data is too small for the specified dimensions.
pub fn rgb_to_gray(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConversionError> {
    let expected = expected_len(data, width, height, 3, "RGB")?;

    let gray = data[..expected]
        .chunks_exact(3)
        .map(|px| {
            let y = 77 * px[0] as u32 + 150 * px[1] as u32 + 29 * px[2] as u32 + 128;
            (y >> 8) as u8
        })
        .collect();

    Ok(gray)
}

/// Add `pad` columns of `value` to the left and right of every row
///
/// # Arguments
///
/// * `data` - Interleaved pixel data
/// * `width` - Frame width in pixels before padding
/// * `height` - Frame height in pixels
/// * `channels` - Bytes per pixel
/// * `pad` - Columns to add on each side
/// * `value` - Byte written into every padded sample
///
/// # Returns
///
/// A frame `width + 2 * pad` pixels wide
///
/// # Errors
/// Returns `ConversionError` if the input data is too small for the specified
/// dimensions, or if the padded size overflows.
pub fn pad_horizontal(
    data: &[u8],
    width: u32,
    height: u32,
    channels: u32,
    pad: u32,
    value: u8,
) -> Result<Vec<u8>, ConversionError> {
    let expected = expected_len(data, width, height, channels, "Padding source")?;

    let row_len = width as usize * channels as usize;
    let pad_len = (pad as usize).checked_mul(channels as usize);
    let border_total = pad_len
        .and_then(|len| len.checked_mul(2))
        .and_then(|len| len.checked_mul(height as usize));
    let (pad_len, total) = match (pad_len, border_total.and_then(|b| b.checked_add(expected))) {
        (Some(pad_len), Some(total)) => (pad_len, total),
        _ => {
            return Err(ConversionError(format!(
                "Padding of {} columns overflows a {}x{} frame",
                pad, width, height
            )))
        }
    };
    let border = vec![value; pad_len];

    let mut padded = Vec::with_capacity(total);
    if row_len == 0 {
        padded.resize(total, value);
        return Ok(padded);
    }
    for row in data[..expected].chunks_exact(row_len) {
        padded.extend_from_slice(&border);
        padded.extend_from_slice(row);
        padded.extend_from_slice(&border);
    }

    Ok(padded)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through_copies_one_frame() {
        let data: Vec<u8> = (0..30).collect();

        let output = pass_through(&data, 4, 2, 3).unwrap();
        assert_eq!(output.len(), 24);
        assert_eq!(output, &data[..24]);

        let gray = pass_through(&data, 5, 6, 1).unwrap();
        assert_eq!(gray, data);
    }

    #[test]
    fn test_pass_through_rejects_too_small() {
        let data = vec![0u8; 100];
        let err = pass_through(&data, 640, 480, 3).unwrap_err();
        assert!(err.0.contains("too small"), "Error should mention size: {}", err);
    }

    #[test]
    fn test_gray_to_rgb_replicates() {
        let rgb = gray_to_rgb(&[10, 200], 2, 1).unwrap();
        assert_eq!(rgb, vec![10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn test_gray_to_rgb_rejects_too_small() {
        assert!(gray_to_rgb(&[1, 2, 3], 2, 2).is_err());
    }

    #[test]
    fn test_rgb_to_gray_luminance() {
        let rgb = vec![
            0, 0, 0, // black
            255, 255, 255, // white
            255, 0, 0, // red
            0, 255, 0, // green
            0, 0, 255, // blue
            128, 128, 128, // mid-gray
        ];

        let gray = rgb_to_gray(&rgb, 6, 1).unwrap();
        assert_eq!(gray[0], 0);
        assert_eq!(gray[1], 255);
        assert_eq!(gray[2], 77);
        assert_eq!(gray[3], 149);
        assert_eq!(gray[4], 29);
        assert_eq!(gray[5], 128);
    }

    #[test]
    fn test_rgb_to_gray_rejects_too_small() {
        assert!(rgb_to_gray(&[0u8; 5], 2, 1).is_err());
    }

    #[test]
    fn test_gray_round_trip_is_identity() {
        let gray: Vec<u8> = (0..=255).collect();
        let rgb = gray_to_rgb(&gray, 16, 16).unwrap();
        assert_eq!(rgb_to_gray(&rgb, 16, 16).unwrap(), gray);
    }

    #[test]
    fn test_pad_horizontal_rgb() {
        let data = vec![
            1, 2, 3, 4, 5, 6, // row 0
            7, 8, 9, 10, 11, 12, // row 1
        ];

        let padded = pad_horizontal(&data, 2, 2, 3, 1, 0).unwrap();
        assert_eq!(padded.len(), 4 * 2 * 3);
        assert_eq!(
            padded,
            vec![
                0, 0, 0, 1, 2, 3, 4, 5, 6, 0, 0, 0, //
                0, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn test_pad_horizontal_zero_pad() {
        let data = vec![5u8; 6];
        assert_eq!(pad_horizontal(&data, 3, 2, 1, 0, 0).unwrap(), data);
    }

    #[test]
    fn test_pad_horizontal_empty_width() {
        let padded = pad_horizontal(&[], 0, 2, 1, 3, 9).unwrap();
        assert_eq!(padded, vec![9u8; 12]);
    }

    #[test]
    fn test_pad_horizontal_overflow_is_an_error() {
        // Zero-width source, so only the border size can overflow
        let result = pad_horizontal(&[], 0, u32::MAX, u32::MAX, u32::MAX, 0);
        assert!(matches!(result, Err(ConversionError(msg)) if msg.contains("overflows")));
    }

    #[test]
    fn test_conversion_error_display() {
        let err = ConversionError("test error message".to_string());
        assert_eq!(format!("{}", err), "test error message");
    }
}
