//! Assembler configuration
//!
//! Defaults match the robot firmware. Each field can be overridden through an
//! environment variable or loaded from JSON.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `ENCODED_IMAGE_MAX_CHUNK_SIZE` | `max_chunk_size` | 1200 |
//! | `ENCODED_IMAGE_HALF_WIDTH_PADDING` | `half_width_padding` | 160 |
//! | `ENCODED_IMAGE_SAVE_QUALITY` | `save_quality` | 95 |

use serde::{Deserialize, Serialize};

use crate::chunk::MAX_CHUNK_SIZE;

/// Environment variable overriding [`AssemblerConfig::max_chunk_size`]
pub const MAX_CHUNK_SIZE_VAR: &str = "ENCODED_IMAGE_MAX_CHUNK_SIZE";
/// Environment variable overriding [`AssemblerConfig::half_width_padding`]
pub const HALF_WIDTH_PADDING_VAR: &str = "ENCODED_IMAGE_HALF_WIDTH_PADDING";
/// Environment variable overriding [`AssemblerConfig::save_quality`]
pub const SAVE_QUALITY_VAR: &str = "ENCODED_IMAGE_SAVE_QUALITY";

/// Default black border added to each side of half-width frames
pub const DEFAULT_HALF_WIDTH_PADDING: u32 = 160;
/// Largest accepted border; a padded frame must still fit a `u16` width
pub const MAX_HALF_WIDTH_PADDING: u32 = u16::MAX as u32;
/// Default JPEG quality used when re-encoding minimized color frames on save
pub const DEFAULT_SAVE_QUALITY: u8 = 95;

/// Tunables for assembly, decoding and saving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Largest chunk payload accepted, in bytes
    pub max_chunk_size: usize,
    /// Columns of black added on each side of a `JpegColorHalfWidth` frame
    pub half_width_padding: u32,
    /// JPEG quality (1-100) for re-encoded minimized color frames
    pub save_quality: u8,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: MAX_CHUNK_SIZE,
            half_width_padding: DEFAULT_HALF_WIDTH_PADDING,
            save_quality: DEFAULT_SAVE_QUALITY,
        }
    }
}

impl AssemblerConfig {
    /// Load configuration from the process environment
    ///
    /// Unset variables keep their default. Unparsable or out-of-range values
    /// are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            max_chunk_size: parse_var(MAX_CHUNK_SIZE_VAR, lookup(MAX_CHUNK_SIZE_VAR))
                .unwrap_or(defaults.max_chunk_size),
            half_width_padding: parse_var(HALF_WIDTH_PADDING_VAR, lookup(HALF_WIDTH_PADDING_VAR))
                .unwrap_or(defaults.half_width_padding),
            save_quality: parse_var(SAVE_QUALITY_VAR, lookup(SAVE_QUALITY_VAR))
                .unwrap_or(defaults.save_quality),
        }
        .validated()
    }

    /// Parse configuration from JSON; missing fields keep their default
    ///
    /// Out-of-range values are replaced the same way as in [`Self::from_lookup`].
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid JSON for this structure.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::validated)
    }

    /// Replace out-of-range fields with their defaults, warning for each
    #[must_use]
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        let mut config = self;

        if config.max_chunk_size == 0 {
            log::warn!("{} must be nonzero, using default", MAX_CHUNK_SIZE_VAR);
            config.max_chunk_size = defaults.max_chunk_size;
        }

        if config.half_width_padding > MAX_HALF_WIDTH_PADDING {
            log::warn!(
                "{}={} exceeds {}, using default {}",
                HALF_WIDTH_PADDING_VAR,
                config.half_width_padding,
                MAX_HALF_WIDTH_PADDING,
                defaults.half_width_padding
            );
            config.half_width_padding = defaults.half_width_padding;
        }

        if !(1..=100).contains(&config.save_quality) {
            log::warn!(
                "{}={} is outside 1-100, using default {}",
                SAVE_QUALITY_VAR,
                config.save_quality,
                defaults.save_quality
            );
            config.save_quality = defaults.save_quality;
        }

        config
    }
}

/// Parse one variable, warning on garbage
fn parse_var<T: std::str::FromStr>(name: &str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Invalid value '{}' for {}, using default", value, name);
            None
        }
    }
}
