use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{MIN_REGION_SIZE, STRONG_BLOCK_SIZE};
use crate::shared::error::RedactError;
use crate::shared::normalized_rect::NormalizedRect;

/// Redaction strength. Each variant maps to a square block edge in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MosaicIntensity {
    #[default]
    Strong,
}

impl MosaicIntensity {
    pub const ALL: &[MosaicIntensity] = &[MosaicIntensity::Strong];

    pub fn block_size(self) -> u32 {
        match self {
            MosaicIntensity::Strong => STRONG_BLOCK_SIZE,
        }
    }
}

impl fmt::Display for MosaicIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MosaicIntensity::Strong => write!(f, "Strong"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mosaic intensity '{0}' (expected one of: strong)")]
pub struct ParseIntensityError(String);

impl FromStr for MosaicIntensity {
    type Err = ParseIntensityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strong" => Ok(MosaicIntensity::Strong),
            _ => Err(ParseIntensityError(s.to_string())),
        }
    }
}

/// A rectangle marked for pixelation.
///
/// Inactive regions stay in the store but are skipped when deriving the
/// output image. Equality is structural and only used to notice that the
/// region set changed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub rect: NormalizedRect,
    #[serde(default)]
    pub intensity: MosaicIntensity,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Region {
    pub fn new(rect: NormalizedRect, intensity: MosaicIntensity) -> Self {
        Self {
            rect,
            intensity,
            active: true,
        }
    }

    /// Checks the minimum-size guard applied to interactively drawn regions.
    pub fn validate_selection(rect: &NormalizedRect) -> Result<(), RedactError> {
        if rect.exceeds(MIN_REGION_SIZE) {
            Ok(())
        } else {
            Err(RedactError::DegenerateRegion {
                width: rect.width(),
                height: rect.height(),
                min: MIN_REGION_SIZE,
            })
        }
    }

    pub fn block_size(&self) -> u32 {
        self.intensity.block_size()
    }
}
