use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::detect::result::MaskResult;
use crate::frame::{Frame, BLUE, GREEN, RED};

/// Per-pixel target classifier.
///
/// Implementations see one pixel's channel slice at a time (camera order,
/// channel 0 = blue) and must be pure: the same pixel always classifies the same.
pub trait PixelClassifier {
    /// Classifier identifier, used in logs.
    fn name(&self) -> &'static str;

    fn matches(&self, pixel: &[u8]) -> bool;

    /// Classify every pixel of `frame`.
    fn classify_frame(&self, frame: &Frame) -> MaskResult {
        let matching = frame.pixels().filter(|px| self.matches(px)).count();
        MaskResult {
            matching,
            total: frame.pixel_count(),
        }
    }
}

/// Open interval on one channel. A missing bound is unbounded on that side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange {
    /// Exclusive lower bound.
    #[serde(default)]
    pub above: Option<u8>,
    /// Exclusive upper bound.
    #[serde(default)]
    pub below: Option<u8>,
}

impl ChannelRange {
    pub const fn between(above: u8, below: u8) -> Self {
        Self {
            above: Some(above),
            below: Some(below),
        }
    }

    pub const fn below(below: u8) -> Self {
        Self {
            above: None,
            below: Some(below),
        }
    }

    pub fn contains(&self, value: u8) -> bool {
        self.above.map_or(true, |lo| value > lo) && self.below.map_or(true, |hi| value < hi)
    }

    fn validate(&self, channel: &str) -> Result<()> {
        if let (Some(lo), Some(hi)) = (self.above, self.below) {
            if hi <= lo.saturating_add(1) {
                return Err(anyhow!(
                    "target {} range ({}, {}) admits no value",
                    channel,
                    lo,
                    hi
                ));
            }
        }
        if self.below == Some(0) {
            return Err(anyhow!("target {} range below 0 admits no value", channel));
        }
        Ok(())
    }
}

/// Three-channel box rule for the brown/tan target material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBox {
    pub blue: ChannelRange,
    pub green: ChannelRange,
    pub red: ChannelRange,
}

impl Default for TargetBox {
    fn default() -> Self {
        Self {
            blue: ChannelRange::below(70),
            green: ChannelRange::between(30, 100),
            red: ChannelRange::between(80, 180),
        }
    }
}

impl TargetBox {
    pub fn validate(&self) -> Result<()> {
        self.blue.validate("blue")?;
        self.green.validate("green")?;
        self.red.validate("red")?;
        Ok(())
    }
}

impl PixelClassifier for TargetBox {
    fn name(&self) -> &'static str {
        "target_box"
    }

    fn matches(&self, pixel: &[u8]) -> bool {
        pixel.len() > RED
            && self.blue.contains(pixel[BLUE])
            && self.green.contains(pixel[GREEN])
            && self.red.contains(pixel[RED])
    }
}
