//! Camera frame container.
//!
//! - `Frame`: owned pixel grid fetched once per cycle. Bytes are private.
//! - `Rgb`: averaged color sample used by the color observer.
//!
//! Pixels are stored in the camera's native channel order: channel 0 is blue,
//! channel 1 is green, channel 2 is red, and an optional channel 3 is alpha.
//! A frame belongs to the cycle that fetched it and is never retained past it;
//! `Frame` has no `Clone` impl.

use anyhow::{anyhow, Result};
use image::{DynamicImage, RgbImage};

/// Minimum number of channels a camera frame must carry (B, G, R).
pub const MIN_CHANNELS: u8 = 3;

pub const BLUE: usize = 0;
pub const GREEN: usize = 1;
pub const RED: usize = 2;

// ----------------------------------------------------------------------------
// Rgb: averaged color sample
// ----------------------------------------------------------------------------

/// Averaged red/green/blue intensities, each in 0.0..=255.0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Rgb {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }
}

// ----------------------------------------------------------------------------
// Frame: owned pixel grid
// ----------------------------------------------------------------------------

/// A decoded camera image. No `Clone`, no `AsRef<[u8]>`.
pub struct Frame {
    /// Row-major pixel bytes, `channels` bytes per pixel.
    data: Vec<u8>,

    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    /// Wrap a raw buffer. Fails on fewer than three channels or a length that
    /// does not match `width * height * channels`.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self> {
        if channels < MIN_CHANNELS {
            return Err(anyhow!(
                "camera frame needs at least {} channels, got {}",
                MIN_CHANNELS,
                channels
            ));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels as u32))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))? as usize;
        if data.len() != expected {
            return Err(anyhow!(
                "frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// A BGRA frame with every pixel set to `bgr` and full alpha.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&[bgr[0], bgr[1], bgr[2], 255]);
        }
        Self {
            data,
            width,
            height,
            channels: 4,
        }
    }

    /// Convert a decoded image into a three-channel BGR frame.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 3);
        for px in rgb.pixels() {
            data.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        Self {
            data,
            width,
            height,
            channels: 3,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Iterate pixels row-major; each item is one pixel's channel slice.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.data.chunks_exact(self.channels as usize)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let ch = self.channels as usize;
        let offset = ((y as usize) * (self.width as usize) + x as usize) * ch;
        self.data.get(offset..offset + ch)
    }

    /// Overwrite the color channels of one pixel. Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = ((y as usize) * (self.width as usize) + x as usize) * self.channels as usize;
        if let Some(px) = self.data.get_mut(offset..offset + 3) {
            px.copy_from_slice(&bgr);
        }
    }

    /// Average color over a `sample` x `sample` window centered in the frame.
    ///
    /// The window is clamped to the frame bounds; a sample of 0 reads the single
    /// center pixel.
    pub fn center_average(&self, sample: u32) -> Rgb {
        if self.width == 0 || self.height == 0 {
            return Rgb::default();
        }
        let side_x = sample.clamp(1, self.width);
        let side_y = sample.clamp(1, self.height);
        let x0 = (self.width - side_x) / 2;
        let y0 = (self.height - side_y) / 2;

        let mut sums = [0u64; 3];
        for y in y0..y0 + side_y {
            for x in x0..x0 + side_x {
                if let Some(px) = self.pixel(x, y) {
                    sums[BLUE] += px[BLUE] as u64;
                    sums[GREEN] += px[GREEN] as u64;
                    sums[RED] += px[RED] as u64;
                }
            }
        }
        let n = (side_x * side_y) as f64;
        Rgb {
            red: sums[RED] as f64 / n,
            green: sums[GREEN] as f64 / n,
            blue: sums[BLUE] as f64 / n,
        }
    }

    /// RGB copy of the color channels (alpha dropped) for encoding.
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width, self.height);
        for (dst, src) in out.pixels_mut().zip(self.pixels()) {
            *dst = image::Rgb([src[RED], src[GREEN], src[BLUE]]);
        }
        out
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
