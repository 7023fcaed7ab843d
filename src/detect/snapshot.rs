use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::ImageFormat;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::frame::Frame;

/// Writes the one-off detection snapshot: a square, downsampled RGB PNG.
#[derive(Clone, Debug)]
pub struct SnapshotWriter {
    path: PathBuf,
    size: u32,
}

/// What was written, for the detection log line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Hex SHA-256 of the encoded PNG bytes.
    pub sha256: String,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>, size: u32) -> Self {
        Self {
            path: path.into(),
            size: size.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Downsample `frame` to `size` x `size` and write it as PNG.
    pub fn write(&self, frame: &Frame) -> Result<SnapshotRecord> {
        let rgb = frame.to_rgb_image();
        let small = imageops::resize(&rgb, self.size, self.size, FilterType::Triangle);

        let mut encoded = Vec::new();
        small
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .context("encode snapshot png")?;
        std::fs::write(&self.path, &encoded)
            .with_context(|| format!("write snapshot {}", self.path.display()))?;

        Ok(SnapshotRecord {
            path: self.path.clone(),
            width: small.width(),
            height: small.height(),
            sha256: hex::encode(Sha256::digest(&encoded)),
        })
    }
}
