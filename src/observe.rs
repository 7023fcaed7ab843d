//! Color observer.
//!
//! Classifies the averaged camera color against a fixed palette and remembers
//! which palette colors have ever been seen. Entries are checked in palette
//! order (red, green, blue); the first whose channel strictly dominates the
//! other two and strictly exceeds its minimum wins.

use std::fmt;

use crate::config::PaletteSettings;
use crate::frame::Rgb;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaletteColor {
    Red,
    Green,
    Blue,
}

impl PaletteColor {
    /// Priority order used for classification and for the seen summary.
    pub const ALL: [PaletteColor; 3] = [
        PaletteColor::Red,
        PaletteColor::Green,
        PaletteColor::Blue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PaletteColor::Red => "red",
            PaletteColor::Green => "green",
            PaletteColor::Blue => "blue",
        }
    }

    fn channel(self, rgb: &Rgb) -> f64 {
        match self {
            PaletteColor::Red => rgb.red,
            PaletteColor::Green => rgb.green,
            PaletteColor::Blue => rgb.blue,
        }
    }
}

impl fmt::Display for PaletteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaletteEntry {
    pub color: PaletteColor,
    pub min_intensity: f64,
    ever_seen: bool,
}

impl PaletteEntry {
    pub fn ever_seen(&self) -> bool {
        self.ever_seen
    }

    fn matches(&self, rgb: &Rgb) -> bool {
        let own = self.color.channel(rgb);
        own > self.min_intensity
            && PaletteColor::ALL
                .iter()
                .filter(|&&other| other != self.color)
                .all(|other| own > other.channel(rgb))
    }
}

/// Result of one observation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Observation {
    pub detected: Option<PaletteColor>,
    /// True only on the observation that first saw `detected`.
    pub newly_seen: bool,
}

#[derive(Clone, Debug)]
pub struct ColorObserver {
    entries: Vec<PaletteEntry>,
}

impl ColorObserver {
    pub fn new(settings: &PaletteSettings) -> Self {
        let entries = PaletteColor::ALL
            .iter()
            .map(|&color| PaletteEntry {
                color,
                min_intensity: match color {
                    PaletteColor::Red => settings.red_min,
                    PaletteColor::Green => settings.green_min,
                    PaletteColor::Blue => settings.blue_min,
                },
                ever_seen: false,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// Pure classification; does not touch the seen record.
    pub fn classify(&self, rgb: &Rgb) -> Option<PaletteColor> {
        self.entries
            .iter()
            .find(|entry| entry.matches(rgb))
            .map(|entry| entry.color)
    }

    /// Classify and record the sighting.
    pub fn observe(&mut self, rgb: &Rgb) -> Observation {
        let Some(color) = self.classify(rgb) else {
            return Observation::default();
        };
        let mut newly_seen = false;
        if let Some(entry) = self.entries.iter_mut().find(|e| e.color == color) {
            if !entry.ever_seen {
                entry.ever_seen = true;
                newly_seen = true;
            }
        }
        Observation {
            detected: Some(color),
            newly_seen,
        }
    }

    pub fn has_seen(&self, color: PaletteColor) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.color == color && entry.ever_seen)
    }

    /// Every color seen so far, in palette order.
    pub fn seen_summary(&self) -> Vec<PaletteColor> {
        self.entries
            .iter()
            .filter(|entry| entry.ever_seen)
            .map(|entry| entry.color)
            .collect()
    }
}
