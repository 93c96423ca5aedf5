//! Coarse orbit regime classification from TLE mean motion

use serde::{Deserialize, Serialize};

/// Mean motion at or below this (rev/day) is treated as geosynchronous
pub const GEO_MAX_MEAN_MOTION: f64 = 1.1;

/// Mean motion at or below this (rev/day) and above the GEO limit is MEO
pub const MEO_MAX_MEAN_MOTION: f64 = 12.0;

/// Byte range of the mean motion field (columns 53-63) in TLE line 2
const MEAN_MOTION_COLUMNS: std::ops::Range<usize> = 52..63;

/// Orbit regime derived from mean motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Leo,
    Meo,
    Geo,
    Other,
}

impl Regime {
    pub const ALL: [Regime; 4] = [Regime::Leo, Regime::Meo, Regime::Geo, Regime::Other];

    pub fn label(&self) -> &'static str {
        match self {
            Regime::Leo => "LEO",
            Regime::Meo => "MEO",
            Regime::Geo => "GEO",
            Regime::Other => "OTHER",
        }
    }

    /// Classify a TLE line carrying the mean motion field.
    ///
    /// Never fails: a short line or an unparsable field yields `Other`.
    pub fn classify(line: &str) -> Regime {
        match mean_motion(line) {
            Some(mm) => Regime::from_mean_motion(mm),
            None => Regime::Other,
        }
    }

    /// Classify from mean motion in revolutions per day
    pub fn from_mean_motion(mean_motion: f64) -> Regime {
        if !mean_motion.is_finite() {
            Regime::Other
        } else if mean_motion <= GEO_MAX_MEAN_MOTION {
            Regime::Geo
        } else if mean_motion <= MEO_MAX_MEAN_MOTION {
            Regime::Meo
        } else {
            Regime::Leo
        }
    }

    /// Display color for map markers (RGB)
    pub fn color(&self) -> [u8; 3] {
        match self {
            Regime::Leo => [80, 160, 255],
            Regime::Meo => [0, 230, 130],
            Regime::Geo => [255, 220, 0],
            Regime::Other => [255, 130, 0],
        }
    }

    pub fn color32(&self) -> egui::Color32 {
        let [r, g, b] = self.color();
        egui::Color32::from_rgb(r, g, b)
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse the fixed-column mean motion field, in revolutions per day
pub fn mean_motion(line: &str) -> Option<f64> {
    let field = line.get(MEAN_MOTION_COLUMNS)?;
    field.trim().parse::<f64>().ok()
}
