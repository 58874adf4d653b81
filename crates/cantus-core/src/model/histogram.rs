//! Interval-histogram fingerprints.
//!
//! A window of melody events is summarised by three normalized histograms:
//!
//! - **ATB** (Absolute Time Base): distribution of raw pitches, one bin per
//!   MIDI pitch `1..=127`.
//! - **RTB** (Relative Time Base): distribution of the pitch difference
//!   between each event and its predecessor in the window.
//! - **FTB** (First Time Base): distribution of the pitch difference between
//!   each event and the first event of the window.
//!
//! Differences are taken as `earlier - later`, so a falling interval is
//! positive. Interval histograms only count positive differences, one bin
//! per difference `1..=255`; unisons and rising intervals are not counted.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of ATB bins (pitches 1 through 127).
pub const ATB_BINS: usize = 127;

/// Number of RTB/FTB bins (differences 1 through 255).
pub const INTERVAL_BINS: usize = 255;

/// Bin index of `pitch` in an ATB histogram. Pitch 0 has no bin.
#[must_use]
pub fn pitch_bin(pitch: u8) -> Option<usize> {
    match pitch {
        1..=127 => Some(usize::from(pitch) - 1),
        _ => None,
    }
}

/// Bin index of a pitch difference in an RTB/FTB histogram. Zero and
/// negative differences have no bin.
#[must_use]
pub fn interval_bin(interval: i16) -> Option<usize> {
    match interval {
        1..=255 => usize::try_from(interval - 1).ok(),
        _ => None,
    }
}

/// Divide each count by the total. An all-zero count vector stays all-zero.
#[must_use]
pub fn normalize_counts(counts: &[u32]) -> Vec<f64> {
    let total: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    let total = total as f64;
    counts.iter().map(|&c| f64::from(c) / total).collect()
}

/// The three normalized histograms describing one melody window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTriple")]
pub struct HistogramTriple {
    pub atb: Vec<f64>,
    pub rtb: Vec<f64>,
    pub ftb: Vec<f64>,
}

#[derive(Deserialize)]
struct RawTriple {
    atb: Vec<f64>,
    rtb: Vec<f64>,
    ftb: Vec<f64>,
}

impl TryFrom<RawTriple> for HistogramTriple {
    type Error = Error;

    fn try_from(raw: RawTriple) -> Result<Self> {
        Self::new(raw.atb, raw.rtb, raw.ftb)
    }
}

impl HistogramTriple {
    /// Build a triple from already-normalized histograms, checking bin counts.
    pub fn new(atb: Vec<f64>, rtb: Vec<f64>, ftb: Vec<f64>) -> Result<Self> {
        if atb.len() != ATB_BINS {
            return Err(Error::InvalidData(format!(
                "ATB histogram has {} bins, expected {ATB_BINS}",
                atb.len()
            )));
        }
        for (name, hist) in [("RTB", &rtb), ("FTB", &ftb)] {
            if hist.len() != INTERVAL_BINS {
                return Err(Error::InvalidData(format!(
                    "{name} histogram has {} bins, expected {INTERVAL_BINS}",
                    hist.len()
                )));
            }
        }
        Ok(Self { atb, rtb, ftb })
    }

    /// Build a triple from raw bin counts, normalizing each histogram by its
    /// own total.
    pub fn from_counts(atb: &[u32], rtb: &[u32], ftb: &[u32]) -> Result<Self> {
        Self::new(
            normalize_counts(atb),
            normalize_counts(rtb),
            normalize_counts(ftb),
        )
    }
}

/// The ordered per-window histogram triples representing one musical item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint {
    windows: Vec<HistogramTriple>,
}

impl Fingerprint {
    #[must_use]
    pub fn new(windows: Vec<HistogramTriple>) -> Self {
        Self { windows }
    }

    #[must_use]
    pub fn windows(&self) -> &[HistogramTriple] {
        &self.windows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistogramTriple> {
        self.windows.iter()
    }
}

impl FromIterator<HistogramTriple> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = HistogramTriple>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Fingerprint {
    type Item = &'a HistogramTriple;
    type IntoIter = std::slice::Iter<'a, HistogramTriple>;

    fn into_iter(self) -> Self::IntoIter {
        self.windows.iter()
    }
}
