//! Sliding-window segmentation and interval-histogram fingerprints.
//!
//! A melody is cut into heavily overlapping windows (by default 40 beats
//! long, advancing 4 beats at a time) and each non-empty window becomes one
//! [`HistogramTriple`].

use cantus_core::model::histogram::{interval_bin, pitch_bin, ATB_BINS, INTERVAL_BINS};
use cantus_core::model::{Fingerprint, HistogramTriple, MelodyEvent};

use crate::error::{FingerprintError, FingerprintResult};
use crate::melody::MelodyLine;

pub const DEFAULT_INTERVAL_BEATS: u32 = 40;
pub const DEFAULT_STRIDE_BEATS: u32 = 4;

/// Window length and stride in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    interval: u64,
    stride: u64,
}

impl WindowSpec {
    /// Both values must be positive and the stride may not exceed the
    /// interval, otherwise events between windows would be skipped.
    pub fn new(interval: u64, stride: u64) -> FingerprintResult<Self> {
        if interval == 0 || stride == 0 || stride > interval {
            return Err(FingerprintError::InvalidWindow { interval, stride });
        }
        Ok(Self { interval, stride })
    }

    pub fn from_beats(ticks_per_beat: u16, interval_beats: u32, stride_beats: u32) -> FingerprintResult<Self> {
        let tpb = u64::from(ticks_per_beat);
        Self::new(tpb * u64::from(interval_beats), tpb * u64::from(stride_beats))
    }

    #[must_use]
    pub const fn interval(&self) -> u64 {
        self.interval
    }

    #[must_use]
    pub const fn stride(&self) -> u64 {
        self.stride
    }
}

/// Events whose absolute times fall in `[start, start + interval)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    pub start: u64,
    pub events: &'a [MelodyEvent],
}

/// Cut `melody` into windows. Windows without events are left out, so the
/// start of consecutive windows differs by a positive multiple of the
/// stride.
#[must_use]
pub fn windows(melody: &[MelodyEvent], spec: WindowSpec) -> Vec<Window<'_>> {
    let Some(first) = melody.first() else {
        return Vec::new();
    };

    let n = melody.len();
    let mut result = Vec::new();
    let mut window_start = first.absolute_time;
    let mut pointer = 0;
    let mut seek = 0;

    loop {
        let end = window_start + spec.interval;
        let begin = pointer;
        while pointer < n && melody[pointer].absolute_time < end {
            pointer += 1;
        }

        if pointer > begin {
            result.push(Window {
                start: window_start,
                events: &melody[begin..pointer],
            });
        }

        if pointer >= n {
            break;
        }

        window_start += spec.stride;
        while seek < n && melody[seek].absolute_time < window_start {
            seek += 1;
        }
        pointer = seek;
    }

    result
}

/// Build the ATB/RTB/FTB histograms of one window.
///
/// RTB counts `previous - current` pitch differences between neighbours,
/// FTB counts `first - current` against the window's first event.
pub fn extract_features(window: &Window<'_>) -> FingerprintResult<HistogramTriple> {
    let events = window.events;
    let Some(first) = events.first() else {
        return Err(FingerprintError::EmptyWindow);
    };

    let mut atb = [0u32; ATB_BINS];
    let mut rtb = [0u32; INTERVAL_BINS];
    let mut ftb = [0u32; INTERVAL_BINS];

    for event in events {
        if let Some(bin) = pitch_bin(event.pitch) {
            atb[bin] += 1;
        }
    }

    for pair in events.windows(2) {
        if let Some(bin) = interval_bin(pitch_difference(pair[0].pitch, pair[1].pitch)) {
            rtb[bin] += 1;
        }
    }

    for event in &events[1..] {
        if let Some(bin) = interval_bin(pitch_difference(first.pitch, event.pitch)) {
            ftb[bin] += 1;
        }
    }

    Ok(HistogramTriple::from_counts(&atb, &rtb, &ftb)?)
}

fn pitch_difference(from: u8, to: u8) -> i16 {
    i16::from(from) - i16::from(to)
}

/// Turns melodies into fingerprints with a window size measured in beats.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintExtractor {
    pub interval_beats: u32,
    pub stride_beats: u32,
}

impl Default for FingerprintExtractor {
    fn default() -> Self {
        Self {
            interval_beats: DEFAULT_INTERVAL_BEATS,
            stride_beats: DEFAULT_STRIDE_BEATS,
        }
    }
}

impl FingerprintExtractor {
    #[must_use]
    pub const fn new(interval_beats: u32, stride_beats: u32) -> Self {
        Self {
            interval_beats,
            stride_beats,
        }
    }

    pub fn window_spec(&self, ticks_per_beat: u16) -> FingerprintResult<WindowSpec> {
        WindowSpec::from_beats(ticks_per_beat, self.interval_beats, self.stride_beats)
    }

    /// One histogram triple per non-empty window of the melody.
    pub fn fingerprint(&self, line: &MelodyLine) -> FingerprintResult<Fingerprint> {
        let spec = self.window_spec(line.ticks_per_beat)?;
        fingerprint_with(&line.events, spec)
    }
}

/// Fingerprint `melody` with an explicit window spec.
pub fn fingerprint_with(melody: &[MelodyEvent], spec: WindowSpec) -> FingerprintResult<Fingerprint> {
    windows(melody, spec)
        .iter()
        .map(extract_features)
        .collect::<FingerprintResult<Vec<_>>>()
        .map(Fingerprint::new)
}
