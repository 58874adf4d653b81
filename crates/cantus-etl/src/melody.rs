//! Melody track selection and monophonic linearization.
//!
//! The melodic voice of a score is picked by a simple policy (named voice
//! track, then the busiest non-percussion track on channel 0, then the
//! busiest track overall) and its note events are reduced to a single line
//! in which at most one pitch sounds at a time.

use std::path::Path;

use cantus_core::model::MelodyEvent;

use crate::error::{MelodyError, MelodyResult};
use crate::score::{EventKind, Score, ScoreTrack};

/// Track name (case-insensitive) that marks the melodic voice.
pub const MELODY_TRACK_NAME: &str = "voice";

/// A new note only interrupts the sounding one when it lies fewer than this
/// many semitones away.
pub const MAX_LEAP: u8 = 11;

/// Velocity used for synthetic note-offs.
const RELEASE_VELOCITY: u8 = 64;

/// The melody of one score.
#[derive(Debug, Clone, PartialEq)]
pub struct MelodyLine {
    pub track_index: usize,
    pub ticks_per_beat: u16,
    /// Tempo when the score declares one.
    pub bpm: Option<f64>,
    pub events: Vec<MelodyEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct MelodyExtractor;

impl MelodyExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Read a MIDI file and extract its melody line.
    pub fn extract_file(&self, path: &Path) -> MelodyResult<MelodyLine> {
        let score = Score::open(path)?;
        self.extract(&score)
    }

    pub fn extract(&self, score: &Score) -> MelodyResult<MelodyLine> {
        let track_index = self.choose_track(score)?;
        let bpm = match score.tempo_bpm() {
            Ok(bpm) => Some(bpm),
            Err(e) => {
                log::debug!("{e}; assuming default tempo");
                None
            }
        };
        let events = self.linearize(&score.tracks[track_index]);

        Ok(MelodyLine {
            track_index,
            ticks_per_beat: score.ticks_per_beat,
            bpm,
            events,
        })
    }

    /// Pick the index of the melodic track.
    pub fn choose_track(&self, score: &Score) -> MelodyResult<usize> {
        if let Some(index) = score
            .tracks
            .iter()
            .rposition(|track| track.normalized_name() == MELODY_TRACK_NAME)
        {
            return Ok(index);
        }

        let candidates = score.tracks.iter().enumerate().filter(|(_, track)| {
            !track.is_percussion() && track.has_notes_on_channel(0)
        });
        if let Some(index) = busiest(candidates) {
            return Ok(index);
        }

        busiest(score.tracks.iter().enumerate()).ok_or(MelodyError::NoMelodyTrack)
    }

    /// Reduce a track's note events to a monophonic melody.
    ///
    /// Simultaneous onsets keep the highest pitch. A later onset close to
    /// the sounding pitch cuts it short; one that leaps [`MAX_LEAP`] or more
    /// semitones is dropped and the sounding note continues.
    #[must_use]
    pub fn linearize(&self, track: &ScoreTrack) -> Vec<MelodyEvent> {
        let mut melody: Vec<MelodyEvent> = Vec::new();
        let mut active: Option<u8> = None;
        let mut absolute_time: u64 = 0;

        for event in &track.events {
            absolute_time += u64::from(event.delta);
            let delta = u64::from(event.delta);

            match (event.kind, active) {
                (EventKind::NoteOn { key, velocity, .. }, None) => {
                    active = Some(key);
                    melody.push(MelodyEvent::onset(key, delta, absolute_time, velocity));
                }
                (EventKind::NoteOn { key, .. }, Some(current)) if delta == 0 => {
                    if key > current {
                        active = Some(key);
                        if let Some(last) = melody.last_mut() {
                            last.pitch = key;
                        }
                    }
                }
                (EventKind::NoteOn { key, velocity, .. }, Some(current)) => {
                    if current.abs_diff(key) < MAX_LEAP {
                        melody.push(MelodyEvent::offset(
                            current,
                            delta,
                            absolute_time,
                            RELEASE_VELOCITY,
                        ));
                        melody.push(MelodyEvent::onset(key, 0, absolute_time, velocity));
                        active = Some(key);
                    } else {
                        log::trace!(
                            "Dropping note-on {} at {}: leap from {} too large",
                            key,
                            absolute_time,
                            current
                        );
                    }
                }
                (EventKind::NoteOff { key, velocity, .. }, Some(current)) if key == current => {
                    if let Some(last) = melody.last().copied() {
                        if last.pitch.abs_diff(key) < MAX_LEAP {
                            let gap = absolute_time - last.absolute_time;
                            melody.push(MelodyEvent::offset(key, gap, absolute_time, velocity));
                            active = None;
                        }
                    }
                }
                _ => {}
            }
        }

        melody
    }
}

/// Index of the track with the most note events; the earliest wins ties.
/// `None` when no track has any note event.
fn busiest<'a>(tracks: impl Iterator<Item = (usize, &'a ScoreTrack)>) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, track) in tracks {
        let count = track.note_event_count();
        if count > 0 && best.map_or(true, |(_, top)| count > top) {
            best = Some((index, count));
        }
    }
    best.map(|(index, _)| index)
}
