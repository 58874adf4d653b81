//! A minimal symbolic-score model read from standard MIDI files.
//!
//! Only what melody extraction needs is kept: per-track names, note events,
//! program changes and tempo, each with its delta time in ticks. Everything
//! else is kept as [`EventKind::Other`] so absolute times stay correct.

use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::error::{MelodyError, MelodyResult};

/// General MIDI percussion channel (channel 10, zero-based 9).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Tempo assumed when a score has no tempo event.
pub const DEFAULT_BPM: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// Microseconds per beat.
    Tempo(u32),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEvent {
    /// Ticks since the previous event in the same track.
    pub delta: u32,
    pub kind: EventKind,
}

impl ScoreEvent {
    #[must_use]
    pub const fn new(delta: u32, kind: EventKind) -> Self {
        Self { delta, kind }
    }

    #[must_use]
    pub const fn is_note(&self) -> bool {
        matches!(
            self.kind,
            EventKind::NoteOn { .. } | EventKind::NoteOff { .. }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreTrack {
    pub name: Option<String>,
    pub events: Vec<ScoreEvent>,
}

impl ScoreTrack {
    #[must_use]
    pub fn new(name: Option<&str>, events: Vec<ScoreEvent>) -> Self {
        Self {
            name: name.map(String::from),
            events,
        }
    }

    /// Number of note-on and note-off events.
    #[must_use]
    pub fn note_event_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_note()).count()
    }

    /// Whether any note event is addressed to `channel`.
    #[must_use]
    pub fn has_notes_on_channel(&self, channel: u8) -> bool {
        self.events.iter().any(|e| match e.kind {
            EventKind::NoteOn { channel: c, .. } | EventKind::NoteOff { channel: c, .. } => {
                c == channel
            }
            _ => false,
        })
    }

    /// Heuristic: a program change sent to the percussion channel marks a
    /// drum track.
    #[must_use]
    pub fn is_percussion(&self) -> bool {
        self.events.iter().any(|e| {
            matches!(
                e.kind,
                EventKind::ProgramChange {
                    channel: PERCUSSION_CHANNEL,
                    ..
                }
            )
        })
    }

    /// Track name trimmed and lower-cased, empty when unnamed.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        self.name
            .as_deref()
            .map(|n| n.trim().to_lowercase())
            .unwrap_or_default()
    }
}

/// A parsed multi-track score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub ticks_per_beat: u16,
    pub tracks: Vec<ScoreTrack>,
}

impl Score {
    /// Read and parse a standard MIDI file.
    pub fn open(path: &Path) -> MelodyResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Parse standard MIDI file bytes.
    ///
    /// A note-on with velocity zero is read as a note-off.
    pub fn parse(bytes: &[u8]) -> MelodyResult<Self> {
        let smf = Smf::parse(bytes).map_err(|e| MelodyError::Parse(e.to_string()))?;

        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int(),
            Timing::Timecode(..) => return Err(MelodyError::UnsupportedTiming),
        };

        let tracks = smf
            .tracks
            .iter()
            .map(|track| {
                let mut name = None;
                let events = track
                    .iter()
                    .map(|event| {
                        let kind = match event.kind {
                            TrackEventKind::Midi { channel, message } => {
                                convert_midi(channel.as_int(), message)
                            }
                            TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
                                if name.is_none() {
                                    name = Some(String::from_utf8_lossy(raw).into_owned());
                                }
                                EventKind::Other
                            }
                            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                                EventKind::Tempo(tempo.as_int())
                            }
                            _ => EventKind::Other,
                        };
                        ScoreEvent::new(event.delta.as_int(), kind)
                    })
                    .collect();
                ScoreTrack { name, events }
            })
            .collect();

        Ok(Self {
            ticks_per_beat,
            tracks,
        })
    }

    /// Tempo of the first tempo event in any track, in beats per minute.
    ///
    /// Window sizing only depends on ticks per beat, so a missing tempo is
    /// informational.
    pub fn tempo_bpm(&self) -> MelodyResult<f64> {
        self.tracks
            .iter()
            .flat_map(|track| track.events.iter())
            .find_map(|event| match event.kind {
                EventKind::Tempo(micros) if micros > 0 => Some(60_000_000.0 / f64::from(micros)),
                _ => None,
            })
            .ok_or(MelodyError::MissingTempo)
    }
}

fn convert_midi(channel: u8, message: MidiMessage) -> EventKind {
    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => EventKind::NoteOff {
            channel,
            key: key.as_int(),
            velocity: 0,
        },
        MidiMessage::NoteOn { key, vel } => EventKind::NoteOn {
            channel,
            key: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::NoteOff { key, vel } => EventKind::NoteOff {
            channel,
            key: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::ProgramChange { program } => EventKind::ProgramChange {
            channel,
            program: program.as_int(),
        },
        _ => EventKind::Other,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers that synthesise MIDI bytes for tests.

    use midly::num::{u15, u24, u28, u4, u7};
    use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

    /// A note event for [`smf_bytes`]: `(delta, channel, key, velocity, on)`.
    pub type Note = (u32, u8, u8, u8, bool);

    pub fn smf_bytes(tpb: u16, tracks: &[(Option<&str>, Vec<Note>)], tempo: Option<u32>) -> Vec<u8> {
        let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(u15::new(tpb))));
        for (i, (name, notes)) in tracks.iter().enumerate() {
            let mut track = Vec::new();
            if let Some(name) = name {
                track.push(TrackEvent {
                    delta: u28::new(0),
                    kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
                });
            }
            if i == 0 {
                if let Some(micros) = tempo {
                    track.push(TrackEvent {
                        delta: u28::new(0),
                        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros))),
                    });
                }
            }
            for &(delta, channel, key, vel, on) in notes {
                let message = if on {
                    MidiMessage::NoteOn {
                        key: u7::new(key),
                        vel: u7::new(vel),
                    }
                } else {
                    MidiMessage::NoteOff {
                        key: u7::new(key),
                        vel: u7::new(vel),
                    }
                };
                track.push(TrackEvent {
                    delta: u28::new(delta),
                    kind: TrackEventKind::Midi {
                        channel: u4::new(channel),
                        message,
                    },
                });
            }
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            });
            smf.tracks.push(track);
        }
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }
}
