use serde::{Deserialize, Serialize};

/// Highest valid MIDI pitch / velocity value.
pub const MIDI_MAX: u8 = 127;

/// One onset or offset in a monophonic melody line.
///
/// Times are in score ticks. `delta_time` is the gap to the preceding event
/// as recorded during linearization; `absolute_time` is the running position
/// in the track and never decreases along a melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MelodyEvent {
    pub pitch: u8,
    pub delta_time: u64,
    pub is_onset: bool,
    pub absolute_time: u64,
    pub velocity: u8,
}

impl MelodyEvent {
    #[must_use]
    pub const fn onset(pitch: u8, delta_time: u64, absolute_time: u64, velocity: u8) -> Self {
        Self {
            pitch,
            delta_time,
            is_onset: true,
            absolute_time,
            velocity,
        }
    }

    #[must_use]
    pub const fn offset(pitch: u8, delta_time: u64, absolute_time: u64, velocity: u8) -> Self {
        Self {
            pitch,
            delta_time,
            is_onset: false,
            absolute_time,
            velocity,
        }
    }
}

/// Whether `events` has non-decreasing absolute times.
#[must_use]
pub fn is_time_ordered(events: &[MelodyEvent]) -> bool {
    events
        .windows(2)
        .all(|pair| pair[0].absolute_time <= pair[1].absolute_time)
}
