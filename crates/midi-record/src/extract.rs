use crate::note::TimedNote;
use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// MIDI tempo when a file carries no tempo event (120 BPM).
pub const DEFAULT_MICROSECONDS_PER_BEAT: u32 = 500_000;

/// Parsed MIDI file context: timing, format, and tempo map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiFileContext {
    pub ppq: u16,
    pub format: u8,
    pub track_count: usize,
    pub tempo_changes: Vec<TempoChange>,
    pub time_signatures: Vec<TimeSignature>,
    pub total_ticks: u64,
    /// Notes still sounding at the end of their track.
    pub unclosed_notes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: u64,
    pub microseconds_per_beat: u32,
    pub bpm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSignature {
    pub tick: u64,
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    /// Length of one bar in ticks at the given resolution.
    pub fn bar_ticks(&self, ppq: u16) -> u64 {
        let denominator = self.denominator.max(1) as u64;
        (ppq as u64 * 4 * self.numerator.max(1) as u64) / denominator
    }
}

impl MidiFileContext {
    /// Convert an absolute tick to seconds, walking the tempo map.
    pub fn tick_to_seconds(&self, tick: u64) -> f64 {
        let ppq = self.ppq.max(1) as f64;
        let mut seconds = 0.0;
        let mut last_tick = 0u64;
        let mut usec_per_beat = DEFAULT_MICROSECONDS_PER_BEAT;

        for change in &self.tempo_changes {
            if change.tick >= tick {
                break;
            }
            seconds += (change.tick - last_tick) as f64 / ppq * usec_per_beat as f64 / 1e6;
            last_tick = change.tick;
            usec_per_beat = change.microseconds_per_beat;
        }

        seconds + (tick - last_tick) as f64 / ppq * usec_per_beat as f64 / 1e6
    }

    /// Duration of the whole file in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.tick_to_seconds(self.total_ticks)
    }
}

/// Parse MIDI bytes and extract their notes.
pub fn parse(midi_bytes: &[u8]) -> crate::Result<(Vec<TimedNote>, MidiFileContext)> {
    let smf = Smf::parse(midi_bytes).map_err(|e| crate::Error::MidiParse(e.to_string()))?;
    Ok(extract_notes(&smf))
}

/// Open notes of one track, keyed by `(channel, pitch)`.
///
/// Repeated note-ons of the same key stack; a note-off closes the most
/// recent one.
#[derive(Default)]
struct TrackScanner {
    track_index: usize,
    open: HashMap<(u8, u8), Vec<(u64, u8)>>,
    notes: Vec<TimedNote>,
}

impl TrackScanner {
    fn new(track_index: usize) -> Self {
        Self {
            track_index,
            ..Self::default()
        }
    }

    fn note_on(&mut self, tick: u64, channel: u8, pitch: u8, velocity: u8) {
        self.open
            .entry((channel, pitch))
            .or_default()
            .push((tick, velocity));
    }

    fn note_off(&mut self, tick: u64, channel: u8, pitch: u8) {
        let Some((onset, velocity)) = self.open.get_mut(&(channel, pitch)).and_then(Vec::pop)
        else {
            return;
        };
        self.push(onset, tick, channel, pitch, velocity);
    }

    fn push(&mut self, onset: u64, offset: u64, channel: u8, pitch: u8, velocity: u8) {
        self.notes.push(TimedNote {
            onset_tick: onset,
            offset_tick: offset,
            pitch,
            velocity,
            channel,
            track_index: self.track_index,
        });
    }

    /// Close whatever is still sounding at `end_tick`. Returns the notes and
    /// how many of them had no note-off.
    fn finish(mut self, end_tick: u64) -> (Vec<TimedNote>, usize) {
        let open: Vec<_> = std::mem::take(&mut self.open)
            .into_iter()
            .flat_map(|((channel, pitch), stack)| {
                stack
                    .into_iter()
                    .map(move |(onset, velocity)| (onset, channel, pitch, velocity))
            })
            .collect();
        let unclosed = open.len();
        for (onset, channel, pitch, velocity) in open {
            self.push(onset, end_tick, channel, pitch, velocity);
        }
        (self.notes, unclosed)
    }
}

/// Extract all notes from a parsed file along with its tempo and meter maps.
pub fn extract_notes(smf: &Smf) -> (Vec<TimedNote>, MidiFileContext) {
    let ppq = match smf.header.timing {
        midly::Timing::Metrical(ticks) => ticks.as_int(),
        midly::Timing::Timecode(_, _) => 480,
    };

    let format = match smf.header.format {
        midly::Format::SingleTrack => 0,
        midly::Format::Parallel => 1,
        midly::Format::Sequential => 2,
    };

    let mut notes = Vec::new();
    let mut tempo_changes = Vec::new();
    let mut time_signatures = Vec::new();
    let mut total_ticks = 0u64;
    let mut unclosed_notes = 0usize;

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut scanner = TrackScanner::new(track_index);
        let mut tick = 0u64;

        for event in track {
            tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    let usec = tempo.as_int();
                    tempo_changes.push(TempoChange {
                        tick,
                        microseconds_per_beat: usec,
                        bpm: 60_000_000.0 / usec.max(1) as f64,
                    });
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) => {
                    time_signatures.push(TimeSignature {
                        tick,
                        numerator: num,
                        denominator: 1u8.checked_shl(denom_pow as u32).unwrap_or(4),
                    });
                }
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            scanner.note_on(tick, channel, key.as_int(), vel.as_int());
                        }
                        // a note-on with velocity 0 is a note-off
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            scanner.note_off(tick, channel, key.as_int());
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        total_ticks = total_ticks.max(tick);
        let (track_notes, unclosed) = scanner.finish(tick);
        notes.extend(track_notes);
        unclosed_notes += unclosed;
    }

    notes.sort_by_key(|n| (n.onset_tick, n.pitch));

    // format 1 files may repeat the conductor map on several tracks
    tempo_changes.sort_by_key(|t| t.tick);
    tempo_changes.dedup_by(|a, b| a.tick == b.tick && a.microseconds_per_beat == b.microseconds_per_beat);
    time_signatures.sort_by_key(|t| t.tick);
    time_signatures.dedup_by(|a, b| a.tick == b.tick);

    let context = MidiFileContext {
        ppq,
        format,
        track_count: smf.tracks.len(),
        tempo_changes,
        time_signatures,
        total_ticks,
        unclosed_notes,
    };

    (notes, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_midi;

    #[test]
    fn extract_notes_from_format1() {
        let midi = test_midi::two_track(&[(60, 0, 480), (64, 480, 480), (67, 960, 480)]);
        let smf = Smf::parse(&midi).unwrap();
        let (notes, context) = extract_notes(&smf);

        assert_eq!(context.ppq, 480);
        assert_eq!(context.format, 1);
        assert_eq!(context.track_count, 2);
        assert_eq!(notes.len(), 3);

        // All notes on track 1
        assert!(notes.iter().all(|n| n.track_index == 1));

        assert_eq!(notes[0].pitch, 60);
        assert_eq!(notes[1].pitch, 64);
        assert_eq!(notes[2].pitch, 67);
        assert_eq!(notes[0].duration_ticks(), 480);
    }

    #[test]
    fn tempo_extraction() {
        let midi = test_midi::two_track(&[(60, 0, 480)]);
        let (_, context) = parse(&midi).unwrap();

        assert_eq!(context.tempo_changes.len(), 1);
        assert!((context.tempo_changes[0].bpm - 120.0).abs() < 0.1);
        assert_eq!(context.time_signatures.len(), 1);
        assert_eq!(context.time_signatures[0].numerator, 4);
        assert_eq!(context.time_signatures[0].denominator, 4);
    }

    #[test]
    fn ticks_convert_to_seconds_at_120_bpm() {
        let midi = test_midi::two_track(&[(60, 0, 960)]);
        let (_, context) = parse(&midi).unwrap();

        // 480 ppq at 120 BPM: one beat is half a second
        assert!((context.tick_to_seconds(480) - 0.5).abs() < 1e-9);
        assert!((context.tick_to_seconds(1920) - 2.0).abs() < 1e-9);
        assert!((context.duration_seconds() - 0.5 * 2.0).abs() < 1e-9);
    }

    #[test]
    fn tempo_change_mid_file() {
        let context = MidiFileContext {
            ppq: 480,
            format: 1,
            track_count: 1,
            tempo_changes: vec![TempoChange {
                tick: 960,
                microseconds_per_beat: 1_000_000,
                bpm: 60.0,
            }],
            time_signatures: vec![],
            total_ticks: 1920,
            unclosed_notes: 0,
        };

        // Two beats at the default 120 BPM, then two beats at 60 BPM
        assert!((context.tick_to_seconds(960) - 1.0).abs() < 1e-9);
        assert!((context.tick_to_seconds(1920) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_bytes_are_a_parse_error() {
        let err = parse(b"not a midi file").unwrap_err();
        assert!(matches!(err, crate::Error::MidiParse(_)));
    }

    #[test]
    fn bar_ticks_for_common_meters() {
        let four_four = TimeSignature { tick: 0, numerator: 4, denominator: 4 };
        let six_eight = TimeSignature { tick: 0, numerator: 6, denominator: 8 };
        assert_eq!(four_four.bar_ticks(480), 1920);
        assert_eq!(six_eight.bar_ticks(480), 1440);
    }

    #[test]
    fn unclosed_notes_end_with_their_track() {
        // a note-on with no matching note-off, on its own track
        let track = [0x00, 0x90, 0x3C, 0x64, 0x83, 0x60, 0xFF, 0x2F, 0x00];
        let mut midi = b"MThd\x00\x00\x00\x06\x00\x00\x00\x01\x01\xE0".to_vec();
        midi.extend_from_slice(b"MTrk");
        midi.extend_from_slice(&(track.len() as u32).to_be_bytes());
        midi.extend_from_slice(&track);

        let (notes, context) = parse(&midi).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].offset_tick, 480);
        assert_eq!(context.unclosed_notes, 1);
        assert_eq!(context.format, 0);
    }

    #[test]
    fn repeated_key_closes_latest_onset() {
        let midi = test_midi::two_track(&[(60, 0, 960), (60, 480, 240)]);
        let (notes, context) = parse(&midi).unwrap();
        assert_eq!(context.unclosed_notes, 0);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes.iter().map(|n| n.duration_ticks()).sum::<u64>(), 960 + 240);
    }
}
