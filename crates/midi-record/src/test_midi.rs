//! Hand-built Standard MIDI Files for unit tests.

/// Encode a variable-length quantity.
fn vlq(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    bytes
}

fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// Format 1 file: a conductor track with tempo and meter, then one note
/// track. `notes` are `(pitch, onset_tick, duration_ticks)`.
pub fn build(ppq: u16, usec_per_beat: u32, meter: (u8, u8), notes: &[(u8, u32, u32)]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&1u16.to_be_bytes());
    header.extend_from_slice(&2u16.to_be_bytes());
    header.extend_from_slice(&ppq.to_be_bytes());

    let tempo = usec_per_beat.to_be_bytes();
    let mut conductor = vec![0x00, 0xFF, 0x51, 0x03, tempo[1], tempo[2], tempo[3]];
    conductor.extend_from_slice(&[0x00, 0xFF, 0x58, 0x04, meter.0, meter.1, 0x18, 0x08]);
    conductor.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    // (tick, is_on, pitch); offs sort before ons at the same tick
    let mut events: Vec<(u32, bool, u8)> = Vec::new();
    for &(pitch, onset, duration) in notes {
        events.push((onset, true, pitch));
        events.push((onset + duration, false, pitch));
    }
    events.sort_by_key(|&(tick, is_on, pitch)| (tick, is_on, pitch));

    let mut track = Vec::new();
    let mut last = 0u32;
    for (tick, is_on, pitch) in events {
        track.extend(vlq(tick - last));
        last = tick;
        if is_on {
            track.extend_from_slice(&[0x90, pitch, 0x64]);
        } else {
            track.extend_from_slice(&[0x80, pitch, 0x00]);
        }
    }
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    let mut out = chunk(b"MThd", &header);
    out.extend(chunk(b"MTrk", &conductor));
    out.extend(chunk(b"MTrk", &track));
    out
}

/// 480 ppq, 120 BPM, 4/4.
pub fn two_track(notes: &[(u8, u32, u32)]) -> Vec<u8> {
    build(480, 500_000, (4, 2), notes)
}
