//! Bar boundaries from a time-signature map.

use crate::extract::{MidiFileContext, TimeSignature};
use std::ops::Range;

/// Tick ranges of every bar in the file.
///
/// Files without a time signature are treated as 4/4. A meter change that
/// falls mid-bar cuts the running bar short and starts a fresh one. The last
/// bar is truncated at the end of the file.
pub fn bar_tick_ranges(context: &MidiFileContext) -> Vec<Range<u64>> {
    let common_time = TimeSignature {
        tick: 0,
        numerator: 4,
        denominator: 4,
    };

    let mut signatures: Vec<&TimeSignature> = context.time_signatures.iter().collect();
    if signatures.first().map_or(true, |ts| ts.tick > 0) {
        signatures.insert(0, &common_time);
    }

    let mut bars = Vec::new();
    let mut tick = 0u64;
    for (i, signature) in signatures.iter().enumerate() {
        let section_end = signatures
            .get(i + 1)
            .map_or(context.total_ticks, |next| next.tick.min(context.total_ticks));
        let bar_len = signature.bar_ticks(context.ppq).max(1);

        while tick < section_end {
            let end = (tick + bar_len).min(section_end);
            bars.push(tick..end);
            tick = end;
        }
    }
    bars
}

/// Frame ranges of every bar at `fps`.
pub fn split_bars(context: &MidiFileContext, fps: usize) -> Vec<Range<usize>> {
    let rate = fps as f64;
    bar_tick_ranges(context)
        .into_iter()
        .map(|ticks| {
            let start = (context.tick_to_seconds(ticks.start) * rate).floor() as usize;
            let end = (context.tick_to_seconds(ticks.end) * rate).floor() as usize;
            start..end.max(start)
        })
        .collect()
}
