// MIDI output from compiled timelines.
//
// Converts a list of `TimedEvent`s into a Standard MIDI File so a compiled
// score can be auditioned in any player or DAW without the keystroke
// player. Output is SMF format 0: one track on the General MIDI percussion
// channel (channel 10, index 9), a tempo meta event from the header BPM,
// and a note-on/note-off pair per event. Note numbers and note length come
// from the `KitConfig`.
//
// Event times are milliseconds and may be fractional; they are rounded to
// the nearest tick. Uses the `midly` crate for encoding.

use crate::error::{Result, ScoreError};
use crate::kit::KitConfig;
use crate::score::TimedEvent;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// General MIDI percussion channel (10), zero-based.
const DRUM_CHANNEL: u8 = 9;

/// Largest value a 24-bit tempo field holds.
const MAX_TEMPO_MICROS: u32 = 0xFF_FFFF;

/// Convert a timeline to MIDI and write it to `path`.
pub fn write_midi(events: &[TimedEvent], tempo_bpm: f64, kit: &KitConfig, path: &Path) -> Result<()> {
    let smf = events_to_smf(events, tempo_bpm, kit);
    let mut buf = Vec::new();
    smf.write_std(&mut buf).map_err(ScoreError::Midi)?;
    std::fs::write(path, &buf).map_err(ScoreError::Midi)?;
    Ok(())
}

/// Milliseconds to ticks at `tempo_bpm`.
pub fn ms_to_ticks(ms: f64, tempo_bpm: f64) -> u32 {
    let quarter_ms = 60_000.0 / tempo_bpm;
    (ms / quarter_ms * f64::from(TICKS_PER_QUARTER)).round().max(0.0) as u32
}

/// Convert a timeline to an in-memory SMF.
pub fn events_to_smf(events: &[TimedEvent], tempo_bpm: f64, kit: &KitConfig) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let channel = u4::new(DRUM_CHANNEL);
    let mut track: Track<'static> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(b"keydrum")),
    });
    let tempo_micros = ((60_000_000.0 / tempo_bpm).round() as u32).clamp(1, MAX_TEMPO_MICROS);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_micros))),
    });

    // (tick, is_note_on, message). Offs sort before ons at the same tick so
    // a retriggered note is not cut short.
    let mut messages: Vec<(u32, bool, MidiMessage)> = Vec::with_capacity(events.len() * 2);
    for event in events {
        let key = u7::new(kit.entry(event.instrument).midi_note.min(127));
        let on = ms_to_ticks(event.time_ms, tempo_bpm);
        let off = ms_to_ticks(event.time_ms + kit.note_length_ms, tempo_bpm).max(on + 1);
        // Velocity 0 would read as a note-off.
        let vel = u7::new(event.velocity.clamp(1, 127));
        messages.push((on, true, MidiMessage::NoteOn { key, vel }));
        messages.push((off, false, MidiMessage::NoteOff { key, vel: u7::new(0) }));
    }
    messages.sort_by_key(|&(tick, is_on, _)| (tick, is_on));

    let mut last_tick = 0;
    for (tick, _, message) in messages {
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    smf
}
