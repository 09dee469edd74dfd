// Kit configuration: what each instrument symbol means at playback time.
//
// The compiler only knows the six symbols Q W E R T Y. The kit maps each to
// the key an external player presses, the General MIDI percussion note the
// MIDI exporter writes, and a display name. Loaded from JSON in the same
// way as the other data files (JSON string in, typed struct out); the
// default kit is embedded with `include_str!`.
//
// A kit file may list only some instruments. Missing ones keep the default
// mapping, so `KitConfig::entry` always has an answer.

use crate::error::Result;
use crate::score::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_note_length_ms() -> f64 {
    80.0
}

/// Playback mapping for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitEntry {
    pub name: String,
    /// Keystroke sent by the player.
    pub key: char,
    /// General MIDI percussion note number.
    pub midi_note: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitConfig {
    /// How long MIDI notes are held before note-off.
    #[serde(default = "default_note_length_ms")]
    pub note_length_ms: f64,
    #[serde(default)]
    pub instruments: BTreeMap<Instrument, KitEntry>,
}

impl KitConfig {
    /// Parse a kit from JSON, filling unlisted instruments from the default
    /// kit.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut kit: KitConfig = serde_json::from_str(json)?;
        kit.fill_missing(&default_kit());
        Ok(kit)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Mapping for `instrument`. Every instrument is present after loading.
    pub fn entry(&self, instrument: Instrument) -> &KitEntry {
        &self.instruments[&instrument]
    }

    fn fill_missing(&mut self, defaults: &KitConfig) {
        for (instrument, entry) in &defaults.instruments {
            self.instruments
                .entry(*instrument)
                .or_insert_with(|| entry.clone());
        }
    }
}

impl Default for KitConfig {
    fn default() -> Self {
        default_kit()
    }
}

/// The kit embedded at compile time.
///
/// Panics if the embedded JSON is malformed or incomplete, which a unit
/// test rules out.
pub fn default_kit() -> KitConfig {
    let json = include_str!("../../data/default_kit.json");
    let kit: KitConfig = serde_json::from_str(json).expect("embedded default_kit.json is malformed");
    assert!(
        Instrument::ALL.iter().all(|i| kit.instruments.contains_key(i)),
        "embedded default_kit.json must map every instrument"
    );
    kit
}
