use wasm_bindgen::prelude::*;

pub mod accumulator;
pub mod config;
pub mod error;
pub mod stats;
pub mod style;
pub mod theory;
pub mod timing;
pub mod types;

pub use accumulator::AnalysisAccumulator;
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use style::{detect_avoidance, detect_genre_patterns, track_tendencies};
pub use theory::chords::{analyze_chord, chord_display_name, update_progression};
pub use theory::harmony::{
    analyze_harmonic_function, classify_note, detect_key, detect_key_from_chords,
    detect_modulation,
};
pub use theory::notes::{map_note, try_map_note};
pub use timing::TimingAnalyzer;

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::{ChordProgression, DetectedChord, DetectedNote, KeyCenter, PlayingTendencies};

#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("noteflow analysis core initialized");
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&AnalysisError::from(e).to_string()))
}

/// Absent results (`None`) cross the boundary as `null`, and maps as plain
/// objects so results survive `JSON.stringify`.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::new()
        .serialize_missing_as_null(true)
        .serialize_maps_as_objects(true);
    value
        .serialize(&serializer)
        .map_err(|e| JsValue::from_str(&AnalysisError::from(e).to_string()))
}

fn optional_from_js<T: DeserializeOwned>(value: JsValue) -> Result<Option<T>, JsValue> {
    if value.is_null() || value.is_undefined() {
        Ok(None)
    } else {
        from_js(value).map(Some)
    }
}

#[wasm_bindgen(js_name = mapNote)]
pub fn map_note_js(pitch: i32, velocity: i32, timestamp_ms: f64) -> Result<JsValue, JsValue> {
    let note = try_map_note(pitch, velocity, timestamp_ms)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&note)
}

/// Identify the chord in a cluster of notes; `null` when nothing matches.
#[wasm_bindgen(js_name = analyzeChord)]
pub fn analyze_chord_js(notes_js: JsValue) -> Result<JsValue, JsValue> {
    let notes: Vec<DetectedNote> = from_js(notes_js)?;
    to_js(&analyze_chord(&notes))
}

#[wasm_bindgen(js_name = updateProgression)]
pub fn update_progression_js(
    chord_js: JsValue,
    progression_js: JsValue,
) -> Result<JsValue, JsValue> {
    let chord: DetectedChord = from_js(chord_js)?;
    let progression: Option<ChordProgression> = optional_from_js(progression_js)?;
    to_js(&update_progression(&chord, progression.as_ref()))
}

#[wasm_bindgen(js_name = chordDisplayName)]
pub fn chord_display_name_js(chord_js: JsValue) -> Result<String, JsValue> {
    let chord: DetectedChord = from_js(chord_js)?;
    Ok(chord_display_name(&chord))
}

#[wasm_bindgen(js_name = detectKey)]
pub fn detect_key_js(pitch_classes: &[u8]) -> Result<JsValue, JsValue> {
    to_js(&detect_key(pitch_classes))
}

#[wasm_bindgen(js_name = detectKeyFromChords)]
pub fn detect_key_from_chords_js(chords_js: JsValue) -> Result<JsValue, JsValue> {
    let chords: Vec<DetectedChord> = from_js(chords_js)?;
    to_js(&detect_key_from_chords(&chords))
}

#[wasm_bindgen(js_name = detectModulation)]
pub fn detect_modulation_js(current_js: JsValue, recent_js: JsValue) -> Result<JsValue, JsValue> {
    let current: KeyCenter = from_js(current_js)?;
    let recent: Vec<DetectedChord> = from_js(recent_js)?;
    to_js(&detect_modulation(&current, &recent))
}

#[wasm_bindgen(js_name = analyzeHarmonicFunction)]
pub fn analyze_harmonic_function_js(
    chord_js: JsValue,
    key_js: JsValue,
) -> Result<JsValue, JsValue> {
    let chord: DetectedChord = from_js(chord_js)?;
    let key: KeyCenter = from_js(key_js)?;
    to_js(&analyze_harmonic_function(&chord, &key))
}

#[wasm_bindgen(js_name = classifyNote)]
pub fn classify_note_js(note_js: JsValue, chord_js: JsValue) -> Result<JsValue, JsValue> {
    let note: DetectedNote = from_js(note_js)?;
    let chord: Option<DetectedChord> = optional_from_js(chord_js)?;
    to_js(&classify_note(&note, chord.as_ref()))
}

/// Genre affinities for an accumulator snapshot, best first.
#[wasm_bindgen(js_name = detectGenrePatterns)]
pub fn detect_genre_patterns_js(accumulator_js: JsValue) -> Result<JsValue, JsValue> {
    let acc: AnalysisAccumulator = from_js(accumulator_js)?;
    to_js(&detect_genre_patterns(&acc))
}

#[wasm_bindgen(js_name = trackTendencies)]
pub fn track_tendencies_js(accumulator_js: JsValue) -> Result<JsValue, JsValue> {
    let acc: AnalysisAccumulator = from_js(accumulator_js)?;
    to_js(&track_tendencies(&acc))
}

#[wasm_bindgen(js_name = detectAvoidance)]
pub fn detect_avoidance_js(
    tendencies_js: JsValue,
    accumulator_js: JsValue,
) -> Result<JsValue, JsValue> {
    let tendencies: PlayingTendencies = from_js(tendencies_js)?;
    let acc: AnalysisAccumulator = from_js(accumulator_js)?;
    to_js(&detect_avoidance(&tendencies, &acc))
}

/// Per-performance timing state. Hold one per live session and feed every
/// note-on through it in order.
#[wasm_bindgen]
pub struct TimingSession {
    analyzer: TimingAnalyzer,
}

#[wasm_bindgen]
impl TimingSession {
    /// Accepts an optional partial `AnalysisConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config_js: JsValue) -> Result<TimingSession, JsValue> {
        let config: AnalysisConfig = optional_from_js(config_js)?.unwrap_or_default();
        config
            .validate()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(TimingSession {
            analyzer: TimingAnalyzer::with_config(&config),
        })
    }

    #[wasm_bindgen(js_name = processNoteOn)]
    pub fn process_note_on(&mut self, timestamp_ms: f64) -> Result<JsValue, JsValue> {
        to_js(&self.analyzer.process_note_on(timestamp_ms))
    }

    #[wasm_bindgen(js_name = currentTempo)]
    pub fn current_tempo(&self) -> Option<f64> {
        self.analyzer.current_tempo()
    }

    pub fn accuracy(&self) -> f64 {
        self.analyzer.accuracy()
    }

    /// Recent deviations in milliseconds, oldest first.
    pub fn deviations(&self) -> js_sys::Float64Array {
        js_sys::Float64Array::from(self.analyzer.deviations().as_slice())
    }

    #[wasm_bindgen(js_name = tempoHistory)]
    pub fn tempo_history(&self) -> Result<JsValue, JsValue> {
        to_js(&self.analyzer.tempo_history())
    }

    pub fn reset(&mut self) {
        self.analyzer.reset();
    }
}
