use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Tunable parameters for a live analysis session.
///
/// Deserializes with `#[serde(default)]` so callers can override a subset of
/// fields and keep the defaults for the rest.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    // Timing
    /// Notes within this many ms of the grid count as on-beat (default: 50)
    pub on_beat_tolerance_ms: f64,
    /// Relative BPM change that opens a new tempo segment (default: 0.15)
    pub tempo_shift_threshold: f64,
    /// Rolling window for timestamps and intervals (default: 64)
    pub timing_window: usize,
    /// Rolling window for recorded deviations (default: 256)
    pub deviation_window: usize,
    /// Closed tempo segments kept in history (default: 32)
    pub tempo_history_capacity: usize,

    // Accumulator
    /// Recent notes kept for genre/tendency analysis (default: 500)
    pub note_capacity: usize,
    /// Recent chords kept for genre/tendency analysis (default: 100)
    pub chord_capacity: usize,
    /// Key segments kept in history (default: 32)
    pub key_history_capacity: usize,

    // Avoidance
    /// Total notes required before avoidance is reported (default: 50)
    pub min_notes_for_avoidance: u64,
    /// Total chords required before avoidance is reported (default: 10)
    pub min_chords_for_avoidance: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            on_beat_tolerance_ms: 50.0,
            tempo_shift_threshold: 0.15,
            timing_window: 64,
            deviation_window: 256,
            tempo_history_capacity: 32,
            note_capacity: 500,
            chord_capacity: 100,
            key_history_capacity: 32,
            min_notes_for_avoidance: 50,
            min_chords_for_avoidance: 10,
        }
    }
}

/// Upper bound for every window and capacity.
pub const MAX_CAPACITY: usize = 65_536;

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.on_beat_tolerance_ms.is_nan() || self.on_beat_tolerance_ms < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "on_beat_tolerance_ms must be non-negative, got {}",
                self.on_beat_tolerance_ms
            )));
        }
        if self.tempo_shift_threshold.is_nan() || self.tempo_shift_threshold <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "tempo_shift_threshold must be positive, got {}",
                self.tempo_shift_threshold
            )));
        }
        // A tempo needs 4 notes; a shift check needs 8 intervals.
        if self.timing_window < 9 {
            return Err(AnalysisError::InvalidConfig(format!(
                "timing_window must be at least 9, got {}",
                self.timing_window
            )));
        }
        let capacities = [
            ("timing_window", self.timing_window),
            ("deviation_window", self.deviation_window),
            ("tempo_history_capacity", self.tempo_history_capacity),
            ("note_capacity", self.note_capacity),
            ("chord_capacity", self.chord_capacity),
            ("key_history_capacity", self.key_history_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 || value > MAX_CAPACITY {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} must be in 1..={}, got {}",
                    name, MAX_CAPACITY, value
                )));
            }
        }
        Ok(())
    }
}
