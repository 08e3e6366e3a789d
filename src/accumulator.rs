use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::types::{DetectedChord, DetectedNote, KeyCenter, KeySegment, TempoSegment};

/// Rolling session state read by the genre and tendency analyzers.
///
/// Recent notes and chords are kept in FIFO buffers so memory stays bounded
/// for arbitrarily long sessions; the totals keep counting past eviction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnalysisAccumulator {
    pub notes: VecDeque<DetectedNote>,
    pub chords: VecDeque<DetectedChord>,
    pub note_capacity: usize,
    pub chord_capacity: usize,
    pub total_notes: u64,
    pub total_chords: u64,
    pub tempo_segments: Vec<TempoSegment>,
    pub key_segments: VecDeque<KeySegment>,
    pub key_history_capacity: usize,
}

impl Default for AnalysisAccumulator {
    fn default() -> Self {
        Self::with_config(&AnalysisConfig::default())
    }
}

impl AnalysisAccumulator {
    pub fn new(note_capacity: usize, chord_capacity: usize) -> Self {
        Self {
            notes: VecDeque::new(),
            chords: VecDeque::new(),
            note_capacity: note_capacity.max(1),
            chord_capacity: chord_capacity.max(1),
            total_notes: 0,
            total_chords: 0,
            tempo_segments: Vec::new(),
            key_segments: VecDeque::new(),
            key_history_capacity: AnalysisConfig::default().key_history_capacity,
        }
    }

    pub fn with_config(config: &AnalysisConfig) -> Self {
        Self {
            key_history_capacity: config.key_history_capacity.max(1),
            ..Self::new(config.note_capacity, config.chord_capacity)
        }
    }

    pub fn push_note(&mut self, note: DetectedNote) {
        if self.notes.len() >= self.note_capacity {
            self.notes.pop_front();
        }
        self.notes.push_back(note);
        self.total_notes += 1;
    }

    pub fn push_chord(&mut self, chord: DetectedChord) {
        if self.chords.len() >= self.chord_capacity {
            self.chords.pop_front();
        }
        self.chords.push_back(chord);
        self.total_chords += 1;
        if let Some(segment) = self.key_segments.back_mut() {
            segment.chord_count += 1;
        }
    }

    /// Replace the tempo history with the timing analyzer's current view.
    pub fn set_tempo_history(&mut self, segments: Vec<TempoSegment>) {
        self.tempo_segments = segments;
    }

    /// Record the key believed current at `timestamp_ms`. An unchanged key
    /// extends the open segment; a different one starts a new segment.
    pub fn record_key(&mut self, key: &KeyCenter, timestamp_ms: f64) {
        if let Some(segment) = self.key_segments.back_mut() {
            if segment.key.same_key(key) {
                segment.end_timestamp_ms = timestamp_ms;
                segment.key.confidence = key.confidence;
                return;
            }
            segment.end_timestamp_ms = timestamp_ms;
        }
        if self.key_segments.len() >= self.key_history_capacity {
            self.key_segments.pop_front();
        }
        self.key_segments.push_back(KeySegment {
            key: key.clone(),
            start_timestamp_ms: timestamp_ms,
            end_timestamp_ms: timestamp_ms,
            chord_count: 0,
        });
    }

    /// Chords in the rolling buffer, oldest first.
    pub fn recent_chords(&self) -> Vec<DetectedChord> {
        self.chords.iter().cloned().collect()
    }

    pub fn note_timestamps(&self) -> Vec<f64> {
        self.notes.iter().map(|n| n.timestamp_ms).collect()
    }

    /// Owned copy to hand to analyzers while this accumulator keeps
    /// receiving events.
    pub fn snapshot(&self) -> AnalysisAccumulator {
        self.clone()
    }

    /// Drop buffered notes and chords; totals and history are kept.
    pub fn clear_recent(&mut self) {
        self.notes.clear();
        self.chords.clear();
    }
}
