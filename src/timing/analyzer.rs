use std::collections::VecDeque;

use crate::config::AnalysisConfig;
use crate::stats::{median, median_abs_deviation};
use crate::types::{BeatGrid, TempoSegment, TimingEvent};

pub const MIN_NOTES_FOR_TEMPO: usize = 4;
/// MAD/median above this is treated as rubato and yields no tempo.
pub const MAX_RELATIVE_MAD: f64 = 0.25;
pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;
/// Most recent intervals considered when checking for a tempo shift.
pub const TEMPO_SHIFT_WINDOW: usize = 8;

fn round_bpm(bpm: f64) -> f64 {
    (bpm * 10.0).round() / 10.0
}

fn push_bounded<T>(buf: &mut VecDeque<T>, value: T, capacity: usize) {
    if buf.len() >= capacity {
        buf.pop_front();
    }
    buf.push_back(value);
}

/// Tempo from a set of inter-onset intervals, or `None` when the intervals
/// are too irregular or the tempo falls outside [20, 300] BPM.
fn tempo_from_intervals(intervals: &[f64]) -> Option<f64> {
    let center = median(intervals)?;
    if center <= 0.0 {
        return None;
    }
    let mad = median_abs_deviation(intervals, center)?;
    if mad / center > MAX_RELATIVE_MAD {
        log::trace!(
            "Tempo rejected: relative MAD {:.3} over {} intervals",
            mad / center,
            intervals.len()
        );
        return None;
    }
    bpm_in_range(round_bpm(60000.0 / center))
}

fn bpm_in_range(bpm: f64) -> Option<f64> {
    if (MIN_BPM..=MAX_BPM).contains(&bpm) {
        Some(bpm)
    } else {
        None
    }
}

/// Estimate tempo from note-on timestamps (ms), rounded to 0.1 BPM.
pub fn detect_tempo(timestamps: &[f64]) -> Option<f64> {
    if timestamps.len() < MIN_NOTES_FOR_TEMPO {
        return None;
    }
    let intervals: Vec<f64> = timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|ioi| *ioi > 0.0)
        .collect();
    if intervals.len() < MIN_NOTES_FOR_TEMPO - 1 {
        return None;
    }
    tempo_from_intervals(&intervals)
}

pub fn build_beat_grid(start_timestamp_ms: f64, bpm: f64) -> BeatGrid {
    BeatGrid {
        start_timestamp_ms,
        bpm,
        beat_interval_ms: 60000.0 / bpm,
    }
}

/// Signed distance from `timestamp_ms` to the nearest beat of `grid`.
pub fn measure_deviation(timestamp_ms: f64, grid: &BeatGrid) -> TimingEvent {
    let beat_index =
        ((timestamp_ms - grid.start_timestamp_ms) / grid.beat_interval_ms).round() as i64;
    let expected = grid.beat_time(beat_index);
    TimingEvent {
        note_timestamp_ms: timestamp_ms,
        expected_beat_timestamp_ms: expected,
        deviation_ms: timestamp_ms - expected,
        beat_index,
    }
}

/// Online tempo tracker for a single performance stream.
///
/// Stays in a no-tempo state until enough regular notes arrive, then follows
/// the beat grid and splits the tempo history into segments whenever the
/// recent tempo moves by more than the configured threshold. Not shareable
/// across streams; create one per session.
#[derive(Debug, Clone)]
pub struct TimingAnalyzer {
    timestamps: VecDeque<f64>,
    intervals: VecDeque<f64>,
    deviations: VecDeque<f64>,
    grid: Option<BeatGrid>,
    current_segment: Option<TempoSegment>,
    history: VecDeque<TempoSegment>,
    window: usize,
    deviation_window: usize,
    history_capacity: usize,
    on_beat_tolerance_ms: f64,
    tempo_shift_threshold: f64,
}

impl Default for TimingAnalyzer {
    fn default() -> Self {
        Self::with_config(&AnalysisConfig::default())
    }
}

impl TimingAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &AnalysisConfig) -> Self {
        Self {
            timestamps: VecDeque::new(),
            intervals: VecDeque::new(),
            deviations: VecDeque::new(),
            grid: None,
            current_segment: None,
            history: VecDeque::new(),
            window: config.timing_window.max(MIN_NOTES_FOR_TEMPO),
            deviation_window: config.deviation_window.max(1),
            history_capacity: config.tempo_history_capacity.max(1),
            on_beat_tolerance_ms: config.on_beat_tolerance_ms,
            tempo_shift_threshold: config.tempo_shift_threshold,
        }
    }

    /// Feed one note-on. Returns the note's timing against the beat grid once
    /// a tempo is established, `None` before that.
    pub fn process_note_on(&mut self, timestamp_ms: f64) -> Option<TimingEvent> {
        if let Some(&last) = self.timestamps.back() {
            let ioi = timestamp_ms - last;
            if ioi > 0.0 {
                push_bounded(&mut self.intervals, ioi, self.window);
            }
        }
        push_bounded(&mut self.timestamps, timestamp_ms, self.window);

        match self.grid {
            None => self.try_acquire_tempo(timestamp_ms),
            Some(grid) => {
                let event = measure_deviation(timestamp_ms, &grid);
                self.record_deviation(event.deviation_ms);
                if !self.check_tempo_shift(timestamp_ms) {
                    if let Some(segment) = self.current_segment.as_mut() {
                        segment.end_timestamp_ms = timestamp_ms;
                        segment.note_count += 1;
                    }
                }
                Some(event)
            }
        }
    }

    fn try_acquire_tempo(&mut self, timestamp_ms: f64) -> Option<TimingEvent> {
        if self.timestamps.len() < MIN_NOTES_FOR_TEMPO
            || self.intervals.len() < MIN_NOTES_FOR_TEMPO - 1
        {
            return None;
        }
        let intervals: Vec<f64> = self.intervals.iter().copied().collect();
        let bpm = tempo_from_intervals(&intervals)?;
        let start = *self.timestamps.front()?;

        let grid = build_beat_grid(start, bpm);
        log::debug!(
            "Tempo acquired: {:.1} BPM from {} notes, grid at {:.0} ms",
            bpm,
            self.timestamps.len(),
            start
        );
        self.grid = Some(grid);
        self.current_segment = Some(TempoSegment {
            bpm,
            start_timestamp_ms: start,
            end_timestamp_ms: timestamp_ms,
            note_count: self.timestamps.len() as u32,
        });

        let event = measure_deviation(timestamp_ms, &grid);
        self.record_deviation(event.deviation_ms);
        Some(event)
    }

    /// Returns true when a new segment was opened at `timestamp_ms`.
    fn check_tempo_shift(&mut self, timestamp_ms: f64) -> bool {
        let Some(current_bpm) = self.current_tempo() else {
            return false;
        };
        if self.intervals.len() < TEMPO_SHIFT_WINDOW {
            return false;
        }
        let recent: Vec<f64> = self
            .intervals
            .iter()
            .skip(self.intervals.len() - TEMPO_SHIFT_WINDOW)
            .copied()
            .collect();
        let Some(center) = median(&recent) else {
            return false;
        };
        if center <= 0.0 {
            return false;
        }
        let Some(new_bpm) = bpm_in_range(round_bpm(60000.0 / center)) else {
            return false;
        };
        if (new_bpm - current_bpm).abs() / current_bpm <= self.tempo_shift_threshold {
            return false;
        }

        log::debug!(
            "Tempo shift {:.1} -> {:.1} BPM at {:.0} ms",
            current_bpm,
            new_bpm,
            timestamp_ms
        );
        if let Some(mut closed) = self.current_segment.take() {
            closed.end_timestamp_ms = timestamp_ms;
            push_bounded(&mut self.history, closed, self.history_capacity);
        }
        self.current_segment = Some(TempoSegment {
            bpm: new_bpm,
            start_timestamp_ms: timestamp_ms,
            end_timestamp_ms: timestamp_ms,
            note_count: 1,
        });
        self.grid = Some(build_beat_grid(timestamp_ms, new_bpm));
        true
    }

    fn record_deviation(&mut self, deviation_ms: f64) {
        push_bounded(&mut self.deviations, deviation_ms, self.deviation_window);
    }

    pub fn current_tempo(&self) -> Option<f64> {
        self.grid.map(|g| g.bpm)
    }

    pub fn current_grid(&self) -> Option<BeatGrid> {
        self.grid
    }

    /// Percentage (0-100) of recorded deviations within the on-beat
    /// tolerance, boundary inclusive. 0 when nothing has been measured.
    pub fn accuracy(&self) -> f64 {
        if self.deviations.is_empty() {
            return 0.0;
        }
        let on_beat = self
            .deviations
            .iter()
            .filter(|d| d.abs() <= self.on_beat_tolerance_ms)
            .count();
        on_beat as f64 / self.deviations.len() as f64 * 100.0
    }

    pub fn deviations(&self) -> Vec<f64> {
        self.deviations.iter().copied().collect()
    }

    /// Closed segments followed by the open one, oldest first.
    pub fn tempo_history(&self) -> Vec<TempoSegment> {
        self.history
            .iter()
            .cloned()
            .chain(self.current_segment.clone())
            .collect()
    }

    pub fn reset(&mut self) {
        log::debug!("Timing analyzer reset");
        self.timestamps.clear();
        self.intervals.clear();
        self.deviations.clear();
        self.grid = None;
        self.current_segment = None;
        self.history.clear();
    }
}
