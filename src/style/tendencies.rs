//! Session-level habits: what the player reaches for and what they never touch.

use std::collections::BTreeMap;

use crate::accumulator::AnalysisAccumulator;
use crate::config::AnalysisConfig;
use crate::stats::{inter_onset_intervals, median, swing_ratio};
use crate::theory::notes::NOTE_NAMES;
use crate::types::{
    AvoidancePatterns, ChordQuality, PlayingTendencies, RhythmProfile, Subdivision,
    SubdivisionUsage, TempoRange,
};

pub const TEMPO_BUCKET_WIDTH: u32 = 10;
pub const MAX_TRACKED_INTERVAL: u8 = 24;
/// Keys used for less than this share of the session count as avoided.
pub const MIN_KEY_SHARE: f64 = 0.05;

const MAX_RHYTHM_IOI_MS: f64 = 2000.0;
const SUBDIVISION_TOLERANCE: f64 = 0.2;
const COMMON_SUBDIVISION_SHARE: f64 = 0.15;
const SUBDIVISIONS: [(Subdivision, f64); 3] = [
    (Subdivision::Quarter, 1.0),
    (Subdivision::Eighth, 2.0),
    (Subdivision::Triplet, 3.0),
];

fn tempo_bucket(bpm: f64) -> u32 {
    let bpm = bpm.max(0.0) as u32;
    bpm / TEMPO_BUCKET_WIDTH * TEMPO_BUCKET_WIDTH
}

fn key_usage(acc: &AnalysisAccumulator) -> BTreeMap<String, u32> {
    let mut usage: BTreeMap<String, u32> =
        NOTE_NAMES.iter().map(|name| (name.to_string(), 0)).collect();
    for segment in &acc.key_segments {
        let weight = segment.chord_count.max(1);
        *usage.entry(segment.key.root.clone()).or_insert(0) += weight;
    }
    usage
}

fn chord_quality_usage(acc: &AnalysisAccumulator) -> BTreeMap<ChordQuality, u32> {
    let mut usage: BTreeMap<ChordQuality, u32> =
        ChordQuality::ALL.iter().map(|q| (*q, 0)).collect();
    for chord in &acc.chords {
        *usage.entry(chord.quality).or_insert(0) += 1;
    }
    usage
}

fn tempo_histogram(acc: &AnalysisAccumulator) -> BTreeMap<u32, u32> {
    let mut histogram = BTreeMap::new();
    for segment in &acc.tempo_segments {
        *histogram.entry(tempo_bucket(segment.bpm)).or_insert(0) += segment.note_count;
    }
    histogram
}

fn interval_histogram(acc: &AnalysisAccumulator) -> BTreeMap<u8, u32> {
    let mut histogram: BTreeMap<u8, u32> = (0..=MAX_TRACKED_INTERVAL).map(|i| (i, 0)).collect();
    let pitches: Vec<u8> = acc.notes.iter().map(|n| n.midi_number).collect();
    for pair in pitches.windows(2) {
        let step = pair[0].abs_diff(pair[1]).min(MAX_TRACKED_INTERVAL);
        *histogram.entry(step).or_insert(0) += 1;
    }
    histogram
}

fn subdivisions(iois: &[f64]) -> Vec<SubdivisionUsage> {
    let Some(beat) = median(iois) else {
        return Vec::new();
    };
    if beat <= 0.0 {
        return Vec::new();
    }
    SUBDIVISIONS
        .iter()
        .map(|&(subdivision, divisor)| {
            let target = beat / divisor;
            let hits = iois
                .iter()
                .filter(|ioi| (*ioi - target).abs() <= target * SUBDIVISION_TOLERANCE)
                .count();
            let share = hits as f64 / iois.len() as f64;
            SubdivisionUsage {
                subdivision,
                share,
                common: share >= COMMON_SUBDIVISION_SHARE,
            }
        })
        .collect()
}

fn rhythm_profile(acc: &AnalysisAccumulator) -> RhythmProfile {
    let timestamps = acc.note_timestamps();
    let iois = inter_onset_intervals(&timestamps, 0.0, MAX_RHYTHM_IOI_MS);

    let note_density = match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) if last > first => {
            timestamps.len() as f64 / (last - first) * 1000.0
        }
        _ => 0.0,
    };

    RhythmProfile {
        swing_ratio: swing_ratio(&iois).unwrap_or(0.0),
        note_density,
        subdivisions: subdivisions(&iois),
    }
}

/// Histograms of the player's habits over the accumulated session.
pub fn track_tendencies(acc: &AnalysisAccumulator) -> PlayingTendencies {
    PlayingTendencies {
        key_usage: key_usage(acc),
        chord_quality_usage: chord_quality_usage(acc),
        tempo_histogram: tempo_histogram(acc),
        interval_histogram: interval_histogram(acc),
        rhythm: rhythm_profile(acc),
    }
}

/// Flag under-used keys, chord qualities, tempo ranges and melodic
/// intervals, using the default session minimums.
pub fn detect_avoidance(
    tendencies: &PlayingTendencies,
    acc: &AnalysisAccumulator,
) -> AvoidancePatterns {
    detect_avoidance_with_config(tendencies, acc, &AnalysisConfig::default())
}

pub fn detect_avoidance_with_config(
    tendencies: &PlayingTendencies,
    acc: &AnalysisAccumulator,
    config: &AnalysisConfig,
) -> AvoidancePatterns {
    if acc.total_notes < config.min_notes_for_avoidance
        || acc.total_chords < config.min_chords_for_avoidance
    {
        log::trace!(
            "Avoidance skipped: {} notes / {} chords",
            acc.total_notes,
            acc.total_chords
        );
        return AvoidancePatterns::default();
    }

    let patterns = AvoidancePatterns {
        avoided_keys: avoided_keys(&tendencies.key_usage),
        avoided_chord_qualities: ChordQuality::ALL
            .iter()
            .copied()
            .filter(|q| tendencies.chord_quality_usage.get(q).copied().unwrap_or(0) == 0)
            .collect(),
        avoided_tempo_ranges: tempo_gaps(&tendencies.tempo_histogram),
        avoided_intervals: (1..=12u8)
            .filter(|i| tendencies.interval_histogram.get(i).copied().unwrap_or(0) == 0)
            .collect(),
    };
    log::debug!(
        "Avoidance: {} keys, {} qualities, {} tempo ranges, {} intervals",
        patterns.avoided_keys.len(),
        patterns.avoided_chord_qualities.len(),
        patterns.avoided_tempo_ranges.len(),
        patterns.avoided_intervals.len()
    );
    patterns
}

fn avoided_keys(usage: &BTreeMap<String, u32>) -> Vec<String> {
    let total: u32 = usage.values().sum();
    if total == 0 {
        return Vec::new();
    }
    NOTE_NAMES
        .iter()
        .filter(|name| {
            let count = usage.get(**name).copied().unwrap_or(0);
            (count as f64 / total as f64) < MIN_KEY_SHARE
        })
        .map(|name| name.to_string())
        .collect()
}

/// Empty buckets between the slowest and fastest played buckets that sit
/// next to a played one.
fn tempo_gaps(histogram: &BTreeMap<u32, u32>) -> Vec<TempoRange> {
    let played = |bucket: u32| histogram.get(&bucket).copied().unwrap_or(0) > 0;
    let mut played_buckets = histogram.iter().filter(|(_, c)| **c > 0).map(|(b, _)| *b);
    let Some(lowest) = played_buckets.next() else {
        return Vec::new();
    };
    let highest = played_buckets.last().unwrap_or(lowest);

    let mut gaps = Vec::new();
    let mut bucket = lowest + TEMPO_BUCKET_WIDTH;
    while bucket < highest {
        let has_neighbour =
            played(bucket - TEMPO_BUCKET_WIDTH) || played(bucket + TEMPO_BUCKET_WIDTH);
        if !played(bucket) && has_neighbour {
            gaps.push(TempoRange {
                min_bpm: bucket,
                max_bpm: bucket + TEMPO_BUCKET_WIDTH,
            });
        }
        bucket += TEMPO_BUCKET_WIDTH;
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::chords::analyze_chord;
    use crate::theory::notes::map_note;
    use crate::types::{DetectedNote, KeyCenter, KeyMode, TempoSegment};
    use approx::assert_relative_eq;

    fn tempo_segment(bpm: f64, note_count: u32) -> TempoSegment {
        TempoSegment {
            bpm,
            start_timestamp_ms: 0.0,
            end_timestamp_ms: 0.0,
            note_count,
        }
    }

    fn c_major_chord(t: f64) -> crate::types::DetectedChord {
        let notes: Vec<DetectedNote> = [60, 64, 67].iter().map(|&p| map_note(p, 90, t)).collect();
        analyze_chord(&notes).unwrap()
    }

    /// 60 stepwise notes, 12 C major chords, all in C major.
    fn busy_session() -> AnalysisAccumulator {
        let mut acc = AnalysisAccumulator::default();
        acc.record_key(
            &KeyCenter {
                root: "C".to_string(),
                mode: KeyMode::Major,
                confidence: 0.9,
            },
            0.0,
        );
        let scale = [60, 62, 64, 65, 67];
        for i in 0..60 {
            acc.push_note(map_note(scale[i % scale.len()], 90, i as f64 * 250.0));
        }
        for i in 0..12 {
            acc.push_chord(c_major_chord(i as f64 * 1000.0));
        }
        acc.set_tempo_history(vec![tempo_segment(121.0, 40), tempo_segment(152.5, 20)]);
        acc
    }

    #[test]
    fn test_empty_session_has_zeroed_bins() {
        let tendencies = track_tendencies(&AnalysisAccumulator::default());
        assert_eq!(tendencies.key_usage.len(), 12);
        assert!(tendencies.key_usage.values().all(|c| *c == 0));
        assert_eq!(tendencies.chord_quality_usage.len(), 9);
        assert_eq!(tendencies.interval_histogram.len(), 25);
        assert!(tendencies.tempo_histogram.is_empty());
        assert_eq!(tendencies.rhythm, RhythmProfile::default());
    }

    #[test]
    fn test_histograms() {
        let acc = busy_session();
        let tendencies = track_tendencies(&acc);

        assert_eq!(tendencies.key_usage["C"], 12);
        assert_eq!(tendencies.key_usage["G"], 0);
        assert_eq!(tendencies.chord_quality_usage[&ChordQuality::Major], 12);
        assert_eq!(tendencies.chord_quality_usage[&ChordQuality::Minor], 0);
        assert_eq!(tendencies.tempo_histogram.get(&120), Some(&40));
        assert_eq!(tendencies.tempo_histogram.get(&150), Some(&20));

        // C D E F G C D ...: whole steps, one half step, and the 7-semitone drop
        assert_eq!(tendencies.interval_histogram[&2], 36);
        assert_eq!(tendencies.interval_histogram[&1], 12);
        assert_eq!(tendencies.interval_histogram[&7], 11);
        assert_eq!(tendencies.interval_histogram[&3], 0);
    }

    #[test]
    fn test_large_leaps_are_capped() {
        let mut acc = AnalysisAccumulator::default();
        acc.push_note(map_note(20, 90, 0.0));
        acc.push_note(map_note(100, 90, 500.0));
        let tendencies = track_tendencies(&acc);
        assert_eq!(tendencies.interval_histogram[&MAX_TRACKED_INTERVAL], 1);
    }

    #[test]
    fn test_rhythm_profile() {
        let acc = busy_session();
        let rhythm = track_tendencies(&acc).rhythm;
        // 60 notes over 59 * 250 ms
        assert_relative_eq!(rhythm.note_density, 60.0 / 14750.0 * 1000.0, epsilon = 1e-9);
        assert_eq!(rhythm.swing_ratio, 0.0);
        let quarter = &rhythm.subdivisions[0];
        assert_eq!(quarter.subdivision, Subdivision::Quarter);
        assert_eq!(quarter.share, 1.0);
        assert!(quarter.common);
        assert!(!rhythm.subdivisions[1].common);
        assert!(!rhythm.subdivisions[2].common);
    }

    #[test]
    fn test_eighths_against_quarters() {
        let mut acc = AnalysisAccumulator::default();
        let mut t = 0.0;
        // mostly quarters with a run of eighths
        for ioi in [500.0, 500.0, 500.0, 500.0, 500.0, 250.0, 250.0, 250.0, 250.0] {
            acc.push_note(map_note(60, 90, t));
            t += ioi;
        }
        acc.push_note(map_note(60, 90, t));
        let rhythm = track_tendencies(&acc).rhythm;
        assert_eq!(rhythm.subdivisions[0].share, 5.0 / 9.0);
        assert_eq!(rhythm.subdivisions[1].share, 4.0 / 9.0);
        assert!(rhythm.subdivisions[1].common);
    }

    #[test]
    fn test_avoidance_needs_enough_material() {
        let mut acc = busy_session();
        let tendencies = track_tendencies(&acc);
        acc.total_chords = 9;
        assert!(detect_avoidance(&tendencies, &acc).is_empty());
        acc.total_chords = 12;
        acc.total_notes = 49;
        assert!(detect_avoidance(&tendencies, &acc).is_empty());
    }

    #[test]
    fn test_avoidance() {
        let acc = busy_session();
        let tendencies = track_tendencies(&acc);
        let avoidance = detect_avoidance(&tendencies, &acc);

        assert_eq!(avoidance.avoided_keys.len(), 11);
        assert!(!avoidance.avoided_keys.contains(&"C".to_string()));
        assert_eq!(avoidance.avoided_chord_qualities.len(), 8);
        assert!(!avoidance.avoided_chord_qualities.contains(&ChordQuality::Major));
        assert_eq!(
            avoidance.avoided_tempo_ranges,
            vec![
                TempoRange { min_bpm: 130, max_bpm: 140 },
                TempoRange { min_bpm: 140, max_bpm: 150 },
            ]
        );
        assert_eq!(
            avoidance.avoided_intervals,
            vec![3, 4, 5, 6, 8, 9, 10, 11, 12]
        );
    }

    #[test]
    fn test_tempo_gaps_need_played_neighbour() {
        let histogram: BTreeMap<u32, u32> = [(80, 5), (130, 3)].into_iter().collect();
        let gaps = tempo_gaps(&histogram);
        let mins: Vec<u32> = gaps.iter().map(|g| g.min_bpm).collect();
        assert_eq!(mins, vec![90, 120]);

        let single: BTreeMap<u32, u32> = [(100, 5)].into_iter().collect();
        assert!(tempo_gaps(&single).is_empty());
    }

    #[test]
    fn test_no_key_history_flags_no_keys() {
        let mut acc = busy_session();
        acc.key_segments.clear();
        let tendencies = track_tendencies(&acc);
        let avoidance = detect_avoidance(&tendencies, &acc);
        assert!(avoidance.avoided_keys.is_empty());
        assert!(!avoidance.avoided_intervals.is_empty());
    }

    #[test]
    fn test_configured_minimums() {
        let mut acc = AnalysisAccumulator::default();
        for i in 0..3 {
            acc.push_chord(c_major_chord(i as f64 * 1000.0));
        }
        let config = AnalysisConfig {
            min_notes_for_avoidance: 0,
            min_chords_for_avoidance: 3,
            ..Default::default()
        };
        let tendencies = track_tendencies(&acc);
        let avoidance = detect_avoidance_with_config(&tendencies, &acc, &config);
        assert_eq!(avoidance.avoided_chord_qualities.len(), 8);
        assert_eq!(avoidance.avoided_intervals.len(), 12);
    }
}
