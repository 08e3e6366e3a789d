use approx::assert_relative_eq;

use noteflow_rs::theory::harmony::key_display_name;
use noteflow_rs::timing::{build_beat_grid, detect_tempo, measure_deviation};
use noteflow_rs::types::{ChordQuality, DetectedChord, DetectedNote, KeyMode, PatternTag};
use noteflow_rs::{
    analyze_chord, chord_display_name, detect_avoidance, detect_genre_patterns,
    detect_key_from_chords, map_note, track_tendencies, AnalysisAccumulator, TimingAnalyzer,
};

fn chord_at(pitches: &[u8], timestamp_ms: f64) -> DetectedChord {
    let notes: Vec<DetectedNote> = pitches
        .iter()
        .map(|&p| map_note(p, 100, timestamp_ms))
        .collect();
    analyze_chord(&notes).expect("chord should be recognised")
}

#[test]
fn c_major_triad_from_staggered_notes() {
    let notes = vec![
        map_note(60, 100, 1000.0),
        map_note(64, 100, 1001.0),
        map_note(67, 100, 1002.0),
    ];
    let chord = analyze_chord(&notes).unwrap();
    assert_eq!(chord.root, "C");
    assert_eq!(chord.quality, ChordQuality::Major);
    assert_eq!(chord.timestamp_ms, 1000.0);
    assert_eq!(chord_display_name(&chord), "Cmaj");
}

#[test]
fn steady_eighths_at_120() {
    let timestamps: Vec<f64> = (0..8).map(|i| i as f64 * 500.0).collect();
    assert_eq!(detect_tempo(&timestamps), Some(120.0));

    let grid = build_beat_grid(0.0, 120.0);
    let event = measure_deviation(480.0, &grid);
    assert_eq!(event.beat_index, 1);
    assert_relative_eq!(event.deviation_ms, -20.0);
}

#[test]
fn cadence_loop_is_c_major() {
    let shapes: [&[u8]; 4] = [&[60, 64, 67], &[65, 69, 72], &[67, 71, 74], &[60, 64, 67]];
    let chords: Vec<DetectedChord> = (0..3)
        .flat_map(|bar| {
            shapes
                .iter()
                .enumerate()
                .map(move |(i, s)| chord_at(s, (bar * 4 + i) as f64 * 2000.0))
        })
        .collect();
    let key = detect_key_from_chords(&chords).unwrap();
    assert_eq!(key.root, "C");
    assert_eq!(key.mode, KeyMode::Major);
    assert_eq!(key_display_name(&key), "C major");
}

#[test]
fn full_session_pipeline() {
    let shapes: [&[u8]; 4] = [&[60, 64, 67], &[65, 69, 72], &[67, 71, 74], &[60, 64, 67]];
    let mut timing = TimingAnalyzer::new();
    let mut acc = AnalysisAccumulator::default();
    let mut t = 0.0;

    for _ in 0..3 {
        for shape in shapes.iter() {
            acc.push_chord(chord_at(shape, t));
            for &pitch in shape.iter() {
                timing.process_note_on(t);
                acc.push_note(map_note(pitch, 100, t));
                t += 500.0;
            }
        }
    }

    assert_eq!(timing.current_tempo(), Some(120.0));
    assert_relative_eq!(timing.accuracy(), 100.0);
    acc.set_tempo_history(timing.tempo_history());
    assert_eq!(acc.tempo_segments.len(), 1);
    assert_eq!(acc.tempo_segments[0].note_count, 36);

    let key = detect_key_from_chords(&acc.recent_chords()).unwrap();
    assert_eq!(key.root, "C");
    acc.record_key(&key, t);

    let snapshot = acc.snapshot();
    let genres = detect_genre_patterns(&snapshot);
    assert!(!genres.is_empty());
    assert!(genres[0]
        .matched_pattern_tags
        .contains(&PatternTag::ChordProgression));

    let tendencies = track_tendencies(&snapshot);
    assert_eq!(tendencies.key_usage["C"], 1);
    assert_eq!(tendencies.tempo_histogram.get(&120), Some(&36));
    assert_eq!(tendencies.chord_quality_usage[&ChordQuality::Major], 12);

    // 36 notes is below the avoidance minimum
    assert!(detect_avoidance(&tendencies, &snapshot).is_empty());
}
