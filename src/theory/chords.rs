use crate::theory::notes::pitch_class_name;
use crate::types::{ChordProgression, ChordQuality, DetectedChord, DetectedNote};

/// Interval templates in match order. Seventh chords come before triads so
/// that the more specific shape wins.
const CHORD_TEMPLATES: [(ChordQuality, &[u8]); 9] = [
    (ChordQuality::Major7, &[0, 4, 7, 11]),
    (ChordQuality::Dominant7, &[0, 4, 7, 10]),
    (ChordQuality::Minor7, &[0, 3, 7, 10]),
    (ChordQuality::Major, &[0, 4, 7]),
    (ChordQuality::Minor, &[0, 3, 7]),
    (ChordQuality::Diminished, &[0, 3, 6]),
    (ChordQuality::Augmented, &[0, 4, 8]),
    (ChordQuality::Sus2, &[0, 2, 7]),
    (ChordQuality::Sus4, &[0, 5, 7]),
];

const MIN_PITCH_CLASSES: usize = 3;

fn match_template(intervals: &[u8]) -> Option<ChordQuality> {
    CHORD_TEMPLATES
        .iter()
        .find(|(_, template)| *template == intervals)
        .map(|(quality, _)| *quality)
}

fn intervals_from(root: u8, pitch_classes: &[u8]) -> Vec<u8> {
    let mut intervals: Vec<u8> = pitch_classes
        .iter()
        .map(|pc| (pc + 12 - root) % 12)
        .collect();
    intervals.sort_unstable();
    intervals
}

/// Identify the chord formed by a cluster of simultaneous notes.
///
/// The lowest note's pitch class is tried as root first; a match there is
/// returned immediately. Otherwise the first inversion match found while
/// scanning the remaining pitch classes in first-seen order is used.
pub fn analyze_chord(notes: &[DetectedNote]) -> Option<DetectedChord> {
    let mut pitch_classes: Vec<u8> = Vec::new();
    for note in notes {
        let pc = note.pitch_class();
        if !pitch_classes.contains(&pc) {
            pitch_classes.push(pc);
        }
    }
    if pitch_classes.len() < MIN_PITCH_CLASSES {
        return None;
    }

    let bass = notes.iter().min_by_key(|n| n.midi_number)?;
    let bass_pc = bass.pitch_class();

    let mut fallback: Option<(u8, ChordQuality)> = None;
    let candidates = std::iter::once(bass_pc)
        .chain(pitch_classes.iter().copied().filter(|pc| *pc != bass_pc));
    for root in candidates {
        let Some(quality) = match_template(&intervals_from(root, &pitch_classes)) else {
            continue;
        };
        if root == bass_pc {
            return Some(build_chord(root, quality, notes));
        }
        if fallback.is_none() {
            fallback = Some((root, quality));
        }
    }

    let (root, quality) = fallback?;
    log::trace!(
        "Chord {}{} matched in inversion over bass {}",
        pitch_class_name(root),
        quality.suffix(),
        pitch_class_name(bass_pc)
    );
    Some(build_chord(root, quality, notes))
}

fn build_chord(root: u8, quality: ChordQuality, notes: &[DetectedNote]) -> DetectedChord {
    let mut sorted = notes.to_vec();
    sorted.sort_by_key(|n| n.midi_number);
    let timestamp_ms = notes
        .iter()
        .map(|n| n.timestamp_ms)
        .fold(f64::INFINITY, f64::min);
    DetectedChord {
        root: pitch_class_name(root).to_string(),
        quality,
        notes: sorted,
        timestamp_ms,
    }
}

/// Append `chord` to `existing`, or start a new progression from it.
pub fn update_progression(
    chord: &DetectedChord,
    existing: Option<&ChordProgression>,
) -> ChordProgression {
    match existing {
        Some(progression) => {
            let mut chords = progression.chords.clone();
            chords.push(chord.clone());
            ChordProgression {
                chords,
                start_timestamp_ms: progression.start_timestamp_ms,
                end_timestamp_ms: progression.end_timestamp_ms.max(chord.timestamp_ms),
            }
        }
        None => ChordProgression {
            chords: vec![chord.clone()],
            start_timestamp_ms: chord.timestamp_ms,
            end_timestamp_ms: chord.timestamp_ms,
        },
    }
}

pub fn chord_display_name(chord: &DetectedChord) -> String {
    format!("{}{}", chord.root, chord.quality.suffix())
}

/// Pitch classes of a chord's constituents, deduplicated in order.
pub fn chord_pitch_classes(chord: &DetectedChord) -> Vec<u8> {
    let mut pcs: Vec<u8> = Vec::new();
    for note in &chord.notes {
        let pc = note.pitch_class();
        if !pcs.contains(&pc) {
            pcs.push(pc);
        }
    }
    pcs
}
