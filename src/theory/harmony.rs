//! Key detection, modulation tracking and roman-numeral analysis.
//!
//! Keys are found with the Krumhansl-Schmuckler method: a pitch-class
//! histogram is correlated (Pearson) against the 24 rotations of the
//! Krumhansl-Kessler major and minor profiles.

use crate::stats::{pearson, rotate_profile};
use crate::theory::chords::chord_pitch_classes;
use crate::theory::notes::{parse_pitch_class, pitch_class_name};
use crate::types::{
    ChordQuality, DetectedChord, DetectedNote, HarmonicFunction, KeyCenter, KeyMode,
    NoteAnalysis, QualityFamily,
};

/// Krumhansl-Kessler major key profile.
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler minor key profile.
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

pub const MIN_NOTES_FOR_KEY: usize = 5;
pub const MIN_KEY_CONFIDENCE: f64 = 0.45;
pub const MIN_CHORDS_FOR_KEY: usize = 3;
/// Chords at the end of the window used to test for a modulation.
pub const MODULATION_WINDOW: usize = 3;
/// Confidence multiplier applied when switching to the relative key.
const RELATIVE_KEY_PENALTY: f64 = 0.95;

struct DiatonicDegree {
    interval: u8,
    numeral: &'static str,
    quality: ChordQuality,
    /// Seventh-chord form built on the same degree, if distinct.
    seventh: Option<ChordQuality>,
}

const fn degree(
    interval: u8,
    numeral: &'static str,
    quality: ChordQuality,
    seventh: Option<ChordQuality>,
) -> DiatonicDegree {
    DiatonicDegree {
        interval,
        numeral,
        quality,
        seventh,
    }
}

const MAJOR_DEGREES: [DiatonicDegree; 7] = [
    degree(0, "I", ChordQuality::Major, Some(ChordQuality::Major7)),
    degree(2, "ii", ChordQuality::Minor, Some(ChordQuality::Minor7)),
    degree(4, "iii", ChordQuality::Minor, Some(ChordQuality::Minor7)),
    degree(5, "IV", ChordQuality::Major, Some(ChordQuality::Major7)),
    degree(7, "V", ChordQuality::Major, Some(ChordQuality::Dominant7)),
    degree(9, "vi", ChordQuality::Minor, Some(ChordQuality::Minor7)),
    degree(11, "vii°", ChordQuality::Diminished, None),
];

const MINOR_DEGREES: [DiatonicDegree; 7] = [
    degree(0, "i", ChordQuality::Minor, Some(ChordQuality::Minor7)),
    degree(2, "ii°", ChordQuality::Diminished, None),
    degree(3, "III", ChordQuality::Major, Some(ChordQuality::Major7)),
    degree(5, "iv", ChordQuality::Minor, Some(ChordQuality::Minor7)),
    degree(7, "v", ChordQuality::Minor, Some(ChordQuality::Minor7)),
    degree(8, "VI", ChordQuality::Major, Some(ChordQuality::Major7)),
    degree(10, "VII", ChordQuality::Major, Some(ChordQuality::Dominant7)),
];

/// Upper-case chromatic numerals by semitone distance from the tonic.
const CHROMATIC_NUMERALS: [&str; 12] = [
    "I", "bII", "II", "bIII", "III", "IV", "#IV", "V", "bVI", "VI", "bVII", "VII",
];

fn degrees_for(mode: KeyMode) -> &'static [DiatonicDegree; 7] {
    match mode {
        KeyMode::Major => &MAJOR_DEGREES,
        KeyMode::Minor => &MINOR_DEGREES,
    }
}

/// Detect the key of a collection of pitch classes (0-11).
///
/// Returns `None` with fewer than 5 pitch classes or when the best
/// correlation is below 0.45.
pub fn detect_key(pitch_classes: &[u8]) -> Option<KeyCenter> {
    if pitch_classes.len() < MIN_NOTES_FOR_KEY {
        return None;
    }

    let mut histogram = [0.0_f64; 12];
    for &pc in pitch_classes {
        histogram[(pc % 12) as usize] += 1.0;
    }

    let mut best_root = 0usize;
    let mut best_mode = KeyMode::Major;
    let mut best_corr = f64::NEG_INFINITY;

    for root in 0..12 {
        let major_corr = pearson(&histogram, &rotate_profile(&MAJOR_PROFILE, root));
        if major_corr > best_corr {
            best_corr = major_corr;
            best_root = root;
            best_mode = KeyMode::Major;
        }

        let minor_corr = pearson(&histogram, &rotate_profile(&MINOR_PROFILE, root));
        if minor_corr > best_corr {
            best_corr = minor_corr;
            best_root = root;
            best_mode = KeyMode::Minor;
        }
    }

    if best_corr < MIN_KEY_CONFIDENCE {
        log::trace!(
            "No key: best correlation {:.3} for {} {}",
            best_corr,
            pitch_class_name(best_root as u8),
            best_mode.as_str()
        );
        return None;
    }

    Some(KeyCenter {
        root: pitch_class_name(best_root as u8).to_string(),
        mode: best_mode,
        confidence: best_corr,
    })
}

fn pitch_classes_of(chords: &[DetectedChord]) -> Vec<u8> {
    chords
        .iter()
        .flat_map(|c| c.notes.iter().map(DetectedNote::pitch_class))
        .collect()
}

/// Detect the key implied by a chord sequence.
///
/// Key profiles cannot separate a major key from its relative minor when
/// both share the same notes, so chord roots and qualities break the tie:
/// if the relative tonic is used as a root more often than the detected
/// tonic and the chord qualities lean toward the relative mode, the relative
/// key is returned at slightly reduced confidence.
pub fn detect_key_from_chords(chords: &[DetectedChord]) -> Option<KeyCenter> {
    if chords.len() < MIN_CHORDS_FOR_KEY {
        return None;
    }
    let key = detect_key(&pitch_classes_of(chords))?;
    let tonic = parse_pitch_class(&key.root)?;
    let relative_tonic = (tonic + key.mode.relative_offset()) % 12;
    let relative_mode = key.mode.relative();

    let mut tonic_roots = 0u32;
    let mut relative_roots = 0u32;
    let mut major_like = 0u32;
    let mut minor_like = 0u32;
    for chord in chords {
        match parse_pitch_class(&chord.root) {
            Some(pc) if pc == tonic => tonic_roots += 1,
            Some(pc) if pc == relative_tonic => relative_roots += 1,
            _ => {}
        }
        match chord.quality.family() {
            QualityFamily::MajorLike => major_like += 1,
            QualityFamily::MinorLike => minor_like += 1,
            QualityFamily::Neutral => {}
        }
    }

    let qualities_favor_relative = match relative_mode {
        KeyMode::Minor => minor_like > major_like,
        KeyMode::Major => major_like > minor_like,
    };

    if relative_roots > tonic_roots && qualities_favor_relative {
        let relative = KeyCenter {
            root: pitch_class_name(relative_tonic).to_string(),
            mode: relative_mode,
            confidence: key.confidence * RELATIVE_KEY_PENALTY,
        };
        log::debug!(
            "Key {} {} reinterpreted as relative {} {}",
            key.root,
            key.mode.as_str(),
            relative.root,
            relative.mode.as_str()
        );
        return Some(relative);
    }

    Some(key)
}

/// Check whether the most recent chords point to a key other than `current`.
pub fn detect_modulation(
    current: &KeyCenter,
    recent_chords: &[DetectedChord],
) -> Option<KeyCenter> {
    if recent_chords.len() < MIN_CHORDS_FOR_KEY {
        return None;
    }
    let window = &recent_chords[recent_chords.len() - MODULATION_WINDOW..];
    let candidate = detect_key(&pitch_classes_of(window))?;
    if candidate.same_key(current) {
        return None;
    }
    log::debug!(
        "Modulation {} {} -> {} {} (confidence {:.2})",
        current.root,
        current.mode.as_str(),
        candidate.root,
        candidate.mode.as_str(),
        candidate.confidence
    );
    Some(candidate)
}

/// Roman-numeral function of `chord` within `key`.
pub fn analyze_harmonic_function(chord: &DetectedChord, key: &KeyCenter) -> HarmonicFunction {
    let (Some(chord_root), Some(key_root)) =
        (parse_pitch_class(&chord.root), parse_pitch_class(&key.root))
    else {
        return HarmonicFunction {
            roman_numeral: "?".to_string(),
            quality: chord.quality,
            is_secondary_dominant: false,
        };
    };

    let interval = (chord_root + 12 - key_root) % 12;
    let degrees = degrees_for(key.mode);

    if let Some(degree) = degrees.iter().find(|d| {
        d.interval == interval && (d.quality == chord.quality || d.seventh == Some(chord.quality))
    }) {
        return HarmonicFunction {
            roman_numeral: degree.numeral.to_string(),
            quality: chord.quality,
            is_secondary_dominant: false,
        };
    }

    if matches!(chord.quality, ChordQuality::Major | ChordQuality::Dominant7) {
        // V/x: the chord root sits a perfect fifth above degree x, x not the tonic.
        let target = degrees
            .iter()
            .find(|d| d.interval != 0 && (d.interval + 7) % 12 == interval);
        if let Some(target) = target {
            return HarmonicFunction {
                roman_numeral: format!("V/{}", target.numeral),
                quality: chord.quality,
                is_secondary_dominant: true,
            };
        }
    }

    let numeral = CHROMATIC_NUMERALS[interval as usize];
    let roman_numeral = if chord.quality.is_upper_case() {
        numeral.to_string()
    } else {
        // keep the accidental, lower the numeral
        numeral.to_lowercase()
    };
    HarmonicFunction {
        roman_numeral,
        quality: chord.quality,
        is_secondary_dominant: false,
    }
}

/// Classify `note` as a chord tone or a non-chord tone of `current_chord`.
pub fn classify_note(note: &DetectedNote, current_chord: Option<&DetectedChord>) -> NoteAnalysis {
    let Some(chord) = current_chord else {
        return NoteAnalysis {
            note: note.clone(),
            is_chord_tone: false,
            chord_context: None,
            interval_from_root: None,
        };
    };

    let pc = note.pitch_class();
    NoteAnalysis {
        note: note.clone(),
        is_chord_tone: chord_pitch_classes(chord).contains(&pc),
        chord_context: Some(chord.clone()),
        interval_from_root: parse_pitch_class(&chord.root).map(|root| (pc + 12 - root) % 12),
    }
}

pub fn key_display_name(key: &KeyCenter) -> String {
    format!("{} {}", key.root, key.mode.as_str())
}
