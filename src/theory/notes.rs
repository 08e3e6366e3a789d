use crate::error::AnalysisError;
use crate::types::DetectedNote;

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub fn pitch_class_name(pc: u8) -> &'static str {
    NOTE_NAMES[(pc % 12) as usize]
}

/// Map a note-on to its structured form. Pitch 60 is C4.
pub fn map_note(pitch: u8, velocity: u8, timestamp_ms: f64) -> DetectedNote {
    DetectedNote {
        pitch_class_name: pitch_class_name(pitch).to_string(),
        octave: pitch as i32 / 12 - 1,
        midi_number: pitch,
        velocity,
        timestamp_ms,
    }
}

/// Range-checked `map_note` for untrusted callers.
pub fn try_map_note(
    pitch: i32,
    velocity: i32,
    timestamp_ms: f64,
) -> Result<DetectedNote, AnalysisError> {
    if !(0..=127).contains(&pitch) {
        return Err(AnalysisError::InvalidInput(format!(
            "pitch must be in 0..=127, got {}",
            pitch
        )));
    }
    if !(0..=127).contains(&velocity) {
        return Err(AnalysisError::InvalidInput(format!(
            "velocity must be in 0..=127, got {}",
            velocity
        )));
    }
    if !timestamp_ms.is_finite() {
        return Err(AnalysisError::InvalidInput(format!(
            "timestamp must be finite, got {}",
            timestamp_ms
        )));
    }
    Ok(map_note(pitch as u8, velocity as u8, timestamp_ms))
}

pub fn note_display_name(note: &DetectedNote) -> String {
    format!("{}{}", note.pitch_class_name, note.octave)
}

/// Parse a pitch-class spelling such as "C", "F#", "Bb" or "E♭♭".
///
/// Any number of sharps/flats may follow the letter; anything else yields
/// `None` since upstream spelling is not guaranteed to be consistent.
pub fn parse_pitch_class(name: &str) -> Option<u8> {
    let name = name.trim();
    let mut chars = name.chars();
    let base: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let mut alter = 0i32;
    for c in chars {
        match c {
            '#' | '♯' => alter += 1,
            'b' | '♭' => alter -= 1,
            _ => return None,
        }
    }
    Some((base + alter).rem_euclid(12) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_c() {
        let note = map_note(60, 100, 1000.0);
        assert_eq!(note.pitch_class_name, "C");
        assert_eq!(note.octave, 4);
        assert_eq!(note.midi_number, 60);
        assert_eq!(note.velocity, 100);
        assert_eq!(note.timestamp_ms, 1000.0);
    }

    #[test]
    fn test_display_name_extremes() {
        assert_eq!(note_display_name(&map_note(0, 1, 0.0)), "C-1");
        assert_eq!(note_display_name(&map_note(60, 1, 0.0)), "C4");
        assert_eq!(note_display_name(&map_note(69, 1, 0.0)), "A4");
        assert_eq!(note_display_name(&map_note(127, 1, 0.0)), "G9");
    }

    #[test]
    fn test_display_name_roundtrip() {
        for pitch in 0..=127u8 {
            let note = map_note(pitch, 64, 0.0);
            let name = note_display_name(&note);
            let split = name
                .find(|c: char| c == '-' || c.is_ascii_digit())
                .unwrap();
            let (pc_name, octave) = name.split_at(split);
            let pc = parse_pitch_class(pc_name).unwrap();
            let octave: i32 = octave.parse().unwrap();
            assert_eq!((octave + 1) * 12 + pc as i32, pitch as i32, "pitch {}", pitch);
        }
    }

    #[test]
    fn test_parse_spellings() {
        assert_eq!(parse_pitch_class("C"), Some(0));
        assert_eq!(parse_pitch_class("Bb"), Some(10));
        assert_eq!(parse_pitch_class("A#"), Some(10));
        assert_eq!(parse_pitch_class("Cb"), Some(11));
        assert_eq!(parse_pitch_class("E#"), Some(5));
        assert_eq!(parse_pitch_class("D♭"), Some(1));
        assert_eq!(parse_pitch_class("H"), None);
        assert_eq!(parse_pitch_class(""), None);
        assert_eq!(parse_pitch_class("C4"), None);
    }

    #[test]
    fn test_try_map_note_rejects_out_of_range() {
        assert!(try_map_note(128, 100, 0.0).is_err());
        assert!(try_map_note(-1, 100, 0.0).is_err());
        assert!(try_map_note(60, 200, 0.0).is_err());
        assert!(try_map_note(60, 100, f64::NAN).is_err());
        assert_eq!(try_map_note(60, 100, 5.0).unwrap(), map_note(60, 100, 5.0));
    }
}
