use crate::types::{ChordQuality, Genre};
use ChordQuality::*;

pub struct GenreTemplate {
    pub genre: Genre,
    /// Characteristic progressions as roman numerals relative to the tonic.
    pub progressions: &'static [&'static [&'static str]],
    /// Pitch-class weights relative to the tonic.
    pub scale_profile: [f64; 12],
    pub preferred_qualities: &'static [ChordQuality],
    pub swing: bool,
}

pub const GENRE_TEMPLATES: [GenreTemplate; 8] = [
    GenreTemplate {
        genre: Genre::Pop,
        progressions: &[
            &["I", "V", "vi", "IV"],
            &["vi", "IV", "I", "V"],
            &["I", "vi", "IV", "V"],
            &["I", "IV", "V"],
        ],
        scale_profile: [1.0, 0.0, 0.8, 0.0, 0.9, 0.7, 0.0, 0.9, 0.0, 0.8, 0.0, 0.5],
        preferred_qualities: &[Major, Minor],
        swing: false,
    },
    GenreTemplate {
        genre: Genre::Rock,
        progressions: &[
            &["I", "bVII", "IV"],
            &["I", "bIII", "IV"],
            &["I", "V", "IV"],
            &["I", "IV", "V"],
        ],
        scale_profile: [1.0, 0.0, 0.7, 0.5, 0.8, 0.8, 0.0, 0.9, 0.0, 0.7, 0.6, 0.3],
        preferred_qualities: &[Major, Sus4, Sus2],
        swing: false,
    },
    GenreTemplate {
        genre: Genre::Jazz,
        progressions: &[
            &["ii", "V", "I"],
            &["I", "vi", "ii", "V"],
            &["iii", "vi", "ii", "V"],
        ],
        scale_profile: [1.0, 0.3, 0.8, 0.5, 0.8, 0.6, 0.4, 0.9, 0.4, 0.8, 0.6, 0.7],
        preferred_qualities: &[Major7, Minor7, Dominant7, Diminished],
        swing: true,
    },
    GenreTemplate {
        genre: Genre::Blues,
        progressions: &[
            &["I", "IV", "I", "V"],
            &["I", "IV", "V", "IV"],
            &["I", "I", "IV", "I"],
        ],
        scale_profile: [1.0, 0.0, 0.3, 0.9, 0.5, 0.8, 0.7, 0.9, 0.0, 0.3, 0.9, 0.0],
        preferred_qualities: &[Dominant7, Major],
        swing: true,
    },
    GenreTemplate {
        genre: Genre::Classical,
        progressions: &[
            &["I", "IV", "V", "I"],
            &["I", "ii", "V", "I"],
            &["IV", "V", "I"],
            &["vi", "ii", "V", "I"],
        ],
        scale_profile: [1.0, 0.1, 0.8, 0.2, 0.9, 0.7, 0.2, 0.9, 0.2, 0.7, 0.1, 0.8],
        preferred_qualities: &[Major, Minor, Diminished, Dominant7],
        swing: false,
    },
    GenreTemplate {
        genre: Genre::Folk,
        progressions: &[
            &["I", "IV", "I", "V"],
            &["I", "V", "IV", "I"],
            &["I", "IV", "V", "I"],
        ],
        scale_profile: [1.0, 0.0, 0.9, 0.0, 0.9, 0.3, 0.0, 0.9, 0.0, 0.9, 0.0, 0.2],
        preferred_qualities: &[Major, Minor, Sus2, Sus4],
        swing: false,
    },
    GenreTemplate {
        genre: Genre::RnbSoul,
        progressions: &[
            &["ii", "V", "I"],
            &["IV", "V", "iii", "vi"],
            &["ii", "iii", "IV"],
            &["I", "vi", "ii", "V"],
        ],
        scale_profile: [1.0, 0.0, 0.7, 0.6, 0.6, 0.8, 0.2, 0.9, 0.1, 0.6, 0.8, 0.4],
        preferred_qualities: &[Minor7, Major7, Dominant7],
        swing: true,
    },
    GenreTemplate {
        genre: Genre::Latin,
        progressions: &[
            &["i", "iv", "V"],
            &["i", "bVII", "bVI", "V"],
            &["ii", "V", "i"],
        ],
        scale_profile: [1.0, 0.2, 0.7, 0.9, 0.1, 0.8, 0.0, 0.9, 0.8, 0.1, 0.3, 0.7],
        preferred_qualities: &[Minor, Major, Dominant7, Minor7],
        swing: false,
    },
];

/// Semitone offset of a roman numeral ("bVII" -> 10, "vi" -> 9).
pub fn numeral_offset(numeral: &str) -> Option<u8> {
    let (alter, rest): (i32, &str) = if let Some(rest) = numeral.strip_prefix('b') {
        (-1, rest)
    } else if let Some(rest) = numeral.strip_prefix('#') {
        (1, rest)
    } else {
        (0, numeral)
    };
    let degree: i32 = match rest.to_ascii_uppercase().as_str() {
        "I" => 0,
        "II" => 2,
        "III" => 4,
        "IV" => 5,
        "V" => 7,
        "VI" => 9,
        "VII" => 11,
        _ => return None,
    };
    Some((degree + alter).rem_euclid(12) as u8)
}

/// Intervals of each chord of `progression` above its first chord.
pub fn progression_pattern(progression: &[&str]) -> Option<Vec<u8>> {
    let offsets: Vec<u8> = progression
        .iter()
        .map(|n| numeral_offset(n))
        .collect::<Option<_>>()?;
    let first = *offsets.first()?;
    Some(offsets.iter().map(|o| (o + 12 - first) % 12).collect())
}
