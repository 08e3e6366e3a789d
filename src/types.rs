use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// Note and chord identity

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DetectedNote {
    pub pitch_class_name: String,
    pub octave: i32,
    pub midi_number: u8,
    pub velocity: u8,
    pub timestamp_ms: f64,
}

impl DetectedNote {
    pub fn pitch_class(&self) -> u8 {
        self.midi_number % 12
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChordQuality {
    Major,
    Minor,
    Dominant7,
    Minor7,
    Major7,
    Sus2,
    Sus4,
    Diminished,
    Augmented,
}

/// Broad major/minor colour of a chord quality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualityFamily {
    MajorLike,
    MinorLike,
    Neutral,
}

impl ChordQuality {
    pub const ALL: [ChordQuality; 9] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Dominant7,
        ChordQuality::Minor7,
        ChordQuality::Major7,
        ChordQuality::Sus2,
        ChordQuality::Sus4,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Major => "maj",
            Self::Minor => "min",
            Self::Dominant7 => "7",
            Self::Minor7 => "m7",
            Self::Major7 => "maj7",
            Self::Sus2 => "sus2",
            Self::Sus4 => "sus4",
            Self::Diminished => "dim",
            Self::Augmented => "aug",
        }
    }

    pub fn family(&self) -> QualityFamily {
        match self {
            Self::Major | Self::Dominant7 | Self::Major7 => QualityFamily::MajorLike,
            Self::Minor | Self::Minor7 => QualityFamily::MinorLike,
            Self::Sus2 | Self::Sus4 | Self::Diminished | Self::Augmented => {
                QualityFamily::Neutral
            }
        }
    }

    /// Major-family qualities take upper-case roman numerals.
    pub fn is_upper_case(&self) -> bool {
        matches!(
            self,
            Self::Major | Self::Dominant7 | Self::Major7 | Self::Augmented
        )
    }
}

impl std::fmt::Display for ChordQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Major => "Major",
            Self::Minor => "Minor",
            Self::Dominant7 => "Dominant7",
            Self::Minor7 => "Minor7",
            Self::Major7 => "Major7",
            Self::Sus2 => "Sus2",
            Self::Sus4 => "Sus4",
            Self::Diminished => "Diminished",
            Self::Augmented => "Augmented",
        };
        f.write_str(name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DetectedChord {
    pub root: String,
    pub quality: ChordQuality,
    /// Constituents, lowest first.
    pub notes: Vec<DetectedNote>,
    pub timestamp_ms: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChordProgression {
    pub chords: Vec<DetectedChord>,
    pub start_timestamp_ms: f64,
    pub end_timestamp_ms: f64,
}

impl ChordProgression {
    /// True once `now_ms` is more than `silence_gap_ms` past the last chord.
    pub fn is_stale(&self, now_ms: f64, silence_gap_ms: f64) -> bool {
        now_ms - self.end_timestamp_ms > silence_gap_ms
    }
}

// Timing

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimingEvent {
    pub note_timestamp_ms: f64,
    pub expected_beat_timestamp_ms: f64,
    /// Negative when the note came early.
    pub deviation_ms: f64,
    pub beat_index: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TempoSegment {
    pub bpm: f64,
    pub start_timestamp_ms: f64,
    pub end_timestamp_ms: f64,
    pub note_count: u32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BeatGrid {
    pub start_timestamp_ms: f64,
    pub bpm: f64,
    pub beat_interval_ms: f64,
}

impl BeatGrid {
    pub fn beat_time(&self, index: i64) -> f64 {
        self.start_timestamp_ms + index as f64 * self.beat_interval_ms
    }
}

// Harmony

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    Major,
    Minor,
}

impl KeyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }

    pub fn relative(&self) -> KeyMode {
        match self {
            Self::Major => Self::Minor,
            Self::Minor => Self::Major,
        }
    }

    /// Semitones from this mode's tonic up to its relative key's tonic.
    pub fn relative_offset(&self) -> u8 {
        match self {
            Self::Major => 9,
            Self::Minor => 3,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KeyCenter {
    pub root: String,
    pub mode: KeyMode,
    /// Pearson correlation of the winning profile.
    pub confidence: f64,
}

impl KeyCenter {
    pub fn same_key(&self, other: &KeyCenter) -> bool {
        self.root == other.root && self.mode == other.mode
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KeySegment {
    pub key: KeyCenter,
    pub start_timestamp_ms: f64,
    pub end_timestamp_ms: f64,
    pub chord_count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HarmonicFunction {
    pub roman_numeral: String,
    pub quality: ChordQuality,
    pub is_secondary_dominant: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NoteAnalysis {
    pub note: DetectedNote,
    pub is_chord_tone: bool,
    pub chord_context: Option<DetectedChord>,
    /// Semitones above the chord root, when a parseable chord is present.
    pub interval_from_root: Option<u8>,
}

// Style

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Pop,
    Rock,
    Jazz,
    Blues,
    Classical,
    Folk,
    RnbSoul,
    Latin,
}

impl Genre {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pop => "pop",
            Self::Rock => "rock",
            Self::Jazz => "jazz",
            Self::Blues => "blues",
            Self::Classical => "classical",
            Self::Folk => "folk",
            Self::RnbSoul => "rnb_soul",
            Self::Latin => "latin",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PatternTag {
    ChordProgression,
    ScaleUsage,
    Rhythm,
    ChordVoicing,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenrePattern {
    pub genre: Genre,
    pub confidence: f64,
    pub matched_pattern_tags: Vec<PatternTag>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Subdivision {
    Quarter,
    Eighth,
    Triplet,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubdivisionUsage {
    pub subdivision: Subdivision,
    /// Fraction of IOIs within tolerance of this subdivision.
    pub share: f64,
    pub common: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct RhythmProfile {
    pub swing_ratio: f64,
    /// Notes per second across the buffered window.
    pub note_density: f64,
    pub subdivisions: Vec<SubdivisionUsage>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct PlayingTendencies {
    /// Pitch-class name -> weight of time spent in that key root.
    pub key_usage: BTreeMap<String, u32>,
    pub chord_quality_usage: BTreeMap<ChordQuality, u32>,
    /// Bucket lower bound (BPM) -> notes played in that bucket.
    #[serde(with = "string_keys")]
    pub tempo_histogram: BTreeMap<u32, u32>,
    /// Absolute semitone step (0..=24) -> occurrences.
    #[serde(with = "string_keys")]
    pub interval_histogram: BTreeMap<u8, u32>,
    pub rhythm: RhythmProfile,
}

/// Numeric histogram keys travel as strings so the maps survive a trip
/// through JSON object keys.
mod string_keys {
    use std::collections::BTreeMap;
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<K, S>(map: &BTreeMap<K, u32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Display,
        S: Serializer,
    {
        serializer.collect_map(map.iter().map(|(k, v)| (k.to_string(), v)))
    }

    pub fn deserialize<'de, K, D>(deserializer: D) -> Result<BTreeMap<K, u32>, D::Error>
    where
        K: FromStr + Ord,
        K::Err: Display,
        D: Deserializer<'de>,
    {
        BTreeMap::<String, u32>::deserialize(deserializer)?
            .into_iter()
            .map(|(k, v)| k.parse().map(|k| (k, v)).map_err(de::Error::custom))
            .collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TempoRange {
    pub min_bpm: u32,
    pub max_bpm: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct AvoidancePatterns {
    pub avoided_keys: Vec<String>,
    pub avoided_chord_qualities: Vec<ChordQuality>,
    pub avoided_tempo_ranges: Vec<TempoRange>,
    pub avoided_intervals: Vec<u8>,
}

impl AvoidancePatterns {
    pub fn is_empty(&self) -> bool {
        self.avoided_keys.is_empty()
            && self.avoided_chord_qualities.is_empty()
            && self.avoided_tempo_ranges.is_empty()
            && self.avoided_intervals.is_empty()
    }
}
