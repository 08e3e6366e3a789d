//! Genre affinity scoring over an accumulator snapshot.
//!
//! Each template is scored on four independent signals: chord progression
//! shapes, scale usage, rhythmic feel and chord voicing. The weights and
//! thresholds below are calibration constants.

use crate::accumulator::AnalysisAccumulator;
use crate::stats::{cosine_similarity, inter_onset_intervals, rotate_profile, swing_ratio};
use crate::style::templates::{progression_pattern, GenreTemplate, GENRE_TEMPLATES};
use crate::theory::notes::parse_pitch_class;
use crate::types::{GenrePattern, PatternTag};

pub const PROGRESSION_WEIGHT: f64 = 0.4;
pub const SCALE_WEIGHT: f64 = 0.3;
pub const RHYTHM_WEIGHT: f64 = 0.2;
pub const VOICING_WEIGHT: f64 = 0.1;

/// Minimum combined score for a genre to be reported.
pub const MIN_GENRE_CONFIDENCE: f64 = 0.25;

const MIN_CHORDS: usize = 3;
const MIN_NOTES: usize = 8;

/// Fraction of windows that must match for a full progression score.
const PROGRESSION_MATCH_DENSITY: f64 = 0.3;
/// IOIs at or above this are pauses, not rhythm.
const MAX_RHYTHM_IOI_MS: f64 = 2000.0;
/// Swing ratio above which the playing is considered swung.
const SWING_THRESHOLD: f64 = 0.4;
const RHYTHM_MATCH_SCORE: f64 = 0.8;
const RHYTHM_PARTIAL_MAX: f64 = 0.4;

const PROGRESSION_TAG_THRESHOLD: f64 = 0.3;
const SCALE_TAG_THRESHOLD: f64 = 0.85;
const VOICING_TAG_THRESHOLD: f64 = 0.5;

struct Evidence {
    roots: Vec<u8>,
    pitch_profile: Option<[f64; 12]>,
    swing_ratio: Option<f64>,
}

fn gather_evidence(acc: &AnalysisAccumulator) -> Evidence {
    let roots: Vec<u8> = acc
        .chords
        .iter()
        .filter_map(|c| parse_pitch_class(&c.root))
        .collect();

    let pitch_profile = if acc.notes.is_empty() {
        None
    } else {
        let mut histogram = [0.0_f64; 12];
        for note in &acc.notes {
            histogram[note.pitch_class() as usize] += 1.0;
        }
        let total = acc.notes.len() as f64;
        for bin in &mut histogram {
            *bin /= total;
        }
        Some(histogram)
    };

    let iois = inter_onset_intervals(&acc.note_timestamps(), 0.0, MAX_RHYTHM_IOI_MS);

    Evidence {
        roots,
        pitch_profile,
        swing_ratio: swing_ratio(&iois),
    }
}

fn progression_score(template: &GenreTemplate, roots: &[u8]) -> f64 {
    let mut best = 0.0_f64;
    for progression in template.progressions {
        let Some(pattern) = progression_pattern(progression) else {
            continue;
        };
        if roots.len() < pattern.len() {
            continue;
        }
        let windows = roots.len() - pattern.len() + 1;
        let matches = roots
            .windows(pattern.len())
            .filter(|w| {
                w.iter()
                    .zip(pattern.iter())
                    .all(|(root, expected)| (root + 12 - w[0]) % 12 == *expected)
            })
            .count();
        let score = (matches as f64 / (windows as f64 * PROGRESSION_MATCH_DENSITY)).min(1.0);
        best = best.max(score);
    }
    best
}

fn scale_score(template: &GenreTemplate, profile: &[f64; 12]) -> f64 {
    (0..12)
        .map(|root| cosine_similarity(profile, &rotate_profile(&template.scale_profile, root)))
        .fold(0.0, f64::max)
}

/// Returns the score and whether the feel matched the template.
fn rhythm_score(template: &GenreTemplate, swing_ratio: f64) -> (f64, bool) {
    let swung = swing_ratio > SWING_THRESHOLD;
    if swung == template.swing {
        return (RHYTHM_MATCH_SCORE, true);
    }
    let closeness = if template.swing {
        swing_ratio / SWING_THRESHOLD
    } else {
        (1.0 - swing_ratio) / (1.0 - SWING_THRESHOLD)
    };
    (RHYTHM_PARTIAL_MAX * closeness.clamp(0.0, 1.0), false)
}

fn voicing_score(template: &GenreTemplate, acc: &AnalysisAccumulator) -> f64 {
    if acc.chords.is_empty() {
        return 0.0;
    }
    let preferred = acc
        .chords
        .iter()
        .filter(|c| template.preferred_qualities.contains(&c.quality))
        .count();
    preferred as f64 / acc.chords.len() as f64
}

fn score_template(
    template: &GenreTemplate,
    evidence: &Evidence,
    acc: &AnalysisAccumulator,
) -> Option<GenrePattern> {
    let mut tags = Vec::new();

    let progression = progression_score(template, &evidence.roots);
    if progression >= PROGRESSION_TAG_THRESHOLD {
        tags.push(PatternTag::ChordProgression);
    }

    let scale = evidence
        .pitch_profile
        .as_ref()
        .map(|p| scale_score(template, p))
        .unwrap_or(0.0);
    if scale >= SCALE_TAG_THRESHOLD {
        tags.push(PatternTag::ScaleUsage);
    }

    let rhythm = match evidence.swing_ratio {
        Some(ratio) => {
            let (score, matched) = rhythm_score(template, ratio);
            if matched {
                tags.push(PatternTag::Rhythm);
            }
            score
        }
        None => 0.0,
    };

    let voicing = voicing_score(template, acc);
    if voicing >= VOICING_TAG_THRESHOLD {
        tags.push(PatternTag::ChordVoicing);
    }

    let confidence = (progression * PROGRESSION_WEIGHT
        + scale * SCALE_WEIGHT
        + rhythm * RHYTHM_WEIGHT
        + voicing * VOICING_WEIGHT)
        .clamp(0.0, 1.0);

    log::trace!(
        "{}: progression {:.2} scale {:.2} rhythm {:.2} voicing {:.2} -> {:.2}",
        template.genre.as_str(),
        progression,
        scale,
        rhythm,
        voicing,
        confidence
    );

    if confidence < MIN_GENRE_CONFIDENCE || tags.is_empty() {
        return None;
    }
    Some(GenrePattern {
        genre: template.genre,
        confidence,
        matched_pattern_tags: tags,
    })
}

/// Score the accumulated notes and chords against every genre template.
///
/// Returns qualifying genres sorted by confidence, highest first, or an
/// empty list when there is too little material to judge.
pub fn detect_genre_patterns(acc: &AnalysisAccumulator) -> Vec<GenrePattern> {
    if acc.chords.len() < MIN_CHORDS && acc.notes.len() < MIN_NOTES {
        return Vec::new();
    }

    let evidence = gather_evidence(acc);
    let mut patterns: Vec<GenrePattern> = GENRE_TEMPLATES
        .iter()
        .filter_map(|template| score_template(template, &evidence, acc))
        .collect();

    patterns.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    log::debug!(
        "Genre scoring over {} notes / {} chords: {} matches",
        acc.notes.len(),
        acc.chords.len(),
        patterns.len()
    );
    patterns
}
