//! Small numeric helpers shared by the timing, harmony and style analyzers.

/// Median of `values`. Even-length input averages the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median absolute deviation around `center`.
pub fn median_abs_deviation(values: &[f64], center: f64) -> Option<f64> {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Pearson correlation coefficient. Returns 0 when either side is constant.
pub fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let x_mean: f64 = x.iter().sum::<f64>() / 12.0;
    let y_mean: f64 = y.iter().sum::<f64>() / 12.0;

    let mut num = 0.0;
    let mut x_sq = 0.0;
    let mut y_sq = 0.0;

    for i in 0..12 {
        let xd = x[i] - x_mean;
        let yd = y[i] - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    num / denom
}

/// Cosine similarity. Returns 0 when either vector is all zeros.
pub fn cosine_similarity(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let dot: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let nx = x.iter().map(|a| a * a).sum::<f64>().sqrt();
    let ny = y.iter().map(|b| b * b).sum::<f64>().sqrt();
    if nx < 1e-10 || ny < 1e-10 {
        return 0.0;
    }
    dot / (nx * ny)
}

/// Rotate a pitch-class profile so that index 0 lands on `root`.
pub fn rotate_profile(profile: &[f64; 12], root: usize) -> [f64; 12] {
    let mut rotated = [0.0; 12];
    for (i, slot) in rotated.iter_mut().enumerate() {
        *slot = profile[(i + 12 - root % 12) % 12];
    }
    rotated
}

/// Intervals between consecutive timestamps, keeping those inside (min, max).
pub fn inter_onset_intervals(timestamps: &[f64], min_ms: f64, max_ms: f64) -> Vec<f64> {
    timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|ioi| *ioi > min_ms && *ioi < max_ms)
        .collect()
}

const SWING_RATIO_MIN: f64 = 1.3;
const SWING_RATIO_MAX: f64 = 2.5;
const STRAIGHT_RATIO_MIN: f64 = 0.7;

/// Share of long-short IOI pairs among all classified pairs.
///
/// Consecutive IOI pairs with a ratio in [1.3, 2.5] count as long-short,
/// [0.7, 1.3) as straight; anything else is left unclassified. Returns
/// `None` when no pair could be classified.
pub fn swing_ratio(iois: &[f64]) -> Option<f64> {
    let mut long_short = 0u32;
    let mut straight = 0u32;
    for pair in iois.windows(2) {
        if pair[1] <= 0.0 {
            continue;
        }
        let ratio = pair[0] / pair[1];
        if (SWING_RATIO_MIN..=SWING_RATIO_MAX).contains(&ratio) {
            long_short += 1;
        } else if (STRAIGHT_RATIO_MIN..SWING_RATIO_MIN).contains(&ratio) {
            straight += 1;
        }
    }
    let classified = long_short + straight;
    if classified == 0 {
        return None;
    }
    Some(long_short as f64 / classified as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mad() {
        let values = [1.0, 1.0, 2.0, 2.0, 4.0, 6.0, 9.0];
        let center = median(&values).unwrap();
        assert_eq!(center, 2.0);
        assert_eq!(median_abs_deviation(&values, center), Some(1.0));
    }

    #[test]
    fn test_pearson_identical_and_constant() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        assert_relative_eq!(pearson(&a, &a), 1.0, epsilon = 1e-12);
        assert_eq!(pearson(&a, &[1.0; 12]), 0.0);
    }

    #[test]
    fn test_rotate_profile() {
        let mut profile = [0.0; 12];
        profile[0] = 1.0;
        let rotated = rotate_profile(&profile, 7);
        assert_eq!(rotated[7], 1.0);
        assert_eq!(rotated[0], 0.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0; 12], &[1.0; 12]), 0.0);
        assert_relative_eq!(cosine_similarity(&[2.0; 12], &[1.0; 12]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_swing_ratio() {
        // long-short-long-short triplet feel
        let swung = [400.0, 200.0, 400.0, 200.0, 400.0, 200.0];
        assert_eq!(swing_ratio(&swung), Some(1.0));
        let straight = [300.0, 300.0, 300.0, 300.0];
        assert_eq!(swing_ratio(&straight), Some(0.0));
        assert_eq!(swing_ratio(&[300.0]), None);
    }

    #[test]
    fn test_ioi_filtering() {
        let ts = [0.0, 100.0, 100.0, 2600.0, 2900.0];
        assert_eq!(inter_onset_intervals(&ts, 0.0, 2000.0), vec![100.0, 300.0]);
    }
}
