pub mod analyzer;

pub use analyzer::{build_beat_grid, detect_tempo, measure_deviation, TimingAnalyzer};
