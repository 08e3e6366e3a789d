pub mod genre;
pub mod templates;
pub mod tendencies;

pub use genre::detect_genre_patterns;
pub use tendencies::{detect_avoidance, detect_avoidance_with_config, track_tendencies};
