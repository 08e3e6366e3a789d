pub mod chords;
pub mod harmony;
pub mod notes;
