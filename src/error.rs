use thiserror::Error;

/// Errors raised at validation boundaries. The analyzers themselves never fail
/// on musical input; they return `None` or empty results instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_wasm_bindgen::Error> for AnalysisError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        AnalysisError::Serialization(e.to_string())
    }
}
