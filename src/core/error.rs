use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No solvent starting capital was found at or below `bound`; the true
    /// requirement is larger than any value searched.
    #[error("required capital exceeds the search bound of {bound:.2}")]
    SearchBoundExceeded { bound: f64 },
}
