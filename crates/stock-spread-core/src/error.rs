use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpreadError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Optimization infeasible in {stage}: {reason}")]
    OptimizationInfeasible { stage: String, reason: String },

    #[error("Optimization timeout: {stage} did not converge after {iterations} iterations")]
    OptimizationTimeout { stage: String, iterations: u32 },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SpreadError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SpreadError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for failures of the optimizer itself rather than of the caller's input.
    pub fn is_optimization_failure(&self) -> bool {
        matches!(
            self,
            SpreadError::OptimizationInfeasible { .. } | SpreadError::OptimizationTimeout { .. }
        )
    }
}

impl From<serde_json::Error> for SpreadError {
    fn from(e: serde_json::Error) -> Self {
        SpreadError::SerializationError(e.to_string())
    }
}
