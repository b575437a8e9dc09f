use thiserror::Error;

/// Failures a caller can see. Everything else degrades into a valid,
/// possibly empty, response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HealError {
    #[error("Invalid heal request: {0}")]
    InputValidation(String),

    #[error("Batch of {actual} requests exceeds the limit of {max}")]
    BatchTooLarge { max: usize, actual: usize },
}

impl HealError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        HealError::InputValidation(reason.into())
    }
}
