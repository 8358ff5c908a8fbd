use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A hard reference-data dependency is empty or absent. Nothing can be
    /// classified without it, so the whole run aborts.
    #[error("required reference data is missing or empty: {catalog}")]
    MissingReferenceData { catalog: &'static str },
    #[error("invalid reference data: {0}")]
    InvalidReferenceData(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Run-level failures require re-running the whole batch; per-entity
    /// issues never surface here, they are recovered with fallbacks.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApplicationError::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationError, DomainError};

    #[test]
    fn missing_reference_data_is_not_retryable() {
        let error = ApplicationError::from(DomainError::MissingReferenceData {
            catalog: "classification_rules",
        });
        assert!(!error.is_retryable());
    }

    #[test]
    fn persistence_failures_are_retryable() {
        let error = ApplicationError::Persistence("database lock timeout".to_owned());
        assert!(error.is_retryable());
    }
}
