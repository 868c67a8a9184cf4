//! Error taxonomy for the simulation
//!
//! Most of these are recovered locally: a shot that cannot be pooled is
//! skipped, a bad facing request is ignored, an under-dense layout is
//! regenerated. Only a missing collaborator stops level setup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("projectile pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },
    #[error("invalid direction {0}, expected -1 or +1")]
    InvalidDirection(i32),
    #[error("generated layout has {count} children, minimum is {minimum}")]
    GenerationUnderDensity { count: usize, minimum: usize },
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error("invalid level configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("failed to read level configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Whether gameplay can continue after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SimError::MissingCollaborator(_) | SimError::Config(_) | SimError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(SimError::PoolExhausted { capacity: 3 }.is_recoverable());
        assert!(SimError::InvalidDirection(0).is_recoverable());
        assert!(
            SimError::GenerationUnderDensity {
                count: 10,
                minimum: 32
            }
            .is_recoverable()
        );
        assert!(!SimError::MissingCollaborator("ground sensor").is_recoverable());
    }

    #[test]
    fn test_messages() {
        let err = SimError::InvalidDirection(2);
        assert_eq!(err.to_string(), "invalid direction 2, expected -1 or +1");
    }
}
