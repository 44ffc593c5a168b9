//! Error types for the outfit tracker.

use thiserror::Error;

/// Errors raised by outfit state operations.
#[derive(Debug, Error)]
pub enum OutfitError {
    /// A slot name outside the fixed vocabulary.
    #[error("Unknown outfit slot: {slot}")]
    InvalidSlot { slot: String },

    /// A preset name that cannot be chosen by the user.
    #[error("Preset name '{name}' is reserved")]
    ReservedPresetName { name: String },

    /// An empty or whitespace-only preset name.
    #[error("Preset name must not be empty")]
    EmptyPresetName,

    /// A bot manager was used before a character was selected.
    #[error("No character is selected")]
    NoCharacter,

    /// An operation needed a live instance but none is active.
    #[error("No active outfit instance")]
    NoInstance,

    /// The persistence collaborator failed.
    #[error("Persistence error: {0}")]
    Persistence(#[source] anyhow::Error),

    /// Persisted state could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The language-model path failed after exhausting its retries.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Errors from the language-model collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The transport failed (network, provider error). Retryable.
    #[error("Generation transport error: {message}")]
    Transport { message: String },

    /// The model returned nothing usable. Retryable.
    #[error("Generation returned an empty response")]
    EmptyResponse,

    /// The request itself is invalid; retrying will not help.
    #[error("Generation rejected: {message}")]
    Rejected { message: String },

    /// Every attempt, including the profile-less fallback, failed.
    #[error("Generation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<GenerationError> },
}

impl GenerationError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Transport { .. } | GenerationError::EmptyResponse
        )
    }
}

/// Result alias for outfit operations.
pub type Result<T> = std::result::Result<T, OutfitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GenerationError::EmptyResponse.is_retryable());
        assert!(GenerationError::Transport {
            message: "timeout".into()
        }
        .is_retryable());
        assert!(!GenerationError::Rejected {
            message: "bad prompt".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_exhausted_message_names_last_error() {
        let err = GenerationError::Exhausted {
            attempts: 4,
            last: Box::new(GenerationError::EmptyResponse),
        };
        assert_eq!(
            err.to_string(),
            "Generation failed after 4 attempts: Generation returned an empty response"
        );
    }
}
