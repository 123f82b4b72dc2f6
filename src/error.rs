//! Error types for Vibe Booking.

use crate::wizard::state::{StepKind, WizardAction};
use crate::wizard::validation::ValidationError;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Wizard transition errors.
///
/// Validation failures are carried as data so the presentation can attach
/// them to the originating step.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Cannot {action} from step {step}")]
    InvalidTransition { step: StepKind, action: WizardAction },

    #[error("Profile validation failed with {} error(s)", .errors.len())]
    ValidationFailed { errors: Vec<ValidationError> },
}

/// Errors from trip or packing generation requests.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("A {kind} request is already in flight")]
    AlreadyInFlight { kind: GenerationKind },

    #[error("Cannot generate {kind} from step {step}")]
    NotAvailable { kind: GenerationKind, step: StepKind },

    #[error("Session was reset while the {kind} request was outstanding")]
    Superseded { kind: GenerationKind },

    #[error("Invalid {kind} response: {reason}")]
    InvalidResponse { kind: GenerationKind, reason: String },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

impl GenerationError {
    /// Whether the request was turned away before reaching the service.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::AlreadyInFlight { .. } | Self::NotAvailable { .. })
    }
}

/// The two kinds of generation request. At most one of each kind may be
/// outstanding at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Trip,
    Packing,
}

impl std::fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trip => write!(f, "trip"),
            Self::Packing => write!(f, "packing"),
        }
    }
}
