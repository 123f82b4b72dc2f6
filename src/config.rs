//! Configuration types.

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Origin used for new trip plans when none is configured.
pub const DEFAULT_FROM_LOCATION: &str = "New York, NY";

/// Settings injected into every wizard session at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Departure location pre-filled in a fresh trip plan.
    pub default_from_location: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_from_location: DEFAULT_FROM_LOCATION.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let default_from_location = std::env::var("VIBE_BOOKING_FROM_LOCATION")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_FROM_LOCATION.to_string());
        Self {
            default_from_location,
        }
    }
}

/// Settings for LLM-backed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// LLM temperature for both generation kinds.
    pub temperature: f32,
    /// Max tokens for the trip recommendation response.
    pub trip_max_tokens: u32,
    /// Max tokens for the packing list response.
    pub packing_max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            trip_max_tokens: 2048,
            packing_max_tokens: 2048,
        }
    }
}

impl GenerationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            temperature: env_parse("VIBE_BOOKING_TEMPERATURE").unwrap_or(defaults.temperature),
            trip_max_tokens: env_parse("VIBE_BOOKING_TRIP_MAX_TOKENS")
                .unwrap_or(defaults.trip_max_tokens),
            packing_max_tokens: env_parse("VIBE_BOOKING_PACKING_MAX_TOKENS")
                .unwrap_or(defaults.packing_max_tokens),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("VIBE_BOOKING_PORT").unwrap_or(Self::default().port),
        }
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub generation: GenerationConfig,
    pub server: ServerConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// The API key for the selected backend is required; everything else
    /// has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match std::env::var("VIBE_BOOKING_LLM_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => LlmBackend::Anthropic,
        };

        let key_var = backend.api_key_var();
        let api_key = std::env::var(key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model = std::env::var("VIBE_BOOKING_MODEL")
            .unwrap_or_else(|_| backend.default_model().to_string());

        Ok(Self {
            session: SessionConfig::from_env(),
            generation: GenerationConfig::from_env(),
            server: ServerConfig::from_env(),
            llm: LlmConfig {
                backend,
                api_key: secrecy::SecretString::from(api_key),
                model,
            },
        })
    }
}

/// Parse an env var, treating missing or malformed values as unset.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
