//! Field-level validation for the user profile.

use serde::{Deserialize, Serialize};

use super::model::{DestinationType, Gender, UserProfile};

/// Oldest accepted age.
pub const MAX_AGE: i32 = 120;

/// A single rule violation, attached to the field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Outcome of validating a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Check every profile rule and report all violations together.
pub fn validate_profile(profile: &UserProfile) -> ValidationResult {
    let mut errors = Vec::new();

    if profile.age <= 0 {
        errors.push(ValidationError::new("age", "Please enter a valid age"));
    } else if profile.age > MAX_AGE {
        errors.push(ValidationError::new(
            "age",
            format!("Age must be {MAX_AGE} or less"),
        ));
    }

    if Gender::from_id(&profile.gender).is_none() {
        errors.push(ValidationError::new("gender", "Please select a gender"));
    }

    if DestinationType::from_id(&profile.preferred_destination_type).is_none() {
        errors.push(ValidationError::new(
            "preferredDestinationType",
            "Please select a destination type",
        ));
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}
