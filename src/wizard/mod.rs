//! The booking wizard.
//!
//! Profile validation, the step state machine, the shared session that
//! owns wizard state, and the orchestrator that runs trip and packing
//! generation against it.

pub mod generation;
pub mod llm_service;
pub mod model;
pub mod prompts;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

pub use generation::{GenerationOrchestrator, GenerationService, PackingRequest, TripRequest};
pub use llm_service::LlmGenerationService;
pub use model::{
    Companions, DestinationType, Gender, PackingItem, PackingRecommendation, Persona,
    ProfileUpdate, ShopItem, TripPlan, TripPlanUpdate, TripRecommendation, UserProfile,
};
pub use routes::{WizardRouteState, wizard_routes};
pub use session::{InFlightGuard, SessionEvent, SessionSnapshot, WizardSession};
pub use state::{SessionState, StepKind, WizardAction, WizardStep};
pub use validation::{ValidationError, ValidationResult, validate_profile};
