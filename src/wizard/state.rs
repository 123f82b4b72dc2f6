//! Wizard state machine: which step the session is on, and the
//! transition table that moves it between steps.

use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, GenerationKind, WizardError};

use super::generation::{PackingRequest, TripRequest};
use super::model::{
    PackingRecommendation, Persona, ProfileUpdate, TripPlan, TripPlanUpdate, TripRecommendation,
    UserProfile,
};
use super::validation::validate_profile;

/// The steps of the wizard, without their data.
///
/// Progresses: Persona → Vibe → Planning → Results → Packing, with back
/// edges Vibe → Persona, Planning → Vibe, Packing → Results, and start over
/// from anywhere to Persona. A trip request is not cancelled by going back,
/// so its result may also land on Persona or Vibe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    #[default]
    Persona,
    Vibe,
    Planning,
    Results,
    Packing,
}

impl StepKind {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: StepKind) -> bool {
        use StepKind::*;
        matches!(
            (self, target),
            (Persona, Vibe)
                | (Vibe, Planning)
                | (Vibe, Persona)
                | (Planning, Vibe)
                | (Planning, Results)
                // trip result arriving after back navigation
                | (Vibe, Results)
                | (Persona, Results)
                | (Results, Packing)
                | (Packing, Results)
                // start over
                | (_, Persona)
        )
    }

    /// The step `advance` moves to, if any.
    pub fn next(&self) -> Option<StepKind> {
        match self {
            Self::Persona => Some(Self::Vibe),
            Self::Vibe => Some(Self::Planning),
            _ => None,
        }
    }

    /// The step `back` moves to, if any.
    pub fn previous(&self) -> Option<StepKind> {
        match self {
            Self::Vibe => Some(Self::Persona),
            Self::Planning => Some(Self::Vibe),
            Self::Packing => Some(Self::Results),
            _ => None,
        }
    }

    /// Position in the five-step progress indicator, starting at 1.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Persona => 1,
            Self::Vibe => 2,
            Self::Planning => 3,
            Self::Results => 4,
            Self::Packing => 5,
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Persona => "persona",
            Self::Vibe => "vibe",
            Self::Planning => "planning",
            Self::Results => "results",
            Self::Packing => "packing",
        };
        write!(f, "{s}")
    }
}

/// The user gestures that can move the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardAction {
    SelectPersona,
    Advance,
    Back,
    GenerateTrip,
    GeneratePacking,
    StartOver,
}

impl std::fmt::Display for WizardAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SelectPersona => "select persona",
            Self::Advance => "advance",
            Self::Back => "go back",
            Self::GenerateTrip => "generate trip",
            Self::GeneratePacking => "generate packing",
            Self::StartOver => "start over",
        };
        write!(f, "{s}")
    }
}

/// The current step together with the artifacts that step requires.
///
/// Results and Packing cannot be built without their recommendations.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardStep {
    Persona,
    Vibe,
    Planning,
    Results {
        recommendation: TripRecommendation,
        /// Packing list from an earlier visit to the packing step.
        packing: Option<PackingRecommendation>,
    },
    Packing {
        recommendation: TripRecommendation,
        packing: PackingRecommendation,
    },
}

impl WizardStep {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Persona => StepKind::Persona,
            Self::Vibe => StepKind::Vibe,
            Self::Planning => StepKind::Planning,
            Self::Results { .. } => StepKind::Results,
            Self::Packing { .. } => StepKind::Packing,
        }
    }

    pub fn recommendation(&self) -> Option<&TripRecommendation> {
        match self {
            Self::Results { recommendation, .. } | Self::Packing { recommendation, .. } => {
                Some(recommendation)
            }
            _ => None,
        }
    }

    pub fn packing(&self) -> Option<&PackingRecommendation> {
        match self {
            Self::Results { packing, .. } => packing.as_ref(),
            Self::Packing { packing, .. } => Some(packing),
            _ => None,
        }
    }
}

/// A request built from session state, tagged with the epoch it was
/// issued in so its result can be matched back to the same session life.
#[derive(Debug, Clone)]
pub struct Issued<R> {
    pub epoch: u64,
    pub request: R,
}

/// Canonical session state: both questionnaire records plus the step.
///
/// Every mutation goes through a named operation on this type.
#[derive(Debug, Clone)]
pub struct SessionState {
    profile: UserProfile,
    trip_plan: TripPlan,
    step: WizardStep,
    /// Incremented on start over.
    epoch: u64,
    origin: String,
}

impl SessionState {
    /// Fresh state departing from `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            profile: UserProfile::default(),
            trip_plan: TripPlan::new(origin.clone()),
            step: WizardStep::Persona,
            epoch: 0,
            origin,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn trip_plan(&self) -> &TripPlan {
        &self.trip_plan
    }

    pub fn step(&self) -> &WizardStep {
        &self.step
    }

    pub fn kind(&self) -> StepKind {
        self.step.kind()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Record the persona choice. Only offered on the persona step.
    pub fn select_persona(&mut self, persona: Persona) -> Result<(), WizardError> {
        self.require(StepKind::Persona, WizardAction::SelectPersona)?;
        self.profile.persona = Some(persona);
        Ok(())
    }

    /// Move forward from the persona or vibe step.
    ///
    /// Leaving the vibe step requires a valid profile; every violation is
    /// returned at once.
    pub fn advance(&mut self) -> Result<StepKind, WizardError> {
        let next = self.edge(StepKind::next, WizardAction::Advance)?;
        if next == StepKind::Planning {
            let validation = validate_profile(&self.profile);
            if !validation.is_valid {
                return Err(WizardError::ValidationFailed {
                    errors: validation.errors,
                });
            }
        }
        self.step = match next {
            StepKind::Vibe => WizardStep::Vibe,
            _ => WizardStep::Planning,
        };
        Ok(next)
    }

    /// Move back one step where the wizard allows it.
    pub fn back(&mut self) -> Result<StepKind, WizardError> {
        let previous = self.edge(StepKind::previous, WizardAction::Back)?;
        let step = std::mem::replace(&mut self.step, WizardStep::Persona);
        self.step = match step {
            WizardStep::Vibe => WizardStep::Persona,
            WizardStep::Planning => WizardStep::Vibe,
            WizardStep::Packing {
                recommendation,
                packing,
            } => WizardStep::Results {
                recommendation,
                packing: Some(packing),
            },
            other => other,
        };
        debug_assert_eq!(self.kind(), previous);
        Ok(previous)
    }

    /// Shallow-merge into the profile. Never changes the step.
    pub fn update_profile(&mut self, update: ProfileUpdate) {
        self.profile.merge(update);
    }

    /// Shallow-merge into the trip plan. Never changes the step.
    pub fn update_trip_plan(&mut self, update: TripPlanUpdate) {
        self.trip_plan.merge(update);
    }

    /// Discard everything and return to the persona step.
    pub fn start_over(&mut self) {
        self.profile = UserProfile::default();
        self.trip_plan = TripPlan::new(self.origin.clone());
        self.step = WizardStep::Persona;
        self.epoch += 1;
    }

    /// Build a trip request from current state. Only the planning step
    /// owns the generate-trip edge.
    pub fn trip_request(&self) -> Result<Issued<TripRequest>, GenerationError> {
        if self.kind() != StepKind::Planning {
            return Err(GenerationError::NotAvailable {
                kind: GenerationKind::Trip,
                step: self.kind(),
            });
        }
        Ok(Issued {
            epoch: self.epoch,
            request: TripRequest {
                profile: self.profile.clone(),
                trip_plan: self.trip_plan.clone(),
            },
        })
    }

    /// Build a packing request from current state. Only the results step
    /// owns the generate-packing edge.
    pub fn packing_request(&self) -> Result<Issued<PackingRequest>, GenerationError> {
        if self.kind() != StepKind::Results {
            return Err(GenerationError::NotAvailable {
                kind: GenerationKind::Packing,
                step: self.kind(),
            });
        }
        Ok(Issued {
            epoch: self.epoch,
            request: PackingRequest::from_plan(&self.trip_plan, &self.profile),
        })
    }

    /// Store a trip recommendation and enter the results step.
    ///
    /// Results issued before the last start over are discarded.
    pub fn complete_trip(
        &mut self,
        epoch: u64,
        recommendation: TripRecommendation,
    ) -> Result<StepKind, GenerationError> {
        let kind = GenerationKind::Trip;
        self.accept(kind, epoch, StepKind::Results)?;
        self.step = WizardStep::Results {
            recommendation,
            packing: None,
        };
        Ok(StepKind::Results)
    }

    /// Store a packing list and enter the packing step.
    pub fn complete_packing(
        &mut self,
        epoch: u64,
        packing: PackingRecommendation,
    ) -> Result<StepKind, GenerationError> {
        let kind = GenerationKind::Packing;
        self.accept(kind, epoch, StepKind::Packing)?;
        let recommendation = match self.step.recommendation() {
            Some(recommendation) => recommendation.clone(),
            None => {
                return Err(GenerationError::NotAvailable {
                    kind,
                    step: self.kind(),
                });
            }
        };
        self.step = WizardStep::Packing {
            recommendation,
            packing,
        };
        Ok(StepKind::Packing)
    }

    /// Resolve the target of a gesture and check it against the table.
    fn edge(
        &self,
        target: impl FnOnce(&StepKind) -> Option<StepKind>,
        action: WizardAction,
    ) -> Result<StepKind, WizardError> {
        let from = self.kind();
        match target(&from) {
            Some(to) if from.can_transition_to(to) => Ok(to),
            _ => Err(self.invalid(action)),
        }
    }

    /// Check that a generation result may still be applied.
    fn accept(
        &self,
        kind: GenerationKind,
        epoch: u64,
        target: StepKind,
    ) -> Result<(), GenerationError> {
        if epoch != self.epoch {
            return Err(GenerationError::Superseded { kind });
        }
        if !self.kind().can_transition_to(target) {
            return Err(GenerationError::NotAvailable {
                kind,
                step: self.kind(),
            });
        }
        Ok(())
    }

    fn require(&self, step: StepKind, action: WizardAction) -> Result<(), WizardError> {
        if self.kind() == step {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: WizardAction) -> WizardError {
        WizardError::InvalidTransition {
            step: self.kind(),
            action,
        }
    }
}
