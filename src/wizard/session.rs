//! WizardSession: single owner of the session state, with broadcast
//! notifications for the presentation layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{GenerationError, GenerationKind, WizardError};

use super::generation::{PackingRequest, TripRequest};
use super::model::{
    PackingRecommendation, Persona, ProfileUpdate, TripPlan, TripPlanUpdate, TripRecommendation,
    UserProfile,
};
use super::state::{Issued, SessionState, StepKind};
use super::validation::ValidationError;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Read-only view of the session handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub step: StepKind,
    pub step_number: u8,
    pub profile: UserProfile,
    pub trip_plan: TripPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<TripRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packing: Option<PackingRecommendation>,
    pub generating_trip: bool,
    pub generating_packing: bool,
}

/// Session notifications (server → presentation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Full state (sent on connect and after a lagged receiver).
    SessionSync { snapshot: Box<SessionSnapshot> },
    /// The wizard moved to another step.
    StepChanged { from: StepKind, to: StepKind },
    /// Leaving the vibe step was refused.
    ValidationFailed { errors: Vec<ValidationError> },
    ProfileUpdated { profile: UserProfile },
    TripPlanUpdated { trip_plan: TripPlan },
    GenerationStarted { kind: GenerationKind },
    /// A generation call failed; the step is unchanged and the user may retry.
    GenerationFailed { kind: GenerationKind, reason: String },
    /// The in-flight indicator for `kind` was cleared.
    GenerationSettled { kind: GenerationKind },
    /// Start over discarded the session.
    SessionReset,
}

/// Owns the canonical `SessionState`. All reads and merge-updates go
/// through this type.
pub struct WizardSession {
    id: Uuid,
    state: RwLock<SessionState>,
    tx: broadcast::Sender<SessionEvent>,
    trip_in_flight: AtomicBool,
    packing_in_flight: AtomicBool,
}

impl WizardSession {
    /// Start a session with documented defaults and the configured origin.
    pub fn new(config: &SessionConfig) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            state: RwLock::new(SessionState::new(config.default_from_location.clone())),
            tx,
            trip_in_flight: AtomicBool::new(false),
            packing_in_flight: AtomicBool::new(false),
        });
        info!(
            session_id = %session.id,
            origin = %config.default_from_location,
            "Wizard session started"
        );
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Subscribe to session events. Each presentation client calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            session_id: self.id,
            step: state.kind(),
            step_number: state.kind().ordinal(),
            profile: state.profile().clone(),
            trip_plan: state.trip_plan().clone(),
            recommendation: state.step().recommendation().cloned(),
            packing: state.step().packing().cloned(),
            generating_trip: self.is_in_flight(GenerationKind::Trip),
            generating_packing: self.is_in_flight(GenerationKind::Packing),
        }
    }

    pub async fn select_persona(&self, persona: Persona) -> Result<UserProfile, WizardError> {
        let profile = {
            let mut state = self.state.write().await;
            state.select_persona(persona)?;
            state.profile().clone()
        };
        debug!(session_id = %self.id, persona = %persona, "Persona selected");
        self.notify(SessionEvent::ProfileUpdated {
            profile: profile.clone(),
        });
        Ok(profile)
    }

    pub async fn advance(&self) -> Result<StepKind, WizardError> {
        let result = self.transition(|state| state.advance()).await;
        if let Err(WizardError::ValidationFailed { errors }) = &result {
            debug!(
                session_id = %self.id,
                errors = errors.len(),
                "Profile validation blocked advance"
            );
            self.notify(SessionEvent::ValidationFailed {
                errors: errors.clone(),
            });
        }
        result
    }

    pub async fn back(&self) -> Result<StepKind, WizardError> {
        self.transition(|state| state.back()).await
    }

    /// Merge into the profile from any step.
    pub async fn update_profile(&self, update: ProfileUpdate) -> UserProfile {
        let profile = {
            let mut state = self.state.write().await;
            state.update_profile(update);
            state.profile().clone()
        };
        self.notify(SessionEvent::ProfileUpdated {
            profile: profile.clone(),
        });
        profile
    }

    /// Merge into the trip plan from any step.
    pub async fn update_trip_plan(&self, update: TripPlanUpdate) -> TripPlan {
        let trip_plan = {
            let mut state = self.state.write().await;
            state.update_trip_plan(update);
            state.trip_plan().clone()
        };
        self.notify(SessionEvent::TripPlanUpdated {
            trip_plan: trip_plan.clone(),
        });
        trip_plan
    }

    /// Discard the session and return to the persona step.
    ///
    /// Outstanding requests are not cancelled; their results are dropped
    /// when they arrive.
    pub async fn start_over(&self) {
        let from = {
            let mut state = self.state.write().await;
            let from = state.kind();
            state.start_over();
            from
        };
        info!(session_id = %self.id, from = %from, "Session reset");
        self.notify(SessionEvent::SessionReset);
        if from != StepKind::Persona {
            self.notify(SessionEvent::StepChanged {
                from,
                to: StepKind::Persona,
            });
        }
    }

    /// Whether a request of `kind` is outstanding.
    pub fn is_in_flight(&self, kind: GenerationKind) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }

    /// Try to mark a request of `kind` as in flight.
    ///
    /// Returns `None` if one is already outstanding. The indicator is
    /// cleared when the returned guard is dropped.
    pub fn try_begin(&self, kind: GenerationKind) -> Option<InFlightGuard<'_>> {
        self.flag(kind)
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        debug!(session_id = %self.id, kind = %kind, "Generation in flight");
        self.notify(SessionEvent::GenerationStarted { kind });
        Some(InFlightGuard {
            session: self,
            kind,
        })
    }

    pub(crate) async fn issue_trip_request(&self) -> Result<Issued<TripRequest>, GenerationError> {
        self.state.read().await.trip_request()
    }

    pub(crate) async fn issue_packing_request(
        &self,
    ) -> Result<Issued<PackingRequest>, GenerationError> {
        self.state.read().await.packing_request()
    }

    pub(crate) async fn complete_trip(
        &self,
        epoch: u64,
        recommendation: TripRecommendation,
    ) -> Result<StepKind, GenerationError> {
        self.transition(|state| state.complete_trip(epoch, recommendation))
            .await
    }

    pub(crate) async fn complete_packing(
        &self,
        epoch: u64,
        packing: PackingRecommendation,
    ) -> Result<StepKind, GenerationError> {
        self.transition(|state| state.complete_packing(epoch, packing))
            .await
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        // Ok if no presentation client is listening
        let _ = self.tx.send(event);
    }

    /// Apply a step-changing operation and broadcast the move.
    async fn transition<E>(
        &self,
        op: impl FnOnce(&mut SessionState) -> Result<StepKind, E>,
    ) -> Result<StepKind, E> {
        let (from, to) = {
            let mut state = self.state.write().await;
            let from = state.kind();
            let to = op(&mut state)?;
            (from, to)
        };
        if from != to {
            info!(session_id = %self.id, from = %from, to = %to, "Wizard step changed");
            self.notify(SessionEvent::StepChanged { from, to });
        }
        Ok(to)
    }

    fn flag(&self, kind: GenerationKind) -> &AtomicBool {
        match kind {
            GenerationKind::Trip => &self.trip_in_flight,
            GenerationKind::Packing => &self.packing_in_flight,
        }
    }
}

/// Scoped in-flight marker. Clears the indicator on every exit path.
pub struct InFlightGuard<'a> {
    session: &'a WizardSession,
    kind: GenerationKind,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.session.flag(self.kind).store(false, Ordering::Release);
        debug!(session_id = %self.session.id, kind = %self.kind, "Generation settled");
        self.session
            .notify(SessionEvent::GenerationSettled { kind: self.kind });
    }
}
