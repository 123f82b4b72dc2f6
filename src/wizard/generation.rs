//! Generation requests, the service seam, and the orchestrator that
//! issues requests from session state and writes results back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{GenerationError, GenerationKind};

use super::model::{PackingRecommendation, TripPlan, TripRecommendation, UserProfile};
use super::session::{SessionEvent, WizardSession};
use super::state::StepKind;

/// Everything the trip generator sees. Built entirely from session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub profile: UserProfile,
    pub trip_plan: TripPlan,
}

/// Everything the packing generator sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingRequest {
    pub destination: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub primary_vibe: String,
    pub profile: UserProfile,
    pub from_location: String,
}

impl PackingRequest {
    /// Build from the trip plan, applying the primary-vibe fallback.
    pub fn from_plan(plan: &TripPlan, profile: &UserProfile) -> Self {
        Self {
            destination: plan.destination.clone(),
            start_date: plan.start_date,
            end_date: plan.end_date,
            primary_vibe: plan.primary_vibe().to_string(),
            profile: profile.clone(),
            from_location: plan.from_location.clone(),
        }
    }
}

/// The external generation backend. Single round-trip per call.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate_trip_recommendation(
        &self,
        profile: &UserProfile,
        trip_plan: &TripPlan,
    ) -> Result<TripRecommendation, GenerationError>;

    async fn generate_packing_recommendation(
        &self,
        request: &PackingRequest,
    ) -> Result<PackingRecommendation, GenerationError>;
}

/// Issues generation requests on behalf of a session.
///
/// At most one request per kind is outstanding; a second attempt is
/// rejected, not queued. Failures leave the step and any prior result
/// untouched.
pub struct GenerationOrchestrator {
    session: Arc<WizardSession>,
    service: Arc<dyn GenerationService>,
}

impl GenerationOrchestrator {
    pub fn new(session: Arc<WizardSession>, service: Arc<dyn GenerationService>) -> Self {
        Self { session, service }
    }

    pub fn session(&self) -> &Arc<WizardSession> {
        &self.session
    }

    /// Generate a trip recommendation and, on success, enter the results
    /// step.
    pub async fn request_trip_recommendation(&self) -> Result<StepKind, GenerationError> {
        let kind = GenerationKind::Trip;
        let issued = self.session.issue_trip_request().await?;
        let _guard = self
            .session
            .try_begin(kind)
            .ok_or(GenerationError::AlreadyInFlight { kind })?;
        info!(
            session_id = %self.session.id(),
            destination = %issued.request.trip_plan.destination,
            "Requesting trip recommendation"
        );

        let result = self
            .service
            .generate_trip_recommendation(&issued.request.profile, &issued.request.trip_plan)
            .await;

        match result {
            Ok(recommendation) => {
                self.settle(kind, self.session.complete_trip(issued.epoch, recommendation).await)
            }
            Err(e) => Err(self.fail(kind, e)),
        }
    }

    /// Generate a packing list and, on success, enter the packing step.
    pub async fn request_packing_recommendation(&self) -> Result<StepKind, GenerationError> {
        let kind = GenerationKind::Packing;
        let issued = self.session.issue_packing_request().await?;
        let _guard = self
            .session
            .try_begin(kind)
            .ok_or(GenerationError::AlreadyInFlight { kind })?;
        info!(
            session_id = %self.session.id(),
            destination = %issued.request.destination,
            primary_vibe = %issued.request.primary_vibe,
            "Requesting packing recommendation"
        );

        let result = self
            .service
            .generate_packing_recommendation(&issued.request)
            .await;

        match result {
            Ok(packing) => {
                self.settle(kind, self.session.complete_packing(issued.epoch, packing).await)
            }
            Err(e) => Err(self.fail(kind, e)),
        }
    }

    fn settle(
        &self,
        kind: GenerationKind,
        result: Result<StepKind, GenerationError>,
    ) -> Result<StepKind, GenerationError> {
        if let Err(e) = &result {
            info!(
                session_id = %self.session.id(),
                kind = %kind,
                error = %e,
                "Discarding generation result"
            );
        }
        result
    }

    fn fail(&self, kind: GenerationKind, error: GenerationError) -> GenerationError {
        warn!(
            session_id = %self.session.id(),
            kind = %kind,
            error = %error,
            "Generation failed"
        );
        self.session.notify(SessionEvent::GenerationFailed {
            kind,
            reason: error.to_string(),
        });
        error
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::config::SessionConfig;
    use crate::error::LlmError;
    use crate::wizard::model::{PackingItem, ProfileUpdate, TripPlanUpdate};

    /// Test double that counts calls, records packing requests, and can
    /// hold a call open until released.
    #[derive(Default)]
    struct StubService {
        trip_calls: AtomicUsize,
        packing_calls: AtomicUsize,
        packing_requests: Mutex<Vec<PackingRequest>>,
        fail: bool,
        gate: Option<Arc<Notify>>,
    }

    impl StubService {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Default::default()
            }
        }

        async fn wait_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }

        fn failure() -> GenerationError {
            GenerationError::Llm(LlmError::RequestFailed {
                provider: "stub".into(),
                reason: "backend down".into(),
            })
        }
    }

    #[async_trait]
    impl GenerationService for StubService {
        async fn generate_trip_recommendation(
            &self,
            _profile: &UserProfile,
            trip_plan: &TripPlan,
        ) -> Result<TripRecommendation, GenerationError> {
            self.trip_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_gate().await;
            if self.fail {
                return Err(Self::failure());
            }
            Ok(TripRecommendation(
                serde_json::json!({ "destination": trip_plan.destination }),
            ))
        }

        async fn generate_packing_recommendation(
            &self,
            request: &PackingRequest,
        ) -> Result<PackingRecommendation, GenerationError> {
            self.packing_calls.fetch_add(1, Ordering::SeqCst);
            self.packing_requests.lock().unwrap().push(request.clone());
            self.wait_gate().await;
            if self.fail {
                return Err(Self::failure());
            }
            Ok(PackingRecommendation {
                clothing: BTreeMap::new(),
                essentials: vec![PackingItem {
                    item: "Passport".into(),
                    tip: "Check expiry".into(),
                }],
                shop_the_look: vec![],
            })
        }
    }

    async fn session_at_planning() -> Arc<WizardSession> {
        let session = WizardSession::new(&SessionConfig::default());
        session.advance().await.unwrap();
        session
            .update_profile(ProfileUpdate {
                age: Some(29),
                gender: Some("female".into()),
                preferred_destination_type: Some("beaches".into()),
                persona: None,
            })
            .await;
        session.advance().await.unwrap();
        session
    }

    fn orchestrator(session: &Arc<WizardSession>, service: &Arc<StubService>) -> GenerationOrchestrator {
        GenerationOrchestrator::new(Arc::clone(session), service.clone())
    }

    #[tokio::test]
    async fn trip_success_enters_results() {
        let session = session_at_planning().await;
        session
            .update_trip_plan(TripPlanUpdate {
                destination: Some("Bali".into()),
                ..Default::default()
            })
            .await;
        let service = Arc::new(StubService::default());
        let orch = orchestrator(&session, &service);

        assert_eq!(orch.request_trip_recommendation().await.unwrap(), StepKind::Results);

        let snap = session.snapshot().await;
        assert_eq!(snap.step, StepKind::Results);
        assert_eq!(snap.recommendation.unwrap().0["destination"], "Bali");
        assert!(!snap.generating_trip);
    }

    #[tokio::test]
    async fn trip_failure_stays_on_planning_and_clears_flag() {
        let session = session_at_planning().await;
        let service = Arc::new(StubService::failing());
        let orch = orchestrator(&session, &service);
        let mut rx = session.subscribe();

        let err = orch.request_trip_recommendation().await.unwrap_err();
        assert!(matches!(err, GenerationError::Llm(_)));

        let snap = session.snapshot().await;
        assert_eq!(snap.step, StepKind::Planning);
        assert!(snap.recommendation.is_none());
        assert!(!snap.generating_trip);

        assert!(matches!(rx.recv().await.unwrap(), SessionEvent::GenerationStarted { .. }));
        assert!(matches!(rx.recv().await.unwrap(), SessionEvent::GenerationFailed { .. }));
        assert!(matches!(rx.recv().await.unwrap(), SessionEvent::GenerationSettled { .. }));

        // User may retry.
        assert!(session.try_begin(GenerationKind::Trip).is_some());
    }

    #[tokio::test]
    async fn trip_rejected_outside_planning() {
        let session = WizardSession::new(&SessionConfig::default());
        let service = Arc::new(StubService::default());
        let orch = orchestrator(&session, &service);

        let err = orch.request_trip_recommendation().await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::NotAvailable {
                kind: GenerationKind::Trip,
                step: StepKind::Persona
            }
        ));
        assert_eq!(service.trip_calls.load(Ordering::SeqCst), 0);
        assert!(!session.is_in_flight(GenerationKind::Trip));
    }

    #[tokio::test]
    async fn rejected_request_emits_no_generation_events() {
        let session = WizardSession::new(&SessionConfig::default());
        let service = Arc::new(StubService::default());
        let orch = orchestrator(&session, &service);
        let mut rx = session.subscribe();

        assert!(orch.request_trip_recommendation().await.is_err());
        assert!(orch.request_packing_recommendation().await.is_err());
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn concurrent_trip_requests_reach_service_once() {
        let session = session_at_planning().await;
        let gate = Arc::new(Notify::new());
        let service = Arc::new(StubService::gated(Arc::clone(&gate)));
        let orch = Arc::new(orchestrator(&session, &service));

        let first = tokio::spawn({
            let orch = Arc::clone(&orch);
            async move { orch.request_trip_recommendation().await }
        });

        // Wait until the first call is outstanding.
        while service.trip_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(session.snapshot().await.generating_trip);

        let second = orch.request_trip_recommendation().await;
        assert!(matches!(
            second,
            Err(GenerationError::AlreadyInFlight {
                kind: GenerationKind::Trip
            })
        ));

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), StepKind::Results);
        assert_eq!(service.trip_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reset_while_outstanding_discards_result() {
        let session = session_at_planning().await;
        let gate = Arc::new(Notify::new());
        let service = Arc::new(StubService::gated(Arc::clone(&gate)));
        let orch = Arc::new(orchestrator(&session, &service));

        let pending = tokio::spawn({
            let orch = Arc::clone(&orch);
            async move { orch.request_trip_recommendation().await }
        });
        while service.trip_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        session.start_over().await;
        gate.notify_one();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, GenerationError::Superseded { .. }));
        let snap = session.snapshot().await;
        assert_eq!(snap.step, StepKind::Persona);
        assert!(snap.recommendation.is_none());
        assert!(!snap.generating_trip);
    }

    #[tokio::test]
    async fn packing_uses_first_vibe() {
        let session = session_at_planning().await;
        session
            .update_trip_plan(TripPlanUpdate {
                destination: Some("Lisbon".into()),
                vibes: Some(vec!["relax".into(), "adventure".into()]),
                ..Default::default()
            })
            .await;
        let service = Arc::new(StubService::default());
        let orch = orchestrator(&session, &service);

        orch.request_trip_recommendation().await.unwrap();
        assert_eq!(orch.request_packing_recommendation().await.unwrap(), StepKind::Packing);

        let requests = service.packing_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].primary_vibe, "relax");
        assert_eq!(requests[0].destination, "Lisbon");
        assert_eq!(requests[0].from_location, "New York, NY");
    }

    #[tokio::test]
    async fn packing_falls_back_to_adventure() {
        let session = session_at_planning().await;
        let service = Arc::new(StubService::default());
        let orch = orchestrator(&session, &service);

        orch.request_trip_recommendation().await.unwrap();
        orch.request_packing_recommendation().await.unwrap();

        let requests = service.packing_requests.lock().unwrap();
        assert_eq!(requests[0].primary_vibe, "adventure");
    }

    #[tokio::test]
    async fn packing_failure_keeps_prior_list() {
        let session = session_at_planning().await;
        let ok = Arc::new(StubService::default());
        let orch = orchestrator(&session, &ok);
        orch.request_trip_recommendation().await.unwrap();
        orch.request_packing_recommendation().await.unwrap();
        session.back().await.unwrap();

        let failing = Arc::new(StubService::failing());
        let orch = orchestrator(&session, &failing);
        assert!(orch.request_packing_recommendation().await.is_err());

        let snap = session.snapshot().await;
        assert_eq!(snap.step, StepKind::Results);
        assert_eq!(snap.packing.unwrap().essentials[0].item, "Passport");
        assert!(!snap.generating_packing);
    }

    #[tokio::test]
    async fn packing_rejected_before_results() {
        let session = session_at_planning().await;
        let service = Arc::new(StubService::default());
        let orch = orchestrator(&session, &service);

        let err = orch.request_packing_recommendation().await.unwrap_err();
        assert!(err.is_rejected());
        assert_eq!(service.packing_calls.load(Ordering::SeqCst), 0);
    }
}
