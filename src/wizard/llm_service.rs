//! `GenerationService` backed by an `LlmProvider`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::error::{GenerationError, GenerationKind};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::generation::{GenerationService, PackingRequest};
use super::model::{PackingRecommendation, TripPlan, TripRecommendation, UserProfile};
use super::prompts::{
    find_json_object, packing_system_prompt, packing_user_prompt, trip_system_prompt,
    trip_user_prompt,
};

/// Generates trip and packing recommendations by prompting an LLM for JSON.
pub struct LlmGenerationService {
    llm: Arc<dyn LlmProvider>,
    config: GenerationConfig,
}

impl LlmGenerationService {
    pub fn new(llm: Arc<dyn LlmProvider>, config: GenerationConfig) -> Self {
        Self { llm, config }
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        kind: GenerationKind,
        system: &str,
        user: String,
        max_tokens: u32,
    ) -> Result<T, GenerationError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(user),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(max_tokens);

        let response = self.llm.complete(request).await?;
        debug!(
            kind = %kind,
            model = self.llm.model_name(),
            chars = response.content.len(),
            "Generation response received"
        );

        let Some(json) = find_json_object(&response.content) else {
            warn!(kind = %kind, response = %response.content, "No JSON object in generation response");
            return Err(GenerationError::InvalidResponse {
                kind,
                reason: "no JSON object in reply".to_string(),
            });
        };
        serde_json::from_str(json).map_err(|e| {
            warn!(
                kind = %kind,
                error = %e,
                response = %response.content,
                "Failed to parse generation response"
            );
            GenerationError::InvalidResponse {
                kind,
                reason: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl GenerationService for LlmGenerationService {
    async fn generate_trip_recommendation(
        &self,
        profile: &UserProfile,
        trip_plan: &TripPlan,
    ) -> Result<TripRecommendation, GenerationError> {
        let kind = GenerationKind::Trip;
        let value: serde_json::Value = self
            .complete_json(
                kind,
                trip_system_prompt(),
                trip_user_prompt(profile, trip_plan),
                self.config.trip_max_tokens,
            )
            .await?;

        if !value.is_object() {
            return Err(GenerationError::InvalidResponse {
                kind,
                reason: "expected a JSON object".to_string(),
            });
        }
        Ok(TripRecommendation(value))
    }

    async fn generate_packing_recommendation(
        &self,
        request: &PackingRequest,
    ) -> Result<PackingRecommendation, GenerationError> {
        let kind = GenerationKind::Packing;
        let packing: PackingRecommendation = self
            .complete_json(
                kind,
                packing_system_prompt(),
                packing_user_prompt(request),
                self.config.packing_max_tokens,
            )
            .await?;

        let items = packing.item_count();
        if items == 0 {
            return Err(GenerationError::InvalidResponse {
                kind,
                reason: "packing list has no items".to_string(),
            });
        }
        debug!(items, destination = %request.destination, "Packing list parsed");
        Ok(packing)
    }
}
