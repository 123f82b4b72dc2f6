//! Vibe Booking: a travel booking wizard with LLM-generated trip and
//! packing recommendations.

pub mod config;
pub mod error;
pub mod llm;
pub mod wizard;
