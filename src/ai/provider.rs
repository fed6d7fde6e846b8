use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode provider response: {0}")]
    Decode(String),
}

/// One piece of model input.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<Part>,
    /// Declared output shape; set only in schema-constrained mode.
    pub response_schema: Option<Value>,
    /// Ask for map grounding, optionally biased to a location.
    pub maps_grounding: Option<MapsGrounding>,
}

#[derive(Debug, Clone, Default)]
pub struct MapsGrounding {
    pub location: Option<LatLng>,
}

/// A side-channel reference (e.g. a map link) returned next to the text.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundingReference {
    pub uri: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub text: String,
    pub references: Vec<GroundingReference>,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError>;
}
