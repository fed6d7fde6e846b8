use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::provider::{
    GenerateRequest, GenerateResponse, GenerativeModel, GroundingReference, Part, ProviderError,
};
use crate::config::AiConfig;

/// Gemini `generateContent` over REST.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Returns `None` when no API key is configured.
    pub fn from_config(cfg: &AiConfig) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = cfg.api_key.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Some(Self {
            http,
            api_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        }))
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let body = request_body(&request);
        let res = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if !status.is_success() {
            warn!(%status, "gemini returned an error status");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))?;
        let out = envelope.into_response();
        debug!(
            text_len = out.text.len(),
            references = out.references.len(),
            "gemini responded"
        );
        Ok(out)
    }
}

pub(crate) fn request_body(request: &GenerateRequest) -> Value {
    let parts: Vec<Value> = request
        .parts
        .iter()
        .map(|p| match p {
            Part::Text(text) => json!({ "text": text }),
            Part::InlineData { mime_type, data } => {
                json!({ "inlineData": { "mimeType": mime_type, "data": data } })
            }
        })
        .collect();

    let mut body = json!({
        "contents": [{ "role": "user", "parts": parts }],
    });

    if let Some(schema) = &request.response_schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }

    if let Some(grounding) = &request.maps_grounding {
        body["tools"] = json!([{ "googleMaps": {} }]);
        if let Some(loc) = grounding.location {
            body["toolConfig"] = json!({
                "retrievalConfig": {
                    "latLng": { "latitude": loc.latitude, "longitude": loc.longitude }
                }
            });
        }
    }

    body
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    maps: Option<MapsChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct MapsChunk {
    uri: Option<String>,
    title: Option<String>,
}

impl GenerateContentResponse {
    /// First candidate only; text parts are concatenated, map chunks kept in order.
    fn into_response(self) -> GenerateResponse {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return GenerateResponse::default();
        };

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        let references = candidate
            .grounding_metadata
            .map(|m| {
                m.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.maps)
                    .filter_map(|maps| {
                        maps.uri.map(|uri| GroundingReference {
                            uri,
                            title: maps.title,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        GenerateResponse { text, references }
    }
}
