use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::ai::{
    normalize::{self, require_model, NormalizeError, NormalizeMode},
    GenerateRequest, Part,
};
use crate::error::ApiError;
use crate::food::dto::FoodAnalysis;
use crate::food::repo_types::FoodLog;
use crate::state::AppState;

const DEFAULT_MIME: &str = "image/jpeg";

const FOOD_INSTRUCTION: &str = "Analyze this food image and estimate the calories and macros \
(protein, carbs, fat). Provide a name for the food. Return strictly as JSON.";

const FOOD_FORMAT_RULES: &str = "Respond with exactly one JSON object with the keys \
\"foodName\" (string), \"calories\" (number, kcal), \"protein\", \"carbs\" and \"fat\" \
(numbers, grams). Do not add any other text.";

/// A decoded `data:` URI, or a bare base64 payload treated as JPEG.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn parse(raw: &str) -> Option<Self> {
        lazy_static! {
            static ref BASE64_RE: Regex = Regex::new(r"^[A-Za-z0-9+/\r\n]+={0,2}$").unwrap();
        }
        let raw = raw.trim();
        let (mime_type, data) = match raw.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest.split_once(',')?;
                let mime = header.strip_suffix(";base64")?;
                let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
                (mime.to_string(), data)
            }
            None => (DEFAULT_MIME.to_string(), raw),
        };
        if !mime_type.starts_with("image/") || !BASE64_RE.is_match(data) {
            return None;
        }
        Some(Self {
            mime_type,
            data: data.to_string(),
        })
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

pub(crate) fn food_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "foodName": { "type": "STRING" },
            "calories": { "type": "NUMBER" },
            "protein": { "type": "NUMBER" },
            "carbs": { "type": "NUMBER" },
            "fat": { "type": "NUMBER" }
        },
        "required": ["foodName", "calories", "protein", "carbs", "fat"]
    })
}

pub(crate) fn food_request(model: &str, mode: NormalizeMode, image: &ImagePayload) -> GenerateRequest {
    let (instruction, response_schema) = match mode {
        NormalizeMode::SchemaConstrained => (FOOD_INSTRUCTION.to_string(), Some(food_schema())),
        NormalizeMode::FreeText => (format!("{FOOD_INSTRUCTION} {FOOD_FORMAT_RULES}"), None),
    };
    GenerateRequest {
        model: model.to_string(),
        parts: vec![
            Part::InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
            Part::Text(instruction),
        ],
        response_schema,
        maps_grounding: None,
    }
}

/// Runs one photo through the model and logs the result. Nothing is stored on failure.
#[instrument(skip(state, image), fields(mime = %image.mime_type))]
pub async fn analyze_and_log(
    state: &AppState,
    user_id: Uuid,
    image: &ImagePayload,
) -> Result<FoodLog, ApiError> {
    let model = require_model(state.model())?;
    let cfg = &state.config.ai;

    let response = model
        .generate(food_request(&cfg.food_model, cfg.food_mode, image))
        .await
        .map_err(NormalizeError::from)?;
    let analysis: FoodAnalysis = normalize::object(cfg.food_mode, &response.text)?;
    if cfg.food_mode == NormalizeMode::FreeText && analysis.is_empty() {
        return Err(NormalizeError::NoResults.into());
    }

    let log = FoodLog::insert(&state.db, user_id, &analysis, &image.data_uri()).await?;
    info!(%user_id, log_id = %log.id, food = ?log.food_name, "food logged");
    Ok(log)
}
