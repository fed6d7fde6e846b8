use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::ai::{
    normalize::{self, attach_references, require_model, NormalizeError, NormalizeMode},
    GenerateRequest, LatLng, MapsGrounding, Part,
};
use crate::error::ApiError;
use crate::planner::dto::{Venue, VenueDraft};
use crate::planner::repo_types::Plan;
use crate::state::AppState;

const VENUE_FORMAT_RULES: &str = "Return only a JSON array. Each element must be an object \
with the keys \"name\" (string), \"rating\" (number from 1 to 5), \"description\" (string, \
one or two sentences on why it fits), \"address\" (string) and \"website\" (string, omit if \
unknown). Do not add any other text before or after the array.";

pub(crate) fn venue_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "rating": { "type": "NUMBER" },
                "description": { "type": "STRING" },
                "address": { "type": "STRING" },
                "website": { "type": "STRING" }
            },
            "required": ["name", "description", "address"]
        }
    })
}

pub(crate) fn plan_request(
    model: &str,
    mode: NormalizeMode,
    prompt: &str,
    location: Option<LatLng>,
) -> GenerateRequest {
    let mut text = format!(
        "You are a party planning assistant. Find real venues that match this request: \"{prompt}\"."
    );
    if let Some(loc) = location {
        text.push_str(&format!(
            " Prefer places near latitude {}, longitude {}.",
            loc.latitude, loc.longitude
        ));
    }

    // Map grounding and a response schema cannot be combined in one call,
    // so only free-text requests are grounded.
    let (response_schema, maps_grounding) = match mode {
        NormalizeMode::SchemaConstrained => (Some(venue_schema()), None),
        NormalizeMode::FreeText => {
            text.push(' ');
            text.push_str(VENUE_FORMAT_RULES);
            (None, Some(MapsGrounding { location }))
        }
    };

    GenerateRequest {
        model: model.to_string(),
        parts: vec![Part::Text(text)],
        response_schema,
        maps_grounding,
    }
}

/// Asks the model for venues and stores the plan. Nothing is stored on failure.
#[instrument(skip(state, prompt))]
pub async fn plan_and_save(
    state: &AppState,
    user_id: Uuid,
    prompt: &str,
    location: Option<LatLng>,
) -> Result<Plan, ApiError> {
    let model = require_model(state.model())?;
    let cfg = &state.config.ai;

    let response = model
        .generate(plan_request(&cfg.planner_model, cfg.planner_mode, prompt, location))
        .await
        .map_err(NormalizeError::from)?;

    let drafts: Vec<VenueDraft> = normalize::list(cfg.planner_mode, &response.text)?;
    let mut venues: Vec<Venue> = drafts.into_iter().map(Venue::from).collect();
    // Reference i belongs to venue i; the provider gives no stronger link.
    let attached = attach_references(&mut venues, &response.references, |venue, reference| {
        venue.maps_uri = Some(reference.uri.clone());
    });
    debug!(
        venues = venues.len(),
        references = response.references.len(),
        attached,
        "venues normalized"
    );

    let plan = Plan::insert(&state.db, user_id, prompt, &venues).await?;
    info!(%user_id, plan_id = %plan.id, venues = venues.len(), "plan saved");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_text_request_is_grounded() {
        let loc = LatLng {
            latitude: 51.5,
            longitude: -0.12,
        };
        let req = plan_request("m", NormalizeMode::FreeText, "rooftop for 30", Some(loc));
        assert!(req.response_schema.is_none());
        assert_eq!(req.maps_grounding.as_ref().and_then(|g| g.location), Some(loc));
        match &req.parts[0] {
            Part::Text(t) => {
                assert!(t.contains("rooftop for 30"));
                assert!(t.contains("JSON array"));
                assert!(t.contains("51.5"));
            }
            other => panic!("unexpected part {other:?}"),
        }
    }

    #[test]
    fn schema_request_is_not_grounded() {
        let req = plan_request("m", NormalizeMode::SchemaConstrained, "barn wedding", None);
        assert_eq!(req.response_schema.as_ref().unwrap()["type"], "ARRAY");
        assert!(req.maps_grounding.is_none());
    }

    #[test]
    fn venues_parse_loosely() {
        let drafts: Vec<VenueDraft> = normalize::list(
            NormalizeMode::FreeText,
            r#"Here: [{"name": "Hall", "rating": "4.2", "address": "2 High St"}, {"name": "Barn", "rating": null, "website": "https://barn", "mapsUri": "https://made-up"}]"#,
        )
        .unwrap();
        let venues: Vec<Venue> = drafts.into_iter().map(Venue::from).collect();
        assert_eq!(venues.len(), 2);
        assert_eq!(venues[0].rating, Some(4.2));
        assert_eq!(venues[0].description, "");
        assert_eq!(venues[1].rating, None);
        assert_eq!(venues[1].website.as_deref(), Some("https://barn"));
        assert_eq!(venues[1].maps_uri, None);
    }
}
