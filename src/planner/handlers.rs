use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiJson, ApiQuery},
    pagination::Pagination,
    planner::{dto::PlanRequest, repo_types::Plan, services::plan_and_save},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/plan", post(create_plan))
        .route("/history", get(history))
}

#[instrument(skip(state, body))]
pub async fn create_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(body): ApiJson<PlanRequest>,
) -> Result<Json<Plan>, ApiError> {
    if body.prompt.trim().is_empty() {
        warn!(%user_id, "plan without a prompt");
        return Err(ApiError::BadRequest("prompt is required".into()));
    }
    if let Some(loc) = body.location {
        let in_range = (-90.0..=90.0).contains(&loc.latitude)
            && (-180.0..=180.0).contains(&loc.longitude);
        if !in_range {
            return Err(ApiError::BadRequest("location is out of range".into()));
        }
    }

    let plan = plan_and_save(&state, user_id, &body.prompt, body.location).await?;
    Ok(Json(plan))
}

#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<Vec<Plan>>, ApiError> {
    let plans = Plan::list_by_user(&state.db, user_id, page).await?;
    Ok(Json(plans))
}
