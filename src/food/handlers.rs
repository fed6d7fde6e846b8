use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::SuccessResponse,
        repo_types::{Goals, User},
        AuthUser,
    },
    error::{ApiError, ApiJson, ApiQuery},
    food::{
        dto::{AnalyzeFoodRequest, AnalyzedFoodResponse, GoalsRequest, StatsResponse},
        repo_types::{DailyTotals, FoodLog},
        services::{analyze_and_log, ImagePayload},
    },
    pagination::Pagination,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/logs", get(list_logs))
        .route("/stats", get(stats))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze-food", post(analyze_food))
        .route("/goals", post(update_goals))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state, body))]
pub async fn analyze_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(body): ApiJson<AnalyzeFoodRequest>,
) -> Result<Json<AnalyzedFoodResponse>, ApiError> {
    let Some(image) = ImagePayload::parse(&body.image) else {
        warn!(%user_id, "analyze-food without a usable image");
        return Err(ApiError::BadRequest("image must be a base64 image data URI".into()));
    };

    let log = analyze_and_log(&state, user_id, &image).await?;
    Ok(Json(AnalyzedFoodResponse {
        id: log.id,
        created_at: log.created_at,
        analysis: (&log).into(),
    }))
}

#[instrument(skip(state))]
pub async fn list_logs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<Vec<FoodLog>>, ApiError> {
    let logs = FoodLog::list_by_user(&state.db, user_id, page).await?;
    Ok(Json(logs))
}

#[instrument(skip(state))]
pub async fn stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let current = DailyTotals::today(&state.db, user_id).await?;
    let goals = User::goals(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(StatsResponse { current, goals }))
}

#[instrument(skip(state, body))]
pub async fn update_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(body): ApiJson<GoalsRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let goals: Goals = body.into();
    if [goals.calorie_goal, goals.protein_goal, goals.carbs_goal, goals.fat_goal]
        .iter()
        .any(|g| *g < 0)
    {
        return Err(ApiError::BadRequest("goals must be non-negative".into()));
    }

    if !User::update_goals(&state.db, user_id, goals).await? {
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(SuccessResponse { success: true }))
}
