use serde::Serialize;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::planner::dto::Venue;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub prompt: String,
    pub venues: Json<Vec<Venue>>, // stored as JSON text
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
