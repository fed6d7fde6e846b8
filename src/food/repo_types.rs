use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::food::dto::FoodAnalysis;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FoodLog {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub food_name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub image_url: String, // data URI
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&FoodLog> for FoodAnalysis {
    fn from(log: &FoodLog) -> Self {
        Self {
            food_name: log.food_name.clone(),
            calories: log.calories,
            protein: log.protein,
            carbs: log.carbs,
            fat: log.fat,
        }
    }
}

/// Sums over one day of logs; missing macros count as zero here only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
}
