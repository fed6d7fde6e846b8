use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ai::normalize::{lenient_f64, lenient_string};
use crate::auth::repo_types::Goals;
use crate::food::repo_types::DailyTotals;

#[derive(Debug, Deserialize)]
pub struct AnalyzeFoodRequest {
    /// Data URI (`data:image/png;base64,...`) or bare base64.
    #[serde(default)]
    pub image: String,
}

/// What the model reports for one photo. Omitted numbers stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysis {
    #[serde(default, alias = "food_name", deserialize_with = "lenient_string")]
    pub food_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat: Option<f64>,
}

impl FoodAnalysis {
    /// True when the model named no food and gave no macros.
    pub fn is_empty(&self) -> bool {
        self.food_name.as_deref().map_or(true, |n| n.trim().is_empty())
            && [self.calories, self.protein, self.carbs, self.fat]
                .iter()
                .all(Option::is_none)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzedFoodResponse {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(flatten)]
    pub analysis: FoodAnalysis,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub current: DailyTotals,
    pub goals: Goals,
}

#[derive(Debug, Deserialize)]
pub struct GoalsRequest {
    pub calorie_goal: i64,
    pub protein_goal: i64,
    pub carbs_goal: i64,
    pub fat_goal: i64,
}

impl From<GoalsRequest> for Goals {
    fn from(r: GoalsRequest) -> Self {
        Self {
            calorie_goal: r.calorie_goal,
            protein_goal: r.protein_goal,
            carbs_goal: r.carbs_goal,
            fat_goal: r.fat_goal,
        }
    }
}
