use sqlx::SqlitePool;
use uuid::Uuid;

use crate::food::dto::FoodAnalysis;
use crate::food::repo_types::{DailyTotals, FoodLog};
use crate::pagination::Pagination;

const LOG_COLUMNS: &str =
    "id, user_id, food_name, calories, protein, carbs, fat, image_url, created_at";

impl FoodLog {
    pub async fn insert(
        db: &SqlitePool,
        user_id: Uuid,
        analysis: &FoodAnalysis,
        image_url: &str,
    ) -> anyhow::Result<FoodLog> {
        let log = sqlx::query_as::<_, FoodLog>(&format!(
            r#"
            INSERT INTO food_logs (id, user_id, food_name, calories, protein, carbs, fat, image_url)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(analysis.food_name.as_deref())
        .bind(analysis.calories)
        .bind(analysis.protein)
        .bind(analysis.carbs)
        .bind(analysis.fat)
        .bind(image_url)
        .fetch_one(db)
        .await?;
        Ok(log)
    }

    /// Newest first.
    pub async fn list_by_user(
        db: &SqlitePool,
        user_id: Uuid,
        page: Pagination,
    ) -> anyhow::Result<Vec<FoodLog>> {
        let rows = sqlx::query_as::<_, FoodLog>(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM food_logs
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(user_id)
        .bind(page.sql_limit())
        .bind(page.sql_offset())
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

impl DailyTotals {
    /// Totals for the current UTC calendar day.
    pub async fn today(db: &SqlitePool, user_id: Uuid) -> anyhow::Result<DailyTotals> {
        let totals = sqlx::query_as::<_, DailyTotals>(
            r#"
            SELECT TOTAL(calories) AS total_calories,
                   TOTAL(protein)  AS total_protein,
                   TOTAL(carbs)    AS total_carbs,
                   TOTAL(fat)      AS total_fat
              FROM food_logs
             WHERE user_id = ?1 AND date(created_at) = date('now')
            "#,
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use crate::db;

    fn analysis(name: &str, calories: Option<f64>) -> FoodAnalysis {
        FoodAnalysis {
            food_name: Some(name.into()),
            calories,
            protein: Some(10.0),
            carbs: None,
            fat: Some(5.5),
        }
    }

    #[tokio::test]
    async fn insert_keeps_missing_macros_null() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let user = User::create(&pool, "f@x.com", "h", "F").await.unwrap().unwrap();

        let log = FoodLog::insert(&pool, user.id, &analysis("toast", None), "data:image/jpeg;base64,AA")
            .await
            .unwrap();
        assert_eq!(log.user_id, user.id);
        assert_eq!(log.food_name.as_deref(), Some("toast"));
        assert_eq!(log.calories, None);
        assert_eq!(log.carbs, None);
        assert_eq!(log.fat, Some(5.5));
    }

    #[tokio::test]
    async fn lists_newest_first_and_paginates() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let user = User::create(&pool, "l@x.com", "h", "L").await.unwrap().unwrap();
        for name in ["first", "second", "third"] {
            FoodLog::insert(&pool, user.id, &analysis(name, Some(100.0)), "data:,")
                .await
                .unwrap();
        }

        let all = FoodLog::list_by_user(&pool, user.id, Pagination::default()).await.unwrap();
        let names: Vec<_> = all.iter().filter_map(|l| l.food_name.as_deref()).collect();
        assert_eq!(names, ["third", "second", "first"]);

        let page = Pagination {
            limit: Some(1),
            offset: Some(1),
        };
        let one = FoodLog::list_by_user(&pool, user.id, page).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].food_name.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn totals_cover_today_for_one_user() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let a = User::create(&pool, "a@x.com", "h", "A").await.unwrap().unwrap();
        let b = User::create(&pool, "b@x.com", "h", "B").await.unwrap().unwrap();

        assert_eq!(DailyTotals::today(&pool, a.id).await.unwrap(), DailyTotals::default());

        FoodLog::insert(&pool, a.id, &analysis("x", Some(300.0)), "data:,").await.unwrap();
        FoodLog::insert(&pool, a.id, &analysis("y", None), "data:,").await.unwrap();
        FoodLog::insert(&pool, b.id, &analysis("z", Some(999.0)), "data:,").await.unwrap();
        let old = FoodLog::insert(&pool, a.id, &analysis("old", Some(5000.0)), "data:,")
            .await
            .unwrap();
        sqlx::query("UPDATE food_logs SET created_at = '2001-01-01T12:00:00.000Z' WHERE id = ?1")
            .bind(old.id)
            .execute(&pool)
            .await
            .unwrap();

        let totals = DailyTotals::today(&pool, a.id).await.unwrap();
        assert_eq!(totals.total_calories, 300.0);
        assert_eq!(totals.total_protein, 20.0);
        assert_eq!(totals.total_carbs, 0.0);
        assert_eq!(totals.total_fat, 11.0);
    }
}
