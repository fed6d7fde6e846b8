use sqlx::{types::Json, SqlitePool};
use uuid::Uuid;

use crate::pagination::Pagination;
use crate::planner::dto::Venue;
use crate::planner::repo_types::Plan;

impl Plan {
    pub async fn insert(
        db: &SqlitePool,
        user_id: Uuid,
        prompt: &str,
        venues: &[Venue],
    ) -> anyhow::Result<Plan> {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO plans (id, user_id, prompt, venues)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, user_id, prompt, venues, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(prompt)
        .bind(Json(venues))
        .fetch_one(db)
        .await?;
        Ok(plan)
    }

    /// Newest first.
    pub async fn list_by_user(
        db: &SqlitePool,
        user_id: Uuid,
        page: Pagination,
    ) -> anyhow::Result<Vec<Plan>> {
        let rows = sqlx::query_as::<_, Plan>(
            r#"
            SELECT id, user_id, prompt, venues, created_at
            FROM plans
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(user_id)
        .bind(page.sql_limit())
        .bind(page.sql_offset())
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use crate::db;

    fn venue(name: &str) -> Venue {
        Venue {
            name: name.into(),
            rating: Some(4.5),
            description: "roomy".into(),
            address: "1 Main St".into(),
            website: None,
            maps_uri: Some(format!("https://maps/{name}")),
        }
    }

    #[tokio::test]
    async fn venues_survive_storage() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let user = User::create(&pool, "p@x.com", "h", "P").await.unwrap().unwrap();

        let venues = vec![venue("Loft"), venue("Garden")];
        let plan = Plan::insert(&pool, user.id, "birthday for 20", &venues).await.unwrap();
        assert_eq!(plan.prompt, "birthday for 20");
        assert_eq!(plan.venues.0, venues);

        let listed = Plan::list_by_user(&pool, user.id, Pagination::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].venues.0, venues);
    }

    #[tokio::test]
    async fn history_is_scoped_and_newest_first() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let a = User::create(&pool, "a@x.com", "h", "A").await.unwrap().unwrap();
        let b = User::create(&pool, "b@x.com", "h", "B").await.unwrap().unwrap();

        Plan::insert(&pool, a.id, "first", &[venue("x")]).await.unwrap();
        Plan::insert(&pool, a.id, "second", &[venue("y")]).await.unwrap();
        Plan::insert(&pool, b.id, "other", &[venue("z")]).await.unwrap();

        let listed = Plan::list_by_user(&pool, a.id, Pagination::default()).await.unwrap();
        let prompts: Vec<_> = listed.iter().map(|p| p.prompt.as_str()).collect();
        assert_eq!(prompts, ["second", "first"]);
    }
}
