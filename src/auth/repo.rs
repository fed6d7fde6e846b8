use crate::auth::repo_types::{Goals, Session, User};
use sqlx::SqlitePool;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, password_hash, name, calorie_goal, protein_goal, carbs_goal, fat_goal, created_at";

/// Fixed-width UTC timestamp, same shape as the column defaults.
const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

impl User {
    /// Find a user by (already normalized) email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user. Returns `None` if the email is already taken.
    pub async fn create(
        db: &SqlitePool,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> anyhow::Result<Option<User>> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .fetch_one(db)
        .await;

        match res {
            Ok(user) => Ok(Some(user)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn goals(db: &SqlitePool, id: Uuid) -> anyhow::Result<Option<Goals>> {
        let goals = sqlx::query_as::<_, Goals>(
            "SELECT calorie_goal, protein_goal, carbs_goal, fat_goal FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(goals)
    }

    /// Overwrite all four daily targets. Returns whether the user existed.
    pub async fn update_goals(db: &SqlitePool, id: Uuid, goals: Goals) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET calorie_goal = ?1, protein_goal = ?2, carbs_goal = ?3, fat_goal = ?4
             WHERE id = ?5
            "#,
        )
        .bind(goals.calorie_goal)
        .bind(goals.protein_goal)
        .bind(goals.carbs_goal)
        .bind(goals.fat_goal)
        .bind(id)
        .execute(db)
        .await?;
        Ok(res.rows_affected() == 1)
    }
}

impl Session {
    pub async fn create(db: &SqlitePool, user_id: Uuid, ttl_hours: i64) -> anyhow::Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3))
            RETURNING id, user_id, created_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(format!("+{ttl_hours} hours"))
        .fetch_one(db)
        .await?;
        Ok(session)
    }

    /// The session, if it exists and has not expired.
    pub async fn find_active(db: &SqlitePool, id: Uuid) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT id, user_id, created_at, expires_at
              FROM sessions
             WHERE id = ?1 AND expires_at > {NOW}
            "#
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(session)
    }

    pub async fn delete(db: &SqlitePool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn duplicate_email_returns_none_and_keeps_first() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let first = User::create(&pool, "a@x.com", "hash-1", "A")
            .await
            .unwrap()
            .expect("created");
        let second = User::create(&pool, "a@x.com", "hash-2", "B").await.unwrap();
        assert!(second.is_none());

        let stored = User::find_by_email(&pool, "a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.password_hash, "hash-1");
        assert_eq!(stored.name, "A");
    }

    #[tokio::test]
    async fn new_users_get_default_goals() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let user = User::create(&pool, "g@x.com", "h", "G").await.unwrap().unwrap();
        assert_eq!(
            (user.calorie_goal, user.protein_goal, user.carbs_goal, user.fat_goal),
            (2000, 150, 200, 70)
        );

        let goals = Goals {
            calorie_goal: 1800,
            protein_goal: 120,
            carbs_goal: 180,
            fat_goal: 60,
        };
        assert!(User::update_goals(&pool, user.id, goals).await.unwrap());
        assert_eq!(User::goals(&pool, user.id).await.unwrap(), Some(goals));
        assert!(!User::update_goals(&pool, Uuid::new_v4(), goals).await.unwrap());
    }

    #[tokio::test]
    async fn sessions_expire_and_delete() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let user = User::create(&pool, "s@x.com", "h", "S").await.unwrap().unwrap();

        let session = Session::create(&pool, user.id, 24).await.unwrap();
        assert_eq!(session.user_id, user.id);
        assert!(session.expires_at > session.created_at);
        assert!(Session::find_active(&pool, session.id).await.unwrap().is_some());

        sqlx::query("UPDATE sessions SET expires_at = '2000-01-01T00:00:00.000Z' WHERE id = ?1")
            .bind(session.id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(Session::find_active(&pool, session.id).await.unwrap().is_none());

        let other = Session::create(&pool, user.id, 24).await.unwrap();
        Session::delete(&pool, other.id).await.unwrap();
        assert!(Session::find_active(&pool, other.id).await.unwrap().is_none());
    }
}
