use sqlx::Row;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::like::{Like, LikeOutcome, ToggleOutcome};
use crate::infra::db::{has_sqlstate, Db, FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION};

#[derive(Clone)]
pub struct LikeService {
    db: Db,
}

impl LikeService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates the like. A duplicate, including one inserted concurrently by
    /// another request, is reported as `AlreadyLiked`.
    pub async fn like(&self, user_id: i64, vacation_id: i64) -> ServiceResult<LikeOutcome> {
        self.ensure_vacation(vacation_id).await?;
        self.insert(user_id, vacation_id).await
    }

    pub async fn unlike(&self, user_id: i64, vacation_id: i64) -> ServiceResult<bool> {
        self.ensure_vacation(vacation_id).await?;

        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND vacation_id = $2")
            .bind(user_id)
            .bind(vacation_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Unlikes when a like exists, likes otherwise.
    pub async fn toggle(&self, user_id: i64, vacation_id: i64) -> ServiceResult<ToggleOutcome> {
        self.ensure_vacation(vacation_id).await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = $1 AND vacation_id = $2)",
        )
        .bind(user_id)
        .bind(vacation_id)
        .fetch_one(self.db.pool())
        .await?;

        if exists {
            sqlx::query("DELETE FROM likes WHERE user_id = $1 AND vacation_id = $2")
                .bind(user_id)
                .bind(vacation_id)
                .execute(self.db.pool())
                .await?;
            return Ok(ToggleOutcome::Unliked);
        }

        // Either we inserted it or a concurrent request did; both mean liked.
        match self.insert(user_id, vacation_id).await? {
            LikeOutcome::Liked | LikeOutcome::AlreadyLiked => Ok(ToggleOutcome::Liked),
        }
    }

    pub async fn count(&self, vacation_id: i64) -> ServiceResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE vacation_id = $1")
            .bind(vacation_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn list_for_user(&self, user_id: i64) -> ServiceResult<Vec<Like>> {
        let rows = sqlx::query(
            "SELECT id, user_id, vacation_id, created_at \
             FROM likes \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut likes = Vec::with_capacity(rows.len());
        for row in rows {
            likes.push(Like {
                id: row.get("id"),
                user_id: row.get("user_id"),
                vacation_id: row.get("vacation_id"),
                created_at: row.get("created_at"),
            });
        }

        Ok(likes)
    }

    async fn insert(&self, user_id: i64, vacation_id: i64) -> ServiceResult<LikeOutcome> {
        let result = sqlx::query("INSERT INTO likes (user_id, vacation_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(vacation_id)
            .execute(self.db.pool())
            .await;

        match result {
            Ok(_) => Ok(LikeOutcome::Liked),
            Err(err) if has_sqlstate(&err, UNIQUE_VIOLATION) => Ok(LikeOutcome::AlreadyLiked),
            Err(err) if has_sqlstate(&err, FOREIGN_KEY_VIOLATION) => {
                Err(ServiceError::NotFound("vacation"))
            }
            Err(err) => Err(ServiceError::Storage(err)),
        }
    }

    async fn ensure_vacation(&self, vacation_id: i64) -> ServiceResult<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vacations WHERE id = $1)")
                .bind(vacation_id)
                .fetch_one(self.db.pool())
                .await?;
        if !exists {
            return Err(ServiceError::NotFound("vacation"));
        }
        Ok(())
    }
}
