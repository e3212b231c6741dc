use sqlx::Row;
use time::Date;

use crate::app::error::ServiceResult;
use crate::domain::stats::{DestinationLikes, StatsSummary, VacationCounts, TOP_DESTINATIONS};
use crate::infra::db::Db;

/// Read-only aggregates for the admin dashboard.
#[derive(Clone)]
pub struct StatsService {
    db: Db,
}

impl StatsService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Buckets every vacation as past, ongoing or future relative to `today`.
    pub async fn vacation_counts(&self, today: Date) -> ServiceResult<VacationCounts> {
        let row = sqlx::query(
            "SELECT \
                COUNT(*) FILTER (WHERE end_date < $1) AS past, \
                COUNT(*) FILTER (WHERE start_date <= $1 AND end_date >= $1) AS ongoing, \
                COUNT(*) FILTER (WHERE start_date > $1) AS future \
             FROM vacations",
        )
        .bind(today)
        .fetch_one(self.db.pool())
        .await?;

        Ok(VacationCounts {
            past_vacations: row.get("past"),
            ongoing_vacations: row.get("ongoing"),
            future_vacations: row.get("future"),
        })
    }

    pub async fn non_staff_user_count(&self) -> ServiceResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_staff = false")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn total_likes(&self) -> ServiceResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Likes per country that has at least one vacation, most liked first and
    /// ties by name. `None` returns every country.
    pub async fn like_distribution(&self, limit: Option<i64>) -> ServiceResult<Vec<DestinationLikes>> {
        let rows = sqlx::query(
            "SELECT c.name AS destination, COUNT(l.id) AS likes \
             FROM vacations v \
             JOIN countries c ON v.country_id = c.id \
             LEFT JOIN likes l ON v.id = l.vacation_id \
             GROUP BY c.id, c.name \
             ORDER BY likes DESC, c.name ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut distribution = Vec::with_capacity(rows.len());
        for row in rows {
            distribution.push(DestinationLikes {
                destination: row.get("destination"),
                likes: row.get("likes"),
            });
        }

        Ok(distribution)
    }

    pub async fn summary(&self, today: Date) -> ServiceResult<StatsSummary> {
        Ok(StatsSummary {
            vacation_stats: self.vacation_counts(today).await?,
            total_users: self.non_staff_user_count().await?,
            total_likes: self.total_likes().await?,
            top_destinations: self.like_distribution(Some(TOP_DESTINATIONS)).await?,
        })
    }
}
