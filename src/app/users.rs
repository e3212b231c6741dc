use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::app::error::ServiceResult;
use crate::domain::user::User;
use crate::infra::db::Db;

pub(crate) const USER_COLUMNS: &str =
    "id, email, first_name, last_name, is_staff, is_active, date_joined";

pub(crate) fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        is_staff: row.get("is_staff"),
        is_active: row.get("is_active"),
        date_joined: row.get("date_joined"),
    }
}

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: i64) -> ServiceResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> ServiceResult<Option<User>> {
        let query = format!(
            "UPDATE users \
             SET first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(user_id)
            .bind(first_name.map(|name| name.trim().to_string()))
            .bind(last_name.map(|name| name.trim().to_string()))
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Active staff accounts, oldest first.
    pub async fn list_staff(&self) -> ServiceResult<Vec<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE is_staff = true AND is_active = true \
             ORDER BY date_joined, id"
        );
        let rows = sqlx::query(&query).fetch_all(self.db.pool()).await?;

        Ok(rows.iter().map(user_from_row).collect())
    }
}
