use sqlx::Row;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::country::{Country, MAX_NAME_LEN};
use crate::infra::db::{has_sqlstate, Db, UNIQUE_VIOLATION};

#[derive(Clone)]
pub struct CountryService {
    db: Db,
}

impl CountryService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Country>> {
        let rows = sqlx::query("SELECT id, name FROM countries ORDER BY name, id")
            .fetch_all(self.db.pool())
            .await?;

        let mut countries = Vec::with_capacity(rows.len());
        for row in rows {
            countries.push(Country {
                id: row.get("id"),
                name: row.get("name"),
            });
        }

        Ok(countries)
    }

    pub async fn create(&self, name: &str) -> ServiceResult<Country> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("name", "This field may not be blank."));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ServiceError::validation(
                "name",
                "Ensure this field has no more than 100 characters.",
            ));
        }

        let row = sqlx::query("INSERT INTO countries (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(self.db.pool())
            .await
            .map_err(|err| {
                if has_sqlstate(&err, UNIQUE_VIOLATION) {
                    return ServiceError::validation(
                        "name",
                        "country with this name already exists.",
                    );
                }
                ServiceError::Storage(err)
            })?;

        Ok(Country {
            id: row.get("id"),
            name: row.get("name"),
        })
    }

    pub async fn exists(&self, country_id: i64) -> ServiceResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM countries WHERE id = $1)")
                .bind(country_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }

    /// Removes the country together with its vacations and their likes.
    pub async fn delete(&self, country_id: i64) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM countries WHERE id = $1")
            .bind(country_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("country"));
        }
        Ok(())
    }
}
