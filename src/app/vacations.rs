use anyhow::anyhow;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::{Date, OffsetDateTime};

use crate::app::countries::CountryService;
use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::vacation::{
    image_extension, Vacation, VacationInput, ValidationMode, IMAGE_FOLDER,
};
use crate::infra::db::{has_sqlstate, Db, FOREIGN_KEY_VIOLATION};
use crate::infra::media::{is_relative_key, MediaStore};

const UNKNOWN_COUNTRY: &str =
    "Select a valid choice. That choice is not one of the available choices.";
const MISSING_IMAGE: &str = "No uploaded image exists at this path.";

// $1 is the viewer id (NULL for anonymous callers).
const VACATION_SELECT: &str = "SELECT v.id, v.country_id, c.name AS country_name, v.description, \
            v.start_date, v.end_date, v.price, v.image, v.created_at, v.updated_at, \
            (SELECT COUNT(*) FROM likes l WHERE l.vacation_id = v.id) AS likes_count, \
            EXISTS (SELECT 1 FROM likes l WHERE l.vacation_id = v.id AND l.user_id = $1) AS is_liked \
     FROM vacations v \
     JOIN countries c ON c.id = v.country_id";

fn vacation_from_row(row: &PgRow) -> Vacation {
    Vacation {
        id: row.get("id"),
        country_id: row.get("country_id"),
        country_name: row.get("country_name"),
        description: row.get("description"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        price: row.get("price"),
        image: row.get("image"),
        likes_count: row.get("likes_count"),
        is_liked: row.get("is_liked"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[derive(Clone)]
pub struct VacationService {
    db: Db,
    media: MediaStore,
}

impl VacationService {
    pub fn new(db: Db, media: MediaStore) -> Self {
        Self { db, media }
    }

    /// Newest first. `cursor` is the `(created_at, id)` of the last row seen.
    pub async fn list(
        &self,
        viewer_id: Option<i64>,
        cursor: Option<(OffsetDateTime, i64)>,
        limit: i64,
    ) -> ServiceResult<Vec<Vacation>> {
        let (cursor_at, cursor_id) = match cursor {
            Some((created_at, id)) => (Some(created_at), Some(id)),
            None => (None, None),
        };

        let query = format!(
            "{VACATION_SELECT} \
             WHERE ($2::timestamptz IS NULL \
                    OR v.created_at < $2 \
                    OR (v.created_at = $2 AND v.id < $3)) \
             ORDER BY v.created_at DESC, v.id DESC \
             LIMIT $4"
        );
        let rows = sqlx::query(&query)
            .bind(viewer_id)
            .bind(cursor_at)
            .bind(cursor_id)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.iter().map(vacation_from_row).collect())
    }

    pub async fn get(&self, vacation_id: i64, viewer_id: Option<i64>) -> ServiceResult<Vacation> {
        let query = format!("{VACATION_SELECT} WHERE v.id = $2");
        let row = sqlx::query(&query)
            .bind(viewer_id)
            .bind(vacation_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref()
            .map(vacation_from_row)
            .ok_or(ServiceError::NotFound("vacation"))
    }

    pub async fn exists(&self, vacation_id: i64) -> ServiceResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vacations WHERE id = $1)")
                .bind(vacation_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }

    pub async fn create(&self, input: &VacationInput, today: Date) -> ServiceResult<Vacation> {
        input.validate(today, ValidationMode::Create)?;
        self.ensure_country(input.country_id).await?;
        self.ensure_image(input).await?;

        let vacation_id: i64 = sqlx::query_scalar(
            "INSERT INTO vacations (country_id, description, start_date, end_date, price, image) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(input.country_id)
        .bind(input.description.trim())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.price)
        .bind(input.image())
        .fetch_one(self.db.pool())
        .await
        .map_err(map_write_error)?;

        self.reload(vacation_id).await
    }

    /// Full update. The start date is not required to be in the future here.
    pub async fn update(
        &self,
        vacation_id: i64,
        input: &VacationInput,
        today: Date,
    ) -> ServiceResult<Vacation> {
        if !self.exists(vacation_id).await? {
            return Err(ServiceError::NotFound("vacation"));
        }
        input.validate(today, ValidationMode::Update)?;
        self.ensure_country(input.country_id).await?;
        self.ensure_image(input).await?;

        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE vacations \
             SET country_id = $2, description = $3, start_date = $4, end_date = $5, \
                 price = $6, image = $7, updated_at = now() \
             WHERE id = $1 \
             RETURNING id",
        )
        .bind(vacation_id)
        .bind(input.country_id)
        .bind(input.description.trim())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.price)
        .bind(input.image())
        .fetch_optional(self.db.pool())
        .await
        .map_err(map_write_error)?;

        match updated {
            Some(id) => self.reload(id).await,
            None => Err(ServiceError::NotFound("vacation")),
        }
    }

    /// Deletes the vacation and its stored image, returning the name of its
    /// country.
    pub async fn delete(&self, vacation_id: i64) -> ServiceResult<String> {
        let row = sqlx::query(
            "DELETE FROM vacations v \
             USING countries c \
             WHERE v.id = $1 AND c.id = v.country_id \
             RETURNING c.name, v.image",
        )
        .bind(vacation_id)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Err(ServiceError::NotFound("vacation"));
        };
        if let Some(image) = row.get::<Option<String>, _>("image") {
            self.discard_image(vacation_id, &image).await;
        }
        Ok(row.get("name"))
    }

    /// Stores an uploaded image under `vacations/` and points the vacation at
    /// it. A replaced image file is removed.
    pub async fn attach_image(&self, vacation_id: i64, bytes: &[u8]) -> ServiceResult<()> {
        let extension = image_extension(bytes)?;
        if !self.exists(vacation_id).await? {
            return Err(ServiceError::NotFound("vacation"));
        }

        let key = self.media.save(IMAGE_FOLDER, extension, bytes).await?;
        let previous = match self.set_image(vacation_id, Some(&key)).await {
            Ok(previous) => previous,
            Err(err) => {
                self.discard_image(vacation_id, &key).await;
                return Err(err);
            }
        };

        tracing::info!(vacation_id, image = %key, "vacation image stored");
        if let Some(previous) = previous {
            self.discard_image(vacation_id, &previous).await;
        }
        Ok(())
    }

    pub async fn clear_image(&self, vacation_id: i64) -> ServiceResult<()> {
        if let Some(previous) = self.set_image(vacation_id, None).await? {
            self.discard_image(vacation_id, &previous).await;
        }
        Ok(())
    }

    /// Returns the image the vacation pointed at before.
    async fn set_image(&self, vacation_id: i64, key: Option<&str>) -> ServiceResult<Option<String>> {
        let previous: Option<Option<String>> = sqlx::query_scalar(
            "UPDATE vacations v \
             SET image = $2, updated_at = now() \
             FROM (SELECT id, image FROM vacations WHERE id = $1 FOR UPDATE) old_row \
             WHERE v.id = old_row.id \
             RETURNING old_row.image",
        )
        .bind(vacation_id)
        .bind(key)
        .fetch_optional(self.db.pool())
        .await?;

        let previous = previous.ok_or(ServiceError::NotFound("vacation"))?;
        Ok(previous.filter(|image| Some(image.as_str()) != key))
    }

    async fn discard_image(&self, vacation_id: i64, key: &str) {
        if !is_stored_key(key) {
            return;
        }
        if let Err(err) = self.media.remove(key).await {
            tracing::warn!(vacation_id, image = %key, error = ?err, "failed to remove image file");
        }
    }

    /// A referenced image must be a file this service stored.
    async fn ensure_image(&self, input: &VacationInput) -> ServiceResult<()> {
        let Some(key) = input.image() else {
            return Ok(());
        };
        if !is_stored_key(key) || !self.media.contains(key).await {
            return Err(ServiceError::validation("image", MISSING_IMAGE));
        }
        Ok(())
    }

    async fn ensure_country(&self, country_id: i64) -> ServiceResult<()> {
        let countries = CountryService::new(self.db.clone());
        if !countries.exists(country_id).await? {
            return Err(ServiceError::validation("country", UNKNOWN_COUNTRY));
        }
        Ok(())
    }

    async fn reload(&self, vacation_id: i64) -> ServiceResult<Vacation> {
        match self.get(vacation_id, None).await {
            Err(ServiceError::NotFound(_)) => Err(ServiceError::Internal(anyhow!(
                "vacation {} disappeared after write",
                vacation_id
            ))),
            other => other,
        }
    }
}

fn is_stored_key(key: &str) -> bool {
    key.strip_prefix(IMAGE_FOLDER)
        .is_some_and(|rest| rest.starts_with('/'))
        && is_relative_key(key)
}

fn map_write_error(err: sqlx::Error) -> ServiceError {
    if has_sqlstate(&err, FOREIGN_KEY_VIOLATION) {
        return ServiceError::validation("country", UNKNOWN_COUNTRY);
    }
    ServiceError::Storage(err)
}
