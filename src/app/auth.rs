use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::passwords::{make_django_password, verify_django_password};
use crate::app::policy::Principal;
use crate::app::tokens::{Audience, IssuedToken, TokenIssuer};
use crate::app::users::{user_from_row, USER_COLUMNS};
use crate::domain::user::{normalize_email, User};
use crate::infra::db::{constraint_name, has_sqlstate, Db, UNIQUE_VIOLATION};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: User,
    pub token: IssuedToken,
}

/// Outcome of a statistics-dashboard login attempt.
#[derive(Debug, Clone)]
pub enum StaffLogin {
    /// No active staff account with that email.
    NotStaff,
    BadPassword,
    Authenticated(LoginSession),
}

/// A verified bearer token together with who it belongs to.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub principal: Principal,
    pub jti: Uuid,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    tokens: TokenIssuer,
    content_ttl_hours: u64,
    stats_ttl_hours: u64,
    password_iterations: u32,
}

impl AuthService {
    pub fn new(
        db: Db,
        token_key: [u8; 32],
        content_ttl_hours: u64,
        stats_ttl_hours: u64,
        password_iterations: u32,
    ) -> Self {
        Self {
            db,
            tokens: TokenIssuer::new(token_key),
            content_ttl_hours,
            stats_ttl_hours,
            password_iterations,
        }
    }

    pub async fn signup(&self, input: SignupInput) -> ServiceResult<User> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        validate_new_password(&input.password)?;

        let password_hash = make_django_password(&input.password, self.password_iterations);
        let query = format!(
            "INSERT INTO users (email, password, first_name, last_name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(&email)
            .bind(password_hash)
            .bind(input.first_name.trim())
            .bind(input.last_name.trim())
            .fetch_one(self.db.pool())
            .await
            .map_err(|err| {
                if has_sqlstate(&err, UNIQUE_VIOLATION)
                    && constraint_name(&err) == Some("users_email_key")
                {
                    return ServiceError::Conflict("Email already taken".to_string());
                }
                ServiceError::Storage(err)
            })?;

        Ok(user_from_row(&row))
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<Option<LoginSession>> {
        let query = format!("SELECT {USER_COLUMNS}, password FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email.trim())
            .fetch_optional(self.db.pool())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user = user_from_row(&row);
        let password_hash: String = row.get("password");
        if !user.is_active || !verify_django_password(password, &password_hash) {
            return Ok(None);
        }

        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(user.id)
            .execute(self.db.pool())
            .await?;

        let token = self
            .tokens
            .issue(Audience::Content, user.id, self.content_ttl_hours, &[])?;
        Ok(Some(LoginSession { user, token }))
    }

    pub async fn login_staff(&self, email: &str, password: &str) -> ServiceResult<StaffLogin> {
        let query = format!(
            "SELECT {USER_COLUMNS}, password FROM users \
             WHERE email = $1 AND is_staff = true AND is_active = true"
        );
        let row = sqlx::query(&query)
            .bind(email.trim())
            .fetch_optional(self.db.pool())
            .await?;

        let Some(row) = row else {
            return Ok(StaffLogin::NotStaff);
        };
        let user = user_from_row(&row);
        let password_hash: String = row.get("password");
        if !verify_django_password(password, &password_hash) {
            return Ok(StaffLogin::BadPassword);
        }

        let token = self.tokens.issue(
            Audience::Stats,
            user.id,
            self.stats_ttl_hours,
            &[
                ("email", user.email.as_str()),
                ("first_name", user.first_name.as_str()),
                ("last_name", user.last_name.as_str()),
            ],
        )?;
        Ok(StaffLogin::Authenticated(LoginSession { user, token }))
    }

    /// Resolves a bearer token to its owner. Statistics tokens additionally
    /// require the owner to still be staff.
    pub async fn authenticate(
        &self,
        audience: Audience,
        token: &str,
    ) -> ServiceResult<Option<AuthSession>> {
        let Some(verified) = self.tokens.verify(audience, token)? else {
            return Ok(None);
        };

        let row = sqlx::query(
            "SELECT u.is_staff \
             FROM users u \
             WHERE u.id = $1 \
               AND u.is_active = true \
               AND ($3 = false OR u.is_staff = true) \
               AND NOT EXISTS (SELECT 1 FROM revoked_tokens r WHERE r.jti = $2)",
        )
        .bind(verified.user_id)
        .bind(verified.jti)
        .bind(audience == Audience::Stats)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| AuthSession {
            principal: Principal {
                user_id: verified.user_id,
                is_staff: row.get("is_staff"),
            },
            jti: verified.jti,
            expires_at: verified.expires_at,
        }))
    }

    /// Revokes a token until it would have expired anyway.
    pub async fn logout(&self, jti: Uuid, expires_at: OffsetDateTime) -> ServiceResult<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < now()")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) \
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub fn issue_content_token(&self, user_id: i64) -> ServiceResult<IssuedToken> {
        Ok(self
            .tokens
            .issue(Audience::Content, user_id, self.content_ttl_hours, &[])?)
    }
}

fn validate_email(email: &str) -> ServiceResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ServiceError::validation("email", "Enter a valid email address.")),
    }
}

fn validate_new_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(
            "password",
            "This password is too short. It must contain at least 8 characters.",
        ));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ServiceError::validation(
            "password",
            "password must be at most 128 characters",
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::validation(
            "password",
            "This password is entirely numeric.",
        ));
    }
    Ok(())
}
