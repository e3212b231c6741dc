pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::app::auth::AuthService;
use crate::app::vacations::VacationService;
use crate::config::AppConfig;
use crate::infra::db::Db;
use crate::infra::media::MediaStore;

/// Process-wide state handed to every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub media: MediaStore,
    pub paseto_key: [u8; 32],
    pub content_token_ttl_hours: u64,
    pub stats_token_ttl_hours: u64,
    pub password_iterations: u32,
}

impl AppState {
    pub fn from_config(db: Db, config: &AppConfig) -> Self {
        Self {
            db,
            media: MediaStore::new(config),
            paseto_key: config.paseto_key,
            content_token_ttl_hours: config.content_token_ttl_hours,
            stats_token_ttl_hours: config.stats_token_ttl_hours,
            password_iterations: config.password_iterations,
        }
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            self.db.clone(),
            self.paseto_key,
            self.content_token_ttl_hours,
            self.stats_token_ttl_hours,
            self.password_iterations,
        )
    }

    pub fn vacation_service(&self) -> VacationService {
        VacationService::new(self.db.clone(), self.media.clone())
    }
}
