use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vacations::app::users::UserService;
use vacations::config::{AppConfig, AppMode};
use vacations::infra::db::Db;
use vacations::{http, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vacations=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let db = Db::connect(&config).await?;
    let state = AppState::from_config(db, &config);

    let app = match config.app_mode {
        AppMode::Content => http::content_router(state),
        AppMode::Stats => {
            log_staff_accounts(&state).await;
            http::stats_router(state)
        }
    };
    let app = app
        .layer(http::cors_layer(&config.cors_allowed_origins)?)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!(mode = ?config.app_mode, "listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn log_staff_accounts(state: &AppState) {
    let service = UserService::new(state.db.clone());
    match service.list_staff().await {
        Ok(staff) if staff.is_empty() => {
            tracing::warn!("no active staff users; statistics login will reject everyone");
        }
        Ok(staff) => {
            tracing::info!(count = staff.len(), "staff users available for statistics login");
            for user in &staff {
                tracing::debug!(user_id = user.id, email = %user.email, "staff user");
            }
        }
        Err(err) => {
            tracing::error!(error = ?err, "failed to list staff users");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
