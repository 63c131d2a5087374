pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use std::sync::Arc;
use std::time::Duration;
use sqlx::PgPool;
use actix_web::HttpResponse;
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, PasswordHasher, TokenIssuer, TokenKind};
pub use db::{DbOperations, InMemoryUserStore, User, UserStore};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().body("hello world")
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
    pub db_pool: Option<Arc<PgPool>>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and wires the auth service.
    pub async fn new(config: Settings) -> Result<Self> {
        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await?;

        db.run_migrations().await?;
        info!("Database migrations applied");

        let pool = db.pool();
        let mut state = Self::with_store(config, Arc::new(db))?;
        state.db_pool = Some(pool);
        Ok(state)
    }

    /// Builds the state over any store; fails if the auth settings are unusable.
    pub fn with_store(config: Settings, store: Arc<dyn UserStore>) -> Result<Self> {
        let hasher = PasswordHasher::new(config.auth.hash_cost)?;
        let tokens = TokenIssuer::new(&config.auth.jwt_secret)?;

        Ok(Self {
            config: Arc::new(config),
            auth_service: Arc::new(AuthService::new(store, hasher, tokens)),
            db_pool: None,
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        // Close database connections
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
        Ok(())
    }
}
