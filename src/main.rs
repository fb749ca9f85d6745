//! Keystone - Identity & Persistence Core
//! Mission: Authenticate users, rotate credentials, keep every record

use anyhow::{Context, Result};
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keystone_backend::auth::{
    api as auth_api,
    auth_middleware,
    directory::{RoleCatalog, UserDirectory},
    models::{CreateUserRequest, ADMIN_ROLE, DEFAULT_ROLE},
    password::BcryptHasher,
    service::AuthPolicy,
    sessions::RefreshSessionStore,
    AuthService, AuthState, TokenIssuer,
};
use keystone_backend::middleware::logging::request_logging;
use keystone_backend::models::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        db = %config.database_path,
        port = config.port,
        enforce_validation = config.enforce_validation,
        "starting keystone"
    );

    let conn = Arc::new(Mutex::new(
        Connection::open(&config.database_path).context("failed to open database")?,
    ));

    let issuer = Arc::new(TokenIssuer::new(
        config.jwt_secret.clone(),
        config.access_ttl_minutes,
    ));

    let service = Arc::new(AuthService::new(
        UserDirectory::open(conn.clone())?,
        RoleCatalog::open(conn.clone())?,
        RefreshSessionStore::open(conn)?,
        issuer.clone(),
        Arc::new(BcryptHasher),
        AuthPolicy {
            enforce_validation: config.enforce_validation,
            refresh_ttl_days: config.refresh_ttl_days,
            rotation_threshold_days: config.rotation_threshold_days,
        },
    ));

    bootstrap(&service, &config).await?;

    let auth_state = AuthState {
        service: service.clone(),
    };

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(auth_api::signup))
        .route("/api/auth/login", post(auth_api::login))
        .route("/api/auth/refresh", post(auth_api::refresh))
        .with_state(auth_state.clone());

    let protected = Router::new()
        .route("/api/auth/me", get(auth_api::me))
        .route("/api/users", get(auth_api::list_users))
        .route(
            "/api/users/:id",
            get(auth_api::get_user).patch(auth_api::update_user),
        )
        .route("/api/users/:id/ban", post(auth_api::ban_user))
        .route("/api/users/:id/unban", post(auth_api::unban_user))
        .route(
            "/api/users/:id/roles/:role",
            put(auth_api::add_role).delete(auth_api::remove_role),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            issuer.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    let app = public
        .merge(protected)
        .layer(axum_middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    info!(port = config.port, "🚀 keystone listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

/// Seed the role catalog and, on an empty directory, a bootstrap admin.
async fn bootstrap(service: &AuthService, config: &Config) -> Result<()> {
    service.roles().seed(&[DEFAULT_ROLE, ADMIN_ROLE]).await?;

    if service.users().count().await? == 0 {
        let created = service
            .signup(CreateUserRequest {
                first_name: "Admin".to_string(),
                last_name: "Admin".to_string(),
                email: config.bootstrap_admin_email.clone(),
                phone: String::new(),
                password: config.bootstrap_admin_password.clone(),
            })
            .await?;
        service.add_role(created.user.id, ADMIN_ROLE).await?;

        info!(email = %config.bootstrap_admin_email, "🔐 bootstrap admin created");
        warn!("⚠️  CHANGE THE DEFAULT ADMIN PASSWORD IN PRODUCTION!");
    }

    Ok(())
}
