//! Process Configuration
//! Mission: Environment-driven settings with sane development defaults

use tracing::warn;

const DEV_JWT_SECRET: &str = "keystone-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub rotation_threshold_days: i64,
    /// Email/phone format and uniqueness checks reject when true; when
    /// false they only log. See AuthPolicy.
    pub enforce_validation: bool,
    pub bootstrap_admin_email: String,
    pub bootstrap_admin_password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "./keystone.db".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let access_ttl_minutes = env_i64("ACCESS_TOKEN_TTL_MINUTES", 60);
        let refresh_ttl_days = env_i64("REFRESH_SESSION_TTL_DAYS", 10);
        let rotation_threshold_days = env_i64("REFRESH_ROTATION_THRESHOLD_DAYS", 7);

        let enforce_validation = std::env::var("ENFORCE_VALIDATION")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(false);

        let bootstrap_admin_email =
            std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@keystone.local".to_string());
        let bootstrap_admin_password =
            std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

        Ok(Self {
            database_path,
            port,
            jwt_secret,
            access_ttl_minutes,
            refresh_ttl_days,
            rotation_threshold_days,
            enforce_validation,
            bootstrap_admin_email,
            bootstrap_admin_password,
        })
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}
