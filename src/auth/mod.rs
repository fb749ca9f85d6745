//! Identity Core
//! Mission: Authentication, credential lifecycle, and user administration

pub mod api;
pub mod directory;
pub mod error;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod sessions;
pub mod tokens;

pub use api::AuthState;
pub use error::AuthError;
pub use middleware::auth_middleware;
pub use service::AuthService;
pub use tokens::TokenIssuer;
