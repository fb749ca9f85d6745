//! Keystone Backend Library
//!
//! Identity and persistence core: authentication, credential lifecycle,
//! and a generic soft-delete document store. Exposed for the server binary
//! and integration tests.

pub mod auth;
pub mod middleware;
pub mod models;
pub mod store;
