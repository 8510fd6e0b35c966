//! Axum HTTP API for audio effect jobs.
//!
//! This crate provides:
//! - Upload, job submission and status polling
//! - Short-lived download tokens and user-scoped downloads
//! - Bearer JWT verification, per-IP rate limiting and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use auth::{AuthUser, Claims, JwtVerifier};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{AudioService, FileDownload};
pub use state::AppState;
