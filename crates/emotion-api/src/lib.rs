//! Axum HTTP API for face emotion inference.
//!
//! This crate provides:
//! - `POST /predict` for multipart image uploads
//! - `POST /predict_frame` for base64 data URI frames
//! - Rate limiting, CORS and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
