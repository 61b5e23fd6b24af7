//! HTTP API handlers
//!
//! JSON in, JSON out. Errors are `{"error": "<message>"}` bodies with a matching status code.

pub mod analyze;
pub mod health;
pub mod status;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use status::status_routes;

use crate::ApiError;

/// Fallback for known paths hit with an unsupported method
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("method not allowed".to_string())
}
