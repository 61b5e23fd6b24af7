//! lyrstat-server library interface
//!
//! Lyrics word-frequency analysis over Last.fm listening history or an artist discography,
//! exposed as pollable background tasks.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod error;
pub mod lyrics;
pub mod sources;
pub mod tasks;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::LookupCache;
use crate::tasks::AnalysisRunner;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Lookup cache, read by the health endpoint
    pub cache: Arc<LookupCache>,
    /// Admits and runs analysis tasks; owns the task registry
    pub runner: Arc<AnalysisRunner>,
    /// `max_tracks` used when a request leaves it out
    pub default_max_tracks: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(cache: Arc<LookupCache>, runner: Arc<AnalysisRunner>, default_max_tracks: usize) -> Self {
        Self {
            cache,
            runner,
            default_max_tracks,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analyze_routes())
        .merge(api::status_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy from the `allow_origins` setting
///
/// `*` allows any origin, otherwise the value is a comma-separated list of origins.
/// Unparseable origins are logged and skipped.
pub fn cors_layer(allow_origins: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allow_origins.trim() == "*" {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allow_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}
