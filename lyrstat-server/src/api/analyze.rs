//! Analysis submission endpoints
//!
//! - POST /api/analyze: word statistics over a user's listening history
//! - POST /api/analyze/artist: word statistics over an artist's discography
//!
//! Both return the task id immediately; progress is polled through the status endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::method_not_allowed;
use crate::tasks::{AnalysisJob, JobSubject, Submission};
use crate::{ApiError, ApiResult, AppState};

/// Body of POST /api/analyze
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    pub username: String,
    pub from: String,
    pub to: String,
    /// Unique tracks to analyze; 0 or absent uses the configured default
    pub max_tracks: Option<usize>,
    /// Defaults to true
    pub exclude_stop_words: Option<bool>,
    pub include_lyrics: bool,
}

/// Body of POST /api/analyze/artist
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArtistAnalyzeRequest {
    pub artist: String,
    pub max_tracks: Option<usize>,
    pub exclude_stop_words: Option<bool>,
    pub include_lyrics: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
}

impl From<Submission> for AnalyzeResponse {
    fn from(submission: Submission) -> Self {
        Self {
            task_id: submission.task_id,
            status: submission.already_running.then_some("already_running"),
        }
    }
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        ApiError::BadRequest("Invalid JSON".to_string())
    })
}

fn validate_date(field: &str, value: &str) -> ApiResult<()> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ApiError::BadRequest(format!("{} must be a YYYY-MM-DD date", field)))
}

fn effective_max_tracks(requested: Option<usize>, default: usize) -> usize {
    requested.filter(|&n| n > 0).unwrap_or(default)
}

fn submit(state: &AppState, job: AnalysisJob) -> ApiResult<Json<AnalyzeResponse>> {
    let submission = state
        .runner
        .submit(job)
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;
    Ok(Json(submission.into()))
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let request = parse_body(payload)?;

    let username = request.username.trim();
    let from = request.from.trim();
    let to = request.to.trim();
    if username.is_empty() || from.is_empty() || to.is_empty() {
        return Err(ApiError::BadRequest(
            "username, from, to are required".to_string(),
        ));
    }
    validate_date("from", from)?;
    validate_date("to", to)?;

    let job = AnalysisJob {
        subject: JobSubject::Scrobbles {
            username: username.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        },
        max_tracks: effective_max_tracks(request.max_tracks, state.default_max_tracks),
        exclude_stop_words: request.exclude_stop_words.unwrap_or(true),
        include_lyrics: request.include_lyrics,
    };

    submit(&state, job)
}

/// POST /api/analyze/artist
pub async fn analyze_artist(
    State(state): State<AppState>,
    payload: Result<Json<ArtistAnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let request = parse_body(payload)?;

    let artist = request.artist.trim();
    if artist.is_empty() {
        return Err(ApiError::BadRequest("artist is required".to_string()));
    }
    if !state.runner.has_catalog() {
        return Err(ApiError::Unavailable(
            "artist analysis is not available".to_string(),
        ));
    }

    let job = AnalysisJob {
        subject: JobSubject::Discography {
            artist: artist.to_string(),
        },
        max_tracks: effective_max_tracks(request.max_tracks, state.default_max_tracks),
        exclude_stop_words: request.exclude_stop_words.unwrap_or(true),
        include_lyrics: request.include_lyrics,
    };

    submit(&state, job)
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analyze", post(analyze).fallback(method_not_allowed))
        .route(
            "/api/analyze/artist",
            post(analyze_artist).fallback(method_not_allowed),
        )
}
