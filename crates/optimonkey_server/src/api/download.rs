//! CSV download endpoint.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::{error_response, ApiError};
use crate::api::conversation::require_session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub session_id: String,
}

/// GET /download-recommendations — serves the CSV produced by the last
/// `save_results_to_csv` call of the session.
pub async fn download_recommendations(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_session(&state, &query.session_id).await?;
    let saved = session.recommendations().await.ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            "No recommendations available for this session yet.",
        )
    })?;

    let filename = saved
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "azure_recommendations.csv".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        saved.csv,
    ))
}
