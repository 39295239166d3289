//! The JSON question endpoint.

use crate::errors::AppError;
use crate::services::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Deserialize)]
pub struct AskRequest {
    /// A missing field is treated as an empty question
    #[serde(default)]
    pub question: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub answer: String,
}

#[instrument(skip(state, request), fields(question_len = request.question.len()))]
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<impl IntoResponse, AppError> {
    let answer = state.answer_service.answer(&request.question).await?;
    Ok(Json(AskResponse { answer }))
}
