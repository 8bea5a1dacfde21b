//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{body::Bytes, extract::{Path, State}, Json, response::IntoResponse};
use serde::de::DeserializeOwned;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::SessionSummary;
use crate::error::QuizError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

/// Decode an optional JSON body. An empty body means "all defaults"; anything
/// else must parse, so a bad field is a 400 rather than a silent default.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, QuizError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(T::default());
  }
  serde_json::from_slice(body).map_err(|e| QuizError::InvalidRequest(e.to_string()))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_session(
  State(state): State<Arc<AppState>>,
  body: Bytes,
) -> Result<Json<SessionView>, QuizError> {
  let body: StartIn = optional_body(&body)?;
  let difficulty = parse_difficulty(body.difficulty.as_deref())?;
  let view = start_session(&state, difficulty, body.player_id).await?;
  info!(target: "session", id = %view.id, difficulty = %view.difficulty, "HTTP session started");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, QuizError> {
  Ok(Json(get_session(&state, id).await?))
}

#[instrument(level = "info", skip(state, body), fields(%id, answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>, QuizError> {
  let out = submit_answer(&state, id, &body.answer).await?;
  info!(target: "session", %id, correct = out.correct, score = out.score, "HTTP submit_answer evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_skip(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, QuizError> {
  Ok(Json(skip_question(&state, id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  body: Bytes,
) -> Result<Json<SessionView>, QuizError> {
  let body: ResetIn = optional_body(&body)?;
  let difficulty = parse_difficulty(body.difficulty.as_deref())?;
  Ok(Json(reset_session(&state, id, difficulty).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_finish(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, QuizError> {
  let summary = finish_session(&state, id).await?;
  info!(target: "session", %id, score = summary.score, "HTTP session finished");
  Ok(Json(summary))
}

#[instrument(level = "info", skip(state, body), fields(name_len = body.name.len()))]
pub async fn http_post_player(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PlayerIn>,
) -> Result<Json<PlayerOut>, QuizError> {
  Ok(Json(state.register_player(&body.name).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_player(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PlayerOut>, QuizError> {
  Ok(Json(state.get_player(id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_leaderboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(LeaderboardOut { entries: state.leaderboard().await })
}
