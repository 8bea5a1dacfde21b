//! Error type shared by the buffer, session logic and HTTP handlers.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QuizError {
  #[error("Invalid configuration: {0}")]
  InvalidConfiguration(String),

  #[error("Session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("Player not found: {0}")]
  PlayerNotFound(Uuid),

  #[error("Session round time is over")]
  SessionExpired,

  #[error("Session already finished")]
  SessionFinished,

  #[error("Invalid player name: {0}")]
  InvalidPlayerName(String),

  #[error("Player name already taken: {0}")]
  PlayerNameTaken(String),

  #[error("Unknown difficulty: {0}")]
  UnknownDifficulty(String),

  #[error("Invalid request body: {0}")]
  InvalidRequest(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("TOML parse error: {0}")]
  Toml(#[from] toml::de::Error),
}

impl QuizError {
  pub fn status(&self) -> StatusCode {
    match self {
      QuizError::SessionNotFound(_) | QuizError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
      QuizError::SessionExpired | QuizError::SessionFinished | QuizError::PlayerNameTaken(_) => {
        StatusCode::CONFLICT
      }
      QuizError::InvalidPlayerName(_)
      | QuizError::UnknownDifficulty(_)
      | QuizError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
      QuizError::InvalidConfiguration(_) | QuizError::Io(_) | QuizError::Toml(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for QuizError {
  fn into_response(self) -> Response {
    let status = self.status();
    (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
  }
}
