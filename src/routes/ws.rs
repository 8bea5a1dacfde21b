//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::error::QuizError;
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quiz_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quiz_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let out = handle_text(&txt, &state).await;
        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "quiz_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "quiz_backend", "WebSocket disconnected");
}

/// Parse, dispatch, serialize response.
async fn handle_text(txt: &str, state: &AppState) -> String {
  let reply_msg = match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(incoming) => {
      debug!(target: "quiz_backend", "WS received: {:?}", &incoming);
      handle_client_ws(incoming, state).await
    }
    Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
  };

  serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  })
}

fn reply<T>(res: Result<T, QuizError>, ok: impl FnOnce(T) -> ServerWsMessage) -> ServerWsMessage {
  match res {
    Ok(v) => ok(v),
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::StartSession { difficulty, player_id } => {
      let res = start_session(state, difficulty, player_id).await;
      if let Ok(view) = &res {
        info!(target: "session", id = %view.id, difficulty = %view.difficulty, "WS session started");
      }
      reply(res, |session| ServerWsMessage::Session { session })
    }

    ClientWsMessage::SubmitAnswer { session_id, answer } => {
      let res = submit_answer(state, session_id, &answer).await;
      if let Ok(out) = &res {
        info!(target: "session", id = %session_id, correct = out.correct, score = out.score, "WS submit_answer evaluated");
      }
      reply(res, |result| ServerWsMessage::AnswerResult { result })
    }

    ClientWsMessage::Skip { session_id } =>
      reply(skip_question(state, session_id).await, |session| ServerWsMessage::Session { session }),

    ClientWsMessage::ResetSession { session_id, difficulty } =>
      reply(reset_session(state, session_id, difficulty).await, |session| ServerWsMessage::Session { session }),

    ClientWsMessage::FinishSession { session_id } =>
      reply(finish_session(state, session_id).await, |summary| ServerWsMessage::Summary { summary }),

    ClientWsMessage::Leaderboard =>
      ServerWsMessage::Leaderboard { entries: state.leaderboard().await },
  }
}
